use std::sync::{Arc, Mutex, MutexGuard};

use crate::sensor::Field;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensorReading {
    co2: i32,

    pm25: i32,

    o3: i32,

    temp: i32,

    hum: i32,

    tvoc: i32,

    last_update: Option<u64>,
}

impl SensorReading {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: Field) -> i32 {
        match field {
            Field::Co2 => self.co2,
            Field::Pm25 => self.pm25,
            Field::O3 => self.o3,
            Field::Temperature => self.temp,
            Field::Humidity => self.hum,
            Field::Tvoc => self.tvoc,
        }
    }

    /// Stores `value` and stamps `last_update` with `now_ms`.
    ///
    /// Returns `false` and leaves the record untouched when `value` is outside
    /// the field's plausible range.
    pub fn set(&mut self, field: Field, value: i32, now_ms: u64) -> bool {
        if !field.is_plausible(value) {
            return false;
        }

        let slot = match field {
            Field::Co2 => &mut self.co2,
            Field::Pm25 => &mut self.pm25,
            Field::O3 => &mut self.o3,
            Field::Temperature => &mut self.temp,
            Field::Humidity => &mut self.hum,
            Field::Tvoc => &mut self.tvoc,
        };
        *slot = value;
        self.last_update = Some(now_ms);

        true
    }

    /// Monotonic time of the most recent accepted write, if any.
    pub fn last_update(&self) -> Option<u64> {
        self.last_update
    }

    pub fn staleness_ms(&self, now_ms: u64) -> Option<u64> {
        self.last_update.map(|t| now_ms.saturating_sub(t))
    }
}

/// Handle to the one reading shared by the serial reader and the HTTP tasks.
#[derive(Debug, Clone, Default)]
pub struct SharedReading {
    inner: Arc<Mutex<SensorReading>>,
}

impl SharedReading {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every write leaves the record valid, so a poisoned lock is still usable.
    pub fn lock(&self) -> MutexGuard<'_, SensorReading> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn read(&self) -> SensorReading {
        self.lock().clone()
    }
}
