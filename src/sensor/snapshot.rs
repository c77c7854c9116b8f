use serde::Serialize;

use crate::sensor::{Field, SensorReading};

/// Body of the `/data` response. `last_update` is the clock reading at
/// export time, not the time of the last accepted write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub co2: i32,

    pub pm25: i32,

    pub o3: i32,

    pub temp: i32,

    pub hum: i32,

    pub tvoc: i32,

    #[serde(rename = "lastUpdate")]
    pub last_update: u64,
}

impl Snapshot {
    pub fn new(reading: &SensorReading, now_ms: u64) -> Self {
        Self {
            co2: reading.get(Field::Co2),
            pm25: reading.get(Field::Pm25),
            o3: reading.get(Field::O3),
            temp: reading.get(Field::Temperature),
            hum: reading.get(Field::Humidity),
            tvoc: reading.get(Field::Tvoc),
            last_update: now_ms,
        }
    }

    pub fn to_json(&self) -> String {
        // Plain integer fields, serialization cannot fail.
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }
}
