use std::{fmt, ops::RangeInclusive};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Co2,
    Pm25,
    O3,
    Temperature,
    Humidity,
    Tvoc,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::Co2,
        Field::Pm25,
        Field::O3,
        Field::Temperature,
        Field::Humidity,
        Field::Tvoc,
    ];

    /// Key used for this field in the JSON snapshot.
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Co2 => "co2",
            Field::Pm25 => "pm25",
            Field::O3 => "o3",
            Field::Temperature => "temp",
            Field::Humidity => "hum",
            Field::Tvoc => "tvoc",
        }
    }

    /// Command prefix sent by the microcontroller, up to and including `=`.
    pub fn prefix(&self) -> &'static str {
        match self {
            Field::Co2 => "co2V.val=",
            Field::Pm25 => "pm25V.val=",
            Field::O3 => "o3V.val=",
            Field::Temperature => "tempV.val=",
            Field::Humidity => "humV.val=",
            Field::Tvoc => "tvocV.val=",
        }
    }

    pub fn valid_range(&self) -> RangeInclusive<i32> {
        match self {
            Field::Co2 => 1..=9999,
            Field::Pm25 => 0..=1999,
            Field::O3 => 0..=1999,
            Field::Temperature => -50..=99,
            Field::Humidity => 0..=100,
            Field::Tvoc => 0..=1999,
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Field::Co2 => "ppm",
            Field::Pm25 => "µg/m³",
            Field::O3 => "ppb",
            Field::Temperature => "°C",
            Field::Humidity => "%",
            Field::Tvoc => "raw",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Field::Co2 => "CO2",
            Field::Pm25 => "PM2.5",
            Field::O3 => "O3",
            Field::Temperature => "Temperature",
            Field::Humidity => "Humidity",
            Field::Tvoc => "TVOC",
        }
    }

    pub fn is_plausible(&self, value: i32) -> bool {
        self.valid_range().contains(&value)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
