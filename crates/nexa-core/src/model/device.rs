use serde::{Deserialize, Serialize};

use super::parameters::WorkMode;

/// An enumerated device. Immutable after enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub plant_id: i64,
    pub serial: String,
    pub model: String,
    pub version: String,
    pub alias: String,
    /// `BAT0`, `BAT1`, ... one per physical battery, in API order.
    pub batteries: Vec<String>,
}

impl DeviceRecord {
    pub fn new(plant_id: i64, serial: impl Into<String>) -> Self {
        Self {
            plant_id,
            serial: serial.into(),
            model: String::new(),
            version: String::new(),
            alias: String::new(),
            batteries: Vec::new(),
        }
    }

    pub fn with_battery_count(mut self, count: usize) -> Self {
        self.batteries = battery_aliases(count);
        self
    }
}

pub fn battery_aliases(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("BAT{i}")).collect()
}

/// Live readings of one device.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub ac_w: f64,
    pub solar_w: f64,
    pub soc: f64,
    pub charge_w: f64,
    pub discharge_w: f64,
    pub battery_num: u32,
    pub generation_total_kwh: f64,
    pub generation_today_kwh: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_mode: Option<WorkMode>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub status: String,
}

/// Readings of one battery pack.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BatterySnapshot {
    pub serial: String,
    pub soc: f64,
    pub temp: f64,
}
