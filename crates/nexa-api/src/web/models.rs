// Web portal response types

use serde::Deserialize;

use crate::de::{lenient_f64, lenient_i64, lenient_string};

/// Bare `{ result, msg }` reply (login).
#[derive(Debug, Clone, Deserialize)]
pub struct WebResult {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub result: i64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub msg: String,
}

/// One entry of `index/getPlantListTitle` (a bare JSON array).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebPlant {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoahList {
    #[serde(default)]
    pub datas: Vec<NoahListEntry>,
}

/// A device row from `device/getNoahList`. The same row carries the
/// current parameter settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NoahListEntry {
    #[serde(deserialize_with = "lenient_string")]
    pub sn: String,
    #[serde(deserialize_with = "lenient_string")]
    pub plant_id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub alias: String,
    #[serde(deserialize_with = "lenient_string")]
    pub device_model: String,
    #[serde(deserialize_with = "lenient_string")]
    pub version: String,
    #[serde(deserialize_with = "lenient_string")]
    pub charging_soc_high_limit: String,
    #[serde(deserialize_with = "lenient_string")]
    pub charging_soc_low_limit: String,
    #[serde(rename = "defaultACCouplePower", deserialize_with = "lenient_string")]
    pub default_ac_couple_power: String,
    #[serde(deserialize_with = "lenient_string")]
    pub default_mode: String,
    #[serde(deserialize_with = "lenient_string")]
    pub allow_grid_charging: String,
    #[serde(deserialize_with = "lenient_string")]
    pub grid_connection_control: String,
    #[serde(deserialize_with = "lenient_string")]
    pub ac_couple_power_control: String,
    #[serde(deserialize_with = "lenient_string")]
    pub light_load_enable: String,
    #[serde(deserialize_with = "lenient_string")]
    pub never_power_off: String,
    #[serde(deserialize_with = "lenient_string")]
    pub anti_backflow_enable: String,
    #[serde(deserialize_with = "lenient_string")]
    pub anti_backflow_power_percentage: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoahHistory {
    #[serde(default)]
    pub obj: NoahHistoryPage,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoahHistoryPage {
    #[serde(default)]
    pub datas: Vec<HistoryRow>,
}

/// A history sample. Up to four battery packs are reported inline.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HistoryRow {
    #[serde(deserialize_with = "lenient_i64")]
    pub battery_package_quantity: i64,
    #[serde(deserialize_with = "lenient_string")]
    pub battery1_serial_num: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub battery1_soc: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub battery1_temp: f64,
    #[serde(deserialize_with = "lenient_string")]
    pub battery2_serial_num: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub battery2_soc: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub battery2_temp: f64,
    #[serde(deserialize_with = "lenient_string")]
    pub battery3_serial_num: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub battery3_soc: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub battery3_temp: f64,
    #[serde(deserialize_with = "lenient_string")]
    pub battery4_serial_num: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub battery4_soc: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub battery4_temp: f64,
}

/// One battery pack out of a [`HistoryRow`].
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryBattery<'a> {
    pub serial: &'a str,
    pub soc: f64,
    pub temp: f64,
}

impl HistoryRow {
    /// Pack `index` (0-based), or `None` past the fourth pack.
    pub fn battery(&self, index: usize) -> Option<HistoryBattery<'_>> {
        let (serial, soc, temp) = match index {
            0 => (&self.battery1_serial_num, self.battery1_soc, self.battery1_temp),
            1 => (&self.battery2_serial_num, self.battery2_soc, self.battery2_temp),
            2 => (&self.battery3_serial_num, self.battery3_soc, self.battery3_temp),
            3 => (&self.battery4_serial_num, self.battery4_soc, self.battery4_temp),
            _ => return None,
        };
        Some(HistoryBattery { serial, soc, temp })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoahStatus {
    #[serde(default)]
    pub obj: NoahStatusData,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NoahStatusData {
    #[serde(deserialize_with = "lenient_string")]
    pub pac: String,
    #[serde(deserialize_with = "lenient_string")]
    pub ppv: String,
    #[serde(deserialize_with = "lenient_string")]
    pub total_battery_pack_soc: String,
    /// Signed: negative while discharging.
    #[serde(deserialize_with = "lenient_string")]
    pub total_battery_pack_charging_power: String,
    #[serde(deserialize_with = "lenient_string")]
    pub work_mode: String,
    #[serde(deserialize_with = "lenient_string")]
    pub status: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoahTotals {
    #[serde(default)]
    pub obj: NoahTotalsData,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NoahTotalsData {
    #[serde(deserialize_with = "lenient_string")]
    pub eac_total: String,
    #[serde(deserialize_with = "lenient_string")]
    pub eac_today: String,
}
