// ShinePhone app API response types
//
// Only the fields the bridge reads are modeled; serde ignores the rest.
// Scalars go through the lenient decoders because the app API mixes
// strings and numbers for the same field across firmware versions.

use serde::Deserialize;

use crate::de::{lenient_i64, lenient_string};

// ── Envelope ─────────────────────────────────────────────────────────

/// The `{ result, msg, obj }` envelope shared by the `noahDeviceApi` calls.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseContainer<T> {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub result: i64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub msg: String,
    pub obj: Option<T>,
}

// ── Login ────────────────────────────────────────────────────────────

/// Response of the evcharge token round trip.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub code: i64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResult {
    pub back: LoginBack,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginBack {
    #[serde(default, deserialize_with = "lenient_string")]
    pub msg: String,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub user: Option<LoginUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginUser {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub id: i64,
}

// ── Plants ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct PlantList {
    #[serde(rename = "PlantList", default)]
    pub plants: Vec<PlantEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlantEntry {
    #[serde(deserialize_with = "lenient_i64")]
    pub id: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantInfo {
    #[serde(default)]
    pub is_plant_have_nexa: bool,
    #[serde(default, deserialize_with = "lenient_string")]
    pub device_sn: String,
}

// ── Device data ──────────────────────────────────────────────────────

/// Live readings from `getSystemStatus`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SystemStatus {
    #[serde(deserialize_with = "lenient_string")]
    pub pac: String,
    #[serde(deserialize_with = "lenient_string")]
    pub ppv: String,
    #[serde(deserialize_with = "lenient_string")]
    pub soc: String,
    #[serde(deserialize_with = "lenient_string")]
    pub charge_power: String,
    #[serde(rename = "disChargePower", deserialize_with = "lenient_string")]
    pub discharge_power: String,
    #[serde(deserialize_with = "lenient_string")]
    pub battery_num: String,
    #[serde(deserialize_with = "lenient_string")]
    pub eac_total: String,
    #[serde(deserialize_with = "lenient_string")]
    pub eac_today: String,
    #[serde(deserialize_with = "lenient_string")]
    pub work_mode: String,
    #[serde(deserialize_with = "lenient_string")]
    pub status: String,
}

/// `getNexaInfoBySn` wraps the device block in a `noah` key.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NexaInfo {
    #[serde(default)]
    pub noah: NexaDevice,
}

/// Device identity and the settable parameters.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NexaDevice {
    #[serde(deserialize_with = "lenient_string")]
    pub device_sn: String,
    #[serde(deserialize_with = "lenient_string")]
    pub alias: String,
    #[serde(deserialize_with = "lenient_string")]
    pub model: String,
    #[serde(deserialize_with = "lenient_string")]
    pub version: String,
    pub bat_sns: Vec<String>,
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
    #[serde(rename = "light_load_enable", deserialize_with = "lenient_string")]
    pub light_load_enable: String,
    #[serde(rename = "never_power_off", deserialize_with = "lenient_string")]
    pub never_power_off: String,
    #[serde(deserialize_with = "lenient_string")]
    pub anti_backflow_enable: String,
    #[serde(deserialize_with = "lenient_string")]
    pub anti_backflow_power_percentage: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatteryData {
    #[serde(default, rename = "batter")]
    pub batteries: Vec<BatteryDetail>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BatteryDetail {
    #[serde(deserialize_with = "lenient_string")]
    pub serial_num: String,
    #[serde(deserialize_with = "lenient_string")]
    pub soc: String,
    #[serde(deserialize_with = "lenient_string")]
    pub temp: String,
}
