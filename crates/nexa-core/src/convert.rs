// ── API-to-domain conversions ──
//
// Bridges raw `nexa_api` response types into the snapshot types published to
// the sink. Numbers arrive as strings and are parsed leniently; parameter
// fields the API leaves blank stay unset so a later apply never sends a
// value nobody observed.

use nexa_api::app::models::{BatteryDetail, NexaDevice, SystemStatus};
use nexa_api::web::models::{HistoryBattery, NoahListEntry, NoahStatusData, NoahTotalsData};

use crate::model::{BatterySnapshot, Field, OnOff, Parameters, StatusSnapshot, WorkMode};

// ── Helpers ────────────────────────────────────────────────────────

/// Parse a number, treating anything unparseable as `0`.
pub fn parse_f64(raw: &str) -> f64 {
    raw.trim().parse().unwrap_or(0.0)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::as_conversions)]
fn parse_count(raw: &str) -> u32 {
    let n = parse_f64(raw);
    if n.is_finite() && n > 0.0 { n as u32 } else { 0 }
}

/// Human label for the API's numeric status code.
///
/// Known codes: -1 offline, 0 load-first, 1 battery-first, 2 smart self-use,
/// 4 fault, 5 heating, 6 on-grid, 7 off-grid.
pub fn status_label(code: &str) -> String {
    let code = code.trim();
    match code {
        "-1" => "offline".into(),
        "0" => "load_first".into(),
        "1" => "battery_first".into(),
        "2" => "smart_self_use".into(),
        "4" => "fault".into(),
        "5" => "heating".into(),
        "6" => "on_grid".into(),
        "7" => "off_grid".into(),
        other => format!("invalid_{other}"),
    }
}

/// Blank means "not reported": unset. Otherwise lenient.
fn number_field(raw: &str) -> Field<f64> {
    if raw.trim().is_empty() {
        Field::Unset
    } else {
        Field::Set(parse_f64(raw))
    }
}

fn flag_field(raw: &str) -> Field<OnOff> {
    OnOff::from_flag(raw).into()
}

fn mode_field(raw: &str) -> Field<WorkMode> {
    if raw.trim().is_empty() {
        Field::Unset
    } else {
        Field::Set(WorkMode::from_code(raw))
    }
}

// ── App API ────────────────────────────────────────────────────────

impl From<&SystemStatus> for StatusSnapshot {
    fn from(s: &SystemStatus) -> Self {
        Self {
            ac_w: parse_f64(&s.pac),
            solar_w: parse_f64(&s.ppv),
            soc: parse_f64(&s.soc),
            charge_w: parse_f64(&s.charge_power),
            discharge_w: parse_f64(&s.discharge_power),
            battery_num: parse_count(&s.battery_num),
            generation_total_kwh: parse_f64(&s.eac_total),
            generation_today_kwh: parse_f64(&s.eac_today),
            work_mode: Some(WorkMode::from_code(&s.work_mode)),
            status: status_label(&s.status),
        }
    }
}

impl From<&BatteryDetail> for BatterySnapshot {
    fn from(b: &BatteryDetail) -> Self {
        Self {
            serial: b.serial_num.clone(),
            soc: parse_f64(&b.soc),
            temp: parse_f64(&b.temp),
        }
    }
}

impl From<&NexaDevice> for Parameters {
    fn from(d: &NexaDevice) -> Self {
        Self {
            charging_limit: number_field(&d.charging_soc_high_limit),
            discharge_limit: number_field(&d.charging_soc_low_limit),
            default_output_w: number_field(&d.default_ac_couple_power),
            default_mode: mode_field(&d.default_mode),
            allow_grid_charging: flag_field(&d.allow_grid_charging),
            grid_connection_control: flag_field(&d.grid_connection_control),
            ac_couple_power_control: flag_field(&d.ac_couple_power_control),
            light_load_enable: flag_field(&d.light_load_enable),
            never_power_off: flag_field(&d.never_power_off),
            anti_backflow_enable: flag_field(&d.anti_backflow_enable),
            anti_backflow_power_percentage: number_field(&d.anti_backflow_power_percentage),
        }
    }
}

// ── Web API ────────────────────────────────────────────────────────

/// The web portal splits live readings and energy totals over two calls,
/// and reports battery power as one signed value (negative = discharging).
pub fn web_status(status: &NoahStatusData, totals: &NoahTotalsData, battery_num: usize) -> StatusSnapshot {
    let battery_w = parse_f64(&status.total_battery_pack_charging_power);
    let (charge_w, discharge_w) = if battery_w < 0.0 {
        (0.0, -battery_w)
    } else {
        (battery_w, 0.0)
    };

    StatusSnapshot {
        ac_w: parse_f64(&status.pac),
        solar_w: parse_f64(&status.ppv),
        soc: parse_f64(&status.total_battery_pack_soc),
        charge_w,
        discharge_w,
        battery_num: u32::try_from(battery_num).unwrap_or(u32::MAX),
        generation_total_kwh: parse_f64(&totals.eac_total),
        generation_today_kwh: parse_f64(&totals.eac_today),
        work_mode: Some(WorkMode::from_code(&status.work_mode)),
        status: status_label(&status.status),
    }
}

impl From<HistoryBattery<'_>> for BatterySnapshot {
    fn from(b: HistoryBattery<'_>) -> Self {
        Self {
            serial: b.serial.to_owned(),
            soc: b.soc,
            temp: b.temp,
        }
    }
}

impl From<&NoahListEntry> for Parameters {
    fn from(d: &NoahListEntry) -> Self {
        Self {
            charging_limit: number_field(&d.charging_soc_high_limit),
            discharge_limit: number_field(&d.charging_soc_low_limit),
            default_output_w: number_field(&d.default_ac_couple_power),
            default_mode: mode_field(&d.default_mode),
            allow_grid_charging: flag_field(&d.allow_grid_charging),
            grid_connection_control: flag_field(&d.grid_connection_control),
            ac_couple_power_control: flag_field(&d.ac_couple_power_control),
            light_load_enable: flag_field(&d.light_load_enable),
            never_power_off: flag_field(&d.never_power_off),
            anti_backflow_enable: flag_field(&d.anti_backflow_enable),
            anti_backflow_power_percentage: number_field(&d.anti_backflow_power_percentage),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn status_labels() {
        assert_eq!(status_label("-1"), "offline");
        assert_eq!(status_label("5"), "heating");
        assert_eq!(status_label("7"), "off_grid");
        assert_eq!(status_label("3"), "invalid_3");
        assert_eq!(status_label(""), "invalid_");
    }

    #[test]
    fn lenient_numbers() {
        assert!((parse_f64(" 12.5 ") - 12.5).abs() < f64::EPSILON);
        assert!(parse_f64("n/a").abs() < f64::EPSILON);
        assert_eq!(parse_count("2"), 2);
        assert_eq!(parse_count("-3"), 0);
    }

    #[test]
    fn app_status_maps_every_field() {
        let raw = SystemStatus {
            pac: "300".into(),
            ppv: "420".into(),
            soc: "77".into(),
            charge_power: "120".into(),
            discharge_power: "0".into(),
            battery_num: "2".into(),
            eac_total: "812.4".into(),
            eac_today: "3.1".into(),
            work_mode: "0".into(),
            status: "6".into(),
        };
        let snap = StatusSnapshot::from(&raw);
        assert_eq!(
            snap,
            StatusSnapshot {
                ac_w: 300.0,
                solar_w: 420.0,
                soc: 77.0,
                charge_w: 120.0,
                discharge_w: 0.0,
                battery_num: 2,
                generation_total_kwh: 812.4,
                generation_today_kwh: 3.1,
                work_mode: Some(WorkMode::LoadFirst),
                status: "on_grid".into(),
            }
        );
    }

    #[test]
    fn web_status_splits_signed_battery_power() {
        let status = NoahStatusData {
            total_battery_pack_charging_power: "-95".into(),
            status: "1".into(),
            ..NoahStatusData::default()
        };
        let snap = web_status(&status, &NoahTotalsData::default(), 2);
        assert!((snap.discharge_w - 95.0).abs() < f64::EPSILON);
        assert!(snap.charge_w.abs() < f64::EPSILON);
        assert_eq!(snap.battery_num, 2);
        assert_eq!(snap.status, "battery_first");
    }

    #[test]
    fn blank_parameters_stay_unset() {
        let dev = NexaDevice {
            charging_soc_high_limit: "95".into(),
            allow_grid_charging: "1".into(),
            ..NexaDevice::default()
        };
        let p = Parameters::from(&dev);
        assert_eq!(p.charging_limit, Field::Set(95.0));
        assert_eq!(p.allow_grid_charging, Field::Set(OnOff::On));
        assert_eq!(p.discharge_limit, Field::Unset);
        assert_eq!(p.default_mode, Field::Unset);
        assert_eq!(p.anti_backflow_enable, Field::Unset);
    }
}
