// ── Device parameters ──
//
// One struct serves both as the full snapshot (after a poll or an apply) and
// as a partial delta from the bus; in a delta only the requested fields are
// set. Settable fields are partitioned into groups that the API applies in
// one call each.

use serde::{Deserialize, Serialize};

use super::field::Field;

/// Toggle in the bus vocabulary: `"ON"` / `"OFF"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OnOff {
    On,
    Off,
}

impl OnOff {
    /// Parse the API's `"1"` / `"0"` flag. Anything else is unknown.
    pub fn from_flag(flag: &str) -> Option<Self> {
        match flag.trim() {
            "1" => Some(Self::On),
            "0" => Some(Self::Off),
            _ => None,
        }
    }

    pub fn as_flag(self) -> i32 {
        match self {
            Self::On => 1,
            Self::Off => 0,
        }
    }
}

/// Output priority of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkMode {
    LoadFirst,
    BatteryFirst,
}

impl WorkMode {
    /// `"0"` is load-first; every other code is battery-first.
    pub fn from_code(code: &str) -> Self {
        if code.trim() == "0" {
            Self::LoadFirst
        } else {
            Self::BatteryFirst
        }
    }

    pub fn as_code(self) -> i32 {
        match self {
            Self::LoadFirst => 0,
            Self::BatteryFirst => 1,
        }
    }
}

/// Settable device parameters. Every field may be unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    #[serde(skip_serializing_if = "Field::is_unset")]
    pub charging_limit: Field<f64>,
    #[serde(skip_serializing_if = "Field::is_unset")]
    pub discharge_limit: Field<f64>,
    #[serde(skip_serializing_if = "Field::is_unset")]
    pub default_output_w: Field<f64>,
    #[serde(skip_serializing_if = "Field::is_unset")]
    pub default_mode: Field<WorkMode>,
    #[serde(skip_serializing_if = "Field::is_unset")]
    pub allow_grid_charging: Field<OnOff>,
    #[serde(skip_serializing_if = "Field::is_unset")]
    pub grid_connection_control: Field<OnOff>,
    #[serde(skip_serializing_if = "Field::is_unset")]
    pub ac_couple_power_control: Field<OnOff>,
    #[serde(skip_serializing_if = "Field::is_unset")]
    pub light_load_enable: Field<OnOff>,
    #[serde(skip_serializing_if = "Field::is_unset")]
    pub never_power_off: Field<OnOff>,
    #[serde(skip_serializing_if = "Field::is_unset")]
    pub anti_backflow_enable: Field<OnOff>,
    #[serde(skip_serializing_if = "Field::is_unset")]
    pub anti_backflow_power_percentage: Field<f64>,
}

/// Full parameter state of a device as last polled or applied.
pub type ParameterSnapshot = Parameters;

/// Partial parameter change requested by an operator.
pub type ParameterDelta = Parameters;

impl Parameters {
    /// Field-wise overwrite: every field set in `other` replaces ours.
    pub fn merge_from(&mut self, other: &Self) {
        self.charging_limit.merge(other.charging_limit);
        self.discharge_limit.merge(other.discharge_limit);
        self.default_output_w.merge(other.default_output_w);
        self.default_mode.merge(other.default_mode);
        self.allow_grid_charging.merge(other.allow_grid_charging);
        self.grid_connection_control.merge(other.grid_connection_control);
        self.ac_couple_power_control.merge(other.ac_couple_power_control);
        self.light_load_enable.merge(other.light_load_enable);
        self.never_power_off.merge(other.never_power_off);
        self.anti_backflow_enable.merge(other.anti_backflow_enable);
        self.anti_backflow_power_percentage
            .merge(other.anti_backflow_power_percentage);
    }

    pub fn is_empty(&self) -> bool {
        FieldGroup::ALL.iter().all(|g| !g.touched_by(self))
    }

    /// Groups with at least one set member, in apply order.
    pub fn touched_groups(&self) -> Vec<FieldGroup> {
        FieldGroup::ALL
            .iter()
            .copied()
            .filter(|g| g.touched_by(self))
            .collect()
    }
}

/// Parameters that the API sets together in one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldGroup {
    /// `default_output_w` + `default_mode`
    OutputPower,
    /// `charging_limit` + `discharge_limit`
    ChargingLimits,
    AllowGridCharging,
    GridConnectionControl,
    AcCouplePowerControl,
    LightLoadEnable,
    NeverPowerOff,
    /// `anti_backflow_enable` + `anti_backflow_power_percentage`
    AntiBackflow,
}

impl FieldGroup {
    pub const ALL: [Self; 8] = [
        Self::OutputPower,
        Self::ChargingLimits,
        Self::AllowGridCharging,
        Self::GridConnectionControl,
        Self::AcCouplePowerControl,
        Self::LightLoadEnable,
        Self::NeverPowerOff,
        Self::AntiBackflow,
    ];

    /// Whether any member of this group is set in `p`.
    pub fn touched_by(self, p: &Parameters) -> bool {
        match self {
            Self::OutputPower => p.default_output_w.is_set() || p.default_mode.is_set(),
            Self::ChargingLimits => p.charging_limit.is_set() || p.discharge_limit.is_set(),
            Self::AllowGridCharging => p.allow_grid_charging.is_set(),
            Self::GridConnectionControl => p.grid_connection_control.is_set(),
            Self::AcCouplePowerControl => p.ac_couple_power_control.is_set(),
            Self::LightLoadEnable => p.light_load_enable.is_set(),
            Self::NeverPowerOff => p.never_power_off.is_set(),
            Self::AntiBackflow => {
                p.anti_backflow_enable.is_set() || p.anti_backflow_power_percentage.is_set()
            }
        }
    }
}
