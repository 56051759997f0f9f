// Domain model: devices, snapshots, and parameters.

mod device;
mod field;
mod parameters;

pub use device::{BatterySnapshot, DeviceRecord, StatusSnapshot, battery_aliases};
pub use field::Field;
pub use parameters::{FieldGroup, OnOff, ParameterDelta, ParameterSnapshot, Parameters, WorkMode};
