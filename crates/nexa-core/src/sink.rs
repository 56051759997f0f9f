// ── Device sink ──
//
// Where snapshots go. The MQTT endpoint is the production sink; tests use
// recording fakes.

use async_trait::async_trait;

use crate::error::CoreError;
use crate::model::{BatterySnapshot, DeviceRecord, ParameterSnapshot, StatusSnapshot};

#[async_trait]
pub trait DeviceSink: Send + Sync {
    async fn publish_status(&self, device: &DeviceRecord, status: &StatusSnapshot) -> Result<(), CoreError>;

    async fn publish_batteries(&self, device: &DeviceRecord, batteries: &[BatterySnapshot]) -> Result<(), CoreError>;

    async fn publish_parameters(&self, device: &DeviceRecord, parameters: &ParameterSnapshot) -> Result<(), CoreError>;

    /// Replace the set of devices the sink serves (re-subscribes command topics).
    async fn set_device_list(&self, devices: &[DeviceRecord]) -> Result<(), CoreError>;
}
