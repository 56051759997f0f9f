// ── Provider seams ──
//
// The scheduler and coalescer depend only on these traits. `AppApiProvider`
// implements both (reads and writes through the app API); `WebApiProvider`
// is read-only.

mod app;
mod web;

pub use app::AppApiProvider;
pub use web::WebApiProvider;

use async_trait::async_trait;

use crate::error::CoreError;
use crate::model::{BatterySnapshot, DeviceRecord, OnOff, ParameterSnapshot, StatusSnapshot, WorkMode};

/// Read side of a Growatt API.
#[async_trait]
pub trait DeviceProvider: Send + Sync {
    /// Short name for logs (`app`, `web`).
    fn name(&self) -> &'static str;

    async fn login(&self) -> Result<(), CoreError>;

    /// Every device on the account, in plant order. An empty result is an
    /// [`CoreError::Enumeration`] error.
    async fn enumerate_devices(&self) -> Result<Vec<DeviceRecord>, CoreError>;

    async fn fetch_status(&self, device: &DeviceRecord) -> Result<StatusSnapshot, CoreError>;

    async fn fetch_batteries(&self, device: &DeviceRecord) -> Result<Vec<BatterySnapshot>, CoreError>;

    async fn fetch_parameters(&self, device: &DeviceRecord) -> Result<ParameterSnapshot, CoreError>;
}

/// Write side: one method per parameter group.
#[async_trait]
pub trait ParameterApplier: Send + Sync {
    async fn set_output_power(&self, device: &DeviceRecord, mode: WorkMode, power_w: f64) -> Result<(), CoreError>;

    async fn set_charging_limits(&self, device: &DeviceRecord, charge: f64, discharge: f64) -> Result<(), CoreError>;

    async fn set_allow_grid_charging(&self, device: &DeviceRecord, value: OnOff) -> Result<(), CoreError>;

    async fn set_grid_connection_control(&self, device: &DeviceRecord, value: OnOff) -> Result<(), CoreError>;

    async fn set_ac_couple_power_control(&self, device: &DeviceRecord, value: OnOff) -> Result<(), CoreError>;

    async fn set_light_load_enable(&self, device: &DeviceRecord, value: OnOff) -> Result<(), CoreError>;

    async fn set_never_power_off(&self, device: &DeviceRecord, value: OnOff) -> Result<(), CoreError>;

    async fn set_anti_backflow(
        &self,
        device: &DeviceRecord,
        enable: OnOff,
        power_percentage: f64,
    ) -> Result<(), CoreError>;
}
