// App API provider: reads and writes through the ShinePhone API.

use async_trait::async_trait;
use nexa_api::AppClient;
use tracing::{debug, info, warn};

use super::{DeviceProvider, ParameterApplier};
use crate::error::CoreError;
use crate::model::{BatterySnapshot, DeviceRecord, OnOff, ParameterSnapshot, StatusSnapshot, WorkMode};

pub struct AppApiProvider {
    client: AppClient,
}

impl AppApiProvider {
    pub fn new(client: AppClient) -> Self {
        Self { client }
    }

    /// Plants that host a NEXA device, in plant order.
    async fn discover(&self) -> Result<Vec<DeviceRecord>, CoreError> {
        let plants = self
            .client
            .plant_list()
            .await
            .map_err(CoreError::enumeration)?;

        let mut devices = Vec::new();
        for plant in plants.plants {
            debug!(plant_id = plant.id, "fetching plant details");
            match self.client.plant_info(plant.id).await {
                Ok(info) if info.is_plant_have_nexa && !info.device_sn.is_empty() => {
                    info!(plant_id = plant.id, device = %info.device_sn, "found device");
                    devices.push(DeviceRecord::new(plant.id, info.device_sn));
                }
                Ok(_) => debug!(plant_id = plant.id, "plant has no NEXA device"),
                Err(e) => warn!(plant_id = plant.id, error = %e, "could not get plant info"),
            }
        }
        Ok(devices)
    }
}

#[async_trait]
impl DeviceProvider for AppApiProvider {
    fn name(&self) -> &'static str {
        "app"
    }

    async fn login(&self) -> Result<(), CoreError> {
        info!("logging in to growatt (app)");
        Ok(self.client.login().await?)
    }

    async fn enumerate_devices(&self) -> Result<Vec<DeviceRecord>, CoreError> {
        let mut devices = self.discover().await?;
        if devices.is_empty() {
            return Err(CoreError::enumeration("no NEXA devices found"));
        }

        for device in &mut devices {
            match self.client.device_info(&device.serial).await {
                Ok(info) => {
                    let noah = info.noah;
                    device.model = noah.model;
                    device.version = noah.version;
                    device.alias = noah.alias;
                    device.batteries = crate::model::battery_aliases(noah.bat_sns.len());
                }
                Err(e) => warn!(device = %device.serial, error = %e, "could not get device info"),
            }
        }
        Ok(devices)
    }

    async fn fetch_status(&self, device: &DeviceRecord) -> Result<StatusSnapshot, CoreError> {
        let status = self.client.system_status(&device.serial).await?;
        Ok(StatusSnapshot::from(&status))
    }

    async fn fetch_batteries(&self, device: &DeviceRecord) -> Result<Vec<BatterySnapshot>, CoreError> {
        let data = self.client.battery_data(&device.serial).await?;
        Ok(data.batteries.iter().map(BatterySnapshot::from).collect())
    }

    async fn fetch_parameters(&self, device: &DeviceRecord) -> Result<ParameterSnapshot, CoreError> {
        let info = self.client.device_info(&device.serial).await?;
        Ok(ParameterSnapshot::from(&info.noah))
    }
}

#[async_trait]
impl ParameterApplier for AppApiProvider {
    async fn set_output_power(&self, device: &DeviceRecord, mode: WorkMode, power_w: f64) -> Result<(), CoreError> {
        info!(device = %device.serial, ?mode, power_w, "set default output power");
        Ok(self
            .client
            .set_system_output_power(&device.serial, mode.as_code(), power_w)
            .await?)
    }

    async fn set_charging_limits(&self, device: &DeviceRecord, charge: f64, discharge: f64) -> Result<(), CoreError> {
        info!(device = %device.serial, charge, discharge, "set charging limits");
        Ok(self
            .client
            .set_charging_soc(&device.serial, charge, discharge)
            .await?)
    }

    async fn set_allow_grid_charging(&self, device: &DeviceRecord, value: OnOff) -> Result<(), CoreError> {
        info!(device = %device.serial, ?value, "set allow grid charging");
        Ok(self
            .client
            .set_allow_grid_charging(&device.serial, value.as_flag())
            .await?)
    }

    async fn set_grid_connection_control(&self, device: &DeviceRecord, value: OnOff) -> Result<(), CoreError> {
        info!(device = %device.serial, ?value, "set grid connection control");
        Ok(self
            .client
            .set_grid_connection_control(&device.serial, value.as_flag())
            .await?)
    }

    async fn set_ac_couple_power_control(&self, device: &DeviceRecord, value: OnOff) -> Result<(), CoreError> {
        info!(device = %device.serial, ?value, "set ac couple power control");
        Ok(self
            .client
            .set_ac_couple_power_control(&device.serial, value.as_flag())
            .await?)
    }

    async fn set_light_load_enable(&self, device: &DeviceRecord, value: OnOff) -> Result<(), CoreError> {
        info!(device = %device.serial, ?value, "set light load enable");
        Ok(self
            .client
            .set_light_load_enable(&device.serial, value.as_flag())
            .await?)
    }

    async fn set_never_power_off(&self, device: &DeviceRecord, value: OnOff) -> Result<(), CoreError> {
        info!(device = %device.serial, ?value, "set never power off");
        Ok(self
            .client
            .set_never_power_off(&device.serial, value.as_flag())
            .await?)
    }

    async fn set_anti_backflow(
        &self,
        device: &DeviceRecord,
        enable: OnOff,
        power_percentage: f64,
    ) -> Result<(), CoreError> {
        info!(device = %device.serial, ?enable, power_percentage, "set anti backflow");
        Ok(self
            .client
            .set_anti_backflow(&device.serial, enable.as_flag(), power_percentage)
            .await?)
    }
}
