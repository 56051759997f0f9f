// Web portal provider: read-only.

use async_trait::async_trait;
use nexa_api::WebClient;
use tracing::{debug, info, warn};

use super::DeviceProvider;
use crate::convert::web_status;
use crate::error::CoreError;
use crate::model::{BatterySnapshot, DeviceRecord, ParameterSnapshot, StatusSnapshot};

/// The portal reports at most four packs per history row.
const MAX_PACKS: usize = 4;

pub struct WebApiProvider {
    client: WebClient,
}

impl WebApiProvider {
    pub fn new(client: WebClient) -> Self {
        Self { client }
    }

    /// Battery count comes from the newest history sample; a device
    /// without history today is skipped.
    async fn describe(&self, plant_id: i64, entry: &nexa_api::web::models::NoahListEntry) -> Option<DeviceRecord> {
        let history = match self.client.history(&entry.sn).await {
            Ok(h) => h,
            Err(e) => {
                warn!(device = %entry.sn, error = %e, "could not get device history");
                return None;
            }
        };
        let Some(latest) = history.obj.datas.first() else {
            info!(device = %entry.sn, "device history empty, skipping");
            return None;
        };

        let count = usize::try_from(latest.battery_package_quantity).unwrap_or(0);
        let mut device = DeviceRecord::new(entry.plant_id.parse().unwrap_or(plant_id), entry.sn.clone())
            .with_battery_count(count);
        device.model.clone_from(&entry.device_model);
        device.version.clone_from(&entry.version);
        device.alias.clone_from(&entry.alias);
        Some(device)
    }
}

#[async_trait]
impl DeviceProvider for WebApiProvider {
    fn name(&self) -> &'static str {
        "web"
    }

    async fn login(&self) -> Result<(), CoreError> {
        info!("logging in to growatt (web)");
        Ok(self.client.login().await?)
    }

    async fn enumerate_devices(&self) -> Result<Vec<DeviceRecord>, CoreError> {
        let plants = self
            .client
            .plant_list()
            .await
            .map_err(CoreError::enumeration)?;

        let mut devices = Vec::new();
        for plant in plants {
            let Ok(plant_id) = plant.id.trim().parse::<i64>() else {
                warn!(plant_id = %plant.id, "skipping plant with non-numeric id");
                continue;
            };
            debug!(plant_id, "fetching plant devices");
            let list = match self.client.device_list(plant_id).await {
                Ok(list) => list,
                Err(e) => {
                    warn!(plant_id, error = %e, "could not get plant devices");
                    continue;
                }
            };
            for entry in &list.datas {
                if let Some(device) = self.describe(plant_id, entry).await {
                    info!(plant_id, device = %device.serial, "found device");
                    devices.push(device);
                }
            }
        }

        if devices.is_empty() {
            return Err(CoreError::enumeration("no NEXA devices found"));
        }
        Ok(devices)
    }

    async fn fetch_status(&self, device: &DeviceRecord) -> Result<StatusSnapshot, CoreError> {
        let status = self.client.status(device.plant_id, &device.serial).await?;
        let totals = self.client.totals(device.plant_id, &device.serial).await?;
        Ok(web_status(&status.obj, &totals.obj, device.batteries.len()))
    }

    async fn fetch_batteries(&self, device: &DeviceRecord) -> Result<Vec<BatterySnapshot>, CoreError> {
        let history = self.client.history(&device.serial).await?;
        let latest = history.obj.datas.first().ok_or_else(|| CoreError::Decode {
            message: format!("no history samples for {}", device.serial),
        })?;

        Ok((0..device.batteries.len().min(MAX_PACKS))
            .filter_map(|i| latest.battery(i))
            .map(BatterySnapshot::from)
            .collect())
    }

    async fn fetch_parameters(&self, device: &DeviceRecord) -> Result<ParameterSnapshot, CoreError> {
        let details = self
            .client
            .device_details(device.plant_id, &device.serial)
            .await?;

        match details.datas.as_slice() {
            [entry] => Ok(ParameterSnapshot::from(entry)),
            rows => Err(CoreError::Decode {
                message: format!(
                    "expected one detail row for {}, got {}",
                    device.serial,
                    rows.len()
                ),
            }),
        }
    }
}
