// ── MQTT device sink ──
//
// Serializes snapshots to JSON and publishes them under the topic prefix.
// A snapshot that fails to serialize is logged and skipped; broker client
// failures surface as `CoreError::Sink` for the poller to log. With discovery
// enabled, every device list change also announces the devices to Home
// Assistant.

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use nexa_core::{BatterySnapshot, CoreError, DeviceRecord, DeviceSink, ParameterSnapshot, StatusSnapshot};

use super::bus::{BusClient, BusError};
use super::discovery::Discovery;
use super::topics::Topics;

pub struct MqttSink<B> {
    bus: B,
    topics: Topics,
    discovery: Option<Discovery>,
    /// Command topics currently subscribed.
    subscribed: Mutex<Vec<String>>,
    /// Last device list, kept for discovery re-announcements.
    devices: Mutex<Vec<DeviceRecord>>,
}

impl<B: BusClient> MqttSink<B> {
    pub fn new(bus: B, topics: Topics) -> Self {
        Self {
            bus,
            topics,
            discovery: None,
            subscribed: Mutex::new(Vec::new()),
            devices: Mutex::new(Vec::new()),
        }
    }

    pub fn with_discovery(mut self, discovery: Discovery) -> Self {
        self.discovery = Some(discovery);
        self
    }

    /// Publish discovery configs for the current device list. No-op when
    /// discovery is disabled or no devices are known yet.
    pub async fn announce(&self) {
        let Some(discovery) = &self.discovery else {
            return;
        };
        let devices = self.devices.lock().await.clone();
        let mut sent = 0usize;
        for device in &devices {
            for (topic, entity) in discovery.messages(&self.topics, device) {
                match self.publish_json(topic, &entity).await {
                    Ok(()) => sent += 1,
                    Err(e) => warn!(device = %device.serial, error = %e, "discovery publish failed"),
                }
            }
        }
        if !devices.is_empty() {
            info!(devices = devices.len(), entities = sent, "home assistant discovery sent");
        }
    }

    async fn publish_json<T: Serialize + Sync>(&self, topic: String, value: &T) -> Result<(), CoreError> {
        let payload = match serde_json::to_vec(value) {
            Ok(p) => p,
            Err(e) => {
                warn!(%topic, error = %e, "could not serialize payload, not publishing");
                return Ok(());
            }
        };
        debug!(%topic, bytes = payload.len(), "publish");
        self.bus.publish(&topic, payload).await.map_err(sink_error)
    }
}

fn sink_error(err: BusError) -> CoreError {
    CoreError::Sink {
        message: err.to_string(),
    }
}

#[async_trait]
impl<B: BusClient> DeviceSink for MqttSink<B> {
    async fn publish_status(&self, device: &DeviceRecord, status: &StatusSnapshot) -> Result<(), CoreError> {
        self.publish_json(self.topics.status(&device.serial), status)
            .await
    }

    async fn publish_batteries(&self, device: &DeviceRecord, batteries: &[BatterySnapshot]) -> Result<(), CoreError> {
        for (index, battery) in batteries.iter().enumerate() {
            self.publish_json(self.topics.battery(&device.serial, index), battery)
                .await?;
        }
        Ok(())
    }

    async fn publish_parameters(&self, device: &DeviceRecord, parameters: &ParameterSnapshot) -> Result<(), CoreError> {
        self.publish_json(self.topics.parameters(&device.serial), parameters)
            .await
    }

    /// Drop the previous command subscriptions, then subscribe one
    /// `parameters/set` topic per device (plus the Home Assistant status
    /// topic) and announce the devices.
    async fn set_device_list(&self, devices: &[DeviceRecord]) -> Result<(), CoreError> {
        {
            let mut subscribed = self.subscribed.lock().await;

            for topic in subscribed.drain(..) {
                if let Err(e) = self.bus.unsubscribe(&topic).await {
                    warn!(%topic, error = %e, "unsubscribe failed");
                }
            }

            let mut topics: Vec<String> = devices
                .iter()
                .map(|d| self.topics.parameters_set(&d.serial))
                .collect();
            if let Some(discovery) = &self.discovery {
                topics.push(discovery.status_topic());
            }
            for topic in topics {
                self.bus.subscribe(&topic).await.map_err(sink_error)?;
                subscribed.push(topic);
            }
            info!(devices = devices.len(), "subscribed to parameter commands");
        }

        *self.devices.lock().await = devices.to_vec();
        self.announce().await;
        Ok(())
    }
}
