// Recording fakes shared by the core integration tests.
#![allow(dead_code, clippy::unwrap_used)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use nexa_core::{
    BatterySnapshot, CoreError, DeviceProvider, DeviceRecord, DeviceSink, OnOff, ParameterApplier,
    ParameterSnapshot, StatusSnapshot, WorkMode,
};

// ── Sink ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Published {
    Status(String, StatusSnapshot),
    Batteries(String, Vec<BatterySnapshot>),
    Parameters(String, ParameterSnapshot),
    DeviceList(Vec<String>),
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Published>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<Published> {
        self.events.lock().unwrap().clone()
    }

    pub fn parameters(&self) -> Vec<ParameterSnapshot> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Published::Parameters(_, p) => Some(p),
                _ => None,
            })
            .collect()
    }

    pub fn statuses_for(&self, serial: &str) -> Vec<StatusSnapshot> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Published::Status(s, status) if s == serial => Some(status),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: Published) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl DeviceSink for RecordingSink {
    async fn publish_status(&self, device: &DeviceRecord, status: &StatusSnapshot) -> Result<(), CoreError> {
        self.push(Published::Status(device.serial.clone(), status.clone()));
        Ok(())
    }

    async fn publish_batteries(&self, device: &DeviceRecord, batteries: &[BatterySnapshot]) -> Result<(), CoreError> {
        self.push(Published::Batteries(device.serial.clone(), batteries.to_vec()));
        Ok(())
    }

    async fn publish_parameters(&self, device: &DeviceRecord, parameters: &ParameterSnapshot) -> Result<(), CoreError> {
        self.push(Published::Parameters(device.serial.clone(), parameters.clone()));
        Ok(())
    }

    async fn set_device_list(&self, devices: &[DeviceRecord]) -> Result<(), CoreError> {
        self.push(Published::DeviceList(
            devices.iter().map(|d| d.serial.clone()).collect(),
        ));
        Ok(())
    }
}

// ── Applier ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    OutputPower(WorkMode, f64),
    ChargingLimits(f64, f64),
    Toggle(&'static str, OnOff),
    AntiBackflow(OnOff, f64),
}

/// Records every call. Calls whose name is in `failing` return an API
/// error; every call takes `delay` first.
#[derive(Default)]
pub struct RecordingApplier {
    calls: Mutex<Vec<Applied>>,
    failing: HashSet<&'static str>,
    delay: Duration,
}

impl RecordingApplier {
    pub fn failing(names: &[&'static str]) -> Self {
        Self {
            failing: names.iter().copied().collect(),
            ..Self::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Applied> {
        self.calls.lock().unwrap().clone()
    }

    async fn record(&self, name: &'static str, call: Applied) -> Result<(), CoreError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.calls.lock().unwrap().push(call);
        if self.failing.contains(name) {
            return Err(CoreError::Api {
                message: format!("{name} rejected"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ParameterApplier for RecordingApplier {
    async fn set_output_power(&self, _: &DeviceRecord, mode: WorkMode, power_w: f64) -> Result<(), CoreError> {
        self.record("output_power", Applied::OutputPower(mode, power_w)).await
    }

    async fn set_charging_limits(&self, _: &DeviceRecord, charge: f64, discharge: f64) -> Result<(), CoreError> {
        self.record("charging_limits", Applied::ChargingLimits(charge, discharge))
            .await
    }

    async fn set_allow_grid_charging(&self, _: &DeviceRecord, value: OnOff) -> Result<(), CoreError> {
        self.record("allow_grid_charging", Applied::Toggle("allow_grid_charging", value))
            .await
    }

    async fn set_grid_connection_control(&self, _: &DeviceRecord, value: OnOff) -> Result<(), CoreError> {
        self.record(
            "grid_connection_control",
            Applied::Toggle("grid_connection_control", value),
        )
        .await
    }

    async fn set_ac_couple_power_control(&self, _: &DeviceRecord, value: OnOff) -> Result<(), CoreError> {
        self.record(
            "ac_couple_power_control",
            Applied::Toggle("ac_couple_power_control", value),
        )
        .await
    }

    async fn set_light_load_enable(&self, _: &DeviceRecord, value: OnOff) -> Result<(), CoreError> {
        self.record("light_load_enable", Applied::Toggle("light_load_enable", value))
            .await
    }

    async fn set_never_power_off(&self, _: &DeviceRecord, value: OnOff) -> Result<(), CoreError> {
        self.record("never_power_off", Applied::Toggle("never_power_off", value))
            .await
    }

    async fn set_anti_backflow(&self, _: &DeviceRecord, enable: OnOff, pct: f64) -> Result<(), CoreError> {
        self.record("anti_backflow", Applied::AntiBackflow(enable, pct))
            .await
    }
}

// ── Provider ────────────────────────────────────────────────────────

/// Serves fixed snapshots. Devices in `failing` error on every fetch.
/// Status fetches take `status_delay` first.
#[derive(Default)]
pub struct FakeProvider {
    pub devices: Vec<DeviceRecord>,
    pub failing: HashSet<String>,
    pub parameters: HashMap<String, ParameterSnapshot>,
    pub fail_enumeration: bool,
    pub status_delay: Duration,
    pub parameter_fetches: AtomicUsize,
}

impl FakeProvider {
    pub fn with_devices(serials: &[&str]) -> Self {
        Self {
            devices: serials
                .iter()
                .enumerate()
                .map(|(i, s)| DeviceRecord::new(i64::try_from(i).unwrap() + 1, *s).with_battery_count(1))
                .collect(),
            ..Self::default()
        }
    }

    pub fn parameter_fetch_count(&self) -> usize {
        self.parameter_fetches.load(Ordering::SeqCst)
    }

    fn check(&self, device: &DeviceRecord) -> Result<(), CoreError> {
        if self.failing.contains(&device.serial) {
            return Err(CoreError::Transport {
                message: format!("{} unreachable", device.serial),
            });
        }
        Ok(())
    }
}

pub fn status_of(serial: &str) -> StatusSnapshot {
    StatusSnapshot {
        ac_w: 400.0,
        solar_w: 620.0,
        soc: 55.0,
        charge_w: 220.0,
        battery_num: 1,
        status: format!("ok-{serial}"),
        ..StatusSnapshot::default()
    }
}

#[async_trait]
impl DeviceProvider for FakeProvider {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn login(&self) -> Result<(), CoreError> {
        Ok(())
    }

    async fn enumerate_devices(&self) -> Result<Vec<DeviceRecord>, CoreError> {
        if self.fail_enumeration || self.devices.is_empty() {
            return Err(CoreError::Enumeration {
                message: "no NEXA devices found".into(),
            });
        }
        Ok(self.devices.clone())
    }

    async fn fetch_status(&self, device: &DeviceRecord) -> Result<StatusSnapshot, CoreError> {
        if !self.status_delay.is_zero() {
            tokio::time::sleep(self.status_delay).await;
        }
        self.check(device)?;
        Ok(status_of(&device.serial))
    }

    async fn fetch_batteries(&self, device: &DeviceRecord) -> Result<Vec<BatterySnapshot>, CoreError> {
        self.check(device)?;
        Ok(vec![BatterySnapshot {
            serial: format!("{}-bat", device.serial),
            soc: 55.0,
            temp: 21.0,
        }])
    }

    async fn fetch_parameters(&self, device: &DeviceRecord) -> Result<ParameterSnapshot, CoreError> {
        self.parameter_fetches.fetch_add(1, Ordering::SeqCst);
        self.check(device)?;
        Ok(self
            .parameters
            .get(&device.serial)
            .cloned()
            .unwrap_or_default())
    }
}
