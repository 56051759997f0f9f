// ── Parameter command coalescer ──
//
// Operators send partial parameter changes, often several within a second
// (one per UI control). Each device accumulates them in a pending delta and
// (re)arms a debounce timer. When the timer fires the pending delta is merged
// into the device's baseline, every touched field group is applied once with
// the baseline values of the whole group, and the merged baseline is
// published once. The device is then handed to the refresh channel, if any,
// so the values the cloud actually accepted get polled back.
//
// Per device there is a state mutex (baseline, pending, generation) and an
// async apply gate. The gate serializes applies; a delta that arrives while
// an apply is running lands in `pending` and is picked up by the next fire.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::model::{DeviceRecord, FieldGroup, ParameterDelta, ParameterSnapshot, Parameters};
use crate::provider::ParameterApplier;
use crate::sink::DeviceSink;

/// Debounces parameter deltas into one apply sequence per device.
///
/// Cheaply cloneable; clones share all device state.
#[derive(Clone)]
pub struct ParameterCoalescer {
    inner: Arc<CoalescerInner>,
}

struct CoalescerInner {
    applier: Arc<dyn ParameterApplier>,
    sink: Arc<dyn DeviceSink>,
    debounce: Duration,
    slots: DashMap<String, Arc<DeviceSlot>>,
    refresh: Option<mpsc::UnboundedSender<DeviceRecord>>,
    cancel: CancellationToken,
}

struct DeviceSlot {
    device: DeviceRecord,
    state: Mutex<SlotState>,
    apply_gate: Mutex<()>,
}

#[derive(Default)]
struct SlotState {
    baseline: ParameterSnapshot,
    pending: ParameterDelta,
    /// Bumped on every submit; only the newest timer may fire.
    generation: u64,
    timer: Option<CancellationToken>,
}

impl ParameterCoalescer {
    pub fn new(applier: Arc<dyn ParameterApplier>, sink: Arc<dyn DeviceSink>, debounce: Duration) -> Self {
        Self::build(applier, sink, debounce, None)
    }

    /// Like [`new`](Self::new), but every device that went through an
    /// apply is sent on `refresh` afterwards.
    pub fn with_refresh(
        applier: Arc<dyn ParameterApplier>,
        sink: Arc<dyn DeviceSink>,
        debounce: Duration,
        refresh: mpsc::UnboundedSender<DeviceRecord>,
    ) -> Self {
        Self::build(applier, sink, debounce, Some(refresh))
    }

    fn build(
        applier: Arc<dyn ParameterApplier>,
        sink: Arc<dyn DeviceSink>,
        debounce: Duration,
        refresh: Option<mpsc::UnboundedSender<DeviceRecord>>,
    ) -> Self {
        Self {
            inner: Arc::new(CoalescerInner {
                applier,
                sink,
                debounce,
                slots: DashMap::new(),
                refresh,
                cancel: CancellationToken::new(),
            }),
        }
    }

    /// Queue `delta` for `device` and (re)start its debounce timer.
    pub async fn submit(&self, device: &DeviceRecord, delta: ParameterDelta) {
        if self.inner.cancel.is_cancelled() {
            warn!(device = %device.serial, "coalescer shut down, dropping delta");
            return;
        }

        let slot = self.inner.slot(device);
        let timer = self.inner.cancel.child_token();
        let generation = {
            let mut state = slot.state.lock().await;
            state.pending.merge_from(&delta);
            state.generation += 1;
            if let Some(previous) = state.timer.replace(timer.clone()) {
                previous.cancel();
            }
            state.generation
        };
        debug!(device = %device.serial, generation, "parameter delta queued");

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = timer.cancelled() => {}
                () = tokio::time::sleep(inner.debounce) => inner.fire(&slot, generation).await,
            }
        });
    }

    /// Replace the baseline with a freshly polled snapshot.
    pub async fn record_baseline(&self, device: &DeviceRecord, snapshot: &ParameterSnapshot) {
        let slot = self.inner.slot(device);
        slot.state.lock().await.baseline = snapshot.clone();
    }

    /// The current baseline of `serial`, if the device has been seen.
    pub async fn baseline(&self, serial: &str) -> Option<ParameterSnapshot> {
        let slot = self.inner.slots.get(serial).map(|s| Arc::clone(&*s))?;
        let baseline = slot.state.lock().await.baseline.clone();
        Some(baseline)
    }

    /// Discard all pending deltas and wait for any apply in progress.
    /// Nothing queued after this point is applied.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let slots: Vec<Arc<DeviceSlot>> = self.inner.slots.iter().map(|s| Arc::clone(&*s)).collect();
        for slot in slots {
            {
                let mut state = slot.state.lock().await;
                if !state.pending.is_empty() {
                    info!(device = %slot.device.serial, "discarding pending parameter change");
                }
                state.pending = Parameters::default();
                state.timer = None;
            }
            let _drain = slot.apply_gate.lock().await;
        }
    }
}

impl CoalescerInner {
    fn slot(&self, device: &DeviceRecord) -> Arc<DeviceSlot> {
        let entry = self
            .slots
            .entry(device.serial.clone())
            .or_insert_with(|| {
                Arc::new(DeviceSlot {
                    device: device.clone(),
                    state: Mutex::new(SlotState::default()),
                    apply_gate: Mutex::new(()),
                })
            });
        Arc::clone(&*entry)
    }

    async fn fire(&self, slot: &DeviceSlot, generation: u64) {
        let _gate = slot.apply_gate.lock().await;
        if self.cancel.is_cancelled() {
            return;
        }

        let (merged, touched) = {
            let mut state = slot.state.lock().await;
            if state.generation != generation {
                // A newer submit re-armed the timer while we waited on the gate.
                return;
            }
            state.timer = None;
            if state.pending.is_empty() {
                return;
            }
            let pending = std::mem::take(&mut state.pending);
            state.baseline.merge_from(&pending);
            (state.baseline.clone(), pending.touched_groups())
        };

        let device = &slot.device;
        info!(device = %device.serial, groups = ?touched, "applying parameter change");
        for group in touched {
            self.apply_group(device, group, &merged).await;
        }

        if let Err(e) = self.sink.publish_parameters(device, &merged).await {
            warn!(device = %device.serial, error = %e, "could not publish merged parameters");
        }

        if let Some(refresh) = &self.refresh {
            if refresh.send(device.clone()).is_err() {
                debug!(device = %device.serial, "refresh receiver gone, skipping re-poll");
            }
        }
    }

    /// Apply one group with the baseline values of all its members. A group
    /// with a member the baseline has never seen is skipped.
    async fn apply_group(&self, device: &DeviceRecord, group: FieldGroup, p: &Parameters) {
        let applier = self.applier.as_ref();
        let result = match group {
            FieldGroup::OutputPower => match (p.default_mode.value(), p.default_output_w.value()) {
                (Some(mode), Some(power)) => applier.set_output_power(device, mode, power).await,
                _ => return skip(device, group),
            },
            FieldGroup::ChargingLimits => match (p.charging_limit.value(), p.discharge_limit.value()) {
                (Some(charge), Some(discharge)) => {
                    applier.set_charging_limits(device, charge, discharge).await
                }
                _ => return skip(device, group),
            },
            FieldGroup::AllowGridCharging => match p.allow_grid_charging.value() {
                Some(v) => applier.set_allow_grid_charging(device, v).await,
                None => return skip(device, group),
            },
            FieldGroup::GridConnectionControl => match p.grid_connection_control.value() {
                Some(v) => applier.set_grid_connection_control(device, v).await,
                None => return skip(device, group),
            },
            FieldGroup::AcCouplePowerControl => match p.ac_couple_power_control.value() {
                Some(v) => applier.set_ac_couple_power_control(device, v).await,
                None => return skip(device, group),
            },
            FieldGroup::LightLoadEnable => match p.light_load_enable.value() {
                Some(v) => applier.set_light_load_enable(device, v).await,
                None => return skip(device, group),
            },
            FieldGroup::NeverPowerOff => match p.never_power_off.value() {
                Some(v) => applier.set_never_power_off(device, v).await,
                None => return skip(device, group),
            },
            FieldGroup::AntiBackflow => {
                match (p.anti_backflow_enable.value(), p.anti_backflow_power_percentage.value()) {
                    (Some(enable), Some(pct)) => applier.set_anti_backflow(device, enable, pct).await,
                    _ => return skip(device, group),
                }
            }
        };

        if let Err(e) = result {
            warn!(device = %device.serial, ?group, error = %e, "apply failed");
        }
    }
}

fn skip(device: &DeviceRecord, group: FieldGroup) {
    warn!(
        device = %device.serial,
        ?group,
        "skipping apply: group has a member with no known value"
    );
}
