// ── Polling scheduler ──
//
// Three independent loops (status, battery detail, parameters), each with its
// own timer. A tick visits every device sequentially in enumeration order and
// forwards what it fetched to the sink. A failing device is logged and
// skipped; the loop carries on. Cancellation is checked between devices, so
// a request already on the wire always completes.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::PollIntervals;
use crate::error::CoreError;
use crate::model::DeviceRecord;
use crate::provider::DeviceProvider;
use crate::sink::DeviceSink;

/// What a poll loop fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PollCategory {
    Status,
    Battery,
    Parameter,
}

impl PollCategory {
    pub const ALL: [Self; 3] = [Self::Status, Self::Battery, Self::Parameter];

    fn period(self, intervals: &PollIntervals) -> Duration {
        let period = match self {
            Self::Status => intervals.status,
            Self::Battery => intervals.battery,
            Self::Parameter => intervals.parameter,
        };
        // tokio::time::interval panics on zero
        period.max(Duration::from_millis(1))
    }
}

impl fmt::Display for PollCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Status => "status",
            Self::Battery => "battery",
            Self::Parameter => "parameter",
        })
    }
}

// ── PollingScheduler ─────────────────────────────────────────────

/// Owns the device list and the three poll loops.
///
/// Cheaply cloneable; clones share the same loops.
#[derive(Clone)]
pub struct PollingScheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    provider: Arc<dyn DeviceProvider>,
    sink: Arc<dyn DeviceSink>,
    intervals: PollIntervals,
    devices: ArcSwap<Vec<DeviceRecord>>,
    running: Mutex<Option<Running>>,
}

struct Running {
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl PollingScheduler {
    pub fn new(provider: Arc<dyn DeviceProvider>, sink: Arc<dyn DeviceSink>, intervals: PollIntervals) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                provider,
                sink,
                intervals,
                devices: ArcSwap::from_pointee(Vec::new()),
                running: Mutex::new(None),
            }),
        }
    }

    pub fn devices(&self) -> Arc<Vec<DeviceRecord>> {
        self.inner.devices.load_full()
    }

    pub async fn is_running(&self) -> bool {
        self.inner.running.lock().await.is_some()
    }

    /// Start the three loops over `devices`. The first tick of each loop
    /// fires immediately. Restarting replaces any loops already running.
    pub async fn start(&self, devices: Vec<DeviceRecord>) {
        let mut running = self.inner.running.lock().await;
        if let Some(previous) = running.take() {
            previous.shutdown().await;
        }

        self.inner.devices.store(Arc::new(devices));

        let cancel = CancellationToken::new();
        let handles = PollCategory::ALL
            .iter()
            .map(|&category| {
                let inner = Arc::clone(&self.inner);
                let cancel = cancel.clone();
                tokio::spawn(poll_loop(inner, category, cancel))
            })
            .collect();

        info!(
            provider = self.inner.provider.name(),
            devices = self.inner.devices.load().len(),
            status_secs = self.inner.intervals.status.as_secs(),
            battery_secs = self.inner.intervals.battery.as_secs(),
            parameter_secs = self.inner.intervals.parameter.as_secs(),
            "polling started"
        );
        *running = Some(Running { cancel, handles });
    }

    /// Cancel all loops and wait until they have exited. A device poll in
    /// flight finishes first.
    pub async fn stop(&self) {
        if let Some(running) = self.inner.running.lock().await.take() {
            running.shutdown().await;
            info!("polling stopped");
        }
    }

    /// Poll one category of a single device right away, outside the loops.
    /// Errors are logged like a failed tick.
    pub async fn poll_now(&self, category: PollCategory, device: &DeviceRecord) {
        debug!(%category, device = %device.serial, "out-of-cycle poll");
        if let Err(e) = self.inner.poll_device(category, device).await {
            warn!(%category, device = %device.serial, error = %e, "poll failed");
        }
    }
}

impl Running {
    async fn shutdown(self) {
        self.cancel.cancel();
        for handle in self.handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "poll loop panicked");
            }
        }
    }
}

impl SchedulerInner {
    async fn poll_category(&self, category: PollCategory, cancel: &CancellationToken) {
        let devices = self.devices.load_full();
        for device in devices.iter() {
            if cancel.is_cancelled() {
                debug!(%category, "poll pass cancelled");
                return;
            }
            if let Err(e) = self.poll_device(category, device).await {
                warn!(%category, device = %device.serial, error = %e, "poll failed");
            }
        }
    }

    async fn poll_device(&self, category: PollCategory, device: &DeviceRecord) -> Result<(), CoreError> {
        match category {
            PollCategory::Status => {
                let status = self.provider.fetch_status(device).await?;
                self.sink.publish_status(device, &status).await
            }
            PollCategory::Battery => {
                let batteries = self.provider.fetch_batteries(device).await?;
                self.sink.publish_batteries(device, &batteries).await
            }
            PollCategory::Parameter => {
                let parameters = self.provider.fetch_parameters(device).await?;
                self.sink.publish_parameters(device, &parameters).await
            }
        }
    }
}

// ── Background task ──────────────────────────────────────────────

async fn poll_loop(inner: Arc<SchedulerInner>, category: PollCategory, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(category.period(&inner.intervals));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => inner.poll_category(category, &cancel).await,
        }
    }
    debug!(%category, "poll loop exited");
}
