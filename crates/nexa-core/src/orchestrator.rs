// ── Orchestrator ──
//
// Wires a provider, an optional applier and a sink together for the
// lifetime of one bus connection. `attach` enumerates devices, hands the
// list to the sink and starts polling; `detach` stops polling and drops any
// pending parameter change. Parameter snapshots from the poller double as
// the coalescer's baseline, and every apply is followed by an out-of-cycle
// parameter poll of that device.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nexa_api::{AppClient, TransportConfig, WebClient};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::coalescer::ParameterCoalescer;
use crate::config::{ApiMode, PollIntervals, SyncConfig};
use crate::error::CoreError;
use crate::model::{BatterySnapshot, DeviceRecord, ParameterDelta, ParameterSnapshot, StatusSnapshot};
use crate::provider::{AppApiProvider, DeviceProvider, ParameterApplier, WebApiProvider};
use crate::scheduler::{PollCategory, PollingScheduler};
use crate::sink::DeviceSink;

/// Entry point for the bus endpoint.
///
/// Cheaply cloneable via `Arc<OrchestratorInner>`.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<OrchestratorInner>,
}

struct OrchestratorInner {
    provider: Arc<dyn DeviceProvider>,
    applier: Option<Arc<dyn ParameterApplier>>,
    intervals: PollIntervals,
    debounce: Duration,
    attached: Mutex<Option<Attachment>>,
}

struct Attachment {
    scheduler: PollingScheduler,
    coalescer: Option<ParameterCoalescer>,
    refresh: Option<RefreshTask>,
    devices: Arc<Vec<DeviceRecord>>,
}

struct RefreshTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Orchestrator {
    /// `applier` is `None` for read-only setups; parameter submissions are
    /// then rejected with [`CoreError::Unsupported`].
    pub fn new(
        provider: Arc<dyn DeviceProvider>,
        applier: Option<Arc<dyn ParameterApplier>>,
        intervals: PollIntervals,
        debounce: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(OrchestratorInner {
                provider,
                applier,
                intervals,
                debounce,
                attached: Mutex::new(None),
            }),
        }
    }

    /// Build the provider/applier pair selected by `config.api_mode`.
    ///
    /// In `web+app` mode the app client is never logged in up front; its
    /// session logs in on the first write.
    pub fn from_config(config: &SyncConfig) -> Result<Self, CoreError> {
        let transport = TransportConfig::default().with_timeout(config.request_timeout);
        let creds = &config.credentials;

        let app = || -> Result<Arc<AppApiProvider>, CoreError> {
            let client = AppClient::new(
                config.app_url.clone(),
                config.token_url.clone(),
                creds.username.clone(),
                &creds.password,
                &transport,
            )?;
            Ok(Arc::new(AppApiProvider::new(client)))
        };
        let web = || -> Result<Arc<WebApiProvider>, CoreError> {
            let client = WebClient::new(
                config.web_url.clone(),
                creds.username.clone(),
                creds.password.clone(),
                &transport,
            )?;
            Ok(Arc::new(WebApiProvider::new(client)))
        };

        let provider: Arc<dyn DeviceProvider>;
        let applier: Option<Arc<dyn ParameterApplier>>;
        match config.api_mode {
            ApiMode::App => {
                let app = app()?;
                provider = app.clone();
                applier = Some(app);
            }
            ApiMode::Web => {
                provider = web()?;
                applier = None;
            }
            ApiMode::WebApp => {
                provider = web()?;
                applier = Some(app()?);
            }
        }

        debug!(mode = %config.api_mode, "orchestrator configured");
        Ok(Self::new(provider, applier, config.intervals, config.debounce))
    }

    /// Whether parameter changes can be applied.
    pub fn can_apply(&self) -> bool {
        self.inner.applier.is_some()
    }

    pub async fn login(&self) -> Result<(), CoreError> {
        self.inner.provider.login().await
    }

    // ── Attachment lifecycle ─────────────────────────────────────

    /// Enumerate devices, publish the list to `sink` and start polling.
    ///
    /// Enumeration failures are returned; nothing is started in that case.
    /// Attaching while attached replaces the previous attachment.
    pub async fn attach(&self, sink: Arc<dyn DeviceSink>) -> Result<Vec<DeviceRecord>, CoreError> {
        let mut attached = self.inner.attached.lock().await;
        if let Some(previous) = attached.take() {
            previous.shutdown().await;
        }

        let devices = self.inner.provider.enumerate_devices().await?;
        info!(
            provider = self.inner.provider.name(),
            devices = devices.len(),
            "devices enumerated"
        );
        sink.set_device_list(&devices).await?;

        let (refresh_tx, refresh_rx) = mpsc::unbounded_channel();
        let coalescer = self.inner.applier.as_ref().map(|applier| {
            ParameterCoalescer::with_refresh(
                Arc::clone(applier),
                Arc::clone(&sink),
                self.inner.debounce,
                refresh_tx.clone(),
            )
        });
        drop(refresh_tx);
        let poll_sink = Arc::new(BaselineSink {
            sink,
            coalescer: coalescer.clone(),
        });
        let scheduler = PollingScheduler::new(
            Arc::clone(&self.inner.provider),
            poll_sink,
            self.inner.intervals,
        );
        scheduler.start(devices.clone()).await;

        let refresh = coalescer.is_some().then(|| {
            let cancel = CancellationToken::new();
            let handle = tokio::spawn(refresh_loop(scheduler.clone(), refresh_rx, cancel.clone()));
            RefreshTask { cancel, handle }
        });

        *attached = Some(Attachment {
            scheduler,
            coalescer,
            refresh,
            devices: Arc::new(devices.clone()),
        });
        Ok(devices)
    }

    /// Stop polling and discard pending parameter changes. Idempotent.
    pub async fn detach(&self) {
        if let Some(attachment) = self.inner.attached.lock().await.take() {
            attachment.shutdown().await;
            info!("detached");
        }
    }

    pub async fn is_attached(&self) -> bool {
        self.inner.attached.lock().await.is_some()
    }

    /// Devices of the current attachment; empty when detached.
    pub async fn devices(&self) -> Arc<Vec<DeviceRecord>> {
        self.inner
            .attached
            .lock()
            .await
            .as_ref()
            .map_or_else(|| Arc::new(Vec::new()), |a| Arc::clone(&a.devices))
    }

    /// Queue a partial parameter change for the device with `serial`.
    pub async fn submit_parameters(&self, serial: &str, delta: ParameterDelta) -> Result<(), CoreError> {
        if !self.can_apply() {
            return Err(CoreError::Unsupported {
                operation: "parameter changes in web api mode".into(),
            });
        }

        let (device, coalescer) = {
            let attached = self.inner.attached.lock().await;
            let attachment = attached.as_ref().ok_or(CoreError::Detached)?;
            let coalescer = attachment.coalescer.clone().ok_or(CoreError::Detached)?;
            let device = attachment
                .devices
                .iter()
                .find(|d| d.serial == serial)
                .cloned()
                .ok_or_else(|| CoreError::UnknownDevice {
                    serial: serial.to_owned(),
                })?;
            (device, coalescer)
        };

        if delta.is_empty() {
            debug!(device = %serial, "ignoring empty parameter change");
            return Ok(());
        }
        coalescer.submit(&device, delta).await;
        Ok(())
    }
}

impl Attachment {
    async fn shutdown(self) {
        self.scheduler.stop().await;
        if let Some(refresh) = self.refresh {
            refresh.cancel.cancel();
            if let Err(e) = refresh.handle.await {
                warn!(error = %e, "refresh task panicked");
            }
        }
        if let Some(coalescer) = self.coalescer {
            coalescer.shutdown().await;
        }
    }
}

// ── Post-apply refresh ───────────────────────────────────────────

/// Re-polls the parameters of each device the coalescer applied to.
/// A poll already running completes before cancellation is honored.
async fn refresh_loop(
    scheduler: PollingScheduler,
    mut requests: mpsc::UnboundedReceiver<DeviceRecord>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            request = requests.recv() => match request {
                Some(device) => scheduler.poll_now(PollCategory::Parameter, &device).await,
                None => break,
            },
        }
    }
    debug!("refresh task exited");
}

// ── Baseline capture ─────────────────────────────────────────────

/// Forwards poll results to the real sink, recording every parameter
/// snapshot as the coalescer's baseline first.
struct BaselineSink {
    sink: Arc<dyn DeviceSink>,
    coalescer: Option<ParameterCoalescer>,
}

#[async_trait]
impl DeviceSink for BaselineSink {
    async fn publish_status(&self, device: &DeviceRecord, status: &StatusSnapshot) -> Result<(), CoreError> {
        self.sink.publish_status(device, status).await
    }

    async fn publish_batteries(&self, device: &DeviceRecord, batteries: &[BatterySnapshot]) -> Result<(), CoreError> {
        self.sink.publish_batteries(device, batteries).await
    }

    async fn publish_parameters(&self, device: &DeviceRecord, parameters: &ParameterSnapshot) -> Result<(), CoreError> {
        if let Some(coalescer) = &self.coalescer {
            coalescer.record_baseline(device, parameters).await;
        }
        self.sink.publish_parameters(device, parameters).await
    }

    async fn set_device_list(&self, devices: &[DeviceRecord]) -> Result<(), CoreError> {
        self.sink.set_device_list(devices).await
    }
}
