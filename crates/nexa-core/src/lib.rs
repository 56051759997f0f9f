// nexa-core: Device synchronization engine between the Growatt cloud and a device sink.
//
// Read side: `PollingScheduler` polls a `DeviceProvider` on three cadences and
// forwards snapshots to a `DeviceSink`. Write side: `ParameterCoalescer`
// debounces partial parameter changes into one apply per device through a
// `ParameterApplier`. `Orchestrator` wires the two together per connection.

pub mod coalescer;
pub mod config;
pub mod convert;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod provider;
pub mod scheduler;
pub mod sink;

// ── Primary re-exports ──────────────────────────────────────────────
pub use coalescer::ParameterCoalescer;
pub use config::{ApiMode, GrowattCredentials, PollIntervals, SyncConfig};
pub use error::CoreError;
pub use orchestrator::Orchestrator;
pub use provider::{AppApiProvider, DeviceProvider, ParameterApplier, WebApiProvider};
pub use scheduler::{PollCategory, PollingScheduler};
pub use sink::DeviceSink;

pub use model::{
    BatterySnapshot, DeviceRecord, Field, FieldGroup, OnOff, ParameterDelta, ParameterSnapshot,
    Parameters, StatusSnapshot, WorkMode,
};
