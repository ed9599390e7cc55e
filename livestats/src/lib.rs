//! Live resource telemetry for the container-details dashboard.
//!
//! Streams samples for one resource over a push channel, keeps bounded cpu/mem
//! histories, derives I/O rates from cumulative counters and labels trends.
//! [`controller::TelemetryController`] is the only entry point collaborators
//! need; everything else is exposed for transports and tests.

pub mod channel;
pub mod controller;
pub mod history;
pub mod manager;
pub mod rate;
pub mod trend;
pub mod types;
pub mod wire;
pub mod ws;

pub use channel::{Channel, ChannelEvent, ConnectionHandle, EventSink, Subscription};
pub use controller::{Control, ControlHandle, ControllerTask, Guards, TelemetryController};
pub use history::{History, HISTORY_CAP};
pub use manager::{Delivery, ManagerError, StreamConnectionManager};
pub use types::{LifecycleState, RateSet, Sample, Trend, ViewState};
pub use ws::WsChannel;
