//! Telemetry lifecycle: turns the three guard signals into subscription
//! open/close calls and folds delivered samples into histories, rates and
//! trends.
//!
//! All state lives in [`TelemetryController`] and is mutated from one place at
//! a time: either direct `&mut self` calls, or the [`TelemetryController::run`]
//! loop which serialises control messages and transport events. Readers only
//! ever see [`ViewState`] snapshots published through a `watch` channel.

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::channel::{Channel, ChannelEvent, ConnectionHandle};
use crate::history::History;
use crate::manager::{Delivery, StreamConnectionManager};
use crate::rate::rate;
use crate::trend::classify;
use crate::types::{LifecycleState, RateSet, Sample, Trend, ViewState};

/// The three external conditions that must all hold for streaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Guards {
    pub viewer_open: bool,
    pub resource_running: bool,
    pub live_requested: bool,
}

impl Guards {
    pub fn all(&self) -> bool {
        self.viewer_open && self.resource_running && self.live_requested
    }
}

impl Default for Guards {
    // Live is on by default so opening the viewer on a running resource streams
    fn default() -> Self {
        Self {
            viewer_open: false,
            resource_running: false,
            live_requested: true,
        }
    }
}

/// Inputs accepted by the run loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Control {
    ViewerOpen(bool),
    ResourceRunning(bool),
    LiveRequested(bool),
    SelectResource(Option<String>),
    Shutdown,
}

pub struct TelemetryController<C: Channel> {
    manager: StreamConnectionManager<C>,
    resource: Option<String>,
    guards: Guards,
    state: LifecycleState,
    handle: Option<ConnectionHandle>,

    // Session data, reset whenever streaming (re)starts
    cpu_hist: History,
    mem_hist: History,
    previous: Option<Sample>,
    rates: Option<RateSet>,
    cpu_trend: Trend,
    mem_trend: Trend,

    // Survives a stop/error so the dashboard can show it as stale
    latest: Option<Sample>,
    last_error: Option<String>,

    view_tx: watch::Sender<ViewState>,
}

impl<C: Channel> TelemetryController<C> {
    pub fn new(channel: C) -> Self {
        let (view_tx, _) = watch::channel(ViewState {
            live_requested: Guards::default().live_requested,
            ..ViewState::default()
        });
        Self {
            manager: StreamConnectionManager::new(channel),
            resource: None,
            guards: Guards::default(),
            state: LifecycleState::Idle,
            handle: None,
            cpu_hist: History::default(),
            mem_hist: History::default(),
            previous: None,
            rates: None,
            cpu_trend: Trend::Flat,
            mem_trend: Trend::Flat,
            latest: None,
            last_error: None,
            view_tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.view_tx.subscribe()
    }

    pub fn view(&self) -> ViewState {
        ViewState {
            resource: self.resource.clone(),
            state: self.state,
            live_requested: self.guards.live_requested,
            latest: self.latest.clone(),
            cpu_history: self.cpu_hist.clone(),
            mem_history: self.mem_hist.clone(),
            rates: self.rates,
            cpu_trend: self.cpu_trend,
            mem_trend: self.mem_trend,
            last_error: self.last_error.clone(),
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn guards(&self) -> Guards {
        self.guards
    }

    pub fn handle(&self) -> Option<ConnectionHandle> {
        self.handle
    }

    pub fn previous_sample(&self) -> Option<&Sample> {
        self.previous.as_ref()
    }

    pub fn set_viewer_open(&mut self, open: bool) {
        self.guards.viewer_open = open;
        if !open {
            // Next opening starts live again
            self.guards.live_requested = true;
        }
        self.reconcile();
        if !open {
            self.latest = None;
            self.rates = None;
        }
        self.publish();
    }

    pub fn set_resource_running(&mut self, running: bool) {
        self.guards.resource_running = running;
        self.reconcile();
        self.publish();
    }

    pub fn set_live_requested(&mut self, live: bool) {
        self.guards.live_requested = live;
        self.reconcile();
        self.publish();
    }

    /// Switch the watched resource. A change while streaming restarts the
    /// session on the new resource.
    pub fn select_resource(&mut self, resource: Option<String>) {
        if self.resource == resource {
            return;
        }
        if self.state == LifecycleState::Streaming {
            self.stop(LifecycleState::Stopped);
        }
        info!(resource = resource.as_deref().unwrap_or("-"), "watched resource changed");
        self.resource = resource;
        self.latest = None;
        self.rates = None;
        self.reconcile();
        self.publish();
    }

    pub fn apply(&mut self, control: Control) {
        match control {
            Control::ViewerOpen(v) => self.set_viewer_open(v),
            Control::ResourceRunning(v) => self.set_resource_running(v),
            Control::LiveRequested(v) => self.set_live_requested(v),
            Control::SelectResource(r) => self.select_resource(r),
            Control::Shutdown => self.set_viewer_open(false),
        }
    }

    /// Process every event already queued by the transport. Returns how many were handled.
    pub fn drain_pending(&mut self) -> usize {
        let mut n = 0;
        while let Some(delivery) = self.manager.try_next_event() {
            self.handle_delivery(delivery);
            n += 1;
        }
        n
    }

    /// Wait for the next transport event and process it.
    pub async fn process_next(&mut self) -> bool {
        match self.manager.next_event().await {
            Some(delivery) => {
                self.handle_delivery(delivery);
                true
            }
            None => false,
        }
    }

    pub fn handle_delivery(&mut self, delivery: Delivery) {
        if self.handle != Some(delivery.handle) {
            debug!(
                generation = delivery.handle.generation(),
                "dropping event from stale subscription"
            );
            return;
        }
        match delivery.event {
            ChannelEvent::Opened => info!(
                resource = self.resource.as_deref().unwrap_or("-"),
                "connected to stats stream"
            ),
            ChannelEvent::Sample(sample) => self.on_sample(sample),
            ChannelEvent::Error(message) => self.on_error(message),
        }
    }

    /// Drive the controller from `controls` and transport events until
    /// `Shutdown` arrives or every control sender is dropped.
    pub async fn run(mut self, mut controls: mpsc::UnboundedReceiver<Control>) {
        loop {
            tokio::select! {
                // Guard changes win over queued samples
                biased;
                control = controls.recv() => match control {
                    Some(Control::Shutdown) | None => {
                        self.apply(Control::Shutdown);
                        break;
                    }
                    Some(control) => self.apply(control),
                },
                Some(delivery) = self.manager.next_event() => self.handle_delivery(delivery),
            }
        }
        debug!("telemetry controller stopped");
    }

    /// Move the controller onto its own task.
    pub fn spawn(self) -> ControllerTask
    where
        C: 'static,
        C::Subscription: 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let view = self.subscribe();
        let join = tokio::spawn(self.run(rx));
        ControllerTask {
            controls: ControlHandle(tx),
            view,
            join,
        }
    }

    fn on_sample(&mut self, sample: Sample) {
        if self.state != LifecycleState::Streaming || !self.guards.all() {
            debug!("sample arrived after guards went false; dropped");
            return;
        }
        if let Some(prev) = &self.previous {
            if sample.timestamp < prev.timestamp {
                warn!(
                    previous = %prev.timestamp,
                    current = %sample.timestamp,
                    "sample timestamp went backwards; restarting session"
                );
                self.reset_session();
            }
        }

        self.cpu_hist = self.cpu_hist.append(sample.cpu_clamped());
        self.mem_hist = self.mem_hist.append(sample.mem_clamped());
        self.rates = rate(&sample, self.previous.as_ref());
        self.cpu_trend = classify(self.cpu_hist.as_slice());
        self.mem_trend = classify(self.mem_hist.as_slice());
        self.previous = Some(sample.clone());
        self.latest = Some(sample);
        self.publish();
    }

    fn on_error(&mut self, message: String) {
        error!(
            resource = self.resource.as_deref().unwrap_or("-"),
            "stats stream error: {message}"
        );
        self.stop(LifecycleState::Errored);
        self.guards.live_requested = false;
        self.last_error = Some(message);
        self.publish();
    }

    fn reconcile(&mut self) {
        let want = self.guards.all() && self.resource.is_some();
        let streaming = self.state == LifecycleState::Streaming;
        if streaming && !want {
            self.stop(LifecycleState::Stopped);
        } else if !streaming && want {
            self.start();
        }
    }

    fn start(&mut self) {
        let Some(resource) = self.resource.clone() else {
            return;
        };
        // Release whatever the manager still holds, tracked or not
        self.handle = None;
        if let Some(stale) = self.manager.active_handle() {
            self.manager.close(stale);
        }
        self.reset_session();
        self.latest = None;
        self.last_error = None;
        match self.manager.open(&resource) {
            Ok(handle) => {
                info!(
                    resource = %resource,
                    generation = handle.generation(),
                    "starting stats stream"
                );
                self.handle = Some(handle);
                self.state = LifecycleState::Streaming;
            }
            // open only fails while a subscription is active, and none is now
            Err(e) => error!(resource = %resource, "could not open stats stream: {e}"),
        }
    }

    fn stop(&mut self, next: LifecycleState) {
        if let Some(handle) = self.handle.take() {
            info!(generation = handle.generation(), "closing stats stream");
            self.manager.close(handle);
        }
        self.reset_session();
        self.state = next;
    }

    fn reset_session(&mut self) {
        self.cpu_hist = self.cpu_hist.clear();
        self.mem_hist = self.mem_hist.clear();
        self.previous = None;
        self.cpu_trend = Trend::Flat;
        self.mem_trend = Trend::Flat;
    }

    fn publish(&self) {
        self.view_tx.send_replace(self.view());
    }
}

/// Cloneable sender for [`Control`] messages to a spawned controller.
#[derive(Debug, Clone)]
pub struct ControlHandle(mpsc::UnboundedSender<Control>);

impl ControlHandle {
    pub fn send(&self, control: Control) -> bool {
        self.0.send(control).is_ok()
    }

    pub fn set_viewer_open(&self, open: bool) -> bool {
        self.send(Control::ViewerOpen(open))
    }

    pub fn set_resource_running(&self, running: bool) -> bool {
        self.send(Control::ResourceRunning(running))
    }

    pub fn set_live_requested(&self, live: bool) -> bool {
        self.send(Control::LiveRequested(live))
    }

    pub fn select_resource(&self, resource: Option<String>) -> bool {
        self.send(Control::SelectResource(resource))
    }

    pub fn shutdown(&self) -> bool {
        self.send(Control::Shutdown)
    }
}

pub struct ControllerTask {
    pub controls: ControlHandle,
    pub view: watch::Receiver<ViewState>,
    pub join: JoinHandle<()>,
}
