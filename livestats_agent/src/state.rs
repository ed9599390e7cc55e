//! Shared agent state: sysinfo handles and stream settings.

use std::sync::Arc;
use std::time::Duration;

use sysinfo::{CpuRefreshKind, MemoryRefreshKind, Networks, RefreshKind, System};
use tokio::sync::Mutex;

pub type SharedSystem = Arc<Mutex<System>>;
pub type SharedNetworks = Arc<Mutex<Networks>>;

#[derive(Clone)]
pub struct AppState {
    // Persistent sysinfo handles; process CPU% needs the previous refresh to diff against
    pub sys: SharedSystem,
    pub networks: SharedNetworks,
    pub cores: usize,

    // Time between samples on every stream
    pub interval: Duration,
}

impl AppState {
    pub fn new(interval: Duration) -> Self {
        let refresh_kind = RefreshKind::nothing()
            .with_cpu(CpuRefreshKind::everything())
            .with_memory(MemoryRefreshKind::nothing().with_ram());
        let sys = System::new_with_specifics(refresh_kind);
        let cores = sys.cpus().len().max(1);
        Self {
            sys: Arc::new(Mutex::new(sys)),
            networks: Arc::new(Mutex::new(Networks::new_with_refreshed_list())),
            cores,
            interval,
        }
    }
}
