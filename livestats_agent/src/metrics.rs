//! Per-process sample collection using sysinfo.

use chrono::Utc;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate};
use tracing::debug;

use crate::state::AppState;
use crate::types::Sample;

/// Refresh `pid`'s CPU counters once so the next reading has a baseline to
/// diff against. sysinfo reports 0% for a process seen only once.
pub async fn prime_cpu(state: &AppState, pid: u32) {
    let pid = Pid::from_u32(pid);
    let mut sys = state.sys.lock().await;
    sys.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[pid]),
        true,
        ProcessRefreshKind::nothing().with_cpu(),
    );
}

/// Read one sample for `pid`, or `None` when the process is gone.
///
/// Network counters are host-wide: per-process network totals are not
/// available portably.
pub async fn collect_sample(state: &AppState, pid: u32) -> Option<Sample> {
    let pid = Pid::from_u32(pid);
    let (cpu_raw, mem_usage, mem_limit, block_input, block_output) = {
        let mut sys = state.sys.lock().await;
        let kind = ProcessRefreshKind::nothing()
            .with_cpu()
            .with_memory()
            .with_disk_usage();
        sys.refresh_processes_specifics(ProcessesToUpdate::Some(&[pid]), true, kind);
        sys.refresh_memory();
        let proc_ = sys.process(pid)?;
        let disk = proc_.disk_usage();
        (
            proc_.cpu_usage(),
            proc_.memory(),
            sys.total_memory(),
            disk.total_read_bytes,
            disk.total_written_bytes,
        )
    };

    let (net_input, net_output) = {
        let mut nets = state.networks.lock().await;
        nets.refresh(true);
        nets.iter().fold((0u64, 0u64), |(rx, tx), (_, data)| {
            (
                rx.saturating_add(data.total_received()),
                tx.saturating_add(data.total_transmitted()),
            )
        })
    };

    // sysinfo reports per-process CPU on a per-core scale (N cores => up to N*100%)
    let cpu_percent = (f64::from(cpu_raw) / state.cores as f64).clamp(0.0, 100.0);
    let mem_percent = if mem_limit == 0 {
        0.0
    } else {
        (mem_usage as f64 / mem_limit as f64 * 100.0).clamp(0.0, 100.0)
    };
    debug!(%pid, cpu_percent, mem_usage, "sampled process");

    Some(Sample {
        timestamp: Utc::now(),
        cpu_percent,
        mem_usage,
        mem_limit,
        mem_percent,
        net_input,
        net_output,
        block_input,
        block_output,
    })
}
