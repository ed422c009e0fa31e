use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::dispatch::{run_daily_loop, run_interval_loop, LocalClock};
use crate::helpers::format_duration_human;
use crate::state::State;

pub(crate) fn spawn_daily_loop(state: &Arc<State>, cancel: &CancellationToken) -> JoinHandle<()> {
    let times: Vec<String> = state
        .config
        .checkpoints
        .iter()
        .map(|t| t.format("%H:%M").to_string())
        .collect();
    info!("Weather broadcasts at {}", times.join(", "));
    tokio::spawn(run_daily_loop(
        Arc::clone(state),
        Arc::new(LocalClock),
        cancel.child_token(),
    ))
}

pub(crate) fn spawn_interval_loop(state: &Arc<State>, cancel: &CancellationToken) -> JoinHandle<()> {
    let period = state.config.broadcast_interval;
    info!(
        "Content broadcasts every {}",
        format_duration_human(period.as_secs())
    );
    tokio::spawn(run_interval_loop(Arc::clone(state), period, cancel.child_token()))
}

/// Wait for spawned loops to finish. A loop that panicked is logged; returns how many did.
pub(crate) async fn wait_for_loops(loops: Vec<(&'static str, JoinHandle<()>)>) -> usize {
    let mut crashed = 0;
    for (name, handle) in loops {
        if let Err(e) = handle.await {
            error!("{name} broadcast loop crashed: {e}");
            crashed += 1;
        }
    }
    crashed
}

/// Cancel `cancel` on Ctrl-C or SIGTERM.
pub(crate) fn spawn_shutdown_handler(cancel: &CancellationToken) {
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Shutdown signal received");
                    cancel.cancel();
                }
                Err(e) => error!("Failed to listen for ctrl-c: {e}"),
            }
        });
    }

    #[cfg(unix)]
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let mut sig =
                match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(sig) => sig,
                    Err(e) => {
                        error!("Failed to register SIGTERM handler: {e}");
                        return;
                    }
                };
            sig.recv().await;
            info!("SIGTERM received");
            cancel.cancel();
        });
    }
}
