//! Background sweep of the failure-window table.
//!
//! Clients that fail and then go quiet would otherwise keep their window
//! entry forever. This job periodically drops keys whose failures have all
//! aged out of the window.

use crate::auth::AbuseGuard;
use crate::service::AuthService;
use std::sync::Arc;
use std::time::Duration;

/// Run the sweep loop.
///
/// Sweeps the abuse guard every `interval`. Never returns.
pub async fn run_sweep_loop(service: Arc<AuthService>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;
        sweep_once(service.guard());
    }
}

fn sweep_once(guard: &AbuseGuard) -> usize {
    let removed = guard.sweep();
    if removed > 0 {
        tracing::info!(
            removed,
            tracked = guard.tracked_clients(),
            "Sweep job completed"
        );
    }
    removed
}
