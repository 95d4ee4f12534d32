//! Background jobs run by the server

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use domain_claims::{ClaimService, TimebarSweep};

/// Runs the time-bar sweep every `period` until the task is aborted
///
/// The first run happens one period after start. A failed run is logged and
/// the loop carries on.
pub fn spawn_timebar_sweep(service: Arc<ClaimService>, period: Duration, warning_days: i64) -> JoinHandle<()> {
    info!(period_secs = period.as_secs(), warning_days, "starting time-bar sweep");
    let sweep = TimebarSweep::new(service).with_warning_days(warning_days);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if let Err(e) = sweep.run().await {
                error!(error = %e, "time-bar sweep failed");
            }
        }
    })
}
