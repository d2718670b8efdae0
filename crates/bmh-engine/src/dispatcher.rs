//! The periodic auto-dispatch task.

use std::time::Duration;

use chrono::Utc;
use tokio::{
  sync::watch,
  task::JoinHandle,
  time::{MissedTickBehavior, interval},
};
use tracing::{debug, info, warn};

use crate::Engine;

/// Tick period used when none is configured.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(5);

const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Handle to a running dispatcher. Dropping it also stops the task.
pub struct DispatchHandle {
  shutdown: watch::Sender<bool>,
  task:     JoinHandle<()>,
}

impl DispatchHandle {
  /// Stop ticking and wait for an in-flight pass to finish.
  pub async fn stop(self) {
    self.shutdown.send(true).ok();
    if let Err(e) = self.task.await {
      warn!(error = %e, "dispatcher task ended abnormally");
    }
  }
}

/// Start running [`Engine::dispatch_tick`] every `period`.
///
/// The first pass happens one full period after the call. There is no backoff;
/// every tick fires on the same fixed cadence.
pub fn spawn(engine: Engine, period: Duration) -> DispatchHandle {
  let period = period.max(MIN_PERIOD);
  let (shutdown, mut stopped) = watch::channel(false);

  let task = tokio::spawn(async move {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // Skip the immediate first tick.
    ticker.tick().await;

    info!(period_ms = period.as_millis() as u64, "dispatcher started");

    loop {
      tokio::select! {
        _ = ticker.tick() => {
          let assigned = engine.dispatch_tick(Utc::now()).await;
          debug!(assigned = assigned.len(), "dispatch tick");
        }
        _ = stopped.changed() => break,
      }
    }

    info!("dispatcher stopped");
  });

  DispatchHandle { shutdown, task }
}
