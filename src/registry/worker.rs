use super::CacheRegistry;
use crate::core::{CacheError, Result};
use crate::dictionary::PersonalizedDictionary;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{Level, event, info_span};

/// Background task running the history decay sweep on a fixed period.
pub struct DecayWorker {
    stop_tx: Option<oneshot::Sender<()>>,
    join_handle: Option<JoinHandle<()>>,
    ticks: Arc<AtomicU64>,
}

impl DecayWorker {
    /// Number of sweeps completed so far, failed ones included.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    /// Signals the worker to stop and waits for it to finish.
    pub async fn stop(mut self) -> Result<()> {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }

        if let Some(join_handle) = self.join_handle.take() {
            join_handle.await.map_err(|err| {
                CacheError::MaintenanceError(format!("decay worker join: {}", err))
            })?;
        }
        Ok(())
    }
}

impl Drop for DecayWorker {
    fn drop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(join_handle) = self.join_handle.take() {
            join_handle.abort();
        }
    }
}

/// Spawn a worker calling `decay_all_history_dictionaries` every `interval`.
///
/// Must be called from within a Tokio runtime. Sweeps run on the blocking
/// pool because they hold the history cache lock across file I/O.
pub fn spawn_decay_worker<H, P>(
    registry: Arc<CacheRegistry<H, P>>,
    interval: Duration,
) -> Result<DecayWorker>
where
    H: PersonalizedDictionary,
    P: PersonalizedDictionary,
{
    if interval.is_zero() {
        return Err(CacheError::ConfigError(
            "decay worker interval must be > 0".to_string(),
        ));
    }
    let runtime = tokio::runtime::Handle::try_current().map_err(|err| {
        CacheError::ConfigError(format!("decay worker needs a Tokio runtime: {}", err))
    })?;

    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
    let ticks = Arc::new(AtomicU64::new(0));
    let ticks_for_worker = Arc::clone(&ticks);

    let join_handle = runtime.spawn(async move {
        loop {
            tokio::select! {
                _ = &mut stop_rx => {
                    break;
                }
                _ = sleep(interval) => {
                    let registry = Arc::clone(&registry);
                    let tick = ticks_for_worker.load(Ordering::SeqCst) + 1;
                    let sweep = tokio::task::spawn_blocking(move || {
                        let span = info_span!("decay_worker.tick", tick = tick);
                        let _enter = span.enter();
                        registry.decay_all_history_dictionaries()
                    })
                    .await;

                    match sweep {
                        Ok(Ok(report)) => event!(
                            Level::DEBUG,
                            decayed = report.decayed,
                            failed = report.failed,
                            stale = report.stale,
                            "history decay sweep finished"
                        ),
                        Ok(Err(err)) => {
                            event!(Level::ERROR, error = %err, "history decay sweep failed")
                        }
                        Err(err) => {
                            event!(Level::ERROR, error = %err, "history decay sweep panicked")
                        }
                    }
                    ticks_for_worker.fetch_add(1, Ordering::SeqCst);
                }
            }
        }
        event!(Level::INFO, "decay worker stopped");
    });

    Ok(DecayWorker {
        stop_tx: Some(stop_tx),
        join_handle: Some(join_handle),
        ticks,
    })
}

impl<H, P> CacheRegistry<H, P>
where
    H: PersonalizedDictionary,
    P: PersonalizedDictionary,
{
    /// Start the worker configured by `decay_worker_interval`, if any.
    pub fn start_decay_worker(self: &Arc<Self>) -> Result<Option<DecayWorker>> {
        self.config()
            .decay_worker_interval
            .map(|interval| spawn_decay_worker(Arc::clone(self), interval))
            .transpose()
    }
}
