//! Scheduler loop: one wave of probes per interval.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::ProbeError;
use crate::result::ProbeResult;
use crate::scope::{ServiceScope, WaveScope};
use crate::transport::Transport;
use crate::worker::probe_url;

/// Drives waves until the service scope is cancelled.
///
/// Each wave spawns one worker per endpoint, sleeps the full interval and
/// then joins the wave before the next one launches. Worker requests are
/// bounded by the wave deadline, so the join only waits on result delivery.
pub(crate) struct Scheduler {
    pub(crate) endpoints: Arc<[String]>,
    pub(crate) interval: Duration,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) results: mpsc::Sender<ProbeResult>,
    pub(crate) scope: ServiceScope,
    /// Caps concurrently probing workers when set.
    pub(crate) permits: Option<Arc<Semaphore>>,
}

impl Scheduler {
    pub(crate) async fn run(self) {
        info!(
            endpoints = self.endpoints.len(),
            interval_ms = self.interval.as_millis() as u64,
            "scheduler started"
        );

        let mut wave: u64 = 0;
        while !self.scope.is_cancelled() {
            if self.results.is_closed() {
                info!("result receiver dropped, scheduler stopping");
                break;
            }

            wave += 1;
            let workers = self.launch_wave(wave);

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = self.scope.cancelled() => {
                    debug!(wave, "cancelled mid-wave");
                }
            }

            join_wave(wave, workers).await;
        }

        info!(waves = wave, "scheduler stopped");
    }

    fn launch_wave(&self, wave: u64) -> JoinSet<()> {
        let scope = self.scope.wave(self.interval);
        let mut workers = JoinSet::new();

        for url in self.endpoints.iter() {
            let url = url.clone();
            let scope = scope.clone();
            let transport = Arc::clone(&self.transport);
            let results = self.results.clone();
            let permits = self.permits.clone();

            workers.spawn(async move {
                let result = run_worker(transport.as_ref(), &scope, &url, permits.as_deref())
                    .await
                    .in_wave(wave);
                if results.send(result).await.is_err() {
                    debug!(%url, wave, "result receiver dropped, discarding probe result");
                }
            });
        }

        debug!(wave, probes = workers.len(), "wave launched");
        workers
    }
}

async fn run_worker(
    transport: &dyn Transport,
    scope: &WaveScope,
    url: &str,
    permits: Option<&Semaphore>,
) -> ProbeResult {
    // Waiting for a permit counts against the wave deadline.
    let _permit = match permits {
        Some(permits) => match scope.run(permits.acquire()).await {
            Ok(Ok(permit)) => Some(permit),
            Ok(Err(_)) => return ProbeResult::failed(url, 0, ProbeError::Cancelled),
            Err(e) => return ProbeResult::failed(url, 0, e),
        },
        None => None,
    };

    probe_url(transport, scope, url).await
}

async fn join_wave(wave: u64, mut workers: JoinSet<()>) {
    while let Some(joined) = workers.join_next().await {
        if let Err(e) = joined {
            warn!(wave, error = %e, "probe worker task failed");
        }
    }
    debug!(wave, "wave joined");
}
