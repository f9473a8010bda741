//! Probe service — lifecycle around the scheduler loop.
//!
//! A [`ProbeService`] owns the service cancellation scope, the transport,
//! and both ends of the result channel until they are handed out. The
//! scheduler runs as a background task between `start()` and `close()`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::ProbeConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::result::ProbeResult;
use crate::scheduler::Scheduler;
use crate::scope::{CancelHandle, ServiceScope, service_scope};
use crate::transport::{HyperTransport, Transport};

/// Receiving end of the result channel.
pub type ResultReceiver = mpsc::Receiver<ProbeResult>;

/// Boxed future returned by [`Prober::close`].
pub type CloseFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Capacity of the result channel. Producers wait for the consumer.
const RESULT_CHANNEL_CAPACITY: usize = 1;

/// Something that streams probe results.
///
/// The consumer asks for [`results`](Prober::results), calls
/// [`start`](Prober::start), reads until the channel yields `None`, and
/// calls [`close`](Prober::close) to stop.
pub trait Prober: Send {
    /// Begin probing. Call at most once.
    fn start(&mut self) -> ServiceResult<()>;

    /// Stop probing and drain in-flight probes. Once it resolves the result
    /// channel is closed or closing; repeated calls are no-ops.
    fn close(&mut self) -> CloseFuture<'_>;

    /// Take the result receiver. Returns `None` after the first call.
    fn results(&mut self) -> Option<ResultReceiver>;
}

/// Lifecycle of a [`ProbeService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Created,
    Running,
    Closing,
    Closed,
}

/// Periodically probes a fixed list of endpoints.
///
/// Dropping the service without closing it cancels its scope; the
/// scheduler then winds down on its own.
pub struct ProbeService {
    endpoints: Arc<[String]>,
    interval: Duration,
    grace: Duration,
    max_concurrency: Option<usize>,
    transport: Arc<dyn Transport>,
    state: ServiceState,
    cancel: CancelHandle,
    scope: ServiceScope,
    results_tx: Option<mpsc::Sender<ProbeResult>>,
    results_rx: Option<ResultReceiver>,
    scheduler: Option<JoinHandle<()>>,
}

impl ProbeService {
    /// Create a service using the default hyper transport.
    pub fn new(config: ProbeConfig) -> ServiceResult<Self> {
        let transport = HyperTransport::new(&config.transport)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a service with an injected transport.
    pub fn with_transport(config: ProbeConfig, transport: Arc<dyn Transport>) -> ServiceResult<Self> {
        config.validate()?;

        let (cancel, scope) = service_scope();
        let (tx, rx) = mpsc::channel(RESULT_CHANNEL_CAPACITY);

        Ok(Self {
            endpoints: config.endpoints.into(),
            interval: config.interval,
            grace: config.grace,
            max_concurrency: config.max_concurrency,
            transport,
            state: ServiceState::Created,
            cancel,
            scope,
            results_tx: Some(tx),
            results_rx: Some(rx),
            scheduler: None,
        })
    }

    pub fn state(&self) -> ServiceState {
        self.state
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Prober for ProbeService {
    fn start(&mut self) -> ServiceResult<()> {
        match self.state {
            ServiceState::Created => {}
            ServiceState::Running => return Err(ServiceError::AlreadyStarted),
            ServiceState::Closing | ServiceState::Closed => return Err(ServiceError::Closed),
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|_| ServiceError::NoRuntime)?;
        let results = self.results_tx.take().ok_or(ServiceError::AlreadyStarted)?;

        let scheduler = Scheduler {
            endpoints: Arc::clone(&self.endpoints),
            interval: self.interval,
            transport: Arc::clone(&self.transport),
            results,
            scope: self.scope.clone(),
            permits: self.max_concurrency.map(|n| Arc::new(Semaphore::new(n))),
        };
        self.scheduler = Some(runtime.spawn(scheduler.run()));
        self.state = ServiceState::Running;

        info!(
            endpoints = self.endpoints.len(),
            interval_ms = self.interval.as_millis() as u64,
            "probe service started"
        );
        Ok(())
    }

    fn close(&mut self) -> CloseFuture<'_> {
        Box::pin(async move {
            match self.state {
                ServiceState::Running => {}
                ServiceState::Created => {
                    // No scheduler holds a sender yet; dropping ours closes the channel.
                    self.results_tx = None;
                    self.cancel.cancel();
                    self.transport.close_idle();
                    self.state = ServiceState::Closed;
                    debug!("closed before start, nothing to drain");
                    return;
                }
                ServiceState::Closing | ServiceState::Closed => return,
            }

            self.state = ServiceState::Closing;
            info!(grace_ms = self.grace.as_millis() as u64, "probe service closing");

            self.cancel.cancel();
            self.transport.close_idle();

            // The channel closes once the scheduler and every worker have
            // dropped their senders.
            if let Some(mut scheduler) = self.scheduler.take() {
                match tokio::time::timeout(self.grace, &mut scheduler).await {
                    Ok(Ok(())) => debug!("in-flight probes drained"),
                    Ok(Err(e)) => warn!(error = %e, "scheduler task failed"),
                    Err(_) => {
                        warn!(
                            grace_ms = self.grace.as_millis() as u64,
                            "grace period elapsed with probes in flight, aborting them"
                        );
                        scheduler.abort();
                        let _ = scheduler.await;
                    }
                }
            }

            self.state = ServiceState::Closed;
            info!("probe service closed");
        })
    }

    fn results(&mut self) -> Option<ResultReceiver> {
        self.results_rx.take()
    }
}
