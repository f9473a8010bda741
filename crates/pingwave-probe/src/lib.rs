//! pingwave-probe — interval HTTP probing with streamed results.
//!
//! Every probe interval the service launches one GET per configured
//! endpoint (a *wave*), bounds each by a deadline equal to the interval,
//! and sends one [`ProbeResult`] per endpoint into a result channel as
//! soon as it completes.
//!
//! # Architecture
//!
//! ```text
//! ProbeService (Prober)
//!   ├── ServiceScope (cancelled by close() or drop)
//!   ├── Scheduler task
//!   │   └── per wave: WaveScope (deadline = interval)
//!   │       └── one worker per endpoint
//!   │           ├── probe_url() via Arc<dyn Transport> → ProbeResult
//!   │           └── send into the result channel
//!   └── result channel → consumer
//! ```
//!
//! # Shutdown
//!
//! `close()` cancels the service scope, releases idle transport
//! connections, and waits up to the grace period for the scheduler to
//! join its last wave. Workers still running after that are aborted. The
//! channel closes when the last sender is dropped, so a send can never
//! race a close.
//!
//! Failures of individual probes are data, not errors: see [`ProbeError`].

pub mod config;
pub mod error;
pub mod result;
mod scheduler;
pub mod scope;
pub mod service;
pub mod transport;
pub mod worker;

pub use config::{ProbeConfig, TransportConfig};
pub use error::{ConfigError, ConfigResult, ProbeError, ServiceError, ServiceResult};
pub use result::ProbeResult;
pub use service::{CloseFuture, ProbeService, Prober, ResultReceiver, ServiceState};
pub use transport::{HyperTransport, ProbeBody, Transport, TransportFuture};
pub use worker::{probe_once, probe_url};
