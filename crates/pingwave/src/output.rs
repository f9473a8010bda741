//! JSON-lines output for probe results.
//!
//! Each result becomes one line: `{"URL":..,"StatusCode":..,"Error":..}`.
//! A failed write is logged and skipped; it never stops probing.

use std::future::Future;
use std::io::Write;

use anyhow::Context;
use pingwave_probe::{ProbeResult, Prober, ResultReceiver};
use tracing::{error, info};

/// Encodes probe results as newline-delimited JSON.
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn write(&mut self, result: &ProbeResult) -> anyhow::Result<()> {
        serde_json::to_writer(&mut self.writer, result).context("json encode")?;
        self.writer.write_all(b"\n").context("write newline")?;
        self.writer.flush().context("flush output")?;
        Ok(())
    }
}

/// Counts from one [`pump`] run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PumpStats {
    pub written: u64,
    pub failed: u64,
}

/// Drain `results` into `sink` until the channel closes.
///
/// Blocks the calling thread; run it on the blocking pool so a slow
/// stdout pipe never stalls runtime workers.
pub fn pump<W: Write>(mut results: ResultReceiver, mut sink: JsonLinesSink<W>) -> PumpStats {
    let mut stats = PumpStats::default();
    while let Some(result) = results.blocking_recv() {
        match sink.write(&result) {
            Ok(()) => stats.written += 1,
            Err(e) => {
                let reason = format!("{e:#}");
                error!(url = %result.url(), error = %reason, "failed to write probe result");
                stats.failed += 1;
            }
        }
    }
    stats
}

/// Start `prober`, stream its results into `sink` until `shutdown`
/// resolves, then close it and wait for the channel to drain.
pub async fn stream_until<W, F>(
    prober: &mut dyn Prober,
    sink: JsonLinesSink<W>,
    shutdown: F,
) -> anyhow::Result<PumpStats>
where
    W: Write + Send + 'static,
    F: Future<Output = ()>,
{
    let results = prober.results().context("result channel already taken")?;
    let consumer = tokio::task::spawn_blocking(move || pump(results, sink));

    prober.start().context("failed to start probes")?;
    info!("starting probes");

    shutdown.await;
    info!("exiting upon request");
    prober.close().await;

    let stats = consumer.await.context("output task panicked")?;
    info!(written = stats.written, failed = stats.failed, "probe output drained");
    Ok(stats)
}
