//! Probe worker: one GET against one endpoint.

use std::time::Duration;

use http::Uri;
use http_body_util::BodyExt;
use tokio::time::Instant;
use tracing::debug;

use crate::error::ProbeError;
use crate::result::ProbeResult;
use crate::scope::{WaveScope, service_scope};
use crate::transport::Transport;

/// Probe `url` once within the wave's deadline.
///
/// Never fails: every problem ends up in the returned result's `error`.
/// The response head and the body read share the wave deadline.
pub async fn probe_url(transport: &dyn Transport, scope: &WaveScope, url: &str) -> ProbeResult {
    let started = Instant::now();

    let uri = match parse_endpoint(url) {
        Ok(uri) => uri,
        Err(e) => {
            debug!(%url, error = %e, "probe request invalid");
            return ProbeResult::failed(url, 0, e);
        }
    };

    let response = match scope.run(transport.get(&uri)).await.and_then(|r| r) {
        Ok(response) => response,
        Err(e) => {
            debug!(%url, error = %e, "probe got no response");
            return ProbeResult::failed(url, 0, e);
        }
    };

    let status = response.status().as_u16();
    let result = match scope.run(response.into_body().collect()).await.and_then(|r| r) {
        Ok(collected) => ProbeResult::response(url, status, collected.to_bytes()),
        Err(e) => {
            debug!(%url, status, error = %e, "probe body read failed");
            ProbeResult::failed(url, status, e)
        }
    };

    debug!(
        %url,
        status,
        bytes = result.body().len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "probe completed"
    );
    result
}

/// Probe `url` once outside of any service, bounded by `timeout`.
pub async fn probe_once(transport: &dyn Transport, url: &str, timeout: Duration) -> ProbeResult {
    let (_cancel, scope) = service_scope();
    probe_url(transport, &scope.wave(timeout), url).await
}

/// Build the request target, rejecting anything that is not an absolute
/// http(s) URL.
fn parse_endpoint(url: &str) -> Result<Uri, ProbeError> {
    let uri: Uri = url
        .parse()
        .map_err(|e: http::uri::InvalidUri| ProbeError::InvalidUrl(format!("{url}: {e}")))?;

    match uri.scheme_str() {
        Some("http") | Some("https") => {}
        Some(other) => {
            return Err(ProbeError::InvalidUrl(format!(
                "{url}: unsupported scheme `{other}`"
            )));
        }
        None => return Err(ProbeError::InvalidUrl(format!("{url}: missing scheme"))),
    }
    if uri.authority().is_none() {
        return Err(ProbeError::InvalidUrl(format!("{url}: missing host")));
    }
    Ok(uri)
}
