//! HTTP transport used by probe workers.
//!
//! The transport is an explicit dependency of the service so tests can
//! substitute it. [`HyperTransport`] is the default: a pooled hyper client
//! speaking HTTP/1.1 over plain TCP or rustls.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};

use bytes::Bytes;
use http::{Request, Response, Uri};
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Empty};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use tracing::debug;

use crate::config::TransportConfig;
use crate::error::{ProbeError, ServiceError, ServiceResult};

/// Response body handed back by a [`Transport`].
pub type ProbeBody = BoxBody<Bytes, ProbeError>;

/// Boxed future alias for transport responses.
pub type TransportFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Response<ProbeBody>, ProbeError>> + Send + 'a>>;

/// Issues GET requests on behalf of probe workers.
///
/// One transport is shared by every worker of every wave.
pub trait Transport: Send + Sync {
    /// Send a GET for `uri` and resolve once the response head arrives.
    /// The body is read by the caller.
    fn get<'a>(&'a self, uri: &'a Uri) -> TransportFuture<'a>;

    /// Release idle pooled connections. In-flight requests are left alone.
    fn close_idle(&self);
}

type HttpsClient = Client<HttpsConnector<HttpConnector>, Empty<Bytes>>;

/// Pooled hyper client with rustls for `https://` endpoints.
///
/// Redirects are not followed; a 3xx is reported as received.
pub struct HyperTransport {
    config: TransportConfig,
    connector: HttpsConnector<HttpConnector>,
    client: Mutex<HttpsClient>,
}

impl HyperTransport {
    pub fn new(config: &TransportConfig) -> ServiceResult<Self> {
        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_provider_and_webpki_roots(rustls::crypto::ring::default_provider())
            .map_err(|e| ServiceError::Transport(e.to_string()))?
            .https_or_http()
            .enable_http1()
            .build();
        let client = build_client(config, connector.clone());

        Ok(Self {
            config: config.clone(),
            connector,
            client: Mutex::new(client),
        })
    }

    fn client(&self) -> HttpsClient {
        self.client
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

fn build_client(config: &TransportConfig, connector: HttpsConnector<HttpConnector>) -> HttpsClient {
    Client::builder(TokioExecutor::new())
        .pool_idle_timeout(config.pool_idle_timeout)
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .build(connector)
}

impl Transport for HyperTransport {
    fn get<'a>(&'a self, uri: &'a Uri) -> TransportFuture<'a> {
        let client = self.client();
        Box::pin(async move {
            let request = Request::get(uri.clone())
                .body(Empty::<Bytes>::new())
                .map_err(|e| ProbeError::InvalidUrl(e.to_string()))?;

            let response = client
                .request(request)
                .await
                .map_err(|e| ProbeError::Transport(error_chain(&e)))?;

            Ok(response.map(|body| {
                body.map_err(|e| ProbeError::Body(error_chain(&e)))
                    .boxed()
            }))
        })
    }

    fn close_idle(&self) {
        // Swapping the client drops our handle on the old pool; its idle
        // connections go away once in-flight requests release theirs.
        let fresh = build_client(&self.config, self.connector.clone());
        let old = std::mem::replace(
            &mut *self.client.lock().unwrap_or_else(PoisonError::into_inner),
            fresh,
        );
        drop(old);
        debug!("idle transport connections released");
    }
}

/// Render an error with its source chain, e.g.
/// `client error (Connect): tcp connect error: Connection refused`.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_msg = cause.to_string();
        if !out.ends_with(&cause_msg) {
            out.push_str(": ");
            out.push_str(&cause_msg);
        }
        source = cause.source();
    }
    out
}
