//! The record produced by every probe.

use bytes::Bytes;
use serde::{Serialize, Serializer};

use crate::error::ProbeError;

/// Outcome of one probe attempt against one endpoint in one wave.
///
/// Serializes as `{"URL": .., "StatusCode": .., "Error": ..}`. The body and
/// wave number are never serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeResult {
    #[serde(rename = "URL")]
    url: String,
    /// 0 when no response was received.
    #[serde(rename = "StatusCode")]
    status_code: u16,
    #[serde(skip)]
    body: Bytes,
    #[serde(rename = "Error", serialize_with = "serialize_error")]
    error: Option<ProbeError>,
    #[serde(skip)]
    wave: u64,
}

impl ProbeResult {
    /// A fully-read response.
    pub fn response(url: impl Into<String>, status_code: u16, body: Bytes) -> Self {
        Self {
            url: url.into(),
            status_code,
            body,
            error: None,
            wave: 0,
        }
    }

    /// A failed probe. `status_code` is 0 unless a response header was
    /// received before the failure.
    pub fn failed(url: impl Into<String>, status_code: u16, error: ProbeError) -> Self {
        Self {
            url: url.into(),
            status_code,
            body: Bytes::new(),
            error: Some(error),
            wave: 0,
        }
    }

    /// Tag the result with the wave that produced it.
    pub fn in_wave(mut self, wave: u64) -> Self {
        self.wave = wave;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn error(&self) -> Option<&ProbeError> {
        self.error.as_ref()
    }

    /// 1-based wave sequence number; 0 for results built outside a service.
    pub fn wave(&self) -> u64 {
        self.wave
    }

    /// Whether a response was received and fully read. Says nothing about
    /// the status class.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

fn serialize_error<S: Serializer>(error: &Option<ProbeError>, s: S) -> Result<S::Ok, S::Error> {
    match error {
        Some(e) => s.serialize_str(&e.to_string()),
        None => s.serialize_none(),
    }
}
