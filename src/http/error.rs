//! Per-connection failure taxonomy.

use std::io;

use thiserror::Error;

/// Why a proxied exchange ended early.
///
/// Every variant is terminal for its connection only; none reach the accept
/// loop and none are retried.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Request line or header line could not be understood.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// Anything other than GET.
    #[error("unsupported method `{0}`")]
    UnsupportedMethod(String),

    /// TCP connect to the origin failed.
    #[error("origin {authority} unreachable: {source}")]
    OriginUnreachable {
        authority: String,
        #[source]
        source: io::Error,
    },

    /// Reading from or writing to the client failed.
    #[error("client I/O error: {0}")]
    ClientIo(#[source] io::Error),

    /// Reading from or writing to the origin failed after connecting.
    #[error("origin I/O error: {0}")]
    OriginIo(#[source] io::Error),
}

impl ProxyError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        ProxyError::MalformedRequest(reason.into())
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::MalformedRequest(_) => "malformed_request",
            ProxyError::UnsupportedMethod(_) => "unsupported_method",
            ProxyError::OriginUnreachable { .. } => "origin_unreachable",
            ProxyError::ClientIo(_) => "client_io",
            ProxyError::OriginIo(_) => "origin_io",
        }
    }

    /// Whether the failure lies with the origin rather than the client.
    pub fn is_origin_failure(&self) -> bool {
        matches!(
            self,
            ProxyError::OriginUnreachable { .. } | ProxyError::OriginIo(_)
        )
    }
}
