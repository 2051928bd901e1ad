//! Per-connection proxy pipeline.
//!
//! ```text
//! AWAIT_REQUEST_LINE → PARSE_URI → CACHE_LOOKUP
//!     ├─ hit  → drain headers → write cached bytes → CLOSE
//!     └─ miss → FILTER_HEADERS → CONNECT_ORIGIN → STREAM_RESPONSE
//!              → CACHE_INSERT (if within object cap) → CLOSE
//! ```
//!
//! Any parse or connect failure goes straight to CLOSE.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::cache::ResponseCache;
use crate::config::ForwardingConfig;
use crate::http::error::ProxyError;
use crate::http::headers::filter_headers;
use crate::http::request::{read_line, Line, RequestContext, RequestLine};
use crate::http::response::{error_response, error_status};
use crate::observability::metrics;

/// How a connection that completed normally was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Served from the cache without contacting the origin.
    CacheHit { bytes: usize },
    /// Relayed from the origin.
    Forwarded { bytes: u64, cached: bool },
}

/// Accumulates a relayed response for the cache, giving up once it would
/// exceed the per-object cap or memory cannot be reserved.
#[derive(Debug)]
struct ResponseBuffer {
    data: Option<Vec<u8>>,
    limit: usize,
}

impl ResponseBuffer {
    fn new(limit: usize) -> Self {
        Self {
            data: Some(Vec::new()),
            limit,
        }
    }

    fn push(&mut self, chunk: &[u8]) {
        let Some(data) = self.data.as_mut() else {
            return;
        };
        if data.len() + chunk.len() > self.limit {
            tracing::trace!(limit = self.limit, "Response exceeds object cap, not caching");
            self.data = None;
            return;
        }
        if data.try_reserve(chunk.len()).is_err() {
            tracing::warn!(bytes = chunk.len(), "Could not grow cache buffer, not caching");
            self.data = None;
            return;
        }
        data.extend_from_slice(chunk);
    }

    fn into_cacheable(self) -> Option<Vec<u8>> {
        self.data.filter(|data| !data.is_empty())
    }
}

/// Serves client connections against a shared cache.
///
/// Cheap to clone; every spawned connection task holds its own copy.
#[derive(Debug, Clone)]
pub struct ConnectionHandler {
    cache: Arc<ResponseCache>,
    forwarding: Arc<ForwardingConfig>,
}

impl ConnectionHandler {
    pub fn new(cache: Arc<ResponseCache>, forwarding: ForwardingConfig) -> Self {
        Self {
            cache,
            forwarding: Arc::new(forwarding),
        }
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    /// Run one exchange to completion and close the client side.
    pub async fn serve<S>(&self, stream: S) -> Result<Outcome, ProxyError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let (read_half, mut client_tx) = tokio::io::split(stream);
        let mut client_rx = BufReader::new(read_half);

        let result = self.exchange(&mut client_rx, &mut client_tx).await;

        if let Err(e) = &result {
            if self.forwarding.send_error_responses {
                if let (Some((status, _)), Some(response)) = (error_status(e), error_response(e)) {
                    tracing::debug!(status, error = %e, "Sending error response");
                    let _ = client_tx.write_all(&response).await;
                }
            }
        }
        let _ = client_tx.shutdown().await;
        result
    }

    async fn exchange<R, W>(&self, client_rx: &mut BufReader<R>, client_tx: &mut W) -> Result<Outcome, ProxyError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let max_line = self.forwarding.max_line_bytes;

        let raw = match read_line(client_rx, max_line).await? {
            Line::Complete(raw) => raw,
            Line::Eof => return Err(ProxyError::malformed("connection closed before request line")),
        };
        let line = RequestLine::parse(&raw)?;
        let mut ctx = RequestContext::from_line(line)?;

        tracing::debug!(key = %ctx.cache_key, version = %ctx.line.version, "Request accepted");

        if let Some(cached) = self.cache.get(&ctx.cache_key) {
            // Consume the header block so no unread bytes are left at close.
            filter_headers(client_rx, max_line).await?;
            client_tx.write_all(&cached).await.map_err(ProxyError::ClientIo)?;
            client_tx.flush().await.map_err(ProxyError::ClientIo)?;
            metrics::record_response_bytes("cache", cached.len() as u64);
            tracing::info!(key = %ctx.cache_key, bytes = cached.len(), "Served from cache");
            return Ok(Outcome::CacheHit { bytes: cached.len() });
        }

        let headers = filter_headers(client_rx, max_line).await?;
        ctx.attach_headers(headers);

        let authority = ctx.target.authority();
        let mut origin = TcpStream::connect((ctx.target.host.as_str(), ctx.target.port))
            .await
            .map_err(|source| ProxyError::OriginUnreachable {
                authority: authority.clone(),
                source,
            })?;

        let request = ctx.forward_request(&self.forwarding.user_agent);
        origin.write_all(&request).await.map_err(ProxyError::OriginIo)?;
        tracing::debug!(origin = %authority, path = %ctx.target.path, "Forwarded request to origin");

        let (total, buffer) = self.relay(&mut origin, client_tx).await?;
        drop(origin);

        metrics::record_response_bytes("origin", total);
        let cached = match buffer.into_cacheable() {
            Some(data) => self.cache.put(ctx.cache_key.clone(), data),
            None => false,
        };

        tracing::info!(key = %ctx.cache_key, bytes = total, cached, "Relayed origin response");
        Ok(Outcome::Forwarded { bytes: total, cached })
    }

    /// Copy the origin response to the client chunk by chunk, in order,
    /// while filling the cache buffer.
    async fn relay<W>(&self, origin: &mut TcpStream, client_tx: &mut W) -> Result<(u64, ResponseBuffer), ProxyError>
    where
        W: AsyncWrite + Unpin,
    {
        let mut chunk = vec![0u8; self.forwarding.chunk_size];
        let mut buffer = ResponseBuffer::new(self.cache.max_object_bytes());
        let mut total = 0u64;

        loop {
            let n = origin.read(&mut chunk).await.map_err(ProxyError::OriginIo)?;
            if n == 0 {
                break;
            }
            client_tx.write_all(&chunk[..n]).await.map_err(ProxyError::ClientIo)?;
            buffer.push(&chunk[..n]);
            total += n as u64;
        }
        client_tx.flush().await.map_err(ProxyError::ClientIo)?;

        Ok((total, buffer))
    }
}
