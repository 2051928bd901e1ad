//! Request line parsing and the per-connection request context.
//!
//! # Responsibilities
//! - Read bounded CRLF/LF-terminated lines from the client
//! - Split the request line into method, target, version
//! - Derive origin host/port/path and the cache key
//! - Render the sanitized HTTP/1.0 request sent to the origin
//!
//! # Design Decisions
//! - Only GET is proxied; the method is matched case-insensitively and always
//!   forwarded as `GET`
//! - The origin always sees HTTP/1.0 with `Connection: close`

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::http::error::ProxyError;
use crate::http::headers::FilteredHeaders;
use crate::http::uri::{parse_uri, Target};

/// Result of reading one line from the client.
#[derive(Debug, PartialEq, Eq)]
pub enum Line {
    /// A full line, terminator included.
    Complete(Vec<u8>),
    /// The client closed before sending a line terminator.
    Eof,
}

/// Read one `\n`-terminated line of at most `limit` bytes.
///
/// A line still unterminated after `limit` bytes is malformed. Bytes of an
/// unterminated line at end of stream are discarded.
pub async fn read_line<R>(reader: &mut R, limit: usize) -> Result<Line, ProxyError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    (&mut *reader)
        .take(limit as u64)
        .read_until(b'\n', &mut line)
        .await
        .map_err(ProxyError::ClientIo)?;

    if line.last() == Some(&b'\n') {
        Ok(Line::Complete(line))
    } else if line.len() >= limit {
        Err(ProxyError::malformed(format!("line exceeds {} bytes", limit)))
    } else {
        Ok(Line::Eof)
    }
}

/// `METHOD SP target SP version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: String,
    pub uri: String,
    pub version: String,
}

impl RequestLine {
    /// Parse a raw request line, terminator optional.
    pub fn parse(raw: &[u8]) -> Result<Self, ProxyError> {
        let text = std::str::from_utf8(raw)
            .map_err(|_| ProxyError::malformed("request line is not UTF-8"))?;

        let mut tokens = text.split_ascii_whitespace();
        let (Some(method), Some(uri), Some(version), None) =
            (tokens.next(), tokens.next(), tokens.next(), tokens.next())
        else {
            return Err(ProxyError::malformed(format!(
                "expected `METHOD URI VERSION`, got {:?}",
                text.trim_end()
            )));
        };

        if !version.starts_with("HTTP/") {
            return Err(ProxyError::malformed(format!("unrecognized version {:?}", version)));
        }

        Ok(Self {
            method: method.to_string(),
            uri: uri.to_string(),
            version: version.to_string(),
        })
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }
}

/// Everything the handler knows about one client request.
///
/// Built right after the request line is accepted; the header block is
/// attached only on a cache miss.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub line: RequestLine,
    pub target: Target,
    pub cache_key: String,
    pub headers: FilteredHeaders,
}

impl RequestContext {
    /// Validate a request line and derive the origin target from it.
    pub fn from_line(line: RequestLine) -> Result<Self, ProxyError> {
        if !line.is_get() {
            return Err(ProxyError::UnsupportedMethod(line.method));
        }

        let target = parse_uri(&line.uri)
            .map_err(|e| ProxyError::malformed(format!("{} in {:?}", e, line.uri)))?;
        let cache_key = target.cache_key();

        Ok(Self {
            line,
            target,
            cache_key,
            headers: FilteredHeaders::default(),
        })
    }

    pub fn attach_headers(&mut self, headers: FilteredHeaders) {
        self.headers = headers;
    }

    /// Render the request sent to the origin.
    ///
    /// A `Host` line is synthesized only when the client sent none; the
    /// client's own Host, User-Agent, Connection and Proxy-Connection lines
    /// never reach the origin.
    pub fn forward_request(&self, user_agent: &str) -> Vec<u8> {
        let mut head = format!("GET {} HTTP/1.0\r\n", self.target.path);
        if !self.headers.has_host {
            head.push_str(&format!("Host: {}\r\n", self.target.host));
        }
        head.push_str(&format!("User-Agent: {}\r\n", user_agent));
        head.push_str("Connection: close\r\n");
        head.push_str("Proxy-Connection: close\r\n");

        let mut request = head.into_bytes();
        request.extend_from_slice(&self.headers.block);
        request.extend_from_slice(b"\r\n");
        request
    }
}
