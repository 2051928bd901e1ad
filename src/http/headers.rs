//! Client header filtering.
//!
//! # Responsibilities
//! - Consume request headers up to the blank line
//! - Strip the headers the proxy writes itself (Host, User-Agent,
//!   Connection, Proxy-Connection)
//! - Pass every other line through untouched, in order, terminators included
//!
//! # Design Decisions
//! - Names compare case-insensitively and must match exactly, so
//!   `Host-Override` is passed through while `HOST` is not
//! - A line without a colon has no name to match and is passed through

use tokio::io::AsyncBufRead;

use crate::http::error::ProxyError;
use crate::http::request::{read_line, Line};

/// Headers the proxy always synthesizes itself.
pub const MANAGED_HEADERS: [&str; 4] = ["host", "user-agent", "connection", "proxy-connection"];

/// The client's header block minus proxy-managed lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilteredHeaders {
    /// Passthrough lines, concatenated verbatim.
    pub block: Vec<u8>,
    /// The client sent its own Host header.
    pub has_host: bool,
}

/// Name part of a header line, without surrounding whitespace.
fn header_name(line: &[u8]) -> &[u8] {
    let end = line.iter().position(|&b| b == b':').unwrap_or(line.len());
    line[..end].trim_ascii()
}

pub fn is_managed_header(name: &[u8]) -> bool {
    MANAGED_HEADERS
        .iter()
        .any(|managed| name.eq_ignore_ascii_case(managed.as_bytes()))
}

fn is_blank(line: &[u8]) -> bool {
    line == b"\r\n" || line == b"\n"
}

/// Read header lines until a blank line or end of stream.
pub async fn filter_headers<R>(reader: &mut R, max_line_bytes: usize) -> Result<FilteredHeaders, ProxyError>
where
    R: AsyncBufRead + Unpin,
{
    let mut filtered = FilteredHeaders::default();

    loop {
        let line = match read_line(reader, max_line_bytes).await? {
            Line::Complete(line) => line,
            Line::Eof => break,
        };
        if is_blank(&line) {
            break;
        }

        let name = header_name(&line);
        if name.eq_ignore_ascii_case(b"host") {
            filtered.has_host = true;
        }
        if is_managed_header(name) {
            continue;
        }
        filtered.block.extend_from_slice(&line);
    }

    Ok(filtered)
}
