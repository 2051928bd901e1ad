//! Locally generated error responses.
//!
//! Only used when `forwarding.send_error_responses` is on; the default is to
//! close a bad request silently.

use crate::http::error::ProxyError;

/// Status code and reason phrase answering a client-side failure.
pub fn error_status(error: &ProxyError) -> Option<(u16, &'static str)> {
    match error {
        ProxyError::MalformedRequest(_) => Some((400, "Bad Request")),
        ProxyError::UnsupportedMethod(_) => Some((501, "Not Implemented")),
        _ => None,
    }
}

/// Status line, headers and HTML body for a client-side failure, if the
/// failure warrants one. Origin failures never do.
pub fn error_response(error: &ProxyError) -> Option<Vec<u8>> {
    let (code, reason) = error_status(error)?;

    let body = format!("<h1>{} {}</h1>\r\n", code, reason);
    let response = format!(
        "HTTP/1.0 {} {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        code,
        reason,
        body.len(),
        body
    );
    Some(response.into_bytes())
}
