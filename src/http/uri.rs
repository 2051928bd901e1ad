//! Absolute-URI splitting.
//!
//! `http://host[:port][/path]` → host, port (default 80), path (default `/`).
//! The authority is split on its last colon, so bracketed IPv6 literals are
//! not understood.

use thiserror::Error;

const SCHEME: &str = "http://";
const DEFAULT_PORT: u16 = 80;

/// Where a request is headed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub port: u16,
    pub path: String,
}

impl Target {
    /// Canonical cache key: `host:port/path`.
    pub fn cache_key(&self) -> String {
        format!("{}:{}{}", self.host, self.port, self.path)
    }

    /// `host:port`, used for connecting and logging.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Why a URI could not be split.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UriError {
    #[error("URI has no host")]
    EmptyHost,

    #[error("invalid port `{0}`")]
    InvalidPort(String),
}

/// Split an absolute URI into host, port and path.
pub fn parse_uri(uri: &str) -> Result<Target, UriError> {
    let rest = match uri.get(..SCHEME.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(SCHEME) => &uri[SCHEME.len()..],
        _ => uri,
    };

    let (authority, path) = match rest.find('/') {
        Some(slash) => (&rest[..slash], &rest[slash..]),
        None => (rest, "/"),
    };

    let (host, port) = match authority.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse::<u16>()
                .map_err(|_| UriError::InvalidPort(port.to_string()))?;
            (host, port)
        }
        None => (authority, DEFAULT_PORT),
    };

    if host.is_empty() {
        return Err(UriError::EmptyHost);
    }

    Ok(Target {
        host: host.to_string(),
        port,
        path: path.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(host: &str, port: u16, path: &str) -> Target {
        Target {
            host: host.into(),
            port,
            path: path.into(),
        }
    }

    #[test]
    fn splits_full_uri() {
        assert_eq!(
            parse_uri("http://localhost:8080/index.html").unwrap(),
            target("localhost", 8080, "/index.html")
        );
    }

    #[test]
    fn defaults_port_and_path() {
        assert_eq!(parse_uri("http://example.com").unwrap(), target("example.com", 80, "/"));
        assert_eq!(parse_uri("http://example.com/").unwrap(), target("example.com", 80, "/"));
    }

    #[test]
    fn scheme_is_case_insensitive_and_optional() {
        assert_eq!(
            parse_uri("HTTP://Example.com/A").unwrap(),
            target("Example.com", 80, "/A")
        );
        assert_eq!(
            parse_uri("example.com:81/x").unwrap(),
            target("example.com", 81, "/x")
        );
    }

    #[test]
    fn path_keeps_query_and_inner_slashes() {
        assert_eq!(
            parse_uri("http://h/cgi-bin/adder?15000&213").unwrap(),
            target("h", 80, "/cgi-bin/adder?15000&213")
        );
    }

    #[test]
    fn colon_inside_path_is_not_a_port() {
        assert_eq!(
            parse_uri("http://h/a:b").unwrap(),
            target("h", 80, "/a:b")
        );
    }

    #[test]
    fn rejects_bad_authorities() {
        assert_eq!(parse_uri("http:///path"), Err(UriError::EmptyHost));
        assert_eq!(parse_uri("/relative"), Err(UriError::EmptyHost));
        assert_eq!(
            parse_uri("http://h:http/"),
            Err(UriError::InvalidPort("http".into()))
        );
        assert_eq!(
            parse_uri("http://h:70000/"),
            Err(UriError::InvalidPort("70000".into()))
        );
    }

    #[test]
    fn cache_key_is_host_port_path() {
        let t = parse_uri("http://example.com/a.html").unwrap();
        assert_eq!(t.cache_key(), "example.com:80/a.html");
        assert_eq!(t.authority(), "example.com:80");
    }

    #[test]
    fn errors_render_through_std_error() {
        let err: Box<dyn std::error::Error> = Box::new(UriError::InvalidPort("x1".into()));
        assert_eq!(err.to_string(), "invalid port `x1`");
        assert_eq!(UriError::EmptyHost.to_string(), "URI has no host");
    }
}
