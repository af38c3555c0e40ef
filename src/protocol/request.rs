//! Initial request parsing
//!
//! Every connection opens with an HTTP-like header block. Sources announce
//! themselves with `SOURCE <password> <mountpoint>`, clients with
//! `GET /<mountpoint>`. The parser never fails: it extracts whatever it
//! recognises and leaves the rest unset, so that missing or garbled fields
//! fall through to the "unknown mountpoint" or "bad password" paths.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use super::constants::*;

/// Intent of a connection, extracted from its initial request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedRequest {
    /// Normalized mountpoint; empty means a sourcetable request
    pub mountpoint: String,
    /// Username from basic authorization
    pub username: Option<String>,
    /// Password from basic authorization or from the `SOURCE` line
    pub password: Option<String>,
    /// Whether the request is a source push registration
    pub is_source: bool,
    /// `User-Agent` or `Source-Agent` value
    pub agent: Option<String>,
}

impl ParsedRequest {
    /// Parse the raw bytes of an initial request.
    pub fn parse(raw: &[u8]) -> Self {
        let text = String::from_utf8_lossy(raw);
        let mut request = ParsedRequest::default();

        for line in text.split("\r\n").filter(|l| !l.is_empty()) {
            if line.starts_with(GET_PREFIX) {
                let path = line.split_whitespace().nth(1).unwrap_or("");
                request.mountpoint = normalize_mountpoint(path);
            } else if line.starts_with(SOURCE_PREFIX) {
                request.is_source = true;
                let parts: Vec<&str> = line.split_whitespace().collect();
                if parts.len() == 3 {
                    request.password = Some(parts[1].to_string());
                    request.mountpoint = normalize_mountpoint(parts[2]);
                }
            } else if let Some(value) = line.strip_prefix(AUTHORIZATION_PREFIX) {
                if let Some((user, pass)) = parse_basic_auth(value) {
                    request.username = Some(user);
                    request.password = Some(pass);
                }
            } else if let Some(agent) = line
                .strip_prefix(USER_AGENT_PREFIX)
                .or_else(|| line.strip_prefix(SOURCE_AGENT_PREFIX))
            {
                request.agent = Some(agent.trim_start().to_string());
            } else {
                tracing::debug!(header = line, "Ignoring header line");
            }
        }

        request
    }

    /// Whether the peer identified itself as an NTRIP agent
    pub fn is_ntrip(&self) -> bool {
        self.agent
            .as_deref()
            .is_some_and(|agent| agent.contains(NTRIP_AGENT_MARKER))
    }

    /// Whether the request asks for the sourcetable rather than a stream
    pub fn is_sourcetable_request(&self) -> bool {
        self.mountpoint.is_empty()
    }
}

/// Normalize a mountpoint: lower-case, leading slashes removed.
pub fn normalize_mountpoint(raw: &str) -> String {
    raw.trim_start_matches('/').to_lowercase()
}

/// Decode `Basic <base64(user:pass)>`; anything else yields `None`.
fn parse_basic_auth(value: &str) -> Option<(String, String)> {
    let mut parts = value.split_whitespace();
    let scheme = parts.next()?;
    let payload = parts.next()?;
    if parts.next().is_some() || !scheme.eq_ignore_ascii_case("Basic") {
        return None;
    }

    let decoded = BASE64.decode(payload).ok()?;
    let credentials = String::from_utf8_lossy(&decoded);
    let fields: Vec<&str> = credentials.split(':').collect();
    match fields.as_slice() {
        [user, pass] => Some((user.to_string(), pass.to_string())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic(credentials: &str) -> String {
        format!("Authorization: Basic {}", BASE64.encode(credentials))
    }

    #[test]
    fn test_client_request() {
        let raw = format!(
            "GET /TEST1 HTTP/1.0\r\nUser-Agent: NTRIP Client/1.0\r\n{}\r\n\r\n",
            basic("alice:secret")
        );
        let req = ParsedRequest::parse(raw.as_bytes());

        assert_eq!(req.mountpoint, "test1");
        assert_eq!(req.username.as_deref(), Some("alice"));
        assert_eq!(req.password.as_deref(), Some("secret"));
        assert_eq!(req.agent.as_deref(), Some("NTRIP Client/1.0"));
        assert!(!req.is_source);
        assert!(req.is_ntrip());
    }

    #[test]
    fn test_source_request() {
        let raw = b"SOURCE secret /Base1\r\nSource-Agent: NTRIP Server\r\n\r\n";
        let req = ParsedRequest::parse(raw);

        assert!(req.is_source);
        assert_eq!(req.password.as_deref(), Some("secret"));
        assert_eq!(req.mountpoint, "base1");
        assert!(req.is_ntrip());
    }

    #[test]
    fn test_source_line_with_wrong_token_count() {
        let req = ParsedRequest::parse(b"SOURCE secret\r\nSource-Agent: NTRIP x\r\n\r\n");

        assert!(req.is_source);
        assert!(req.password.is_none());
        assert!(req.mountpoint.is_empty());
    }

    #[test]
    fn test_sourcetable_request() {
        let req = ParsedRequest::parse(b"GET / HTTP/1.0\r\nUser-Agent: NTRIP x\r\n\r\n");

        assert!(req.is_sourcetable_request());
        assert!(req.is_ntrip());
    }

    #[test]
    fn test_missing_agent_is_not_ntrip() {
        let req = ParsedRequest::parse(b"GET /TEST1 HTTP/1.1\r\nHost: example\r\n\r\n");

        assert!(req.agent.is_none());
        assert!(!req.is_ntrip());
    }

    #[test]
    fn test_browser_agent_is_not_ntrip() {
        let req = ParsedRequest::parse(b"GET / HTTP/1.1\r\nUser-Agent: Mozilla/5.0\r\n\r\n");
        assert!(!req.is_ntrip());
    }

    #[test]
    fn test_malformed_authorization_is_ignored() {
        // No colon in the decoded payload
        let raw = format!("GET /m\r\n{}\r\n\r\n", basic("nocolon"));
        let req = ParsedRequest::parse(raw.as_bytes());
        assert!(req.username.is_none());
        assert!(req.password.is_none());

        // Too many colons
        let raw = format!("GET /m\r\n{}\r\n\r\n", basic("a:b:c"));
        let req = ParsedRequest::parse(raw.as_bytes());
        assert!(req.username.is_none());

        // Not base64
        let req = ParsedRequest::parse(b"GET /m\r\nAuthorization: Basic !!!\r\n\r\n");
        assert!(req.username.is_none());

        // Other scheme
        let req = ParsedRequest::parse(b"GET /m\r\nAuthorization: Bearer abc\r\n\r\n");
        assert!(req.username.is_none());
    }

    #[test]
    fn test_empty_input() {
        let req = ParsedRequest::parse(b"");
        assert_eq!(req, ParsedRequest::default());
    }

    #[test]
    fn test_normalize_mountpoint() {
        assert_eq!(normalize_mountpoint("/TEST1"), "test1");
        assert_eq!(normalize_mountpoint("//Mixed"), "mixed");
        assert_eq!(normalize_mountpoint("plain"), "plain");
        assert_eq!(normalize_mountpoint("/"), "");
    }
}
