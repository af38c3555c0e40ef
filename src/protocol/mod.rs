//! NTRIP wire protocol
//!
//! NTRIP (revision 1) reuses HTTP/1.0 framing for its opening exchange and
//! then switches to a raw byte stream:
//!
//! ```text
//! Source                  Caster                  Client
//!   |-- SOURCE pw /mp ------>|                       |
//!   |<----- ICY 200 OK ------|<------ GET /mp -------|
//!   |                        |------ ICY 200 OK ---->|
//!   |====== RTCM bytes =====>|====== RTCM bytes ====>|
//! ```
//!
//! Responses are fixed literals; there is no structured error protocol.

pub mod constants;
pub mod request;
pub mod sourcetable;

pub use request::{normalize_mountpoint, ParsedRequest};

use constants::PROBE_SERVER;

/// Response sent to connections that are not NTRIP agents (browsers, probes)
pub fn probe_response(greeting: &str) -> String {
    format!(
        "HTTP/1.0 200 OK\r\nServer: {}\r\nContent-Type: text/plain\r\n\r\n{}",
        PROBE_SERVER, greeting
    )
}
