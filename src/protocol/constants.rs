//! NTRIP protocol constants

/// Conventional NTRIP caster port
pub const DEFAULT_PORT: u16 = 2101;

/// Size of the buffer used for the initial request and for each source read
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Substring an agent header must carry to be treated as an NTRIP participant
pub const NTRIP_AGENT_MARKER: &str = "NTRIP";

/// Reply sent to an accepted source or client
pub const ICY_OK: &[u8] = b"ICY 200 OK\r\n";

/// Reply sent on any authentication failure
pub const BAD_PASSWORD: &[u8] = b"ERROR - Bad Password";

/// Reply sent when the source policy refuses a second source on a mountpoint
pub const MOUNTPOINT_IN_USE: &[u8] = b"ERROR - Mountpoint already in use";

/// Server name advertised in the sourcetable header block
pub const SOURCETABLE_SERVER: &str = "NTRIP Caster/1.0";

/// Server name advertised to plain HTTP probes
pub const PROBE_SERVER: &str = "NTRIPCaster";

/// Default body returned to plain HTTP probes
pub const DEFAULT_GREETING: &str = "This is a NTRIP Caster";

pub(crate) const GET_PREFIX: &str = "GET ";
pub(crate) const SOURCE_PREFIX: &str = "SOURCE";
pub(crate) const AUTHORIZATION_PREFIX: &str = "Authorization:";
pub(crate) const USER_AGENT_PREFIX: &str = "User-Agent:";
pub(crate) const SOURCE_AGENT_PREFIX: &str = "Source-Agent:";
