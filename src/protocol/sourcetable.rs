//! Sourcetable generation
//!
//! The sourcetable is the discovery document NTRIP clients request with
//! `GET /` (or any unknown mountpoint). Deployed client software parses it
//! field by field, so the layout must not drift.
//!
//! Mountpoints are printed in their normalized form (lowercase, no leading
//! `/`), the same form clients are matched against, so a name listed here
//! always resolves. A catalog entry configured as `TEST1` is listed as
//! `test1`.

use std::fmt::Write;

use crate::catalog::SourceEntry;

use super::constants::SOURCETABLE_SERVER;

/// Render one `STR;` record, CRLF-terminated.
pub fn str_record(source: &SourceEntry) -> String {
    format!(
        "STR;{};{};{};;{};{};{};{};{:.2};{:.2};0;0;Unknown;none;{};N;9600;\r\n",
        source.mountpoint,
        source.identifier,
        source.format,
        source.carrier.code(),
        source.nav_system,
        source.network,
        source.country,
        source.latitude,
        source.longitude,
        if source.auth_required { "B" } else { "N" },
    )
}

/// Render the complete sourcetable response for the given sources.
pub fn render<'a>(sources: impl IntoIterator<Item = &'a SourceEntry>) -> String {
    let table: String = sources.into_iter().map(str_record).collect();

    let mut out = String::with_capacity(table.len() + 128);
    // Writing into a String cannot fail
    let _ = write!(
        out,
        "SOURCETABLE 200 OK\r\nServer: {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\n\r\n",
        SOURCETABLE_SERVER,
        table.len()
    );
    out.push_str(&table);
    out.push_str("ENDSOURCETABLE\r\n");
    out
}
