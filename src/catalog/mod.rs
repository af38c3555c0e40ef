//! Mountpoint catalog
//!
//! Read-only view of the configured sources and users. The catalog is
//! built once before the listener starts and shared by every connection
//! task; lookups never mutate it.
//!
//! Mountpoints are normalized on the way in with the same rule the request
//! parser applies, so lookups are plain string equality.

pub mod source;
pub mod user;

pub use source::{Carrier, SourceEntry};
pub use user::User;

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::protocol::normalize_mountpoint;

/// Immutable catalog of sources and users
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    sources: Vec<SourceEntry>,
    users: Vec<User>,
}

impl Catalog {
    /// Build a catalog, normalizing every mountpoint.
    ///
    /// Fails if two sources normalize to the same mountpoint or a source
    /// normalizes to the empty mountpoint (reserved for the sourcetable).
    pub fn new(sources: Vec<SourceEntry>, users: Vec<User>) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut normalized_sources = Vec::with_capacity(sources.len());

        for mut source in sources {
            source.mountpoint = normalize_mountpoint(&source.mountpoint);
            if source.mountpoint.is_empty() {
                return Err(Error::Config("source with empty mountpoint".into()));
            }
            if !seen.insert(source.mountpoint.clone()) {
                return Err(Error::Config(format!(
                    "duplicate mountpoint '{}'",
                    source.mountpoint
                )));
            }
            normalized_sources.push(source);
        }

        let users = users
            .into_iter()
            .map(|mut user| {
                user.mountpoints = user
                    .mountpoints
                    .iter()
                    .map(|m| normalize_mountpoint(m))
                    .collect();
                user
            })
            .collect();

        Ok(Self {
            sources: normalized_sources,
            users,
        })
    }

    /// All sources in configuration order
    pub fn sources(&self) -> &[SourceEntry] {
        &self.sources
    }

    /// All users
    pub fn users(&self) -> &[User] {
        &self.users
    }

    /// Configured mountpoint names
    pub fn mountpoints(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|s| s.mountpoint.as_str())
    }

    /// Look up a source by normalized mountpoint
    pub fn source(&self, mountpoint: &str) -> Option<&SourceEntry> {
        self.sources.iter().find(|s| s.mountpoint == mountpoint)
    }

    /// Look up a user by name, case-insensitively
    pub fn user(&self, name: &str) -> Option<&User> {
        self.users.iter().find(|u| eq_ignore_case(&u.name, name))
    }

    /// Check a source's `SOURCE` password against the entry
    pub fn authorize_source(&self, source: &SourceEntry, password: Option<&str>) -> bool {
        password.is_some_and(|p| eq_ignore_case(&source.password, p))
    }

    /// Check whether a client may subscribe to `source`.
    ///
    /// Open mountpoints admit anyone; otherwise the credentials must match a
    /// configured user who is entitled to the mountpoint.
    pub fn authorize_client(
        &self,
        source: &SourceEntry,
        username: Option<&str>,
        password: Option<&str>,
    ) -> bool {
        if !source.auth_required {
            return true;
        }

        let (Some(username), Some(password)) = (username, password) else {
            return false;
        };

        self.user(username).is_some_and(|user| {
            eq_ignore_case(&user.password, password) && user.may_access(&source.mountpoint)
        })
    }
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b) || a.to_lowercase() == b.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(mountpoint: &str, auth_required: bool) -> SourceEntry {
        SourceEntry {
            mountpoint: mountpoint.into(),
            identifier: "Station".into(),
            format: "RTCM 3".into(),
            carrier: Carrier::L1,
            nav_system: "GPS".into(),
            network: "NET".into(),
            country: "NLD".into(),
            latitude: 52.0,
            longitude: 4.0,
            auth_required,
            password: "SourcePass".into(),
        }
    }

    fn catalog() -> Catalog {
        Catalog::new(
            vec![source("/OPEN", false), source("/Closed", true), source("other", true)],
            vec![User::new("Alice", "Secret", ["/CLOSED"])],
        )
        .unwrap()
    }

    #[test]
    fn test_mountpoints_are_normalized() {
        let catalog = catalog();
        let names: Vec<&str> = catalog.mountpoints().collect();

        assert_eq!(names, vec!["open", "closed", "other"]);
        assert!(catalog.source("closed").is_some());
        assert!(catalog.source("Closed").is_none());
        assert_eq!(catalog.users()[0].mountpoints, vec!["closed".to_string()]);
    }

    #[test]
    fn test_duplicate_mountpoint_rejected() {
        let result = Catalog::new(vec![source("/A", false), source("a", true)], vec![]);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_empty_mountpoint_rejected() {
        let result = Catalog::new(vec![source("/", false)], vec![]);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_user_lookup_case_insensitive() {
        let catalog = catalog();
        assert!(catalog.user("alice").is_some());
        assert!(catalog.user("ALICE").is_some());
        assert!(catalog.user("bob").is_none());
    }

    #[test]
    fn test_authorize_source() {
        let catalog = catalog();
        let entry = catalog.source("open").unwrap();

        assert!(catalog.authorize_source(entry, Some("sourcepass")));
        assert!(catalog.authorize_source(entry, Some("SourcePass")));
        assert!(!catalog.authorize_source(entry, Some("wrong")));
        assert!(!catalog.authorize_source(entry, None));
    }

    #[test]
    fn test_authorize_client_open_mountpoint() {
        let catalog = catalog();
        let entry = catalog.source("open").unwrap();

        assert!(catalog.authorize_client(entry, None, None));
        assert!(catalog.authorize_client(entry, Some("nobody"), Some("x")));
    }

    #[test]
    fn test_authorize_client_closed_mountpoint() {
        let catalog = catalog();
        let closed = catalog.source("closed").unwrap();
        let other = catalog.source("other").unwrap();

        assert!(catalog.authorize_client(closed, Some("alice"), Some("secret")));
        assert!(catalog.authorize_client(closed, Some("ALICE"), Some("SECRET")));
        assert!(!catalog.authorize_client(closed, Some("alice"), Some("wrong")));
        assert!(!catalog.authorize_client(closed, Some("bob"), Some("secret")));
        assert!(!catalog.authorize_client(closed, None, None));
        // Valid credentials, but not entitled to this mountpoint
        assert!(!catalog.authorize_client(other, Some("alice"), Some("secret")));
    }
}
