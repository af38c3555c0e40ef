//! Configured client accounts

use serde::Deserialize;

/// A client account and the mountpoints it may subscribe to
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct User {
    /// Account name, matched case-insensitively
    pub name: String,
    /// Account password, matched case-insensitively
    pub password: String,
    /// Mountpoints this account may subscribe to (normalized by the catalog)
    #[serde(default)]
    pub mountpoints: Vec<String>,
}

impl User {
    /// Create a user
    pub fn new(
        name: impl Into<String>,
        password: impl Into<String>,
        mountpoints: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            password: password.into(),
            mountpoints: mountpoints.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether this account may subscribe to `mountpoint`
    pub fn may_access(&self, mountpoint: &str) -> bool {
        self.mountpoints.iter().any(|m| m == mountpoint)
    }
}
