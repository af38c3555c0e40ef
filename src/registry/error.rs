//! Registry error types

use std::fmt;

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Mountpoint is not in the catalog
    UnknownMountpoint(String),
    /// Source policy refused another source on this mountpoint
    MountpointInUse(String),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::UnknownMountpoint(mp) => write!(f, "Unknown mountpoint: {}", mp),
            RegistryError::MountpointInUse(mp) => {
                write!(f, "Mountpoint already has a source: {}", mp)
            }
        }
    }
}

impl std::error::Error for RegistryError {}
