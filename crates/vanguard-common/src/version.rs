//! Version types for data file compatibility.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::VersionParseError;

/// Schema version using semantic versioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemaVersion {
    /// Major version (breaking changes)
    pub major: u16,
    /// Minor version (backwards-compatible additions)
    pub minor: u16,
    /// Patch version (bug fixes)
    pub patch: u16,
}

impl SchemaVersion {
    /// Creates a new schema version.
    #[must_use]
    pub const fn new(major: u16, minor: u16, patch: u16) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Current attack definition file version.
    pub const ATTACK_DEFINITIONS: Self = Self::new(1, 0, 0);

    /// Checks if this version is compatible with another version.
    /// Compatible means same major version and this minor >= other minor.
    #[must_use]
    pub const fn is_compatible_with(&self, other: &Self) -> bool {
        self.major == other.major && self.minor >= other.minor
    }

    /// Checks if this version can read data from another version.
    #[must_use]
    pub const fn can_read(&self, data_version: &Self) -> bool {
        self.major == data_version.major
    }
}

impl std::fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for SchemaVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split('.');
        let mut next = || -> Result<u16, VersionParseError> {
            match parts.next() {
                Some(part) => part
                    .parse()
                    .map_err(|_| VersionParseError::InvalidComponent(part.to_string())),
                None => Ok(0),
            }
        };

        let major = next()?;
        let minor = next()?;
        let patch = next()?;

        if parts.next().is_some() {
            return Err(VersionParseError::TooManyComponents(s.to_string()));
        }

        Ok(Self::new(major, minor, patch))
    }
}
