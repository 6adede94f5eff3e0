//! Error types shared across Project Vanguard crates.

use thiserror::Error;

/// Failure to parse a `major.minor.patch` version string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionParseError {
    /// A component was not a number.
    #[error("invalid version component: {0:?}")]
    InvalidComponent(String),

    /// More than three components were given.
    #[error("too many version components in {0:?}")]
    TooManyComponents(String),
}
