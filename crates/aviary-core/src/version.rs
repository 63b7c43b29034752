//! Tolerant component-wise version type.
//!
//! Capability servers report versions as free-form strings like `"1.2"` or
//! `"0.4.11"`. Comparison is numeric per component with missing components
//! treated as zero, so `"1.2"` and `"1.2.0"` compare equal.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A three-component numeric version.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Version {
    /// Major component.
    pub major: u64,
    /// Minor component. Zero when absent from the source string.
    pub minor: u64,
    /// Patch component. Zero when absent from the source string.
    pub patch: u64,
}

impl Version {
    /// Creates a new version.
    #[must_use]
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Whether this version satisfies a minimum requirement.
    #[must_use]
    pub fn satisfies_min(&self, min: &Version) -> bool {
        self >= min
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Error parsing a version string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseVersionError {
    /// The string was empty.
    #[error("empty version string")]
    Empty,
    /// A component was not a non-negative integer.
    #[error("non-numeric version component: {0}")]
    NonNumeric(String),
    /// More than three dotted components.
    #[error("too many version components: {0}")]
    TooManyComponents(String),
}

impl FromStr for Version {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseVersionError::Empty);
        }
        let mut components = [0u64; 3];
        let mut count = 0usize;
        for part in s.split('.') {
            if count == 3 {
                return Err(ParseVersionError::TooManyComponents(s.to_string()));
            }
            components[count] = part
                .trim()
                .parse::<u64>()
                .map_err(|_| ParseVersionError::NonNumeric(part.to_string()))?;
            count = count.saturating_add(1);
        }
        Ok(Self::new(components[0], components[1], components[2]))
    }
}
