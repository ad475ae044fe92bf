//! Dotted tool versions (`3.26.0`, `17.5.33530.505`, `1.82`).

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid version '{input}': {message}")]
pub struct VersionParseError {
    pub input: String,
    pub message: String,
}

/// A version made of one to four numeric components.
///
/// Missing components compare as zero, so `3.26` == `3.26.0`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ToolVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub revision: Option<u64>,
    components: u8,
}

impl ToolVersion {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            revision: None,
            components: 3,
        }
    }

    fn key(&self) -> (u64, u64, u64, u64) {
        (
            self.major,
            self.minor,
            self.patch,
            self.revision.unwrap_or(0),
        )
    }
}

impl FromStr for ToolVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |message: &str| VersionParseError {
            input: s.to_string(),
            message: message.to_string(),
        };

        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(err("empty"));
        }

        let mut parts = Vec::with_capacity(4);
        for part in trimmed.split('.') {
            let n = part
                .parse::<u64>()
                .map_err(|_| err("components must be non-negative integers"))?;
            parts.push(n);
        }
        if parts.len() > 4 {
            return Err(err("at most four components are allowed"));
        }

        Ok(Self {
            major: parts[0],
            minor: parts.get(1).copied().unwrap_or(0),
            patch: parts.get(2).copied().unwrap_or(0),
            revision: parts.get(3).copied(),
            components: parts.len() as u8,
        })
    }
}

impl TryFrom<String> for ToolVersion {
    type Error = VersionParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ToolVersion> for String {
    fn from(v: ToolVersion) -> Self {
        v.to_string()
    }
}

impl fmt::Display for ToolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.major)?;
        if self.components >= 2 {
            write!(f, ".{}", self.minor)?;
        }
        if self.components >= 3 {
            write!(f, ".{}", self.patch)?;
        }
        if let Some(rev) = self.revision {
            write!(f, ".{}", rev)?;
        }
        Ok(())
    }
}

impl PartialEq for ToolVersion {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for ToolVersion {}

impl PartialOrd for ToolVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ToolVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_three_and_four_components() {
        let v: ToolVersion = "3.26.0".parse().unwrap();
        assert_eq!((v.major, v.minor, v.patch, v.revision), (3, 26, 0, None));

        let v: ToolVersion = "17.5.33530.505".parse().unwrap();
        assert_eq!(v.major, 17);
        assert_eq!(v.revision, Some(505));
        assert_eq!(v.to_string(), "17.5.33530.505");
    }

    #[test]
    fn missing_components_compare_as_zero() {
        let a: ToolVersion = "3.26".parse().unwrap();
        let b: ToolVersion = "3.26.0".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "3.26");
    }

    #[test]
    fn ordering_is_numeric() {
        let a: ToolVersion = "3.9.0".parse().unwrap();
        let b: ToolVersion = "3.20.0".parse().unwrap();
        assert!(a < b);
    }

    #[test]
    fn rejects_garbage() {
        assert!("".parse::<ToolVersion>().is_err());
        assert!("3.x".parse::<ToolVersion>().is_err());
        assert!("1.2.3.4.5".parse::<ToolVersion>().is_err());
    }
}
