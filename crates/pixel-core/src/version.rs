//! App version tokens
//!
//! Versions compare numerically per dot segment (`major.minor.patch`), with
//! missing trailing segments treated as zero, so `2.0` equals `2.0.0`.
//! Anything after the leading digits of a segment (`0-beta`, `3rc1`) is
//! ignored for ordering.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::PixelError;

#[derive(Debug, Clone)]
pub struct AppVersion {
    segments: Vec<u64>,
}

impl AppVersion {
    pub fn parse(raw: &str) -> Result<Self, PixelError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PixelError::InvalidVersion(raw.to_string()));
        }

        let mut segments = Vec::new();
        for segment in trimmed.split('.') {
            let digits: String = segment.chars().take_while(|c| c.is_ascii_digit()).collect();
            if digits.is_empty() {
                return Err(PixelError::InvalidVersion(raw.to_string()));
            }
            let value = digits
                .parse::<u64>()
                .map_err(|_| PixelError::InvalidVersion(raw.to_string()))?;
            segments.push(value);
        }

        Ok(Self { segments })
    }
}

impl FromStr for AppVersion {
    type Err = PixelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Ord for AppVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        for i in 0..len {
            let a = self.segments.get(i).copied().unwrap_or(0);
            let b = other.segments.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for AppVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for AppVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for AppVersion {}

impl fmt::Display for AppVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.segments.iter().map(|s| s.to_string()).collect();
        write!(f, "{}", parts.join("."))
    }
}

impl Serialize for AppVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for AppVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> AppVersion {
        AppVersion::parse(s).unwrap()
    }

    #[test]
    fn test_numeric_not_lexical_ordering() {
        assert!(v("1.10.0") > v("1.9.9"));
        assert!(v("1.9.9") < v("2.0.0"));
    }

    #[test]
    fn test_missing_segments_are_zero() {
        assert_eq!(v("2"), v("2.0.0"));
        assert!(v("2.0.1") > v("2.0"));
    }

    #[test]
    fn test_prerelease_tail_is_ignored() {
        assert_eq!(v("7.100.0-beta"), v("7.100.0"));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(AppVersion::parse("").is_err());
        assert!(AppVersion::parse("abc").is_err());
        assert!(AppVersion::parse("1..2").is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&v("1.2.3")).unwrap();
        assert_eq!(json, "\"1.2.3\"");
        let back: AppVersion = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v("1.2.3"));
    }
}
