use crate::error::GatewayError;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ApiVersion {
    pub major: u32,
    pub minor: u32,
}

impl ApiVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Parses a route segment such as `v1` or `v1.0`.
    pub fn from_segment(segment: &str) -> Result<Self, GatewayError> {
        let raw = segment
            .strip_prefix('v')
            .or_else(|| segment.strip_prefix('V'))
            .ok_or_else(|| GatewayError::UnsupportedVersion(segment.to_string()))?;
        raw.parse()
    }
}

impl FromStr for ApiVersion {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || GatewayError::UnsupportedVersion(s.to_string());
        let (major, minor) = match s.split_once('.') {
            Some((major, minor)) => (major, Some(minor)),
            None => (s, None),
        };
        let major = major.parse::<u32>().map_err(|_| invalid())?;
        let minor = match minor {
            Some(minor) => minor.parse::<u32>().map_err(|_| invalid())?,
            None => 0,
        };
        Ok(Self { major, minor })
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}
