//! Opaque firmware version value.
//!
//! Versions are compared for equality only. The update server owns the
//! ordering; the device never decides whether a version is "newer".

use core::fmt;

/// Longest version string accepted from the update server.
pub const MAX_VERSION_LEN: usize = 32;

/// Version compiled into this image. Every boot starts from it.
pub const BASELINE: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionError {
    /// Body was empty after trimming whitespace.
    Empty,
    /// Body is longer than [`MAX_VERSION_LEN`] bytes.
    TooLong,
}

impl fmt::Display for VersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "version body is empty"),
            Self::TooLong => write!(f, "version longer than {MAX_VERSION_LEN} bytes"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version(heapless::String<MAX_VERSION_LEN>);

impl Version {
    /// Parse a raw response body. Surrounding whitespace is trimmed.
    pub fn parse(raw: &str) -> Result<Self, VersionError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(VersionError::Empty);
        }
        let mut s = heapless::String::new();
        s.push_str(trimmed).map_err(|()| VersionError::TooLong)?;
        Ok(Self(s))
    }

    /// The version this firmware was built as.
    pub fn baseline() -> Self {
        // The crate version always fits; fall back to a marker if a build
        // ever sets an absurdly long one.
        Self::parse(BASELINE).unwrap_or_else(|_| Self(heapless::String::new()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
