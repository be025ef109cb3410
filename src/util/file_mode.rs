//! Serialization helper type - Unix permission bits, written in octal
// (c) 2024 Ross Younger

use std::{fmt::Display, str::FromStr};

use anyhow::Context as _;
use serde::Serialize;

use super::cli::IntOrString;

/// Unix permission bits for files we create.
///
/// As a string this is always octal, with or without a `0o` prefix: `640` and `0o640` are the same.
/// As an integer it is taken literally, so in a TOML file write `file_mode = 0o640`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(into = "u32")]
pub struct FileMode(pub u32);

impl FileMode {
    /// Largest meaningful mode (including setuid, setgid and sticky bits)
    pub const MAX: u32 = 0o7777;

    /// Raw accessor
    #[must_use]
    pub fn bits(self) -> u32 {
        self.0
    }
}

impl From<FileMode> for u32 {
    fn from(value: FileMode) -> Self {
        value.0
    }
}

impl TryFrom<u64> for FileMode {
    type Error = anyhow::Error;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        let v = u32::try_from(value)?;
        anyhow::ensure!(v <= Self::MAX, "file mode {v:#o} out of range");
        Ok(Self(v))
    }
}

impl FromStr for FileMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim();
        let digits = digits.strip_prefix("0o").unwrap_or(digits);
        let v = u32::from_str_radix(digits, 8)
            .with_context(|| format!("invalid octal file mode {s:?}"))?;
        Self::try_from(u64::from(v))
    }
}

impl Display for FileMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#o}", self.0)
    }
}

impl<'de> serde::Deserialize<'de> for FileMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_any(IntOrString::new())
    }
}
