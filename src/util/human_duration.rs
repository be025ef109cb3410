//! Serialization helper type - Duration parseable by humanize_rs
// (c) 2024 Ross Younger

use std::{fmt::Display, ops::Deref, str::FromStr, time::Duration};

use anyhow::Context as _;
use serde::Serialize;

use super::cli::IntOrString;

/// A period of time, which may be expressed as a plain number of seconds or as a
/// human-friendly string like `24h` or `1h 30m`.
///
/// Always serializes as a whole number of seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(into = "u64")]
pub struct HumanDuration(pub Duration);

impl HumanDuration {
    /// Constructs from a number of hours
    #[must_use]
    pub const fn from_hours(hours: u64) -> Self {
        Self(Duration::from_secs(hours * 3600))
    }
}

impl Deref for HumanDuration {
    type Target = Duration;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<HumanDuration> for u64 {
    fn from(value: HumanDuration) -> Self {
        value.0.as_secs()
    }
}

impl From<u64> for HumanDuration {
    fn from(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }
}

impl From<Duration> for HumanDuration {
    fn from(value: Duration) -> Self {
        Self(value)
    }
}

impl FromStr for HumanDuration {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(secs) = s.parse::<u64>() {
            return Ok(secs.into());
        }
        humanize_rs::duration::parse(s)
            .map(Self)
            .map_err(|e| anyhow::anyhow!("{e:?}"))
            .with_context(|| format!("parsing duration {s:?}"))
    }
}

impl Display for HumanDuration {
    /// Formats in a way which [`FromStr`] will accept, e.g. `8760h` or `1h 30m 5s`
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let secs = self.0.as_secs();
        let (h, m, s) = (secs / 3600, (secs / 60) % 60, secs % 60);
        let mut parts = Vec::new();
        if h > 0 {
            parts.push(format!("{h}h"));
        }
        if m > 0 {
            parts.push(format!("{m}m"));
        }
        if s > 0 || parts.is_empty() {
            parts.push(format!("{s}s"));
        }
        write!(f, "{}", parts.join(" "))
    }
}

impl<'de> serde::Deserialize<'de> for HumanDuration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_any(IntOrString::new())
    }
}
