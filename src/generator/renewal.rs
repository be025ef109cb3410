//! Expiry-driven renewal decisions
// (c) 2024 Ross Younger

use std::time::Duration;

/// How often the background task re-examines the certificate
pub const RENEWAL_INTERVAL: Duration = Duration::from_secs(47 * 3600);

/// A certificate with this much validity left (or less) is renewed
pub const RENEWAL_WINDOW: time::Duration = time::Duration::hours(48);

// The loop must always get at least one look inside the window.
static_assertions::const_assert!(RENEWAL_INTERVAL.as_secs() < RENEWAL_WINDOW.whole_seconds().unsigned_abs());

/// The outcome of examining the current certificate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Renewal {
    /// The certificate has comfortably long left to run; nothing was done
    NotNeeded {
        /// Time remaining
        left: time::Duration,
    },
    /// The certificate is inside the renewal window
    ExpiringSoon {
        /// Time remaining
        left: time::Duration,
    },
    /// The certificate has already expired
    Expired {
        /// How long since expiry
        ago: time::Duration,
    },
    /// No certificate is held
    Missing,
}

impl std::fmt::Display for Renewal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Renewal::NotNeeded { left } => write!(f, "certificate valid for {left}"),
            Renewal::ExpiringSoon { left } => write!(f, "certificate expires in {left}"),
            Renewal::Expired { ago } => write!(f, "certificate expired {ago} ago"),
            Renewal::Missing => f.write_str("no certificate held"),
        }
    }
}

impl Renewal {
    /// Decides what to do given the validity remaining (`None` if there is no certificate)
    #[must_use]
    pub fn assess(left: Option<time::Duration>) -> Self {
        match left {
            None => Renewal::Missing,
            Some(left) if left.is_negative() => Renewal::Expired { ago: -left },
            Some(left) if left <= RENEWAL_WINDOW => Renewal::ExpiringSoon { left },
            Some(left) => Renewal::NotNeeded { left },
        }
    }

    /// Does this outcome call for a new certificate?
    #[must_use]
    pub fn is_needed(self) -> bool {
        !matches!(self, Renewal::NotNeeded { .. })
    }
}

#[cfg(test)]
mod test {
    use time::Duration;

    use super::{Renewal, RENEWAL_WINDOW};

    #[test]
    fn plenty_left() {
        let r = Renewal::assess(Some(Duration::hours(100)));
        assert_eq!(
            r,
            Renewal::NotNeeded {
                left: Duration::hours(100)
            }
        );
        assert!(!r.is_needed());
    }

    #[test]
    fn window_boundary() {
        assert!(Renewal::assess(Some(RENEWAL_WINDOW)).is_needed());
        assert!(!Renewal::assess(Some(RENEWAL_WINDOW + Duration::seconds(1))).is_needed());
    }

    #[test]
    fn expiring_soon() {
        assert_eq!(
            Renewal::assess(Some(Duration::hours(1))),
            Renewal::ExpiringSoon {
                left: Duration::hours(1)
            }
        );
        // exactly at expiry is not yet "expired"
        assert!(matches!(
            Renewal::assess(Some(Duration::ZERO)),
            Renewal::ExpiringSoon { .. }
        ));
    }

    #[test]
    fn expired() {
        let r = Renewal::assess(Some(Duration::hours(-3)));
        assert_eq!(
            r,
            Renewal::Expired {
                ago: Duration::hours(3)
            }
        );
        assert!(r.is_needed());
    }

    #[test]
    fn missing() {
        assert_eq!(Renewal::assess(None), Renewal::Missing);
        assert!(Renewal::Missing.is_needed());
    }

    #[test]
    fn display() {
        assert_eq!(Renewal::Missing.to_string(), "no certificate held");
        assert!(Renewal::Expired {
            ago: Duration::hours(3)
        }
        .to_string()
        .starts_with("certificate expired "));
    }
}
