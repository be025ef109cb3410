//! Configuration structure
// (c) 2024 Ross Younger

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use serde::{Deserialize, Serialize};
use struct_field_names_as_array::FieldNamesAsSlice;

use crate::{
    storage::PairStorage,
    util::{derive_deftly_template_Optionalify, FileMode, HumanDuration},
};

use derive_deftly::Deftly;

/// Subject common name used when none is configured
pub const DEFAULT_COMMON_NAME: &str = "Shared CA";
/// Subject organization used when none is configured
pub const DEFAULT_ORGANIZATION: &str = "Private Org";
/// RSA key size used when none is configured
pub const DEFAULT_BITS: u16 = 4096;
/// Validity period used when none is configured
pub const DEFAULT_DURATION: Duration = Duration::from_secs(365 * 24 * 3600);

/// How the serial number of a generated certificate is chosen
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SerialPolicy {
    /// Derived from a hash of the freshly generated public key, so every renewal differs
    #[default]
    Unique,
    /// Always `1`
    Fixed,
}

/// The set of configurable options supported by tlsgen.
///
/// **Note:** The implementation of `default()` for this struct returns the hard-wired configuration defaults.
///
/// This structure uses the [Optionalify](derive_deftly_template_Optionalify) deftly macro to automatically
/// define the `Configuration_Optional` struct, which is the same but has all members of type `Option<whatever>`.
/// The CLI uses the `_Optional` version, with everything defaulting to `None`, so that wherever the
/// user does not provide a value, values from lower priority sources (environment, configuration files
/// and system defaults) obtain.
///
// Maintainer note: None of the members of this struct should be Option<anything>. That leads to strange warts (Some(Some(foo))).
#[derive(Deftly)]
#[derive_deftly(Optionalify)]
#[deftly(visibility = "pub(crate)")]
#[derive(Debug, Clone, PartialEq, Eq, Parser, Deserialize, Serialize, FieldNamesAsSlice)]
pub struct Configuration {
    // SUBJECT ============================================================================
    /// The certificate subject's Common Name
    /// [default: Shared CA]
    #[arg(long, value_name("NAME"), help_heading("Certificate"))]
    pub common_name: String,

    /// The certificate subject's Organization.
    /// [default: Private Org]
    ///
    /// **On the command line** repeat the option for each organization.
    /// **In a configuration file** this field is an array of strings.
    #[arg(
        short = 'O',
        long,
        value_name("ORG"),
        help_heading("Certificate")
    )]
    pub organization: Vec<String>,

    /// A host name or IP address the certificate is valid for.
    ///
    /// Entries which parse as IP addresses become IP subject alternative names;
    /// everything else becomes a DNS subject alternative name.
    ///
    /// **On the command line** repeat the option for each host, e.g. `-H localhost -H 127.0.0.1`.
    /// **In a configuration file** this field is an array of strings.
    #[arg(
        short = 'H',
        long = "host",
        value_name("HOST"),
        help_heading("Certificate")
    )]
    pub hosts: Vec<String>,

    /// How long each generated certificate is valid for.
    /// [default: 8760h]
    ///
    /// This may be a number of seconds, or a string like `24h` or `1h 30m`.
    #[arg(long, value_name("DURATION"), help_heading("Certificate"), value_parser=clap::value_parser!(HumanDuration))]
    pub duration: HumanDuration,

    /// RSA key size, in bits
    /// [default: 4096]
    #[arg(long, value_name("BITS"), help_heading("Certificate"))]
    pub bits: u16,

    /// How to choose certificate serial numbers
    /// [default: unique]
    #[arg(long, value_name("POLICY"), help_heading("Certificate"))]
    #[clap(value_enum)]
    pub serial: SerialPolicy,

    // STORAGE ============================================================================
    /// Where the certificate is stored (PEM)
    /// [default: cert.pem]
    #[arg(long, value_name("FILE"), help_heading("Storage"))]
    pub cert_file: String,

    /// Where the private key is stored (PEM, PKCS#1)
    /// [default: key.pem]
    #[arg(long, value_name("FILE"), help_heading("Storage"))]
    pub key_file: String,

    /// Permissions for the files we create, in octal
    /// [default: 600]
    #[arg(long, value_name("MODE"), help_heading("Storage"), value_parser=clap::value_parser!(FileMode))]
    pub file_mode: FileMode,
}

impl Configuration {
    /// Replaces any zero-valued generation parameters with their defaults.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        if self.bits == 0 {
            self.bits = DEFAULT_BITS;
        }
        if self.organization.is_empty() {
            self.organization = vec![DEFAULT_ORGANIZATION.into()];
        }
        if self.common_name.is_empty() {
            self.common_name = DEFAULT_COMMON_NAME.into();
        }
        if self.duration.is_zero() {
            self.duration = DEFAULT_DURATION.into();
        }
        self
    }

    /// Certificate path, with any leading `~` expanded
    pub fn cert_path(&self) -> std::io::Result<PathBuf> {
        expanduser::expanduser(&self.cert_file)
    }

    /// Key path, with any leading `~` expanded
    pub fn key_path(&self) -> std::io::Result<PathBuf> {
        expanduser::expanduser(&self.key_file)
    }

    /// The file-backed storage described by this configuration
    pub fn file_storage(&self) -> std::io::Result<PairStorage> {
        Ok(PairStorage::files(
            self.cert_path()?,
            self.key_path()?,
            self.file_mode.bits(),
        ))
    }
}

impl Default for Configuration {
    /// **(Unusual!)**
    /// Returns the hard-wired configuration defaults.
    fn default() -> Self {
        Self {
            common_name: DEFAULT_COMMON_NAME.into(),
            organization: vec![DEFAULT_ORGANIZATION.into()],
            hosts: Vec::new(),
            duration: DEFAULT_DURATION.into(),
            bits: DEFAULT_BITS,
            serial: SerialPolicy::default(),
            cert_file: "cert.pem".into(),
            key_file: "key.pem".into(),
            file_mode: FileMode(crate::storage::DEFAULT_FILE_MODE),
        }
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::{Configuration, SerialPolicy, DEFAULT_BITS, DEFAULT_DURATION};
    use crate::util::FileMode;

    #[test]
    fn zero_values_are_defaulted() {
        let cfg = Configuration {
            common_name: String::new(),
            organization: vec![],
            hosts: vec!["localhost".into()],
            duration: Duration::ZERO.into(),
            bits: 0,
            serial: SerialPolicy::Fixed,
            cert_file: "c.pem".into(),
            key_file: "k.pem".into(),
            file_mode: FileMode(0o644),
        }
        .with_defaults();
        assert_eq!(cfg.common_name, "Shared CA");
        assert_eq!(cfg.organization, vec!["Private Org".to_string()]);
        assert_eq!(cfg.bits, DEFAULT_BITS);
        assert_eq!(*cfg.duration, DEFAULT_DURATION);
        // untouched
        assert_eq!(cfg.hosts, vec!["localhost".to_string()]);
        assert_eq!(cfg.serial, SerialPolicy::Fixed);
        assert_eq!(cfg.file_mode, FileMode(0o644));
    }

    #[test]
    fn explicit_values_survive() {
        let cfg = Configuration {
            common_name: "Test CA".into(),
            organization: vec!["A".into(), "B".into()],
            bits: 2048,
            duration: Duration::from_secs(60).into(),
            ..Default::default()
        };
        let defaulted = cfg.clone().with_defaults();
        assert_eq!(cfg, defaulted);
    }

    #[test]
    fn serialized_field_names() {
        let v = serde_json::to_value(Configuration::default()).unwrap();
        assert_eq!(v["bits"], 4096);
        assert_eq!(v["duration"], 365 * 24 * 3600);
        assert_eq!(v["serial"], "unique");
        assert_eq!(v["file_mode"], 0o600);
    }

    #[test]
    fn tilde_expansion() {
        let cfg = Configuration {
            cert_file: "/absolute/cert.pem".into(),
            ..Default::default()
        };
        assert_eq!(
            cfg.cert_path().unwrap(),
            std::path::PathBuf::from("/absolute/cert.pem")
        );
    }
}
