//! Error types
// (c) 2024 Ross Younger

use std::io;

/// Boxed error source, for failures inside third-party crypto crates whose error types we don't expose
pub type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Which half of a certificate pair an operation concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Artifact {
    /// The X509 certificate
    #[strum(to_string = "certificate")]
    Certificate,
    /// The RSA private key
    #[strum(to_string = "private key")]
    PrivateKey,
}

/// Failure to load an existing certificate pair from storage
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// One or both halves of the pair are absent. This is expected on first run.
    #[error("{location} does not exist")]
    NotFound {
        /// Where we looked
        location: String,
    },
    /// The artifact exists but could not be read
    #[error("failed to read {location}")]
    Io {
        /// Where we looked
        location: String,
        /// Underlying error
        #[source]
        source: io::Error,
    },
    /// The certificate source contained no `CERTIFICATE` block
    #[error("no certificate found in {location}")]
    MissingCertificate {
        /// Where we looked
        location: String,
    },
    /// The key source contained no private key block
    #[error("no private key found in {location}")]
    MissingKey {
        /// Where we looked
        location: String,
    },
    /// Some content was found but is not a valid certificate
    #[error("failed to parse {location}: {reason}")]
    Parse {
        /// Where we looked
        location: String,
        /// What went wrong
        reason: String,
    },
    /// The private key is not an RSA key we understand
    #[error("unsupported private key in {location}: {reason}")]
    UnsupportedKey {
        /// Where we looked
        location: String,
        /// What went wrong
        reason: String,
    },
    /// The private key does not belong to the certificate
    #[error("private key {key} does not match certificate {cert}")]
    Mismatch {
        /// Certificate location
        cert: String,
        /// Key location
        key: String,
    },
}

impl LoadError {
    /// Was this failure caused by the pair not existing?
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, LoadError::NotFound { .. })
    }
}

/// Errors arising from the certificate generator
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An existing pair could not be loaded (and it was not simply absent)
    #[error("load certificate {cert} and key {key} failed")]
    Load {
        /// Certificate location
        cert: String,
        /// Key location
        key: String,
        /// Underlying error
        #[source]
        source: LoadError,
    },
    /// RSA key generation (or encoding) failed
    #[error("generate {bits}-bit RSA key")]
    KeyGeneration {
        /// Requested key size
        bits: u16,
        /// Underlying error
        #[source]
        source: BoxedSource,
    },
    /// The certificate could not be constructed or signed
    #[error("create x509 certificate")]
    CertificateBuild(#[source] BoxedSource),
    /// Writing one half of the pair failed
    #[error("write {artifact} to {location}")]
    Write {
        /// What we were writing
        artifact: Artifact,
        /// Where we were writing it
        location: String,
        /// Underlying error
        #[source]
        source: io::Error,
    },
    /// The freshly written pair could not be read back
    #[error("reload freshly generated certificate")]
    Reload(#[source] LoadError),
    /// The configured storage could not be set up (e.g. an unexpandable `~user` path)
    #[error("set up certificate storage")]
    Storage(#[source] io::Error),
    /// A blocking worker task failed to complete
    #[error("certificate worker task failed")]
    Task(#[from] tokio::task::JoinError),
}

impl Error {
    pub(crate) fn certificate_build<E>(e: E) -> Self
    where
        E: Into<BoxedSource>,
    {
        Error::CertificateBuild(e.into())
    }
}
