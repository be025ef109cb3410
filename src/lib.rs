//! Self-signed TLS certificate generator with automatic renewal
// (c) 2024 Ross Younger
//!
//! tlsgen issues a self-signed X509 CA certificate and RSA private key for a set of
//! host names and IP addresses, persists them, and regenerates them shortly before they expire.
//!
//! The core is the [`Generator`]: on [`start`](Generator::start) it loads the existing pair
//! from [storage](storage), generating one if there is none, then re-examines it every
//! [`RENEWAL_INTERVAL`](generator::RENEWAL_INTERVAL). A pair with less than
//! [`RENEWAL_WINDOW`](generator::RENEWAL_WINDOW) left to run is replaced.
//!
//! ## Files
//!
//! * The certificate is a single `CERTIFICATE` PEM block.
//! * The key is a single `RSA PRIVATE KEY` (PKCS#1) PEM block.
//!
//! Both are written atomically (see [`storage::SafeFileStorage`]), but one after the other;
//! if the second write fails, the stored pair no longer matches and the next load says so.
//!
//! ## Command line
//!
//! The `tlsgen` binary runs the generator until interrupted. See `tlsgen --help`, and
//! [config] for how it is configured.

/// The in-memory certificate
pub mod cert;
mod cli;
pub use cli::cli;
pub mod config;
pub use config::Configuration;
pub mod error;
pub use error::Error;
pub mod generator;
pub use generator::{Generator, GeneratorBuilder};
pub mod loader;
pub mod storage;
/// Utilities
pub mod util;

// Required by derive-deftly for exported templates (they refer to `$crate::derive_deftly`)
#[doc(hidden)]
pub use derive_deftly;
