// (c) 2024 Ross Younger
//! # Configuration management
//!
//! tlsgen obtains run-time configuration from the following sources, in increasing order of priority:
//! 1. Hard-wired defaults
//! 2. The system-wide configuration file (`/etc/tlsgen.toml`)
//! 3. The user's configuration file (`~/.tlsgen.toml`)
//! 4. A configuration file named with `--config`
//! 5. Environment variables named `TLSGEN_<FIELD>`, e.g. `TLSGEN_COMMON_NAME`
//! 6. Command-line options
//!
//! Each option may appear in multiple places; the highest priority source wins.
//!
//! ## File format
//!
//! Configuration files are TOML.
//!
//! ### Example
//!
//! ```toml
//! common_name = "Build Farm CA"
//! organization = ["Example Corp", "Platform Team"]
//! hosts = ["localhost", "127.0.0.1", "::1", "build.internal"]
//! cert_file = "~/.local/share/build/cert.pem"
//! key_file = "~/.local/share/build/key.pem"
//! file_mode = 0o640
//! duration = "720h"   # or a number of seconds
//! bits = 3072
//! ```
//!
//! ## Configurable options
//!
//! The full list of supported fields is defined by [Configuration].
//!
//! * `tlsgen --show-config` outputs the supported fields, their current values, and where each value came from.
//! * `tlsgen --config-files` outputs the list of configuration files for the current user and platform.
//!
//! ### Traps and tips
//! 1. In environment variables, write `file_mode` with a `0o` prefix (`TLSGEN_FILE_MODE=0o640`);
//!    a bare number there is read as decimal.
//! 1. Zero values for `bits`, `duration`, `organization` and `common_name` are replaced by the defaults.

mod structure;
pub(crate) use structure::Configuration_Optional;
pub use structure::{
    Configuration, SerialPolicy, DEFAULT_BITS, DEFAULT_COMMON_NAME, DEFAULT_DURATION,
    DEFAULT_ORGANIZATION,
};

mod manager;
pub use manager::{DisplayAdapter, Manager, ENV_PREFIX};
