// tlsgen command-line arguments
// (c) 2024 Ross Younger

use clap::Parser;

use crate::config::Configuration_Optional;

#[derive(Debug, Parser, Clone)]
#[command(
    author,
    version,
    about,
    before_help = "e.g.   tlsgen -H localhost -H 127.0.0.1 --cert-file /srv/tls/cert.pem --key-file /srv/tls/key.pem",
    infer_long_args(true)
)]
#[command(help_template(
    "\
{name} version {version}
{about-with-newline}
{usage-heading} {usage}
{before-help}
{all-args}{after-help}
"
))]
#[command(styles=super::styles::CLAP_STYLES)]
#[allow(clippy::struct_excessive_bools)]
pub(crate) struct CliArgs {
    // MODE SELECTION ======================================================================
    /// Loads the certificate (generating or renewing it if necessary), then exits.
    #[arg(long, help_heading("Modes"), conflicts_with_all(["force", "inspect", "show_config", "config_files"]))]
    pub once: bool,

    /// Generates a new certificate unconditionally, then exits.
    #[arg(long, help_heading("Modes"), conflicts_with_all(["inspect", "show_config", "config_files"]))]
    pub force: bool,

    /// Prints details of the stored certificate, then exits.
    #[arg(long, help_heading("Modes"), conflicts_with_all(["show_config", "config_files"]))]
    pub inspect: bool,

    /// Outputs the configuration, then exits.
    ///
    /// This shows every field, its current value, and where the value came from.
    #[arg(long, help_heading("Configuration"), conflicts_with("config_files"))]
    pub show_config: bool,

    /// Outputs the paths to configuration file(s), then exits
    #[arg(long, help_heading("Configuration"))]
    pub config_files: bool,

    /// Reads additional configuration from this file.
    ///
    /// This takes priority over the system and user configuration files.
    /// The file must exist.
    #[arg(long, value_name("FILE"), help_heading("Configuration"))]
    pub config: Option<String>,

    // DEBUG ===============================================================================
    /// Quiet mode: reports only errors
    #[arg(short, long, action, conflicts_with("debug"), help_heading("Debug"))]
    pub quiet: bool,

    /// Enable detailed debug output
    ///
    /// This has the same effect as setting `RUST_LOG=tlsgen=trace` in the environment.
    /// If present, `RUST_LOG` overrides this option.
    #[arg(short, long, action, help_heading("Debug"))]
    pub debug: bool,

    /// Log to a file
    ///
    /// By default the log receives everything printed to stderr.
    /// To override this behaviour, set the environment variable `RUST_LOG_FILE_DETAIL` (same semantics as `RUST_LOG`).
    #[arg(short('l'), long, action, help_heading("Debug"), value_name("FILE"))]
    pub log_file: Option<String>,

    // CONFIGURABLE OPTIONS ================================================================
    #[command(flatten)]
    /// The set of options which may be set in a config file or via command-line.
    pub config_overrides: Configuration_Optional,
}

impl CliArgs {
    /// The trace level implied by `--debug` and `--quiet`
    pub(crate) fn trace_level(&self) -> &'static str {
        if self.debug {
            "trace"
        } else if self.quiet {
            "error"
        } else {
            "info"
        }
    }

    /// Are we running the generator until interrupted (as opposed to a one-shot mode)?
    pub(crate) fn is_daemon(&self) -> bool {
        !(self.once || self.force || self.inspect || self.show_config || self.config_files)
    }
}

#[cfg(test)]
mod test {
    use clap::Parser;

    use super::CliArgs;

    #[test]
    fn default_is_daemon() {
        let args = CliArgs::try_parse_from(["tlsgen"]).unwrap();
        assert!(args.is_daemon());
        assert_eq!(args.trace_level(), "info");
    }

    #[test]
    fn modes_conflict() {
        assert!(CliArgs::try_parse_from(["tlsgen", "--once", "--force"]).is_err());
        assert!(CliArgs::try_parse_from(["tlsgen", "--inspect", "--show-config"]).is_err());
        let args = CliArgs::try_parse_from(["tlsgen", "--force"]).unwrap();
        assert!(!args.is_daemon());
    }

    #[test]
    fn debug_and_quiet_conflict() {
        assert!(CliArgs::try_parse_from(["tlsgen", "-d", "-q"]).is_err());
        let args = CliArgs::try_parse_from(["tlsgen", "-q"]).unwrap();
        assert_eq!(args.trace_level(), "error");
    }

    #[test]
    fn configuration_fields_are_options() {
        let args = CliArgs::try_parse_from([
            "tlsgen",
            "-H",
            "localhost",
            "--host",
            "127.0.0.1",
            "-O",
            "Org A",
            "--bits",
            "2048",
            "--duration",
            "24h",
            "--file-mode",
            "640",
            "--serial",
            "fixed",
        ])
        .unwrap();
        let o = &args.config_overrides;
        assert_eq!(
            o.hosts,
            Some(vec!["localhost".to_string(), "127.0.0.1".to_string()])
        );
        assert_eq!(o.organization, Some(vec!["Org A".to_string()]));
        assert_eq!(o.bits, Some(2048));
        assert_eq!(o.duration.map(|d| d.as_secs()), Some(24 * 3600));
        assert_eq!(o.file_mode.map(|m| m.bits()), Some(0o640));
        assert_eq!(o.serial, Some(crate::config::SerialPolicy::Fixed));
        assert!(o.cert_file.is_none());
    }
}
