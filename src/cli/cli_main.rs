// Main CLI entrypoint
// (c) 2024 Ross Younger

use std::process::ExitCode;

use super::args::CliArgs;
use super::styles::{ERROR, INFO};

use crate::{
    cert::Certificate,
    config::{Configuration, Manager},
    generator::Generator,
    loader::{Loader as _, PemLoader},
    util::setup_tracing,
};
use anstream::{eprintln, println};
use anyhow::Context as _;
use clap::Parser;
use tabled::{settings::style::Style, Table, Tabled};
use time::OffsetDateTime;
use tracing::{error, info};

/// Main CLI entrypoint
pub fn cli() -> anyhow::Result<ExitCode> {
    let args = CliArgs::parse();
    if args.config_files {
        println!("{:?}", Manager::config_files());
        return Ok(ExitCode::SUCCESS);
    }

    let mut manager = Manager::new();
    if let Some(path) = &args.config {
        manager.merge_toml_file(path);
    }
    manager.merge_env();
    manager.merge_provider(args.config_overrides.clone());

    if args.show_config {
        println!("{}", manager.to_display_adapter::<Configuration>(true));
        return Ok(ExitCode::SUCCESS);
    }

    let config = match manager.get::<Configuration>() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{ERROR}ERROR{ERROR:#} {e}");
            return Ok(ExitCode::FAILURE);
        }
    };

    setup_tracing(args.trace_level(), args.log_file.as_deref())
        .inspect_err(|e| eprintln!("{e:?}"))?;

    if args.inspect {
        return inspect(&config);
    }
    run(&args, config)
}

fn run(args: &CliArgs, config: Configuration) -> anyhow::Result<ExitCode> {
    let generator = Generator::builder(config).build()?;
    let result = if args.force {
        generator.generate().map(|_| ())
    } else if args.once {
        generator.load_or_generate().map(|_| ())
    } else {
        return run_until_signalled(&generator);
    };
    Ok(report(result.map_err(anyhow::Error::new)))
}

#[tokio::main(flavor = "current_thread")]
async fn run_until_signalled(generator: &Generator) -> anyhow::Result<ExitCode> {
    if let Err(e) = generator.start().await {
        return Ok(report(Err(e.into())));
    }
    if let Some(left) = generator.time_left() {
        info!("running; current certificate valid for {left}");
    }
    shutdown_signal().await?;
    info!("shutting down");
    generator.stop().await?;
    Ok(ExitCode::SUCCESS)
}

#[cfg(unix)]
async fn shutdown_signal() -> anyhow::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};
    let mut term = signal(SignalKind::terminate()).context("installing SIGTERM handler")?;
    tokio::select! {
        r = tokio::signal::ctrl_c() => r.context("waiting for ctrl-c")?,
        _ = term.recv() => (),
    }
    Ok(())
}

#[cfg(not(unix))]
async fn shutdown_signal() -> anyhow::Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("waiting for ctrl-c")
}

fn report(result: anyhow::Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

// INSPECTION ///////////////////////////////////////////////////////////////////////////////////

#[derive(Tabled)]
struct Row {
    field: &'static str,
    value: String,
}

impl Row {
    fn new<S: Into<String>>(field: &'static str, value: S) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }
}

fn describe(cert: &Certificate, now: OffsetDateTime) -> Vec<Row> {
    let left = cert.time_left(now);
    let status = if left.is_negative() {
        format!("expired {} ago", -left)
    } else {
        format!("{left} remaining")
    };
    let list = |v: Vec<String>| if v.is_empty() { "-".into() } else { v.join(", ") };
    vec![
        Row::new("common name", cert.common_name.clone().unwrap_or_default()),
        Row::new("organization", list(cert.organization.clone())),
        Row::new("DNS names", list(cert.dns_names.clone())),
        Row::new(
            "IP addresses",
            list(cert.ip_addresses.iter().map(ToString::to_string).collect()),
        ),
        Row::new("serial", cert.serial_hex()),
        Row::new("CA", cert.is_ca.to_string()),
        Row::new("not before", cert.not_before.to_string()),
        Row::new("not after", cert.not_after.to_string()),
        Row::new("status", status),
    ]
}

fn inspect(config: &Configuration) -> anyhow::Result<ExitCode> {
    let storage = config
        .file_storage()
        .context("locating certificate files")?;
    match PemLoader.load(&storage) {
        Ok(cert) => {
            println!("{INFO}{}{INFO:#}", storage.cert.location());
            println!(
                "{}",
                Table::new(describe(&cert, OffsetDateTime::now_utc())).with(Style::sharp())
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{ERROR}ERROR{ERROR:#} {:#}", anyhow::Error::new(e));
            Ok(ExitCode::FAILURE)
        }
    }
}
