//! TSAudit - compliance checks for a host's time-synchronization subsystem.

mod attributes;
mod report;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use tsaudit_controls::{resolve, run_controls, ControlSettings};
use tsaudit_inspect::{detect_facts, LocalInspector};

#[derive(Parser)]
#[command(name = "tsaudit")]
#[command(
    author,
    version,
    about = "Audit the time-synchronization setup of the local host"
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the control set and report results
    Audit {
        /// Declared time-sync package (ntp, openntpd, chrony, or none)
        #[arg(long)]
        package: Option<String>,

        /// Expected upstream server, repeatable
        #[arg(long = "server")]
        servers: Vec<String>,

        /// YAML attributes file (ntp_package, ntp_servers)
        #[arg(long)]
        attributes: Option<PathBuf>,

        /// Allowed drift-file age in hours
        #[arg(long, default_value = "8")]
        drift_window_hours: i64,

        /// Timeout for status commands in seconds
        #[arg(long, default_value = "5")]
        command_timeout: u64,

        /// Report format (text, json)
        #[arg(long, default_value = "text")]
        format: String,

        /// Write the report to a file instead of stdout
        #[arg(long, short)]
        out: Option<PathBuf>,
    },

    /// Resolve and print the platform profile without running controls
    Profile {
        /// Declared time-sync package (ntp, openntpd, chrony, or none)
        #[arg(long)]
        package: Option<String>,

        /// Expected upstream server, repeatable
        #[arg(long = "server")]
        servers: Vec<String>,

        /// YAML attributes file (ntp_package, ntp_servers)
        #[arg(long)]
        attributes: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    match run(cli.command).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(2)
        }
    }
}

async fn run(command: Commands) -> anyhow::Result<bool> {
    match command {
        Commands::Audit {
            package,
            servers,
            attributes,
            drift_window_hours,
            command_timeout,
            format,
            out,
        } => {
            let config = attributes::load(attributes.as_deref(), package.as_deref(), &servers)?;
            let inspector = LocalInspector::new();
            let facts = detect_facts(&inspector).await?;
            info!(
                os = %facts.os.family,
                version = %facts.os.version,
                package = ?config.choice,
                "starting audit"
            );

            let profile = resolve(&config.choice, &facts.os, config.servers.clone())?;
            let settings = ControlSettings {
                drift_window: chrono::Duration::hours(drift_window_hours),
                command_timeout: std::time::Duration::from_secs(command_timeout),
            };

            let report = run_controls(&profile, &facts, &inspector, &settings).await;

            let rendered = match format.as_str() {
                "json" => report.to_json()?,
                "text" => report::render_text(&report),
                other => anyhow::bail!("unknown report format: {}", other),
            };
            match out {
                Some(path) => std::fs::write(&path, rendered)
                    .with_context(|| format!("cannot write report to {}", path.display()))?,
                None => print!("{}", rendered),
            }

            Ok(report.passed)
        }

        Commands::Profile {
            package,
            servers,
            attributes,
        } => {
            let config = attributes::load(attributes.as_deref(), package.as_deref(), &servers)?;
            let inspector = LocalInspector::new();
            let facts = detect_facts(&inspector).await?;
            let profile = resolve(&config.choice, &facts.os, config.servers)?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
            Ok(true)
        }
    }
}
