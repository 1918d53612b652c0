//! Nexible - declarative NX-OS feature configuration
//!
//! This is the main entry point for the Nexible CLI: one invocation runs one
//! reconciliation pass for one feature on one device and prints the
//! resulting report as JSON. Any validation, precondition or device failure
//! exits nonzero.

use anyhow::{Context, Result};
use clap::Parser;
use nexible::device::nxapi::NxapiClient;
use nexible::device::DeviceConfig;
use nexible::engine::{ReconcileReport, Reconciler};
use nexible::features::pim_interface::PimInterfaceModule;
use nexible::features::snmp_community::SnmpCommunityModule;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "nexible", version, about = "Declarative NX-OS feature configuration over NX-API")]
struct Cli {
    /// Feature to reconcile (snmp_community, pim_interface)
    #[arg(long)]
    feature: String,

    /// Path to a JSON file with the feature parameters
    #[arg(long)]
    params: PathBuf,

    /// Path to a JSON device config file; falls back to NEXIBLE_* env vars
    #[arg(long)]
    device: Option<PathBuf>,

    /// Report what would change without applying anything
    #[arg(long)]
    check: bool,

    /// Milliseconds to wait between applying and re-reading device state
    #[arg(long)]
    settle_ms: Option<u64>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(report) => {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).expect("report is serializable")
            );
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn run(cli: &Cli) -> Result<ReconcileReport> {
    let params: serde_json::Value = {
        let content = std::fs::read_to_string(&cli.params)
            .with_context(|| format!("Cannot read params file '{}'", cli.params.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid params file '{}'", cli.params.display()))?
    };

    let device_config = match &cli.device {
        Some(path) => DeviceConfig::from_file(path)?,
        None => DeviceConfig::from_env().context(
            "No --device file given and NEXIBLE_HOST/NEXIBLE_USERNAME/NEXIBLE_PASSWORD not set",
        )?,
    };
    let device = NxapiClient::new(device_config)?;

    let mut reconciler = Reconciler::new().with_check_mode(cli.check);
    if let Some(ms) = cli.settle_ms {
        reconciler = reconciler.with_settle_delay(Duration::from_millis(ms));
    }

    let report = match cli.feature.as_str() {
        "snmp_community" => {
            let module = SnmpCommunityModule::from_value(params)?;
            reconciler.run(&module, &device)?
        }
        "pim_interface" => {
            let module = PimInterfaceModule::from_value(params)?;
            reconciler.run(&module, &device)?
        }
        other => anyhow::bail!(
            "Unknown feature '{}'. Valid features: snmp_community, pim_interface",
            other
        ),
    };

    Ok(report)
}

/// Initialize logging based on verbosity level
fn init_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(verbosity >= 3))
        .with(env_filter)
        .init();
}
