//! Jamilink CLI - exercise the Jami device-linking flow.

mod commands;
mod ui;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use jamilink_core::Config;
use tracing_subscriber::EnvFilter;

use commands::{DemoOptions, ReplayRole};

#[derive(Parser)]
#[command(name = "jamilink")]
#[command(about = "Link a new device to a Jami account", long_about = None)]
struct Cli {
    /// Seconds to wait for the peer to connect (0 waits forever)
    #[arg(long, global = true, default_value_t = 120)]
    connect_timeout: u64,

    /// Seconds allowed for mutual authentication (0 waits forever)
    #[arg(long, global = true, default_value_t = 120)]
    auth_timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn config(&self) -> Config {
        let bound = |secs: u64| (secs > 0).then(|| Duration::from_secs(secs));
        Config {
            connecting_timeout: bound(self.connect_timeout),
            authenticating_timeout: bound(self.auth_timeout),
        }
    }
}

fn default_device_name() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "jami-device".to_string())
}

#[derive(Subcommand)]
enum Commands {
    /// Check an authentication uri the way the exporting device does
    Validate { uri: String },
    /// Show an authentication uri as a QR code
    Qr { uri: String },
    /// Feed recorded daemon signals (JSON lines) through a controller
    Replay {
        #[arg(long, value_enum)]
        role: ReplayRole,
        /// Account to bind to; defaults to the first record's account
        #[arg(long)]
        account: Option<String>,
        file: PathBuf,
    },
    /// Link two local accounts through an in-process daemon
    Demo {
        /// Registered name of the exported account
        #[arg(short, long, default_value_t = default_device_name())]
        name: String,
        /// Protect the exported account with this password
        #[arg(long)]
        password: Option<String>,
        /// Password typed on the new device (defaults to --password)
        #[arg(long)]
        typed_password: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("jamilink=info".parse()?)
                .add_directive("jamilink_core=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config();

    match cli.command {
        Commands::Validate { uri } => commands::validate_uri(&uri)?,
        Commands::Qr { uri } => commands::show_qr(&uri)?,
        Commands::Replay { role, account, file } => commands::replay_signals(role, account, &file)?,
        Commands::Demo {
            name,
            password,
            typed_password,
        } => {
            commands::run_demo(DemoOptions {
                name,
                password,
                typed_password,
                config,
            })
            .await?
        }
    }

    Ok(())
}
