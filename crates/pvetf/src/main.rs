//! pvetf
//!
//! Ansible dynamic inventory built from Terraform state of Proxmox VE guests.
//! Prints the inventory as JSON on stdout; logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use color_eyre::Result;
use eyre::WrapErr;
use pvetf_exec::LocalExecutor;
use pvetf_inventory::{Inventory, InventoryCollector};
use tracing_subscriber::EnvFilter;

mod config;

#[derive(Parser)]
#[command(name = "pvetf")]
#[command(about = "Ansible inventory from Terraform state of Proxmox VE guests", long_about = None)]
#[command(version)]
struct Cli {
    /// Inventory source file (TOML or YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the whole inventory (default)
    #[arg(long, conflicts_with = "host")]
    list: bool,

    /// Print the variables of a single host
    #[arg(long, value_name = "HOSTNAME")]
    host: Option<String>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if cli.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(&cli);

    let path = config::locate(cli.config.as_deref())?;
    tracing::info!(config = %path.display(), "loading configuration");
    let config = config::load(&path)?;

    let mut inventory = Inventory::new();
    InventoryCollector::new(&config, Arc::new(LocalExecutor::new()))
        .collect(&mut inventory)
        .await
        .wrap_err("failed to build inventory")?;

    let output = match cli.host.as_deref() {
        Some(host) if !cli.list => inventory.host_json(host),
        _ => inventory.to_list_json(),
    };

    let rendered = if cli.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{rendered}");

    Ok(())
}
