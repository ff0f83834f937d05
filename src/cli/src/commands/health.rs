//! Server health command.

use anyhow::Result;
use clap::Args;

use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct HealthArgs {
    /// Only print the status line
    #[arg(short, long)]
    pub quiet: bool,
}

pub async fn execute(args: HealthArgs, client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health = client.get_raw("/health").await?;

    let status = health
        .get("status")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown");

    if args.quiet {
        println!("{}", status);
        return Ok(());
    }

    match format {
        OutputFormat::Table => {
            output::print_success(&format!("Server is {}", status));
            if let Some(version) = health.get("version").and_then(|v| v.as_str()) {
                output::print_detail("version", version);
            }
            if let Some(timestamp) = health.get("timestamp").and_then(|v| v.as_str()) {
                output::print_detail("timestamp", timestamp);
            }
        }
        _ => output::print_item(&health, format),
    }

    Ok(())
}
