//! Atrium CLI - Command-line interface for the Atrium content management API.
//!
//! Provides a login flow, the public form fetch/submit contract, and health
//! and configuration commands.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{auth, config, form, health};
use output::OutputFormat;

/// Atrium - multi-tenant content management CLI
#[derive(Parser)]
#[command(
    name = "atrium",
    version = "0.1.0",
    about = "Atrium - multi-tenant content management",
    long_about = "CLI tool for the Atrium API: sessions, forms, submissions, and configuration.",
    propagate_version = true
)]
pub struct Cli {
    /// Output format
    #[arg(short, long, global = true, default_value = "table")]
    output: OutputFormat,

    /// API server URL
    #[arg(long, global = true, env = "ATRIUM_API_URL")]
    api_url: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store a session token
    Login(auth::LoginArgs),

    /// Show the currently authenticated account
    Whoami,

    /// Log out (forget the stored session token)
    Logout,

    /// Form operations
    #[command(subcommand)]
    Form(form::FormCommands),

    /// Check server health
    Health(health::HealthArgs),

    /// Configuration management
    #[command(subcommand)]
    Config(config::ConfigCommands),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let api_url = cli
        .api_url
        .clone()
        .or_else(config::load_api_url)
        .unwrap_or_else(|| "http://localhost:3001".to_string());

    let token = config::load_token();
    let client = client::ApiClient::new(&api_url, token)?;
    let format = cli.output;

    let result = match cli.command {
        Commands::Login(args) => auth::login(args, &client, format).await,
        Commands::Whoami => auth::whoami(&client, format).await,
        Commands::Logout => auth::logout(),
        Commands::Form(cmd) => form::execute(cmd, &client, format).await,
        Commands::Health(args) => health::execute(args, &client, format).await,
        Commands::Config(cmd) => config::execute(cmd, format).await,
    };

    if let Err(e) = result {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
