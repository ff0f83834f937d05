//! Session commands: login, whoami, logout.

use anyhow::Result;
use clap::Args;
use serde::Deserialize;

use super::config;
use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct LoginArgs {
    /// Account email
    #[arg(short, long)]
    pub email: String,

    /// Account password (prompted for if omitted)
    #[arg(short, long)]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
    user: serde_json::Value,
}

pub async fn login(args: LoginArgs, client: &ApiClient, format: OutputFormat) -> Result<()> {
    let password = match args.password {
        Some(p) => p,
        None => {
            eprint!("Password: ");
            let mut line = String::new();
            std::io::stdin().read_line(&mut line)?;
            line.trim_end().to_string()
        }
    };

    let response: LoginResponse = client
        .post(
            "/api/users/login",
            &serde_json::json!({ "email": args.email, "password": password }),
        )
        .await?;

    config::save_token(&response.token)?;

    match format {
        OutputFormat::Table => {
            output::print_success(&format!("Logged in as {}", args.email));
            if let Some(role) = response.user.get("role").and_then(|v| v.as_str()) {
                output::print_detail("role", role);
            }
        }
        _ => output::print_item(&response.user, format),
    }

    Ok(())
}

pub async fn whoami(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let user: serde_json::Value = client.get("/api/users/me").await?;

    match format {
        OutputFormat::Table => {
            if let Some(email) = user.get("email").and_then(|v| v.as_str()) {
                output::print_detail("email", email);
            }
            if let Some(role) = user.get("role").and_then(|v| v.as_str()) {
                output::print_detail("role", role);
            }
            match user.get("tenant") {
                Some(serde_json::Value::String(id)) => output::print_detail("tenant", id),
                Some(obj) if obj.is_object() => {
                    if let Some(id) = obj.get("id").and_then(|v| v.as_str()) {
                        output::print_detail("tenant", id);
                    }
                }
                _ => output::print_detail("tenant", "-"),
            }
        }
        _ => output::print_item(&user, format),
    }

    Ok(())
}

pub fn logout() -> Result<()> {
    config::clear_token()?;
    output::print_success("Logged out");
    Ok(())
}
