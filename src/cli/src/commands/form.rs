//! Form commands: list, fetch, and submit.
//!
//! `form get` and `form submit` speak the public contract and work without a
//! session; `form list` and `form submissions` require a login.

use anyhow::{bail, Result};
use clap::Subcommand;
use serde::Serialize;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

#[derive(Subcommand)]
pub enum FormCommands {
    /// List forms visible to the current session
    List,

    /// Fetch a form definition by id (public)
    Get {
        /// Form identifier
        id: String,
    },

    /// Submit a response to a form (public)
    Submit {
        /// Form identifier
        id: String,

        /// Field values as name=value pairs
        #[arg(short, long = "field", value_name = "NAME=VALUE")]
        fields: Vec<String>,
    },

    /// List submissions visible to the current session
    Submissions,
}

#[derive(Debug, Serialize, Tabled)]
struct FormRow {
    id: String,
    title: String,
    #[tabled(rename = "fields")]
    field_count: usize,
}

pub async fn execute(cmd: FormCommands, client: &ApiClient, format: OutputFormat) -> Result<()> {
    match cmd {
        FormCommands::List => {
            let forms: Vec<serde_json::Value> = client.get("/api/forms").await?;

            let rows: Vec<FormRow> = forms
                .iter()
                .map(|f| FormRow {
                    id: f.get("id").and_then(|v| v.as_str()).unwrap_or("").to_string(),
                    title: f
                        .get("title")
                        .and_then(|v| v.as_str())
                        .unwrap_or("")
                        .to_string(),
                    field_count: f
                        .get("fields")
                        .and_then(|v| v.as_array())
                        .map(|a| a.len())
                        .unwrap_or(0),
                })
                .collect();

            output::print_list(&rows, format);
        }

        FormCommands::Get { id } => {
            let form = client.get_raw(&format!("/api/forms/{}", id)).await?;

            match format {
                OutputFormat::Table => {
                    if let Some(title) = form.get("title").and_then(|v| v.as_str()) {
                        output::print_detail("title", title);
                    }
                    if let Some(fields) = form.get("fields").and_then(|v| v.as_array()) {
                        for field in fields {
                            let name = field.get("name").and_then(|v| v.as_str()).unwrap_or("?");
                            let label = field.get("label").and_then(|v| v.as_str()).unwrap_or("");
                            let required = field
                                .get("required")
                                .and_then(|v| v.as_bool())
                                .unwrap_or(false);
                            let marker = if required { " (required)" } else { "" };
                            output::print_detail(name, &format!("{}{}", label, marker));
                        }
                    }
                }
                _ => output::print_item(&form, format),
            }
        }

        FormCommands::Submit { id, fields } => {
            let mut submission_data = Vec::new();
            for pair in &fields {
                let Some((name, value)) = pair.split_once('=') else {
                    bail!("Invalid field '{}': expected NAME=VALUE", pair);
                };
                submission_data.push(serde_json::json!({ "field": name, "value": value }));
            }

            let submission: serde_json::Value = client
                .post(
                    "/api/form-submissions",
                    &serde_json::json!({ "form": id, "submissionData": submission_data }),
                )
                .await?;

            match format {
                OutputFormat::Table => {
                    output::print_success("Submission received");
                    if let Some(sid) = submission.get("id").and_then(|v| v.as_str()) {
                        output::print_detail("id", sid);
                    }
                }
                _ => output::print_item(&submission, format),
            }
        }

        FormCommands::Submissions => {
            let submissions: Vec<serde_json::Value> = client.get("/api/form-submissions").await?;

            match format {
                OutputFormat::Table => {
                    if submissions.is_empty() {
                        output::print_info("No submissions found.");
                        return Ok(());
                    }
                    for s in &submissions {
                        let id = s.get("id").and_then(|v| v.as_str()).unwrap_or("?");
                        let form = s.get("form").and_then(|v| v.as_str()).unwrap_or("?");
                        output::print_detail(id, &format!("form {}", form));
                    }
                }
                _ => output::print_item(&submissions, format),
            }
        }
    }

    Ok(())
}
