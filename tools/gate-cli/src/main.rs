use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gate")]
#[command(about = "Operator CLI for the policy decision service's registry")]
#[command(version = gate_core::VERSION)]
struct Cli {
    /// Base URL of the policy-registry service.
    #[arg(long, global = true, default_value = "http://localhost:8081")]
    registry_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Policy draft/publish/inspection commands
    Policy {
        #[command(subcommand)]
        action: PolicyAction,
    },
    /// Session inspection commands
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
    /// Audit log inspection commands
    Audit {
        #[command(subcommand)]
        action: AuditAction,
    },
}

#[derive(Subcommand)]
enum PolicyAction {
    /// Create a draft from a JSON file shaped `{envId, name, spec}`
    Create { file: PathBuf },
    /// Publish a draft policy by id
    Publish {
        id: String,
        #[arg(long)]
        published_by: Option<String>,
    },
    /// Fetch one published version of a policy
    Get { id: String, version: String },
}

#[derive(Subcommand)]
enum SessionAction {
    /// Show a session's current state. `env` is checked against the fetched
    /// row but the lookup itself is by `session_id` (the registry has no
    /// combined env+sessionId index; see DESIGN.md).
    Show { env: String, session_id: String },
}

#[derive(Subcommand)]
enum AuditAction {
    /// Print every audit entry for a session, oldest first
    Tail { session_id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Policy { action } => handle_policy_action(&client, &cli.registry_url, action).await,
        Commands::Session { action } => handle_session_action(&client, &cli.registry_url, action).await,
        Commands::Audit { action } => handle_audit_action(&client, &cli.registry_url, action).await,
    }
}

async fn print_response(resp: reqwest::Response) -> anyhow::Result<()> {
    let status = resp.status();
    let body: Value = resp.json().await.unwrap_or_else(|_| json!({}));
    println!("{}", serde_json::to_string_pretty(&body)?);
    if !status.is_success() {
        anyhow::bail!("registry returned {status}");
    }
    Ok(())
}

async fn handle_policy_action(
    client: &reqwest::Client,
    registry_url: &str,
    action: PolicyAction,
) -> anyhow::Result<()> {
    match action {
        PolicyAction::Create { file } => {
            let body: Value = serde_json::from_str(&std::fs::read_to_string(file)?)?;
            let resp = client
                .post(format!("{registry_url}/policies"))
                .json(&body)
                .send()
                .await?;
            print_response(resp).await
        }
        PolicyAction::Publish { id, published_by } => {
            let resp = client
                .post(format!("{registry_url}/policies/{id}/publish"))
                .json(&json!({ "publishedBy": published_by }))
                .send()
                .await?;
            print_response(resp).await
        }
        PolicyAction::Get { id, version } => {
            let resp = client
                .get(format!("{registry_url}/policies/{id}/versions/{version}"))
                .send()
                .await?;
            print_response(resp).await
        }
    }
}

async fn handle_session_action(
    client: &reqwest::Client,
    registry_url: &str,
    action: SessionAction,
) -> anyhow::Result<()> {
    match action {
        SessionAction::Show { env, session_id } => {
            let resp = client
                .get(format!("{registry_url}/sessions/{session_id}"))
                .send()
                .await?;
            let status = resp.status();
            let body: Value = resp.json().await.unwrap_or_else(|_| json!({}));
            if let Some(warning) = gate_cli::env_mismatch_warning(&body, &env, &session_id) {
                eprintln!("{warning}");
            }
            println!("{}", serde_json::to_string_pretty(&body)?);
            if !status.is_success() {
                anyhow::bail!("registry returned {status}");
            }
            Ok(())
        }
    }
}

async fn handle_audit_action(
    client: &reqwest::Client,
    registry_url: &str,
    action: AuditAction,
) -> anyhow::Result<()> {
    match action {
        AuditAction::Tail { session_id } => {
            let resp = client
                .get(format!("{registry_url}/audit"))
                .query(&[("sessionId", session_id)])
                .send()
                .await?;
            print_response(resp).await
        }
    }
}
