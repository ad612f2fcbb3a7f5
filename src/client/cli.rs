// Admin command line over the resilient client: one generic set of commands
// for every collection.
use crate::client::config::ClientConfig;
use crate::client::error::ApiError;
use crate::client::local_store::FileStore;
use crate::client::services::resilient_client::{ResilientClient, UploadMeta, WriteOutcome};
use crate::client::transport::{ApiRequest, HttpTransport, Transport, UploadFile};
use crate::client::utils::session_store;
use crate::common::models::Collection;
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "celebration-admin", about = "Manage the celebration site content")]
pub struct Cli {
    /// API base URL, overrides API_BASE_URL
    #[arg(long)]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the records of a collection
    List { collection: Collection },
    /// Show one record
    Show { collection: Collection, id: String },
    /// Create a record from a JSON object
    Add { collection: Collection, json: String },
    /// Update fields of a record from a JSON object
    Update { collection: Collection, id: String, json: String },
    /// Delete a record
    Remove { collection: Collection, id: String },
    /// Upload an image to the gallery
    Upload {
        file: PathBuf,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Show or change the site settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Log in as admin and remember the session token
    Login { password: String },
    /// Forget the session token
    Logout,
    /// Fill empty local collections with demo content for offline use
    DemoSeed,
}

#[derive(Debug, Subcommand)]
pub enum SettingsAction {
    Show,
    Set { json: String },
}

/// One-line message shown after a write.
pub fn banner(action: &str, outcome: &WriteOutcome) -> String {
    let id = outcome.id.as_deref().unwrap_or("-");
    match (outcome.success, outcome.local_only, outcome.fallback) {
        (false, _, _) => format!("❌ {} failed: {}", action, outcome.error.as_deref().unwrap_or("unknown error")),
        (true, false, _) => format!("✅ {} ({})", action, id),
        (true, true, Some(reason)) if reason.needs_login() => {
            format!("⚠️ {} saved locally ({}): session missing or expired, run `login` to sync new changes", action, id)
        }
        (true, true, _) => format!(
            "⚠️ {} saved locally ({}): server unavailable ({})",
            action,
            id,
            outcome.error.as_deref().unwrap_or("unknown")
        ),
    }
}

/// Line shown after `logout`; the local token is gone either way.
pub fn logout_banner(revoked: &Result<Value, ApiError>) -> String {
    match revoked {
        Ok(_) => "✅ logged out".to_string(),
        Err(e) => format!("⚠️ local session cleared, but the server session was not revoked: {}", e),
    }
}

fn parse_json(raw: &str) -> anyhow::Result<Value> {
    serde_json::from_str(raw).map_err(|e| anyhow::anyhow!("invalid JSON: {}", e))
}

fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn run(cli: Cli, config: ClientConfig) -> anyhow::Result<()> {
    let base_url = cli.base_url.unwrap_or(config.api_base_url);
    let transport = HttpTransport::new(&base_url)?.with_token(session_store::load_session_token());
    let store = FileStore::new(&config.cache_path, config.cache_quota_bytes);
    let client = ResilientClient::with_prefix(transport, store, config.cache_prefix);

    match cli.command {
        Command::List { collection } => {
            let records = client.get(collection.as_str()).await?;
            print_json(&Value::Array(records))?;
        }
        Command::Show { collection, id } => match client.get_one(collection.as_str(), &id).await? {
            Some(record) => print_json(&record)?,
            None => println!("❌ {} '{}' not found", collection, id),
        },
        Command::Add { collection, json } => {
            let outcome = client.post(collection.as_str(), parse_json(&json)?).await?;
            println!("{}", banner(&format!("{} created", collection), &outcome));
        }
        Command::Update { collection, id, json } => {
            let outcome = client.put(collection.as_str(), &id, parse_json(&json)?).await?;
            println!("{}", banner(&format!("{} updated", collection), &outcome));
        }
        Command::Remove { collection, id } => {
            let outcome = client.delete(collection.as_str(), &id).await?;
            println!("{}", banner(&format!("{} deleted", collection), &outcome));
        }
        Command::Upload { file, title, description } => {
            let upload = UploadFile::from_path(&file).await?;
            let outcome = client
                .upload_binary(Collection::Gallery.as_str(), upload, UploadMeta { title, description })
                .await?;
            println!("{}", banner("image uploaded", &outcome));
        }
        Command::Settings { action: SettingsAction::Show } => {
            print_json(&client.get_settings().await?)?;
        }
        Command::Settings { action: SettingsAction::Set { json } } => {
            let outcome = client.save_settings(parse_json(&json)?).await?;
            println!("{}", banner("settings saved", &outcome));
        }
        Command::Login { password } => {
            let request = ApiRequest::post("auth/login", serde_json::json!({ "password": password }));
            let reply = client.transport().send(request).await.and_then(|r| r.into_json());
            match reply {
                Ok(grant) => match grant.get("token").and_then(Value::as_str) {
                    Some(token) => {
                        session_store::save_session_token(token)?;
                        println!("✅ logged in");
                    }
                    None => println!("❌ login failed: no token in response"),
                },
                Err(e) => println!("❌ login failed: {}", e),
            }
        }
        Command::Logout => {
            let revoked = client
                .transport()
                .send(ApiRequest::post("auth/logout", serde_json::json!({})))
                .await
                .and_then(|r| r.into_json());
            session_store::clear_session_token()?;
            println!("{}", logout_banner(&revoked));
        }
        Command::DemoSeed => {
            let written = client.seed_offline_demo()?;
            println!("✅ {} demo record(s) written to {}", written, client.store().path().display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::error::FallbackReason;
    use serde_json::json;

    fn outcome(success: bool, local_only: bool, fallback: Option<FallbackReason>) -> WriteOutcome {
        WriteOutcome {
            success,
            local_only,
            id: Some("local_1".into()),
            record: None,
            error: Some("network unavailable: refused".into()),
            fallback,
        }
    }

    #[test]
    fn banners_follow_the_outcome() {
        assert_eq!(banner("note created", &outcome(true, false, None)), "✅ note created (local_1)");
        assert!(banner("x", &outcome(true, true, Some(FallbackReason::Offline))).contains("server unavailable"));
        assert!(banner("x", &outcome(true, true, Some(FallbackReason::Unauthorized))).contains("run `login`"));
        assert!(banner("x", &outcome(false, false, None)).starts_with("❌"));
    }

    #[test]
    fn logout_warns_when_the_server_kept_the_session() {
        assert_eq!(logout_banner(&Ok(json!({"message": "Logged out"}))), "✅ logged out");
        let offline = logout_banner(&Err(ApiError::NetworkUnavailable("refused".into())));
        assert!(offline.starts_with("⚠️") && offline.contains("not revoked"));
        assert!(logout_banner(&Err(ApiError::Unauthorized)).starts_with("⚠️"));
    }

    #[test]
    fn collections_parse_as_arguments() {
        let cli = Cli::try_parse_from(["celebration-admin", "remove", "notes", "n1"]).unwrap();
        match cli.command {
            Command::Remove { collection, id } => {
                assert_eq!(collection, Collection::Notes);
                assert_eq!(id, "n1");
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert!(Cli::try_parse_from(["celebration-admin", "list", "days"]).is_err());
    }
}
