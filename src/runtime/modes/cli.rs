//! CLI mode
//!
//! Maintenance commands that run against the configured store without
//! starting the HTTP server.

use anyhow::{Context, Result};
use colored::Colorize;

use crate::analytics::{SessionClassifier, SessionRetentionTask};
use crate::cli::Commands;
use crate::config::{StaticConfig, get_config};
use crate::runtime::lifetime;

/// Run a CLI command
///
/// `Commands::Serve` is handled by the caller and never reaches here.
pub async fn run_cli(command: Commands) -> Result<()> {
    match command {
        Commands::Serve => Ok(()),
        Commands::GenerateConfig { path } => generate_config(path),
        Commands::CleanupSessions { days } => cleanup_sessions(days).await,
        Commands::Session { session_id } => show_session(&session_id).await,
    }
}

fn generate_config(path: Option<String>) -> Result<()> {
    match path {
        Some(path) => {
            StaticConfig::default()
                .save_to_file(&path)
                .with_context(|| format!("Failed to write config to {}", path))?;
            println!("{} {}", "Sample configuration written to".green(), path.cyan());
        }
        None => println!("{}", StaticConfig::generate_sample_config()),
    }
    Ok(())
}

async fn cleanup_sessions(days: Option<u64>) -> Result<()> {
    let config = get_config();
    let days = days.unwrap_or(config.tracking.session_retention_days);
    let storage = lifetime::startup::prepare_storage(&config).await?;

    let task = SessionRetentionTask::new(storage, days);
    let deleted = task
        .run_cleanup(days)
        .await
        .map_err(|e| anyhow::anyhow!(e.format_simple()))?;

    println!(
        "{} {} sessions older than {} days",
        "Deleted".green().bold(),
        deleted.to_string().yellow(),
        days
    );
    Ok(())
}

async fn show_session(session_id: &str) -> Result<()> {
    let config = get_config();
    let storage = lifetime::startup::prepare_storage(&config).await?;
    let classifier = SessionClassifier::new(storage);

    let record = classifier
        .first_seen(session_id)
        .await
        .map_err(|e| anyhow::anyhow!(e.format_simple()))?;

    match record {
        Some(record) => {
            println!("{} {}", "Session:".bold(), record.session_id.cyan());
            println!("  first action:  {}", record.first_action_type);
            println!("  first seen at: {}", record.first_seen_at.to_rfc3339());
            if let Some(qr_code_id) = record.first_qr_code_id {
                println!("  QR code id:    {}", qr_code_id);
            }
            if let Some(branch_id) = record.first_branch_id {
                println!("  branch id:     {}", branch_id);
            }
        }
        None => println!("{} {}", "No record for session".yellow(), session_id),
    }
    Ok(())
}
