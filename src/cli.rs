//! Command-line interface definitions using clap

use clap::{Parser, Subcommand};

/// qrlinker - QR code redirect service with scan analytics
#[derive(Parser)]
#[command(name = "qrlinker")]
#[command(version)]
#[command(about = "QR code redirect service with scan analytics", long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Delete session first-seen records older than N days
    CleanupSessions {
        /// Retention in days (default: tracking.session_retention_days)
        #[arg(long)]
        days: Option<u64>,
    },

    /// Show when a session was first seen
    Session {
        /// Session id (value of the qr_session cookie)
        session_id: String,
    },

    /// Generate a sample configuration file
    GenerateConfig {
        /// Output path (default: print to stdout)
        path: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["qrlinker"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_cleanup_sessions_with_days() {
        let cli =
            Cli::try_parse_from(["qrlinker", "cleanup-sessions", "--days", "30", "-c", "x.toml"])
                .unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::CleanupSessions { days: Some(30) })
        );
        assert_eq!(cli.config.as_deref(), Some("x.toml"));
    }

    #[test]
    fn test_session_requires_id() {
        assert!(Cli::try_parse_from(["qrlinker", "session"]).is_err());
    }
}
