mod commands;
mod dispatcher;
mod poller;
mod reviewer;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use commands::{ReviewArgs, Target};
use pw_telemetry::logging::{self, LogFormat};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// prwatch -- watch a pull request for finished agent work and review it.
#[derive(Parser)]
#[command(name = "prwatch", version, about)]
struct Cli {
    /// Config file (default: ~/.prwatch/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// GitHub token (default: $GITHUB_TOKEN, then `gh auth token`).
    #[arg(long, global = true)]
    token: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long = "json-logs", global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the PR and review each finished worker session until it closes.
    Watch {
        #[command(flatten)]
        target: Target,
        /// Seconds between polls (default 30).
        #[arg(long)]
        interval: Option<u64>,
        #[command(flatten)]
        review: ReviewArgs,
    },

    /// Run one review cycle immediately.
    Review {
        #[command(flatten)]
        target: Target,
        #[command(flatten)]
        review: ReviewArgs,
    },

    /// Show PR state and worker session counts.
    Status {
        #[command(flatten)]
        target: Target,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = commands::load_config(cli.config.as_deref())?;
    let format = if cli.json_logs { LogFormat::Json } else { LogFormat::Human };
    logging::init(format, "prwatch", &config.general.log_level);

    let token = cli.token.as_deref();
    match cli.command {
        Commands::Watch {
            target,
            interval,
            review,
        } => {
            let interval = commands::interval(&config, interval)?;
            commands::watch::run(&config, &target, token, interval, &review).await?;
        }
        Commands::Review { target, review } => {
            commands::review::run(&config, &target, token, &review).await?;
        }
        Commands::Status { target } => {
            commands::status::run(&config, &target, token).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn watch_requires_target() {
        let err = Cli::try_parse_from(["prwatch", "watch", "--owner", "octo"]).err().unwrap();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn target_follows_the_subcommand() {
        let cli = Cli::try_parse_from([
            "prwatch", "status", "--owner", "octo", "--repo", "widgets", "--pr", "3",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Status { ref target } if target.pr == 3));

        let err = Cli::try_parse_from([
            "prwatch", "--owner", "octo", "status", "--repo", "widgets", "--pr", "3",
        ])
        .err()
        .unwrap();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }

    #[test]
    fn watch_parses_all_options() {
        let cli = Cli::try_parse_from([
            "prwatch",
            "watch",
            "--owner",
            "octo",
            "--repo",
            "widgets",
            "--pr",
            "7",
            "--interval",
            "10",
            "--escalate-to",
            "@lead",
            "--drift-file",
            "drift.md",
            "--auto-approve",
            "--json-logs",
        ])
        .unwrap();
        assert!(cli.json_logs);
        match cli.command {
            Commands::Watch { target, interval, review } => {
                assert_eq!(target.pr, 7);
                assert_eq!(interval, Some(10));
                assert_eq!(review.escalate_to.as_deref(), Some("@lead"));
                assert!(review.auto_approve);
                assert!(!review.dry_run);
            }
            _ => panic!("expected watch"),
        }
    }
}
