pub mod review;
pub mod status;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Args;
use pw_agents::prompts::PromptTemplate;
use pw_agents::runner::CliAgent;
use pw_core::config::{Config, PollConfig};
use pw_core::decision::Mentions;
use pw_core::drift::DriftReport;
use pw_integrations::github::auth::resolve_token;
use pw_integrations::github::client::GitHubClient;
use pw_integrations::types::GitHubConfig;

use crate::dispatcher::Dispatcher;
use crate::poller::ReviewCycle;
use crate::reviewer::Reviewer;

/// Which pull request to operate on.
#[derive(Debug, Clone, Args)]
pub struct Target {
    /// Repository owner (user or organization).
    #[arg(long)]
    pub owner: String,
    /// Repository name.
    #[arg(long)]
    pub repo: String,
    /// Pull request number.
    #[arg(long = "pr")]
    pub pr: u64,
}

/// Options shared by commands that run review cycles.
#[derive(Debug, Clone, Default, Args)]
pub struct ReviewArgs {
    /// Spec file the changes are reviewed against.
    #[arg(long)]
    pub spec: Option<PathBuf>,
    /// Login that receives escalations (defaults to the repository owner).
    #[arg(long = "escalate-to")]
    pub escalate_to: Option<String>,
    /// Markdown drift report to maintain across reviews.
    #[arg(long = "drift-file")]
    pub drift_file: Option<PathBuf>,
    /// Agent command to run (overrides `agent.command`).
    #[arg(long)]
    pub agent: Option<String>,
    /// Agent timeout in seconds, 0 for none (overrides `agent.timeout_secs`).
    #[arg(long = "agent-timeout")]
    pub agent_timeout: Option<u64>,
    /// Let the agent use tools without asking.
    #[arg(long = "auto-approve")]
    pub auto_approve: bool,
    /// Decide and log, but post nothing.
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

/// Load the config file given on the command line, or the default one.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(p) => Config::load_from(p).with_context(|| format!("loading config {}", p.display())),
        None => Config::load().context("loading default config"),
    }
}

/// Resolve credentials and build the API client. Fatal when no token can be
/// found.
pub async fn connect(config: &Config, target: &Target, token: Option<&str>) -> anyhow::Result<GitHubClient> {
    let token = resolve_token(token, &config.github.token_env)
        .await
        .context("resolving GitHub credentials")?;

    let client = GitHubClient::new(GitHubConfig {
        token: Some(token),
        owner: target.owner.clone(),
        repo: target.repo.clone(),
    })?
    .with_base_url(&config.github.api_url)
    .with_per_page(config.github.per_page)
    .with_user_agent(config.github.user_agent.clone());
    Ok(client)
}

/// Assemble reviewer and dispatcher from config plus command-line overrides.
/// Missing spec or template files are fatal here, before any polling starts.
pub fn build_cycle(
    config: &Config,
    client: &GitHubClient,
    target: &Target,
    args: &ReviewArgs,
) -> anyhow::Result<ReviewCycle> {
    let mut agent_cfg = config.agent.clone();
    if let Some(cmd) = &args.agent {
        agent_cfg.command = cmd.clone();
    }
    if let Some(secs) = args.agent_timeout {
        agent_cfg.timeout_secs = secs;
    }
    agent_cfg.auto_approve |= args.auto_approve;
    let agent = CliAgent::from_config(&agent_cfg);

    let spec = args
        .spec
        .as_deref()
        .map(|p| {
            std::fs::read_to_string(p).with_context(|| format!("reading spec file {}", p.display()))
        })
        .transpose()?;

    let template = match &config.review.prompt_template {
        Some(p) => PromptTemplate::from_file(p)
            .with_context(|| format!("reading prompt template {}", p.display()))?,
        None => PromptTemplate::default(),
    };

    let drift = args
        .drift_file
        .as_deref()
        .map(DriftReport::open_or_create)
        .transpose()
        .context("opening drift report")?;

    let reviewer = Reviewer::new(client.clone(), target.pr, Arc::new(agent))
        .with_spec(spec)
        .with_template(template)
        .with_context_tail(config.review.context_tail)
        .with_max_diff_bytes(config.review.max_diff_bytes);

    let mentions = Mentions {
        worker: config.markers.worker_mention.clone(),
        owner: args
            .escalate_to
            .clone()
            .unwrap_or_else(|| target.owner.clone())
            .trim_start_matches('@')
            .to_string(),
    };
    let dispatcher = Dispatcher::new(client.clone(), target.pr, mentions)
        .with_thresholds(config.review.thresholds())
        .with_dry_run(args.dry_run)
        .with_drift_report(drift);

    Ok(ReviewCycle { reviewer, dispatcher })
}

pub fn interval(config: &Config, override_secs: Option<u64>) -> anyhow::Result<Duration> {
    let poll = PollConfig {
        interval_secs: override_secs.unwrap_or(config.poll.interval_secs),
    };
    if poll.interval_secs == 0 {
        anyhow::bail!("poll interval must be at least 1 second");
    }
    Ok(poll.interval())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> Target {
        Target {
            owner: "octo".into(),
            repo: "widgets".into(),
            pr: 7,
        }
    }

    fn client() -> GitHubClient {
        GitHubClient::new(GitHubConfig {
            token: Some("ghp_test".into()),
            owner: "octo".into(),
            repo: "widgets".into(),
        })
        .unwrap()
    }

    #[test]
    fn missing_spec_file_is_fatal() {
        let args = ReviewArgs {
            spec: Some(PathBuf::from("/nonexistent/spec.md")),
            ..Default::default()
        };
        let err = build_cycle(&Config::default(), &client(), &target(), &args)
            .err()
            .expect("missing spec must fail");
        assert!(format!("{err:#}").contains("reading spec file"));
    }

    #[test]
    fn drift_file_is_created_at_startup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drift.md");
        let args = ReviewArgs {
            drift_file: Some(path.clone()),
            ..Default::default()
        };
        build_cycle(&Config::default(), &client(), &target(), &args).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn interval_override_and_zero_rejection() {
        let cfg = Config::default();
        assert_eq!(interval(&cfg, None).unwrap(), Duration::from_secs(30));
        assert_eq!(interval(&cfg, Some(5)).unwrap(), Duration::from_secs(5));
        assert!(interval(&cfg, Some(0)).is_err());
    }

    #[test]
    fn missing_config_file_is_fatal() {
        let err = load_config(Some(Path::new("/nonexistent/prwatch.toml"))).unwrap_err();
        assert!(format!("{err:#}").contains("loading config"));
    }
}
