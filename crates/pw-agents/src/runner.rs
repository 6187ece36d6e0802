//! Running the external review agent as a non-interactive subprocess.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use pw_core::config::AgentConfig;
use thiserror::Error;

/// File name of the prompt written into each invocation's scratch directory.
pub const PROMPT_FILE_NAME: &str = "PROMPT.md";

/// Env var pointing the agent (or a wrapper script) at the prompt file.
pub const PROMPT_FILE_ENV: &str = "PRWATCH_PROMPT_FILE";

/// Largest prompt passed inline as one argument. Linux rejects a single
/// argv string over 128 KiB with E2BIG; bigger prompts are handed over via
/// the prompt file instead.
pub const MAX_INLINE_PROMPT_BYTES: usize = 96 * 1024;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("failed to spawn agent `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("agent scratch directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("agent did not finish within {0:?}")]
    Timeout(Duration),
}

pub type Result<T> = std::result::Result<T, AgentError>;

/// Seam between the review cycle and whatever produces the review text.
#[async_trait]
pub trait AgentRunner: Send + Sync {
    /// Run the agent on `prompt` and return its combined output.
    async fn run(&self, prompt: &str) -> Result<String>;
}

/// An agent CLI invoked as `<command> <prompt_flag> <prompt> [auto_approve_flag] [extra_args..]`.
#[derive(Debug, Clone)]
pub struct CliAgent {
    pub command: String,
    pub prompt_flag: String,
    /// Passed only when set; grants the agent unattended tool use.
    pub auto_approve_flag: Option<String>,
    pub extra_args: Vec<String>,
    pub timeout: Option<Duration>,
    /// Where the agent runs. `None` means the per-invocation scratch dir.
    pub workdir: Option<PathBuf>,
}

impl CliAgent {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            prompt_flag: "-p".into(),
            auto_approve_flag: None,
            extra_args: Vec::new(),
            timeout: None,
            workdir: None,
        }
    }

    pub fn from_config(config: &AgentConfig) -> Self {
        Self {
            command: config.command.clone(),
            prompt_flag: config.prompt_flag.clone(),
            auto_approve_flag: config
                .auto_approve
                .then(|| config.auto_approve_flag.clone())
                .filter(|f| !f.is_empty()),
            extra_args: config.extra_args.clone(),
            timeout: config.timeout(),
            workdir: config.workdir.clone(),
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Full argument list for one invocation. `prompt` is whatever goes
    /// after the prompt flag, see [`prompt_argument`].
    pub fn args(&self, prompt: &str) -> Vec<String> {
        let mut args = Vec::with_capacity(3 + self.extra_args.len());
        if !self.prompt_flag.is_empty() {
            args.push(self.prompt_flag.clone());
        }
        args.push(prompt.to_string());
        if let Some(flag) = &self.auto_approve_flag {
            args.push(flag.clone());
        }
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

/// The text passed after the prompt flag: the prompt itself, or for
/// oversized prompts a short instruction to read the prompt file.
pub fn prompt_argument(prompt: &str, prompt_path: &Path) -> String {
    if prompt.len() <= MAX_INLINE_PROMPT_BYTES {
        return prompt.to_string();
    }
    format!(
        "The full review instructions are too large to pass inline. Read the file {} and follow the instructions in it exactly.",
        prompt_path.display()
    )
}

#[async_trait]
impl AgentRunner for CliAgent {
    async fn run(&self, prompt: &str) -> Result<String> {
        // Dropped on every return path, which removes the prompt file too.
        let scratch = tempfile::Builder::new().prefix("prwatch-review-").tempdir()?;
        let prompt_path = scratch.path().join(PROMPT_FILE_NAME);
        tokio::fs::write(&prompt_path, prompt).await?;

        let cwd = self.workdir.as_deref().unwrap_or(scratch.path());
        let mut cmd = tokio::process::Command::new(&self.command);
        let inline = prompt.len() <= MAX_INLINE_PROMPT_BYTES;
        cmd.args(self.args(&prompt_argument(prompt, &prompt_path)))
            .current_dir(cwd)
            .env(PROMPT_FILE_ENV, &prompt_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::info!(
            command = %self.command,
            auto_approve = self.auto_approve_flag.is_some(),
            timeout = ?self.timeout,
            prompt_bytes = prompt.len(),
            inline,
            "launching review agent"
        );

        let child = cmd.spawn().map_err(|source| AgentError::Spawn {
            command: self.command.clone(),
            source,
        })?;
        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| AgentError::Timeout(limit))??,
            None => child.wait_with_output().await?,
        };

        if !output.status.success() {
            tracing::warn!(status = %output.status, "review agent exited unsuccessfully");
        }

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&stderr);
        }
        tracing::debug!(output_bytes = text.len(), "review agent finished");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_follow_prompt_flag_convention() {
        let agent = CliAgent::new("claude");
        assert_eq!(agent.args("review this"), vec!["-p", "review this"]);
    }

    #[test]
    fn auto_approve_flag_only_when_enabled() {
        let mut cfg = AgentConfig::default();
        assert_eq!(CliAgent::from_config(&cfg).auto_approve_flag, None);

        cfg.auto_approve = true;
        cfg.extra_args = vec!["--model".into(), "opus".into()];
        let agent = CliAgent::from_config(&cfg);
        assert_eq!(
            agent.args("x"),
            vec!["-p", "x", "--dangerously-skip-permissions", "--model", "opus"]
        );
    }

    #[test]
    fn oversized_prompt_is_replaced_by_file_pointer() {
        let path = Path::new("/tmp/prwatch-review-x/PROMPT.md");
        assert_eq!(prompt_argument("short", path), "short");

        let big = "x".repeat(MAX_INLINE_PROMPT_BYTES + 1);
        let arg = prompt_argument(&big, path);
        assert!(arg.len() < 256);
        assert!(arg.contains("/tmp/prwatch-review-x/PROMPT.md"));
    }

    #[test]
    fn workdir_comes_from_config() {
        let cfg = AgentConfig {
            workdir: Some(PathBuf::from("/srv/checkout")),
            ..Default::default()
        };
        assert_eq!(CliAgent::from_config(&cfg).workdir, Some(PathBuf::from("/srv/checkout")));
    }

    #[test]
    fn zero_timeout_means_unbounded() {
        let cfg = AgentConfig {
            timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(CliAgent::from_config(&cfg).timeout, None);
    }
}
