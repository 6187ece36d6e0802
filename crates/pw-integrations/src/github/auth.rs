//! GitHub token resolution.

use super::client::{GitHubError, Result};

/// Resolve the API token: explicit value, then the named env var, then the
/// local `gh` CLI (`gh auth token`). Empty values are skipped.
pub async fn resolve_token(explicit: Option<&str>, env_name: &str) -> Result<String> {
    if let Some(token) = explicit.map(str::trim).filter(|t| !t.is_empty()) {
        return Ok(token.to_string());
    }

    if let Ok(token) = std::env::var(env_name) {
        let token = token.trim();
        if !token.is_empty() {
            tracing::debug!(env = env_name, "using token from environment");
            return Ok(token.to_string());
        }
    }

    match gh_cli_token().await {
        Ok(Some(token)) => {
            tracing::debug!("using token from gh CLI");
            Ok(token)
        }
        Ok(None) => Err(GitHubError::MissingToken),
        Err(e) => {
            tracing::debug!(error = %e, "gh CLI token lookup failed");
            Err(GitHubError::MissingToken)
        }
    }
}

async fn gh_cli_token() -> Result<Option<String>> {
    let output = tokio::process::Command::new("gh")
        .args(["auth", "token"])
        .stdin(std::process::Stdio::null())
        .output()
        .await
        .map_err(|e| GitHubError::Credential(format!("failed to run gh: {e}")))?;

    if !output.status.success() {
        return Ok(None);
    }
    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Ok((!token.is_empty()).then_some(token))
}
