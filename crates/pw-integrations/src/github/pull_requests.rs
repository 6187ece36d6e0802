use serde_json::json;

use crate::types::{GitHubPullRequest, PrCommit, PrFile};

use super::client::{GitHubClient, Result};

const DIFF_MEDIA_TYPE: &str = "application/vnd.github.v3.diff";

/// Get a single pull request by number.
pub async fn get_pull_request(client: &GitHubClient, number: u64) -> Result<GitHubPullRequest> {
    let path = format!("{}/pulls/{number}", client.repo_path());
    client.api_get(&path).await
}

/// Unified diff of a pull request, via the diff media type.
pub async fn get_pull_request_diff(client: &GitHubClient, number: u64) -> Result<String> {
    let path = format!("{}/pulls/{number}", client.repo_path());
    let resp = client.api_get_raw(&path, DIFF_MEDIA_TYPE).await?;
    Ok(resp.text().await?)
}

/// Commits on a pull request, all pages.
pub async fn list_pr_commits(client: &GitHubClient, number: u64) -> Result<Vec<PrCommit>> {
    let path = format!("{}/pulls/{number}/commits", client.repo_path());
    client.fetch_all(&path).await
}

/// List files changed in a pull request, all pages.
pub async fn list_pr_files(client: &GitHubClient, number: u64) -> Result<Vec<PrFile>> {
    let path = format!("{}/pulls/{number}/files", client.repo_path());
    client.fetch_all(&path).await
}

/// Request reviews from the given users.
pub async fn request_reviewers(client: &GitHubClient, number: u64, reviewers: &[String]) -> Result<()> {
    let path = format!("{}/pulls/{number}/requested_reviewers", client.repo_path());
    let _: serde_json::Value = client
        .api_post(&path, &json!({ "reviewers": reviewers }))
        .await?;
    tracing::debug!(pr = number, ?reviewers, "requested reviewers");
    Ok(())
}
