use pw_core::types::TimelineEvent;
use serde_json::json;

use crate::types::IssueComment;

use super::client::{GitHubClient, Result};

/// Every timeline event of an issue or pull request, all pages.
pub async fn list_timeline(client: &GitHubClient, number: u64) -> Result<Vec<TimelineEvent>> {
    let path = format!("{}/issues/{number}/timeline", client.repo_path());
    client.fetch_all(&path).await
}

/// Fail-soft timeline fetch: on error, logs and returns what was fetched.
pub async fn fetch_timeline(client: &GitHubClient, number: u64) -> Vec<TimelineEvent> {
    let path = format!("{}/issues/{number}/timeline", client.repo_path());
    client.fetch_all_lossy(&path, "timeline").await
}

/// Conversation comments on an issue or pull request, all pages.
pub async fn list_comments(client: &GitHubClient, number: u64) -> Result<Vec<IssueComment>> {
    let path = format!("{}/issues/{number}/comments", client.repo_path());
    client.fetch_all(&path).await
}

/// Post a conversation comment.
pub async fn create_comment(client: &GitHubClient, number: u64, body: &str) -> Result<IssueComment> {
    let path = format!("{}/issues/{number}/comments", client.repo_path());
    let comment: IssueComment = client.api_post(&path, &json!({ "body": body })).await?;
    tracing::debug!(pr = number, comment_id = comment.id, "posted comment");
    Ok(comment)
}
