//! One review cycle's read side: gather PR context, run the agent, parse
//! its verdict.

use std::sync::Arc;

use pw_agents::prompts::{PromptTemplate, ReviewContext};
use pw_agents::runner::AgentRunner;
use pw_core::review::extract_review;
use pw_core::types::ReviewResult;
use pw_integrations::github::client::GitHubClient;
use pw_integrations::github::{issues, pull_requests};

pub struct Reviewer {
    client: GitHubClient,
    pr: u64,
    agent: Arc<dyn AgentRunner>,
    template: PromptTemplate,
    spec: Option<String>,
    context_tail: usize,
    max_diff_bytes: usize,
}

impl Reviewer {
    pub fn new(client: GitHubClient, pr: u64, agent: Arc<dyn AgentRunner>) -> Self {
        Self {
            client,
            pr,
            agent,
            template: PromptTemplate::default(),
            spec: None,
            context_tail: 5,
            max_diff_bytes: 0,
        }
    }

    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn with_spec(mut self, spec: Option<String>) -> Self {
        self.spec = spec;
        self
    }

    pub fn with_context_tail(mut self, tail: usize) -> Self {
        self.context_tail = tail;
        self
    }

    pub fn with_max_diff_bytes(mut self, max: usize) -> Self {
        self.max_diff_bytes = max;
        self
    }

    /// Diff, comments, commits and files. Each part fails soft to empty.
    pub async fn gather_context(&self) -> ReviewContext {
        let pr = self.pr;
        let diff = soft(pull_requests::get_pull_request_diff(&self.client, pr).await, pr, "diff");
        let comments = soft(issues::list_comments(&self.client, pr).await, pr, "comments");
        let commits = soft(pull_requests::list_pr_commits(&self.client, pr).await, pr, "commits");
        let files = soft(pull_requests::list_pr_files(&self.client, pr).await, pr, "files");

        ReviewContext {
            pr_number: pr,
            spec: self.spec.clone(),
            diff,
            comments,
            commits,
            files,
        }
    }

    /// Run the agent and parse its answer. `None` for any failure; the
    /// caller maps that to a wait.
    pub async fn review(&self) -> Option<ReviewResult> {
        let ctx = self.gather_context().await;
        let prompt = self.template.render_review(&ctx, self.context_tail, self.max_diff_bytes);

        let output = match self.agent.run(&prompt).await {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(pr = self.pr, error = %e, "review agent failed");
                return None;
            }
        };

        match extract_review(&output) {
            Ok(result) => {
                tracing::info!(
                    pr = self.pr,
                    recommendation = result.recommendation.as_deref().unwrap_or("<none>"),
                    status = result.overall_status.as_deref().unwrap_or("<none>"),
                    "parsed review"
                );
                Some(result)
            }
            Err(e) => {
                tracing::warn!(pr = self.pr, error = %e, output_bytes = output.len(), "could not parse review");
                None
            }
        }
    }
}

fn soft<T: Default, E: std::fmt::Display>(res: Result<T, E>, pr: u64, what: &str) -> T {
    res.unwrap_or_else(|e| {
        tracing::warn!(pr, what, error = %e, "failed to fetch {what}; continuing without it");
        T::default()
    })
}
