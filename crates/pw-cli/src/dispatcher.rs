//! Turning a review into tracker side effects.

use pw_core::decision::{decide, Mentions, Thresholds};
use pw_core::drift::DriftReport;
use pw_core::types::{Action, Decision, ReviewResult};
use pw_integrations::github::client::GitHubClient;
use pw_integrations::github::{issues, pull_requests};

/// What a dispatch actually did, for logging and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOutcome {
    pub decision: Decision,
    pub comment_posted: bool,
    pub review_requested: bool,
}

impl DispatchOutcome {
    pub fn action(&self) -> Action {
        self.decision.action
    }
}

pub struct Dispatcher {
    client: GitHubClient,
    pr: u64,
    mentions: Mentions,
    thresholds: Thresholds,
    dry_run: bool,
    drift: Option<DriftReport>,
}

impl Dispatcher {
    pub fn new(client: GitHubClient, pr: u64, mentions: Mentions) -> Self {
        Self {
            client,
            pr,
            mentions,
            thresholds: Thresholds::default(),
            dry_run: false,
            drift: None,
        }
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_drift_report(mut self, drift: Option<DriftReport>) -> Self {
        self.drift = drift;
        self
    }

    /// Decide and act. Write failures are logged and otherwise ignored.
    pub async fn dispatch(&self, review: Option<&ReviewResult>) -> DispatchOutcome {
        let decision = decide(review, &self.thresholds, &self.mentions);
        tracing::info!(pr = self.pr, action = %decision.action, dry_run = self.dry_run, "review decision");

        let mut outcome = DispatchOutcome {
            decision,
            comment_posted: false,
            review_requested: false,
        };

        if outcome.decision.action != Action::Wait {
            if self.dry_run {
                tracing::info!(pr = self.pr, message = %outcome.decision.message, "dry run: not posting");
            } else {
                outcome.comment_posted = self.post_comment(&outcome.decision.message).await;
                if outcome.decision.action == Action::Escalate {
                    outcome.review_requested = self.request_owner_review().await;
                }
            }
        }

        if let (Some(drift), Some(review)) = (&self.drift, review) {
            if let Err(e) = drift.record(review, &outcome.decision, chrono::Utc::now()) {
                tracing::warn!(error = %e, "failed to update drift report");
            }
        }

        outcome
    }

    async fn post_comment(&self, body: &str) -> bool {
        match issues::create_comment(&self.client, self.pr, body).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(pr = self.pr, error = %e, "failed to post comment");
                false
            }
        }
    }

    async fn request_owner_review(&self) -> bool {
        let reviewers = [self.mentions.owner.clone()];
        match pull_requests::request_reviewers(&self.client, self.pr, &reviewers).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(pr = self.pr, reviewer = %self.mentions.owner, error = %e, "failed to request review");
                false
            }
        }
    }
}
