//! The PR watch loop.
//!
//! Each iteration checks the PR is still open, reads its timeline and, when
//! the worker's latest session has finished, runs one review cycle. A
//! given finish count is handled at most once, even if the cycle fails.

use std::time::Duration;

use pw_core::config::MarkerConfig;
use pw_core::types::WorkStatus;
use pw_integrations::github::client::GitHubClient;
use pw_integrations::github::{issues, pull_requests};

use crate::dispatcher::{DispatchOutcome, Dispatcher};
use crate::reviewer::Reviewer;

/// Loop state carried between iterations.
#[derive(Debug, Clone)]
pub struct PollerContext {
    /// Highest finish count already reviewed. Never decreases.
    pub last_handled_finished: u64,
    pub first_check: bool,
    pub cycles: u64,
}

impl Default for PollerContext {
    fn default() -> Self {
        Self {
            last_handled_finished: 0,
            first_check: true,
            cycles: 0,
        }
    }
}

impl PollerContext {
    /// Whether `status` is a completion that has not been handled yet.
    pub fn should_review(&self, status: &WorkStatus) -> bool {
        status.is_done() && status.finished > self.last_handled_finished
    }

    pub fn mark_handled(&mut self, finished: u64) {
        self.last_handled_finished = self.last_handled_finished.max(finished);
        self.cycles += 1;
    }
}

/// Result of a single iteration.
#[derive(Debug)]
pub enum PollStep {
    /// The PR left the open state; the loop ends.
    Closed,
    /// Nothing new to review.
    Idle(WorkStatus),
    /// A review cycle ran.
    Reviewed(WorkStatus, DispatchOutcome),
}

/// Review then dispatch, the work done for one detected completion.
pub struct ReviewCycle {
    pub reviewer: Reviewer,
    pub dispatcher: Dispatcher,
}

impl ReviewCycle {
    pub async fn run(&self) -> DispatchOutcome {
        let review = self.reviewer.review().await;
        self.dispatcher.dispatch(review.as_ref()).await
    }
}

pub struct Poller {
    client: GitHubClient,
    pr: u64,
    markers: MarkerConfig,
    interval: Duration,
}

impl Poller {
    pub fn new(client: GitHubClient, pr: u64, markers: MarkerConfig, interval: Duration) -> Self {
        Self {
            client,
            pr,
            markers,
            interval,
        }
    }

    /// `false` only when the API says the PR is no longer open. A failed
    /// lookup counts as still open so the next poll can retry.
    pub async fn is_open(&self) -> bool {
        match pull_requests::get_pull_request(&self.client, self.pr).await {
            Ok(pr) => {
                if !pr.is_open() {
                    tracing::info!(pr = self.pr, merged = pr.is_merged(), "pull request is no longer open");
                }
                pr.is_open()
            }
            Err(e) => {
                tracing::warn!(pr = self.pr, error = %e, "failed to fetch PR state; will retry");
                true
            }
        }
    }

    pub async fn work_status(&self) -> WorkStatus {
        let events = issues::fetch_timeline(&self.client, self.pr).await;
        WorkStatus::classify(&events, &self.markers.started, &self.markers.finished)
    }

    /// One iteration, without the sleep.
    pub async fn poll_once(&self, ctx: &mut PollerContext, cycle: &ReviewCycle) -> PollStep {
        if !self.is_open().await {
            return PollStep::Closed;
        }

        let status = self.work_status().await;
        tracing::debug!(
            pr = self.pr,
            started = status.started,
            finished = status.finished,
            done = status.is_done(),
            "timeline checked"
        );

        if !ctx.should_review(&status) {
            return PollStep::Idle(status);
        }

        tracing::info!(pr = self.pr, finished = status.finished, "worker session finished; starting review");
        let outcome = cycle.run().await;
        ctx.mark_handled(status.finished);
        PollStep::Reviewed(status, outcome)
    }

    /// Poll until the PR closes. The first iteration runs immediately.
    pub async fn run(&self, ctx: &mut PollerContext, cycle: &ReviewCycle) {
        tracing::info!(
            pr = self.pr,
            owner = self.client.owner(),
            repo = self.client.repo(),
            interval = ?self.interval,
            "watching pull request"
        );

        loop {
            if !ctx.first_check {
                tokio::time::sleep(self.interval).await;
            }
            ctx.first_check = false;

            match self.poll_once(ctx, cycle).await {
                PollStep::Closed => break,
                PollStep::Idle(status) => {
                    tracing::trace!(pr = self.pr, ?status, "nothing to review");
                }
                PollStep::Reviewed(status, outcome) => {
                    tracing::info!(
                        pr = self.pr,
                        finished = status.finished,
                        action = %outcome.action(),
                        comment_posted = outcome.comment_posted,
                        review_requested = outcome.review_requested,
                        "review cycle complete"
                    );
                }
            }
        }

        tracing::info!(pr = self.pr, cycles = ctx.cycles, "stopped watching");
    }
}
