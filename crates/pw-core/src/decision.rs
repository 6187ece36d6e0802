//! Mapping a [`ReviewResult`] onto the single action taken for a cycle.

use crate::types::{Action, Decision, ReviewResult};

/// Average-score cut-offs used when the agent gives no usable recommendation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub continue_at: f64,
    pub fix_at: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            continue_at: 90.0,
            fix_at: 70.0,
        }
    }
}

impl Thresholds {
    pub fn action_for(&self, average: f64) -> Action {
        if average >= self.continue_at {
            Action::Continue
        } else if average >= self.fix_at {
            Action::Fix
        } else {
            Action::Escalate
        }
    }
}

/// Who gets mentioned in the comments a decision produces.
#[derive(Debug, Clone)]
pub struct Mentions {
    /// Handle of the worker that implements fixes, e.g. `@copilot`.
    pub worker: String,
    /// Login of the human owner that receives escalations (no `@`).
    pub owner: String,
}

/// Decide what to do with a review. `None` means the cycle produced no
/// usable review and maps to [`Action::Wait`].
pub fn decide(result: Option<&ReviewResult>, thresholds: &Thresholds, mentions: &Mentions) -> Decision {
    let Some(result) = result else {
        return Decision::wait("no usable review result; will retry on the next completion");
    };

    let action = match result.recommendation() {
        Some(rec) => Action::from(rec),
        None => match result.average_score() {
            Some(avg) => {
                tracing::debug!(average = avg, "falling back to average score");
                thresholds.action_for(avg)
            }
            None => return Decision::wait("review has neither a recommendation nor complete scores"),
        },
    };

    let message = match action {
        Action::Continue => continue_message(result),
        Action::Fix => fix_message(result, &mentions.worker),
        Action::Escalate => escalate_message(result, &mentions.owner),
        Action::Wait => String::new(),
    };

    Decision { action, message }
}

fn score_line(result: &ReviewResult) -> String {
    let fmt = |s: Option<f64>| s.map(|v| format!("{v:.0}")).unwrap_or_else(|| "n/a".into());
    let [spec, quality, security] = result.scores();
    format!(
        "Scores: spec compliance {}, code quality {}, security {}",
        fmt(spec),
        fmt(quality),
        fmt(security)
    )
}

fn bullet_list(title: &str, items: &[String]) -> Option<String> {
    if items.is_empty() {
        return None;
    }
    let mut out = format!("**{title}**\n");
    for item in items {
        out.push_str(&format!("- {item}\n"));
    }
    Some(out)
}

fn continue_message(result: &ReviewResult) -> String {
    let mut parts = vec![
        "✅ **Automated review passed.** The changes look good to proceed.".to_string(),
        score_line(result),
    ];
    if let Some(feedback) = result.feedback.as_deref().filter(|f| !f.trim().is_empty()) {
        parts.push(feedback.trim().to_string());
    }
    parts.join("\n\n")
}

fn fix_message(result: &ReviewResult, worker: &str) -> String {
    let feedback = result
        .feedback
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .unwrap_or("Please address the review findings below.");

    let mut parts = vec![format!("{worker} {feedback}"), score_line(result)];
    if let Some(spec) = &result.spec_compliance {
        parts.extend(bullet_list("Spec issues", &spec.issues));
        parts.extend(bullet_list("Missing requirements", &spec.missing_requirements));
    }
    if let Some(quality) = &result.code_quality {
        parts.extend(bullet_list("Code quality issues", &quality.issues));
    }
    parts.join("\n\n")
}

fn escalate_message(result: &ReviewResult, owner: &str) -> String {
    let reason = result
        .escalation_reason
        .as_deref()
        .or(result.feedback.as_deref())
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or("The automated review could not approve these changes.");

    let mut parts = vec![
        format!("@{owner} ⚠️ **Human review needed.** {reason}"),
        score_line(result),
    ];
    if let Some(security) = &result.security {
        parts.extend(bullet_list("Security vulnerabilities", &security.vulnerabilities));
        parts.extend(bullet_list("Security concerns", &security.concerns));
    }
    parts.join("\n\n")
}
