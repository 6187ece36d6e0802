use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// TimelineEvent
// ---------------------------------------------------------------------------

/// A single entry of a pull request's event timeline.
///
/// Only the event kind matters for classification. Timeline entries that
/// carry no `event` field (rare, but the API allows it) deserialize with an
/// empty kind and are ignored by [`WorkStatus::classify`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEvent {
    #[serde(rename = "event", default)]
    pub kind: String,
    #[serde(rename = "created_at", default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl TimelineEvent {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            timestamp: None,
        }
    }
}

// ---------------------------------------------------------------------------
// WorkStatus
// ---------------------------------------------------------------------------

/// Balance of "work started" vs "work finished" markers on a timeline.
///
/// This is a coarse count, not per-session correlation: duplicated or
/// replayed events skew it, and "nothing ever started" is indistinguishable
/// from "everything closed" except through `finished > 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WorkStatus {
    pub started: u64,
    pub finished: u64,
}

impl WorkStatus {
    /// Count marker events of the two given kinds.
    pub fn classify(events: &[TimelineEvent], started_kind: &str, finished_kind: &str) -> Self {
        events.iter().fold(Self::default(), |mut status, ev| {
            if ev.kind == started_kind {
                status.started += 1;
            } else if ev.kind == finished_kind {
                status.finished += 1;
            }
            status
        })
    }

    /// `true` once every started session has a matching finish and at least
    /// one finish has been seen.
    pub fn is_done(&self) -> bool {
        self.started == self.finished && self.finished > 0
    }
}

// ---------------------------------------------------------------------------
// Recommendation / Action
// ---------------------------------------------------------------------------

/// What the reviewing agent suggests doing with the PR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Continue,
    Fix,
    Escalate,
}

impl Recommendation {
    /// Case-insensitive parse; anything else is unrecognised.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "continue" => Some(Self::Continue),
            "fix" => Some(Self::Fix),
            "escalate" => Some(Self::Escalate),
            _ => None,
        }
    }
}

/// The action the dispatcher takes for one review cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Continue,
    Fix,
    Escalate,
    Wait,
}

impl From<Recommendation> for Action {
    fn from(r: Recommendation) -> Self {
        match r {
            Recommendation::Continue => Action::Continue,
            Recommendation::Fix => Action::Fix,
            Recommendation::Escalate => Action::Escalate,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Action::Continue => "continue",
            Action::Fix => "fix",
            Action::Escalate => "escalate",
            Action::Wait => "wait",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// ReviewResult
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpecCompliance {
    pub score: Option<f64>,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub missing_requirements: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeQuality {
    pub score: Option<f64>,
    #[serde(default)]
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Security {
    pub score: Option<f64>,
    #[serde(default)]
    pub vulnerabilities: Vec<String>,
    #[serde(default)]
    pub concerns: Vec<String>,
}

/// Structured verdict parsed out of the reviewing agent's output.
///
/// `recommendation` stays a raw string so an unrecognised value can fall
/// back to score averaging instead of failing the parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewResult {
    #[serde(default)]
    pub overall_status: Option<String>,
    #[serde(default)]
    pub spec_compliance: Option<SpecCompliance>,
    #[serde(default)]
    pub code_quality: Option<CodeQuality>,
    #[serde(default)]
    pub security: Option<Security>,
    #[serde(default)]
    pub recommendation: Option<String>,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default)]
    pub escalation_reason: Option<String>,
}

impl ReviewResult {
    pub fn recommendation(&self) -> Option<Recommendation> {
        self.recommendation.as_deref().and_then(Recommendation::parse)
    }

    /// The three section scores, in spec / quality / security order.
    pub fn scores(&self) -> [Option<f64>; 3] {
        [
            self.spec_compliance.as_ref().and_then(|s| s.score),
            self.code_quality.as_ref().and_then(|s| s.score),
            self.security.as_ref().and_then(|s| s.score),
        ]
    }

    /// Mean of the three scores, `None` unless all are present.
    pub fn average_score(&self) -> Option<f64> {
        let [a, b, c] = self.scores();
        Some((a? + b? + c?) / 3.0)
    }
}

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub action: Action,
    pub message: String,
}

impl Decision {
    pub fn wait(reason: impl Into<String>) -> Self {
        Self {
            action: Action::Wait,
            message: reason.into(),
        }
    }
}
