//! Parsing the reviewing agent's free-text output into a [`ReviewResult`].
//!
//! The agent is asked to answer with a single JSON object, but real output
//! is usually wrapped in prose or tool chatter. We pull out one brace span,
//! parse it, then validate it against the schema rules below.

use thiserror::Error;

use crate::types::ReviewResult;

#[derive(Debug, Error)]
pub enum ReviewParseError {
    #[error("no JSON object found in agent output")]
    NoJson,

    #[error("malformed review JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("review JSON failed validation: {0}")]
    Schema(String),
}

pub type Result<T> = std::result::Result<T, ReviewParseError>;

/// Find the candidate JSON span in `raw`.
///
/// First pass is line-oriented and greedy: the first line where a `{` is
/// followed by a `}` yields everything from that `{` to the line's last `}`.
/// Lines with an unclosed brace (quoted code like `fn main() {`) are skipped.
/// If no line yields a span, fall back to first `{` .. last `}` across the
/// whole text so pretty-printed objects still parse.
pub fn find_json_span(raw: &str) -> Option<&str> {
    let single_line = raw.lines().find_map(|line| {
        let start = line.find('{')?;
        let end = line.rfind('}')?;
        (end > start).then(|| &line[start..=end])
    });
    if single_line.is_some() {
        return single_line;
    }

    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

/// Extract and validate a review from raw agent output.
pub fn extract_review(raw: &str) -> Result<ReviewResult> {
    let span = find_json_span(raw).ok_or(ReviewParseError::NoJson)?;
    let result: ReviewResult = serde_json::from_str(span)?;
    validate(&result)?;
    Ok(result)
}

/// Schema rules that serde alone cannot express.
pub fn validate(result: &ReviewResult) -> Result<()> {
    let names = ["spec_compliance", "code_quality", "security"];
    for (name, score) in names.iter().zip(result.scores()) {
        if let Some(s) = score {
            if !(0.0..=100.0).contains(&s) {
                return Err(ReviewParseError::Schema(format!(
                    "{name}.score {s} is outside 0..=100"
                )));
            }
        }
    }

    if result.recommendation().is_none() && result.average_score().is_none() {
        let rec = result.recommendation.as_deref().unwrap_or("<missing>");
        return Err(ReviewParseError::Schema(format!(
            "recommendation '{rec}' is not usable and scores are incomplete"
        )));
    }

    Ok(())
}
