//! Persistent markdown report of spec/implementation drift found by reviews.
//!
//! The file has a fixed section layout. Entries are appended to the end of
//! their section so the report reads chronologically within each heading.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::types::{Action, Decision, ReviewResult};

pub const CONTEXT_DRIFT: &str = "## Context Drift";
pub const SPEC_REFINEMENTS: &str = "## Spec Refinements";
pub const VALIDATION_RESULTS: &str = "## Validation Results";
pub const MANUAL_VERIFICATION: &str = "## Manual Verification Needed";
pub const FIXES_APPLIED: &str = "## Fixes Applied";

/// Section headings in file order.
pub const SECTIONS: [&str; 5] = [
    CONTEXT_DRIFT,
    SPEC_REFINEMENTS,
    VALIDATION_RESULTS,
    MANUAL_VERIFICATION,
    FIXES_APPLIED,
];

#[derive(Debug, Error)]
pub enum DriftError {
    #[error("drift file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, DriftError>;

/// Handle to a drift report file on disk.
#[derive(Debug, Clone)]
pub struct DriftReport {
    path: PathBuf,
}

impl DriftReport {
    /// Open the report, writing the empty section skeleton if the file does
    /// not exist yet.
    pub fn open_or_create(path: impl Into<PathBuf>) -> Result<Self> {
        let report = Self { path: path.into() };
        if !report.path.exists() {
            if let Some(parent) = report.path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| report.io(e))?;
                }
            }
            std::fs::write(&report.path, skeleton()).map_err(|e| report.io(e))?;
            tracing::info!(path = %report.path.display(), "created drift report");
        }
        Ok(report)
    }

    /// Record the outcome of one review cycle.
    pub fn record(&self, result: &ReviewResult, decision: &Decision, now: DateTime<Utc>) -> Result<()> {
        let stamp = now.format("%Y-%m-%d %H:%M UTC").to_string();
        let mut text = std::fs::read_to_string(&self.path).map_err(|e| self.io(e))?;

        for (heading, entries) in entries_for(result, decision) {
            let lines: Vec<String> = entries
                .iter()
                .map(|e| format!("- [{stamp}] {e}"))
                .collect();
            text = insert_entries(&text, heading, &lines);
        }

        std::fs::write(&self.path, text).map_err(|e| self.io(e))
    }

    fn io(&self, source: std::io::Error) -> DriftError {
        DriftError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

fn skeleton() -> String {
    let mut out = String::from("# Context Drift Report\n");
    for heading in SECTIONS {
        out.push('\n');
        out.push_str(heading);
        out.push('\n');
    }
    out
}

fn entries_for(result: &ReviewResult, decision: &Decision) -> Vec<(&'static str, Vec<String>)> {
    let mut out = Vec::new();

    if let Some(spec) = &result.spec_compliance {
        if !spec.missing_requirements.is_empty() {
            out.push((
                CONTEXT_DRIFT,
                spec.missing_requirements
                    .iter()
                    .map(|m| format!("Missing requirement: {m}"))
                    .collect(),
            ));
        }
        if !spec.issues.is_empty() {
            out.push((SPEC_REFINEMENTS, spec.issues.clone()));
        }
    }

    let fmt = |s: Option<f64>| s.map(|v| format!("{v:.0}")).unwrap_or_else(|| "n/a".into());
    let [spec, quality, security] = result.scores();
    out.push((
        VALIDATION_RESULTS,
        vec![format!(
            "action={} spec={} quality={} security={}",
            decision.action,
            fmt(spec),
            fmt(quality),
            fmt(security)
        )],
    ));

    if let Some(sec) = &result.security {
        let manual: Vec<String> = sec
            .vulnerabilities
            .iter()
            .map(|v| format!("Vulnerability: {v}"))
            .chain(sec.concerns.iter().map(|c| format!("Concern: {c}")))
            .collect();
        if !manual.is_empty() {
            out.push((MANUAL_VERIFICATION, manual));
        }
    }

    if decision.action == Action::Fix {
        let feedback = result.feedback.as_deref().unwrap_or("fix requested");
        out.push((FIXES_APPLIED, vec![format!("Fix requested: {feedback}")]));
    }

    out
}

/// Insert `entries` at the end of the section under `heading`. A heading
/// missing from a hand-edited file is appended at the end.
fn insert_entries(text: &str, heading: &str, entries: &[String]) -> String {
    if entries.is_empty() {
        return text.to_string();
    }

    let mut lines: Vec<String> = text.lines().map(str::to_string).collect();

    let Some(start) = lines.iter().position(|l| l.trim_end() == heading) else {
        if lines.last().is_some_and(|l| !l.is_empty()) {
            lines.push(String::new());
        }
        lines.push(heading.to_string());
        lines.extend(entries.iter().cloned());
        return lines.join("\n") + "\n";
    };

    let mut end = lines[start + 1..]
        .iter()
        .position(|l| l.starts_with("## "))
        .map(|i| start + 1 + i)
        .unwrap_or(lines.len());
    while end > start + 1 && lines[end - 1].trim().is_empty() {
        end -= 1;
    }

    let mut insert = entries.to_vec();
    // keep one blank line before the next heading; reuse an existing one
    if lines.get(end).is_some_and(|l| !l.trim().is_empty()) {
        insert.push(String::new());
    }
    lines.splice(end..end, insert);
    lines.join("\n") + "\n"
}
