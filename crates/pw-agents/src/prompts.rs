//! Prompt template for the reviewing agent.
//!
//! Templates use `{variable}` placeholders expanded at render time:
//! `{pr}`, `{spec}`, `{diff}`, `{comments}`, `{commits}`, `{files}`.
//! A template file can replace the built-in default.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use pw_integrations::types::{IssueComment, PrCommit, PrFile};

/// Everything gathered about a PR for one review cycle.
#[derive(Debug, Clone, Default)]
pub struct ReviewContext {
    pub pr_number: u64,
    pub spec: Option<String>,
    pub diff: String,
    pub comments: Vec<IssueComment>,
    pub commits: Vec<PrCommit>,
    pub files: Vec<PrFile>,
}

#[derive(Debug, Clone)]
pub enum PromptSource {
    BuiltIn,
    File(PathBuf),
}

/// A review prompt template with `{variable}` placeholders.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    pub template: String,
    pub source: PromptSource,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            template: DEFAULT_REVIEW_TEMPLATE.to_string(),
            source: PromptSource::BuiltIn,
        }
    }
}

impl PromptTemplate {
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        Ok(Self {
            template: std::fs::read_to_string(path)?,
            source: PromptSource::File(path.to_path_buf()),
        })
    }

    /// Render the template with the given variables in a single pass, so
    /// placeholder-looking text inside a value (a diff, say) is left alone.
    /// Unknown `{...}` sequences are copied through verbatim.
    pub fn render(&self, vars: &HashMap<&str, String>) -> String {
        let mut output = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();
        while let Some(open) = rest.find('{') {
            output.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let hit = after
                .find('}')
                .and_then(|close| vars.get(&after[..close]).map(|value| (close, value)));
            match hit {
                Some((close, value)) => {
                    output.push_str(value);
                    rest = &after[close + 1..];
                }
                None => {
                    output.push('{');
                    rest = after;
                }
            }
        }
        output.push_str(rest);
        output
    }

    /// Render a review prompt. Only the last `tail` comments and commits are
    /// included, and the diff is cut to `max_diff_bytes` (`0` for no limit).
    pub fn render_review(&self, ctx: &ReviewContext, tail: usize, max_diff_bytes: usize) -> String {
        let mut vars = HashMap::new();
        vars.insert("pr", ctx.pr_number.to_string());
        vars.insert(
            "spec",
            ctx.spec
                .clone()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "No specification was provided; review against the PR description and comments.".into()),
        );
        vars.insert(
            "diff",
            if ctx.diff.trim().is_empty() {
                "(diff unavailable)".into()
            } else {
                truncate_diff(&ctx.diff, max_diff_bytes)
            },
        );
        vars.insert("comments", format_comments(last_n(&ctx.comments, tail)));
        vars.insert("commits", format_commits(last_n(&ctx.commits, tail)));
        vars.insert("files", format_files(&ctx.files));
        self.render(&vars)
    }
}

/// Cut `diff` to at most `max` bytes on a char boundary and say how much was
/// left out.
pub fn truncate_diff(diff: &str, max: usize) -> String {
    if max == 0 || diff.len() <= max {
        return diff.to_string();
    }
    let mut end = max;
    while !diff.is_char_boundary(end) {
        end -= 1;
    }
    format!(
        "{}\n... [diff truncated: {} of {} bytes omitted]",
        &diff[..end],
        diff.len() - end,
        diff.len()
    )
}

fn last_n<T>(items: &[T], n: usize) -> &[T] {
    &items[items.len().saturating_sub(n)..]
}

fn format_comments(comments: &[IssueComment]) -> String {
    if comments.is_empty() {
        return "(no comments)".into();
    }
    comments
        .iter()
        .map(|c| format!("- @{}: {}", c.author(), c.body.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_commits(commits: &[PrCommit]) -> String {
    if commits.is_empty() {
        return "(no commits)".into();
    }
    commits
        .iter()
        .map(|c| format!("- {} {}", c.short_sha(), c.subject()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_files(files: &[PrFile]) -> String {
    if files.is_empty() {
        return "(no files)".into();
    }
    files
        .iter()
        .map(|f| format!("- {} ({}, +{} -{})", f.filename, f.status, f.additions, f.deletions))
        .collect::<Vec<_>>()
        .join("\n")
}

pub const DEFAULT_REVIEW_TEMPLATE: &str = r#"You are reviewing pull request #{pr}, produced by an autonomous coding agent that has just finished a work session.

Review the changes against the specification, check code quality, and look for security problems.

## Specification
{spec}

## Changed files
{files}

## Recent commits
{commits}

## Recent comments
{comments}

## Diff
```diff
{diff}
```

Respond with exactly one JSON object on a single line, with this shape:
{"overall_status": "pass|needs_work|fail", "spec_compliance": {"score": 0-100, "issues": [], "missing_requirements": []}, "code_quality": {"score": 0-100, "issues": []}, "security": {"score": 0-100, "vulnerabilities": [], "concerns": []}, "recommendation": "continue|fix|escalate", "feedback": "instructions for the coding agent", "escalation_reason": "why a human is needed, if escalating"}

Use "continue" when the work is complete and correct, "fix" when the coding agent can resolve the findings itself, and "escalate" when a human decision is required.
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use pw_integrations::types::{CommitDetail, GitHubUser};

    fn build_prompt(ctx: &ReviewContext, tail: usize) -> String {
        PromptTemplate::default().render_review(ctx, tail, 0)
    }

    fn comment(i: usize) -> IssueComment {
        IssueComment {
            id: i as u64,
            body: format!("comment {i}"),
            user: Some(GitHubUser { login: "alice".into() }),
            created_at: None,
        }
    }

    fn commit(i: usize) -> PrCommit {
        PrCommit {
            sha: format!("{i:040}"),
            commit: CommitDetail {
                message: format!("commit {i}\n\ndetails"),
                author: None,
            },
        }
    }

    #[test]
    fn render_replaces_placeholders() {
        let tpl = PromptTemplate {
            template: "PR {pr}: {files}".into(),
            source: PromptSource::BuiltIn,
        };
        let ctx = ReviewContext {
            pr_number: 12,
            files: vec![PrFile {
                filename: "a.rs".into(),
                status: "added".into(),
                additions: 3,
                deletions: 0,
            }],
            ..Default::default()
        };
        assert_eq!(tpl.render_review(&ctx, 5, 0), "PR 12: - a.rs (added, +3 -0)");
    }

    #[test]
    fn only_last_five_comments_and_commits() {
        let ctx = ReviewContext {
            pr_number: 1,
            comments: (0..8).map(comment).collect(),
            commits: (0..7).map(commit).collect(),
            ..Default::default()
        };
        let prompt = build_prompt(&ctx, 5);
        assert!(!prompt.contains("comment 2\n"));
        assert!(prompt.contains("comment 3"));
        assert!(prompt.contains("comment 7"));
        assert!(!prompt.contains("commit 1\n"));
        assert!(prompt.contains("commit 2"));
        assert!(prompt.contains("commit 6"));
        assert!(!prompt.contains("details"));
    }

    #[test]
    fn empty_context_uses_placeholders() {
        let prompt = build_prompt(&ReviewContext::default(), 5);
        assert!(prompt.contains("No specification was provided"));
        assert!(prompt.contains("(diff unavailable)"));
        assert!(prompt.contains("(no comments)"));
        assert!(prompt.contains("\"recommendation\": \"continue|fix|escalate\""));
    }

    #[test]
    fn values_are_not_re_expanded() {
        let ctx = ReviewContext {
            pr_number: 4,
            diff: "+let s = \"{pr}\";".into(),
            ..Default::default()
        };
        let tpl = PromptTemplate {
            template: "{diff} / {pr} / {unknown}".into(),
            source: PromptSource::BuiltIn,
        };
        assert_eq!(tpl.render_review(&ctx, 5, 0), "+let s = \"{pr}\"; / 4 / {unknown}");
    }

    #[test]
    fn spec_text_is_embedded() {
        let ctx = ReviewContext {
            spec: Some("The widget must be blue.".into()),
            ..Default::default()
        };
        assert!(build_prompt(&ctx, 5).contains("The widget must be blue."));
    }

    #[test]
    fn template_loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("review.md");
        std::fs::write(&path, "Review #{pr}").unwrap();
        let tpl = PromptTemplate::from_file(&path).unwrap();
        assert!(matches!(tpl.source, PromptSource::File(_)));
        let ctx = ReviewContext { pr_number: 3, ..Default::default() };
        assert_eq!(tpl.render_review(&ctx, 5, 0), "Review #3");
    }

    #[test]
    fn long_diff_is_truncated_with_marker() {
        let ctx = ReviewContext {
            pr_number: 9,
            diff: "+".repeat(300 * 1024),
            ..Default::default()
        };
        let prompt = PromptTemplate::default().render_review(&ctx, 5, 64 * 1024);
        assert!(prompt.len() < 70 * 1024);
        assert!(prompt.contains("[diff truncated: 241664 of 307200 bytes omitted]"));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        // each 'é' is two bytes, so a limit of 5 lands mid-char
        let cut = truncate_diff("éééé", 5);
        assert!(cut.starts_with("éé\n"));
        assert!(cut.contains("4 of 8 bytes omitted"));
        assert_eq!(truncate_diff("short", 0), "short");
        assert_eq!(truncate_diff("short", 64), "short");
    }
}
