//! Reviewer launcher: prompt construction and the external agent process.

pub mod prompts;
pub mod runner;
