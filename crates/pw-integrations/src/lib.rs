//! Issue-tracker integration: a thin GitHub REST v3 client covering the
//! pull request surfaces the watcher reads from and writes to.

pub mod github;
pub mod types;
