use anyhow::Context;
use pw_core::config::Config;
use pw_core::types::WorkStatus;
use pw_integrations::github::{issues, pull_requests};

use super::{connect, Target};

/// Print PR state and the worker's session balance.
pub async fn run(config: &Config, target: &Target, token: Option<&str>) -> anyhow::Result<()> {
    let client = connect(config, target, token).await?;

    let pr = pull_requests::get_pull_request(&client, target.pr)
        .await
        .with_context(|| format!("fetching PR #{}", target.pr))?;
    let events = issues::list_timeline(&client, target.pr)
        .await
        .with_context(|| format!("fetching timeline of PR #{}", target.pr))?;
    let status = WorkStatus::classify(&events, &config.markers.started, &config.markers.finished);

    let state = if pr.is_merged() {
        "merged"
    } else if pr.is_open() {
        "open"
    } else {
        "closed"
    };
    println!("PR #{}: {state}", target.pr);
    println!("{}", format_status(&status));
    Ok(())
}

fn format_status(status: &WorkStatus) -> String {
    format!(
        "started={} finished={} done={}",
        status.started,
        status.finished,
        status.is_done()
    )
}
