use std::time::Duration;

use pw_core::config::Config;

use super::{build_cycle, connect, ReviewArgs, Target};
use crate::poller::{Poller, PollerContext};

/// Watch a PR until it closes, reviewing each finished worker session.
pub async fn run(
    config: &Config,
    target: &Target,
    token: Option<&str>,
    interval: Duration,
    args: &ReviewArgs,
) -> anyhow::Result<()> {
    let client = connect(config, target, token).await?;
    let cycle = build_cycle(config, &client, target, args)?;
    let poller = Poller::new(client, target.pr, config.markers.clone(), interval);

    let mut ctx = PollerContext::default();
    tokio::select! {
        () = poller.run(&mut ctx, &cycle) => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!(pr = target.pr, "interrupted; stopping");
        }
    }
    Ok(())
}
