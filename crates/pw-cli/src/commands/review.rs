use pw_core::config::Config;

use super::{build_cycle, connect, ReviewArgs, Target};

/// Run a single review cycle right now, whatever the timeline says.
pub async fn run(config: &Config, target: &Target, token: Option<&str>, args: &ReviewArgs) -> anyhow::Result<()> {
    let client = connect(config, target, token).await?;
    let cycle = build_cycle(config, &client, target, args)?;

    let outcome = cycle.run().await;
    println!("PR #{}: {}", target.pr, outcome.action());
    if !outcome.decision.message.is_empty() {
        println!("\n{}", outcome.decision.message);
    }
    Ok(())
}
