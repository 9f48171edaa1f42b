//! Refresh command

use std::time::Instant;

use anyhow::Result;

use armory_core::Reporter;

use crate::ops::Context;
use crate::ui::table;

/// Fetch every enabled armory and show how each one fared.
pub async fn refresh(ctx: &Context) -> Result<()> {
    let start = Instant::now();
    let results = ctx.refresh().await?;
    if results.is_empty() {
        return Ok(());
    }
    println!("{}", table::refreshes(&results));
    for result in &results {
        for (name, e) in &result.failed {
            ctx.output.error(&format!("{}/{name}: {e}", result.armory.name));
        }
    }
    let packages = results.iter().map(|r| r.packages).sum();
    ctx.output.summary(packages, "refresh", start.elapsed().as_secs_f64());
    Ok(())
}
