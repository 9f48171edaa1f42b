//! List command

use std::time::Instant;

use anyhow::Result;

use armory_core::{Reporter, catalog};

use crate::ops::Context;
use crate::ui::table;

/// List everything the enabled armories publish.
pub async fn list(ctx: &Context, armory: Option<&str>) -> Result<()> {
    let start = Instant::now();
    let filter = ctx.armory_key(armory)?;
    ctx.refresh().await?;

    let listing = catalog::list(ctx.fetcher.cache(), filter.as_deref());
    let installed = super::installed_commands(&ctx.layout);

    for (name, e) in &listing.errors {
        ctx.output.error(&format!("{name}: {e}"));
    }
    if listing.is_empty() {
        println!();
        println!("  No packages found.");
        return Ok(());
    }

    if !listing.aliases.is_empty() {
        ctx.output.section("Aliases");
        println!("{}", table::packages(&listing.aliases, &installed));
    }
    if !listing.extensions.is_empty() {
        ctx.output.section("Extensions");
        println!("{}", table::packages(&listing.extensions, &installed));
    }
    if !listing.bundles.is_empty() {
        ctx.output.section("Bundles");
        println!("{}", table::bundles(&listing.bundles));
    }

    let count = listing.aliases.len() + listing.extensions.len();
    ctx.output.summary(count, "list", start.elapsed().as_secs_f64());
    Ok(())
}
