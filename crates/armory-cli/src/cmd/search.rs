//! Search command

use std::time::Instant;

use anyhow::{Context as _, Result};
use regex::Regex;

use armory_core::{Reporter, catalog};

use crate::ops::Context;
use crate::ui::table;

/// Search packages by regular expression
pub async fn search(ctx: &Context, pattern: &str) -> Result<()> {
    let start = Instant::now();
    let regex = Regex::new(pattern).with_context(|| format!("Invalid pattern '{pattern}'"))?;
    ctx.refresh().await?;

    let results = catalog::search(ctx.fetcher.cache(), &regex, None);
    if results.is_empty() {
        ctx.output.info(&format!("No packages found matching '{pattern}'"));
        return Ok(());
    }

    let installed = super::installed_commands(&ctx.layout);
    println!("{}", table::packages(&results, &installed));
    ctx.output.summary(results.len(), "search", start.elapsed().as_secs_f64());
    Ok(())
}
