//! Update command - detect and apply newer package versions

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;

use armory_core::Reporter;
use armory_core::install::AcceptOverwrite;
use armory_core::local;
use armory_core::updates::{UpdateCandidate, check_for_updates, parse_selection};

use crate::ops::Context;
use crate::ui::{prompt, table};

/// Ask until the operator enters a valid selection. End of input selects nothing.
fn select(ctx: &Context, count: usize) -> Result<Vec<usize>> {
    loop {
        let Some(answer) = prompt("Select updates (all, none, 1,3-4): ")? else {
            return Ok(Vec::new());
        };
        match parse_selection(&answer, count) {
            Ok(selected) => return Ok(selected),
            Err(e) => ctx.output.warning(&e.to_string()),
        }
    }
}

/// Check installed packages against the armories and apply chosen updates.
pub async fn update(ctx: &Context, armory: Option<&str>, all: bool) -> Result<()> {
    let filter = ctx.armory_key(armory)?;
    ctx.refresh().await?;

    let installed = local::installed(&ctx.layout);
    let candidates: Vec<UpdateCandidate> = check_for_updates(
        &installed,
        ctx.fetcher.cache(),
        filter.as_deref(),
        ctx.settings.version_ordering,
    )
    .into_values()
    .collect();

    if candidates.is_empty() {
        ctx.output.success("All packages are up to date.");
        return Ok(());
    }

    println!();
    println!("{}", table::updates(&candidates));
    println!();

    let selected = if all {
        (0..candidates.len()).collect()
    } else {
        select(ctx, candidates.len())?
    };
    let chosen: Vec<UpdateCandidate> = selected
        .into_iter()
        .filter_map(|i| candidates.get(i).cloned())
        .collect();
    if chosen.is_empty() {
        ctx.output.info("No updates selected.");
        return Ok(());
    }

    let start = Instant::now();
    let report = ctx
        .installer(Arc::new(AcceptOverwrite))
        .apply_updates(&chosen)
        .await;
    super::finish(&ctx.output, &report, "update", start)
}
