pub mod completions;
pub mod info;
pub mod install;
pub mod list;
pub mod refresh;
pub mod search;
pub mod sources;
pub mod update;

use std::collections::HashSet;
use std::time::Instant;

use anyhow::{Result, bail};

use armory_core::{InstallReport, Layout, Reporter, local};

use crate::ui::Output;

/// Print failures and the footer of a bulk operation.
pub(crate) fn finish(output: &Output, report: &InstallReport, action: &str, start: Instant) -> Result<()> {
    for (name, e) in &report.failed {
        output.error(&format!("{name}: {e}"));
    }
    output.summary(report.installed.len(), action, start.elapsed().as_secs_f64());
    if !report.is_success() {
        bail!("{} of {} packages failed", report.failed.len(), report.failed.len() + report.installed.len());
    }
    Ok(())
}

/// Command names registered by installed packages.
pub(crate) fn installed_commands(layout: &Layout) -> HashSet<String> {
    local::installed(layout)
        .iter()
        .flat_map(|p| p.command_names().into_iter().map(str::to_string))
        .collect()
}
