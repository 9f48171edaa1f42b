//! Install command

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context as _, Result};

use armory_core::install::InstallOptions;
use armory_core::{InstallError, Reporter};

use crate::ops::Context;
use crate::ui::StdinConfirm;

/// Install a package, a bundle or `all`.
pub async fn install(ctx: &Context, name: &str, force: bool, armory: Option<&str>) -> Result<()> {
    let options = InstallOptions {
        force,
        armory: ctx.armory_key(armory)?,
    };
    ctx.refresh().await?;

    let start = Instant::now();
    let installer = ctx.installer(Arc::new(StdinConfirm));
    let report = match installer.install(name, &options).await {
        Ok(report) => report,
        Err(InstallError::Declined(name)) => {
            ctx.output.info(&format!("Kept the installed '{name}'."));
            return Ok(());
        }
        Err(e) => return Err(e).with_context(|| format!("Failed to install '{name}'")),
    };
    super::finish(&ctx.output, &report, "install", start)
}
