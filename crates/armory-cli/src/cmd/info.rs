//! Info command

use anyhow::{Result, bail};
use crossterm::style::Stylize;

use armory_core::{catalog, local};

use crate::ops::Context;

/// Show details of a package from the armories and the local install.
pub async fn info(ctx: &Context, name: &str) -> Result<()> {
    ctx.refresh().await?;
    let entry = catalog::find_package(ctx.fetcher.cache(), name, None)?;
    let installed = local::installed(&ctx.layout)
        .into_iter()
        .find(|p| p.lookup_name() == name || p.command_names().contains(&name));

    let Some(entry) = entry else {
        let Some(pkg) = installed else {
            bail!("Package '{name}' not found");
        };
        println!();
        println!(
            "  {} {}",
            name.white().bold(),
            pkg.manifest.version().dark_grey()
        );
        println!("  installed from an armory that is no longer available");
        return Ok(());
    };

    let lw = 12;
    let package = entry.package();
    println!();
    println!(
        "  {} {}",
        package.command_name.as_str().white().bold(),
        entry.version().unwrap_or("?").dark_grey()
    );
    println!();
    println!("  {:<lw$}{}", "armory", entry.armory().name);
    println!("  {:<lw$}{}", "type", package.kind());
    println!("  {:<lw$}{}", "id", entry.id().short());
    println!(
        "  {:<lw$}{}",
        "fetched",
        entry
            .fetched_at()
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M")
    );
    match entry.manifest() {
        Some(manifest) => {
            if !manifest.author().is_empty() {
                println!("  {:<lw$}{}", "author", manifest.author());
            }
            if !manifest.repo_url().is_empty() {
                println!("  {:<lw$}{}", "homepage", manifest.repo_url());
            }
            if let Some(dep) = manifest.depends_on() {
                println!("  {:<lw$}{}", "requires", dep);
            }
            if !manifest.help().is_empty() {
                println!();
                println!("  {}", manifest.help());
            }
        }
        None => {
            if let Some(e) = entry.last_error() {
                println!("  {:<lw$}{}", "error", e.to_string().red());
            }
        }
    }
    if let Some(pkg) = installed {
        println!(
            "  {:<lw$}{} ({})",
            "installed",
            pkg.manifest.version(),
            pkg.dir.display()
        );
    }
    Ok(())
}
