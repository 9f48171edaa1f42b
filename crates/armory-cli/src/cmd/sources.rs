//! Armory source management. These commands never touch the network.

use anyhow::{Context as _, Result};

use armory_core::{ArmorySources, Reporter};
use armory_schema::ArmoryConfig;

use crate::ops::context::layout;
use crate::ui::{Output, table};

fn load() -> Result<ArmorySources> {
    Ok(ArmorySources::load(&layout()?.armories_file()))
}

fn save(sources: &ArmorySources) -> Result<()> {
    sources
        .save()
        .with_context(|| format!("Failed to write {}", sources.path().display()))
}

/// Print configured armories.
pub fn show() -> Result<()> {
    let sources = load()?;
    println!("{}", table::sources(&sources.all()));
    Ok(())
}

pub fn add(
    name: &str,
    url: &str,
    public_key: &str,
    auth: Option<String>,
    auth_cmd: Option<String>,
) -> Result<()> {
    let mut sources = load()?;
    let mut armory = ArmoryConfig::new(name, url, public_key);
    armory.authorization = auth.unwrap_or_default();
    armory.authorization_cmd = auth_cmd.unwrap_or_default();
    sources
        .add(armory)
        .with_context(|| format!("Cannot add armory '{name}'"))?;
    save(&sources)?;
    Output::new().success(&format!("Added armory '{name}'"));
    Ok(())
}

pub fn remove(name: &str) -> Result<()> {
    let mut sources = load()?;
    let removed = sources
        .remove(name)
        .with_context(|| format!("Cannot remove armory '{name}'"))?;
    save(&sources)?;
    let output = Output::new();
    if removed.is_builtin() {
        output.info("The built-in armory stays listed as disabled; 'armory enable Default' restores it.");
    }
    output.success(&format!("Removed armory '{name}'"));
    Ok(())
}

pub fn set_enabled(name: &str, enabled: bool) -> Result<()> {
    let mut sources = load()?;
    sources
        .set_enabled(name, enabled)
        .with_context(|| format!("Cannot update armory '{name}'"))?;
    save(&sources)?;
    let state = if enabled { "Enabled" } else { "Disabled" };
    Output::new().success(&format!("{state} armory '{name}'"));
    Ok(())
}
