//! Table rendering for listings.

use std::collections::HashSet;

use comfy_table::presets::UTF8_HORIZONTAL_ONLY;
use comfy_table::{Cell, Color, ContentArrangement, Table};

use armory_core::ArmoryRefresh;
use armory_core::cache::PackageCacheEntry;
use armory_core::updates::UpdateCandidate;
use armory_schema::{ArmoryBundle, ArmoryConfig};

fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_HORIZONTAL_ONLY)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}

/// Aliases or extensions; installed command names are highlighted.
pub fn packages(entries: &[PackageCacheEntry], installed: &HashSet<String>) -> Table {
    let mut t = table(vec!["Armory", "Command Name", "Version", "Type", "Help", "URL"]);
    for entry in entries {
        let package = entry.package();
        let manifest = entry.manifest();
        let mut name = Cell::new(&package.command_name);
        if installed.contains(&package.command_name) {
            name = name.fg(Color::Green);
        }
        t.add_row(vec![
            Cell::new(&entry.armory().name),
            name,
            Cell::new(entry.version().unwrap_or("-")),
            Cell::new(package.kind()),
            Cell::new(first_line(manifest.map_or("", |m| m.help()))),
            Cell::new(manifest.map_or(package.repo_url.as_str(), |m| m.repo_url())),
        ]);
    }
    t
}

pub fn bundles(bundles: &[(String, ArmoryBundle)]) -> Table {
    let mut t = table(vec!["Armory", "Name", "Contains"]);
    for (armory, bundle) in bundles {
        t.add_row(vec![
            Cell::new(armory),
            Cell::new(&bundle.name),
            Cell::new(bundle.packages.join(", ")),
        ]);
    }
    t
}

/// Pending updates, numbered from 1 for selection.
pub fn updates(candidates: &[UpdateCandidate]) -> Table {
    let mut t = table(vec!["#", "Name", "Installed", "Available", "Armory"]);
    for (i, update) in candidates.iter().enumerate() {
        t.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&update.command_name),
            Cell::new(&update.old_version).fg(Color::DarkGrey),
            Cell::new(&update.new_version).fg(Color::Green),
            Cell::new(&update.armory_name),
        ]);
    }
    t
}

pub fn sources(armories: &[ArmoryConfig]) -> Table {
    let mut t = table(vec!["Name", "URL", "Public Key", "Auth", "Enabled"]);
    for armory in armories {
        let enabled = if armory.enabled {
            Cell::new("yes").fg(Color::Green)
        } else {
            Cell::new("no").fg(Color::DarkGrey)
        };
        t.add_row(vec![
            Cell::new(&armory.name),
            Cell::new(&armory.repo_url),
            Cell::new(&armory.public_key),
            Cell::new(if armory.has_authorization() { "yes" } else { "" }),
            enabled,
        ]);
    }
    t
}

pub fn refreshes(results: &[ArmoryRefresh]) -> Table {
    let mut t = table(vec!["Armory", "Packages", "Failed", "Removed", "Status"]);
    for result in results {
        let status = match &result.index_error {
            Some(e) => Cell::new(e).fg(Color::Red),
            None if result.failed.is_empty() => Cell::new("ok").fg(Color::Green),
            None => Cell::new("partial").fg(Color::Yellow),
        };
        t.add_row(vec![
            Cell::new(&result.armory.name),
            Cell::new(result.packages),
            Cell::new(result.failed.len()),
            Cell::new(result.removed.len()),
            status,
        ]);
    }
    t
}
