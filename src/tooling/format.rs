//! Text and JSON rendering for CLI output.

use crate::error::ApiError;
use crate::install::{BatchReport, UpdateStatus};
use crate::ledger::InstalledRecord;
use crate::registry::{CatalogEntry, Category, ItemMetadata};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde::Serialize;
use std::collections::BTreeMap;

/// Format a section heading with bold/underline.
pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ApiError::InvalidInput(format!("Failed to render JSON: {}", e)))
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(header);
    table
}

pub fn format_entries_table(entries: &[CatalogEntry]) -> String {
    if entries.is_empty() {
        return "No agents found.".to_string();
    }
    let mut table = new_table(vec!["ID", "Name", "Author", "Category", "Latest", "Downloads", "Rating"]);
    for entry in entries {
        table.add_row(vec![
            entry.id.clone(),
            entry.name.en.clone(),
            entry.author.clone(),
            entry.category.clone(),
            entry.latest.clone(),
            entry.downloads.to_string(),
            format!("{:.1} ({})", entry.rating, entry.rating_count),
        ]);
    }
    format!("{}\n{} agent(s)", table, entries.len())
}

pub fn format_categories(categories: &BTreeMap<String, Category>) -> String {
    if categories.is_empty() {
        return "No categories.".to_string();
    }
    let mut table = new_table(vec!["Key", "Name", "Description"]);
    for (key, category) in categories {
        table.add_row(vec![
            key.clone(),
            category.name.en.clone(),
            category.description.en.clone(),
        ]);
    }
    table.to_string()
}

/// Detailed view of one agent, marking the installed version if any.
pub fn format_metadata_text(metadata: &ItemMetadata, installed: Option<&InstalledRecord>) -> String {
    let title = if metadata.name.en.is_empty() {
        metadata.id.clone()
    } else {
        format!("{} ({})", metadata.name.en, metadata.id)
    };
    let mut out = format!("{}\n\n", format_section_heading(&title));

    if !metadata.description.en.is_empty() {
        out.push_str(&format!("{}\n\n", metadata.description.en));
    }
    if !metadata.long_description.en.is_empty() {
        out.push_str(&format!("{}\n\n", metadata.long_description.en));
    }

    out.push_str(&format!("  Author:    {}\n", metadata.author));
    out.push_str(&format!("  Category:  {}\n", metadata.category));
    out.push_str(&format!("  License:   {}\n", metadata.license));
    if !metadata.homepage.is_empty() {
        out.push_str(&format!("  Homepage:  {}\n", metadata.homepage));
    }
    if !metadata.tags.is_empty() {
        out.push_str(&format!("  Tags:      {}\n", metadata.tags.join(", ")));
    }
    out.push_str(&format!("  Latest:    {}\n", metadata.latest));
    out.push_str(&format!(
        "  Downloads: {}  Rating: {:.1} ({})\n",
        metadata.downloads, metadata.rating, metadata.rating_count
    ));

    let targets: Vec<&str> = metadata
        .compatibility
        .supported_targets()
        .into_iter()
        .map(|t| t.as_str())
        .collect();
    out.push_str(&format!(
        "  Targets:   {}\n",
        if targets.is_empty() { "none".to_string() } else { targets.join(", ") }
    ));

    match installed {
        Some(record) => out.push_str(&format!(
            "  Installed: {} at {}\n",
            record.version,
            record.path.display()
        )),
        None => out.push_str("  Installed: no\n"),
    }

    if !metadata.versions.is_empty() {
        out.push_str(&format!("\n{}\n\n", format_section_heading("Versions")));
        let mut table = new_table(vec!["Version", "Released", "Changes"]);
        for (version, info) in metadata.versions.iter().rev() {
            table.add_row(vec![
                version.clone(),
                info.release_date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "-".to_string()),
                info.changes.clone(),
            ]);
        }
        out.push_str(&format!("{}\n", table));
    }

    out
}

pub fn format_installed_table(records: &[InstalledRecord]) -> String {
    if records.is_empty() {
        return "No agents installed.".to_string();
    }
    let mut table = new_table(vec!["ID", "Version", "Installed At", "Path"]);
    for record in records {
        table.add_row(vec![
            record.id.to_string(),
            record.version.clone(),
            record.installed_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            record.path.display().to_string(),
        ]);
    }
    table.to_string()
}

pub fn format_update_table(statuses: &[UpdateStatus]) -> String {
    if statuses.is_empty() {
        return "No installed agents to check.".to_string();
    }
    let mut table = new_table(vec!["ID", "Installed", "Latest", "Status"]);
    for status in statuses {
        let state = if status.is_current() { "up to date" } else { "update available" };
        table.add_row(vec![
            status.id.to_string(),
            status.installed_version.clone(),
            status.latest_version.clone(),
            state.to_string(),
        ]);
    }
    let available = statuses.iter().filter(|s| !s.is_current()).count();
    format!("{}\n{} update(s) available", table, available)
}

pub fn format_batch_report(report: &BatchReport, verb: &str) -> String {
    let mut out = String::new();
    let heading = if report.dry_run {
        format!("Dry run: would {}", verb)
    } else {
        format!("Batch {}", verb)
    };
    out.push_str(&format!("{}\n\n", format_section_heading(&heading)));

    for item in &report.succeeded {
        out.push_str(&format!(
            "  {} {}@{} -> {}\n",
            "✓".green(),
            item.id,
            item.version,
            item.path.display()
        ));
    }
    for item in &report.skipped {
        out.push_str(&format!("  - {}@{} already up to date\n", item.id, item.version));
    }
    for failure in &report.failed {
        out.push_str(&format!("  {} {}: {}\n", "✗".red(), failure.id, failure.error));
    }

    out.push_str(&format!(
        "\nSucceeded: {}  Skipped: {}  Failed: {}",
        report.success_count(),
        report.skipped.len(),
        report.failure_count()
    ));
    out
}
