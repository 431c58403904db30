//! Rendering results for the terminal
//!
//! Every printer has a text form (colored with `colored`) and a JSON form
//! selected by `--json`. The plain-text building blocks are exposed
//! separately so they can be checked without a terminal.

use anyhow::Result;
use colored::{ColoredString, Colorize};
use serde::Serialize;

use crate::api::ApiKey;
use crate::auth::StoredToken;
use crate::directory::{Device, DeviceDirectory};
use crate::engine::TagRun;
use crate::executor::{DeviceOutcome, Outcome, Summary};
use crate::resolver::Target;
use crate::tag::format_tags;

/// Device names shown per tag in the inventory before truncating
pub const INVENTORY_NAME_LIMIT: usize = 5;

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// `name (id): current -> proposed`
pub fn describe_change(entry: &DeviceOutcome) -> String {
    format!(
        "{} ({}): {} -> {}",
        entry.device.name,
        entry.device.id,
        format_tags(&entry.current),
        format_tags(&entry.proposed)
    )
}

/// Counts per outcome, omitting kinds that did not occur
pub fn summary_line(summary: &Summary) -> String {
    let parts: Vec<String> = [
        (summary.applied, "applied"),
        (summary.would_change, "would change"),
        (summary.failed, "failed"),
        (summary.unchanged, "unchanged"),
    ]
    .iter()
    .filter(|(count, _)| *count > 0)
    .map(|(count, label)| format!("{} {}", count, label))
    .collect();

    if parts.is_empty() {
        "no devices matched".to_string()
    } else {
        parts.join(", ")
    }
}

fn outcome_label(outcome: &Outcome) -> ColoredString {
    let label = format!("[{}]", outcome.label());
    match outcome {
        Outcome::Unchanged => label.dimmed(),
        Outcome::WouldChange => label.yellow(),
        Outcome::Applied => label.green(),
        Outcome::Failed(_) => label.red(),
    }
}

/// Prints the outcome of a tag operation
///
/// Unchanged devices are listed when the user named the devices; for
/// tailnet-wide operations they only appear in the summary count.
pub fn print_run(run: &TagRun, json: bool) -> Result<()> {
    if json {
        return print_json(run);
    }

    println!("{} {}", "Operation:".bold(), run.operation);

    for unresolved in &run.unresolved {
        println!(
            "  {} {}: {}",
            "[unresolved]".yellow(),
            unresolved.identifier,
            unresolved.reason
        );
    }

    let list_unchanged = matches!(run.operation.target(), Target::Devices(_));
    for entry in &run.report.outcomes {
        if entry.outcome == Outcome::Unchanged && !list_unchanged {
            continue;
        }
        println!("  {} {}", describe_change(entry), outcome_label(&entry.outcome));
    }

    println!("{} {}", "Summary:".bold(), summary_line(&run.report.summary()));

    let failures = run.report.failures();
    if !failures.is_empty() {
        println!("{}", "Failures:".red().bold());
        for (device, reason) in failures {
            println!("  {} ({}): {}", device.name, device.id, reason);
        }
    }

    if !run.report.applied_mode && run.report.summary().would_change > 0 {
        println!(
            "{}",
            "This was a dry run. Re-run with --apply to make these changes.".yellow()
        );
    }

    Ok(())
}

/// `valid, expires in 1h 5m` or `expired`
pub fn token_state(token: &StoredToken, now: u64) -> String {
    match token.remaining_at(now) {
        Some(remaining) if !token.is_expired_at(now) => {
            let secs = remaining.as_secs();
            format!("valid, expires in {}h {}m", secs / 3600, (secs % 3600) / 60)
        }
        _ => "expired".to_string(),
    }
}

/// Names of the first few devices, then `and N more`
pub fn inventory_devices_column(devices: &[&Device]) -> String {
    let mut column = devices
        .iter()
        .take(INVENTORY_NAME_LIMIT)
        .map(|d| d.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    if devices.len() > INVENTORY_NAME_LIMIT {
        column.push_str(&format!(" and {} more", devices.len() - INVENTORY_NAME_LIMIT));
    }
    column
}

#[derive(Serialize)]
struct InventoryRow<'a> {
    tag: &'a str,
    device_count: usize,
    devices: Vec<&'a str>,
}

/// Prints every tag in use with the devices carrying it
pub fn print_tag_inventory(directory: &DeviceDirectory, json: bool) -> Result<()> {
    let inventory = directory.tag_inventory();

    if json {
        let rows: Vec<InventoryRow> = inventory
            .iter()
            .map(|(tag, devices)| InventoryRow {
                tag: *tag,
                device_count: devices.len(),
                devices: devices.iter().map(|d| d.name.as_str()).collect(),
            })
            .collect();
        return print_json(&rows);
    }

    if inventory.is_empty() {
        println!("{}", "No tags found in this tailnet.".yellow());
        return Ok(());
    }

    println!("{}", format!("Tags ({})", inventory.len()).bold());
    for (tag, devices) in &inventory {
        println!(
            "  {}  {}  {}",
            tag.cyan(),
            devices.len().to_string().green(),
            inventory_devices_column(devices).dimmed()
        );
    }
    Ok(())
}

/// Prints devices with their tags
pub fn print_device_tags(devices: &[&Device], json: bool) -> Result<()> {
    if json {
        return print_json(devices);
    }

    if devices.is_empty() {
        println!("{}", "No devices found matching the filters.".yellow());
        return Ok(());
    }

    for device in devices {
        println!(
            "  {} {}  {}",
            device.name.cyan(),
            format!("({})", device.id).dimmed(),
            format_tags(&device.tags).green()
        );
    }
    Ok(())
}

/// Prints the full device listing
pub fn print_devices(devices: &[Device], json: bool) -> Result<()> {
    if json {
        return print_json(devices);
    }

    if devices.is_empty() {
        println!("{}", "No devices found in this tailnet.".yellow());
        return Ok(());
    }

    for device in devices {
        println!("{} {}", device.name.bold(), format!("({})", device.id).dimmed());
        println!("    {}: {}", "IP".dimmed(), device.ip);
        println!("    {}: {}", "OS".dimmed(), device.os);
        println!("    {}: {}", "Last seen".dimmed(), device.last_seen);
        println!("    {}: {}", "Tags".dimmed(), format_tags(&device.tags));
    }
    Ok(())
}

pub fn print_keys(keys: &[ApiKey], json: bool) -> Result<()> {
    if json {
        return print_json(keys);
    }

    if keys.is_empty() {
        println!("{}", "No API keys found in this tailnet.".yellow());
        return Ok(());
    }

    for key in keys {
        let name = if key.description.is_empty() {
            "(no description)"
        } else {
            key.description.as_str()
        };
        println!("{} {}", name.bold(), format!("({})", key.id).dimmed());
        println!("    {}: {}", "Created".dimmed(), key.created);
        println!("    {}: {}", "Expires".dimmed(), key.expires);
    }
    Ok(())
}
