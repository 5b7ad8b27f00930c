//! Output formatting for CLI display
//!
//! Human-readable lines for selection outcomes and resolutions, plus a JSON
//! rendering for scripts. In quiet mode only paths are printed.

use crate::handle::ContentHandle;
use crate::outcome::{Picked, ResolvedItem, SelectionOutcome};
use crate::resolver::Resolution;
use byte_unit::{Byte, UnitType};
use colored::Colorize;
use std::path::Path;

/// Human-readable size, binary units
#[must_use]
pub fn format_size(size: u64) -> String {
    Byte::from_u64(size)
        .get_appropriate_unit(UnitType::Binary)
        .to_string()
}

/// Color a path based on file existence (green if exists, red if missing)
#[must_use]
pub fn colorize_path(path: &Path) -> String {
    let formatted = path.display().to_string();
    if path.exists() {
        formatted.green().to_string()
    } else {
        formatted.red().to_string()
    }
}

/// One line per resolved item
#[must_use]
pub fn item_line(item: &ResolvedItem, quiet: bool) -> String {
    let path = item.local_path.as_deref();
    if quiet {
        return path.map_or_else(|| item.handle.to_string(), |p| p.display().to_string());
    }

    let location = path.map_or_else(|| item.handle.to_string().dimmed().to_string(), colorize_path);
    let mut line = format!(
        "  {} {} ({})",
        item.display_name.bold(),
        location,
        format_size(item.size_bytes)
    );
    if let Some(modified) = item.last_modified {
        line.push_str(&format!(" modified {}", modified.format("%Y-%m-%d %H:%M")));
    }
    if let Some(bytes) = &item.bytes {
        line.push_str(&format!(" [{} in memory]", format_size(bytes.len() as u64)));
    }
    line
}

/// Lines describing an outcome
#[must_use]
pub fn outcome_lines(outcome: &SelectionOutcome, quiet: bool) -> Vec<String> {
    match outcome {
        SelectionOutcome::Success {
            picked: Picked::Files(items),
        } => {
            let mut lines = Vec::with_capacity(items.len() + 1);
            if !quiet {
                lines.push(format!("Picked {} item(s):", items.len()).green().to_string());
            }
            lines.extend(items.iter().map(|item| item_line(item, quiet)));
            lines
        }
        SelectionOutcome::Success {
            picked: Picked::Directory(path),
        } => {
            if quiet {
                vec![path.display().to_string()]
            } else {
                vec![format!("Picked directory: {}", colorize_path(path))]
            }
        }
        SelectionOutcome::Cancelled => {
            if quiet {
                Vec::new()
            } else {
                vec!["Selection cancelled".yellow().to_string()]
            }
        }
        SelectionOutcome::Failure { failure } => {
            vec![format!("{} {}", "Selection failed:".red(), failure)]
        }
    }
}

/// The outcome as pretty-printed JSON
///
/// # Errors
///
/// Returns `serde_json::Error` if serialization fails.
pub fn outcome_json(outcome: &SelectionOutcome) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(outcome)
}

/// One line describing how a handle resolves
#[must_use]
pub fn resolution_line(handle: &ContentHandle, resolution: &Resolution, quiet: bool) -> String {
    match (resolution, quiet) {
        (Resolution::Path(path), true) => path.display().to_string(),
        (Resolution::Path(path), false) => format!("{handle} -> {}", colorize_path(path)),
        (Resolution::DisplayId(id), true) => id.clone(),
        (Resolution::DisplayId(id), false) => {
            format!("{handle} -> {} (display id, content will be copied)", id.cyan())
        }
        (Resolution::Unresolvable, true) => String::new(),
        (Resolution::Unresolvable, false) => {
            format!("{handle} -> {}", "no direct path, content will be copied".yellow())
        }
    }
}
