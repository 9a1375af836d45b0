pub mod check;
pub mod notes;
pub mod random;
pub mod repair;
pub mod show;
pub mod validate;

use std::fs;
use std::path::Path;

use colored::{ColoredString, Colorize};
use sf_core::Selection;
use sf_mechanics::{ContentIssue, Ruleset};

/// Compile the catalog at `path`, or the bundled sample when none is given.
fn load_ruleset(path: Option<&Path>) -> Result<Ruleset, String> {
    match path {
        Some(path) => {
            let json = fs::read_to_string(path)
                .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
            Ruleset::from_json(&json).map_err(|e| format!("{}: {e}", path.display()))
        }
        None => Ruleset::sample().map_err(|e| e.to_string()),
    }
}

/// Read a character selection from a JSON object of key/value pairs.
fn load_selection(path: &Path) -> Result<Selection, String> {
    let json =
        fs::read_to_string(path).map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    serde_json::from_str(&json).map_err(|e| format!("{}: {e}", path.display()))
}

/// Print a selection as JSON, or write it to `output`.
fn write_selection(selection: &Selection, output: Option<&Path>) -> Result<(), String> {
    let json = serde_json::to_string_pretty(selection).map_err(|e| e.to_string())?;
    match output {
        Some(path) => {
            fs::write(path, format!("{json}\n"))
                .map_err(|e| format!("cannot write {}: {e}", path.display()))?;
            println!("  Wrote {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn paint_issue(issue: &ContentIssue) -> ColoredString {
    let text = issue.to_string();
    if issue.is_error {
        text.red()
    } else {
        text.yellow()
    }
}

/// Short name of a fact key: `validationNotes.brawnyEdge` -> `brawnyEdge`.
fn fact_name(key: &str) -> &str {
    key.split_once('.').map_or(key, |(_, rest)| rest)
}
