use std::path::Path;

use colored::Colorize;
use comfy_table::{ContentArrangement, Table};
use sf_core::Snapshot;
use sf_mechanics::allocation::{
    ALLOCATION_FACTS, attribute_key, attribute_roll_key, skill_key, skill_roll_key,
};

const DERIVED: [&str; 7] = [
    "pace",
    "parry",
    "toughness",
    "armor",
    "bennies",
    "powerPoints",
    "powerCount",
];

const SELECTED: [(&str, &str); 5] = [
    ("Edges", "edges."),
    ("Hindrances", "hindrances."),
    ("Powers", "powers."),
    ("Weapons", "weapons."),
    ("Armor", "armors."),
];

pub fn run(catalog: Option<&Path>, file: &Path) -> Result<(), String> {
    let rules = super::load_ruleset(catalog)?;
    let selection = super::load_selection(file)?;
    let snapshot = rules.evaluate(&selection);

    let name = selection
        .get("name")
        .map_or_else(|| file.display().to_string(), ToString::to_string);
    println!("  {}", name.bold());
    let details: Vec<String> = ["race", "gender", "concept", "era"]
        .iter()
        .filter_map(|key| selection.get(key).map(|v| format!("{key}: {v}")))
        .collect();
    if !details.is_empty() {
        println!("  {}", details.join(", ").dimmed());
    }
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Trait", "Value"]);
    for attr in rules.catalog().names("attributes") {
        let text = roll(&snapshot, &attribute_roll_key(attr), &attribute_key(attr));
        table.add_row(vec![attr.to_string(), text]);
    }
    for skill in rules.catalog().names("skills") {
        if snapshot.get(&skill_key(skill)).is_some() {
            let text = roll(&snapshot, &skill_roll_key(skill), &skill_key(skill));
            table.add_row(vec![skill.to_string(), text]);
        }
    }
    for stat in DERIVED {
        if let Some(value) = snapshot.get(stat) {
            table.add_row(vec![stat.to_string(), value.to_string()]);
        }
    }
    println!("{table}");

    let mut budgets = Table::new();
    budgets.set_content_arrangement(ContentArrangement::Dynamic);
    budgets.set_header(vec!["Budget", "Spent", "Available"]);
    for fact in &ALLOCATION_FACTS {
        budgets.add_row(vec![
            fact.budget.to_string(),
            snapshot.number(fact.spent).to_string(),
            snapshot.number(fact.budget).to_string(),
        ]);
    }
    println!("{budgets}");

    for (label, prefix) in SELECTED {
        let picked: Vec<&str> = selection
            .keys_with_prefix(prefix)
            .filter(|key| selection.get(key).is_some_and(|v| v.is_truthy()))
            .filter_map(|key| key.strip_prefix(prefix))
            .collect();
        if !picked.is_empty() {
            println!("  {}: {}", label.bold(), picked.join(", "));
        }
    }

    let notes = rules.rendered_notes(&snapshot);
    if !notes.is_empty() {
        println!();
        println!("  {}", "Notes".bold());
        for (key, text) in &notes {
            println!("    {text} {}", format!("({key})").dimmed());
        }
    }

    let violations = snapshot.violations();
    println!();
    if violations.is_empty() {
        println!("  No unmet prerequisites.");
    } else {
        println!(
            "  {} unmet prerequisite(s); run `statforge validate` for details",
            violations.len()
        );
    }
    Ok(())
}

/// The roll text with its modifier, or the bare die when there is none.
fn roll(snapshot: &Snapshot, roll_key: &str, die_key: &str) -> String {
    snapshot
        .get(roll_key)
        .map_or_else(|| format!("d{}", snapshot.number(die_key)), ToString::to_string)
}
