use std::path::Path;

use colored::Colorize;
use comfy_table::{ContentArrangement, Table};
use sf_mechanics::allocation::allocation_fact;

pub fn run(catalog: Option<&Path>, file: &Path) -> Result<(), String> {
    let rules = super::load_ruleset(catalog)?;
    let selection = super::load_selection(file)?;
    let snapshot = rules.evaluate(&selection);
    let violations = snapshot.violations();

    if violations.is_empty() {
        println!("  {} is valid.", file.display());
        return Ok(());
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Fact", "Kind", "Value", "Unmet"]);

    let mut errors = 0;
    for fact in &violations {
        let kind = if fact.starts_with("validationNotes.") {
            errors += 1;
            "validation".red().to_string()
        } else {
            "sanity".yellow().to_string()
        };
        let value = snapshot.get(fact).map(ToString::to_string).unwrap_or_default();
        let unmet = match (allocation_fact(fact), rules.graph().requirement(fact)) {
            (Some(budget), _) => format!(
                "{} spent of {}",
                snapshot.number(budget.spent),
                snapshot.number(budget.budget)
            ),
            (None, Some(requirement)) => requirement
                .failing_clauses(&snapshot)
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" and "),
            (None, None) => String::new(),
        };
        table.add_row(vec![super::fact_name(fact).to_string(), kind, value, unmet]);
    }

    println!("{table}");
    println!();
    let warnings = violations.len() - errors;
    println!("  {errors} validation fact(s), {warnings} sanity fact(s)");

    if errors > 0 {
        Err(format!("{} has {errors} unmet validation fact(s)", file.display()))
    } else {
        Ok(())
    }
}
