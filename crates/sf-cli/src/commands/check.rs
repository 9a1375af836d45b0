use std::path::Path;

use sf_mechanics::validate_catalog;

pub fn run(catalog: Option<&Path>) -> Result<(), String> {
    let rules = super::load_ruleset(catalog)?;
    let issues = validate_catalog(rules.catalog());

    for issue in &issues {
        println!("  {}", super::paint_issue(issue));
    }

    let errors = issues.iter().filter(|i| i.is_error).count();
    let warnings = issues.len() - errors;
    if errors > 0 {
        return Err(format!("{errors} error(s), {warnings} warning(s)"));
    }

    println!("  All checks passed.");
    println!(
        "  {} tables, {} rules, {} warning(s)",
        rules.catalog().table_names().count(),
        rules.graph().len(),
        warnings
    );
    Ok(())
}
