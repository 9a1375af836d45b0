//! Trait registration: turns catalog entries into features, budget
//! contributions, prerequisite facts and compiled notes.
//!
//! Each entry is checked in full before anything is registered, so a bad
//! entry leaves no partial edges behind. Bad entries are logged, reported
//! and skipped.

use sf_core::{
    BinaryOp, ContentCatalog, Expr, Formula, Operator, RuleEdge, RuleGraph, TraitEntry, Value,
};
use sf_dsl::notes::{attribute_key, note_key};
use sf_dsl::{
    DslError, TargetNames, compile_feature, define_rule, parse_prerequisite, parse_rule_formula,
    prerequisite_rules,
};

use crate::error::{MechError, MechResult};
use crate::validate::ContentIssue;

/// Catalog tables the ruleset understands, in registration order.
pub const KNOWN_TABLES: [&str; 11] = [
    "attributes",
    "skills",
    "features",
    "races",
    "edges",
    "hindrances",
    "powers",
    "weapons",
    "armors",
    "concepts",
    "eras",
];

/// Fields that must hold a number when present.
const NUMERIC_FIELDS: [&str; 3] = ["Advances", "Armor", "MinStr"];

/// Suffix of the fact names a table's requirements produce, e.g.
/// `validationNotes.quickEdge`.
fn fact_suffix(table: &str) -> &'static str {
    match table {
        "edges" => "Edge",
        "hindrances" => "Hindrance",
        "races" => "Race",
        "powers" => "Power",
        "weapons" => "Weapon",
        "armors" => "Armor",
        "skills" => "Skill",
        _ => "Feature",
    }
}

/// Selection key that turns an entry on.
pub fn selection_key(table: &str, name: &str) -> String {
    match table {
        "races" | "features" => format!("features.{name}"),
        other => format!("{other}.{name}"),
    }
}

/// Check an entry without registering anything.
pub fn check_entry(table: &str, name: &str, entry: &TraitEntry) -> MechResult<()> {
    let invalid = |message: &str| MechError::InvalidEntry {
        table: table.to_string(),
        name: name.to_string(),
        message: message.to_string(),
    };
    for field in NUMERIC_FIELDS {
        entry.number(field)?;
    }
    let (sections, notes) = (entry.values("Section"), entry.values("Note"));
    if sections.len() != notes.len() {
        return Err(DslError::MismatchedNotes {
            name: name.to_string(),
            sections: sections.len(),
            notes: notes.len(),
        }
        .into());
    }
    for field in ["Require", "Imply"] {
        let tests = entry.values(field);
        if !tests.is_empty() {
            parse_prerequisite(tests)?;
        }
    }
    if let Some(value) = entry.value("NoteValue") {
        if sections.is_empty() {
            return Err(invalid("NoteValue without a Section"));
        }
        parse_rule_formula(Some(value))?;
    }
    if table == "hindrances"
        && entry
            .value("Severity")
            .is_some_and(|s| !matches!(s, "Major" | "Minor"))
    {
        return Err(invalid("Severity must be Major or Minor"));
    }
    Ok(())
}

/// Register every entry of the known trait tables.
///
/// Returns an issue for each entry that was skipped.
pub fn register_traits(
    graph: &mut RuleGraph,
    names: &TargetNames,
    catalog: &ContentCatalog,
) -> Vec<ContentIssue> {
    let mut issues = Vec::new();
    for table in KNOWN_TABLES {
        let Some(entries) = catalog.table(table) else {
            continue;
        };
        for (name, entry) in entries {
            if let Err(e) = register_entry(graph, names, table, name, entry) {
                tracing::warn!(table, name = %name, error = %e, "skipping content entry");
                issues.push(ContentIssue::from_error(table, name, &e));
            }
        }
    }
    issues
}

/// Register one entry. Fails before touching `graph` if the entry is bad.
pub fn register_entry(
    graph: &mut RuleGraph,
    names: &TargetNames,
    table: &str,
    name: &str,
    entry: &TraitEntry,
) -> MechResult<()> {
    check_entry(table, name, entry)?;
    let key = attribute_key(name);
    let feature = format!("features.{name}");
    let selected = selection_key(table, name);

    match table {
        "edges" => {
            define_rule(graph, &feature, &selected, "=", None)?;
            define_rule(graph, "edgesAllocated", &selected, "+=", None)?;
        }
        "hindrances" => {
            define_rule(graph, &feature, &selected, "=", None)?;
            let points = if entry.value("Severity") == Some("Major") { "2" } else { "1" };
            define_rule(graph, "hindrancePoints", &selected, "+=", Some(points))?;
        }
        "races" => {
            grant_racial_feature(graph, name, name);
            for granted in entry.values("Features") {
                grant_racial_feature(graph, granted, name);
            }
        }
        "powers" => {
            define_rule(graph, "powersAllocated", &selected, "+=", None)?;
            if let Some(rank) = entry.number("Advances")?.filter(|n| *n > 0.0) {
                let test = format!("advances >= {}", Value::from(rank));
                prerequisite_rules(graph, "validation", &format!("{key}Power"), &selected, &[test])?;
            }
        }
        "armors" => {
            if let Some(armor) = entry.number("Armor")? {
                graph.define_rule(RuleEdge::new(
                    "armor",
                    &selected,
                    Operator::Max,
                    Formula::Literal(Value::Number(armor)),
                ));
            }
        }
        _ => {}
    }

    if matches!(table, "weapons" | "armors") {
        if let Some(strength) = entry.number("MinStr")? {
            let test = format!("strength >= {}", Value::from(strength));
            let fact = format!("{key}{}", fact_suffix(table));
            prerequisite_rules(graph, "sanity", &fact, &selected, &[test])?;
        }
    }

    for (field, section) in [("Require", "validation"), ("Imply", "sanity")] {
        let tests = entry.values(field);
        if !tests.is_empty() {
            let fact = format!("{key}{}", fact_suffix(table));
            prerequisite_rules(graph, section, &fact, &selected, tests)?;
        }
    }

    let (sections, notes) = (entry.values("Section"), entry.values("Note"));
    if !sections.is_empty() {
        compile_feature(graph, names, name, sections, notes)?;
        if let Some(value) = entry.value("NoteValue") {
            define_rule(graph, &note_key(&sections[0], name), &feature, "=", Some(value))?;
        }
    }
    Ok(())
}

/// `features.<feature> ^= (race == "<race>")`.
fn grant_racial_feature(graph: &mut RuleGraph, feature: &str, race: &str) {
    let is_race = Expr::binary(
        BinaryOp::Eq,
        Expr::Ident("source".to_string()),
        Expr::Literal(Value::Text(race.to_string())),
    );
    graph.define_rule(RuleEdge::new(
        format!("features.{feature}"),
        "race",
        Operator::Max,
        Formula::Expr(is_race),
    ));
}
