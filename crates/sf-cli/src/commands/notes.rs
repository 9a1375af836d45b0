use std::collections::BTreeSet;
use std::path::Path;

use colored::Colorize;
use sf_core::selection::is_fact_key;
use sf_dsl::notes::note_key;
use sf_mechanics::rules::traits::{KNOWN_TABLES, selection_key};

pub fn run(catalog: Option<&Path>, name: &str) -> Result<(), String> {
    let rules = super::load_ruleset(catalog)?;
    let tables: Vec<&str> = KNOWN_TABLES
        .into_iter()
        .filter(|table| rules.catalog().contains(table, name))
        .collect();
    if tables.is_empty() {
        return Err(format!("no trait named '{name}'"));
    }

    let mut sources: BTreeSet<String> = tables.iter().map(|t| selection_key(t, name)).collect();
    sources.insert(format!("features.{name}"));
    let note_keys: BTreeSet<String> = tables
        .iter()
        .filter_map(|table| rules.catalog().entry(table, name))
        .flat_map(|entry| entry.values("Section"))
        .map(|section| note_key(section, name))
        .collect();
    sources.extend(note_keys.iter().cloned());

    let graph = rules.graph();
    let facts: BTreeSet<&str> = graph
        .edges()
        .iter()
        .filter(|edge| sources.contains(&edge.source) && is_fact_key(&edge.target))
        .map(|edge| edge.target.as_str())
        .collect();

    println!("  {} {}", name.bold(), format!("({})", tables.join(", ")).dimmed());

    for fact in &facts {
        match graph.requirement(fact) {
            Some(requirement) => println!("    {fact}: {requirement}"),
            None => println!("    {fact}"),
        }
    }

    let notes: Vec<(&String, &str)> = note_keys
        .iter()
        .filter_map(|key| graph.note(key).map(|text| (key, text)))
        .collect();
    if !notes.is_empty() {
        println!();
        println!("  {}", "Notes".bold());
        for (key, text) in notes {
            println!("    {key}: \"{text}\"");
        }
    }

    let edges: Vec<String> = graph
        .edges()
        .iter()
        .filter(|edge| sources.contains(&edge.source) || facts.contains(edge.target.as_str()))
        .map(ToString::to_string)
        .collect();
    println!();
    println!("  {}", "Rules".bold());
    if edges.is_empty() {
        println!("    {}", "none".dimmed());
    }
    for edge in &edges {
        println!("    {edge}");
    }
    println!();
    println!("  {} rule(s)", edges.len());
    Ok(())
}
