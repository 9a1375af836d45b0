//! Rulesets: a content catalog compiled into a rule graph.
//!
//! A [`Ruleset`] is built once from a [`ContentCatalog`]: the shared
//! attribute, skill and budget rules from [`base`] are registered first,
//! then every catalog entry through [`traits`]. The result is read-only
//! and can be shared across any number of characters.

pub mod base;
pub mod traits;

use std::collections::BTreeSet;

use sf_core::{ContentCatalog, GraphEvaluator, RuleGraph, Selection, Snapshot};
use sf_dsl::{TargetNames, render_note};

use crate::config::{GeneratorConfig, RepairConfig};
use crate::error::MechResult;
use crate::validate::ContentIssue;

/// The sample catalog shipped with the crate.
pub const SAMPLE_CATALOG: &str = include_str!("../../data/sample.json");

/// A compiled ruleset.
#[derive(Debug)]
pub struct Ruleset {
    catalog: ContentCatalog,
    graph: RuleGraph,
    names: TargetNames,
    issues: Vec<ContentIssue>,
    repair: RepairConfig,
    generator: GeneratorConfig,
    power_point_edges: Vec<String>,
}

impl Ruleset {
    /// Compile a catalog.
    ///
    /// Bad entries are skipped and kept in [`Ruleset::issues`]; only a
    /// failure in the shared rules is an error.
    pub fn new(catalog: ContentCatalog) -> MechResult<Self> {
        let mut graph = RuleGraph::new();
        base::register_base(&mut graph, &catalog)?;
        let names = base::target_names(&catalog);
        let issues = traits::register_traits(&mut graph, &names, &catalog);
        let power_point_edges = power_point_edges(&graph, &catalog);
        tracing::debug!(
            edges = graph.len(),
            skipped = issues.len(),
            power_point_edges = power_point_edges.len(),
            "ruleset compiled"
        );
        Ok(Self {
            catalog,
            graph,
            names,
            issues,
            repair: RepairConfig::default(),
            generator: GeneratorConfig::default(),
            power_point_edges,
        })
    }

    /// Load a catalog from JSON and compile it.
    pub fn from_json(json: &str) -> MechResult<Self> {
        Self::new(ContentCatalog::from_json(json)?)
    }

    /// The ruleset built from [`SAMPLE_CATALOG`].
    pub fn sample() -> MechResult<Self> {
        Self::from_json(SAMPLE_CATALOG)
    }

    /// Replace the repair configuration.
    pub fn with_repair_config(mut self, config: RepairConfig) -> Self {
        self.repair = config;
        self
    }

    /// Replace the generator configuration.
    pub fn with_generator_config(mut self, config: GeneratorConfig) -> Self {
        self.generator = config;
        self
    }

    /// The catalog the ruleset was built from.
    pub fn catalog(&self) -> &ContentCatalog {
        &self.catalog
    }

    /// The compiled graph.
    pub fn graph(&self) -> &RuleGraph {
        &self.graph
    }

    /// Names note phrases resolve against.
    pub fn names(&self) -> &TargetNames {
        &self.names
    }

    /// Entries skipped while compiling.
    pub fn issues(&self) -> &[ContentIssue] {
        &self.issues
    }

    /// Repair configuration.
    pub fn repair_config(&self) -> &RepairConfig {
        &self.repair
    }

    /// Generator configuration.
    pub fn generator_config(&self) -> &GeneratorConfig {
        &self.generator
    }

    /// Edges whose notes raise `powerPoints`.
    pub fn power_point_edges(&self) -> &[String] {
        &self.power_point_edges
    }

    /// Evaluate a selection.
    pub fn evaluate(&self, selection: &Selection) -> Snapshot {
        self.graph.apply_rules(selection)
    }

    /// Active notes rendered from `snapshot`, as `(note key, text)`.
    pub fn rendered_notes(&self, snapshot: &Snapshot) -> Vec<(String, String)> {
        self.graph
            .notes()
            .filter_map(|(key, text)| render_note(text, key, snapshot).map(|t| (key.to_string(), t)))
            .collect()
    }
}

impl GraphEvaluator for Ruleset {
    fn apply_rules(&self, selection: &Selection) -> Snapshot {
        self.evaluate(selection)
    }
}

/// Catalog edges that feed `powerPoints`, directly or through their note.
fn power_point_edges(graph: &RuleGraph, catalog: &ContentCatalog) -> Vec<String> {
    let mut found = BTreeSet::new();
    for edge in graph.edges_for("powerPoints") {
        match edge.source.strip_prefix("features.") {
            Some(name) => {
                found.insert(name);
            }
            None => {
                found.extend(
                    graph
                        .edges_for(&edge.source)
                        .filter_map(|up| up.source.strip_prefix("features.")),
                );
            }
        }
    }
    found
        .into_iter()
        .filter(|name| catalog.contains("edges", name))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::validate_catalog;

    #[test]
    fn sample_compiles_cleanly() {
        let rules = Ruleset::sample().unwrap();
        assert!(rules.issues().is_empty(), "{:?}", rules.issues());
        assert!(validate_catalog(rules.catalog()).is_empty());
        assert!(rules.graph().len() > 100);
        assert_eq!(rules.power_point_edges(), ["Arcane Background", "Power Points"]);
    }

    #[test]
    fn empty_sample_character_only_misses_budgets() {
        let rules = Ruleset::sample().unwrap();
        let snap = rules.evaluate(&Selection::new());
        assert_eq!(
            snap.violations(),
            [
                "validationNotes.attributeAllocation",
                "validationNotes.skillAllocation",
            ]
        );
    }

    #[test]
    fn arcane_background_grants_power_points() {
        let rules = Ruleset::sample().unwrap();
        let sel: Selection = [
            ("edges.Arcane Background", 1),
            ("edges.Power Points", 1),
            ("smartsAllocation", 2),
            ("skillAllocation.Spellcasting", 3),
        ]
        .into_iter()
        .collect();
        let snap = rules.evaluate(&sel);
        assert_eq!(snap.number("powerPoints"), 15.0);
        assert_eq!(snap.number("powerCount"), 3.0);
        let notes = rules.rendered_notes(&snap);
        assert!(notes.iter().any(|(_, t)| t == "3 Powers/10 Power Points"), "{notes:?}");
    }

    #[test]
    fn alertness_adds_to_the_notice_roll() {
        let rules = Ruleset::sample().unwrap();
        let mut sel: Selection = [("skillAllocation.Notice", 2)].into_iter().collect();
        assert_eq!(rules.evaluate(&sel).get("skillRoll.Notice"), Some(&"d6".into()));

        sel.set("edges.Alertness", 1);
        let snap = rules.evaluate(&sel);
        assert_eq!(snap.number("skills.Notice"), 6.0);
        assert_eq!(snap.number("skillModifier.Notice"), 2.0);
        assert_eq!(snap.get("skillRoll.Notice"), Some(&"d6+2".into()));
    }

    #[test]
    fn race_changes_stats() {
        let rules = Ruleset::sample().unwrap();
        let sel: Selection = [("race", "Dwarf")].into_iter().collect();
        let snap = rules.evaluate(&sel);
        assert_eq!(snap.number("vigor"), 6.0);
        assert_eq!(snap.number("pace"), 5.0);
        assert_eq!(snap.number("toughness"), 5.0);
    }
}
