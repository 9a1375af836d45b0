//! Attribute, skill, budget and derived-statistic rules.

use sf_core::{ContentCatalog, RuleGraph};
use sf_dsl::{TargetNames, define_rule};

use crate::allocation::{
    ALLOCATION_FACTS, DIE_FORMULA, attribute_allocation_key, attribute_key,
    attribute_modifier_key, attribute_roll_key, attribute_step_key, roll_formula,
    skill_allocation_key, skill_key, skill_modifier_key, skill_roll_key, skill_step_key,
};
use crate::error::MechResult;

/// Derived statistics that note deltas may target by name.
pub const STATS: [&str; 13] = [
    "advances",
    "armor",
    "attributePoints",
    "edgePoints",
    "hindranceCap",
    "pace",
    "parry",
    "powerCount",
    "powerPoints",
    "size",
    "skillPoints",
    "toughness",
    "bennies",
];

/// Constant base values: `(key, value)`.
const BASES: [(&str, &str); 9] = [
    ("attributePoints", "5"),
    ("skillPoints", "12"),
    ("hindranceCap", "4"),
    ("edgePoints", "0"),
    ("pace", "6"),
    ("parry", "2"),
    ("toughness", "2"),
    ("bennies", "3"),
    ("size", "0"),
];

/// Target names for the note compiler, from the catalog's attribute and
/// skill tables plus [`STATS`].
pub fn target_names(catalog: &ContentCatalog) -> TargetNames {
    let names = catalog
        .names("attributes")
        .into_iter()
        .fold(TargetNames::new(), TargetNames::with_attribute);
    let names = catalog
        .names("skills")
        .into_iter()
        .fold(names, TargetNames::with_skill);
    STATS.into_iter().fold(names, TargetNames::with_stat)
}

/// Register the rules every character shares.
///
/// Skills whose linked attribute is missing are left for trait
/// registration to report; here they only get their die.
pub fn register_base(graph: &mut RuleGraph, catalog: &ContentCatalog) -> MechResult<()> {
    for (key, value) in BASES {
        define_rule(graph, key, "", "=", Some(value))?;
    }

    for name in catalog.names("attributes") {
        let (attr, step, alloc) = (
            attribute_key(name),
            attribute_step_key(name),
            attribute_allocation_key(name),
        );
        define_rule(graph, &step, "", "=", Some("1"))?;
        define_rule(graph, &step, &alloc, "+=", None)?;
        define_rule(graph, &attr, &step, "=", Some(DIE_FORMULA))?;
        define_rule(graph, "attributePointsAllocated", &alloc, "+=", None)?;
        let roll = roll_formula(&attribute_modifier_key(name));
        define_rule(graph, &attribute_roll_key(name), &attr, "=", Some(&roll))?;
    }

    for name in catalog.names("skills") {
        let (skill, step, alloc) = (skill_key(name), skill_step_key(name), skill_allocation_key(name));
        define_rule(graph, &step, &alloc, "+=", None)?;
        define_rule(graph, &skill, &step, "=", Some(DIE_FORMULA))?;
        define_rule(graph, "skillPointsAllocated", &alloc, "+=", None)?;
        let roll = roll_formula(&skill_modifier_key(name));
        define_rule(graph, &skill_roll_key(name), &skill, "=", Some(&roll))?;
        let linked = catalog
            .entry("skills", name)
            .and_then(|e| e.value("Attribute"))
            .filter(|a| catalog.contains("attributes", a));
        if let Some(linked) = linked {
            let extra = format!("Math.max(source - {}, 0)", attribute_step_key(linked));
            define_rule(graph, "skillPointsAllocated", &step, "+=", Some(&extra))?;
        }
    }

    define_rule(graph, "parry", "skills.Fighting", "+=", Some("Math.floor(source / 2)"))?;
    define_rule(graph, "toughness", "vigor", "+=", Some("Math.floor(source / 2)"))?;
    define_rule(graph, "toughness", "size", "+=", None)?;
    define_rule(graph, "toughness", "armor", "+=", None)?;
    define_rule(graph, "edgePoints", "advances", "+=", None)?;
    define_rule(
        graph,
        "edgePoints",
        "hindrancePoints",
        "+=",
        Some("Math.floor(Math.min(source, hindranceCap) / 2)"),
    )?;

    for fact in &ALLOCATION_FACTS {
        define_rule(graph, fact.fact, "", "=", Some(&fact.formula()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sf_core::{GraphEvaluator, Selection};

    fn catalog() -> ContentCatalog {
        let mut c = ContentCatalog::new();
        for a in ["Agility", "Smarts", "Spirit", "Strength", "Vigor"] {
            c.insert_text("attributes", a, "").unwrap();
        }
        c.insert_text("skills", "Fighting", "Attribute=Agility").unwrap();
        c.insert_text("skills", "Notice", "Attribute=Smarts").unwrap();
        c
    }

    fn graph() -> RuleGraph {
        let mut g = RuleGraph::new();
        register_base(&mut g, &catalog()).unwrap();
        g
    }

    #[test]
    fn empty_character_baseline() {
        let snap = graph().apply_rules(&Selection::new());
        assert_eq!(snap.number("agility"), 4.0);
        assert_eq!(snap.number("vigor"), 4.0);
        assert_eq!(snap.number("toughness"), 4.0);
        assert_eq!(snap.number("parry"), 2.0);
        assert_eq!(snap.number("pace"), 6.0);
        assert!(snap.get("skills.Fighting").is_none());
        assert_eq!(snap.number("validationNotes.attributeAllocation"), -5.0);
        assert_eq!(snap.number("validationNotes.skillAllocation"), -12.0);
        assert_eq!(snap.number("validationNotes.edgeAllocation"), 0.0);
        assert_eq!(snap.number("validationNotes.powerAllocation"), 0.0);
    }

    #[test]
    fn allocations_become_dice_and_spend_points() {
        let sel: Selection = [
            ("agilityAllocation", 2),
            ("vigorAllocation", 3),
            ("skillAllocation.Fighting", 4),
        ]
        .into_iter()
        .collect();
        let snap = graph().apply_rules(&sel);
        assert_eq!(snap.number("agilityStep"), 3.0);
        assert_eq!(snap.number("agility"), 8.0);
        assert_eq!(snap.number("vigor"), 10.0);
        assert_eq!(snap.number("toughness"), 7.0);
        assert_eq!(snap.number("skills.Fighting"), 10.0);
        assert_eq!(snap.number("parry"), 7.0);
        assert_eq!(snap.number("attributePointsAllocated"), 5.0);
        assert_eq!(snap.get("validationNotes.attributeAllocation"), Some(&0.into()));
        // Fighting step 4 is one above Agility step 3.
        assert_eq!(snap.number("skillPointsAllocated"), 5.0);
    }

    #[test]
    fn modifiers_show_up_in_rolls() {
        let mut g = graph();
        define_rule(&mut g, "skillModifier.Notice", "edges.Alertness", "+=", Some("2")).unwrap();
        define_rule(&mut g, "agilityModifier", "hindrances.Clumsy", "+=", Some("-1")).unwrap();
        let sel: Selection = [("skillAllocation.Notice", 2), ("agilityAllocation", 1)]
            .into_iter()
            .collect();

        let snap = g.apply_rules(&sel);
        assert_eq!(snap.number("skills.Notice"), 6.0);
        assert_eq!(snap.get("skillRoll.Notice"), Some(&"d6".into()));
        assert_eq!(snap.get("agilityRoll"), Some(&"d6".into()));
        assert_eq!(snap.get("vigorRoll"), Some(&"d4".into()));
        assert!(snap.get("skillRoll.Fighting").is_none());

        let mut sel = sel;
        sel.set("edges.Alertness", 1);
        sel.set("hindrances.Clumsy", 1);
        let snap = g.apply_rules(&sel);
        assert_eq!(snap.number("skills.Notice"), 6.0);
        assert_eq!(snap.number("skillModifier.Notice"), 2.0);
        assert_eq!(snap.get("skillRoll.Notice"), Some(&"d6+2".into()));
        assert_eq!(snap.get("agilityRoll"), Some(&"d6-1".into()));
    }

    #[test]
    fn edge_points_from_advances_and_hindrances() {
        let sel: Selection = [("advances", 2), ("hindrancePoints", 6)].into_iter().collect();
        let snap = graph().apply_rules(&sel);
        assert_eq!(snap.number("edgePoints"), 4.0);
        assert_eq!(snap.number("sanityNotes.hindranceAllocation"), 2.0);
    }
}
