//! Allocation encoding and budget facts.
//!
//! Attributes and skills are not stored as dice. A selection holds step
//! allocations above the d4 baseline (`agilityAllocation`,
//! `skillAllocation.Fighting`); the graph turns steps into dice with
//! [`DIE_FORMULA`]. Each budget is checked by one allocation fact whose
//! value is the overspend (positive) or shortfall (negative).

use crate::category::Category;

/// Step to die: d4 at step 1 up to d12 at step 5.
pub const DIE_FORMULA: &str = "Math.max(Math.min(2+source*2,12),4)";

/// Highest step an allocation can reach.
pub const MAX_STEP: f64 = 5.0;

/// Die size for a step, as the graph computes it.
pub fn die_for_step(step: f64) -> f64 {
    (2.0 + step * 2.0).clamp(4.0, 12.0)
}

/// Step that produces a die size.
pub fn step_for_die(die: f64) -> f64 {
    ((die - 2.0) / 2.0).max(1.0)
}

/// `Agility` to `agility`.
pub fn attribute_key(name: &str) -> String {
    name.to_lowercase()
}

/// `Agility` to `agilityStep`.
pub fn attribute_step_key(name: &str) -> String {
    format!("{}Step", attribute_key(name))
}

/// `Agility` to `agilityAllocation`.
pub fn attribute_allocation_key(name: &str) -> String {
    format!("{}Allocation", attribute_key(name))
}

/// `Agility` to `agilityModifier`, the roll bonus notes grant.
pub fn attribute_modifier_key(name: &str) -> String {
    format!("{}Modifier", attribute_key(name))
}

/// `Agility` to `agilityRoll`, the die with its modifier as text.
pub fn attribute_roll_key(name: &str) -> String {
    format!("{}Roll", attribute_key(name))
}

/// `Fighting` to `skills.Fighting`.
pub fn skill_key(name: &str) -> String {
    format!("skills.{name}")
}

/// `Fighting` to `skillStep.Fighting`.
pub fn skill_step_key(name: &str) -> String {
    format!("skillStep.{name}")
}

/// `Fighting` to `skillAllocation.Fighting`.
pub fn skill_allocation_key(name: &str) -> String {
    format!("skillAllocation.{name}")
}

/// `Fighting` to `skillModifier.Fighting`.
pub fn skill_modifier_key(name: &str) -> String {
    format!("skillModifier.{name}")
}

/// `Fighting` to `skillRoll.Fighting`.
pub fn skill_roll_key(name: &str) -> String {
    format!("skillRoll.{name}")
}

/// Die to roll text such as `d8+2`, reading the modifier at `modifier`.
/// A zero or missing modifier leaves the bare die.
pub fn roll_formula(modifier: &str) -> String {
    let m = format!("dict[\"{modifier}\"]");
    format!("'d' + source + ({m} > 0 ? '+' + {m} : {m} < 0 ? {m} : '')")
}

/// A budget checked by an allocation fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationFact {
    /// The fact key.
    pub fact: &'static str,
    /// Category whose selections spend the budget.
    pub category: Category,
    /// Key holding the budget.
    pub budget: &'static str,
    /// Key holding the amount spent.
    pub spent: &'static str,
    /// Whether only overspending is reported.
    pub overflow_only: bool,
}

/// Every allocation fact the ruleset defines.
pub const ALLOCATION_FACTS: [AllocationFact; 5] = [
    AllocationFact {
        fact: "validationNotes.attributeAllocation",
        category: Category::Attributes,
        budget: "attributePoints",
        spent: "attributePointsAllocated",
        overflow_only: false,
    },
    AllocationFact {
        fact: "validationNotes.skillAllocation",
        category: Category::Skills,
        budget: "skillPoints",
        spent: "skillPointsAllocated",
        overflow_only: false,
    },
    AllocationFact {
        fact: "validationNotes.edgeAllocation",
        category: Category::Edges,
        budget: "edgePoints",
        spent: "edgesAllocated",
        overflow_only: true,
    },
    AllocationFact {
        fact: "validationNotes.powerAllocation",
        category: Category::Powers,
        budget: "powerCount",
        spent: "powersAllocated",
        overflow_only: false,
    },
    AllocationFact {
        fact: "sanityNotes.hindranceAllocation",
        category: Category::Hindrances,
        budget: "hindranceCap",
        spent: "hindrancePoints",
        overflow_only: true,
    },
];

impl AllocationFact {
    /// Formula computing the fact from the budget and the amount spent.
    pub fn formula(&self) -> String {
        if self.overflow_only {
            format!("Math.max({} - {}, 0)", self.spent, self.budget)
        } else {
            format!("{} - {}", self.spent, self.budget)
        }
    }
}

/// The allocation fact with key `fact`.
pub fn allocation_fact(fact: &str) -> Option<&'static AllocationFact> {
    ALLOCATION_FACTS.iter().find(|a| a.fact == fact)
}

/// The allocation fact that budgets `category`.
pub fn budget_for(category: Category) -> Option<&'static AllocationFact> {
    ALLOCATION_FACTS.iter().find(|a| a.category == category)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dice_and_steps() {
        assert_eq!(die_for_step(1.0), 4.0);
        assert_eq!(die_for_step(3.0), 8.0);
        assert_eq!(die_for_step(9.0), 12.0);
        assert_eq!(step_for_die(8.0), 3.0);
        assert_eq!(step_for_die(4.0), 1.0);
        assert_eq!(step_for_die(2.0), 1.0);
    }

    #[test]
    fn keys() {
        assert_eq!(attribute_allocation_key("Agility"), "agilityAllocation");
        assert_eq!(attribute_step_key("Agility"), "agilityStep");
        assert_eq!(skill_allocation_key("Common Knowledge"), "skillAllocation.Common Knowledge");
        assert_eq!(attribute_modifier_key("Agility"), "agilityModifier");
        assert_eq!(skill_modifier_key("Notice"), "skillModifier.Notice");
    }

    #[test]
    fn fact_lookup() {
        let edges = allocation_fact("validationNotes.edgeAllocation").unwrap();
        assert_eq!(edges.category, Category::Edges);
        assert_eq!(edges.formula(), "Math.max(edgesAllocated - edgePoints, 0)");
        assert_eq!(budget_for(Category::Skills).unwrap().spent, "skillPointsAllocated");
        assert!(allocation_fact("validationNotes.quickEdge").is_none());
        assert!(budget_for(Category::Weapons).is_none());
    }
}
