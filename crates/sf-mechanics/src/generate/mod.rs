//! Randomized character generation.
//!
//! Direct categories (era, race, gender, name, concept) are assigned
//! without validation. Every other category runs a generate, validate and
//! roll back loop: pick an item, apply it to a trial copy, re-evaluate, and
//! keep it only if it overspends nothing and raises no new fact. Allocation
//! shortfalls in other categories do not block a pick; later categories
//! fill them.

mod names;

pub use names::random_name;

use std::collections::BTreeSet;

use rand::Rng;
use rand::rngs::StdRng;
use sf_core::{Selection, Snapshot, Value};

use crate::allocation::{
    AllocationFact, MAX_STEP, allocation_fact, attribute_allocation_key, attribute_step_key,
    budget_for, skill_allocation_key, skill_step_key,
};
use crate::category::Category;
use crate::rules::Ruleset;

pub(crate) const GENDERS: [&str; 2] = ["Female", "Male"];

/// One candidate change.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Pick {
    /// Turn on a toggle key such as `edges.Quick`.
    Toggle { key: String, name: String },
    /// Raise an allocation key by one step.
    Increment { key: String, name: String },
}

impl Pick {
    fn key(&self) -> &str {
        match self {
            Pick::Toggle { key, .. } | Pick::Increment { key, .. } => key,
        }
    }

    fn name(&self) -> &str {
        match self {
            Pick::Toggle { name, .. } | Pick::Increment { name, .. } => name,
        }
    }

    fn apply(&self, selection: &mut Selection) {
        match self {
            Pick::Toggle { key, .. } => {
                selection.set(key.clone(), 1);
            }
            Pick::Increment { key, .. } => {
                let next = selection.number(key) + 1.0;
                selection.set(key.clone(), next);
            }
        }
    }
}

/// How many picks a category call may make.
#[derive(Debug, Clone, Copy)]
enum Budget {
    /// Until the allocation fact's budget is spent.
    Points(&'static AllocationFact),
    /// A fixed number of picks.
    Count(usize),
}

/// State of one category fill.
struct Filler<'r> {
    rules: &'r Ruleset,
    category: Category,
    budget: Budget,
    frozen: &'r BTreeSet<String>,
    rejected: BTreeSet<String>,
    attempts: u32,
    picked: usize,
}

impl Filler<'_> {
    fn remaining(&self, snapshot: &Snapshot) -> f64 {
        match self.budget {
            Budget::Points(fact) => snapshot.number(fact.budget) - snapshot.number(fact.spent),
            Budget::Count(n) => n.saturating_sub(self.picked) as f64,
        }
    }

    /// Pick until the budget is spent, `limit` picks were kept, candidates
    /// run out, or the attempt cap is reached.
    fn run(
        &mut self,
        selection: &mut Selection,
        pool: Option<&BTreeSet<String>>,
        limit: usize,
        rng: &mut StdRng,
    ) {
        let start = self.picked;
        let max_attempts = self.rules.generator_config().max_attempts;
        while self.picked - start < limit && self.attempts < max_attempts {
            let before = self.rules.evaluate(selection);
            if self.remaining(&before) <= 0.0 {
                break;
            }
            let candidates = self.candidates(selection, &before, pool);
            let Some(pick) = self.choose(selection, candidates, rng) else {
                tracing::debug!(category = %self.category, "no candidates left");
                break;
            };
            self.attempts += 1;

            let mut trial = selection.clone();
            pick.apply(&mut trial);
            let after = self.rules.evaluate(&trial);
            if self.acceptable(&before, &after) {
                tracing::debug!(category = %self.category, pick = pick.key(), "pick kept");
                *selection = trial;
                self.picked += 1;
            } else {
                tracing::debug!(category = %self.category, pick = pick.key(), "pick rolled back");
                self.rejected.insert(pick.key().to_string());
            }
        }
    }

    fn acceptable(&self, before: &Snapshot, after: &Snapshot) -> bool {
        let overspent = matches!(
            self.budget,
            Budget::Points(fact) if after.number(fact.spent) > after.number(fact.budget)
        );
        if overspent {
            return false;
        }
        let old: BTreeSet<&str> = before.violations().into_iter().collect();
        !after
            .violations()
            .into_iter()
            .filter(|v| !old.contains(v))
            .any(|v| blocks_pick(v, after))
    }

    fn candidates(
        &self,
        selection: &Selection,
        snapshot: &Snapshot,
        pool: Option<&BTreeSet<String>>,
    ) -> Vec<Pick> {
        let Some(table) = self.category.table() else {
            return Vec::new();
        };
        self.rules
            .catalog()
            .names(table)
            .into_iter()
            .filter(|name| pool.is_none_or(|p| p.contains(*name)))
            .filter_map(|name| self.candidate(name, selection, snapshot))
            .filter(|pick| !self.frozen.contains(pick.key()) && !self.rejected.contains(pick.key()))
            .collect()
    }

    fn candidate(&self, name: &str, selection: &Selection, snapshot: &Snapshot) -> Option<Pick> {
        let increment = |step_key: String, key: String| {
            (snapshot.number(&step_key) < MAX_STEP).then(|| Pick::Increment {
                key,
                name: name.to_string(),
            })
        };
        match self.category {
            Category::Attributes => increment(attribute_step_key(name), attribute_allocation_key(name)),
            Category::Skills => increment(skill_step_key(name), skill_allocation_key(name)),
            category => {
                let key = format!("{}{name}", category.toggle_prefix()?);
                if selection.get(&key).is_some_and(Value::is_truthy) {
                    return None;
                }
                if category == Category::Weapons && !self.fits_era(name, selection) {
                    return None;
                }
                Some(Pick::Toggle {
                    key,
                    name: name.to_string(),
                })
            }
        }
    }

    fn fits_era(&self, weapon: &str, selection: &Selection) -> bool {
        let Some(era) = selection.get("era").and_then(Value::as_text) else {
            return true;
        };
        self.rules
            .catalog()
            .entry("weapons", weapon)
            .map(|e| e.values("Era"))
            .is_none_or(|eras| eras.is_empty() || eras.iter().any(|e| e == era))
    }

    /// Names the character's concept prefers in this category.
    fn preferred(&self, selection: &Selection) -> &[String] {
        let field = self.category.concept_field();
        selection
            .get("concept")
            .and_then(Value::as_text)
            .and_then(|c| self.rules.catalog().entry("concepts", c))
            .zip(field)
            .map(|(entry, field)| entry.values(field))
            .unwrap_or_default()
    }

    fn choose(&self, selection: &Selection, candidates: Vec<Pick>, rng: &mut StdRng) -> Option<Pick> {
        if candidates.is_empty() {
            return None;
        }
        let preferred_names = self.preferred(selection);
        let preferred: Vec<&Pick> = candidates
            .iter()
            .filter(|p| preferred_names.iter().any(|n| n == p.name()))
            .collect();
        let affinity = self.rules.generator_config().concept_affinity;
        let pool: Vec<&Pick> = if !preferred.is_empty() && rng.random_bool(affinity) {
            preferred
        } else {
            candidates.iter().collect()
        };
        pool.get(rng.random_range(0..pool.len())).map(|p| (*p).clone())
    }
}

/// Whether a newly raised fact rules a pick out. Allocation shortfalls
/// do not; they are left for their own category.
fn blocks_pick(fact: &str, snapshot: &Snapshot) -> bool {
    allocation_fact(fact).is_none() || snapshot.number(fact) > 0.0
}

impl Ruleset {
    /// Fill one category of `selection` with random choices.
    ///
    /// Never fails: a category whose candidates run out stops with a
    /// partial allocation.
    pub fn randomize_one_attribute(
        &self,
        selection: &mut Selection,
        category: Category,
        rng: &mut StdRng,
    ) {
        let picked = self.fill(selection, category, &BTreeSet::new(), rng);
        tracing::debug!(%category, picked, "category randomized");
    }

    /// A complete random character: every category in generation order,
    /// then a repair run.
    pub fn random_character(&self, rng: &mut StdRng) -> Selection {
        let mut selection = Selection::new();
        for category in Category::ALL {
            self.randomize_one_attribute(&mut selection, category, rng);
        }
        self.make_valid(&mut selection, rng);
        selection
    }

    /// Fill `category` without touching `frozen` keys. Returns the number
    /// of picks kept.
    pub(crate) fn fill(
        &self,
        selection: &mut Selection,
        category: Category,
        frozen: &BTreeSet<String>,
        rng: &mut StdRng,
    ) -> usize {
        if category.is_direct() {
            return usize::from(self.assign_direct(selection, category, frozen, rng));
        }
        let budget = match category {
            Category::Weapons => Budget::Count(rng.random_range(1..=2)),
            Category::Armor => Budget::Count(1),
            other => match budget_for(other) {
                Some(fact) => Budget::Points(fact),
                None => return 0,
            },
        };
        let mut filler = Filler {
            rules: self,
            category,
            budget,
            frozen,
            rejected: BTreeSet::new(),
            attempts: 0,
            picked: 0,
        };

        if category == Category::Edges {
            let snapshot = self.evaluate(selection);
            if snapshot.number("powerPoints") > 0.0 {
                let fraction = self.generator_config().capacity_fraction;
                let diverted = (filler.remaining(&snapshot) * fraction).floor().max(0.0) as usize;
                let pool: BTreeSet<String> = self.power_point_edges().iter().cloned().collect();
                tracing::debug!(diverted, "spellcaster edge picks diverted to power points");
                filler.run(selection, Some(&pool), diverted, rng);
            }
        }
        filler.run(selection, None, usize::MAX, rng);
        filler.picked
    }

    fn assign_direct(
        &self,
        selection: &mut Selection,
        category: Category,
        frozen: &BTreeSet<String>,
        rng: &mut StdRng,
    ) -> bool {
        let key = category.as_str();
        if frozen.contains(key) {
            return false;
        }
        let value = match category {
            Category::Gender => GENDERS[rng.random_range(0..GENDERS.len())].to_string(),
            Category::Name => random_name(rng),
            other => {
                let names = other
                    .table()
                    .map(|t| self.catalog().names(t))
                    .unwrap_or_default();
                if names.is_empty() {
                    return false;
                }
                names[rng.random_range(0..names.len())].to_string()
            }
        };
        tracing::debug!(key, %value, "assigned");
        selection.set(key, value);
        true
    }
}
