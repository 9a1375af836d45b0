//! Multi-pass repair of prerequisite violations.
//!
//! Each pass evaluates the selection, walks the non-zero sanity and
//! validation facts, and applies one fix per failing clause. A key changed
//! once is frozen for the rest of the run. The run stops when a pass fixes
//! nothing or the pass cap is reached; whatever cannot be fixed is left in
//! place for the caller to see in the next evaluation.

use std::collections::BTreeSet;

use rand::Rng;
use rand::rngs::StdRng;
use sf_core::prereq::{AttrRef, Comparison, CompareOp, Test};
use sf_core::{Operator, Selection, Snapshot, Value};

use crate::allocation::{
    AllocationFact, MAX_STEP, allocation_fact, attribute_allocation_key, attribute_key,
    attribute_step_key, die_for_step, skill_allocation_key, skill_step_key,
};
use crate::category::Category;
use crate::generate::GENDERS;
use crate::rules::Ruleset;

/// A change to one selection key.
#[derive(Debug, Clone, PartialEq)]
enum Fix {
    Set(String, Value),
    Remove(String),
}

impl Fix {
    fn key(&self) -> &str {
        match self {
            Fix::Set(key, _) | Fix::Remove(key) => key,
        }
    }

    fn apply(self, selection: &mut Selection) {
        match self {
            Fix::Set(key, value) => {
                selection.set(key, value);
            }
            Fix::Remove(key) => {
                selection.remove(&key);
            }
        }
    }
}

impl Ruleset {
    /// Mutate `selection` until no sanity or validation fact is set, no
    /// pass makes progress, or the pass cap is reached.
    ///
    /// Never increases the number of violated facts: if the last pass ends
    /// worse than the best state seen, the best state is restored.
    pub fn make_valid(&self, selection: &mut Selection, rng: &mut StdRng) {
        let mut frozen = BTreeSet::new();
        let mut best = (self.evaluate(selection).violations().len(), selection.clone());
        let max_passes = self.repair_config().max_passes;

        for pass in 1..=max_passes {
            let violations: Vec<String> = self
                .evaluate(selection)
                .violations()
                .into_iter()
                .map(str::to_string)
                .collect();
            if violations.is_empty() {
                break;
            }

            let mut fixed = 0;
            for fact in &violations {
                let snapshot = self.evaluate(selection);
                if !snapshot.get(fact).is_some_and(Value::is_truthy) {
                    continue;
                }
                if self.fix_fact(selection, fact, &snapshot, &mut frozen, rng) {
                    fixed += 1;
                }
            }

            let remaining = self.evaluate(selection).violations().len();
            tracing::debug!(pass, fixed, remaining, "repair pass");
            if remaining < best.0 {
                best = (remaining, selection.clone());
            }
            if fixed == 0 {
                break;
            }
        }

        let remaining = self.evaluate(selection).violations().len();
        if remaining > best.0 {
            tracing::debug!(remaining, best = best.0, "restoring best repair state");
            *selection = best.1;
        }
    }

    fn fix_fact(
        &self,
        selection: &mut Selection,
        fact: &str,
        snapshot: &Snapshot,
        frozen: &mut BTreeSet<String>,
        rng: &mut StdRng,
    ) -> bool {
        if let Some(allocation) = allocation_fact(fact) {
            return self.rebalance(selection, allocation, snapshot, frozen, rng);
        }
        let Some(requirement) = self.graph().requirement(fact) else {
            tracing::debug!(fact, "no requirement registered; cannot fix");
            return false;
        };

        let mut changed = false;
        for clause in requirement.failing_clauses(snapshot) {
            if clause.alternatives.is_empty() {
                continue;
            }
            let alternative = &clause.alternatives[rng.random_range(0..clause.alternatives.len())];
            let fix = self
                .plan_fix(alternative, snapshot, rng)
                .filter(|f| !frozen.contains(f.key()));
            match fix {
                Some(fix) => {
                    tracing::debug!(fact, clause = %clause, key = fix.key(), "applying fix");
                    frozen.insert(fix.key().to_string());
                    fix.apply(selection);
                    changed = true;
                }
                None => tracing::debug!(fact, comparison = %alternative, "no fix for comparison"),
            }
        }
        if !changed {
            changed = self.drop_trait(selection, fact, frozen);
        }
        changed
    }

    /// Remove the selection that switched the fact on.
    fn drop_trait(&self, selection: &mut Selection, fact: &str, frozen: &mut BTreeSet<String>) -> bool {
        let gate = self
            .graph()
            .edges_for(fact)
            .find(|e| e.op == Operator::Gate && !e.source.is_empty())
            .map(|e| e.source.clone());
        let Some(gate) = gate else {
            return false;
        };
        if frozen.contains(&gate) || !selection.contains(&gate) {
            return false;
        }
        tracing::debug!(fact, key = %gate, "dropping trait");
        selection.remove(&gate);
        frozen.insert(gate);
        true
    }

    fn plan_fix(&self, comparison: &Comparison, snapshot: &Snapshot, rng: &mut StdRng) -> Option<Fix> {
        let AttrRef::Key(key) = &comparison.attr else {
            return None;
        };
        let test = &comparison.test;
        let catalog = self.catalog();

        if let Some(name) = key.strip_prefix("features.") {
            let toggle = ["edges", "hindrances"]
                .into_iter()
                .find(|t| catalog.contains(t, name))
                .map(|t| format!("{t}.{name}"))?;
            return Some(toggle_fix(toggle, test));
        }
        for category in [
            Category::Edges,
            Category::Hindrances,
            Category::Powers,
            Category::Weapons,
            Category::Armor,
        ] {
            let Some(prefix) = category.toggle_prefix() else {
                continue;
            };
            if key.starts_with(prefix) {
                return Some(toggle_fix(key.clone(), test));
            }
        }
        if let Some(skill) = key.strip_prefix("skills.") {
            if !catalog.contains("skills", skill) {
                return None;
            }
            return allocation_fix(
                snapshot,
                test,
                &skill_step_key(skill),
                skill_allocation_key(skill),
                MAX_STEP,
            );
        }
        if let Some(attr) = catalog.names("attributes").into_iter().find(|a| attribute_key(a) == *key) {
            return allocation_fix(
                snapshot,
                test,
                &attribute_step_key(attr),
                attribute_allocation_key(attr),
                MAX_STEP - 1.0,
            );
        }
        if let Some(domain) = self.choice_domain(key) {
            let current = snapshot.get(key);
            let accepted: Vec<&str> = domain
                .into_iter()
                .filter(|c| test.accepts(Some(&Value::from(*c))))
                .filter(|c| current.and_then(Value::as_text) != Some(*c))
                .collect();
            if accepted.is_empty() {
                return test.accepts(None).then(|| Fix::Remove(key.clone()));
            }
            let choice = accepted[rng.random_range(0..accepted.len())];
            return Some(Fix::Set(key.clone(), Value::from(choice)));
        }
        if self.graph().has_target(key) {
            return None;
        }
        if test.accepts(None) {
            return Some(Fix::Remove(key.clone()));
        }
        desired_value(test).map(|v| Fix::Set(key.clone(), v))
    }

    /// The values an enumerated choice key can take.
    fn choice_domain(&self, key: &str) -> Option<Vec<&str>> {
        let table = match key {
            "gender" => return Some(GENDERS.to_vec()),
            "race" => "races",
            "concept" => "concepts",
            "era" => "eras",
            _ => return None,
        };
        Some(self.catalog().names(table))
    }

    /// Settle an allocation fact: trim owned picks on overspend, pick more
    /// on a shortfall.
    fn rebalance(
        &self,
        selection: &mut Selection,
        allocation: &AllocationFact,
        snapshot: &Snapshot,
        frozen: &mut BTreeSet<String>,
        rng: &mut StdRng,
    ) -> bool {
        let before = selection.clone();
        if snapshot.number(allocation.fact) > 0.0 {
            let mut overflow = snapshot.number(allocation.fact);
            while overflow > 0.0 {
                let owned = self.owned_keys(selection, allocation.category, frozen);
                if owned.is_empty() {
                    break;
                }
                let key = &owned[rng.random_range(0..owned.len())];
                let next = selection.number(key) - 1.0;
                if next > 0.0 && allocation.category.toggle_prefix().is_none() {
                    selection.set(key.clone(), next);
                } else {
                    selection.remove(key);
                }
                overflow = self.evaluate(selection).number(allocation.fact);
            }
        } else {
            self.fill(selection, allocation.category, frozen, rng);
        }

        let changed: Vec<String> = before
            .iter()
            .filter(|(k, v)| selection.get(k) != Some(*v))
            .map(|(k, _)| k.to_string())
            .chain(
                selection
                    .iter()
                    .filter(|(k, _)| !before.contains(k))
                    .map(|(k, _)| k.to_string()),
            )
            .collect();
        tracing::debug!(fact = allocation.fact, changed = changed.len(), "rebalanced");
        let any = !changed.is_empty();
        frozen.extend(changed);
        any
    }

    /// Keys of `category` the selection currently spends points on.
    fn owned_keys(&self, selection: &Selection, category: Category, frozen: &BTreeSet<String>) -> Vec<String> {
        let keys: Vec<String> = match category {
            Category::Attributes => self
                .catalog()
                .names("attributes")
                .into_iter()
                .map(attribute_allocation_key)
                .collect(),
            Category::Skills => self
                .catalog()
                .names("skills")
                .into_iter()
                .map(skill_allocation_key)
                .collect(),
            other => match other.toggle_prefix() {
                Some(prefix) => selection.keys_with_prefix(prefix).map(str::to_string).collect(),
                None => Vec::new(),
            },
        };
        keys.into_iter()
            .filter(|k| selection.get(k).is_some_and(Value::is_truthy) && !frozen.contains(k))
            .collect()
    }
}

fn toggle_fix(key: String, test: &Test) -> Fix {
    if test.accepts(Some(&Value::from(true))) {
        Fix::Set(key, Value::from(true))
    } else {
        Fix::Remove(key)
    }
}

/// Allocation closest to the current one whose die passes `test`.
fn allocation_fix(
    snapshot: &Snapshot,
    test: &Test,
    step_key: &str,
    allocation_key: String,
    max_allocation: f64,
) -> Option<Fix> {
    let current = snapshot.number(&allocation_key);
    let bonus = snapshot.number(step_key) - current;
    let mut options: Vec<f64> = (0..=max_allocation as u32).map(f64::from).collect();
    options.sort_by(|a, b| (a - current).abs().total_cmp(&(b - current).abs()));
    options.into_iter().find_map(|allocation| {
        let step = allocation + bonus;
        let die = (step > 0.0).then(|| Value::Number(die_for_step(step)));
        test.accepts(die.as_ref()).then(|| {
            if allocation > 0.0 {
                Fix::Set(allocation_key.clone(), Value::Number(allocation))
            } else {
                Fix::Remove(allocation_key.clone())
            }
        })
    })
}

/// The value a raw key needs to pass `test`.
fn desired_value(test: &Test) -> Option<Value> {
    let Test::Compare(op, value) = test else {
        return None;
    };
    match (op, value) {
        (CompareOp::Eq, v) => Some(v.clone()),
        (CompareOp::Ge | CompareOp::Le, Value::Number(n)) => Some(Value::Number(*n)),
        (CompareOp::Gt, Value::Number(n)) => Some(Value::Number(n + 1.0)),
        (CompareOp::Lt, Value::Number(n)) => Some(Value::Number(n - 1.0)),
        _ => None,
    }
}
