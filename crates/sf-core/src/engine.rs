//! Reference host evaluator for a [`RuleGraph`].
//!
//! Targets are evaluated once each in dependency order. A target starts from
//! its raw selection value; gate edges can suppress it entirely, and every
//! other edge whose source is truthy (or empty) folds its formula result in,
//! in registration order.

use std::collections::{BTreeMap, BTreeSet};

use crate::formula::Scope;
use crate::graph::{Operator, RuleGraph};
use crate::selection::{Selection, Snapshot};
use crate::value::Value;

/// Anything that can turn a selection into computed attributes.
///
/// The repair engine and generator only ever call this as an oracle.
pub trait GraphEvaluator {
    /// Evaluate every registered edge against `selection`.
    fn apply_rules(&self, selection: &Selection) -> Snapshot;
}

impl GraphEvaluator for RuleGraph {
    fn apply_rules(&self, selection: &Selection) -> Snapshot {
        let mut snapshot: Snapshot = selection.iter().map(|(k, v)| (k, v.clone())).collect();
        for target in self.evaluation_order() {
            match self.evaluate_target(target, selection, &snapshot) {
                Some(v) => snapshot.insert(target.clone(), v),
                None => {
                    snapshot.remove(target);
                }
            }
        }
        snapshot
    }
}

impl RuleGraph {
    /// Targets in the order the evaluator visits them.
    pub fn evaluation_order(&self) -> &[String] {
        self.order.get_or_init(|| self.topological_order())
    }

    fn dependencies(&self, target: &str) -> BTreeSet<String> {
        let mut idents = BTreeSet::new();
        let mut patterns = Vec::new();
        for edge in self.edges_for(target) {
            if !edge.source.is_empty() {
                idents.insert(edge.source.clone());
            }
            edge.formula.references(&mut idents, &mut patterns);
        }
        let mut deps: BTreeSet<String> = idents
            .into_iter()
            .filter(|k| self.has_target(k))
            .collect();
        for pat in &patterns {
            deps.extend(self.targets().filter(|t| pat.is_match(t)).map(str::to_string));
        }
        deps.remove(target);
        deps
    }

    fn topological_order(&self) -> Vec<String> {
        let mut pending: BTreeMap<String, BTreeSet<String>> = self
            .targets()
            .map(|t| (t.to_string(), self.dependencies(t)))
            .collect();
        let mut dependents: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (t, deps) in &pending {
            for d in deps {
                dependents.entry(d.clone()).or_default().push(t.clone());
            }
        }
        let mut ready: BTreeSet<String> = pending
            .iter()
            .filter(|(_, deps)| deps.is_empty())
            .map(|(t, _)| t.clone())
            .collect();
        let mut order = Vec::with_capacity(pending.len());
        while let Some(next) = ready.pop_first() {
            pending.remove(&next);
            for dependent in dependents.get(&next).into_iter().flatten() {
                if let Some(deps) = pending.get_mut(dependent) {
                    deps.remove(&next);
                    if deps.is_empty() {
                        ready.insert(dependent.clone());
                    }
                }
            }
            order.push(next);
        }
        if !pending.is_empty() {
            let cyclic: Vec<String> = pending.into_keys().collect();
            tracing::warn!(targets = ?cyclic, "dependency cycle; evaluating by name");
            order.extend(cyclic);
        }
        order
    }

    fn evaluate_target(&self, target: &str, selection: &Selection, dict: &Snapshot) -> Option<Value> {
        let source_of = |name: &str| -> Option<&Value> {
            if name.is_empty() { None } else { dict.get(name) }
        };
        let fires = |name: &str| name.is_empty() || source_of(name).is_some_and(Value::is_truthy);

        for gate in self.edges_for(target).filter(|e| e.op == Operator::Gate) {
            let scope = Scope::new(source_of(&gate.source), dict);
            let result = gate.formula.apply(&scope);
            let open = if gate.source.is_empty() {
                result.is_none_or(|v| v.is_truthy())
            } else {
                fires(&gate.source) && result.is_some_and(|v| v.is_truthy())
            };
            if !open {
                tracing::trace!(target, gate = %gate.source, "gated off");
                return None;
            }
        }

        let mut value = selection.get(target).cloned();
        for edge in self.edges_for(target).filter(|e| e.op != Operator::Gate) {
            if !fires(&edge.source) {
                continue;
            }
            let scope = Scope::new(source_of(&edge.source), dict);
            let Some(contribution) = edge.formula.apply(&scope) else {
                continue;
            };
            tracing::trace!(%edge, %contribution, "edge fired");
            value = combine(edge.op, value, contribution);
        }
        value
    }
}

fn combine(op: Operator, current: Option<Value>, contribution: Value) -> Option<Value> {
    let Some(current) = current else {
        return match op {
            Operator::Multiply | Operator::Gate => None,
            _ => Some(contribution),
        };
    };
    let numbers = current.as_number().zip(contribution.as_number());
    match (op, numbers) {
        (Operator::Set | Operator::Gate, _) => Some(current),
        (Operator::Add, Some((a, b))) => Some(Value::Number(a + b)),
        (Operator::Add, None) => Some(Value::Text(format!("{current}{contribution}"))),
        (Operator::Max, Some((a, b))) => Some(Value::Number(a.max(b))),
        (Operator::Min, Some((a, b))) => Some(Value::Number(a.min(b))),
        (Operator::Multiply, Some((a, b))) => Some(Value::Number(a * b)),
        (Operator::Max | Operator::Min | Operator::Multiply, None) => Some(current),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::{BinaryOp, Builtin, Expr, Formula};
    use crate::graph::RuleEdge;

    fn rule(g: &mut RuleGraph, target: &str, source: &str, op: Operator, formula: Formula) {
        g.define_rule(RuleEdge::new(target, source, op, formula));
    }

    fn lit(n: f64) -> Formula {
        Formula::Literal(Value::Number(n))
    }

    fn die() -> Formula {
        let n = |x: f64| Expr::Literal(Value::Number(x));
        Formula::Expr(Expr::Call(
            Builtin::Max,
            vec![
                Expr::Call(
                    Builtin::Min,
                    vec![
                        Expr::binary(
                            BinaryOp::Add,
                            n(2.0),
                            Expr::binary(BinaryOp::Mul, Expr::Ident("source".into()), n(2.0)),
                        ),
                        n(12.0),
                    ],
                ),
                n(4.0),
            ],
        ))
    }

    #[test]
    fn agility_from_allocation_above_base_step() {
        let mut g = RuleGraph::new();
        rule(&mut g, "agility", "agilityStep", Operator::Set, die());
        // Unconditional base: step 1 is a d4, allocations add on top.
        rule(&mut g, "agilityStep", "", Operator::Set, lit(1.0));
        rule(&mut g, "agilityStep", "agilityAllocation", Operator::Add, Formula::PassThrough);
        let sel: Selection = [("agilityAllocation", 2)].into_iter().collect();
        let snap = g.apply_rules(&sel);
        assert_eq!(snap.number("agilityStep"), 3.0);
        assert_eq!(snap.number("agility"), 8.0);
        let snap = g.apply_rules(&Selection::new());
        assert_eq!(snap.number("agilityStep"), 1.0);
        assert_eq!(snap.number("agility"), 4.0);
    }

    #[test]
    fn set_is_first_write_wins() {
        let mut g = RuleGraph::new();
        rule(&mut g, "size", "race.small", Operator::Set, lit(-1.0));
        rule(&mut g, "size", "race.large", Operator::Set, lit(2.0));
        let both: Selection = [("race.small", 1), ("race.large", 1)].into_iter().collect();
        assert_eq!(g.apply_rules(&both).number("size"), -1.0);
        let large: Selection = [("race.large", 1)].into_iter().collect();
        assert_eq!(g.apply_rules(&large).number("size"), 2.0);
    }

    #[test]
    fn reregistration_is_unobservable() {
        let build = |twice: bool| {
            let mut g = RuleGraph::new();
            for _ in 0..if twice { 2 } else { 1 } {
                rule(&mut g, "parry", "", Operator::Set, lit(2.0));
                rule(&mut g, "parry", "edges.Block", Operator::Add, lit(1.0));
            }
            g
        };
        let sel: Selection = [("edges.Block", 1)].into_iter().collect();
        assert_eq!(build(false).apply_rules(&sel), build(true).apply_rules(&sel));
        assert_eq!(build(true).apply_rules(&sel).number("parry"), 3.0);
    }

    #[test]
    fn gate_suppresses_target() {
        let mut g = RuleGraph::new();
        rule(&mut g, "combatNotes.block", "features.Block", Operator::Gate, Formula::PassThrough);
        rule(&mut g, "combatNotes.block", "", Operator::Set, lit(1.0));
        rule(&mut g, "features.Block", "edges.Block", Operator::Set, Formula::PassThrough);
        let off = g.apply_rules(&Selection::new());
        assert!(off.get("combatNotes.block").is_none());
        let on = g.apply_rules(&[("edges.Block", 1)].into_iter().collect());
        assert_eq!(on.number("combatNotes.block"), 1.0);
    }

    #[test]
    fn multiply_leaves_unset_target_unset() {
        let slow: Selection = [("edges.Slow", 1)].into_iter().collect();
        let mut g = RuleGraph::new();
        rule(&mut g, "pace", "edges.Slow", Operator::Multiply, lit(0.5));
        assert!(g.apply_rules(&slow).get("pace").is_none());

        let mut g = RuleGraph::new();
        rule(&mut g, "pace", "", Operator::Set, lit(6.0));
        rule(&mut g, "pace", "edges.Slow", Operator::Multiply, lit(0.5));
        assert_eq!(g.apply_rules(&slow).number("pace"), 3.0);
    }

    #[test]
    fn min_and_max_accumulate() {
        let mut g = RuleGraph::new();
        rule(&mut g, "armor", "armors.Leather", Operator::Max, lit(1.0));
        rule(&mut g, "armor", "armors.Chain", Operator::Max, lit(3.0));
        rule(&mut g, "cap", "", Operator::Min, lit(4.0));
        rule(&mut g, "cap", "armors.Chain", Operator::Min, lit(2.0));
        let sel: Selection = [("armors.Leather", 1), ("armors.Chain", 1)].into_iter().collect();
        let snap = g.apply_rules(&sel);
        assert_eq!(snap.number("armor"), 3.0);
        assert_eq!(snap.number("cap"), 2.0);
    }

    #[test]
    fn order_follows_formula_references() {
        let mut g = RuleGraph::new();
        rule(
            &mut g,
            "parry",
            "",
            Operator::Add,
            Formula::Expr(Expr::binary(BinaryOp::Div, Expr::Ident("skills.Fighting".into()), Expr::Literal(2.into()))),
        );
        rule(&mut g, "skills.Fighting", "skillStep.Fighting", Operator::Set, die());
        rule(&mut g, "skillStep.Fighting", "skillAllocation.Fighting", Operator::Add, Formula::PassThrough);
        let order = g.evaluation_order();
        let pos = |k: &str| order.iter().position(|t| t == k).unwrap();
        assert!(pos("skillStep.Fighting") < pos("skills.Fighting"));
        assert!(pos("skills.Fighting") < pos("parry"));
        let snap = g.apply_rules(&[("skillAllocation.Fighting", 3)].into_iter().collect());
        assert_eq!(snap.number("parry"), 4.0);
    }

    #[test]
    fn cycles_still_evaluate() {
        let mut g = RuleGraph::new();
        rule(&mut g, "a", "b", Operator::Add, Formula::PassThrough);
        rule(&mut g, "b", "a", Operator::Add, Formula::PassThrough);
        assert_eq!(g.evaluation_order(), ["a", "b"]);
        let snap = g.apply_rules(&[("b", 1)].into_iter().collect());
        assert_eq!(snap.number("a"), 1.0);
        assert_eq!(snap.number("b"), 2.0);
    }

    mod accumulate {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn sum_is_order_independent(values in proptest::collection::vec(-20i32..20, 1..8), seed in any::<u64>()) {
                let mut order: Vec<usize> = (0..values.len()).collect();
                let len = order.len();
                for i in 0..len {
                    let j = (seed as usize).wrapping_add(i * 7) % len;
                    order.swap(i, j);
                }
                let mut g = RuleGraph::new();
                for &i in &order {
                    rule(&mut g, "total", &format!("src{i}"), Operator::Add, lit(f64::from(values[i])));
                }
                let sel: Selection = (0..values.len()).map(|i| (format!("src{i}"), 1)).collect();
                let expected: i32 = values.iter().sum();
                prop_assert_eq!(g.apply_rules(&sel).number("total"), f64::from(expected));
            }
        }
    }
}
