//! Prerequisite expressions: AND-joined clauses of OR-joined comparisons.
//!
//! Comparisons always run against the computed snapshot. A missing attribute
//! reads as 0 (or the empty string for pattern tests) so that requirements
//! degrade gracefully on half-built characters.

use std::cmp::Ordering;
use std::fmt;

use regex::Regex;

use crate::error::{CoreError, CoreResult};
use crate::selection::Snapshot;
use crate::value::Value;

/// A compiled regular expression used by `Sum`/`Max` and `=~`/`!~`.
#[derive(Debug, Clone)]
pub struct Pattern(Regex);

impl Pattern {
    /// Compile a pattern.
    pub fn new(source: &str) -> CoreResult<Self> {
        Regex::new(source)
            .map(Pattern)
            .map_err(|e| CoreError::InvalidPattern {
                pattern: source.to_string(),
                message: e.to_string(),
            })
    }

    /// Whether the pattern matches anywhere in `text`.
    pub fn is_match(&self, text: &str) -> bool {
        self.0.is_match(text)
    }

    /// The pattern source.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

/// The left-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrRef {
    /// A single attribute key.
    Key(String),
    /// Sum of every attribute whose key matches the pattern.
    Sum(Pattern),
    /// Maximum of every attribute whose key matches the pattern.
    Max(Pattern),
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `>=`
    Ge,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `<`
    Lt,
}

impl CompareOp {
    /// Source spelling.
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Ge => ">=",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Lt => "<",
        }
    }

    fn holds(self, ord: Ordering) -> bool {
        match self {
            CompareOp::Eq => ord.is_eq(),
            CompareOp::Ne => ord.is_ne(),
            CompareOp::Ge => ord.is_ge(),
            CompareOp::Le => ord.is_le(),
            CompareOp::Gt => ord.is_gt(),
            CompareOp::Lt => ord.is_lt(),
        }
    }
}

/// The right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Test {
    /// Compare against a literal.
    Compare(CompareOp, Value),
    /// `=~`
    Matches(Pattern),
    /// `!~`
    NotMatches(Pattern),
}

/// One atomic comparison, `<attr> <op> <value>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    /// What is being tested.
    pub attr: AttrRef,
    /// How it is tested.
    pub test: Test,
}

/// OR-joined alternatives; satisfied when any alternative holds.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    /// The alternatives.
    pub alternatives: Vec<Comparison>,
}

/// AND-joined clauses; satisfied when every clause holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Prerequisite {
    /// The clauses.
    pub clauses: Vec<Clause>,
}

/// Keys consulted, in order, when looking up `key`.
///
/// `features.X` is what a trait grants once selected; before evaluation
/// settles it falls back to the raw `edges.X` / `hindrances.X` selections.
pub fn lookup_chain(key: &str) -> Vec<String> {
    match key.strip_prefix("features.") {
        Some(name) => vec![
            key.to_string(),
            format!("edges.{name}"),
            format!("hindrances.{name}"),
        ],
        None => vec![key.to_string()],
    }
}

fn order(actual: &Value, expected: &Value) -> Ordering {
    match (actual.as_number(), expected.as_number()) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Less),
        _ => actual.to_string().cmp(&expected.to_string()),
    }
}

impl AttrRef {
    /// Resolve against a snapshot. Absent when nothing matches.
    pub fn resolve(&self, snapshot: &Snapshot) -> Option<Value> {
        match self {
            AttrRef::Key(key) => lookup_chain(key)
                .iter()
                .find_map(|k| snapshot.get(k))
                .cloned(),
            AttrRef::Sum(pat) => {
                let total = snapshot
                    .iter()
                    .filter(|(k, _)| pat.is_match(k))
                    .filter_map(|(_, v)| v.as_number())
                    .sum::<f64>();
                Some(Value::Number(total))
            }
            AttrRef::Max(pat) => snapshot
                .iter()
                .filter(|(k, _)| pat.is_match(k))
                .filter_map(|(_, v)| v.as_number())
                .reduce(f64::max)
                .map(Value::Number),
        }
    }
}

impl Test {
    /// Whether `actual` passes the test. Absent reads as 0, or as the
    /// empty string for pattern tests.
    pub fn accepts(&self, actual: Option<&Value>) -> bool {
        let text = || actual.map(ToString::to_string).unwrap_or_default();
        match self {
            Test::Compare(op, expected) => {
                let zero = Value::Number(0.0);
                op.holds(order(actual.unwrap_or(&zero), expected))
            }
            Test::Matches(pat) => pat.is_match(&text()),
            Test::NotMatches(pat) => !pat.is_match(&text()),
        }
    }
}

impl Comparison {
    /// Whether the comparison holds against `snapshot`.
    pub fn evaluate(&self, snapshot: &Snapshot) -> bool {
        self.test.accepts(self.attr.resolve(snapshot).as_ref())
    }
}

impl Clause {
    /// Whether any alternative holds.
    pub fn evaluate(&self, snapshot: &Snapshot) -> bool {
        self.alternatives.iter().any(|c| c.evaluate(snapshot))
    }
}

impl Prerequisite {
    /// A prerequisite with a single one-alternative clause.
    pub fn single(comparison: Comparison) -> Self {
        Self {
            clauses: vec![Clause {
                alternatives: vec![comparison],
            }],
        }
    }

    /// Whether every clause holds.
    pub fn evaluate(&self, snapshot: &Snapshot) -> bool {
        self.clauses.iter().all(|c| c.evaluate(snapshot))
    }

    /// Clauses that do not hold against `snapshot`.
    pub fn failing_clauses<'a>(&'a self, snapshot: &Snapshot) -> Vec<&'a Clause> {
        self.clauses
            .iter()
            .filter(|c| !c.evaluate(snapshot))
            .collect()
    }
}

fn quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    write!(f, "'{}'", s.replace('\'', "\\'"))
}

impl fmt::Display for AttrRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrRef::Key(k) => write!(f, "{k}"),
            AttrRef::Sum(p) => {
                write!(f, "Sum ")?;
                quoted(f, p.as_str())
            }
            AttrRef::Max(p) => {
                write!(f, "Max ")?;
                quoted(f, p.as_str())
            }
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.attr)?;
        match &self.test {
            Test::Compare(op, Value::Text(s)) => {
                write!(f, "{} ", op.symbol())?;
                quoted(f, s)
            }
            Test::Compare(op, v) => write!(f, "{} {v}", op.symbol()),
            Test::Matches(p) => {
                write!(f, "=~ ")?;
                quoted(f, p.as_str())
            }
            Test::NotMatches(p) => {
                write!(f, "!~ ")?;
                quoted(f, p.as_str())
            }
        }
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, alt) in self.alternatives.iter().enumerate() {
            if i > 0 {
                write!(f, " || ")?;
            }
            write!(f, "{alt}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Prerequisite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, clause) in self.clauses.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{clause}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmp(key: &str, op: CompareOp, v: impl Into<Value>) -> Comparison {
        Comparison {
            attr: AttrRef::Key(key.to_string()),
            test: Test::Compare(op, v.into()),
        }
    }

    fn all_of(cmps: Vec<Comparison>) -> Prerequisite {
        Prerequisite {
            clauses: cmps
                .into_iter()
                .map(|c| Clause {
                    alternatives: vec![c],
                })
                .collect(),
        }
    }

    #[test]
    fn advances_and_strength() {
        let req = all_of(vec![
            cmp("advances", CompareOp::Ge, 4),
            cmp("strength", CompareOp::Ge, 6),
        ]);
        let weak: Snapshot = [("advances", 4), ("strength", 4)].into_iter().collect();
        let strong: Snapshot = [("advances", 4), ("strength", 6)].into_iter().collect();
        assert!(!req.evaluate(&weak));
        assert_eq!(req.failing_clauses(&weak).len(), 1);
        assert!(req.evaluate(&strong));
    }

    #[test]
    fn missing_attribute_reads_zero() {
        let empty = Snapshot::new();
        assert!(cmp("edges.Block", CompareOp::Eq, 0).evaluate(&empty));
        assert!(!cmp("edges.Block", CompareOp::Ge, 1).evaluate(&empty));
    }

    #[test]
    fn features_fall_back_to_selection_keys() {
        let snap: Snapshot = [("edges.Brawny", 1)].into_iter().collect();
        assert!(cmp("features.Brawny", CompareOp::Eq, 1).evaluate(&snap));
        let granted: Snapshot = [("features.Brawny", 0), ("edges.Brawny", 1)]
            .into_iter()
            .collect();
        assert!(cmp("features.Brawny", CompareOp::Eq, 0).evaluate(&granted));
    }

    #[test]
    fn sum_and_max_aggregate_by_pattern() {
        let snap: Snapshot = [
            ("skills.Fighting", 8),
            ("skills.Shooting", 6),
            ("strength", 10),
        ]
        .into_iter()
        .collect();
        let sum = Comparison {
            attr: AttrRef::Sum(Pattern::new("^skills[.]").unwrap()),
            test: Test::Compare(CompareOp::Eq, 14.into()),
        };
        let max = Comparison {
            attr: AttrRef::Max(Pattern::new("^skills[.]").unwrap()),
            test: Test::Compare(CompareOp::Ge, 8.into()),
        };
        assert!(sum.evaluate(&snap));
        assert!(max.evaluate(&snap));
    }

    #[test]
    fn text_values_compare_and_match() {
        let snap: Snapshot = [("race", "Half-Elf")].into_iter().collect();
        assert!(cmp("race", CompareOp::Ne, "Elf").evaluate(&snap));
        let m = Comparison {
            attr: AttrRef::Key("race".into()),
            test: Test::Matches(Pattern::new("Elf").unwrap()),
        };
        assert!(m.evaluate(&snap));
        let absent = Comparison {
            attr: AttrRef::Key("concept".into()),
            test: Test::NotMatches(Pattern::new("Mage").unwrap()),
        };
        assert!(absent.evaluate(&snap));
    }

    #[test]
    fn display_round_trips_shape() {
        let req = Prerequisite {
            clauses: vec![
                Clause {
                    alternatives: vec![
                        cmp("race", CompareOp::Eq, "Elf"),
                        cmp("agility", CompareOp::Ge, 8),
                    ],
                },
                Clause {
                    alternatives: vec![cmp("advances", CompareOp::Gt, 0)],
                },
            ],
        };
        assert_eq!(req.to_string(), "race == 'Elf' || agility >= 8, advances > 0");
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        assert!(matches!(
            Pattern::new("(unclosed"),
            Err(CoreError::InvalidPattern { .. })
        ));
    }

    mod laws {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn and_or_laws(a in 0i32..10, b in 0i32..10, ta in 0i32..10, tb in 0i32..10) {
                let snap: Snapshot = [("a", a), ("b", b)].into_iter().collect();
                let ca = cmp("a", CompareOp::Ge, ta);
                let cb = cmp("b", CompareOp::Ge, tb);
                let both = all_of(vec![ca.clone(), cb.clone()]);
                let either = Prerequisite {
                    clauses: vec![Clause { alternatives: vec![ca.clone(), cb.clone()] }],
                };
                prop_assert_eq!(both.evaluate(&snap), a >= ta && b >= tb);
                prop_assert_eq!(either.evaluate(&snap), a >= ta || b >= tb);
            }

            #[test]
            fn eq_ne_are_complements(a in -5i32..5, t in -5i32..5) {
                let snap: Snapshot = [("a", a)].into_iter().collect();
                let eq = cmp("a", CompareOp::Eq, t).evaluate(&snap);
                let ne = cmp("a", CompareOp::Ne, t).evaluate(&snap);
                prop_assert_eq!(eq, !ne);
            }
        }
    }
}
