use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::CoreError;
use crate::formula::Formula;
use crate::prereq::Prerequisite;

/// How an edge combines its contribution into the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `=`: set the target if it is still unset (first write wins).
    Set,
    /// `+=`: sum numbers, concatenate text.
    Add,
    /// `^=`: keep the maximum.
    Max,
    /// `v`: keep the minimum.
    Min,
    /// `*=`: multiply; an unset target stays unset.
    Multiply,
    /// `?`: block every other edge onto the target unless this one is truthy.
    Gate,
}

impl Operator {
    /// Canonical source spelling.
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Set => "=",
            Operator::Add => "+=",
            Operator::Max => "^=",
            Operator::Min => "v",
            Operator::Multiply => "*=",
            Operator::Gate => "?",
        }
    }
}

impl FromStr for Operator {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "=" => Ok(Operator::Set),
            "+=" | "+" => Ok(Operator::Add),
            "^=" | "^" => Ok(Operator::Max),
            "v" | "v=" => Ok(Operator::Min),
            "*=" | "*" | "x" => Ok(Operator::Multiply),
            "?" => Ok(Operator::Gate),
            other => Err(CoreError::UnknownOperator(other.to_string())),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// One registered contribution from a source attribute to a target.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleEdge {
    /// The derived attribute written by this edge.
    pub target: String,
    /// The attribute whose truthiness enables the edge. Empty fires always.
    pub source: String,
    /// How the contribution is combined.
    pub op: Operator,
    /// What is contributed.
    pub formula: Formula,
}

impl RuleEdge {
    /// Create an edge.
    pub fn new(
        target: impl Into<String>,
        source: impl Into<String>,
        op: Operator,
        formula: Formula,
    ) -> Self {
        Self {
            target: target.into(),
            source: source.into(),
            op,
            formula,
        }
    }
}

impl fmt::Display for RuleEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.target, self.op, self.formula)?;
        if !self.source.is_empty() {
            write!(f, " <- {}", self.source)?;
        }
        Ok(())
    }
}

/// The append-only rule graph.
///
/// Built once at startup and shared read-only afterwards. Besides edges it
/// keeps the source text of compiled notes (for rendering) and the parsed
/// prerequisite behind every sanity/validation fact (for repair).
#[derive(Debug, Default)]
pub struct RuleGraph {
    edges: Vec<RuleEdge>,
    by_target: BTreeMap<String, Vec<usize>>,
    notes: BTreeMap<String, String>,
    requirements: BTreeMap<String, Prerequisite>,
    pub(crate) order: OnceLock<Vec<String>>,
}

impl RuleGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an edge. Returns `false` if an identical edge already exists,
    /// in which case the graph is unchanged.
    pub fn define_rule(&mut self, edge: RuleEdge) -> bool {
        let existing = self.by_target.get(&edge.target);
        if existing.is_some_and(|ids| ids.iter().any(|&i| self.edges[i] == edge)) {
            tracing::trace!(%edge, "duplicate rule ignored");
            return false;
        }
        tracing::trace!(%edge, "rule defined");
        let id = self.edges.len();
        self.by_target
            .entry(edge.target.clone())
            .or_default()
            .push(id);
        self.edges.push(edge);
        self.order = OnceLock::new();
        true
    }

    /// All edges in registration order.
    pub fn edges(&self) -> &[RuleEdge] {
        &self.edges
    }

    /// Edges writing `target`, in registration order.
    pub fn edges_for<'a>(&'a self, target: &str) -> impl Iterator<Item = &'a RuleEdge> + 'a {
        self.by_target
            .get(target)
            .into_iter()
            .flatten()
            .map(|&i| &self.edges[i])
    }

    /// Edges whose source is `source`, in registration order.
    pub fn edges_from<'a>(&'a self, source: &'a str) -> impl Iterator<Item = &'a RuleEdge> + 'a {
        self.edges.iter().filter(move |e| e.source == source)
    }

    /// Whether any edge writes `key`.
    pub fn has_target(&self, key: &str) -> bool {
        self.by_target.contains_key(key)
    }

    /// All written keys, sorted.
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.by_target.keys().map(String::as_str)
    }

    /// Remember the source text of a compiled note.
    pub fn define_note(&mut self, key: impl Into<String>, text: impl Into<String>) {
        self.notes.insert(key.into(), text.into());
    }

    /// Source text of a compiled note.
    pub fn note(&self, key: &str) -> Option<&str> {
        self.notes.get(key).map(String::as_str)
    }

    /// All compiled notes, by key.
    pub fn notes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.notes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Remember the prerequisite behind a sanity or validation fact.
    /// Clauses accumulate when a fact is defined more than once.
    pub fn define_requirement(&mut self, fact: impl Into<String>, requirement: Prerequisite) {
        let entry = self.requirements.entry(fact.into()).or_default();
        for clause in requirement.clauses {
            if !entry.clauses.contains(&clause) {
                entry.clauses.push(clause);
            }
        }
    }

    /// The prerequisite behind a fact.
    pub fn requirement(&self, fact: &str) -> Option<&Prerequisite> {
        self.requirements.get(fact)
    }

    /// Number of registered edges.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Whether the graph has no edges.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn operator_spellings() {
        assert_eq!("+".parse::<Operator>().unwrap(), Operator::Add);
        assert_eq!("^=".parse::<Operator>().unwrap(), Operator::Max);
        assert_eq!("x".parse::<Operator>().unwrap(), Operator::Multiply);
        assert_eq!("v".parse::<Operator>().unwrap(), Operator::Min);
        assert!(matches!(
            "<>".parse::<Operator>(),
            Err(CoreError::UnknownOperator(op)) if op == "<>"
        ));
    }

    #[test]
    fn identical_edge_registers_once() {
        let mut g = RuleGraph::new();
        let edge = RuleEdge::new("parry", "", Operator::Set, Formula::Literal(Value::from(2)));
        assert!(g.define_rule(edge.clone()));
        assert!(!g.define_rule(edge));
        assert_eq!(g.len(), 1);
        assert_eq!(g.edges_for("parry").count(), 1);
    }

    #[test]
    fn edges_keep_registration_order() {
        let mut g = RuleGraph::new();
        g.define_rule(RuleEdge::new("t", "b", Operator::Add, Formula::PassThrough));
        g.define_rule(RuleEdge::new("t", "a", Operator::Add, Formula::PassThrough));
        let sources: Vec<_> = g.edges_for("t").map(|e| e.source.as_str()).collect();
        assert_eq!(sources, ["b", "a"]);
    }

    #[test]
    fn edge_display() {
        let e = RuleEdge::new("agilityStep", "features.Foo", Operator::Add, Formula::Literal(2.into()));
        assert_eq!(e.to_string(), "agilityStep += 2 <- features.Foo");
        let base = RuleEdge::new("pace", "", Operator::Set, Formula::Literal(6.into()));
        assert_eq!(base.to_string(), "pace = 6");
    }

    #[test]
    fn requirements_merge_without_duplicates() {
        use crate::prereq::{AttrRef, CompareOp, Comparison, Test};
        let c = Comparison {
            attr: AttrRef::Key("advances".into()),
            test: Test::Compare(CompareOp::Ge, 4.into()),
        };
        let mut g = RuleGraph::new();
        g.define_requirement("validationNotes.quickEdge", Prerequisite::single(c.clone()));
        g.define_requirement("validationNotes.quickEdge", Prerequisite::single(c));
        assert_eq!(g.requirement("validationNotes.quickEdge").unwrap().clauses.len(), 1);
    }
}
