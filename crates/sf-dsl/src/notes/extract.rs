//! Clause extractors.
//!
//! Each extractor is paired with the pattern that selects it. The compiler
//! tries them in order on every clause; the first whose pattern matches
//! handles the clause.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use sf_core::formula::{BinaryOp, Expr, Formula};
use sf_core::{Operator, RuleEdge, RuleGraph, Value};

use super::target::TargetNames;
use crate::parser::parse_formula;

/// `<n> powers`, `+%V power points`, `2 additional powers`, ...
pub static COUNT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\+?(\d+|%[V1-9])\s+(?:additional\s+|new\s+)?(power\s+points?|powers?)\b")
        .expect("valid regex")
});

/// `%{<expr>}` anywhere in the clause.
pub static EXPRESSION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%\{([^}]+)\}").expect("valid regex"));

/// `<+|-|x><number|%ref> <Target Phrase>`
pub static DELTA_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([-+x])(\d+(?:\.\d+)?|%[V1-9])\s+(.+?)\.?$").expect("valid regex")
});

/// A clause handler.
pub trait Extractor {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Emit rule edges for a clause whose pattern matched.
    fn extract(&self, ctx: &mut NoteContext<'_>, caps: &Captures<'_>, clause: &str);
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Amount {
    /// A constant contribution, fired by the feature gate.
    Literal(f64),
    /// The source value times a factor.
    Scaled(f64),
}

#[derive(Debug, Clone)]
struct PendingDelta {
    target: String,
    source: String,
    op: Operator,
    amount: Amount,
}

/// Deltas collected over every note of one feature. Literal deltas all
/// share the feature gate as source, so equal ones merge into one edge.
#[derive(Debug, Clone, Default)]
pub(super) struct PendingDeltas(Vec<PendingDelta>);

impl PendingDeltas {
    fn push(&mut self, target: String, source: String, op: Operator, amount: Amount) {
        let existing = self
            .0
            .iter()
            .position(|d| d.target == target && d.source == source && d.op == op);
        let Some(i) = existing else {
            self.0.push(PendingDelta {
                target,
                source,
                op,
                amount,
            });
            return;
        };
        match (op, &mut self.0[i].amount, amount) {
            (Operator::Multiply, Amount::Literal(a), Amount::Literal(b)) => *a *= b,
            (Operator::Multiply, _, _) => {
                tracing::debug!(%target, "repeated scaled multiplier ignored");
            }
            (_, Amount::Literal(a), Amount::Literal(b)) | (_, Amount::Scaled(a), Amount::Scaled(b)) => {
                *a += b;
            }
            _ => tracing::debug!(%target, %source, "mixed delta kinds; keeping the first"),
        }
    }

    /// Emit the merged deltas; returns the number of new edges.
    pub(super) fn emit(self, graph: &mut RuleGraph) -> usize {
        let mut added = 0;
        for d in self.0 {
            let formula = match d.amount {
                Amount::Literal(n) => Formula::Literal(Value::Number(n)),
                Amount::Scaled(k) if k == 1.0 => Formula::PassThrough,
                Amount::Scaled(k) => Formula::Expr(Expr::binary(
                    BinaryOp::Mul,
                    Expr::Ident("source".to_string()),
                    Expr::Literal(Value::Number(k)),
                )),
            };
            if graph.define_rule(RuleEdge::new(d.target, d.source, d.op, formula)) {
                added += 1;
            }
        }
        added
    }
}

/// Per-note state shared by the extractors.
pub struct NoteContext<'g> {
    graph: &'g mut RuleGraph,
    names: &'g TargetNames,
    deltas: &'g mut PendingDeltas,
    note_key: String,
    gate: String,
    next_ref: usize,
    added: usize,
}

impl<'g> NoteContext<'g> {
    pub(super) fn new(
        graph: &'g mut RuleGraph,
        names: &'g TargetNames,
        deltas: &'g mut PendingDeltas,
        note_key: String,
        gate: String,
        first_ref: usize,
    ) -> Self {
        Self {
            graph,
            names,
            deltas,
            note_key,
            gate,
            next_ref: first_ref,
            added: 0,
        }
    }

    /// Key of the note being compiled, e.g. `combatNotes.block`.
    pub fn note_key(&self) -> &str {
        &self.note_key
    }

    /// The feature attribute that gates the note, e.g. `features.Block`.
    pub fn gate(&self) -> &str {
        &self.gate
    }

    /// Register an edge immediately.
    pub fn define(&mut self, edge: RuleEdge) {
        if self.graph.define_rule(edge) {
            self.added += 1;
        }
    }

    fn take_ref(&mut self) -> usize {
        let k = self.next_ref;
        self.next_ref += 1;
        k
    }

    /// Source key and amount for `5`, `%V` or `%3`.
    fn amount(&self, token: &str) -> (String, Amount) {
        match token.strip_prefix('%') {
            Some("V") => (self.note_key.clone(), Amount::Scaled(1.0)),
            Some(n) => (format!("{}.{n}", self.note_key), Amount::Scaled(1.0)),
            None => (self.gate.clone(), Amount::Literal(token.parse().unwrap_or(0.0))),
        }
    }

    fn push_delta(&mut self, target: String, source: String, op: Operator, amount: Amount) {
        self.deltas.push(target, source, op, amount);
    }

    /// Edges registered directly by this note's extractors.
    pub(super) fn added(&self) -> usize {
        self.added
    }
}

/// Apply a delta clause already matched by [`DELTA_PATTERN`].
fn apply_delta(ctx: &mut NoteContext<'_>, caps: &Captures<'_>) {
    let phrase = &caps[3];
    let Some(target) = ctx.names.canonicalize(phrase, &*ctx.graph) else {
        tracing::debug!(note = %ctx.note_key, phrase, "unrecognized target; render only");
        return;
    };
    let (source, mut amount) = ctx.amount(&caps[2]);
    let op = match &caps[1] {
        "x" => Operator::Multiply,
        "-" => {
            amount = match amount {
                Amount::Literal(n) => Amount::Literal(-n),
                Amount::Scaled(k) => Amount::Scaled(-k),
            };
            Operator::Add
        }
        _ => Operator::Add,
    };
    ctx.push_delta(target, source, op, amount);
}

/// Power and power-point counts.
#[derive(Debug, Clone, Copy, Default)]
pub struct CountExtractor;

impl Extractor for CountExtractor {
    fn name(&self) -> &'static str {
        "count"
    }

    fn extract(&self, ctx: &mut NoteContext<'_>, caps: &Captures<'_>, _clause: &str) {
        let target = if caps[2].to_lowercase().starts_with("power point") {
            "powerPoints"
        } else {
            "powerCount"
        };
        let (source, amount) = ctx.amount(&caps[1]);
        ctx.push_delta(target.to_string(), source, Operator::Add, amount);
    }
}

/// `%{expr}` placeholders, each computed into a numbered sub-attribute of
/// the note from whichever referenced attribute is present first.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpressionExtractor;

impl Extractor for ExpressionExtractor {
    fn name(&self) -> &'static str {
        "expression"
    }

    fn extract(&self, ctx: &mut NoteContext<'_>, _caps: &Captures<'_>, clause: &str) {
        let mut rewritten = String::with_capacity(clause.len());
        let mut last = 0;
        for caps in EXPRESSION_PATTERN.captures_iter(clause) {
            let Some(whole) = caps.get(0) else { continue };
            let k = ctx.take_ref();
            rewritten.push_str(&clause[last..whole.start()]);
            rewritten.push_str(&format!("%{k}"));
            last = whole.end();

            let text = &caps[1];
            let expr = match parse_formula(text) {
                Ok(expr) => expr,
                Err(errors) => {
                    let message = errors.first().map(|e| e.message.clone()).unwrap_or_default();
                    tracing::warn!(note = %ctx.note_key, expr = text, %message, "unparseable note expression; render only");
                    return;
                }
            };
            let sub = format!("{}.{k}", ctx.note_key);
            let mut refs = std::collections::BTreeSet::new();
            expr.references(&mut refs);
            let gate = ctx.gate.clone();
            ctx.define(RuleEdge::new(&sub, &gate, Operator::Gate, Formula::PassThrough));
            if refs.is_empty() {
                ctx.define(RuleEdge::new(&sub, &gate, Operator::Set, Formula::Expr(expr)));
            } else {
                for r in refs {
                    ctx.define(RuleEdge::new(&sub, r, Operator::Set, Formula::Expr(expr.clone())));
                }
            }
        }
        rewritten.push_str(&clause[last..]);
        if let Some(caps) = DELTA_PATTERN.captures(&rewritten) {
            apply_delta(ctx, &caps);
        }
    }
}

/// Numeric adjustments onto a named target.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeltaExtractor;

impl Extractor for DeltaExtractor {
    fn name(&self) -> &'static str {
        "delta"
    }

    fn extract(&self, ctx: &mut NoteContext<'_>, caps: &Captures<'_>, _clause: &str) {
        apply_delta(ctx, caps);
    }
}
