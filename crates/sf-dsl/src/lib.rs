//! Text front ends for Statforge.
//!
//! Formula text is lexed with `logos` and parsed with `chumsky` into the
//! [`sf_core::Expr`] AST; prerequisite text is split and pattern-matched into
//! [`sf_core::Prerequisite`]; trait notes are compiled into rule edges by the
//! [`notes::NoteCompiler`].

/// Pretty error reports for content text.
pub mod diagnostics;
/// Error types for the front ends.
pub mod error;
/// Formula lexer.
pub mod lexer;
/// Note-template compiler and renderer.
pub mod notes;
/// Formula parser.
pub mod parser;
/// Prerequisite parser and fact registration.
pub mod prereq;

use sf_core::formula::Formula;
use sf_core::{Operator, RuleEdge, RuleGraph, Value};

pub use diagnostics::{Diagnostic, render_error};
pub use error::{DslError, DslResult, ParseError};
pub use notes::{NoteCompiler, TargetNames, compile_feature, render_note};
pub use parser::parse_formula;
pub use prereq::{parse_prerequisite, parse_prerequisite_text, prerequisite_rules};

/// Parse formula text as written in content: absent is `null` (pass the
/// source through), numeric text is a literal, anything else an expression.
pub fn parse_rule_formula(text: Option<&str>) -> DslResult<Formula> {
    let Some(text) = text.map(str::trim) else {
        return Ok(Formula::PassThrough);
    };
    if text == "null" {
        return Ok(Formula::PassThrough);
    }
    if let Ok(n) = text.parse::<f64>() {
        return Ok(Formula::Literal(Value::Number(n)));
    }
    parse_formula(text)
        .map(Formula::Expr)
        .map_err(|errors| DslError::Formula {
            text: text.to_string(),
            errors,
        })
}

/// Build an edge from its textual parts.
pub fn parse_rule(target: &str, source: &str, op: &str, formula: Option<&str>) -> DslResult<RuleEdge> {
    let op: Operator = op.parse()?;
    Ok(RuleEdge::new(target, source, op, parse_rule_formula(formula)?))
}

/// Register an edge from its textual parts. Returns `false` for a duplicate.
pub fn define_rule(
    graph: &mut RuleGraph,
    target: &str,
    source: &str,
    op: &str,
    formula: Option<&str>,
) -> DslResult<bool> {
    Ok(graph.define_rule(parse_rule(target, source, op, formula)?))
}
