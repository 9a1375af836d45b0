//! Core types for Statforge: values, selection sets, rule graphs, and the
//! expression languages that drive derived character statistics.
//!
//! This crate is independent of any text front end. Formulas and
//! prerequisites are represented as small sealed ASTs evaluated by tree
//! walking; the `sf-dsl` crate parses text into them. A [`RuleGraph`] is
//! append-only and can be shared read-only across characters.

/// Content tables and the `Key=Value` attribute-list reader.
pub mod catalog;
/// Reference host evaluator: topological fixed-point pass over a rule graph.
pub mod engine;
/// Error types used throughout the crate.
pub mod error;
/// Formula AST and its tree-walking interpreter.
pub mod formula;
/// Rule edges, operators, and the append-only rule graph.
pub mod graph;
/// Prerequisite expressions and their evaluator.
pub mod prereq;
/// Selection sets (raw input) and attribute snapshots (computed output).
pub mod selection;
/// Scalar attribute values.
pub mod value;

/// Re-export catalog types.
pub use catalog::{ContentCatalog, TraitEntry};
/// Re-export the evaluator contract.
pub use engine::GraphEvaluator;
/// Re-export error types.
pub use error::{CoreError, CoreResult};
/// Re-export formula types.
pub use formula::{BinaryOp, Expr, Formula, Scope, UnaryOp};
/// Re-export graph types.
pub use graph::{Operator, RuleEdge, RuleGraph};
/// Re-export prerequisite types.
pub use prereq::{AttrRef, Clause, CompareOp, Comparison, Pattern, Prerequisite, Test};
/// Re-export selection types.
pub use selection::{Selection, Snapshot};
/// Re-export the value type.
pub use value::Value;
