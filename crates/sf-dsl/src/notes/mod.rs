//! The note-template compiler.
//!
//! A trait's notes are human-readable strings such as
//! `"+2 Agility step/+1 Benny each session"`. Each note becomes a renderable
//! attribute gated on the trait's feature key, and every `/`-separated
//! clause is offered to an ordered list of `(Pattern, Extractor)` pairs that
//! turn recognized phrasing into rule edges. Unrecognized clauses are
//! render-only.

mod extract;
mod render;
mod target;

use std::sync::LazyLock;

use regex::Regex;
use sf_core::formula::Formula;
use sf_core::{Operator, RuleEdge, RuleGraph};

pub use extract::{
    COUNT_PATTERN, CountExtractor, DELTA_PATTERN, DeltaExtractor, EXPRESSION_PATTERN,
    ExpressionExtractor, Extractor, NoteContext,
};
use extract::PendingDeltas;
pub use render::render_note;
pub use target::{TargetNames, attribute_key};

use crate::error::{DslError, DslResult};

static EXPLICIT_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%([1-9])").expect("valid regex"));

/// Index given to the first `%{expr}` placeholder in `text`: one past the
/// highest explicit `%n`.
pub(crate) fn first_expression_ref(text: &str) -> usize {
    EXPLICIT_REF
        .captures_iter(text)
        .filter_map(|c| c[1].parse::<usize>().ok())
        .max()
        .unwrap_or(0)
        + 1
}

/// Key of a trait's note in `section`: `combat` and `Fleet-Footed` give
/// `combatNotes.fleetFooted`.
pub fn note_key(section: &str, name: &str) -> String {
    format!("{section}Notes.{}", attribute_key(name))
}

/// Split a note on `/`, leaving slashes inside `%{...}` alone.
pub fn split_clauses(note: &str) -> Vec<&str> {
    let mut clauses = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in note.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            '/' if depth == 0 => {
                clauses.push(&note[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    clauses.push(&note[start..]);
    clauses
}

/// Compiles trait notes into rule edges.
pub struct NoteCompiler {
    extractors: Vec<(Regex, Box<dyn Extractor>)>,
}

impl Default for NoteCompiler {
    fn default() -> Self {
        Self::empty()
            .with_extractor(COUNT_PATTERN.clone(), CountExtractor)
            .with_extractor(EXPRESSION_PATTERN.clone(), ExpressionExtractor)
            .with_extractor(DELTA_PATTERN.clone(), DeltaExtractor)
    }
}

impl NoteCompiler {
    /// The standard extractors: count, expression reference, delta.
    pub fn new() -> Self {
        Self::default()
    }

    /// A compiler with no extractors; every clause is render-only.
    pub fn empty() -> Self {
        Self {
            extractors: Vec::new(),
        }
    }

    /// Append an extractor, tried after the existing ones.
    pub fn with_extractor(mut self, pattern: Regex, extractor: impl Extractor + 'static) -> Self {
        self.extractors.push((pattern, Box::new(extractor)));
        self
    }

    /// Compile one trait's `(section, note)` pairs into `graph`.
    ///
    /// Returns the number of edges added; recompiling the same trait adds
    /// none.
    pub fn compile_feature<S: AsRef<str>, N: AsRef<str>>(
        &self,
        graph: &mut RuleGraph,
        names: &TargetNames,
        name: &str,
        sections: &[S],
        notes: &[N],
    ) -> DslResult<usize> {
        if sections.len() != notes.len() {
            return Err(DslError::MismatchedNotes {
                name: name.to_string(),
                sections: sections.len(),
                notes: notes.len(),
            });
        }
        let gate = format!("features.{name}");
        let mut added = 0;
        let mut deltas = PendingDeltas::default();
        for (section, note) in sections.iter().zip(notes) {
            let (section, note) = (section.as_ref(), note.as_ref());
            let key = note_key(section, name);
            let op = if note.contains("%V") {
                Operator::Gate
            } else {
                Operator::Set
            };
            if graph.define_rule(RuleEdge::new(&key, &gate, op, Formula::PassThrough)) {
                added += 1;
            }
            graph.define_note(&key, note);

            let mut ctx = NoteContext::new(
                graph,
                names,
                &mut deltas,
                key.clone(),
                gate.clone(),
                first_expression_ref(note),
            );
            for clause in split_clauses(note).into_iter().map(str::trim) {
                if clause.is_empty() {
                    continue;
                }
                match self.extractors.iter().find_map(|(re, ex)| re.captures(clause).map(|c| (ex, c))) {
                    Some((extractor, caps)) => {
                        tracing::trace!(note = %key, clause, extractor = extractor.name(), "clause matched");
                        extractor.extract(&mut ctx, &caps, clause);
                    }
                    None => tracing::trace!(note = %key, clause, "render-only clause"),
                }
            }
            added += ctx.added();
        }
        added += deltas.emit(graph);
        Ok(added)
    }
}

/// Compile a trait's notes with the standard extractors.
pub fn compile_feature<S: AsRef<str>, N: AsRef<str>>(
    graph: &mut RuleGraph,
    names: &TargetNames,
    name: &str,
    sections: &[S],
    notes: &[N],
) -> DslResult<usize> {
    NoteCompiler::default().compile_feature(graph, names, name, sections, notes)
}
