use sf_core::{Scope, Snapshot};

use super::first_expression_ref;
use crate::parser::parse_formula;

/// Render a compiled note as plain text.
///
/// Returns `None` when the note is inactive (its key is absent from the
/// snapshot). `%V` is the note's own value, `%1`..`%9` its numbered
/// sub-attributes, `%{expr}` the value computed for that placeholder, and
/// `%%` a literal percent sign. Values that cannot be resolved print as `?`.
pub fn render_note(text: &str, note_key: &str, snapshot: &Snapshot) -> Option<String> {
    let own = snapshot.get(note_key)?;
    let mut out = String::with_capacity(text.len());
    let mut next_ref = first_expression_ref(text);
    let mut rest = text;

    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let mut chars = after.chars();
        match chars.next() {
            Some('%') => {
                out.push('%');
                rest = &after[1..];
            }
            Some('V') => {
                out.push_str(&own.to_string());
                rest = &after[1..];
            }
            Some(d @ '1'..='9') => {
                let key = format!("{note_key}.{d}");
                out.push_str(&lookup(snapshot, &key));
                rest = &after[1..];
            }
            Some('{') => match after.find('}') {
                Some(close) => {
                    let key = format!("{note_key}.{next_ref}");
                    next_ref += 1;
                    let value = match snapshot.get(&key) {
                        Some(v) => v.to_string(),
                        None => evaluate(&after[1..close], snapshot),
                    };
                    out.push_str(&value);
                    rest = &after[close + 1..];
                }
                None => {
                    out.push('%');
                    rest = after;
                }
            },
            _ => {
                out.push('%');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    Some(out)
}

fn lookup(snapshot: &Snapshot, key: &str) -> String {
    snapshot
        .get(key)
        .map_or_else(|| "?".to_string(), ToString::to_string)
}

fn evaluate(expr: &str, snapshot: &Snapshot) -> String {
    parse_formula(expr)
        .ok()
        .and_then(|e| e.eval(&Scope::new(None, snapshot)))
        .map_or_else(|| "?".to_string(), |v| v.to_string())
}
