//! Prerequisite text.
//!
//! A prerequisite is a list of clauses, all of which must hold. Each clause
//! is one or more `||`-joined comparisons:
//!
//! ```text
//! advances >= 4, features.Block || features.Brawler, Sum '^skills[.]' >= 12
//! ```
//!
//! A bare attribute means "is non-zero"; `!attr` means "is zero".

use std::sync::LazyLock;

use regex::Regex;
use sf_core::formula::Formula;
use sf_core::prereq::{AttrRef, Clause, CompareOp, Comparison, Pattern, Prerequisite, Test};
use sf_core::{Operator, RuleEdge, RuleGraph, Value};

use crate::error::{DslError, DslResult};

static OPERATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"==|!=|>=|<=|=~|!~|>|<").expect("valid regex"));

static AGGREGATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(Sum|Max)\s+(?:'([^']*)'|"([^"]*)")\s*(.*)$"#).expect("valid regex")
});

fn error(text: &str, message: impl Into<String>) -> DslError {
    DslError::Prerequisite {
        text: text.to_string(),
        message: message.into(),
    }
}

/// Split `text` on top-level commas, ignoring commas inside quotes or brackets.
pub fn split_top_level(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut depth = 0usize;
    for c in text.chars() {
        match (quote, c) {
            (Some(q), _) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(' | '[') => depth += 1,
            (None, ')' | ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                parts.push(std::mem::take(&mut current));
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    parts.push(current);
    parts
        .into_iter()
        .map(|p| strip_quotes(p.trim()).to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

fn strip_quotes(s: &str) -> &str {
    for q in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(q) && s.ends_with(q) {
            let inner = &s[1..s.len() - 1];
            if !inner.contains(q) {
                return inner;
            }
        }
    }
    s
}

fn literal(raw: &str) -> Value {
    let raw = raw.trim();
    let unquoted = strip_quotes(raw);
    if unquoted.len() != raw.len() {
        return Value::from(unquoted);
    }
    match raw.parse::<f64>() {
        Ok(n) => Value::Number(n),
        Err(_) => Value::from(raw),
    }
}

fn pattern(text: &str, source: &str) -> DslResult<Pattern> {
    Pattern::new(source).map_err(|e| error(text, e.to_string()))
}

fn test(text: &str, op: &str, rhs: &str) -> DslResult<Test> {
    let cmp = match op {
        "=~" => return Ok(Test::Matches(pattern(text, strip_quotes(rhs.trim()))?)),
        "!~" => return Ok(Test::NotMatches(pattern(text, strip_quotes(rhs.trim()))?)),
        "==" => CompareOp::Eq,
        "!=" => CompareOp::Ne,
        ">=" => CompareOp::Ge,
        "<=" => CompareOp::Le,
        ">" => CompareOp::Gt,
        _ => CompareOp::Lt,
    };
    if rhs.trim().is_empty() {
        return Err(error(text, format!("missing value after {op}")));
    }
    Ok(Test::Compare(cmp, literal(rhs)))
}

fn comparison(text: &str) -> DslResult<Comparison> {
    let atom = text.trim();
    if atom.is_empty() {
        return Err(error(text, "empty comparison"));
    }

    if let Some(caps) = AGGREGATE.captures(atom) {
        let source = caps
            .get(2)
            .or_else(|| caps.get(3))
            .map_or("", |m| m.as_str());
        let pat = pattern(text, source)?;
        let attr = if &caps[1] == "Sum" {
            AttrRef::Sum(pat)
        } else {
            AttrRef::Max(pat)
        };
        let rest = caps.get(4).map_or("", |m| m.as_str()).trim();
        let test = match OPERATOR.find(rest) {
            Some(m) if m.start() == 0 => test(text, m.as_str(), &rest[m.end()..])?,
            Some(_) => return Err(error(text, "unexpected text before operator")),
            None if rest.is_empty() => Test::Compare(CompareOp::Ne, Value::Number(0.0)),
            None => return Err(error(text, "expected a comparison operator")),
        };
        return Ok(Comparison { attr, test });
    }

    match OPERATOR.find(atom) {
        Some(m) => {
            let key = atom[..m.start()].trim();
            if key.is_empty() {
                return Err(error(text, "missing attribute before operator"));
            }
            Ok(Comparison {
                attr: AttrRef::Key(key.to_string()),
                test: test(text, m.as_str(), &atom[m.end()..])?,
            })
        }
        None => {
            let (negated, key) = match atom.strip_prefix('!') {
                Some(rest) => (true, rest.trim()),
                None => (false, atom),
            };
            if key.is_empty() {
                return Err(error(text, "missing attribute"));
            }
            let op = if negated { CompareOp::Eq } else { CompareOp::Ne };
            Ok(Comparison {
                attr: AttrRef::Key(key.to_string()),
                test: Test::Compare(op, Value::Number(0.0)),
            })
        }
    }
}

/// Parse one clause: `||`-joined comparisons.
pub fn parse_clause(text: &str) -> DslResult<Clause> {
    let alternatives = text
        .split("||")
        .map(comparison)
        .collect::<DslResult<Vec<_>>>()?;
    Ok(Clause { alternatives })
}

/// Parse a list of clauses, one per item. Items may themselves hold
/// top-level commas, which split further.
pub fn parse_prerequisite<S: AsRef<str>>(items: &[S]) -> DslResult<Prerequisite> {
    let mut clauses = Vec::new();
    for item in items {
        for part in split_top_level(item.as_ref()) {
            let clause = parse_clause(&part)?;
            if !clauses.contains(&clause) {
                clauses.push(clause);
            }
        }
    }
    Ok(Prerequisite { clauses })
}

/// Parse a single prerequisite string such as `"advances >= 4","strength >= 6"`.
pub fn parse_prerequisite_text(text: &str) -> DslResult<Prerequisite> {
    parse_prerequisite(&[text])
}

/// Register a `{section}Notes.{name}` fact that counts the unmet clauses of
/// `tests` whenever `gate` is truthy. An empty gate is unconditional.
///
/// Returns the fact key.
pub fn prerequisite_rules<S: AsRef<str>>(
    graph: &mut RuleGraph,
    section: &str,
    name: &str,
    gate: &str,
    tests: &[S],
) -> DslResult<String> {
    let requirement = parse_prerequisite(tests)?;
    let fact = format!("{section}Notes.{name}");
    if !gate.is_empty() {
        graph.define_rule(RuleEdge::new(&fact, gate, Operator::Gate, Formula::PassThrough));
    }
    for clause in &requirement.clauses {
        let single = Prerequisite {
            clauses: vec![clause.clone()],
        };
        graph.define_rule(RuleEdge::new(&fact, gate, Operator::Add, Formula::Unmet(single)));
    }
    graph.define_requirement(&fact, requirement);
    Ok(fact)
}
