//! Content tables.
//!
//! Each table maps a trait name to a space-separated `Key=Value` attribute
//! list. Values are comma-separated; an item may be double-quoted to carry
//! spaces or commas, with `\"` and `\\` escapes:
//!
//! ```text
//! Type=Edge Require="advances >= 4","strength >= 6" Section=combat Note="+1 Parry"
//! ```

use std::collections::BTreeMap;

use logos::{Lexer, Logos};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// One parsed attribute list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraitEntry {
    fields: BTreeMap<String, Vec<String>>,
}

impl TraitEntry {
    /// Parse an attribute list.
    pub fn parse(text: &str) -> CoreResult<Self> {
        read_entry(text)
    }

    /// All values of a field; empty when the field is absent.
    pub fn values(&self, key: &str) -> &[String] {
        self.fields.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// The first value of a field.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.values(key).first().map(String::as_str)
    }

    /// Whether the field is present.
    pub fn has(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// The first value of a field, which must be numeric if present.
    pub fn number(&self, key: &str) -> CoreResult<Option<f64>> {
        match self.value(key) {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| CoreError::NotANumber {
                    key: key.to_string(),
                    value: raw.to_string(),
                }),
        }
    }

    /// Field names in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    fn push(&mut self, key: &str, value: String) {
        self.fields.entry(key.to_string()).or_default().push(value);
    }
}

/// Tokens of an attribute list.
///
/// A field name carries its `=`; values that contain whitespace, commas,
/// quotes or `=` must be double-quoted.
#[derive(Logos, Debug, Clone, PartialEq)]
enum ListToken {
    #[regex(r"[A-Za-z0-9_]+=", field_name)]
    Field(String),
    #[regex(r#""([^"\\]|\\.)*""#, quoted)]
    Quoted(String),
    #[regex(r#"[^\s,"=]+"#, |lex| lex.slice().to_string())]
    Bare(String),
    #[token(",")]
    Comma,
    #[regex(r"\s+")]
    Space,
}

fn field_name(lex: &mut Lexer<'_, ListToken>) -> String {
    let slice = lex.slice();
    slice[..slice.len() - 1].to_string()
}

fn quoted(lex: &mut Lexer<'_, ListToken>) -> String {
    let slice = lex.slice();
    let mut out = String::with_capacity(slice.len());
    let mut chars = slice[1..slice.len() - 1].chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.extend(chars.next()),
            c => out.push(c),
        }
    }
    out
}

/// What the attribute-list fold expects next.
#[derive(Clone, Copy, PartialEq)]
enum Expect {
    Field,
    Value,
    Separator,
}

fn read_entry(text: &str) -> CoreResult<TraitEntry> {
    let malformed = |offset: usize, message: &str| CoreError::MalformedEntry {
        offset,
        message: message.to_string(),
    };
    let mut entry = TraitEntry::default();
    let mut key = String::new();
    let mut expect = Expect::Field;
    let mut lexer = ListToken::lexer(text);

    while let Some(token) = lexer.next() {
        let offset = lexer.span().start;
        let Ok(token) = token else {
            return Err(if text[offset..].starts_with('"') {
                malformed(offset, "unterminated quoted value")
            } else {
                malformed(offset, &format!("unexpected character {:?}", lexer.slice()))
            });
        };
        expect = match (expect, token) {
            (Expect::Field, ListToken::Space) => Expect::Field,
            (Expect::Field, ListToken::Field(name)) => {
                entry.fields.entry(name.clone()).or_default();
                key = name;
                Expect::Value
            }
            (Expect::Field, _) => return Err(malformed(offset, "expected a field name")),
            (Expect::Value, ListToken::Quoted(value) | ListToken::Bare(value)) => {
                entry.push(&key, value);
                Expect::Separator
            }
            (Expect::Value, ListToken::Comma) => {
                entry.push(&key, String::new());
                Expect::Value
            }
            (Expect::Value, ListToken::Space) => {
                entry.push(&key, String::new());
                Expect::Field
            }
            (Expect::Value, ListToken::Field(_)) => {
                return Err(malformed(offset, "expected a value"));
            }
            (Expect::Separator, ListToken::Comma) => Expect::Value,
            (Expect::Separator, ListToken::Space) => Expect::Field,
            (Expect::Separator, _) => return Err(malformed(offset, "expected ',' or whitespace")),
        };
    }
    if expect == Expect::Value {
        entry.push(&key, String::new());
    }
    Ok(entry)
}

/// A content entry that could not be read.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedEntry {
    /// Table the entry came from.
    pub table: String,
    /// Trait name.
    pub name: String,
    /// Why it was rejected.
    pub reason: String,
}

/// All content tables, keyed by table name then trait name.
#[derive(Debug, Clone, Default)]
pub struct ContentCatalog {
    tables: BTreeMap<String, BTreeMap<String, TraitEntry>>,
    rejected: Vec<RejectedEntry>,
}

impl ContentCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a JSON object of tables of attribute-list strings.
    ///
    /// Entries whose attribute list is malformed are logged and recorded
    /// in [`ContentCatalog::rejected`]; only a structurally invalid
    /// document is an error.
    pub fn from_json(json: &str) -> CoreResult<Self> {
        let raw: BTreeMap<String, BTreeMap<String, String>> = serde_json::from_str(json)?;
        let mut catalog = Self::new();
        for (table, entries) in raw {
            for (name, text) in entries {
                if let Err(e) = catalog.insert_text(&table, &name, &text) {
                    tracing::warn!(%table, %name, error = %e, "skipping malformed content entry");
                    catalog.rejected.push(RejectedEntry {
                        table: table.clone(),
                        name,
                        reason: e.to_string(),
                    });
                }
            }
            catalog.tables.entry(table).or_default();
        }
        Ok(catalog)
    }

    /// Parse and insert (or replace) one entry.
    pub fn insert_text(&mut self, table: &str, name: &str, text: &str) -> CoreResult<()> {
        let entry = TraitEntry::parse(text)?;
        self.insert(table, name, entry);
        Ok(())
    }

    /// Insert (or replace) one entry.
    pub fn insert(&mut self, table: &str, name: &str, entry: TraitEntry) {
        self.tables
            .entry(table.to_string())
            .or_default()
            .insert(name.to_string(), entry);
    }

    /// A whole table.
    pub fn table(&self, table: &str) -> Option<&BTreeMap<String, TraitEntry>> {
        self.tables.get(table)
    }

    /// One entry.
    pub fn entry(&self, table: &str, name: &str) -> Option<&TraitEntry> {
        self.tables.get(table)?.get(name)
    }

    /// Whether a table holds `name`.
    pub fn contains(&self, table: &str, name: &str) -> bool {
        self.entry(table, name).is_some()
    }

    /// Entry names of a table, sorted. Empty for an unknown table.
    pub fn names(&self, table: &str) -> Vec<&str> {
        self.tables
            .get(table)
            .map(|t| t.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Table names, sorted.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Entries that failed to parse while loading.
    pub fn rejected(&self) -> &[RejectedEntry] {
        &self.rejected
    }
}
