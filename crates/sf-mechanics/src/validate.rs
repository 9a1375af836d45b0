//! Validation of a content catalog.
//!
//! Reports the entries the ruleset builder would skip, plus dangling
//! references between tables that would silently weaken the rules.

use sf_core::{ContentCatalog, TraitEntry};

use crate::error::MechError;
use crate::rules::traits::{KNOWN_TABLES, check_entry};

/// A warning or error found in content.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentIssue {
    /// Catalog table.
    pub table: String,
    /// Entry name, empty for table-level issues.
    pub entry: String,
    /// A human-readable description of the issue.
    pub message: String,
    /// Whether this is an error (true) or a warning (false).
    pub is_error: bool,
}

impl ContentIssue {
    fn warning(table: &str, entry: &str, message: impl Into<String>) -> Self {
        Self {
            table: table.to_string(),
            entry: entry.to_string(),
            message: message.into(),
            is_error: false,
        }
    }

    /// An error issue for an entry that was skipped because of `error`.
    pub fn from_error(table: &str, entry: &str, error: &MechError) -> Self {
        let message = match error {
            MechError::InvalidEntry { message, .. } => message.clone(),
            other => other.to_string(),
        };
        Self {
            table: table.to_string(),
            entry: entry.to_string(),
            message,
            is_error: true,
        }
    }
}

impl std::fmt::Display for ContentIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = if self.is_error { "error" } else { "warning" };
        if self.entry.is_empty() {
            write!(f, "{level}: {}: {}", self.table, self.message)
        } else {
            write!(f, "{level}: {} '{}': {}", self.table, self.entry, self.message)
        }
    }
}

/// Validate a catalog.
///
/// Returns every issue found: errors first in table order, then warnings.
/// An empty list means every entry registers cleanly.
pub fn validate_catalog(catalog: &ContentCatalog) -> Vec<ContentIssue> {
    let mut issues: Vec<ContentIssue> = catalog
        .rejected()
        .iter()
        .map(|r| ContentIssue {
            table: r.table.clone(),
            entry: r.name.clone(),
            message: r.reason.clone(),
            is_error: true,
        })
        .collect();

    for table in KNOWN_TABLES {
        for (name, entry) in catalog.table(table).into_iter().flatten() {
            if let Err(e) = check_entry(table, name, entry) {
                issues.push(ContentIssue::from_error(table, name, &e));
            }
        }
    }

    let mut warnings = Vec::new();
    for table in catalog.table_names() {
        if !KNOWN_TABLES.iter().any(|known| *known == table) {
            warnings.push(ContentIssue::warning(table, "", "unknown table; its entries are ignored"));
        }
    }
    if catalog.names("attributes").is_empty() {
        warnings.push(ContentIssue::warning("attributes", "", "no attributes defined"));
    }
    validate_skills(catalog, &mut warnings);
    validate_races(catalog, &mut warnings);
    validate_weapons(catalog, &mut warnings);
    validate_concepts(catalog, &mut warnings);

    issues.extend(warnings);
    issues
}

fn entries<'a>(catalog: &'a ContentCatalog, table: &str) -> impl Iterator<Item = (&'a String, &'a TraitEntry)> {
    catalog.table(table).into_iter().flatten()
}

fn validate_skills(catalog: &ContentCatalog, issues: &mut Vec<ContentIssue>) {
    for (name, entry) in entries(catalog, "skills") {
        match entry.value("Attribute") {
            None => issues.push(ContentIssue::warning(
                "skills",
                name,
                "no linked Attribute; steps above d4 cost one point each",
            )),
            Some(attr) if !catalog.contains("attributes", attr) => issues.push(
                ContentIssue::warning("skills", name, format!("unknown attribute '{attr}'")),
            ),
            Some(_) => {}
        }
    }
}

fn validate_races(catalog: &ContentCatalog, issues: &mut Vec<ContentIssue>) {
    let known = |feature: &str| {
        ["features", "edges", "hindrances"]
            .iter()
            .any(|t| catalog.contains(t, feature))
    };
    for (name, entry) in entries(catalog, "races") {
        for feature in entry.values("Features") {
            if !known(feature) {
                issues.push(ContentIssue::warning(
                    "races",
                    name,
                    format!("feature '{feature}' has no catalog entry"),
                ));
            }
        }
    }
}

fn validate_weapons(catalog: &ContentCatalog, issues: &mut Vec<ContentIssue>) {
    for (name, entry) in entries(catalog, "weapons") {
        for era in entry.values("Era") {
            if !catalog.contains("eras", era) {
                issues.push(ContentIssue::warning(
                    "weapons",
                    name,
                    format!("unknown era '{era}'"),
                ));
            }
        }
    }
}

fn validate_concepts(catalog: &ContentCatalog, issues: &mut Vec<ContentIssue>) {
    const FIELDS: [(&str, &str); 4] = [
        ("Attribute", "attributes"),
        ("Skill", "skills"),
        ("Edge", "edges"),
        ("Power", "powers"),
    ];
    for (name, entry) in entries(catalog, "concepts") {
        for (field, table) in FIELDS {
            for item in entry.values(field) {
                if !catalog.contains(table, item) {
                    issues.push(ContentIssue::warning(
                        "concepts",
                        name,
                        format!("{field} '{item}' is not in {table}"),
                    ));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(json: &str) -> ContentCatalog {
        ContentCatalog::from_json(json).unwrap()
    }

    #[test]
    fn sample_catalog_is_clean() {
        let issues = validate_catalog(&catalog(crate::rules::SAMPLE_CATALOG));
        assert!(issues.is_empty(), "{issues:?}");
    }

    #[test]
    fn errors_come_before_warnings() {
        let c = catalog(
            r#"{
                "attributes": {"Agility": ""},
                "skills": {"Fighting": "Attribute=Agility", "Lore": "Attribute=Wits"},
                "edges": {"Odd": "Section=combat,arcane Note=\"+1 Parry\"", "Broken": "Require=\"oops"},
                "gadgets": {"Widget": ""}
            }"#,
        );
        let issues = validate_catalog(&c);
        let lines: Vec<String> = issues.iter().map(ToString::to_string).collect();
        assert_eq!(lines.len(), 4, "{lines:#?}");
        assert!(lines[0].starts_with("error: edges 'Broken': "));
        assert_eq!(lines[1], "error: edges 'Odd': Odd: 2 section(s) but 1 note(s)");
        assert_eq!(lines[2], "warning: gadgets: unknown table; its entries are ignored");
        assert_eq!(lines[3], "warning: skills 'Lore': unknown attribute 'Wits'");
    }

    #[test]
    fn dangling_references_are_warnings() {
        let c = catalog(
            r#"{
                "attributes": {"Agility": ""},
                "races": {"Elf": "Features=Graceful"},
                "weapons": {"Laser": "Era=Future"},
                "concepts": {"Thief": "Attribute=Agility Skill=Stealth"}
            }"#,
        );
        let issues = validate_catalog(&c);
        assert!(issues.iter().all(|i| !i.is_error));
        let messages: Vec<&str> = issues.iter().map(|i| i.message.as_str()).collect();
        assert_eq!(
            messages,
            [
                "feature 'Graceful' has no catalog entry",
                "unknown era 'Future'",
                "Skill 'Stealth' is not in skills",
            ]
        );
    }
}
