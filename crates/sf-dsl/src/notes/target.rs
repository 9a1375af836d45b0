//! Canonical attribute keys for note target phrases.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use sf_core::RuleGraph;

static PARENTHETICAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\([^)]*\)\s*$").expect("valid regex"));

/// Convert a display name to an attribute key: first character lowercased,
/// every non-alphanumeric character dropped, following words capitalized.
///
/// `Fleet-Footed` becomes `fleetFooted`, `power points` becomes `powerPoints`.
pub fn attribute_key(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for c in name.chars() {
        if !c.is_alphanumeric() {
            upper_next = !out.is_empty();
            continue;
        }
        if out.is_empty() {
            out.extend(c.to_lowercase());
        } else if upper_next {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        upper_next = false;
    }
    out
}

/// The names a target phrase can resolve against.
#[derive(Debug, Clone, Default)]
pub struct TargetNames {
    attributes: BTreeSet<String>,
    skills: BTreeSet<String>,
    stats: BTreeSet<String>,
}

impl TargetNames {
    /// Create an empty name set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute such as `Agility`.
    pub fn with_attribute(mut self, name: &str) -> Self {
        self.attributes.insert(name.to_lowercase());
        self
    }

    /// Add a skill such as `Common Knowledge`.
    pub fn with_skill(mut self, name: &str) -> Self {
        self.skills.insert(name.to_string());
        self
    }

    /// Add a derived statistic key such as `parry`.
    pub fn with_stat(mut self, key: &str) -> Self {
        self.stats.insert(key.to_string());
        self
    }

    fn skill(&self, phrase: &str) -> Option<&str> {
        self.skills
            .iter()
            .find(|s| s.eq_ignore_ascii_case(phrase))
            .map(String::as_str)
    }

    fn attribute(&self, phrase: &str) -> Option<String> {
        let lower = phrase.to_lowercase();
        self.attributes.contains(&lower).then_some(lower)
    }

    /// Resolve a target phrase to an attribute key.
    ///
    /// Precedence: `<X> step` (skill then attribute), skill modifier,
    /// attribute modifier, then a camel-cased key that is a known statistic
    /// or an existing graph target. Anything else is unrecognized.
    pub fn canonicalize(&self, phrase: &str, graph: &RuleGraph) -> Option<String> {
        let phrase = PARENTHETICAL.replace(phrase.trim(), "");
        let phrase = phrase.trim().trim_end_matches('.');

        let cut = phrase.len().saturating_sub(" step".len());
        let stepped = phrase
            .get(cut..)
            .is_some_and(|s| cut > 0 && s.eq_ignore_ascii_case(" step"));
        if stepped {
            let base = phrase.get(..cut).unwrap_or_default().trim();
            if let Some(skill) = self.skill(base) {
                return Some(format!("skillStep.{skill}"));
            }
            return self.attribute(base).map(|a| format!("{a}Step"));
        }
        if let Some(skill) = self.skill(phrase) {
            return Some(format!("skillModifier.{skill}"));
        }
        if let Some(attr) = self.attribute(phrase) {
            return Some(format!("{attr}Modifier"));
        }
        let key = attribute_key(phrase);
        (!key.is_empty() && (self.stats.contains(&key) || graph.has_target(&key))).then_some(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> TargetNames {
        TargetNames::new()
            .with_attribute("Agility")
            .with_attribute("Strength")
            .with_skill("Fighting")
            .with_skill("Common Knowledge")
            .with_stat("parry")
            .with_stat("powerPoints")
    }

    #[test]
    fn attribute_keys() {
        assert_eq!(attribute_key("Fleet-Footed"), "fleetFooted");
        assert_eq!(attribute_key("Power Points"), "powerPoints");
        assert_eq!(attribute_key("Arcane Background (Magic)"), "arcaneBackgroundMagic");
        assert_eq!(attribute_key("Nerves Of Steel"), "nervesOfSteel");
    }

    #[test]
    fn precedence() {
        let g = RuleGraph::new();
        let n = names();
        assert_eq!(n.canonicalize("Agility step", &g).as_deref(), Some("agilityStep"));
        assert_eq!(n.canonicalize("Fighting step", &g).as_deref(), Some("skillStep.Fighting"));
        assert_eq!(n.canonicalize("fighting", &g).as_deref(), Some("skillModifier.Fighting"));
        assert_eq!(
            n.canonicalize("Common Knowledge (rolls about elves)", &g).as_deref(),
            Some("skillModifier.Common Knowledge")
        );
        assert_eq!(n.canonicalize("Strength", &g).as_deref(), Some("strengthModifier"));
        assert_eq!(n.canonicalize("Parry.", &g).as_deref(), Some("parry"));
        assert_eq!(n.canonicalize("Power Points", &g).as_deref(), Some("powerPoints"));
    }

    #[test]
    fn unknown_phrases_are_unrecognized() {
        let g = RuleGraph::new();
        assert_eq!(names().canonicalize("Benny each session", &g), None);
        assert_eq!(names().canonicalize("Spirit step", &g), None);
        assert_eq!(names().canonicalize("", &g), None);
    }
}
