//! Selection categories the generator can fill.

use std::fmt;
use std::str::FromStr;

use crate::error::MechError;

/// A category of character selections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    /// Setting era (`era`).
    Era,
    /// Race (`race`).
    Race,
    /// Gender (`gender`).
    Gender,
    /// Character name (`name`).
    Name,
    /// Character concept (`concept`), which biases later picks.
    Concept,
    /// Attribute step allocations (`<attr>Allocation`).
    Attributes,
    /// Skill step allocations (`skillAllocation.<Skill>`).
    Skills,
    /// Hindrances (`hindrances.<Name>`).
    Hindrances,
    /// Edges (`edges.<Name>`).
    Edges,
    /// Powers (`powers.<Name>`).
    Powers,
    /// Weapons (`weapons.<Name>`).
    Weapons,
    /// Armor (`armors.<Name>`).
    Armor,
}

impl Category {
    /// Every category, in the order a full character is generated.
    pub const ALL: [Category; 12] = [
        Category::Era,
        Category::Race,
        Category::Gender,
        Category::Name,
        Category::Concept,
        Category::Attributes,
        Category::Skills,
        Category::Hindrances,
        Category::Edges,
        Category::Powers,
        Category::Weapons,
        Category::Armor,
    ];

    /// Lowercase name, as accepted by [`FromStr`].
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Era => "era",
            Category::Race => "race",
            Category::Gender => "gender",
            Category::Name => "name",
            Category::Concept => "concept",
            Category::Attributes => "attributes",
            Category::Skills => "skills",
            Category::Hindrances => "hindrances",
            Category::Edges => "edges",
            Category::Powers => "powers",
            Category::Weapons => "weapons",
            Category::Armor => "armor",
        }
    }

    /// Catalog table the category draws from.
    pub fn table(self) -> Option<&'static str> {
        match self {
            Category::Era => Some("eras"),
            Category::Race => Some("races"),
            Category::Concept => Some("concepts"),
            Category::Attributes => Some("attributes"),
            Category::Skills => Some("skills"),
            Category::Hindrances => Some("hindrances"),
            Category::Edges => Some("edges"),
            Category::Powers => Some("powers"),
            Category::Weapons => Some("weapons"),
            Category::Armor => Some("armors"),
            Category::Gender | Category::Name => None,
        }
    }

    /// Selection key prefix for toggle categories, e.g. `edges.`.
    pub fn toggle_prefix(self) -> Option<&'static str> {
        match self {
            Category::Hindrances => Some("hindrances."),
            Category::Edges => Some("edges."),
            Category::Powers => Some("powers."),
            Category::Weapons => Some("weapons."),
            Category::Armor => Some("armors."),
            _ => None,
        }
    }

    /// Whether the category is assigned directly, without validation.
    pub fn is_direct(self) -> bool {
        matches!(
            self,
            Category::Era | Category::Race | Category::Gender | Category::Name | Category::Concept
        )
    }

    /// Concept field listing preferred names in this category.
    pub fn concept_field(self) -> Option<&'static str> {
        match self {
            Category::Attributes => Some("Attribute"),
            Category::Skills => Some("Skill"),
            Category::Edges => Some("Edge"),
            Category::Powers => Some("Power"),
            _ => None,
        }
    }
}

impl FromStr for Category {
    type Err = MechError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        let normalized = match lower.as_str() {
            "armors" => "armor",
            "races" => "race",
            "eras" => "era",
            "concepts" => "concept",
            other => other,
        };
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| MechError::UnknownCategory(s.to_string()))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        for c in Category::ALL {
            assert_eq!(c.to_string().parse::<Category>().unwrap(), c);
        }
        assert_eq!("Armors".parse::<Category>().unwrap(), Category::Armor);
        assert!(matches!(
            "spells".parse::<Category>(),
            Err(MechError::UnknownCategory(s)) if s == "spells"
        ));
    }

    #[test]
    fn direct_categories_have_no_prefix() {
        for c in Category::ALL.into_iter().filter(|c| c.is_direct()) {
            assert!(c.toggle_prefix().is_none(), "{c}");
        }
    }
}
