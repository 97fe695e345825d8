//! Problem categories and their fixed severity weights.
//!
//! The category strings are a contract with every report-submission client,
//! so unrecognised values are kept verbatim instead of being rejected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a reported problem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Water,
    Electricity,
    Road,
    Garbage,
    Drainage,
    Other,
    /// Any value a client sent that is not in the table above.
    Unknown(String),
}

impl Category {
    /// Severity weight used by the priority score.
    ///
    /// Unknown categories weigh the same as [`Category::Other`].
    pub fn severity(&self) -> u32 {
        match self {
            Category::Water | Category::Electricity => 3,
            Category::Road | Category::Garbage | Category::Drainage => 2,
            Category::Other | Category::Unknown(_) => 1,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Category::Water => "water",
            Category::Electricity => "electricity",
            Category::Road => "road",
            Category::Garbage => "garbage",
            Category::Drainage => "drainage",
            Category::Other => "other",
            Category::Unknown(raw) => raw,
        }
    }
}

impl From<&str> for Category {
    fn from(raw: &str) -> Self {
        match raw {
            "water" => Category::Water,
            "electricity" => Category::Electricity,
            "road" => Category::Road,
            "garbage" => Category::Garbage,
            "drainage" => Category::Drainage,
            "other" => Category::Other,
            _ => Category::Unknown(raw.to_string()),
        }
    }
}

impl From<String> for Category {
    fn from(raw: String) -> Self {
        Category::from(raw.as_str())
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.as_str().to_string()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_table() {
        assert_eq!(Category::Water.severity(), 3);
        assert_eq!(Category::Electricity.severity(), 3);
        assert_eq!(Category::Road.severity(), 2);
        assert_eq!(Category::Garbage.severity(), 2);
        assert_eq!(Category::Drainage.severity(), 2);
        assert_eq!(Category::Other.severity(), 1);
    }

    #[test]
    fn unknown_category_keeps_raw_value_and_default_weight() {
        let category = Category::from("potholes");
        assert_eq!(category, Category::Unknown("potholes".into()));
        assert_eq!(category.severity(), Category::Other.severity());
        assert_eq!(category.to_string(), "potholes");
    }

    #[test]
    fn category_matching_is_case_sensitive() {
        // Clients send lowercase; anything else falls through to the default.
        assert_eq!(Category::from("Water").severity(), 1);
    }

    #[test]
    fn serde_uses_plain_strings() {
        let json = serde_json::to_string(&Category::Drainage).unwrap();
        assert_eq!(json, "\"drainage\"");
        let parsed: Category = serde_json::from_str("\"sidewalk\"").unwrap();
        assert_eq!(parsed, Category::Unknown("sidewalk".into()));
    }
}
