//! The fixed skill taxonomy.
//!
//! Every skill ends up with exactly one [`Category`]. The label set is
//! closed: anything a model returns outside of it is coerced to
//! [`Category::Other`] by [`Category::coerce`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One of the 18 skill categories. Declaration order is the order presented
/// to the language model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Category {
    ProgrammingLanguage,
    FrameworkLibrary,
    Database,
    CloudPlatform,
    DevOpsCiCd,
    OperatingSystem,
    TestingTool,
    VersionControl,
    WebTechnology,
    MobileDevelopment,
    DataScienceMl,
    Networking,
    Security,
    MethodologyPractice,
    BusinessTool,
    LanguageSkill,
    SoftSkill,
    Other,
}

impl Category {
    pub const ALL: [Category; 18] = [
        Category::ProgrammingLanguage,
        Category::FrameworkLibrary,
        Category::Database,
        Category::CloudPlatform,
        Category::DevOpsCiCd,
        Category::OperatingSystem,
        Category::TestingTool,
        Category::VersionControl,
        Category::WebTechnology,
        Category::MobileDevelopment,
        Category::DataScienceMl,
        Category::Networking,
        Category::Security,
        Category::MethodologyPractice,
        Category::BusinessTool,
        Category::LanguageSkill,
        Category::SoftSkill,
        Category::Other,
    ];

    /// The label as stored in the database and shown to the model.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::ProgrammingLanguage => "Programming Language",
            Category::FrameworkLibrary => "Framework/Library",
            Category::Database => "Database",
            Category::CloudPlatform => "Cloud Platform",
            Category::DevOpsCiCd => "DevOps/CI-CD",
            Category::OperatingSystem => "Operating System",
            Category::TestingTool => "Testing Tool",
            Category::VersionControl => "Version Control",
            Category::WebTechnology => "Web Technology",
            Category::MobileDevelopment => "Mobile Development",
            Category::DataScienceMl => "Data Science/ML",
            Category::Networking => "Networking",
            Category::Security => "Security",
            Category::MethodologyPractice => "Methodology/Practice",
            Category::BusinessTool => "Business Tool",
            Category::LanguageSkill => "Language Skill",
            Category::SoftSkill => "Soft Skill",
            Category::Other => "Other",
        }
    }

    /// Exact label lookup. Surrounding whitespace is ignored, case is not.
    pub fn from_label(label: &str) -> Option<Category> {
        let label = label.trim();
        Category::ALL.into_iter().find(|c| c.as_str() == label)
    }

    /// Map any label onto the taxonomy. The flag is `true` when the label
    /// was not recognised and fell through to [`Category::Other`].
    pub fn coerce(label: &str) -> (Category, bool) {
        match Category::from_label(label) {
            Some(c) => (c, false),
            None => (Category::Other, true),
        }
    }

    /// All labels joined with `", "`, in declaration order.
    pub fn label_list() -> String {
        Category::ALL
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown skill category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::from_label(s).ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

impl TryFrom<String> for Category {
    type Error = UnknownCategory;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Category> for String {
    fn from(c: Category) -> Self {
        c.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_has_eighteen_labels_ending_in_other() {
        assert_eq!(Category::ALL.len(), 18);
        assert_eq!(Category::ALL[17], Category::Other);
        assert_eq!(Category::ALL[0].as_str(), "Programming Language");
    }

    #[test]
    fn labels_round_trip_through_from_label() {
        for c in Category::ALL {
            assert_eq!(Category::from_label(c.as_str()), Some(c));
        }
    }

    #[test]
    fn from_label_trims_but_is_case_sensitive() {
        assert_eq!(Category::from_label("  Database \n"), Some(Category::Database));
        assert_eq!(Category::from_label("database"), None);
    }

    #[test]
    fn coerce_unknown_label_to_other() {
        assert_eq!(Category::coerce("Quantum Computing"), (Category::Other, true));
        assert_eq!(Category::coerce("Security"), (Category::Security, false));
        assert_eq!(Category::coerce("Other"), (Category::Other, false));
    }

    #[test]
    fn label_list_is_comma_joined_in_order() {
        let list = Category::label_list();
        assert!(list.starts_with("Programming Language, Framework/Library, Database"));
        assert!(list.ends_with("Soft Skill, Other"));
    }

    #[test]
    fn serde_uses_display_labels() {
        let json = serde_json::to_string(&Category::DevOpsCiCd).unwrap();
        assert_eq!(json, "\"DevOps/CI-CD\"");
        let back: Category = serde_json::from_str("\"Data Science/ML\"").unwrap();
        assert_eq!(back, Category::DataScienceMl);
        assert!(serde_json::from_str::<Category>("\"Astrology\"").is_err());
    }
}
