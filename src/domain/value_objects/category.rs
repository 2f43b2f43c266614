use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static NON_LETTERS: LazyLock<Regex> = LazyLock::new(|| Regex::new("[^a-z]").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Income,
    Expenses,
    Tax,
    Salary,
    Insurance,
    Receipt,
    Unclear,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Income,
        Category::Expenses,
        Category::Tax,
        Category::Salary,
        Category::Insurance,
        Category::Receipt,
        Category::Unclear,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Income => "income",
            Category::Expenses => "expenses",
            Category::Tax => "tax",
            Category::Salary => "salary",
            Category::Insurance => "insurance",
            Category::Receipt => "receipt",
            Category::Unclear => "unclear",
        }
    }

    /// Normalises a free-form label (as returned by a language model) into a
    /// known category. Anything unrecognised is `Unclear`.
    pub fn from_label(raw: &str) -> Self {
        let lowered = raw.trim().to_lowercase();
        let cleaned = NON_LETTERS.replace_all(&lowered, "");

        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == cleaned)
            .unwrap_or(Category::Unclear)
    }

    pub fn parse_stored(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|category| category.as_str() == value)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
