//! Buckets a message into one of the four inbox tabs.
//!
//! Classification walks an ordered list of rules and stops at the first
//! match. Gmail's own `CATEGORY_*` labels come first, then case-insensitive
//! keyword heuristics over the sender and subject. Anything left over is
//! [`Category::Primary`].

use std::str::FromStr;

use lib_email_clients::gmail::{
    CATEGORY_FORUMS, CATEGORY_INBOX, CATEGORY_PERSONAL, CATEGORY_PROMOTIONS, CATEGORY_SOCIAL,
    CATEGORY_UPDATES,
};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Category {
    Primary,
    Social,
    Promotions,
    Updates,
}

/// Category requested by the caller; `all` disables filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryFilter {
    All,
    Only(Category),
}

impl Default for CategoryFilter {
    fn default() -> Self {
        CategoryFilter::Only(Category::Primary)
    }
}

impl CategoryFilter {
    pub fn matches(&self, category: Category) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(c) => *c == category,
        }
    }

    pub fn category(&self) -> Option<Category> {
        match self {
            CategoryFilter::All => None,
            CategoryFilter::Only(c) => Some(*c),
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = strum::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(CategoryFilter::All),
            other => Category::from_str(other).map(CategoryFilter::Only),
        }
    }
}

/// The parts of a message the classifier looks at
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageTraits<'a> {
    pub labels: &'a [String],
    pub from: &'a str,
    pub subject: &'a str,
}

/// Keyword heuristic as written in `config.toml`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KeywordRule {
    pub category: Category,
    #[serde(default)]
    pub from: Vec<String>,
    #[serde(default)]
    pub subject: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleMatcher {
    /// Any of these provider labels is present
    AnyLabel(Vec<String>),
    /// Sender contains any of `from`, or subject contains any of `subject`.
    /// Keywords are stored lowercase.
    Keywords {
        from: Vec<String>,
        subject: Vec<String>,
    },
}

impl RuleMatcher {
    fn matches(&self, message: &MessageTraits<'_>, from: &str, subject: &str) -> bool {
        match self {
            RuleMatcher::AnyLabel(labels) => {
                message.labels.iter().any(|l| labels.iter().any(|x| x == l))
            }
            RuleMatcher::Keywords {
                from: from_keywords,
                subject: subject_keywords,
            } => {
                from_keywords.iter().any(|k| from.contains(k.as_str()))
                    || subject_keywords.iter().any(|k| subject.contains(k.as_str()))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRule {
    pub matcher: RuleMatcher,
    pub category: Category,
}

impl CategoryRule {
    pub fn labels(labels: &[&str], category: Category) -> Self {
        Self {
            matcher: RuleMatcher::AnyLabel(labels.iter().map(|l| l.to_string()).collect()),
            category,
        }
    }

    pub fn keywords(from: &[&str], subject: &[&str], category: Category) -> Self {
        Self::from(KeywordRule {
            category,
            from: from.iter().map(|k| k.to_string()).collect(),
            subject: subject.iter().map(|k| k.to_string()).collect(),
        })
    }
}

impl From<KeywordRule> for CategoryRule {
    fn from(rule: KeywordRule) -> Self {
        let lower = |keywords: Vec<String>| {
            keywords
                .into_iter()
                .map(|k| k.to_lowercase())
                .filter(|k| !k.is_empty())
                .collect::<Vec<_>>()
        };
        Self {
            matcher: RuleMatcher::Keywords {
                from: lower(rule.from),
                subject: lower(rule.subject),
            },
            category: rule.category,
        }
    }
}

fn label_rules() -> Vec<CategoryRule> {
    vec![
        CategoryRule::labels(&[CATEGORY_PERSONAL, CATEGORY_INBOX], Category::Primary),
        CategoryRule::labels(&[CATEGORY_SOCIAL], Category::Social),
        CategoryRule::labels(&[CATEGORY_PROMOTIONS], Category::Promotions),
        CategoryRule::labels(&[CATEGORY_UPDATES, CATEGORY_FORUMS], Category::Updates),
    ]
}

fn default_keyword_rules() -> Vec<CategoryRule> {
    vec![
        CategoryRule::keywords(
            &["linkedin", "facebook", "twitter", "instagram", "social"],
            &["connection request", "followed you", "network"],
            Category::Social,
        ),
        CategoryRule::keywords(
            &["marketing", "newsletter", "promotions", "sale"],
            &["offer", "discount", "deal", "% off", "sale", "limited time"],
            Category::Promotions,
        ),
        CategoryRule::keywords(
            &["no-reply", "noreply", "notification", "updates", "alert", "info@"],
            &["update", "alert", "notification", "confirm", "receipt", "statement"],
            Category::Updates,
        ),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classifier {
    rules: Vec<CategoryRule>,
}

impl Default for Classifier {
    fn default() -> Self {
        DEFAULT_CLASSIFIER.clone()
    }
}

static DEFAULT_CLASSIFIER: Lazy<Classifier> = Lazy::new(|| Classifier::new(default_keyword_rules()));

impl Classifier {
    /// Label rules followed by `keyword_rules`, in order.
    pub fn new(keyword_rules: Vec<CategoryRule>) -> Self {
        let mut rules = label_rules();
        rules.extend(keyword_rules);
        Self { rules }
    }

    pub fn from_heuristics(heuristics: Option<Vec<KeywordRule>>) -> Self {
        match heuristics {
            Some(rules) => Self::new(rules.into_iter().map(CategoryRule::from).collect()),
            None => Self::default(),
        }
    }

    pub fn classify(&self, message: &MessageTraits<'_>) -> Category {
        let from = message.from.to_lowercase();
        let subject = message.subject.to_lowercase();

        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(message, &from, &subject))
            .map_or(Category::Primary, |rule| rule.category)
    }
}
