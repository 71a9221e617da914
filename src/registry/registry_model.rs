use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dom::dom_model::{Document, NodeId};
use crate::dom::selector::{SelectorError, SelectorList};

// ============================================================================
// Region names
// ============================================================================

/// Logical area of interest on the host page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RegionName {
    Feed,
    Reels,
    Stories,
    Custom(String),
}

impl RegionName {
    pub fn as_str(&self) -> &str {
        match self {
            RegionName::Feed => "feed",
            RegionName::Reels => "reels",
            RegionName::Stories => "stories",
            RegionName::Custom(name) => name,
        }
    }

    /// Only the feed is made of post-like units that can be filtered one by one.
    pub fn supports_filter(&self) -> bool {
        matches!(self, RegionName::Feed)
    }
}

impl From<&str> for RegionName {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "feed" => RegionName::Feed,
            "reels" => RegionName::Reels,
            "stories" => RegionName::Stories,
            other => RegionName::Custom(other.to_string()),
        }
    }
}

impl From<String> for RegionName {
    fn from(value: String) -> Self {
        RegionName::from(value.as_str())
    }
}

impl From<RegionName> for String {
    fn from(value: RegionName) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for RegionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Predicates
// ============================================================================

/// Rule deciding whether an element belongs to a region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Css(SelectorList),
    /// Attribute value contains the keyword, case-insensitively.
    AttributeKeyword { attribute: String, keyword: String },
    /// The element's own text contains the keyword, case-insensitively.
    TextKeyword(String),
}

impl Predicate {
    pub fn css(selector: &str) -> Result<Self, SelectorError> {
        Ok(Predicate::Css(SelectorList::parse(selector)?))
    }

    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        match self {
            Predicate::Css(list) => list.matches(doc, node),
            Predicate::AttributeKeyword { attribute, keyword } => doc
                .attribute(node, attribute)
                .is_some_and(|v| contains_ci(v, keyword)),
            Predicate::TextKeyword(keyword) => doc
                .node(node)
                .and_then(|n| n.text.as_deref())
                .is_some_and(|t| contains_ci(t, keyword)),
        }
    }

    /// Connected matches in document order.
    pub fn matches_in(&self, doc: &Document) -> Vec<NodeId> {
        doc.elements().filter(|id| self.matches(doc, *id)).collect()
    }

    pub fn first_match(&self, doc: &Document) -> Option<NodeId> {
        doc.elements().find(|id| self.matches(doc, *id))
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Css(list) => write!(f, "{}", list),
            Predicate::AttributeKeyword { attribute, keyword } => {
                write!(f, "[{} contains '{}']", attribute, keyword)
            }
            Predicate::TextKeyword(keyword) => write!(f, "text contains '{}'", keyword),
        }
    }
}

pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    !needle.is_empty() && haystack.to_lowercase().contains(&needle.to_lowercase())
}

// ============================================================================
// Keyword categories
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeywordCategory {
    /// Marks candidate distraction blocks for the pattern scan.
    Distraction,
    /// Marks feed units from followed or close contacts.
    Closeness,
    /// Marks suggested or sponsored feed units.
    Suggested,
}

impl KeywordCategory {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "distraction" | "distractions" | "hide" => Some(KeywordCategory::Distraction),
            "closeness" | "close" | "keep" => Some(KeywordCategory::Closeness),
            "suggested" | "sponsored" => Some(KeywordCategory::Suggested),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            KeywordCategory::Distraction => "distraction",
            KeywordCategory::Closeness => "closeness",
            KeywordCategory::Suggested => "suggested",
        }
    }
}

// ============================================================================
// External configuration document
// ============================================================================

/// Configuration document supplied by the storage collaborator.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SelectorDocument {
    #[serde(default)]
    pub selectors: BTreeMap<String, PredicateSpec>,
    #[serde(default)]
    pub keywords: KeywordSpec,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PredicateSpec {
    One(PredicateEntry),
    Many(Vec<PredicateEntry>),
    /// `{ main: "...", container: "..." }`, tried in document order.
    Named(serde_yaml::Mapping),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PredicateEntry {
    Css(String),
    Attribute { attribute: String, contains: String },
    Text { text: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum KeywordSpec {
    /// Bare list, read as the distraction category.
    Flat(Vec<String>),
    Categorized(BTreeMap<String, Vec<String>>),
}

impl Default for KeywordSpec {
    fn default() -> Self {
        KeywordSpec::Categorized(BTreeMap::new())
    }
}

impl PredicateEntry {
    pub fn to_predicate(&self) -> Result<Predicate, SelectorError> {
        match self {
            PredicateEntry::Css(selector) => Predicate::css(selector),
            PredicateEntry::Attribute { attribute, contains } => Ok(Predicate::AttributeKeyword {
                attribute: attribute.to_ascii_lowercase(),
                keyword: contains.clone(),
            }),
            PredicateEntry::Text { text } => Ok(Predicate::TextKeyword(text.clone())),
        }
    }
}

impl PredicateSpec {
    pub fn entries(&self) -> Vec<PredicateEntry> {
        match self {
            PredicateSpec::One(entry) => vec![entry.clone()],
            PredicateSpec::Many(entries) => entries.clone(),
            PredicateSpec::Named(map) => map
                .values()
                .filter_map(|v| v.as_str())
                .map(|s| PredicateEntry::Css(s.to_string()))
                .collect(),
        }
    }
}

// ============================================================================
// Resolved registry snapshot
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    Defaults,
    Loaded(String),
}

/// Immutable view of the configuration that readers hold while a reload runs.
#[derive(Debug, Clone)]
pub struct RegistrySnapshot {
    pub predicates: BTreeMap<RegionName, Vec<Predicate>>,
    pub keywords: BTreeMap<KeywordCategory, BTreeSet<String>>,
    pub origin: ConfigOrigin,
}

impl RegistrySnapshot {
    pub fn predicate_count(&self) -> usize {
        self.predicates.values().map(Vec::len).sum()
    }

    pub fn keywords(&self, category: KeywordCategory) -> BTreeSet<String> {
        self.keywords.get(&category).cloned().unwrap_or_default()
    }
}
