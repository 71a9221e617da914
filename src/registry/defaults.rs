use std::collections::{BTreeMap, BTreeSet};

use crate::registry::registry_model::{
    ConfigOrigin, KeywordCategory, Predicate, RegionName, RegistrySnapshot,
};

const FEED_SELECTORS: &[&str] = &[
    r#"[role="feed"]"#,
    r#"div[data-pagelet^="FeedUnit_"]"#,
    r#"[aria-label="Sponsored"]"#,
];

const REELS_SELECTORS: &[&str] = &[
    r#"div[aria-label="Reels"]"#,
    r#"a[href*="reels"]"#,
    r#"div[data-pagelet="Reels"]"#,
];

const STORIES_SELECTORS: &[&str] = &[
    r#"[aria-label="Stories"]"#,
    r#"[aria-label="Create a story"]"#,
    r#"div[data-pagelet="Stories"]"#,
];

const DISTRACTION_KEYWORDS: &[&str] = &[
    "sponsored",
    "reels",
    "suggested for you",
    "watch",
    "stories",
    "marketplace",
    "gaming",
    "feed",
    "reel",
    "story",
    "suggested",
];

const CLOSENESS_KEYWORDS: &[&str] = &["friend", "family", "close friends"];

const SUGGESTED_KEYWORDS: &[&str] = &["suggested", "sponsored", "people you may know"];

/// Built-in configuration used whenever the external source is unavailable.
pub fn default_snapshot() -> RegistrySnapshot {
    let mut predicates = BTreeMap::new();
    predicates.insert(RegionName::Feed, css_list(FEED_SELECTORS));
    predicates.insert(RegionName::Reels, css_list(REELS_SELECTORS));
    predicates.insert(RegionName::Stories, css_list(STORIES_SELECTORS));

    let mut keywords = BTreeMap::new();
    keywords.insert(KeywordCategory::Distraction, keyword_set(DISTRACTION_KEYWORDS));
    keywords.insert(KeywordCategory::Closeness, keyword_set(CLOSENESS_KEYWORDS));
    keywords.insert(KeywordCategory::Suggested, keyword_set(SUGGESTED_KEYWORDS));

    RegistrySnapshot {
        predicates,
        keywords,
        origin: ConfigOrigin::Defaults,
    }
}

fn css_list(selectors: &[&str]) -> Vec<Predicate> {
    // Built-in selectors are fixed literals covered by tests; a bad one is skipped.
    selectors
        .iter()
        .filter_map(|s| Predicate::css(s).ok())
        .collect()
}

fn keyword_set(words: &[&str]) -> BTreeSet<String> {
    words.iter().map(|w| w.to_lowercase()).collect()
}
