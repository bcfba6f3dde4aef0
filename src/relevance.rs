// src/relevance.rs
//! Relevance gate: a three-tier keyword model.
//!
//! - **brand** tier: marketplace names; a hit alone is enough.
//! - **context** tier: marketplace / e-commerce vocabulary.
//! - **topic** tier: safety, counterfeit and consumer-protection vocabulary.
//!
//! A text is relevant when it hits the brand tier, or hits both the topic
//! and the context tier. Matching is a case-insensitive substring test.

use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

// --- env defaults & names ---
pub const DEFAULT_KEYWORDS_PATH: &str = "config/keywords.toml";
pub const ENV_KEYWORDS_PATH: &str = "RELEVANCE_KEYWORDS_PATH";

/// Keyword tiers as loaded from TOML:
///
/// ```toml
/// brand = ["temu", "shein"]
/// context = ["marketplace", "e-shop"]
/// topic = ["counterfeit", "recall"]
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct KeywordTiers {
    #[serde(default)]
    pub brand: Vec<String>,
    #[serde(default)]
    pub context: Vec<String>,
    #[serde(default)]
    pub topic: Vec<String>,
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut set = BTreeSet::new();
    for it in items {
        let t = it.trim().to_lowercase();
        if !t.is_empty() {
            set.insert(t);
        }
    }
    set.into_iter().collect()
}

impl KeywordTiers {
    pub fn new<B, C, T>(brand: B, context: C, topic: T) -> Self
    where
        B: IntoIterator,
        B::Item: Into<String>,
        C: IntoIterator,
        C::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<String>,
    {
        Self {
            brand: brand.into_iter().map(Into::into).collect(),
            context: context.into_iter().map(Into::into).collect(),
            topic: topic.into_iter().map(Into::into).collect(),
        }
    }

    /// Trimmed, lower-cased, de-duplicated copy with empty entries removed.
    pub fn cleaned(self) -> Self {
        Self {
            brand: clean_list(self.brand),
            context: clean_list(self.context),
            topic: clean_list(self.topic),
        }
    }

    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        let tiers: KeywordTiers = toml::from_str(s)?;
        Ok(tiers.cleaned())
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Failed to read keyword tiers at {}: {}", path.display(), e)
        })?;
        Self::from_toml_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid keyword tiers in {}: {}", path.display(), e))
    }

    /// Resolve the keyword file:
    /// 1) explicit path (CLI), 2) $RELEVANCE_KEYWORDS_PATH,
    /// 3) config/keywords.toml if present, 4) built-in seed.
    pub fn load_default(explicit: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(p) = explicit {
            return Self::load_from(p);
        }
        if let Ok(p) = std::env::var(ENV_KEYWORDS_PATH) {
            return Self::load_from(&PathBuf::from(p));
        }
        let default = PathBuf::from(DEFAULT_KEYWORDS_PATH);
        if default.exists() {
            return Self::load_from(&default);
        }
        Ok(Self::default_seed())
    }

    /// Built-in Czech + English vocabulary.
    pub fn default_seed() -> Self {
        Self::new(
            [
                "temu",
                "shein",
                "aliexpress",
                "wish.com",
                "joom",
                "alibaba",
            ],
            [
                "marketplace",
                "e-commerce",
                "ecommerce",
                "e-shop",
                "eshop",
                "online shop",
                "online store",
                "online platform",
                "shopping platform",
                "cross-border",
                "tržišt",
                "internetový obchod",
                "internetové obchody",
                "online nákup",
                "nákupní platform",
                "e-obchod",
                "zásilk",
                "z číny",
                "from china",
            ],
            [
                "counterfeit",
                "fake goods",
                "knock-off",
                "knockoff",
                "unsafe",
                "dangerous product",
                "hazardous",
                "toxic",
                "recall",
                "product safety",
                "consumer protection",
                "consumer safety",
                "customs seized",
                "digital services act",
                "padělk",
                "padělan",
                "nebezpečn",
                "nevyhovující",
                "toxick",
                "stažen z trhu",
                "stahuje z trhu",
                "ochrana spotřebitel",
                "ochrany spotřebitel",
                "bezpečnost výrobk",
                "česká obchodní inspekce",
                "čoi",
                "celníci zabavili",
            ],
        )
        .cleaned()
    }
}

/// Compiled relevance filter. Keyword tiers are injected at construction.
#[derive(Debug, Clone)]
pub struct RelevanceFilter {
    tiers: KeywordTiers,
}

/// Which tiers a text hit; logged for rejected candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TierHits {
    pub brand: bool,
    pub context: bool,
    pub topic: bool,
}

impl TierHits {
    pub fn is_relevant(self) -> bool {
        self.brand || (self.topic && self.context)
    }
}

fn any_match(haystack: &str, needles: &[String]) -> bool {
    needles.iter().any(|n| haystack.contains(n.as_str()))
}

impl RelevanceFilter {
    pub fn new(tiers: KeywordTiers) -> Self {
        Self {
            tiers: tiers.cleaned(),
        }
    }

    /// Brand hit short-circuits; otherwise both topic and context must hit.
    pub fn is_relevant(&self, search_text: &str) -> bool {
        let text = search_text.to_lowercase();
        if any_match(&text, &self.tiers.brand) {
            return true;
        }
        any_match(&text, &self.tiers.topic) && any_match(&text, &self.tiers.context)
    }

    /// All three tiers evaluated, without short-circuit.
    pub fn hits(&self, search_text: &str) -> TierHits {
        let text = search_text.to_lowercase();
        TierHits {
            brand: any_match(&text, &self.tiers.brand),
            context: any_match(&text, &self.tiers.context),
            topic: any_match(&text, &self.tiers.topic),
        }
    }
}

impl Default for RelevanceFilter {
    fn default() -> Self {
        Self::new(KeywordTiers::default_seed())
    }
}

/* ----------------------------
Tests
---------------------------- */

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_TOML: &str = r#"
brand = [" Temu ", "SHEIN", "", "temu"]
context = ["marketplace", "e-shop"]
topic = ["counterfeit", "recall"]
"#;

    fn filter() -> RelevanceFilter {
        RelevanceFilter::new(KeywordTiers::from_toml_str(TEST_TOML).expect("load test tiers"))
    }

    #[test]
    fn toml_is_cleaned() {
        let t = KeywordTiers::from_toml_str(TEST_TOML).unwrap();
        assert_eq!(t.brand, vec!["shein".to_string(), "temu".to_string()]);
    }

    #[test]
    fn missing_tiers_default_to_empty() {
        let t = KeywordTiers::from_toml_str(r#"brand = ["x"]"#).unwrap();
        assert!(t.context.is_empty() && t.topic.is_empty());
    }

    #[test]
    fn brand_alone_passes() {
        assert!(filter().is_relevant("New TEMU app update"));
    }

    #[test]
    fn context_alone_fails() {
        assert!(!filter().is_relevant("Marketplace fees go up next year"));
    }

    #[test]
    fn topic_alone_fails() {
        assert!(!filter().is_relevant("Car maker issues a recall of brakes"));
    }

    #[test]
    fn topic_and_context_pass() {
        let f = filter();
        assert!(f.is_relevant("Counterfeit perfume sold on a popular marketplace"));
        let h = f.hits("Counterfeit perfume sold on a popular marketplace");
        assert_eq!(
            h,
            TierHits {
                brand: false,
                context: true,
                topic: true
            }
        );
        assert!(h.is_relevant());
    }

    #[test]
    fn hits_agree_with_is_relevant() {
        let f = filter();
        for text in [
            "Temu adds a new category",
            "Marketplace fees go up",
            "Brake recall announced",
            "Recall of chargers sold on a marketplace",
            "",
        ] {
            assert_eq!(f.hits(text).is_relevant(), f.is_relevant(text), "{text}");
        }
    }

    #[test]
    fn case_insensitive_for_non_ascii() {
        let f = RelevanceFilter::new(KeywordTiers::new(
            Vec::<String>::new(),
            ["tržišt"],
            ["padělk"],
        ));
        assert!(f.is_relevant("PADĚLKY na online TRŽIŠTI"));
    }

    #[test]
    fn default_seed_behaves() {
        let f = RelevanceFilter::default();
        assert!(f.is_relevant("Shein faces EU scrutiny"));
        assert!(f.is_relevant("ČOI varuje: nebezpečné hračky z online tržiště"));
        assert!(!f.is_relevant("E-shop zlevňuje elektroniku"));
        assert!(!f.is_relevant("Nebezpečné počasí na horách"));
    }
}
