//! Utterance-to-asset mapping.
//!
//! A deliberately small stand-in for real intent classification: an
//! ordered keyword rule table, first match wins, with a catch-all
//! fallback asset for anything unmatched.

/// Asset played for greetings, and the shipped fallback.
pub const GREETING_ASSET: &str = "greetings.wav";

/// One mapping rule. Any keyword appearing as a substring of the
/// lower-cased, trimmed utterance selects `asset`.
#[derive(Debug, Clone)]
pub struct IntentRule {
    pub keywords: Vec<String>,
    pub asset: String,
}

impl IntentRule {
    pub fn new<I, S>(keywords: I, asset: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keywords: keywords.into_iter().map(Into::into).collect(),
            asset: asset.to_string(),
        }
    }
}

/// Maps accumulated utterance text to an audio asset filename.
#[derive(Debug, Clone)]
pub struct IntentResolver {
    rules: Vec<IntentRule>,
    fallback: String,
}

impl Default for IntentResolver {
    fn default() -> Self {
        Self::new(
            vec![IntentRule::new(
                ["hello", "hi", "hey", "greetings"],
                GREETING_ASSET,
            )],
            GREETING_ASSET,
        )
    }
}

impl IntentResolver {
    pub fn new(rules: Vec<IntentRule>, fallback: &str) -> Self {
        Self {
            rules,
            fallback: fallback.to_string(),
        }
    }

    /// Rules are evaluated in insertion order; the first match wins.
    pub fn resolve(&self, utterance: &str) -> &str {
        let text = utterance.trim().to_lowercase();
        for rule in &self.rules {
            if rule.keywords.iter().any(|k| text.contains(k.as_str())) {
                return &rule.asset;
            }
        }
        &self.fallback
    }
}
