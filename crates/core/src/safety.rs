//! Safety classification of inbound message text.
//!
//! Pure keyword scan, deterministic and side-effect-free. The lexicon is an
//! explicit versioned table injected at construction so tests can supply
//! alternates; the built-in table is the production default.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyCategory {
    Safety,
    Harassment,
    Discrimination,
}

impl SafetyCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Safety => "safety",
            Self::Harassment => "harassment",
            Self::Discrimination => "discrimination",
        }
    }

    /// Fixed empathetic reply sent instead of a model call when a message in
    /// this category is detected. Short enough for every tone ceiling.
    pub fn empathetic_reply(&self) -> &'static str {
        match self {
            Self::Safety => {
                "Thank you for telling me. What you're feeling matters, and you don't have \
                 to carry it alone. I've asked a member of the HR team to reach out to you \
                 personally, right away."
            }
            Self::Harassment => {
                "I'm sorry you're dealing with this - no one should have to. I've flagged \
                 this conversation to the HR team so a person can follow up with you \
                 directly and confidentially."
            }
            Self::Discrimination => {
                "Thank you for raising this. It deserves real attention, so I've routed \
                 this conversation to the HR team for a confidential, personal follow-up."
            }
        }
    }
}

/// Versioned, immutable keyword table. Categories are scanned in declaration
/// order and the first matching term wins.
#[derive(Clone, Debug)]
pub struct SafetyLexicon {
    pub version: &'static str,
    categories: Vec<(SafetyCategory, Vec<&'static str>)>,
}

impl SafetyLexicon {
    pub fn new(
        version: &'static str,
        categories: Vec<(SafetyCategory, Vec<&'static str>)>,
    ) -> Self {
        Self { version, categories }
    }

    /// Production table. Self-harm terms come first so the most urgent
    /// category wins on overlap.
    pub fn builtin() -> Self {
        Self::new(
            "2026-02",
            vec![
                (
                    SafetyCategory::Safety,
                    vec![
                        "kill myself",
                        "suicide",
                        "suicidal",
                        "self-harm",
                        "self harm",
                        "hurt myself",
                        "harm myself",
                        "end my life",
                        "want to die",
                        "no reason to live",
                    ],
                ),
                (
                    SafetyCategory::Harassment,
                    vec![
                        "harass",
                        "bully",
                        "bullied",
                        "threaten",
                        "intimidat",
                        "hostile work",
                        "abusive",
                        "inappropriate touching",
                        "unwanted advances",
                    ],
                ),
                (
                    SafetyCategory::Discrimination,
                    vec![
                        "discriminat",
                        "racist",
                        "racism",
                        "sexist",
                        "sexism",
                        "ageism",
                        "homophobic",
                        "transphobic",
                        "bigot",
                        "passed over because",
                    ],
                ),
            ],
        )
    }
}

impl Default for SafetyLexicon {
    fn default() -> Self {
        Self::builtin()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SafetyVerdict {
    pub flagged: bool,
    pub category: Option<SafetyCategory>,
    pub matched_term: Option<String>,
}

impl SafetyVerdict {
    fn clean() -> Self {
        Self { flagged: false, category: None, matched_term: None }
    }
}

#[derive(Clone, Debug, Default)]
pub struct SafetyClassifier {
    lexicon: SafetyLexicon,
}

impl SafetyClassifier {
    pub fn new(lexicon: SafetyLexicon) -> Self {
        Self { lexicon }
    }

    pub fn lexicon_version(&self) -> &'static str {
        self.lexicon.version
    }

    /// Total over arbitrary text: lowercase, scan categories in order,
    /// first match wins. No scoring.
    pub fn classify(&self, text: &str) -> SafetyVerdict {
        let normalized = text.to_lowercase();

        for (category, terms) in &self.lexicon.categories {
            for term in terms {
                if normalized.contains(term) {
                    return SafetyVerdict {
                        flagged: true,
                        category: Some(*category),
                        matched_term: Some((*term).to_string()),
                    };
                }
            }
        }

        SafetyVerdict::clean()
    }
}

#[cfg(test)]
mod tests {
    use super::{SafetyCategory, SafetyClassifier, SafetyLexicon};

    #[test]
    fn self_harm_text_is_flagged_as_safety() {
        let classifier = SafetyClassifier::default();
        let verdict = classifier.classify("I want to kill myself");

        assert!(verdict.flagged);
        assert_eq!(verdict.category, Some(SafetyCategory::Safety));
        assert_eq!(verdict.matched_term.as_deref(), Some("kill myself"));
    }

    #[test]
    fn benign_text_is_not_flagged() {
        let classifier = SafetyClassifier::default();
        let verdict = classifier.classify("great job everyone");

        assert!(!verdict.flagged);
        assert_eq!(verdict.category, None);
        assert_eq!(verdict.matched_term, None);
    }

    #[test]
    fn harassment_stems_match_inflected_forms() {
        let classifier = SafetyClassifier::default();
        let verdict = classifier.classify("My manager is harassing me");

        assert!(verdict.flagged);
        assert_eq!(verdict.category, Some(SafetyCategory::Harassment));
    }

    #[test]
    fn classification_is_case_insensitive_and_deterministic() {
        let classifier = SafetyClassifier::default();
        let first = classifier.classify("This feels DISCRIMINATORY to me");
        let second = classifier.classify("This feels DISCRIMINATORY to me");

        assert_eq!(first, second);
        assert_eq!(first.category, Some(SafetyCategory::Discrimination));
    }

    #[test]
    fn first_matching_category_wins_on_overlap() {
        let classifier = SafetyClassifier::default();
        let verdict = classifier.classify("I'm being harassed and I want to end my life");

        // Safety terms are scanned before harassment terms.
        assert_eq!(verdict.category, Some(SafetyCategory::Safety));
    }

    #[test]
    fn injected_lexicon_replaces_the_builtin_table() {
        let classifier = SafetyClassifier::new(SafetyLexicon::new(
            "test",
            vec![(SafetyCategory::Harassment, vec!["pineapple"])],
        ));

        assert!(classifier.classify("pineapple on pizza").flagged);
        assert!(!classifier.classify("I want to kill myself").flagged);
    }

    #[test]
    fn empathetic_replies_fit_the_tightest_tone_ceiling() {
        for category in
            [SafetyCategory::Safety, SafetyCategory::Harassment, SafetyCategory::Discrimination]
        {
            assert!(category.empathetic_reply().chars().count() <= 240);
        }
    }
}
