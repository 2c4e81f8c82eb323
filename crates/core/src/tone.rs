//! Tone policy: pure lookup of behavioral constraints per preset.

use serde::{Deserialize, Serialize};

const ELLIPSIS: &str = "...";

/// Named bundle of length ceiling, token budget, and style guidance applied
/// to every generated reply. Terser presets get smaller token budgets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TonePreset {
    PokeLite,
    Friendly,
    Coaching,
    Formal,
}

impl TonePreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PokeLite => "poke_lite",
            Self::Friendly => "friendly",
            Self::Coaching => "coaching",
            Self::Formal => "formal",
        }
    }

    /// Hard character ceiling for a single reply.
    pub fn ceiling(&self) -> usize {
        match self {
            Self::PokeLite => 240,
            Self::Friendly => 350,
            Self::Coaching => 400,
            Self::Formal => 500,
        }
    }

    /// Token budget requested from the model. Kept well under the character
    /// ceiling so truncation stays the exception.
    pub fn max_tokens(&self) -> u32 {
        match self {
            Self::PokeLite => 80,
            Self::Friendly => 120,
            Self::Coaching => 150,
            Self::Formal => 200,
        }
    }

    pub fn style_guidance(&self) -> &'static str {
        match self {
            Self::PokeLite => {
                "Keep replies to one or two short sentences. Casual, warm, a quick nudge \
                 rather than a conversation. One question at most."
            }
            Self::Friendly => {
                "Write like a supportive colleague: relaxed, encouraging, plain language. \
                 Acknowledge what was said before asking anything new."
            }
            Self::Coaching => {
                "Use a coaching register: reflect back what you heard, then ask one open \
                 question that invites the person to think further."
            }
            Self::Formal => {
                "Professional and measured. Complete sentences, no slang, respectful \
                 distance. Summarize before you ask follow-ups."
            }
        }
    }

    /// Enforces the ceiling on generated content. Content over the ceiling is
    /// cut to `ceiling - 3` characters plus an ellipsis marker, so the result
    /// is exactly `ceiling` characters long.
    pub fn enforce_ceiling(&self, content: &str) -> String {
        let ceiling = self.ceiling();
        if content.chars().count() <= ceiling {
            return content.to_string();
        }

        let kept: String = content.chars().take(ceiling - ELLIPSIS.len()).collect();
        format!("{kept}{ELLIPSIS}")
    }
}

impl std::str::FromStr for TonePreset {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "poke_lite" => Ok(Self::PokeLite),
            "friendly" => Ok(Self::Friendly),
            "coaching" => Ok(Self::Coaching),
            "formal" => Ok(Self::Formal),
            other => Err(format!("unknown tone preset `{other}`")),
        }
    }
}
