//! Configurable banned-term filter for user-authored text
//!
//! Terms and text are normalised before matching so trivial obfuscation
//! (spacing, separators, leetspeak digits) does not slip through.

/// Message returned to clients when text is rejected
pub const MODERATION_ERROR_MESSAGE: &str = "Content contains inappropriate language";

#[derive(Debug, Clone, Default)]
pub struct ModerationFilter {
    terms: Vec<String>,
}

impl ModerationFilter {
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let terms = terms
            .into_iter()
            .map(|t| normalize(t.as_ref()))
            .filter(|t| !t.is_empty())
            .collect();
        Self { terms }
    }

    /// Build from a comma-separated list such as `BANNED_WORDS`
    pub fn from_csv(csv: &str) -> Self {
        Self::new(csv.split(','))
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Whether `text` contains any configured term
    pub fn is_blocked(&self, text: &str) -> bool {
        if self.terms.is_empty() {
            return false;
        }
        let normalized = normalize(text);
        self.terms.iter().any(|term| normalized.contains(term.as_str()))
    }
}

fn normalize(input: &str) -> String {
    input
        .chars()
        .flat_map(char::to_lowercase)
        .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '_' | '.'))
        .map(|c| match c {
            '0' => 'o',
            '1' => 'i',
            '3' => 'e',
            '4' => 'a',
            '5' => 's',
            '7' => 't',
            other => other,
        })
        .collect()
}
