//! A compiled table of regexes matched against normalized text.

use regex_lite::Regex;

pub(crate) struct PatternSet {
    regexes: Vec<Regex>,
}

impl PatternSet {
    /// Compile every pattern. A pattern that fails to compile is logged and
    /// skipped; the tables are covered by tests so this only guards against
    /// a bad edit slipping through.
    pub(crate) fn new(patterns: &[&str]) -> Self {
        let regexes = patterns
            .iter()
            .filter_map(|p| match Regex::new(p) {
                Ok(re) => Some(re),
                Err(e) => {
                    tracing::error!(pattern = %p, error = %e, "Invalid built-in pattern");
                    None
                }
            })
            .collect();
        Self { regexes }
    }

    pub(crate) fn is_match(&self, text: &str) -> bool {
        self.regexes.iter().any(|re| re.is_match(text))
    }

    /// Byte offset just past the earliest match of any pattern.
    pub(crate) fn first_match_end(&self, text: &str) -> Option<usize> {
        self.regexes
            .iter()
            .filter_map(|re| re.find(text))
            .min_by_key(|m| m.start())
            .map(|m| m.end())
    }

    /// Every distinct matched phrase, in table order.
    pub(crate) fn find_all(&self, text: &str) -> Vec<String> {
        let mut found: Vec<String> = Vec::new();
        for re in &self.regexes {
            for m in re.find_iter(text) {
                let phrase = m.as_str().trim().to_string();
                if !phrase.is_empty() && !found.contains(&phrase) {
                    found.push(phrase);
                }
            }
        }
        found
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.regexes.len()
    }
}

/// Lowercase, fold typographic apostrophes and trim.
pub fn normalize(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .replace(['\u{2019}', '\u{2018}'], "'")
}

/// Whole-word containment for a dynamic term such as a child's name.
pub(crate) fn contains_word(text: &str, word: &str) -> bool {
    let word = word.trim().to_lowercase();
    if word.is_empty() {
        return false;
    }
    text.match_indices(&word).any(|(i, _)| {
        let before = text[..i].chars().next_back();
        let after = text[i + word.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}
