//! Unicode script detection for multilingual query analysis.
//!
//! The detector performs a single O(n) pass through the input and classifies
//! it into broad script categories. The result routes two decisions: how to
//! segment keywords (word splitting vs. CJK n-grams) and which locale to
//! fall back to when no configured term gave a language hint.

use std::collections::HashMap;

use unicode_script::{Script, UnicodeScript};

/// Detected script category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetectedScript {
    /// Latin alphabet (English, German, French, ...)
    Latin,
    /// CJK scripts: Han, Hiragana, Katakana, Hangul
    Cjk,
    /// Cyrillic script (Russian, Ukrainian, ...)
    Cyrillic,
    /// Arabic script
    Arabic,
    /// Unknown or unclassified script
    Unknown,
}

impl DetectedScript {
    /// Locale code to assume when term lists gave no language signal.
    pub fn fallback_locale(self) -> &'static str {
        match self {
            Self::Cjk => "zh",
            Self::Cyrillic => "ru",
            Self::Arabic => "ar",
            Self::Latin | Self::Unknown => tasklens_core::defaults::FALLBACK_LOCALE,
        }
    }
}

fn map_unicode_script(script: Script) -> DetectedScript {
    match script {
        Script::Latin => DetectedScript::Latin,
        Script::Han | Script::Hiragana | Script::Katakana | Script::Hangul => DetectedScript::Cjk,
        Script::Cyrillic => DetectedScript::Cyrillic,
        Script::Arabic => DetectedScript::Arabic,
        _ => DetectedScript::Unknown,
    }
}

/// Detect the primary script of the input text.
///
/// Whitespace, digits, and ASCII punctuation are skipped; the most common
/// remaining script wins. Empty or all-punctuation input is `Unknown`.
pub fn detect_script(text: &str) -> DetectedScript {
    let mut counts: HashMap<DetectedScript, usize> = HashMap::new();

    for ch in text.chars() {
        if ch.is_whitespace() || ch.is_ascii_punctuation() || ch.is_ascii_digit() {
            continue;
        }
        *counts.entry(map_unicode_script(ch.script())).or_insert(0) += 1;
    }

    // Ties resolve via a fixed script rank so detection stays deterministic.
    counts
        .into_iter()
        .max_by_key(|(script, count)| (*count, rank(*script)))
        .map(|(script, _)| script)
        .unwrap_or(DetectedScript::Unknown)
}

fn rank(script: DetectedScript) -> u8 {
    match script {
        DetectedScript::Cjk => 4,
        DetectedScript::Cyrillic => 3,
        DetectedScript::Arabic => 2,
        DetectedScript::Latin => 1,
        DetectedScript::Unknown => 0,
    }
}

/// Check whether a single character belongs to a CJK script.
pub fn is_cjk_char(ch: char) -> bool {
    matches!(
        ch.script(),
        Script::Han | Script::Hiragana | Script::Katakana | Script::Hangul
    )
}

/// Check whether the text contains any CJK characters.
pub fn has_cjk(text: &str) -> bool {
    text.chars().any(is_cjk_char)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latin_detection() {
        assert_eq!(detect_script("review the design mockups"), DetectedScript::Latin);
    }

    #[test]
    fn test_cjk_detection() {
        assert_eq!(detect_script("今天的任务"), DetectedScript::Cjk);
    }

    #[test]
    fn test_cyrillic_detection() {
        assert_eq!(detect_script("задачи на сегодня"), DetectedScript::Cyrillic);
    }

    #[test]
    fn test_empty_input_is_unknown() {
        assert_eq!(detect_script(""), DetectedScript::Unknown);
        assert_eq!(detect_script("123 !?"), DetectedScript::Unknown);
    }

    #[test]
    fn test_has_cjk() {
        assert!(has_cjk("Hello 世界"));
        assert!(has_cjk("こんにちは"));
        assert!(!has_cjk("Hello world"));
    }

    #[test]
    fn test_fallback_locale() {
        assert_eq!(DetectedScript::Cjk.fallback_locale(), "zh");
        assert_eq!(DetectedScript::Cyrillic.fallback_locale(), "ru");
        assert_eq!(DetectedScript::Latin.fallback_locale(), "en");
        assert_eq!(DetectedScript::Unknown.fallback_locale(), "en");
    }
}
