//! Keyword extraction from residual query text.
//!
//! Runs after property recognition has stripped filter tokens. Splitting
//! respects both space-delimited and logographic scripts: word runs become
//! one token each, CJK runs are segmented into overlapping bigrams (the
//! n-gram strategy used for CJK substring matching downstream).

use tasklens_core::CompiledTerms;

use crate::script::is_cjk_char;

/// Extract core keywords from residual text.
///
/// Lowercases, splits, removes the locale's stop words, and deduplicates
/// preserving first-occurrence order.
pub fn extract(residual: &str, locale: &str, terms: &CompiledTerms) -> Vec<String> {
    let stop_words = terms.stop_words_for(locale);

    let mut keywords = Vec::new();
    for token in segment(&residual.to_lowercase()) {
        if token.chars().count() == 0 {
            continue;
        }
        if let Some(stops) = stop_words {
            if stops.contains(&token) {
                continue;
            }
        }
        if !keywords.contains(&token) {
            keywords.push(token);
        }
    }
    keywords
}

/// Split text into word tokens and CJK bigrams.
///
/// A CJK run of length one yields that single character; longer runs yield
/// each adjacent character pair. Non-alphanumeric, non-CJK characters
/// separate tokens.
pub fn segment(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    let mut cjk_run: Vec<char> = Vec::new();

    fn flush_word(word: &mut String, tokens: &mut Vec<String>) {
        if !word.is_empty() {
            tokens.push(std::mem::take(word));
        }
    }
    fn flush_cjk(run: &mut Vec<char>, tokens: &mut Vec<String>) {
        match run.len() {
            0 => {}
            1 => tokens.push(run[0].to_string()),
            _ => {
                for pair in run.windows(2) {
                    tokens.push(pair.iter().collect());
                }
            }
        }
        run.clear();
    }

    for ch in text.chars() {
        if is_cjk_char(ch) {
            flush_word(&mut word, &mut tokens);
            cjk_run.push(ch);
        } else if ch.is_alphanumeric() || ch == '\'' || ch == '-' {
            flush_cjk(&mut cjk_run, &mut tokens);
            word.push(ch);
        } else {
            flush_word(&mut word, &mut tokens);
            flush_cjk(&mut cjk_run, &mut tokens);
        }
    }
    flush_word(&mut word, &mut tokens);
    flush_cjk(&mut cjk_run, &mut tokens);

    tokens
}
