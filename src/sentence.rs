//! Sentence tokenization and match selection.
//!
//! Splits article text into sentences, finds the longest one matching a
//! keyword predicate, and normalizes quote characters before storage so the
//! export formats stay free of smart-quote artifacts.
//!
//! The splitter is rule-based: terminators (`.`, `!`, `?`) followed by
//! whitespace end a sentence, newlines are hard breaks, and closing quotes
//! or brackets stay attached to the sentence they end. Abbreviations like
//! "U.S." split early; for keyword matching that only shortens candidates.

use unicode_normalization::UnicodeNormalization;

const CLOSERS: [char; 6] = ['"', '\'', '\u{201D}', '\u{2019}', ')', ']'];

/// Split text into trimmed, non-empty sentence spans.
pub fn sentences_of(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0usize;
    let mut iter = text.char_indices().peekable();

    while let Some((i, c)) = iter.next() {
        if c == '\n' {
            push_span(text, start, i, &mut sentences);
            start = i + c.len_utf8();
            continue;
        }

        if matches!(c, '.' | '!' | '?') {
            let mut end = i + c.len_utf8();
            while let Some(&(j, next)) = iter.peek() {
                if CLOSERS.contains(&next) {
                    end = j + next.len_utf8();
                    iter.next();
                } else {
                    break;
                }
            }
            let at_boundary = iter
                .peek()
                .map(|&(_, next)| next.is_whitespace())
                .unwrap_or(true);
            if at_boundary {
                push_span(text, start, end, &mut sentences);
                start = end;
            }
        }
    }

    push_span(text, start, text.len(), &mut sentences);
    sentences
}

fn push_span<'a>(text: &'a str, start: usize, end: usize, sentences: &mut Vec<&'a str>) {
    let span = text[start..end].trim();
    if !span.is_empty() {
        sentences.push(span);
    }
}

/// Replace smart quotes with standard quotes after NFKC normalization.
pub fn normalize_quotes(text: &str) -> String {
    let normalized: String = text.nfkc().collect();
    normalized
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
        .trim()
        .to_string()
}

/// Case-insensitive, period-stripped keyword test, so "OpenSecrets.org"
/// still matches the keyword "opensecrets".
fn matches_keyword(sentence: &str, keywords: &[String]) -> bool {
    let normalized = sentence.replace('.', "").to_lowercase();
    keywords
        .iter()
        .any(|k| normalized.contains(&k.to_lowercase()))
}

/// The longest sentence in `text` matching any keyword, quote-normalized.
///
/// Length is measured in characters; ties keep the first encountered.
/// Returns an empty string (never a missing value) when nothing matches.
pub fn longest_matching_sentence(text: &str, keywords: &[String]) -> String {
    let mut longest = "";
    let mut max_length = 0usize;

    for sentence in sentences_of(text) {
        if !matches_keyword(sentence, keywords) {
            continue;
        }
        let length = sentence.chars().count();
        if length > max_length {
            max_length = length;
            longest = sentence;
        }
    }

    if longest.is_empty() {
        String::new()
    } else {
        normalize_quotes(longest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kw(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_splits_on_terminators() {
        let sentences = sentences_of("First one. Second one! Third one? Fourth");
        assert_eq!(
            sentences,
            vec!["First one.", "Second one!", "Third one?", "Fourth"]
        );
    }

    #[test]
    fn test_newline_is_hard_break() {
        let sentences = sentences_of("no terminator here\nnext line.");
        assert_eq!(sentences, vec!["no terminator here", "next line."]);
    }

    #[test]
    fn test_closing_quote_stays_with_sentence() {
        let sentences = sentences_of("He said \"Stop.\" Then he left.");
        assert_eq!(sentences, vec!["He said \"Stop.\"", "Then he left."]);
    }

    #[test]
    fn test_decimal_numbers_not_split() {
        let sentences = sentences_of("It rose 3.5 percent. Analysts cheered.");
        assert_eq!(sentences, vec!["It rose 3.5 percent.", "Analysts cheered."]);
    }

    #[test]
    fn test_empty_text() {
        assert!(sentences_of("").is_empty());
        assert!(sentences_of("  \n  ").is_empty());
    }

    #[test]
    fn test_longest_match_wins() {
        let text = "A badger. The badger dug a very long den today! Badgers dig dens.";
        let selected = longest_matching_sentence(text, &kw(&["badger"]));
        assert_eq!(selected, "The badger dug a very long den today!");
    }

    #[test]
    fn test_tie_keeps_first() {
        // Both matching sentences are 11 characters long.
        let text = "badger one. badger two. unrelated sentence here.";
        let selected = longest_matching_sentence(text, &kw(&["badger"]));
        assert_eq!(selected, "badger one.");
    }

    #[test]
    fn test_no_match_is_empty_string() {
        let selected = longest_matching_sentence("Nothing relevant here.", &kw(&["badger"]));
        assert_eq!(selected, "");
    }

    #[test]
    fn test_match_is_case_insensitive_and_period_stripped() {
        let text = "Data from OpenSecrets.org backs this up.";
        let selected = longest_matching_sentence(text, &kw(&["opensecrets"]));
        assert_eq!(selected, text);
    }

    #[test]
    fn test_smart_quotes_normalized() {
        let text = "\u{201C}Follow the money,\u{201D} the group\u{2019}s founder said, citing badger data.";
        let selected = longest_matching_sentence(text, &kw(&["badger"]));
        assert_eq!(
            selected,
            "\"Follow the money,\" the group's founder said, citing badger data."
        );
    }

    #[test]
    fn test_normalize_quotes_trims() {
        assert_eq!(normalize_quotes("  \u{2018}hi\u{2019}  "), "'hi'");
    }
}
