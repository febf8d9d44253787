//! Text normalization shared by keyword matching, embeddings and scoring.

use unicode_segmentation::UnicodeSegmentation;

const STOP_WORDS: &[&str] = &[
    "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of",
    "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has", "had",
    "it", "its", "their", "they", "them", "what", "when", "where", "how", "who", "can", "will",
    "there", "about", "please", "tell", "does", "do", "you", "your", "me", "my", "i",
];

/// Whether `word` (already lowercased) carries no content.
pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(&word)
}

/// Lowercased words with punctuation removed.
pub fn tokens(text: &str) -> Vec<String> {
    text.unicode_words().map(|w| w.to_lowercase()).collect()
}

/// Lowercased words joined by single spaces.
pub fn normalize(text: &str) -> String {
    tokens(text).join(" ")
}

/// Whether the normalized `phrase` occurs in the normalized `haystack` on
/// word boundaries.
pub fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    if phrase.is_empty() {
        return false;
    }
    format!(" {} ", haystack).contains(&format!(" {} ", phrase))
}

/// Words of at least `min_chars` characters that are not stop words.
pub fn content_words(text: &str, min_chars: usize) -> Vec<String> {
    tokens(text)
        .into_iter()
        .filter(|w| w.chars().count() >= min_chars && !is_stop_word(w))
        .collect()
}

/// Tokens containing at least one digit (amounts, years, times).
pub fn number_tokens(text: &str) -> Vec<String> {
    tokens(text)
        .into_iter()
        .filter(|w| w.chars().any(|c| c.is_ascii_digit()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_punctuation() {
        assert_eq!(normalize("What is the Fee Structure?"), "what is the fee structure");
    }

    #[test]
    fn test_contains_phrase_on_word_boundaries() {
        let q = normalize("Where can I get coffee?");
        assert!(!contains_phrase(&q, "fee"));
        assert!(contains_phrase(&q, "coffee"));
        assert!(contains_phrase(&normalize("hostel fee details"), "hostel fee"));
        assert!(!contains_phrase(&q, ""));
    }

    #[test]
    fn test_content_words() {
        assert_eq!(
            content_words("What is the hostel fee structure?", 4),
            vec!["hostel".to_string(), "structure".to_string()]
        );
    }

    #[test]
    fn test_number_tokens_keep_amounts() {
        let numbers = number_tokens("The annual fee is ₹50,000 for 2024-25.");
        assert!(numbers.contains(&"50,000".to_string()));
        assert!(numbers.iter().any(|n| n.contains("2024")));
    }

    #[test]
    fn test_devanagari_tokens() {
        assert_eq!(tokens("छात्रावास शुल्क"), vec!["छात्रावास", "शुल्क"]);
    }
}
