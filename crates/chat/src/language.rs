//! Script- and vocabulary-based language detection.

use campus_core::config::LanguageConfig;

/// Romanized Hindi function words. Two or more in a Latin-script message
/// mark it as Hindi.
const HINGLISH_MARKERS: &[&str] = &[
    "hai", "hain", "ka", "ki", "ke", "ko", "se", "mein", "mai", "kya", "kaise", "kab", "kahan",
    "kitna", "kitni", "batao", "bataiye", "baare", "chahiye", "nahi", "nahin", "aur", "mujhe",
    "hamein", "kripya", "karna", "karne", "milega", "milegi", "wala", "wali",
];

/// Marathi words that separate it from Hindi within Devanagari.
const MARATHI_MARKERS: &[&str] = &["आहे", "आहेत", "काय", "मला", "कसे", "कधी", "नाही", "आणि"];

/// Messages with fewer letters than this are too short to classify.
const MIN_LETTERS: usize = 2;

/// Classifies inbound text into one of the configured language codes.
#[derive(Debug, Clone)]
pub struct LanguageDetector {
    supported: Vec<String>,
}

impl LanguageDetector {
    pub fn new(config: &LanguageConfig) -> Self {
        Self {
            supported: config.supported.clone(),
        }
    }

    /// Detect the language of `text`.
    ///
    /// Returns `None` when the text is empty, too short, has mixed or
    /// unrecognised script, or resolves to a language outside the configured
    /// set. Never fails.
    pub fn detect(&self, text: &str) -> Option<String> {
        let letters: Vec<char> = text.chars().filter(|c| c.is_alphabetic()).collect();
        if letters.len() < MIN_LETTERS {
            return None;
        }

        let code = match dominant_script(&letters)? {
            Script::Latin => detect_latin(text),
            Script::Devanagari => detect_devanagari(text),
            Script::Gujarati => "gu",
            Script::Gurmukhi => "pa",
            Script::Tamil => "ta",
            Script::Bengali => "bn",
            Script::Telugu => "te",
            Script::Kannada => "kn",
            Script::Malayalam => "ml",
            Script::Odia => "or",
        };

        if self.supported.iter().any(|c| c == code) {
            Some(code.to_string())
        } else {
            tracing::debug!(code, "Detected language is not configured");
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Script {
    Latin,
    Devanagari,
    Bengali,
    Gurmukhi,
    Gujarati,
    Odia,
    Tamil,
    Telugu,
    Kannada,
    Malayalam,
}

const SCRIPTS: [Script; 10] = [
    Script::Latin,
    Script::Devanagari,
    Script::Bengali,
    Script::Gurmukhi,
    Script::Gujarati,
    Script::Odia,
    Script::Tamil,
    Script::Telugu,
    Script::Kannada,
    Script::Malayalam,
];

fn script_of(c: char) -> Option<Script> {
    match c as u32 {
        0x0041..=0x024F => Some(Script::Latin),
        0x0900..=0x097F => Some(Script::Devanagari),
        0x0980..=0x09FF => Some(Script::Bengali),
        0x0A00..=0x0A7F => Some(Script::Gurmukhi),
        0x0A80..=0x0AFF => Some(Script::Gujarati),
        0x0B00..=0x0B7F => Some(Script::Odia),
        0x0B80..=0x0BFF => Some(Script::Tamil),
        0x0C00..=0x0C7F => Some(Script::Telugu),
        0x0C80..=0x0CFF => Some(Script::Kannada),
        0x0D00..=0x0D7F => Some(Script::Malayalam),
        _ => None,
    }
}

/// The script covering a clear majority (over 60%) of the letters.
fn dominant_script(letters: &[char]) -> Option<Script> {
    let mut counts = [0_usize; SCRIPTS.len()];
    for c in letters {
        if let Some(script) = script_of(*c) {
            if let Some(slot) = SCRIPTS.iter().position(|s| *s == script) {
                counts[slot] += 1;
            }
        }
    }

    let (slot, best) = counts
        .iter()
        .enumerate()
        .max_by_key(|(_, count)| **count)?;
    if *best * 5 > letters.len() * 3 {
        Some(SCRIPTS[slot])
    } else {
        None
    }
}

fn lowercase_words(text: &str) -> Vec<String> {
    text.split(|c: char| c.is_whitespace() || c.is_ascii_punctuation() || c == '।')
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

fn detect_latin(text: &str) -> &'static str {
    let words = lowercase_words(text);
    let markers = words
        .iter()
        .filter(|w| HINGLISH_MARKERS.contains(&w.as_str()))
        .count();
    if markers >= 2 {
        "hi"
    } else {
        "en"
    }
}

fn detect_devanagari(text: &str) -> &'static str {
    let words = lowercase_words(text);
    if words.iter().any(|w| MARATHI_MARKERS.contains(&w.as_str())) {
        "mr"
    } else {
        "hi"
    }
}
