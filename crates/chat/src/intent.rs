//! Keyword-based intent classification.

use campus_knowledge::text::{contains_phrase, normalize, tokens};

/// Intent returned when no category keyword matches.
pub const GENERAL_INTENT: &str = "general";

/// Categories in priority order with their trigger keywords. Single words
/// match as word prefixes ("fee" matches "fees"); phrases match whole.
const INTENT_KEYWORDS: &[(&str, &[&str])] = &[
    ("fees", &["fee", "payment", "dues", "amount", "cost"]),
    ("admission", &["admission", "enroll", "join", "apply", "application"]),
    ("scholarship", &["scholarship", "financial aid", "concession", "waiver"]),
    ("examination", &["exam", "result", "marks", "grade", "revaluation"]),
    ("timetable", &["timetable", "schedule", "class", "timing", "lecture"]),
    ("hostel", &["hostel", "accommodation", "room", "mess", "stay"]),
    ("library", &["library", "book", "borrow", "return", "fine"]),
    ("placement", &["placement", "job", "internship", "company", "campus"]),
    ("documents", &["certificate", "document", "transcript", "letter"]),
    ("contact", &["contact", "phone", "email", "office", "address"]),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct IntentDetector;

impl IntentDetector {
    pub fn new() -> Self {
        Self
    }

    /// Classify a pivot-language query.
    pub fn detect(&self, text: &str) -> String {
        let normalized = normalize(text);
        let words = tokens(text);

        INTENT_KEYWORDS
            .iter()
            .find(|(_, keywords)| {
                keywords.iter().any(|keyword| {
                    if keyword.contains(' ') {
                        contains_phrase(&normalized, keyword)
                    } else {
                        words.iter().any(|w| w.starts_with(keyword))
                    }
                })
            })
            .map(|(intent, _)| intent.to_string())
            .unwrap_or_else(|| GENERAL_INTENT.to_string())
    }
}
