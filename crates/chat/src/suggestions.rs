//! Follow-up question suggestions.

use campus_knowledge::text::normalize;
use campus_knowledge::RetrievalResult;
use std::collections::HashSet;

/// Follow-up questions per category.
const CATEGORY_FOLLOW_UPS: &[(&str, &[&str])] = &[
    (
        "fees",
        &[
            "What are the scholarship options available?",
            "What is the last date for fee payment?",
        ],
    ),
    (
        "admission",
        &[
            "What documents are required for admission?",
            "What are the eligibility criteria?",
        ],
    ),
    (
        "examination",
        &[
            "When will the results be announced?",
            "How can I apply for re-evaluation?",
        ],
    ),
    (
        "hostel",
        &[
            "What is the hostel fee structure?",
            "What facilities are available in the hostel?",
        ],
    ),
    (
        "general",
        &[
            "What are the important dates to remember?",
            "How can I contact the office?",
        ],
    ),
];

fn follow_ups(category: &str) -> &'static [&'static str] {
    let category = match category {
        "exam" | "exams" => "examination",
        "fee" => "fees",
        other => other,
    };
    CATEGORY_FOLLOW_UPS
        .iter()
        .find(|(name, _)| *name == category)
        .map(|(_, questions)| *questions)
        .unwrap_or(&[])
}

/// Proposes follow-up questions the student has not asked yet.
#[derive(Debug, Clone)]
pub struct SuggestionGenerator {
    max: usize,
}

impl SuggestionGenerator {
    pub fn new(max: usize) -> Self {
        Self { max }
    }

    pub fn max(&self) -> usize {
        self.max
    }

    /// Suggest up to `max` pivot-language questions.
    ///
    /// Candidates are the canonical questions of retrieved FAQs other than
    /// the top result (which answered the turn), then the follow-ups for the
    /// retrieved categories and `intent`. Anything matching a question in
    /// `asked` (case-insensitively, ignoring punctuation) is skipped.
    pub fn suggest(&self, results: &[RetrievalResult], intent: &str, asked: &[&str]) -> Vec<String> {
        let mut seen: HashSet<String> = asked.iter().map(|q| normalize(q)).collect();
        let mut suggestions = Vec::new();

        let faq_questions = results
            .iter()
            .skip(1)
            .filter_map(|r| r.item.question.as_deref());

        let mut categories: Vec<&str> = results.iter().map(|r| r.item.category.as_str()).collect();
        categories.push(intent);
        let mut category_seen = HashSet::new();
        categories.retain(|c| category_seen.insert(*c));
        let category_questions = categories.into_iter().flat_map(|c| follow_ups(c).iter().copied());

        for question in faq_questions.chain(category_questions) {
            if suggestions.len() >= self.max {
                break;
            }
            let key = normalize(question);
            if key.is_empty() || !seen.insert(key) {
                continue;
            }
            suggestions.push(question.to_string());
        }

        suggestions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_knowledge::{KnowledgeItem, MatchSource, SourceType};
    use chrono::Utc;
    use std::sync::Arc;

    fn faq(id: &str, question: &str, category: &str) -> RetrievalResult {
        RetrievalResult {
            item: Arc::new(KnowledgeItem {
                id: id.to_string(),
                source_type: SourceType::Faq,
                title: question.to_string(),
                text: question.to_string(),
                category: category.to_string(),
                language: "en".to_string(),
                keywords: Vec::new(),
                question: Some(question.to_string()),
                answer: Some("answer".to_string()),
                document_id: None,
                position: None,
                indexed_at: Utc::now(),
            }),
            score: 0.8,
            match_source: MatchSource::Vector,
        }
    }

    #[test]
    fn test_faq_questions_then_category_follow_ups() {
        let results = vec![
            faq("a", "What is the fee structure?", "fees"),
            faq("b", "Is there a late fee?", "fees"),
        ];
        let suggestions = SuggestionGenerator::new(5).suggest(&results, "fees", &[]);
        assert_eq!(
            suggestions,
            vec![
                "Is there a late fee?",
                "What are the scholarship options available?",
                "What is the last date for fee payment?",
            ]
        );
    }

    #[test]
    fn test_skips_questions_already_asked() {
        let results = vec![faq("a", "Hostel rules?", "hostel")];
        let asked = ["what is the HOSTEL fee structure"];
        let suggestions = SuggestionGenerator::new(5).suggest(&results, "hostel", &asked);
        assert_eq!(suggestions, vec!["What facilities are available in the hostel?"]);
    }

    #[test]
    fn test_respects_max() {
        let results = vec![
            faq("a", "Q0?", "fees"),
            faq("b", "Q1?", "admission"),
            faq("c", "Q2?", "hostel"),
        ];
        let suggestions = SuggestionGenerator::new(2).suggest(&results, "general", &[]);
        assert_eq!(suggestions.len(), 2);
    }

    #[test]
    fn test_general_follow_ups_for_empty_retrieval() {
        let suggestions = SuggestionGenerator::new(5).suggest(&[], "general", &[]);
        assert_eq!(
            suggestions,
            vec![
                "What are the important dates to remember?",
                "How can I contact the office?",
            ]
        );
    }
}
