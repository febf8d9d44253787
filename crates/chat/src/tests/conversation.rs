use super::harness::*;
use crate::messages::{STARTER_QUESTIONS, WELCOME_MESSAGE};
use crate::session_store::SessionStore;
use crate::types::{ChatRequest, EscalationReason, TurnRole};
use campus_core::AppError;
use campus_knowledge::KnowledgeStore;

#[tokio::test]
async fn test_fee_question_answered_from_faq() {
    let h = campus().await;
    h.llm
        .reply("The tuition fee for B.Tech is ₹50,000 per semester [S1].");

    let response = h.pipeline.chat(ChatRequest::new(FEE_QUESTION)).await.unwrap();

    assert_eq!(response.detected_language, "en");
    assert_eq!(response.response_language, "en");
    assert_eq!(response.intent.as_deref(), Some("fees"));
    assert_eq!(response.confidence, 70);
    assert!(!response.needs_escalation);
    assert_eq!(response.sources.len(), 1);
    assert_eq!(response.sources[0].title, FEE_QUESTION);
    assert!(response.response.contains("₹50,000"));
    assert!(response.suggested_questions.len() <= 5);
    assert!(!response
        .suggested_questions
        .iter()
        .any(|q| q == FEE_QUESTION));
    assert!(h.sessions.list_escalations(None).unwrap().is_empty());
}

#[tokio::test]
async fn test_prompt_carries_sources_and_language() {
    let h = campus().await;
    h.llm.reply("₹50,000 per semester [S1].");

    h.pipeline
        .chat(ChatRequest::new(FEE_QUESTION).with_language("ta"))
        .await
        .unwrap();

    let requests = h.llm.requests.lock().unwrap();
    let system = requests[0].system.as_deref().unwrap_or_default();
    assert!(system.contains("[S1]"));
    assert!(system.contains("Tamil"));
    assert!(requests[0].prompt.contains(FEE_QUESTION));
}

#[tokio::test]
async fn test_unrelated_question_escalates() {
    let h = campus().await;

    let response = h
        .pipeline
        .chat(ChatRequest::new("asdkjh qwpoeiru zxmcnv"))
        .await
        .unwrap();

    assert_eq!(response.confidence, 0);
    assert!(response.sources.is_empty());
    assert!(response.needs_escalation);

    let records = h.sessions.list_escalations(None).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].session_id, response.session_id);
    assert!(records[0].reasons.contains(&EscalationReason::LowConfidence));
    assert!(records[0].reasons.contains(&EscalationReason::EmptyRetrieval));
}

#[tokio::test]
async fn test_hinglish_round_trip() {
    let h = campus().await;
    h.llm.reply("The hostel fee is ₹40,000 per year [S1].");

    let response = h.pipeline.chat(ChatRequest::new(HINGLISH_HOSTEL)).await.unwrap();

    assert_eq!(response.detected_language, "hi");
    assert_eq!(response.response_language, "hi");
    assert_eq!(response.confidence, 70);
    assert!(response.response.starts_with("[hi]"));
    assert!(response.response.contains("₹40,000"));
    assert!(response.response.contains("[S1]"));

    let session = h
        .sessions
        .load_session(&response.session_id)
        .unwrap()
        .unwrap();
    assert_eq!(session.language, "hi");
    let user = &session.turns[0];
    assert_eq!(user.content, HINGLISH_HOSTEL);
    assert_eq!(user.pivot_text.as_deref(), Some(HOSTEL_QUESTION));
    assert_eq!(user.detected_language.as_deref(), Some("hi"));
}

#[tokio::test]
async fn test_preferred_language_overrides_detection() {
    let h = campus().await;
    h.llm
        .reply("The tuition fee for B.Tech is ₹50,000 per semester [S1].");

    let response = h
        .pipeline
        .chat(ChatRequest::new(FEE_QUESTION).with_language("ta"))
        .await
        .unwrap();

    assert_eq!(response.detected_language, "en");
    assert_eq!(response.response_language, "ta");
    assert!(response.response.starts_with("[ta]"));
    assert!(response.response.contains("₹50,000"));
}

#[tokio::test]
async fn test_unsupported_preferred_language_is_ignored() {
    let h = campus().await;

    let response = h
        .pipeline
        .chat(ChatRequest::new(FEE_QUESTION).with_language("fr"))
        .await
        .unwrap();

    assert_eq!(response.response_language, "en");
}

#[tokio::test]
async fn test_undetectable_message_uses_session_language() {
    let h = campus().await;
    let first = h.pipeline.chat(ChatRequest::new(HINGLISH_HOSTEL)).await.unwrap();

    let second = h
        .pipeline
        .chat(ChatRequest::new("??").in_session(first.session_id.clone()))
        .await
        .unwrap();

    assert_eq!(second.session_id, first.session_id);
    assert_eq!(second.detected_language, "hi");
    assert_eq!(second.response_language, "hi");
}

#[tokio::test]
async fn test_consecutive_low_confidence_escalates_third_turn() {
    let h = campus().await;
    let mut session_id: Option<String> = None;
    let mut escalations = Vec::new();

    for _ in 0..3 {
        h.llm.reply("The library is open 8 AM to 10 PM [S1].");
        let mut request = ChatRequest::new(LIBRARY_QUERY);
        if let Some(id) = &session_id {
            request = request.in_session(id.clone());
        }
        let response = h.pipeline.chat(request).await.unwrap();
        assert_eq!(response.confidence, 55);
        escalations.push(response.needs_escalation);
        session_id = Some(response.session_id);
    }

    assert_eq!(escalations, vec![false, false, true]);
    let records = h.sessions.list_escalations(None).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(
        records[0].reasons,
        vec![EscalationReason::ConsecutiveLowConfidence]
    );
}

#[tokio::test]
async fn test_trigger_keyword_escalates() {
    let h = campus().await;

    let response = h
        .pipeline
        .chat(ChatRequest::new("I want to file a complaint about the hostel fee"))
        .await
        .unwrap();

    assert!(response.needs_escalation);
    let records = h.sessions.list_escalations(None).unwrap();
    assert!(records[0].reasons.contains(&EscalationReason::TriggerKeyword));
}

#[tokio::test]
async fn test_each_message_appends_two_turns() {
    let h = campus().await;
    let first = h.pipeline.chat(ChatRequest::new(FEE_QUESTION)).await.unwrap();
    let id = first.session_id.clone();

    for message in [HOSTEL_QUESTION, LIBRARY_QUERY, "Thanks!"] {
        let response = h
            .pipeline
            .chat(ChatRequest::new(message).in_session(id.clone()))
            .await
            .unwrap();
        assert_eq!(response.session_id, id);
    }

    let session = h.sessions.load_session(&id).unwrap().unwrap();
    assert_eq!(session.turns.len(), 8);
    for (i, turn) in session.turns.iter().enumerate() {
        let expected = if i % 2 == 0 {
            TurnRole::User
        } else {
            TurnRole::Assistant
        };
        assert_eq!(turn.role, expected);
    }
    assert!(session.turns[1].confidence.is_some());
}

#[tokio::test]
async fn test_unknown_session_id_starts_new_session() {
    let h = campus().await;

    let response = h
        .pipeline
        .chat(ChatRequest::new(FEE_QUESTION).in_session("no-such-session"))
        .await
        .unwrap();

    assert_ne!(response.session_id, "no-such-session");
    assert!(h
        .sessions
        .load_session(&response.session_id)
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_empty_message_rejected() {
    let h = campus().await;

    let err = h.pipeline.chat(ChatRequest::new("   ")).await.unwrap_err();

    assert!(matches!(err, AppError::InvalidInput(_)));
    assert_eq!(h.llm.request_count(), 0);
}

#[tokio::test]
async fn test_reindex_is_idempotent() {
    let h = campus().await;
    let before = h
        .pipeline
        .retriever()
        .retrieve(FEE_QUESTION, 5, None)
        .await
        .unwrap();

    let first = h.pipeline.reindex_knowledge_base().await.unwrap();
    let second = h.pipeline.reindex_knowledge_base().await.unwrap();
    let after = h
        .pipeline
        .retriever()
        .retrieve(FEE_QUESTION, 5, None)
        .await
        .unwrap();

    assert_eq!(first.indexed, 3);
    assert_eq!(second.indexed, 3);
    assert_eq!(before.len(), after.len());
    assert_eq!(before[0].item.id, after[0].item.id);
    assert_eq!(before[0].score, after[0].score);
}

#[tokio::test]
async fn test_deactivated_faq_disappears_after_reindex() {
    let h = campus().await;
    assert!(h.knowledge.set_faq_active("faq-fees", false).unwrap());

    let response = h.pipeline.reindex_knowledge_base().await.unwrap();
    assert_eq!(response.indexed, 2);

    let results = h
        .pipeline
        .retriever()
        .retrieve(FEE_QUESTION, 5, None)
        .await
        .unwrap();
    assert!(results.iter().all(|r| r.item.id != "faq-fees"));
}

#[tokio::test]
async fn test_welcome_message_default_language() {
    let h = campus().await;

    let welcome = h.pipeline.welcome_message(None).await;

    assert_eq!(welcome.response, WELCOME_MESSAGE);
    assert_eq!(welcome.suggested_questions.len(), STARTER_QUESTIONS.len().min(5));
    assert_eq!(welcome.suggested_questions[0], STARTER_QUESTIONS[0]);
}

#[tokio::test]
async fn test_welcome_message_translated() {
    let h = campus().await;

    let welcome = h.pipeline.welcome_message(Some("gu")).await;

    assert!(welcome.response.starts_with("[gu]"));
    assert!(welcome
        .suggested_questions
        .iter()
        .all(|q| q.starts_with("[gu]")));
}

#[tokio::test]
async fn test_supported_languages_follow_config() {
    let h = campus().await;

    let codes: Vec<&str> = h
        .pipeline
        .supported_languages()
        .iter()
        .map(|l| l.code)
        .collect();

    assert_eq!(codes, vec!["en", "hi", "raj", "gu", "mr", "pa", "ta"]);
}
