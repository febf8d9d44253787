//! Built-in prompt definitions.
//!
//! A workspace may override any of these by placing a file with the same id
//! under `.campus/prompts/`.

use crate::types::PromptDefinition;

/// Prompt used to answer a student question from retrieved sources.
pub const RAG_ANSWER_PROMPT_ID: &str = "campus.rag.answer";

const RAG_ANSWER_PROMPT: &str = r#"
id: campus.rag.answer
title: Campus question answering
apiVersion: "1.0"
createdBy: campus-assistant
behavior:
  tone: friendly
  style: concise
variables: [language, context, history, query]
temperature: 0.3
system: |
  You are a helpful and {{tone}} Campus Assistant for a technical education institution.
  You answer student questions about admissions, fees, scholarships, examinations, timetables,
  hostel and campus facilities.

  Rules:
  - Use only the numbered sources below. Never invent dates, amounts or names.
  - Cite every source you rely on with its tag, for example [S1].
  - Keep the answer {{style}} and use simple language.
  - If the sources do not contain the answer, say so and suggest contacting the college office.

  The student's language is {{language}}; write your answer in English, it will be translated.

  Sources:
  {{context}}
template: |
  {{#if history}}Conversation so far:
  {{history}}

  {{/if}}Student's question: {{query}}
"#;

/// Look up a built-in prompt by id.
pub fn builtin_prompt(id: &str) -> Option<PromptDefinition> {
    let source = match id {
        RAG_ANSWER_PROMPT_ID => RAG_ANSWER_PROMPT,
        _ => return None,
    };

    match serde_yaml::from_str(source) {
        Ok(def) => Some(def),
        Err(e) => {
            tracing::error!("Built-in prompt {} is malformed: {}", id, e);
            None
        }
    }
}

/// Ids of all built-in prompts.
pub fn builtin_prompt_ids() -> &'static [&'static str] {
    &[RAG_ANSWER_PROMPT_ID]
}
