//! Prompt types for the Campus Assistant.
//!
//! This module defines the domain entities for the prompt system.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A prompt definition loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Unique prompt identifier
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Creator identifier
    #[serde(rename = "createdBy", default)]
    pub created_by: String,

    /// Behavioral settings, exposed to templates as `tone` and `style`
    pub behavior: PromptBehavior,

    /// Variables the caller must supply
    #[serde(default)]
    pub variables: Vec<String>,

    /// System message template (Handlebars)
    #[serde(default)]
    pub system: Option<String>,

    /// User message template (Handlebars)
    pub template: String,

    /// Sampling temperature for the generation call
    #[serde(default)]
    pub temperature: Option<f32>,
}

/// Behavioral settings for prompt execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptBehavior {
    /// Tone (e.g., "friendly", "formal")
    pub tone: String,

    /// Style (e.g., "concise", "detailed")
    pub style: String,
}

/// A fully built prompt ready for LLM execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPrompt {
    /// System message (optional)
    pub system: Option<String>,

    /// User message (required)
    pub user: String,

    /// Sampling temperature requested by the definition
    pub temperature: Option<f32>,

    /// Metadata about the built prompt
    pub metadata: BuiltPromptMetadata,
}

/// Metadata about a built prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPromptMetadata {
    /// Source prompt ID
    #[serde(rename = "sourcePromptId")]
    pub source_prompt_id: String,

    /// Template variables that were resolved
    #[serde(rename = "resolvedVariables")]
    pub resolved_variables: HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_definition_deserialization() {
        let yaml = r#"
id: test.prompt
title: Test Prompt
apiVersion: "1.0"
createdBy: test
behavior:
  tone: friendly
  style: concise
variables: [query]
system: "Answer in a {{tone}} way."
template: "{{query}}"
temperature: 0.3
"#;

        let def: PromptDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(def.id, "test.prompt");
        assert_eq!(def.behavior.tone, "friendly");
        assert_eq!(def.variables, vec!["query".to_string()]);
        assert_eq!(def.system.as_deref(), Some("Answer in a {{tone}} way."));
        assert_eq!(def.temperature, Some(0.3));
    }

    #[test]
    fn test_optional_fields_default() {
        let yaml = r#"
id: minimal
title: Minimal
apiVersion: "1.0"
behavior:
  tone: formal
  style: detailed
template: "{{query}}"
"#;

        let def: PromptDefinition = serde_yaml::from_str(yaml).unwrap();
        assert!(def.system.is_none());
        assert!(def.variables.is_empty());
        assert!(def.created_by.is_empty());
    }
}
