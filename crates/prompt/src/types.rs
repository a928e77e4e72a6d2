//! Prompt types for the Mentor RAG service.
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

    /// Input specification
    #[serde(default)]
    pub input: PromptInputSpec,

    /// Template string with Handlebars syntax
    pub template: String,
}

/// Input specification for the prompt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptInputSpec {
    /// Variables the template expects
    #[serde(default)]
    pub variables: Vec<String>,
}

/// A fully built prompt ready for LLM execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPrompt {
    /// Rendered user message
    pub user: String,

    /// Metadata about the built prompt
    pub metadata: BuiltPromptMetadata,
}

/// Metadata about a built prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPromptMetadata {
    /// Source prompt ID
    #[serde(rename = "sourcePromptId")]
    pub source_prompt_id: String,

    /// Names of the template variables that were supplied
    #[serde(rename = "resolvedVariables")]
    pub resolved_variables: Vec<String>,
}

impl BuiltPrompt {
    /// Create a new built prompt.
    pub fn new(
        user: String,
        source_prompt_id: String,
        variables: &HashMap<String, String>,
    ) -> Self {
        let mut resolved_variables: Vec<String> = variables.keys().cloned().collect();
        resolved_variables.sort();

        Self {
            user,
            metadata: BuiltPromptMetadata {
                source_prompt_id,
                resolved_variables,
            },
        }
    }
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
input:
  variables: [context, question]
template: "{{context}} {{question}}"
"#;

        let def: PromptDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(def.id, "test.prompt");
        assert_eq!(def.input.variables, vec!["context", "question"]);
    }

    #[test]
    fn test_optional_sections_default() {
        let yaml = r#"
id: minimal
title: Minimal
apiVersion: "1.0"
template: "{{context}} {{question}}"
"#;

        let def: PromptDefinition = serde_yaml::from_str(yaml).unwrap();
        assert!(def.input.variables.is_empty());
    }

    #[test]
    fn test_built_prompt_creation() {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), "q".to_string());
        vars.insert("context".to_string(), "c".to_string());

        let built = BuiltPrompt::new("User message".to_string(), "test.prompt".to_string(), &vars);

        assert_eq!(built.user, "User message");
        assert_eq!(built.metadata.source_prompt_id, "test.prompt");
        assert_eq!(built.metadata.resolved_variables, vec!["context", "question"]);
    }
}
