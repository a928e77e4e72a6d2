//! Prompt loader for YAML prompt definitions.

use crate::types::PromptDefinition;
use mentor_core::{AppError, AppResult};
use std::path::Path;

/// Identifier of the built-in answer prompt.
pub const ANSWER_PROMPT_ID: &str = "mentor.answer";

/// Variables every answer prompt must reference.
pub const ANSWER_VARIABLES: [&str; 2] = ["context", "question"];

const ANSWER_PROMPT_YAML: &str = include_str!("../templates/mentor.answer.yml");

/// Load the built-in mentor persona prompt.
pub fn default_answer_prompt() -> AppResult<PromptDefinition> {
    parse_prompt(ANSWER_PROMPT_YAML, "built-in mentor.answer")
}

/// Load a prompt definition from a YAML file.
///
/// # Example
/// ```no_run
/// use mentor_prompt::load_prompt_file;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt_file(Path::new("prompts/persona.yml"))?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt_file(path: &Path) -> AppResult<PromptDefinition> {
    tracing::debug!("Loading prompt from: {:?}", path);

    if !path.exists() {
        return Err(AppError::Prompt(format!("Prompt file not found: {:?}", path)));
    }

    let contents = std::fs::read_to_string(path).map_err(|e| {
        AppError::Prompt(format!("Failed to read prompt file {:?}: {}", path, e))
    })?;

    parse_prompt(&contents, &format!("{:?}", path))
}

/// Load the prompt override if one is configured, else the built-in one.
pub fn load_answer_prompt(path: Option<&Path>) -> AppResult<PromptDefinition> {
    match path {
        Some(path) => load_prompt_file(path),
        None => default_answer_prompt(),
    }
}

fn parse_prompt(contents: &str, origin: &str) -> AppResult<PromptDefinition> {
    let definition: PromptDefinition = serde_yaml::from_str(contents).map_err(|e| {
        AppError::Prompt(format!("Failed to parse prompt YAML {}: {}", origin, e))
    })?;

    validate_prompt(&definition)?;

    tracing::info!("Loaded prompt: {} ({})", definition.id, definition.title);

    Ok(definition)
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.api_version.is_empty() {
        return Err(AppError::Prompt(
            "Prompt apiVersion cannot be empty".to_string(),
        ));
    }

    if def.template.trim().is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    for variable in ANSWER_VARIABLES {
        if !references_variable(&def.template, variable) {
            return Err(AppError::Prompt(format!(
                "Prompt template '{}' must reference {{{{{}}}}}",
                def.id, variable
            )));
        }
    }

    Ok(())
}

/// Whether a handlebars template contains `{{name}}` (spacing and triple braces allowed).
fn references_variable(template: &str, name: &str) -> bool {
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            return false;
        };
        let inner = after[..end].trim_start_matches('{').trim();
        if inner == name {
            return true;
        }
        rest = &after[end + 2..];
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const VALID: &str = r#"
id: custom.answer
title: "Custom"
apiVersion: "1.0"
template: "Contexto: {{ context }}\nPergunta: {{question}}"
"#;

    #[test]
    fn test_default_prompt_is_valid() {
        let prompt = default_answer_prompt().unwrap();
        assert_eq!(prompt.id, ANSWER_PROMPT_ID);

        let ctx = prompt.template.find("CONTEXTO:").unwrap();
        let question = prompt.template.find("PERGUNTA DO USUÁRIO:").unwrap();
        let answer = prompt.template.find("RESPOSTA").unwrap();
        assert!(ctx < question && question < answer);
    }

    #[test]
    fn test_load_valid_prompt_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("custom.yml");
        fs::write(&path, VALID).unwrap();

        let prompt = load_prompt_file(&path).unwrap();
        assert_eq!(prompt.id, "custom.answer");
    }

    #[test]
    fn test_load_nonexistent_prompt() {
        let temp_dir = TempDir::new().unwrap();
        let result = load_prompt_file(&temp_dir.path().join("nope.yml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.yml");
        fs::write(&path, "invalid: yaml: content:").unwrap();

        assert!(load_prompt_file(&path).is_err());
    }

    #[test]
    fn test_template_must_reference_question() {
        let yaml = r#"
id: broken
title: Broken
apiVersion: "1.0"
template: "Only {{context}}"
"#;
        let err = parse_prompt(yaml, "test").unwrap_err();
        assert!(err.to_string().contains("{{question}}"));
    }

    #[test]
    fn test_references_variable() {
        assert!(references_variable("a {{context}} b", "context"));
        assert!(references_variable("a {{{ context }}} b", "context"));
        assert!(!references_variable("a {{contextual}} b", "context"));
        assert!(!references_variable("context", "context"));
    }

    #[test]
    fn test_load_answer_prompt_falls_back() {
        let prompt = load_answer_prompt(None).unwrap();
        assert_eq!(prompt.id, ANSWER_PROMPT_ID);
    }
}
