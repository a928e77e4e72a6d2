//! Prompt builder for rendering templates.

use crate::types::{BuiltPrompt, PromptDefinition};
use mentor_core::{AppError, AppResult};
use handlebars::Handlebars;
use std::collections::HashMap;

/// Build a prompt from a definition and input variables.
///
/// The whole rendered template becomes the user message.
///
/// # Example
/// ```no_run
/// use mentor_prompt::{build_prompt, PromptDefinition};
/// use std::collections::HashMap;
///
/// # fn example(def: PromptDefinition) -> Result<(), Box<dyn std::error::Error>> {
/// let mut vars = HashMap::new();
/// vars.insert("context".to_string(), "...".to_string());
/// vars.insert("question".to_string(), "Como liderar?".to_string());
///
/// let built = build_prompt(&def, &vars)?;
/// println!("User prompt: {}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: &HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    for expected in &definition.input.variables {
        if !variables.contains_key(expected) {
            tracing::warn!(prompt = %definition.id, variable = %expected, "Template variable not supplied");
        }
    }

    let rendered = render_template(&definition.template, variables)?;

    Ok(BuiltPrompt::new(
        rendered,
        definition.id.clone(),
        variables,
    ))
}

/// Render a Handlebars template with variables.
fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Disable HTML escaping for plain text
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    let rendered = handlebars
        .render("prompt", &variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))?;

    Ok(rendered)
}
