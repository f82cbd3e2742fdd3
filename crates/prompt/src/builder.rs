//! Prompt builder for rendering templates.

use crate::types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition};
use handlebars::Handlebars;
use std::collections::HashMap;
use tripweave_core::{AppError, AppResult};

/// Build a prompt from a definition and input variables.
///
/// Both the system and user templates are rendered. Rendering is strict: a
/// variable referenced by a template but absent from `variables` is an error.
///
/// # Example
/// ```no_run
/// use tripweave_prompt::{build_prompt, PromptDefinition};
/// use std::collections::HashMap;
///
/// # fn example(def: PromptDefinition) -> Result<(), Box<dyn std::error::Error>> {
/// let mut vars = HashMap::new();
/// vars.insert("question".to_string(), "成都美食三日游".to_string());
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

    let system = definition
        .system
        .as_deref()
        .map(|template| render_template(template, variables))
        .transpose()?
        .map(|s| s.trim().to_string());

    let user = render_template(&definition.template, variables)?;

    Ok(BuiltPrompt {
        system,
        user: user.trim_end().to_string(),
        metadata: BuiltPromptMetadata {
            source_prompt_id: definition.id.clone(),
            resolved_variables: variables.clone(),
        },
    })
}

/// Render a Handlebars template with variables.
fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Plain text, not HTML
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars.set_strict_mode(true);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render("prompt", variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}
