//! Prompt loader for built-in and workspace YAML prompt definitions.

use crate::types::PromptDefinition;
use std::path::Path;
use tripweave_core::{AppError, AppResult};

const BUILTIN_PROMPTS: &[(&str, &str)] = &[
    (
        "itinerary.plan",
        include_str!("../prompts/itinerary.plan.yml"),
    ),
    (
        "vibes.extract",
        include_str!("../prompts/vibes.extract.yml"),
    ),
];

/// IDs of the prompts compiled into the binary.
pub fn builtin_prompt_ids() -> Vec<&'static str> {
    BUILTIN_PROMPTS.iter().map(|(id, _)| *id).collect()
}

/// Load a prompt definition by ID.
///
/// A file named `<id>.yml` in the workspace's `.tripweave/prompts/`
/// directory takes precedence over the built-in definition of the same ID.
///
/// # Example
/// ```no_run
/// use tripweave_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), "itinerary.plan")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = workspace_path
        .join(".tripweave/prompts")
        .join(format!("{}.yml", prompt_id));

    let (contents, origin) = if prompt_file.exists() {
        tracing::debug!("Loading prompt override from: {:?}", prompt_file);
        let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
            AppError::Prompt(format!(
                "Failed to read prompt file {:?}: {}",
                prompt_file, e
            ))
        })?;
        (contents, prompt_file.display().to_string())
    } else {
        let builtin = BUILTIN_PROMPTS
            .iter()
            .find(|(id, _)| *id == prompt_id)
            .map(|(_, yaml)| *yaml)
            .ok_or_else(|| AppError::Prompt(format!("Unknown prompt: {}", prompt_id)))?;
        (builtin.to_string(), format!("built-in {}", prompt_id))
    };

    let definition: PromptDefinition = serde_yaml::from_str(&contents)
        .map_err(|e| AppError::Prompt(format!("Failed to parse prompt YAML {}: {}", origin, e)))?;

    validate_prompt(&definition)?;

    tracing::debug!("Loaded prompt: {} ({})", definition.id, origin);

    Ok(definition)
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.template.trim().is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_override(dir: &Path, id: &str, content: &str) {
        let prompts_dir = dir.join(".tripweave/prompts");
        fs::create_dir_all(&prompts_dir).unwrap();
        fs::write(prompts_dir.join(format!("{}.yml", id)), content).unwrap();
    }

    #[test]
    fn test_builtins_parse_and_validate() {
        let temp_dir = TempDir::new().unwrap();
        for id in builtin_prompt_ids() {
            let prompt = load_prompt(temp_dir.path(), id).unwrap();
            assert_eq!(prompt.id, id);
            assert!(prompt.system.is_some());
        }
    }

    #[test]
    fn test_workspace_override_wins() {
        let temp_dir = TempDir::new().unwrap();
        write_override(
            temp_dir.path(),
            "itinerary.plan",
            r#"
id: itinerary.plan
title: "Terse plan"
apiVersion: "1.1"
template: "{{question}} in {{days}} days"
output:
  format: text
"#,
        );

        let prompt = load_prompt(temp_dir.path(), "itinerary.plan").unwrap();
        assert_eq!(prompt.title, "Terse plan");
        assert!(prompt.system.is_none());
    }

    #[test]
    fn test_load_unknown_prompt() {
        let temp_dir = TempDir::new().unwrap();
        let result = load_prompt(temp_dir.path(), "nonexistent");
        assert!(matches!(result, Err(AppError::Prompt(_))));
    }

    #[test]
    fn test_load_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        write_override(temp_dir.path(), "broken", "invalid: yaml: content:");

        let result = load_prompt(temp_dir.path(), "broken");
        assert!(result.is_err());
    }
}
