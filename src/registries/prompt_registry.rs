use crate::contexts::{PromptError, PromptRegistry, PromptTemplate};
use std::fs;
use std::path::PathBuf;
use yaml_rust::{Yaml, YamlLoader};

pub const DEFAULT_PROMPTS_DIR: &str = "prompts";

/// File-based implementation of PromptRegistry
/// Loads prompt templates from `<prompts_dir>/<name>.yml`
#[derive(Clone, Debug)]
pub struct FilePromptRegistry {
    prompts_dir: PathBuf,
}

impl FilePromptRegistry {
    /// Creates a new FilePromptRegistry
    ///
    /// # Arguments
    /// * `prompts_dir` - Optional path to the prompts directory (defaults to "prompts")
    pub fn new(prompts_dir: Option<PathBuf>) -> Self {
        Self {
            prompts_dir: prompts_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_PROMPTS_DIR)),
        }
    }
}

impl PromptRegistry for FilePromptRegistry {
    fn get_template(&self, prompt_name: &str) -> Result<PromptTemplate, PromptError> {
        let prompt_path = self.prompts_dir.join(format!("{}.yml", prompt_name));

        if !prompt_path.exists() {
            return Err(PromptError::TemplateNotFound(prompt_name.to_string()));
        }

        let content = fs::read_to_string(&prompt_path).map_err(|e| {
            PromptError::InvalidTemplate(format!(
                "Failed to read prompt {}: {}",
                prompt_path.display(),
                e
            ))
        })?;
        parse_template(&content)
    }
}

/// Reads `system_prompt` (required) and `user_prompt` (defaults to the bare
/// question) from a prompt document
fn parse_template(yaml_content: &str) -> Result<PromptTemplate, PromptError> {
    let docs = YamlLoader::load_from_str(yaml_content)
        .map_err(|e| PromptError::InvalidTemplate(format!("Invalid YAML: {}", e)))?;

    let Some(doc) = docs.first() else {
        return Err(PromptError::InvalidTemplate("Empty YAML document".to_string()));
    };

    let field = |name: &str| match &doc[name] {
        Yaml::String(text) => Some(text.clone()),
        _ => None,
    };

    let system_prompt = field("system_prompt").ok_or_else(|| {
        PromptError::InvalidTemplate("No system_prompt field found in prompt".to_string())
    })?;

    Ok(PromptTemplate {
        system_prompt,
        user_prompt: field("user_prompt").unwrap_or_else(|| "{{input.question}}".to_string()),
    })
}
