use crate::contexts::{AskError, ModelConfig, ModelRegistry};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use yaml_rust::{Yaml, YamlLoader};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_REGISTRY_PATH: &str = "prompts/model_registry.yml";

/// File-based implementation of ModelRegistry
/// Loads prompt-to-model mappings from a YAML file
#[derive(Clone, Debug)]
pub struct FileModelRegistry {
    registry_path: PathBuf,
    default_model: String,
}

impl FileModelRegistry {
    /// Creates a new FileModelRegistry
    ///
    /// # Arguments
    /// * `registry_path` - Optional path to registry file (defaults to "prompts/model_registry.yml")
    /// * `default_model` - Model for prompts the registry does not mention
    pub fn new(registry_path: Option<PathBuf>, default_model: Option<String>) -> Self {
        Self {
            registry_path: registry_path.unwrap_or_else(|| PathBuf::from(DEFAULT_REGISTRY_PATH)),
            default_model: default_model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }

    /// A missing registry file means every prompt uses the default model
    fn load_registry(&self) -> Result<HashMap<String, ModelConfig>, AskError> {
        if !self.registry_path.exists() {
            return Ok(HashMap::new());
        }

        let content = fs::read_to_string(&self.registry_path).map_err(|e| {
            AskError::ModelRegistry(format!(
                "Failed to read {}: {}",
                self.registry_path.display(),
                e
            ))
        })?;

        parse_registry(&content, &self.default_model)
    }
}

impl ModelRegistry for FileModelRegistry {
    fn get_model(&self, prompt_name: &str) -> Result<ModelConfig, AskError> {
        let mut registry = self.load_registry()?;
        Ok(registry.remove(prompt_name).unwrap_or_else(|| ModelConfig {
            model: self.default_model.clone(),
            temperature: None,
        }))
    }
}

/// Parses the YAML registry into a HashMap.
/// Entries are either a model name or `{model, temperature}`.
fn parse_registry(
    yaml_content: &str,
    default_model: &str,
) -> Result<HashMap<String, ModelConfig>, AskError> {
    let docs = YamlLoader::load_from_str(yaml_content)
        .map_err(|e| AskError::ModelRegistry(format!("Invalid registry YAML: {}", e)))?;

    let mut registry = HashMap::new();
    let Some(hash) = docs.first().and_then(Yaml::as_hash) else {
        return Ok(registry);
    };

    for (key, value) in hash {
        let Some(name) = key.as_str() else {
            continue;
        };

        let config = match value {
            Yaml::String(model) => ModelConfig {
                model: model.clone(),
                temperature: None,
            },
            Yaml::Hash(_) => ModelConfig {
                model: value["model"]
                    .as_str()
                    .unwrap_or(default_model)
                    .to_string(),
                temperature: match &value["temperature"] {
                    Yaml::Real(_) => value["temperature"].as_f64(),
                    Yaml::Integer(n) => Some(*n as f64),
                    _ => None,
                },
            },
            _ => ModelConfig {
                model: default_model.to_string(),
                temperature: None,
            },
        };

        registry.insert(name.to_string(), config);
    }

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_registry_plain_names() {
        let registry = parse_registry("answer: gpt-4o\nsummary: gpt-4o-mini\n", DEFAULT_MODEL).unwrap();
        assert_eq!(registry["answer"].model, "gpt-4o");
        assert_eq!(registry["answer"].temperature, None);
        assert_eq!(registry["summary"].model, "gpt-4o-mini");
    }

    #[test]
    fn test_parse_registry_with_settings() {
        let yaml = r#"
answer:
  model: gpt-4.1
  temperature: 0.3
strict:
  temperature: 0
"#;

        let registry = parse_registry(yaml, DEFAULT_MODEL).unwrap();
        assert_eq!(registry["answer"].model, "gpt-4.1");
        assert_eq!(registry["answer"].temperature, Some(0.3));
        assert_eq!(registry["strict"].model, DEFAULT_MODEL);
        assert_eq!(registry["strict"].temperature, Some(0.0));
    }

    #[test]
    fn test_parse_empty_registry() {
        assert!(parse_registry("", DEFAULT_MODEL).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(matches!(
            parse_registry("answer: [unclosed", DEFAULT_MODEL),
            Err(AskError::ModelRegistry(_))
        ));
    }

    #[test]
    fn test_missing_file_uses_default() {
        let registry = FileModelRegistry::new(Some(PathBuf::from("/nonexistent/models.yml")), None);
        let config = registry.get_model("answer").unwrap();
        assert_eq!(config.model, DEFAULT_MODEL);
    }
}
