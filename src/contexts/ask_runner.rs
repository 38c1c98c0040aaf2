use crate::contexts::completion::{CompletionError, CompletionRequest, CompletionSource};
use crate::contexts::message_stream::MessageStream;
use crate::contexts::FileCache;
use crate::data::{Cache, Profile};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;

/// Errors that can occur while populating a prompt
#[derive(Debug)]
pub enum PromptError {
    TemplateNotFound(String),
    InvalidTemplate(String),
    MissingMandatoryPlaceholder(String),
    InvalidPlaceholderPath(String),
}

impl fmt::Display for PromptError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PromptError::TemplateNotFound(name) => {
                write!(f, "Prompt '{}' not found in registry", name)
            }
            PromptError::InvalidTemplate(details) => {
                write!(f, "Prompt template is invalid: {}", details)
            }
            PromptError::MissingMandatoryPlaceholder(ph) => {
                write!(f, "Required placeholder '{}' could not be resolved", ph)
            }
            PromptError::InvalidPlaceholderPath(path) => {
                write!(f, "Invalid path '{}' in placeholder", path)
            }
        }
    }
}

impl std::error::Error for PromptError {}

/// Errors that can occur while answering a question
#[derive(Debug)]
pub enum AskError {
    Prompt(PromptError),
    ModelRegistry(String),
    Completion(CompletionError),
}

impl fmt::Display for AskError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AskError::Prompt(e) => write!(f, "{}", e),
            AskError::ModelRegistry(details) => {
                write!(f, "Failed to resolve model: {}", details)
            }
            AskError::Completion(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for AskError {}

impl From<PromptError> for AskError {
    fn from(e: PromptError) -> Self {
        AskError::Prompt(e)
    }
}

impl From<CompletionError> for AskError {
    fn from(e: CompletionError) -> Self {
        AskError::Completion(e)
    }
}

/// Unpopulated system and user prompts
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    pub system_prompt: String,
    pub user_prompt: String,
}

/// Model and sampling settings for one prompt
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub model: String,
    pub temperature: Option<f64>,
}

/// Trait for loading prompt templates by name
pub trait PromptRegistry {
    fn get_template(&self, prompt_name: &str) -> Result<PromptTemplate, PromptError>;
}

/// Trait for resolving which model answers a prompt
pub trait ModelRegistry {
    fn get_model(&self, prompt_name: &str) -> Result<ModelConfig, AskError>;
}

/// Values available to `answer` prompt placeholders
#[derive(Debug, Clone, Serialize)]
pub struct AskInput {
    pub question: String,
    pub profile: Profile,
}

/// How a run obtained its text
#[derive(Debug, Clone, PartialEq)]
pub struct AskOutcome {
    pub text: String,
    pub cached: bool,
}

/// Populates a prompt, streams the model's answer into a message and caches
/// the full text on disk
pub struct AskRunner<T, R, M>
where
    T: Serialize,
    R: PromptRegistry,
    M: ModelRegistry,
{
    prompt: String,
    input: T,
    prompt_registry: R,
    model_registry: M,
    /// Cache root; `None` disables caching
    cache_folder: Option<String>,
}

impl<T, R, M> AskRunner<T, R, M>
where
    T: Serialize,
    R: PromptRegistry,
    M: ModelRegistry,
{
    /// Creates a new AskRunner with caching disabled
    ///
    /// # Arguments
    /// * `prompt` - Name of the prompt template
    /// * `input` - Values for template population
    /// * `prompt_registry` - Registry for loading templates
    /// * `model_registry` - Registry for resolving models
    pub fn new(prompt: String, input: T, prompt_registry: R, model_registry: M) -> Self {
        Self {
            prompt,
            input,
            prompt_registry,
            model_registry,
            cache_folder: None,
        }
    }

    pub fn with_cache(mut self, folder: Option<String>) -> Self {
        self.cache_folder = folder;
        self
    }

    /// Loads the template and model and fills in every placeholder
    pub fn prepare(&self) -> Result<CompletionRequest, AskError> {
        let template = self.prompt_registry.get_template(&self.prompt)?;
        let model = self.model_registry.get_model(&self.prompt)?;
        let input = self.input_value()?;

        Ok(CompletionRequest {
            model: model.model,
            system_prompt: replace_placeholders(&template.system_prompt, &input)?,
            user_prompt: replace_placeholders(&template.user_prompt, &input)?,
            temperature: model.temperature,
        })
    }

    /// Streams the answer into `stream`.
    ///
    /// A cache hit replays the stored text as a single chunk.
    pub async fn run<C: CompletionSource>(
        &self,
        client: &C,
        stream: &mut MessageStream,
    ) -> Result<AskOutcome, AskError> {
        let template = self.prompt_registry.get_template(&self.prompt)?;
        let model = self.model_registry.get_model(&self.prompt)?;
        let instructions = format!("{}\n{}", template.system_prompt, template.user_prompt);

        let cache_key = self.generate_cache_key(&instructions);
        let cache = self.cache_for(&instructions, &model.model);

        if let Some(cached) = cache.as_ref().and_then(|cache| cache.get(&cache_key)) {
            tracing::debug!(key = %cache_key, "answer served from cache");
            stream.push_chunk(&cached);
            return Ok(AskOutcome {
                text: cached,
                cached: true,
            });
        }

        let request = self.prepare()?;
        let mut on_chunk = |chunk: &str| {
            if let Some(spec) = stream.push_chunk(chunk) {
                tracing::debug!(elements = spec.len(), "tree updated");
            }
        };
        let text = client.stream(&request, &mut on_chunk).await?;

        if let Some(cache) = cache.filter(|_| !text.trim().is_empty()) {
            cache.set(&cache_key, &text);
        }

        Ok(AskOutcome {
            text,
            cached: false,
        })
    }

    fn input_value(&self) -> Result<Value, PromptError> {
        serde_json::to_value(&self.input).map_err(|e| PromptError::InvalidTemplate(e.to_string()))
    }

    /// Hash of the prompt instructions and the serialized input
    fn generate_cache_key(&self, instructions: &str) -> String {
        let input_json = serde_json::to_string(&self.input).unwrap_or_else(|_| "{}".to_string());
        sha256_hex(&format!("{}:{}", instructions, input_json))
    }

    /// Cache namespaced by hash(instructions + model)
    fn cache_for(&self, instructions: &str, model: &str) -> Option<FileCache> {
        let folder = self.cache_folder.clone()?;
        let namespace = sha256_hex(&format!("{}:{}", instructions, model));
        Some(FileCache::new(Some(folder), namespace))
    }
}

fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Replaces `{{input.path}}` and `{{input.path?}}` placeholders.
///
/// Strings are inserted verbatim, other values as JSON. A missing optional
/// placeholder is removed; a missing mandatory one is an error.
pub fn replace_placeholders(template: &str, input: &Value) -> Result<String, PromptError> {
    let mut result = template.to_string();
    let mut offset = 0;

    while let Some(start) = result[offset..].find("{{") {
        let start = offset + start;
        let Some(end_pos) = result[start..].find("}}") else {
            break;
        };
        let end = start + end_pos;

        let placeholder = result[start + 2..end].trim();
        let (path, is_optional) = match placeholder.strip_suffix('?') {
            Some(path) => (path, true),
            None => (placeholder, false),
        };

        let replacement = match resolve_path(input, path)? {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) => String::new(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            Some(other) => serde_json::to_string_pretty(other)
                .map_err(|e| PromptError::InvalidTemplate(e.to_string()))?,
            None if is_optional => String::new(),
            None => return Err(PromptError::MissingMandatoryPlaceholder(path.to_string())),
        };

        result.replace_range(start..end + 2, &replacement);
        offset = start + replacement.len();
    }

    Ok(result)
}

/// Resolves a dotted `input.a.b` path; `Ok(None)` when a segment is absent
fn resolve_path<'a>(value: &'a Value, path: &str) -> Result<Option<&'a Value>, PromptError> {
    let mut parts = path.split('.');
    if parts.next() != Some("input") {
        return Err(PromptError::InvalidPlaceholderPath(path.to_string()));
    }

    let mut current = value;
    for part in parts {
        match current.get(part) {
            Some(v) => current = v,
            None => return Ok(None),
        }
    }
    Ok(Some(current))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;

    #[derive(Serialize)]
    struct TestInput {
        name: String,
        value: i32,
    }

    struct TestRegistry;

    impl PromptRegistry for TestRegistry {
        fn get_template(&self, prompt_name: &str) -> Result<PromptTemplate, PromptError> {
            if prompt_name != "answer" {
                return Err(PromptError::TemplateNotFound(prompt_name.to_string()));
            }
            Ok(PromptTemplate {
                system_prompt: "Answer for {{input.name}}".to_string(),
                user_prompt: "{{input.value}}".to_string(),
            })
        }
    }

    struct TestModelRegistry;

    impl ModelRegistry for TestModelRegistry {
        fn get_model(&self, _prompt_name: &str) -> Result<ModelConfig, AskError> {
            Ok(ModelConfig {
                model: "test-model".to_string(),
                temperature: None,
            })
        }
    }

    /// Replays fixed chunks and records every request it receives
    struct ScriptedSource {
        chunks: Vec<&'static str>,
        requests: RefCell<Vec<CompletionRequest>>,
    }

    impl ScriptedSource {
        fn new(chunks: Vec<&'static str>) -> Self {
            Self {
                chunks,
                requests: RefCell::new(Vec::new()),
            }
        }
    }

    impl CompletionSource for ScriptedSource {
        async fn stream(
            &self,
            request: &CompletionRequest,
            on_chunk: &mut dyn FnMut(&str),
        ) -> Result<String, CompletionError> {
            self.requests.borrow_mut().push(request.clone());
            for chunk in &self.chunks {
                on_chunk(chunk);
            }
            Ok(self.chunks.concat())
        }
    }

    fn runner(name: &str) -> AskRunner<TestInput, TestRegistry, TestModelRegistry> {
        AskRunner::new(
            "answer".to_string(),
            TestInput {
                name: name.to_string(),
                value: 42,
            },
            TestRegistry,
            TestModelRegistry,
        )
    }

    #[test]
    fn test_placeholder_replacement() {
        let input = json!({"name": "Alice", "value": 100, "nested": {"city": "Paris"}});
        assert_eq!(
            replace_placeholders("Hello {{input.name}}, {{input.value}} in {{input.nested.city}}", &input)
                .unwrap(),
            "Hello Alice, 100 in Paris"
        );
        assert_eq!(replace_placeholders("Age: {{input.age?}}", &input).unwrap(), "Age: ");
    }

    #[test]
    fn test_objects_are_inserted_as_json() {
        let input = json!({"profile": {"name": "Ann"}});
        let populated = replace_placeholders("{{input.profile}}", &input).unwrap();
        assert_eq!(serde_json::from_str::<Value>(&populated).unwrap()["name"], "Ann");
    }

    #[test]
    fn test_placeholder_errors() {
        let input = json!({"name": "Dave"});
        assert!(matches!(
            replace_placeholders("{{input.missing}}", &input),
            Err(PromptError::MissingMandatoryPlaceholder(path)) if path == "input.missing"
        ));
        assert!(matches!(
            replace_placeholders("{{output.field}}", &input),
            Err(PromptError::InvalidPlaceholderPath(path)) if path == "output.field"
        ));
    }

    #[test]
    fn test_replacement_text_is_not_rescanned() {
        let input = json!({"name": "{{input.name}}"});
        assert_eq!(
            replace_placeholders("{{input.name}}!", &input).unwrap(),
            "{{input.name}}!"
        );
    }

    #[test]
    fn test_prepare_populates_both_prompts() {
        let request = runner("Bob").prepare().unwrap();
        assert_eq!(request.model, "test-model");
        assert_eq!(request.system_prompt, "Answer for Bob");
        assert_eq!(request.user_prompt, "42");
    }

    #[test]
    fn test_unknown_prompt() {
        let runner = AskRunner::new(
            "missing".to_string(),
            json!({}),
            TestRegistry,
            TestModelRegistry,
        );
        assert!(matches!(
            runner.prepare(),
            Err(AskError::Prompt(PromptError::TemplateNotFound(_)))
        ));
    }

    #[test]
    fn test_cache_key_depends_on_input() {
        let a = runner("a").generate_cache_key("instructions");
        let b = runner("b").generate_cache_key("instructions");
        assert_eq!(a, runner("a").generate_cache_key("instructions"));
        assert_ne!(a, b);
        assert_ne!(a, runner("a").generate_cache_key("other"));
    }

    #[tokio::test]
    async fn test_run_streams_chunks_into_message() {
        let source = ScriptedSource::new(vec!["{\"type\":", "\"Card\"}"]);
        let mut stream = MessageStream::new("q");

        let outcome = runner("Cy").run(&source, &mut stream).await.unwrap();
        assert!(!outcome.cached);
        assert_eq!(outcome.text, "{\"type\":\"Card\"}");
        assert_eq!(stream.chunks(), 2);
        assert!(stream.latest().is_some());
        assert_eq!(source.requests.borrow().len(), 1);
    }

    #[tokio::test]
    async fn test_second_run_is_served_from_cache() {
        let folder = format!("/tmp/folio_ask_test_{}", std::process::id());
        let source = ScriptedSource::new(vec!["Plain ", "answer."]);

        let mut first = MessageStream::new("q");
        let runner = runner("Di").with_cache(Some(folder.clone()));
        runner.run(&source, &mut first).await.unwrap();

        let mut second = MessageStream::new("q");
        let outcome = runner.run(&source, &mut second).await.unwrap();
        assert!(outcome.cached);
        assert_eq!(second.buffer(), "Plain answer.");
        assert_eq!(second.chunks(), 1);
        assert_eq!(source.requests.borrow().len(), 1);

        let _ = std::fs::remove_dir_all(&folder);
    }
}
