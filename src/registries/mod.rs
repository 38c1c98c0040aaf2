mod model_registry;
mod prompt_registry;

pub use model_registry::{FileModelRegistry, DEFAULT_MODEL, DEFAULT_REGISTRY_PATH};
pub use prompt_registry::{FilePromptRegistry, DEFAULT_PROMPTS_DIR};
