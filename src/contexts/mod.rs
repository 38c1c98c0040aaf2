mod answer_synthesizer;
mod ask_runner;
mod canned_answers;
mod completion;
mod conversation;
mod file_cache;
mod message_stream;
mod spec_normalizer;
mod stream_extractor;
mod text_renderer;
mod tree_builder;

pub use answer_synthesizer::{
    build_tree_from_answer, outline_answer, sniff_presentation, AnswerOutline, Presentation,
    FALLBACK_SUMMARY,
};
pub use ask_runner::{
    replace_placeholders, AskError, AskInput, AskOutcome, AskRunner, ModelConfig, ModelRegistry,
    PromptError, PromptRegistry, PromptTemplate,
};
pub use canned_answers::{
    build_answer_tree, build_intro_tree, build_summary_tree, follow_ups, route_topic, Topic,
};
pub use completion::{
    CompletionError, CompletionRequest, CompletionSource, OpenAiClient, SseDecoder,
    DEFAULT_BASE_URL,
};
pub use conversation::{ChatMessage, Conversation, Role};
pub use file_cache::{FileCache, DEFAULT_CACHE_FOLDER};
pub use message_stream::{AnswerSource, MessageStream, ResolvedAnswer};
pub use spec_normalizer::{
    classify, normalize, normalize_spec, Normalized, Repair, RepairRule, SourceShape,
    WRAPPER_TYPE,
};
pub use stream_extractor::{extract, extract_spec, json_candidate, Extraction, StreamPhase};
pub use text_renderer::{render, render_message, RenderError, RENDER_FAILED_PLACEHOLDER};
pub use tree_builder::{create_tree, node, Node};
