use crate::contexts::message_stream::{AnswerSource, ResolvedAnswer};
use crate::contexts::text_renderer::render_message;
use crate::data::Spec;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry of a conversation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tree: Option<Spec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<AnswerSource>,
    pub created_at: DateTime<Utc>,
}

/// Ordered messages of one chat session
#[derive(Debug, Clone, Default, Serialize)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    #[serde(skip)]
    counter: usize,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn get(&self, id: &str) -> Option<&ChatMessage> {
        self.messages.iter().find(|message| message.id == id)
    }

    fn next_id(&mut self, role: Role) -> String {
        self.counter += 1;
        match role {
            Role::User => format!("user-{}", self.counter),
            Role::Assistant => format!("assistant-{}", self.counter),
        }
    }

    fn push(&mut self, role: Role, text: String) -> String {
        let id = self.next_id(role);
        self.messages.push(ChatMessage {
            id: id.clone(),
            role,
            text,
            tree: None,
            source: None,
            created_at: Utc::now(),
        });
        id
    }

    /// Records a question and returns its id
    pub fn push_user(&mut self, text: &str) -> String {
        self.push(Role::User, text.to_string())
    }

    /// Opens an empty assistant message to be filled while streaming
    pub fn push_assistant_pending(&mut self) -> String {
        self.push(Role::Assistant, String::new())
    }

    /// Adds a finished assistant message, e.g. a canned greeting
    pub fn push_assistant_tree(&mut self, spec: Spec) -> String {
        let id = self.push_assistant_pending();
        self.set_tree(&id, spec);
        id
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut ChatMessage> {
        self.messages.iter_mut().find(|message| message.id == id)
    }

    /// Returns false when no message has this id
    pub fn set_text(&mut self, id: &str, text: &str) -> bool {
        self.get_mut(id)
            .map(|message| message.text = text.to_string())
            .is_some()
    }

    /// Returns false when no message has this id
    pub fn set_tree(&mut self, id: &str, spec: Spec) -> bool {
        self.get_mut(id)
            .map(|message| message.tree = Some(spec))
            .is_some()
    }

    /// Stores the final state of a streamed answer
    pub fn resolve(&mut self, id: &str, answer: ResolvedAnswer) -> bool {
        self.get_mut(id)
            .map(|message| {
                message.text = answer.text;
                message.tree = Some(answer.spec);
                message.source = Some(answer.source);
            })
            .is_some()
    }

    /// Plain-text transcript; each assistant tree is rendered on its own
    pub fn render_transcript(&self) -> String {
        self.messages
            .iter()
            .map(|message| match (message.role, &message.tree) {
                (Role::User, _) => format!("> {}", message.text),
                (Role::Assistant, Some(spec)) => render_message(spec),
                (Role::Assistant, None) => message.text.clone(),
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.messages)
    }
}
