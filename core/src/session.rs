//! Conversation bookkeeping for one interactive session.

use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::client::Assistant;
use crate::conversation::{ContextPolicy, Conversation, ConversationTurn, Speaker};

/// Reasons a send is refused before anything is recorded or sent
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SendError {
    #[error("Please enter your Gemini API Key before sending a message.")]
    MissingApiKey,

    #[error("Please describe your symptoms before sending.")]
    EmptyMessage,
}

/// State owned by one user session: the conversation, the selected model and
/// the credentialed assistant (once configured).
#[derive(Debug)]
pub struct ChatSession<A> {
    id: Uuid,
    conversation: Conversation,
    model_name: String,
    policy: ContextPolicy,
    assistant: Option<A>,
}

impl<A: Assistant> ChatSession<A> {
    pub fn new(model_name: impl Into<String>, policy: ContextPolicy) -> Self {
        let id = Uuid::new_v4();
        debug!(session = %id, "Created chat session");
        Self {
            id,
            conversation: Conversation::new(),
            model_name: model_name.into(),
            policy,
            assistant: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Installs the credentialed assistant used by every following send
    pub fn configure(&mut self, assistant: A) {
        self.assistant = Some(assistant);
    }

    pub fn is_configured(&self) -> bool {
        self.assistant.is_some()
    }

    pub fn assistant(&self) -> Option<&A> {
        self.assistant.as_ref()
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn set_model_name(&mut self, model_name: impl Into<String>) {
        self.model_name = model_name.into();
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Starts over with an empty conversation
    pub fn clear(&mut self) {
        self.conversation.clear();
    }

    /// Records the user's message, asks the assistant and records its reply.
    ///
    /// Validation happens before anything is appended: without a configured
    /// assistant or with blank text the conversation is left untouched and no
    /// request is made. A failed generation is recorded as the assistant's
    /// reply, so every accepted send adds exactly one user and one assistant turn.
    pub async fn send(&mut self, text: &str) -> Result<&ConversationTurn, SendError> {
        let assistant = self.assistant.as_ref().ok_or(SendError::MissingApiKey)?;

        if text.trim().is_empty() {
            return Err(SendError::EmptyMessage);
        }

        self.conversation.append(Speaker::User, text);
        let context = self.conversation.context_window(true, &self.policy);

        let reply = match assistant
            .generate_reply(&self.model_name, text, &context)
            .await
        {
            Ok(reply) => reply,
            Err(message) => {
                warn!(session = %self.id, "{}", message);
                message
            }
        };

        Ok(self.conversation.append(Speaker::Assistant, reply))
    }
}
