// Chat module
// Retrieval-augmented chat engine and per-browser-session state

pub mod completion;
pub mod engine;
pub mod memory;
pub mod retriever;
pub mod session;

use serde::{Deserialize, Serialize};

pub use completion::{ChatModel, CompletionClient};
pub use engine::{ChatEngine, ChatResponse};
pub use memory::ChatMemory;
pub use retriever::{Retriever, VectorRetriever};
pub use session::{ChatSession, EngineFactory, SessionStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    #[inline]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    #[inline]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    #[inline]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}
