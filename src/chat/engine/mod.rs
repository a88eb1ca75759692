#[cfg(test)]
mod tests;

use std::sync::Arc;

use itertools::Itertools;
use tracing::{debug, info};

use super::{ChatMemory, ChatMessage, ChatModel, Retriever, Role};
use crate::config::ChatConfig;
use crate::store::SearchResult;

const CONDENSE_PROMPT: &str = "Given the following conversation between a user and an AI assistant \
and a follow up question from the user, rephrase the follow up question to be a standalone question \
in the language it was asked in. Reply with the question only.";

const CONTEXT_HEADER: &str = "Here are the relevant documents for the context:";

const CONTEXT_INSTRUCTION: &str = "Instruction: Based on the above documents, provide a detailed \
answer for the user question below. If the answer is not in the documents, say that the \
information is not available.";

/// Assistant reply plus the documents it was grounded on
#[derive(Debug, Clone, PartialEq)]
pub struct ChatResponse {
    pub response: String,
    pub standalone_question: String,
    pub sources: Vec<SearchResult>,
}

/// Condense-plus-context chat over the indexed documentation
pub struct ChatEngine {
    model: Arc<dyn ChatModel>,
    retriever: Arc<dyn Retriever>,
    system_prompt: String,
    similarity_top_k: usize,
    memory: ChatMemory,
}

impl ChatEngine {
    #[inline]
    pub fn new(model: Arc<dyn ChatModel>, retriever: Arc<dyn Retriever>, config: &ChatConfig) -> Self {
        Self {
            model,
            retriever,
            system_prompt: config.system_prompt.clone(),
            similarity_top_k: config.similarity_top_k,
            memory: ChatMemory::new(config.memory_token_limit),
        }
    }

    #[inline]
    pub fn memory(&self) -> &ChatMemory {
        &self.memory
    }

    /// Answer one user message.
    ///
    /// Memory is only updated when the whole turn succeeds.
    #[inline]
    pub async fn chat(&mut self, message: &str) -> crate::Result<ChatResponse> {
        let history = self.memory.history();

        let standalone_question = if history.is_empty() {
            message.to_string()
        } else {
            self.condense_question(&history, message).await?
        };
        debug!("Standalone question: {}", standalone_question);

        let sources = self
            .retriever
            .retrieve(&standalone_question, self.similarity_top_k)
            .await?;

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(self.system_message(&sources)));
        messages.extend(history);
        messages.push(ChatMessage::user(message));

        let response = self.model.complete(messages).await?;

        self.memory.push(ChatMessage::user(message));
        self.memory.push(ChatMessage::assistant(response.clone()));

        info!(
            "Answered chat turn using {} retrieved documents",
            sources.len()
        );

        Ok(ChatResponse {
            response,
            standalone_question,
            sources,
        })
    }

    #[inline]
    pub fn reset(&mut self) {
        self.memory.reset();
    }

    async fn condense_question(
        &self,
        history: &[ChatMessage],
        message: &str,
    ) -> crate::Result<String> {
        let transcript = history
            .iter()
            .map(|m| format!("{}: {}", role_label(m.role), m.content))
            .join("\n");

        let prompt = format!(
            "{CONDENSE_PROMPT}\n\nChat History:\n{transcript}\nFollow Up Input: {message}\nStandalone question:"
        );

        let condensed = self.model.complete(vec![ChatMessage::user(prompt)]).await?;
        let condensed = condensed.trim();

        if condensed.is_empty() {
            Ok(message.to_string())
        } else {
            Ok(condensed.to_string())
        }
    }

    fn system_message(&self, sources: &[SearchResult]) -> String {
        let context = sources.iter().map(|s| s.text.trim_end()).join("\n\n");

        format!(
            "{}\n\n{CONTEXT_HEADER}\n\n{context}\n\n{CONTEXT_INSTRUCTION}",
            self.system_prompt
        )
    }
}

const fn role_label(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}
