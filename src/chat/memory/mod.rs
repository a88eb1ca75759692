
use std::collections::VecDeque;

use tracing::debug;

use super::{ChatMessage, Role};
use crate::embeddings::estimate_token_count;

/// Conversation history bounded by an estimated token budget.
///
/// The oldest messages are dropped first, and the retained history never starts
/// with an assistant message.
#[derive(Debug, Clone)]
pub struct ChatMemory {
    messages: VecDeque<ChatMessage>,
    token_limit: usize,
}

impl ChatMemory {
    #[inline]
    pub fn new(token_limit: usize) -> Self {
        Self {
            messages: VecDeque::new(),
            token_limit,
        }
    }

    #[inline]
    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push_back(message);
        self.trim();
    }

    #[inline]
    pub fn history(&self) -> Vec<ChatMessage> {
        self.messages.iter().cloned().collect()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[inline]
    pub fn token_count(&self) -> usize {
        self.messages
            .iter()
            .map(|m| estimate_token_count(&m.content))
            .sum()
    }

    #[inline]
    pub fn reset(&mut self) {
        self.messages.clear();
    }

    fn trim(&mut self) {
        let mut dropped = 0_usize;

        while self.messages.len() > 1 && self.token_count() > self.token_limit {
            self.messages.pop_front();
            dropped += 1;
        }

        while self
            .messages
            .front()
            .is_some_and(|m| m.role == Role::Assistant)
        {
            self.messages.pop_front();
            dropped += 1;
        }

        if dropped > 0 {
            debug!(
                "Dropped {} messages from chat memory ({} tokens remain)",
                dropped,
                self.token_count()
            );
        }
    }
}
