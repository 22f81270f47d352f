//! Message history and conversation threading.

use std::collections::HashMap;

use troupe_core::{AgentRole, Message};

/// Append-only record of every message posted to a bus instance,
/// indexed by conversation id for threading queries.
#[derive(Debug, Default)]
pub struct History {
    messages: Vec<Message>,
    conversations: HashMap<String, Vec<Message>>,
}

impl History {
    pub fn append(&mut self, message: &Message) {
        if let Some(conversation_id) = &message.conversation_id {
            self.conversations
                .entry(conversation_id.clone())
                .or_default()
                .push(message.clone());
        }
        self.messages.push(message.clone());
    }

    /// All messages for a conversation, in send order.
    pub fn conversation(&self, conversation_id: &str) -> Vec<Message> {
        self.conversations
            .get(conversation_id)
            .cloned()
            .unwrap_or_default()
    }

    /// The last `limit` messages sent by a role (all of them when `None`).
    pub fn from_sender(&self, sender: AgentRole, limit: Option<usize>) -> Vec<Message> {
        let sent: Vec<Message> = self
            .messages
            .iter()
            .filter(|m| m.sender == sender)
            .cloned()
            .collect();
        match limit {
            Some(n) if n < sent.len() => sent[sent.len() - n..].to_vec(),
            _ => sent,
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.conversations.clear();
    }
}
