//! Keyword-matching reply stub.
//!
//! Answers a few recognizable intents (asking for help, thanks, greetings)
//! with fixed replies and otherwise rotates through general encouragement.

use std::sync::atomic::{AtomicUsize, Ordering};

use tutor_types::error::ResponderError;

use super::Responder;

const HELP_REPLY: &str = "I'm here to help! Can you tell me which part you're finding challenging? We can work through it together.";
const THANKS_REPLY: &str = "You're welcome! Keep up the great work. Is there anything else you'd like to learn about?";
const GREETING_REPLY: &str = "Hello! I'm your AI tutor. What would you like to learn about today?";

const GENERAL_REPLIES: [&str; 5] = [
    "That's an interesting question! Let me help you understand that better.",
    "Great question! Let's break this down step by step.",
    "I see what you're asking. Here's how we can approach this...",
    "That's a smart observation! Let me explain further.",
    "Good thinking! Let's explore this concept together.",
];

/// Stub responder: keyword rules first, then a rotating general reply.
#[derive(Debug, Default)]
pub struct KeywordResponder {
    next: AtomicUsize,
}

impl KeywordResponder {
    pub fn new() -> Self {
        Self::default()
    }

    fn reply_for(&self, input: &str) -> String {
        let lower = input.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric() && c != '\'')
            .filter(|w| !w.is_empty())
            .collect();

        if words.contains(&"help") || lower.contains("don't understand") {
            return HELP_REPLY.to_string();
        }
        if lower.contains("thank") {
            return THANKS_REPLY.to_string();
        }
        if words.iter().any(|w| matches!(*w, "hello" | "hi" | "hey")) {
            return GREETING_REPLY.to_string();
        }

        let idx = self.next.fetch_add(1, Ordering::Relaxed) % GENERAL_REPLIES.len();
        GENERAL_REPLIES[idx].to_string()
    }
}

impl Responder for KeywordResponder {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn respond(&self, input: &str) -> Result<String, ResponderError> {
        Ok(self.reply_for(input))
    }
}
