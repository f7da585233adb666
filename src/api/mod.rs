mod client;
mod types;

pub use client::{GroqClient, Summarizer, DEFAULT_MODEL};
pub use types::{ChatMessage, ChatRequest, ChatResponse, Choice, ChoiceMessage};
