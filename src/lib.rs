//! Summarize the active browser tab, or the captions of the YouTube video
//! playing in it, with a Groq chat completion.

pub mod api;
pub mod browser;
pub mod cli;
mod commands;
pub mod config;
pub mod error;
pub mod extract;
pub mod popup;
pub mod transcript;
