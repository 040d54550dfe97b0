//! LLM Provider implementations

pub mod anthropic;
pub mod ollama;
pub mod openai;
