//! Inference client implementations for calmwire.
//!
//! All clients implement the `calmwire_core::InferenceClient` trait.
//! The router builds the configured one.

pub mod anthropic;
pub mod openai_compat;
pub mod router;
mod status;

pub use anthropic::AnthropicClient;
pub use openai_compat::OpenAiCompatClient;
pub use router::build_from_config;
