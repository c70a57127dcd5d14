//! Prompt composition and the worked examples it embeds.

pub mod composer;
pub mod examples;

pub use composer::{ComposedPrompt, PromptComposer, PromptInput, SYSTEM_PROMPT};
pub use examples::{ExampleKind, FewShotExample};
