//! # calmwire mediator
//!
//! The message-analysis pipeline. [`Mediator::analyze`] decides, per
//! message, whether to let it through, attach a short comment, or withhold
//! it and offer two de-escalated rewrites.
//!
//! The mediator never blocks delivery because of its own faults: only
//! retryable inference failures are returned as errors.

pub mod context;
pub mod enrichment;
pub mod error_policy;
pub mod interpreter;
pub mod orchestrator;
pub mod prompt;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use context::{ContextAssembler, ContextBundle};
pub use enrichment::ModelEnricher;
pub use error_policy::ErrorCategory;
pub use interpreter::{ParsedVerdict, ResponseInterpreter};
pub use orchestrator::{AnalysisRequest, Mediator};
pub use prompt::{ComposedPrompt, PromptComposer};
