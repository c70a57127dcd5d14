//! # calmwire core
//!
//! Domain types, capability traits, and error definitions for the calmwire
//! message-mediation engine. This crate does no I/O. It defines the model
//! every other crate implements against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is a trait here (inference, cache, detector,
//! profile and situational sources, enrichment, learning). Implementations
//! live in their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod analysis;
pub mod cache;
pub mod context;
pub mod error;
pub mod inference;
pub mod learning;
pub mod message;
pub mod state;

// Re-export key types at crate root for ergonomics
pub use analysis::{
    AnalysisResult, AxiomCategory, AxiomFinding, Detector, DetectorContext, DetectorReport,
    Intervention, RewritePair, RewriteRejection,
};
pub use cache::{CacheKey, ResponseCache};
pub use context::{
    EnrichmentInput, Enricher, Profile, ProfileProvider, SituationProvider, SituationalHints,
    Understanding,
};
pub use error::{Error, InferenceError, MediationError, Result};
pub use inference::{InferenceClient, InferenceRequest, InferenceResponse, Usage};
pub use learning::{AcceptedRewrite, LearningEvent, LearningSink, LogLearningSink};
pub use message::{Contact, Message, Participant, RoomRoster};
pub use state::{ConflictPatterns, InterventionMemo, PatternCounts, ThrottleStatus};
