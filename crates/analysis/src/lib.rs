//! # calmwire analysis
//!
//! Everything the mediator can decide locally, without a model call:
//!
//! - [`prefilter`] — skip greetings, acknowledgments, third-party
//!   narration and clearly positive messages
//! - [`patterns`] — accusatory / triangulation counters and red flags
//! - [`intent`] — a rough topic and goal hint for the prompt
//! - [`axioms`] — weighted structural checks behind [`RuleDetector`]
//!
//! All pattern tables are compiled once on first use.

pub mod axioms;
pub mod intent;
mod pattern_set;
pub mod patterns;
pub mod prefilter;

pub use axioms::{Axiom, Evidence, RuleDetector};
pub use intent::{Goal, Topic, UserIntent, infer_intent};
pub use pattern_set::normalize;
pub use patterns::{detect_conflict_patterns, red_flags};
pub use prefilter::{PrefilterVerdict, SkipReason, classify};
