//! Process-local state for calmwire: verdict caches, per-room conversation
//! state, and a learning event log.

pub mod conversation;
pub mod in_memory;
pub mod learning_log;
pub mod noop;

pub use conversation::{ConversationState, ConversationStore, FeedbackTally};
pub use in_memory::InMemoryCache;
pub use learning_log::InMemoryLearningLog;
pub use noop::NoopCache;
