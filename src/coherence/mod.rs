//! Coherence scoring: how well does each participant's speech match the
//! assigned topic?
//!
//! The deterministic heuristics always run; an external LLM judge can
//! replace the semantic sub-score and observation text when credentials
//! are configured, with the heuristic result as fallback.

pub mod analyzer;
pub mod heuristic;
pub mod judge;
pub mod keys;

pub use analyzer::{CoherenceAnalyzer, ParticipantInput};
pub use heuristic::{depth_score, keyword_score, semantic_coherence, KeywordMatch};
pub use judge::{CoherenceJudge, HttpJudge, JudgeVerdict, MockJudge};
pub use keys::KeyPool;
