//! expoeval - Competence evaluation for recorded oral presentations
//!
//! Takes one student video plus an assignment topic and produces a
//! per-participant evaluation: who appeared, how long they spoke, what
//! they said, and how coherent it was with the assigned topic.

// Enforce error handling discipline in library code.
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

pub mod attribution;
pub mod cli;
pub mod coherence;
pub mod config;
pub mod defaults;
pub mod error;
pub mod faces;
pub mod liveness;
pub mod media;
pub mod pipeline;
pub mod stt;
pub mod types;

// Stage traits (every pipeline stage is swappable)
pub use coherence::CoherenceJudge;
pub use faces::FaceTracker;
pub use liveness::LivenessProbe;
pub use media::AudioExtractor;
pub use stt::Transcriber;

// Pipeline
pub use pipeline::{Analyzer, LogSink, NullSink, ProgressSink};

// Error handling
pub use error::{ExpoError, Result};

// Config and data model
pub use config::AnalysisConfig;
pub use types::{Assignment, EvaluationResult, Strictness, Transcript};
