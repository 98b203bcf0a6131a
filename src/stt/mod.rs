//! Speech-to-text: Spanish transcription of the extracted audio track.

pub mod transcriber;
pub mod whisper;

pub use transcriber::{MockTranscriber, Transcriber};
pub use whisper::{WhisperConfig, WhisperTranscriber};

use crate::config::SttConfig;
use crate::error::Result;
use std::sync::{Arc, OnceLock};

static SHARED: OnceLock<Arc<WhisperTranscriber>> = OnceLock::new();

/// Process-wide transcriber: the model loads once and is reused by every
/// subsequent analysis. The configuration of the first successful call
/// wins; inference itself is serialized inside the transcriber.
pub fn shared(config: &SttConfig) -> Result<Arc<WhisperTranscriber>> {
    if let Some(transcriber) = SHARED.get() {
        return Ok(Arc::clone(transcriber));
    }
    let transcriber = Arc::new(WhisperTranscriber::new(WhisperConfig::from(config))?);
    Ok(Arc::clone(SHARED.get_or_init(|| transcriber)))
}
