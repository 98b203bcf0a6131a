use crate::error::{ExpoError, Result};
use crate::media::AudioTrack;
use crate::types::{Transcript, TranscriptSegment};
use std::sync::Arc;

/// Trait for speech-to-text transcription.
///
/// This trait allows swapping implementations (real Whisper vs mock).
pub trait Transcriber: Send + Sync {
    /// Transcribe an audio track into a timestamped transcript.
    ///
    /// # Arguments
    /// * `audio` - 16 kHz mono f32 samples normalized to [-1.0, 1.0]
    ///
    /// # Returns
    /// Transcript with per-segment timestamps, or error
    fn transcribe(&self, audio: &AudioTrack) -> Result<Transcript>;

    /// Get the name of the loaded model
    fn model_name(&self) -> &str;

    /// Check if the transcriber is ready
    fn is_ready(&self) -> bool;
}

/// Implement Transcriber for Arc<T> to allow sharing across worker threads.
impl<T: Transcriber> Transcriber for Arc<T> {
    fn transcribe(&self, audio: &AudioTrack) -> Result<Transcript> {
        (**self).transcribe(audio)
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }

    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }
}

/// Mock transcriber for testing
#[derive(Debug, Clone)]
pub struct MockTranscriber {
    model_name: String,
    segments: Vec<TranscriptSegment>,
    should_fail: bool,
}

impl MockTranscriber {
    /// Create a new mock transcriber with default settings
    pub fn new(model_name: &str) -> Self {
        Self {
            model_name: model_name.to_string(),
            segments: vec![TranscriptSegment {
                start: 0.0,
                end: 2.0,
                text: "transcripción simulada".to_string(),
            }],
            should_fail: false,
        }
    }

    /// Configure the mock to return a single segment with this text
    pub fn with_text(mut self, text: &str) -> Self {
        self.segments = vec![TranscriptSegment {
            start: 0.0,
            end: 2.0,
            text: text.to_string(),
        }];
        self
    }

    /// Configure the mock to return these exact segments
    pub fn with_segments(mut self, segments: Vec<TranscriptSegment>) -> Self {
        self.segments = segments;
        self
    }

    /// Configure the mock to fail on transcribe
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }
}

impl Transcriber for MockTranscriber {
    fn transcribe(&self, _audio: &AudioTrack) -> Result<Transcript> {
        if self.should_fail {
            Err(ExpoError::Transcription {
                message: "mock transcription failure".to_string(),
            })
        } else {
            Ok(Transcript::from_segments(self.segments.clone(), "es"))
        }
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn is_ready(&self) -> bool {
        !self.should_fail
    }
}
