//! Error types for expoeval.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExpoError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Media decoding errors
    #[error("Decoder binary not found: {message}")]
    DecoderNotFound { message: String },

    #[error("Audio extraction failed: {message}")]
    AudioExtraction { message: String },

    #[error("Frame decoding failed: {message}")]
    FrameDecoding { message: String },

    // Transcription errors
    #[error("Transcription model not found at {path}")]
    TranscriptionModelNotFound { path: String },

    #[error("Transcription failed: {message}")]
    Transcription { message: String },

    // Hard failure: video carries no usable speech
    #[error("No se detectó audio en el video")]
    NoAudioDetected,

    // Soft-failure stages (the orchestrator degrades instead of aborting)
    #[error("Face tracking failed: {message}")]
    FaceDetection { message: String },

    #[error("Liveness analysis failed: {message}")]
    Liveness { message: String },

    #[error("Speech attribution failed: {message}")]
    Attribution { message: String },

    #[error("Coherence judge unavailable: {message}")]
    CoherenceJudge { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

impl ExpoError {
    /// Whether this error aborts an analysis run.
    ///
    /// Soft errors degrade the result (missing verdict, heuristic scores,
    /// proportional attribution); hard errors surface to the caller and
    /// terminate the run with a FAILED progress event.
    pub fn is_hard(&self) -> bool {
        !matches!(
            self,
            ExpoError::FaceDetection { .. }
                | ExpoError::Liveness { .. }
                | ExpoError::Attribution { .. }
                | ExpoError::CoherenceJudge { .. }
        )
    }

    /// One-sentence user-facing reason, phrased for students (Spanish).
    pub fn user_message(&self) -> String {
        match self {
            ExpoError::NoAudioDetected => "No se detectó audio en el video".to_string(),
            ExpoError::AudioExtraction { .. } => {
                "No se pudo extraer el audio del video".to_string()
            }
            ExpoError::Transcription { .. } | ExpoError::TranscriptionModelNotFound { .. } => {
                "No se pudo transcribir la presentación".to_string()
            }
            ExpoError::DecoderNotFound { .. } => {
                "El sistema no pudo procesar el formato del video".to_string()
            }
            _ => "Ocurrió un error al analizar la presentación".to_string(),
        }
    }
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, ExpoError>;
