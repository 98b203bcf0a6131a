use crate::defaults;
use crate::error::{ExpoError, Result};
use crate::types::Strictness;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct AnalysisConfig {
    pub media: MediaConfig,
    pub stt: SttConfig,
    pub faces: FaceConfig,
    pub attribution: AttributionConfig,
    pub coherence: CoherenceConfig,
}

/// Media decoding configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MediaConfig {
    /// Explicit path to the ffmpeg binary; `None` resolves via PATH.
    pub ffmpeg_path: Option<PathBuf>,
    pub sample_rate: u32,
    pub decoder_timeout_secs: u64,
    /// Analysis frames are scaled to this fixed size before face/liveness work.
    pub frame_width: u32,
    pub frame_height: u32,
}

/// Speech-to-text configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SttConfig {
    pub model_path: PathBuf,
    pub language: String,
    /// Inference threads (None = auto-detect).
    pub threads: Option<usize>,
}

/// Face tracking configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FaceConfig {
    /// Maximum embedding distance to join an existing participant.
    pub tolerance: f32,
    /// Sampled frames per second of video.
    pub sample_fps: f64,
    /// Participants visible for less than this many seconds are merged or dropped.
    pub min_visible_secs: f64,
}

/// Speech attribution configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AttributionConfig {
    /// Allow the voice-clustering strategy when the environment supports it.
    pub diarization_enabled: bool,
    /// Annotate evaluations whose text came from the proportional fallback.
    pub annotate_proportional: bool,
}

/// Coherence scoring configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CoherenceConfig {
    /// Consult the external LLM judge when credentials are configured.
    pub judge_enabled: bool,
    /// OpenAI-compatible chat completions endpoint.
    pub judge_url: String,
    pub judge_model: String,
    pub judge_timeout_secs: u64,
    pub weights: StrictnessWeights,
}

/// Per-strictness weights for the three coherence sub-scores.
/// Each triple is (semantic, keyword, depth) and must sum to 1.0.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StrictnessWeights {
    pub lenient: [f64; 3],
    pub normal: [f64; 3],
    pub strict: [f64; 3],
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            sample_rate: defaults::SAMPLE_RATE,
            decoder_timeout_secs: defaults::DECODER_TIMEOUT_SECS,
            frame_width: defaults::FRAME_WIDTH,
            frame_height: defaults::FRAME_HEIGHT,
        }
    }
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/ggml-base.bin"),
            language: defaults::LANGUAGE.to_string(),
            threads: None,
        }
    }
}

impl Default for FaceConfig {
    fn default() -> Self {
        Self {
            tolerance: defaults::FACE_TOLERANCE,
            sample_fps: defaults::FACE_SAMPLE_FPS,
            min_visible_secs: defaults::MIN_VISIBLE_SECS,
        }
    }
}

impl Default for AttributionConfig {
    fn default() -> Self {
        Self {
            diarization_enabled: true,
            annotate_proportional: true,
        }
    }
}

impl Default for CoherenceConfig {
    fn default() -> Self {
        Self {
            judge_enabled: true,
            judge_url: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            judge_model: "llama-3.3-70b-versatile".to_string(),
            judge_timeout_secs: defaults::JUDGE_TIMEOUT_SECS,
            weights: StrictnessWeights::default(),
        }
    }
}

impl Default for StrictnessWeights {
    fn default() -> Self {
        Self {
            lenient: [0.40, 0.30, 0.30],
            normal: [0.50, 0.25, 0.25],
            strict: [0.60, 0.25, 0.15],
        }
    }
}

impl StrictnessWeights {
    /// Weights (semantic, keyword, depth) for a strictness profile.
    pub fn for_strictness(&self, strictness: Strictness) -> [f64; 3] {
        match strictness {
            Strictness::Lenient => self.lenient,
            Strictness::Normal => self.normal,
            Strictness::Strict => self.strict,
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from a TOML file.
    ///
    /// Missing fields use default values; invalid TOML is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ExpoError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                ExpoError::Io(e)
            }
        })?;
        let config: AnalysisConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file, or defaults if the file is missing.
    /// Invalid TOML is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(ExpoError::ConfigFileNotFound { .. }) => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    /// Apply environment variable overrides.
    ///
    /// Supported:
    /// - `EXPOEVAL_MODEL` → stt.model_path
    /// - `EXPOEVAL_FFMPEG` → media.ffmpeg_path
    /// - `EXPOEVAL_JUDGE_URL` → coherence.judge_url
    /// - `EXPOEVAL_JUDGE_DISABLED=1` → coherence.judge_enabled = false
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(model) = std::env::var("EXPOEVAL_MODEL") {
            if !model.is_empty() {
                self.stt.model_path = PathBuf::from(model);
            }
        }
        if let Ok(ffmpeg) = std::env::var("EXPOEVAL_FFMPEG") {
            if !ffmpeg.is_empty() {
                self.media.ffmpeg_path = Some(PathBuf::from(ffmpeg));
            }
        }
        if let Ok(url) = std::env::var("EXPOEVAL_JUDGE_URL") {
            if !url.is_empty() {
                self.coherence.judge_url = url;
            }
        }
        if std::env::var("EXPOEVAL_JUDGE_DISABLED").is_ok_and(|v| v == "1") {
            self.coherence.judge_enabled = false;
        }
        self
    }

    /// Validate cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if self.media.sample_rate == 0 {
            return Err(ExpoError::ConfigInvalidValue {
                key: "media.sample_rate".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.faces.tolerance <= 0.0 {
            return Err(ExpoError::ConfigInvalidValue {
                key: "faces.tolerance".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.faces.sample_fps <= 0.0 {
            return Err(ExpoError::ConfigInvalidValue {
                key: "faces.sample_fps".to_string(),
                message: "must be positive".to_string(),
            });
        }
        for (name, w) in [
            ("lenient", &self.coherence.weights.lenient),
            ("normal", &self.coherence.weights.normal),
            ("strict", &self.coherence.weights.strict),
        ] {
            let sum: f64 = w.iter().sum();
            if (sum - 1.0).abs() > 1e-6 {
                return Err(ExpoError::ConfigInvalidValue {
                    key: format!("coherence.weights.{}", name),
                    message: format!("weights must sum to 1.0, got {}", sum),
                });
            }
            if w.iter().any(|v| *v < 0.0) {
                return Err(ExpoError::ConfigInvalidValue {
                    key: format!("coherence.weights.{}", name),
                    message: "weights must be non-negative".to_string(),
                });
            }
        }
        Ok(())
    }
}
