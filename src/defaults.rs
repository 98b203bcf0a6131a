//! Default configuration constants for expoeval.
//!
//! Shared across configuration types to keep the tuning surface in one place.

/// Audio sample rate in Hz fed to the transcriber.
///
/// 16kHz mono is the standard input format for Whisper-family models and
/// keeps decoded tracks small enough to hold fully in memory.
pub const SAMPLE_RATE: u32 = 16_000;

/// Transcription language code. The platform grades Spanish presentations,
/// so the language is forced rather than auto-detected.
pub const LANGUAGE: &str = "es";

/// Hard deadline for one decoder (ffmpeg) invocation, in seconds.
pub const DECODER_TIMEOUT_SECS: u64 = 300;

/// Transcription deadline multiplier: a track of N seconds may take at most
/// 10·N seconds of wall time before the run gives up.
pub const TRANSCRIBE_TIMEOUT_FACTOR: u64 = 10;

/// Floor for the transcription deadline, in seconds, so very short clips
/// still leave room for model warm-up.
pub const TRANSCRIBE_TIMEOUT_FLOOR_SECS: u64 = 60;

/// Per-request timeout for the external coherence judge, in seconds.
pub const JUDGE_TIMEOUT_SECS: u64 = 30;

/// Maximum judge attempts per participant before the heuristic fallback.
pub const JUDGE_MAX_ATTEMPTS: usize = 3;

/// Cooldown for a rate-limited judge credential, in seconds.
pub const KEY_COOLDOWN_SECS: u64 = 60;

/// Observation marker recorded when the judge was unreachable and scores
/// came from the heuristic path. Tests and the UI key off this string.
pub const HEURISTIC_FALLBACK_MARKER: &str = "scored via heuristic fallback";

/// Face-match tolerance: maximum embedding distance for a detected face to
/// join an existing participant prototype.
pub const FACE_TOLERANCE: f32 = 0.6;

/// Temporal sampling rate for face tracking, in frames per second.
pub const FACE_SAMPLE_FPS: f64 = 1.0;

/// Minimum cumulative visible time for a participant to survive the final
/// filter, in seconds. Shorter tracks are merged into the nearest prototype
/// or dropped as detector noise.
pub const MIN_VISIBLE_SECS: f64 = 2.0;

/// Fixed width of decoded analysis frames. Frames are scaled down before
/// analysis; face crops and liveness signals do not need full resolution.
pub const FRAME_WIDTH: u32 = 320;

/// Fixed height of decoded analysis frames.
pub const FRAME_HEIGHT: u32 = 240;

/// Maximum number of frames sampled by the liveness detector.
pub const LIVENESS_MAX_FRAMES: usize = 120;

/// Longest side of a stored participant photo, in pixels.
pub const PHOTO_MAX_SIDE: u32 = 150;

/// Minimum words handed to each participant by the proportional
/// attribution fallback, when the full text is long enough.
pub const PROPORTIONAL_MIN_WORDS: usize = 20;

/// Label given to the synthetic participant created when speech is present
/// but no face was ever detected.
pub const SIN_ROSTRO_LABEL: &str = "Sin Rostro Detectado";

/// Minimum attributed text length (characters) for coherence scoring;
/// shorter participations are graded Insuficiente without further analysis.
pub const MIN_SCORABLE_CHARS: usize = 20;
