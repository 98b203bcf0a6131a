//! Core data model shared across pipeline stages.
//!
//! Every entity here lives for the duration of one analysis run; only
//! [`EvaluationResult`] is handed back to the caller.

use serde::{Deserialize, Serialize};

/// Rubric strictness selected on the assignment. Changes scoring weights,
/// never the level thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Strictness {
    Lenient,
    #[default]
    Normal,
    Strict,
}

/// Assignment descriptor supplied by the application layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    /// Topic title, e.g. "Derivadas".
    pub title: String,
    /// Detailed topic description / instructions.
    pub description: String,
    /// Maximum attainable grade (> 0), typically 20.0.
    pub max_score: f64,
    /// Rubric strictness; `None` means [`Strictness::Normal`].
    pub strictness: Option<Strictness>,
}

impl Assignment {
    pub fn strictness(&self) -> Strictness {
        self.strictness.unwrap_or_default()
    }
}

/// One timestamped span of transcribed speech. `end > start`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Full transcription of the audio track.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    pub full_text: String,
    pub segments: Vec<TranscriptSegment>,
    /// End time of the last segment, 0 when there are none.
    pub duration: f64,
    pub language: String,
}

impl Transcript {
    /// Build a transcript from time-ordered segments, deriving `full_text`
    /// and `duration` so the concatenation invariant holds by construction.
    pub fn from_segments(segments: Vec<TranscriptSegment>, language: &str) -> Self {
        let full_text = segments
            .iter()
            .map(|s| s.text.as_str())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        let duration = segments.last().map(|s| s.end).unwrap_or(0.0);
        Self {
            full_text,
            segments,
            duration,
            language: language.to_string(),
        }
    }

    /// Whether the track carried any usable speech.
    pub fn is_empty(&self) -> bool {
        self.full_text.trim().is_empty()
    }

    pub fn word_count(&self) -> usize {
        self.full_text.split_whitespace().count()
    }

    /// Display form with `[mm:ss]` prefixes, used in reports.
    pub fn formatted(&self) -> String {
        let mut out = String::new();
        for seg in &self.segments {
            if seg.text.is_empty() {
                continue;
            }
            let min = (seg.start / 60.0) as u64;
            let sec = (seg.start % 60.0) as u64;
            out.push_str(&format!("[{:02}:{:02}] {}\n", min, sec, seg.text));
        }
        out
    }
}

/// A contiguous interval during which one participant was visible.
/// `end >= start`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceAppearance {
    pub start: f64,
    pub end: f64,
}

impl FaceAppearance {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Seconds of overlap with `[start, end]`.
    pub fn overlap(&self, start: f64, end: f64) -> f64 {
        (self.end.min(end) - self.start.max(start)).max(0.0)
    }
}

/// An anonymous person-identity inferred from face clustering in one video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    /// `"Persona 1"`, `"Persona 2"`, … in order of first appearance.
    pub id: String,
    /// Time-sorted, pairwise disjoint appearance intervals.
    pub appearances: Vec<FaceAppearance>,
    /// Σ (end − start) over `appearances`, seconds.
    pub total_time: f64,
    /// `total_time / video_duration · 100`.
    pub percentage_of_video: f64,
    /// JPEG-encoded face crop from a high-confidence frame.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<Vec<u8>>,
}

impl Participant {
    pub fn first_seen(&self) -> f64 {
        self.appearances.first().map(|a| a.start).unwrap_or(0.0)
    }
}

/// Classification of a recording's authenticity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordingKind {
    Live,
    LikelyLive,
    LikelyRecorded,
    Recorded,
}

impl RecordingKind {
    /// Bucket a 0–100 liveness score.
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            RecordingKind::Live
        } else if score >= 60.0 {
            RecordingKind::LikelyLive
        } else if score >= 40.0 {
            RecordingKind::LikelyRecorded
        } else {
            RecordingKind::Recorded
        }
    }

    /// Whether the verdict warrants the pregrabado warning in feedback.
    pub fn is_suspect(&self) -> bool {
        matches!(self, RecordingKind::LikelyRecorded | RecordingKind::Recorded)
    }

    pub fn display_es(&self) -> &'static str {
        match self {
            RecordingKind::Live => "En Vivo",
            RecordingKind::LikelyLive => "Probablemente en Vivo",
            RecordingKind::LikelyRecorded => "Probablemente Pregrabado",
            RecordingKind::Recorded => "Pregrabado",
        }
    }
}

/// Authenticity verdict for the recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessVerdict {
    pub classification: RecordingKind,
    /// 0–100; higher means more likely captured live.
    pub liveness_score: f64,
    /// 0–100 confidence in the classification.
    pub confidence: f64,
}

/// Qualitative coherence band. Thresholds are fixed and do not depend on
/// the strictness profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoherenceLevel {
    Excelente,
    MuyBuena,
    Buena,
    Regular,
    Baja,
    Insuficiente,
}

impl CoherenceLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            CoherenceLevel::Excelente
        } else if score >= 80.0 {
            CoherenceLevel::MuyBuena
        } else if score >= 70.0 {
            CoherenceLevel::Buena
        } else if score >= 60.0 {
            CoherenceLevel::Regular
        } else if score >= 50.0 {
            CoherenceLevel::Baja
        } else {
            CoherenceLevel::Insuficiente
        }
    }

    pub fn display_es(&self) -> &'static str {
        match self {
            CoherenceLevel::Excelente => "Excelente",
            CoherenceLevel::MuyBuena => "Muy Buena",
            CoherenceLevel::Buena => "Buena",
            CoherenceLevel::Regular => "Regular",
            CoherenceLevel::Baja => "Baja",
            CoherenceLevel::Insuficiente => "Insuficiente",
        }
    }
}

/// Per-participant competence evaluation, the unit the platform grades.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantEvaluation {
    /// Participant label ("Persona 1", …, or "Sin Rostro Detectado").
    pub participant: String,
    pub attributed_text: String,
    pub word_count: usize,
    pub semantic_coherence: f64,
    pub keyword_score: f64,
    pub depth_score: f64,
    /// Weighted composite, 0–100.
    pub coherence_score: f64,
    pub coherence_level: CoherenceLevel,
    pub keywords_found: Vec<String>,
    /// Share of video time, 0–100.
    pub time_percentage: f64,
    /// Share of total attributed words, 0–100.
    pub contribution_percentage: f64,
    /// 0..=max_score, rounded to two decimals.
    pub final_grade: f64,
    pub observation: String,
    /// True only for the synthetic no-face participant.
    pub sin_rostro: bool,
}

/// Final artifact of one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub transcript: Transcript,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liveness: Option<LivenessVerdict>,
    pub participants: Vec<ParticipantEvaluation>,
    pub aggregate_feedback: String,
    /// Arithmetic mean of participants' coherence scores, 0–100.
    pub ai_score: f64,
}

/// Round to two decimal places, the platform's grade precision.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
