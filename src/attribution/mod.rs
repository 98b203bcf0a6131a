//! Speech attribution: divide the transcript among on-screen participants.
//!
//! Three strategies with a deterministic fallback chain. Attribution is
//! best-effort: an internal error in a richer strategy degrades to the
//! proportional split instead of aborting the analysis.

pub mod diarize;
pub mod overlap;
pub mod proportional;

use crate::config::AttributionConfig;
use crate::media::AudioTrack;
use crate::types::{Participant, Transcript, TranscriptSegment};
use log::{info, warn};

/// What the current environment can support.
#[derive(Debug, Clone, Copy, Default)]
pub struct Capabilities {
    /// Audio samples are available for voice clustering.
    pub has_audio: bool,
    /// Voice clustering is allowed by configuration.
    pub diarization_enabled: bool,
    /// Transcript carries usable per-segment timestamps.
    pub has_segment_timestamps: bool,
}

/// Attribution strategy, in order of decreasing fidelity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Diarization,
    IntervalOverlap,
    Proportional,
}

/// Pick the richest strategy the environment supports.
pub fn choose_strategy(caps: &Capabilities) -> Strategy {
    if caps.has_audio && caps.diarization_enabled && caps.has_segment_timestamps {
        Strategy::Diarization
    } else if caps.has_segment_timestamps {
        Strategy::IntervalOverlap
    } else {
        Strategy::Proportional
    }
}

/// Text attributed to one participant.
#[derive(Debug, Clone, Default)]
pub struct SpeechAttribution {
    /// Transcript segments assigned to this participant (empty for the
    /// proportional strategy, which splits words rather than segments).
    pub segments: Vec<TranscriptSegment>,
    pub attributed_text: String,
    pub word_count: usize,
    /// True when the text came from the proportional word split.
    pub estimated: bool,
}

impl SpeechAttribution {
    pub fn from_text(text: String, estimated: bool) -> Self {
        let word_count = text.split_whitespace().count();
        Self {
            segments: Vec::new(),
            attributed_text: text,
            word_count,
            estimated,
        }
    }

    pub fn from_segments(segments: Vec<TranscriptSegment>) -> Self {
        let attributed_text = segments
            .iter()
            .map(|s| s.text.as_str())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        let word_count = attributed_text.split_whitespace().count();
        Self {
            segments,
            attributed_text,
            word_count,
            estimated: false,
        }
    }
}

pub struct Attributor {
    config: AttributionConfig,
}

impl Attributor {
    pub fn new(config: AttributionConfig) -> Self {
        Self { config }
    }

    /// Attribute the transcript to `participants`, one entry per participant
    /// in the same order.
    pub fn attribute(
        &self,
        transcript: &Transcript,
        participants: &[Participant],
        audio: Option<&AudioTrack>,
    ) -> Vec<SpeechAttribution> {
        if participants.is_empty() {
            return Vec::new();
        }

        // A lone presenter owns the whole transcript verbatim.
        if participants.len() == 1 {
            return vec![SpeechAttribution {
                segments: transcript.segments.clone(),
                attributed_text: transcript.full_text.clone(),
                word_count: transcript.word_count(),
                estimated: false,
            }];
        }

        let caps = Capabilities {
            has_audio: audio.is_some_and(|a| !a.samples.is_empty()),
            diarization_enabled: self.config.diarization_enabled,
            has_segment_timestamps: transcript.segments.iter().any(|s| s.end > s.start),
        };
        let strategy = choose_strategy(&caps);
        info!("speech attribution strategy: {:?}", strategy);

        let attempt = match (strategy, audio) {
            (Strategy::Diarization, Some(audio)) => {
                diarize::attribute(transcript, participants, audio)
                    .or_else(|e| {
                        warn!("diarization failed ({}), trying interval overlap", e);
                        overlap::attribute(transcript, participants)
                    })
            }
            (Strategy::Diarization, None) | (Strategy::IntervalOverlap, _) => {
                overlap::attribute(transcript, participants)
            }
            (Strategy::Proportional, _) => {
                Ok(proportional::attribute(transcript, participants))
            }
        };

        match attempt {
            Ok(result) => result,
            Err(e) => {
                warn!("attribution failed ({}), using proportional split", e);
                proportional::attribute(transcript, participants)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FaceAppearance;

    fn participant(id: &str, spans: &[(f64, f64)]) -> Participant {
        let appearances: Vec<FaceAppearance> = spans
            .iter()
            .map(|&(start, end)| FaceAppearance { start, end })
            .collect();
        let total: f64 = appearances.iter().map(|a| a.duration()).sum();
        Participant {
            id: id.to_string(),
            appearances,
            total_time: total,
            percentage_of_video: total,
            photo: None,
        }
    }

    fn transcript(segments: Vec<(f64, f64, &str)>) -> Transcript {
        Transcript::from_segments(
            segments
                .into_iter()
                .map(|(start, end, text)| TranscriptSegment {
                    start,
                    end,
                    text: text.to_string(),
                })
                .collect(),
            "es",
        )
    }

    #[test]
    fn policy_prefers_diarization() {
        let caps = Capabilities {
            has_audio: true,
            diarization_enabled: true,
            has_segment_timestamps: true,
        };
        assert_eq!(choose_strategy(&caps), Strategy::Diarization);
    }

    #[test]
    fn policy_falls_back_without_audio() {
        let caps = Capabilities {
            has_audio: false,
            diarization_enabled: true,
            has_segment_timestamps: true,
        };
        assert_eq!(choose_strategy(&caps), Strategy::IntervalOverlap);
    }

    #[test]
    fn policy_falls_back_without_timestamps() {
        let caps = Capabilities {
            has_audio: true,
            diarization_enabled: true,
            has_segment_timestamps: false,
        };
        assert_eq!(choose_strategy(&caps), Strategy::Proportional);
    }

    #[test]
    fn single_participant_gets_whole_transcript() {
        let attributor = Attributor::new(AttributionConfig::default());
        let t = transcript(vec![(0.0, 5.0, "hola a todos"), (5.0, 10.0, "gracias")]);
        let participants = vec![participant("Persona 1", &[(0.0, 10.0)])];

        let result = attributor.attribute(&t, &participants, None);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].attributed_text, t.full_text);
        assert!(!result[0].estimated);
        assert_eq!(result[0].segments.len(), 2);
    }

    #[test]
    fn no_participants_yields_empty() {
        let attributor = Attributor::new(AttributionConfig::default());
        let t = transcript(vec![(0.0, 5.0, "hola")]);
        assert!(attributor.attribute(&t, &[], None).is_empty());
    }

    #[test]
    fn two_participants_get_one_entry_each() {
        let attributor = Attributor::new(AttributionConfig::default());
        let t = transcript(vec![(0.0, 5.0, "primera parte"), (10.0, 15.0, "segunda parte")]);
        let participants = vec![
            participant("Persona 1", &[(0.0, 8.0)]),
            participant("Persona 2", &[(8.0, 16.0)]),
        ];

        let result = attributor.attribute(&t, &participants, None);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].attributed_text, "primera parte");
        assert_eq!(result[1].attributed_text, "segunda parte");
    }

    #[test]
    fn from_text_counts_words() {
        let a = SpeechAttribution::from_text("uno dos tres".to_string(), true);
        assert_eq!(a.word_count, 3);
        assert!(a.estimated);
    }
}
