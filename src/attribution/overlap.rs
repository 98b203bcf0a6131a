//! Interval-overlap attribution: each transcript segment goes to the
//! participant whose appearance intervals cover the largest fraction of it.

use crate::attribution::SpeechAttribution;
use crate::error::{ExpoError, Result};
use crate::types::{Participant, Transcript, TranscriptSegment};

pub fn attribute(
    transcript: &Transcript,
    participants: &[Participant],
) -> Result<Vec<SpeechAttribution>> {
    if participants.is_empty() {
        return Ok(Vec::new());
    }
    if !transcript.segments.iter().any(|s| s.end > s.start) {
        return Err(ExpoError::Attribution {
            message: "transcript has no usable segment timestamps".to_string(),
        });
    }

    let mut assigned: Vec<Vec<TranscriptSegment>> = vec![Vec::new(); participants.len()];
    for segment in &transcript.segments {
        if segment.text.is_empty() {
            continue;
        }
        let owner = owner_of(segment, participants);
        assigned[owner].push(segment.clone());
    }

    Ok(assigned.into_iter().map(SpeechAttribution::from_segments).collect())
}

/// Index of the participant covering the largest fraction of the segment.
/// Ties go to the earliest-appearing participant (lowest index, since
/// participants are ordered by first appearance).
fn owner_of(segment: &TranscriptSegment, participants: &[Participant]) -> usize {
    let length = (segment.end - segment.start).max(1e-9);
    let mut best = 0usize;
    let mut best_fraction = -1.0f64;

    for (i, participant) in participants.iter().enumerate() {
        let covered: f64 = participant
            .appearances
            .iter()
            .map(|a| a.overlap(segment.start, segment.end))
            .sum();
        let fraction = covered / length;
        if fraction > best_fraction {
            best_fraction = fraction;
            best = i;
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FaceAppearance;

    fn participant(id: &str, spans: &[(f64, f64)]) -> Participant {
        Participant {
            id: id.to_string(),
            appearances: spans
                .iter()
                .map(|&(start, end)| FaceAppearance { start, end })
                .collect(),
            total_time: 0.0,
            percentage_of_video: 0.0,
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
    fn segments_follow_visibility() {
        let t = transcript(vec![
            (0.0, 10.0, "habla la primera persona"),
            (12.0, 20.0, "habla la segunda persona"),
        ]);
        let participants = vec![
            participant("Persona 1", &[(0.0, 11.0)]),
            participant("Persona 2", &[(11.0, 20.0)]),
        ];

        let result = attribute(&t, &participants).unwrap();
        assert_eq!(result[0].attributed_text, "habla la primera persona");
        assert_eq!(result[1].attributed_text, "habla la segunda persona");
        assert_eq!(result[1].word_count, 4);
    }

    #[test]
    fn partial_overlap_picks_largest_fraction() {
        // Segment 4..10: P1 covers 4..6 (2s), P2 covers 6..10 (4s).
        let t = transcript(vec![(4.0, 10.0, "texto compartido")]);
        let participants = vec![
            participant("Persona 1", &[(0.0, 6.0)]),
            participant("Persona 2", &[(6.0, 20.0)]),
        ];

        let result = attribute(&t, &participants).unwrap();
        assert!(result[0].attributed_text.is_empty());
        assert_eq!(result[1].attributed_text, "texto compartido");
    }

    #[test]
    fn tie_goes_to_earliest_participant() {
        // Both cover exactly half of 0..10.
        let t = transcript(vec![(0.0, 10.0, "empate")]);
        let participants = vec![
            participant("Persona 1", &[(0.0, 5.0)]),
            participant("Persona 2", &[(5.0, 10.0)]),
        ];

        let result = attribute(&t, &participants).unwrap();
        assert_eq!(result[0].attributed_text, "empate");
    }

    #[test]
    fn uncovered_segment_still_gets_an_owner() {
        let t = transcript(vec![(50.0, 55.0, "nadie visible")]);
        let participants = vec![
            participant("Persona 1", &[(0.0, 10.0)]),
            participant("Persona 2", &[(10.0, 20.0)]),
        ];

        let result = attribute(&t, &participants).unwrap();
        let total: usize = result.iter().map(|a| a.word_count).sum();
        assert_eq!(total, 2);
    }

    #[test]
    fn zero_length_timestamps_are_an_error() {
        let t = transcript(vec![(0.0, 0.0, "sin tiempos")]);
        let participants = vec![participant("Persona 1", &[(0.0, 10.0)])];
        assert!(attribute(&t, &participants).is_err());
    }
}
