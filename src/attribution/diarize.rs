//! Voice-clustering attribution: group transcript segments by simple voice
//! features, then map each voice cluster to the participant whose screen
//! time overlaps it most.
//!
//! Features are deliberately lightweight (energy, zero-crossing rate, a
//! spectral-flux proxy) so the strategy runs with no model download. The
//! clustering is deterministic: k-means seeded by evenly spaced segments.

use crate::attribution::SpeechAttribution;
use crate::error::{ExpoError, Result};
use crate::media::AudioTrack;
use crate::types::{Participant, Transcript, TranscriptSegment};
use log::debug;

const KMEANS_ITERATIONS: usize = 25;

/// Per-segment voice feature vector.
#[derive(Debug, Clone, Copy, PartialEq)]
struct VoiceFeatures {
    rms: f64,
    zero_crossing_rate: f64,
    spectral_flux: f64,
}

impl VoiceFeatures {
    fn as_array(&self) -> [f64; 3] {
        [self.rms, self.zero_crossing_rate, self.spectral_flux]
    }
}

pub fn attribute(
    transcript: &Transcript,
    participants: &[Participant],
    audio: &AudioTrack,
) -> Result<Vec<SpeechAttribution>> {
    let voiced: Vec<(usize, VoiceFeatures)> = transcript
        .segments
        .iter()
        .enumerate()
        .filter(|(_, s)| s.end > s.start && !s.text.is_empty())
        .map(|(i, s)| (i, segment_features(audio, s)))
        .collect();

    if voiced.len() < participants.len() {
        return Err(ExpoError::Attribution {
            message: format!(
                "{} voiced segment(s) cannot separate {} speakers",
                voiced.len(),
                participants.len()
            ),
        });
    }

    let features: Vec<[f64; 3]> = normalize(voiced.iter().map(|(_, f)| f.as_array()).collect());
    if features.iter().all(|f| *f == [0.0; 3]) {
        return Err(ExpoError::Attribution {
            message: "voice features carry no speaker signal".to_string(),
        });
    }
    let assignments = kmeans(&features, participants.len());
    debug!("diarization clustered {} segments into {} voices", voiced.len(), participants.len());

    // Map each voice cluster to the participant with maximal temporal overlap.
    let cluster_owner: Vec<usize> = (0..participants.len())
        .map(|cluster| {
            let mut best = cluster.min(participants.len() - 1);
            let mut best_overlap = -1.0f64;
            for (pi, participant) in participants.iter().enumerate() {
                let overlap: f64 = voiced
                    .iter()
                    .zip(assignments.iter())
                    .filter(|(_, &a)| a == cluster)
                    .map(|((si, _), _)| {
                        let segment = &transcript.segments[*si];
                        participant
                            .appearances
                            .iter()
                            .map(|ap| ap.overlap(segment.start, segment.end))
                            .sum::<f64>()
                    })
                    .sum();
                if overlap > best_overlap {
                    best_overlap = overlap;
                    best = pi;
                }
            }
            best
        })
        .collect();

    let mut assigned: Vec<Vec<TranscriptSegment>> = vec![Vec::new(); participants.len()];
    for ((si, _), &cluster) in voiced.iter().zip(assignments.iter()) {
        let owner = cluster_owner[cluster];
        assigned[owner].push(transcript.segments[*si].clone());
    }

    Ok(assigned.into_iter().map(SpeechAttribution::from_segments).collect())
}

fn segment_features(audio: &AudioTrack, segment: &TranscriptSegment) -> VoiceFeatures {
    let samples = audio.slice_secs(segment.start, segment.end);
    if samples.is_empty() {
        return VoiceFeatures {
            rms: 0.0,
            zero_crossing_rate: 0.0,
            spectral_flux: 0.0,
        };
    }

    let rms = (samples.iter().map(|&s| (s as f64) * (s as f64)).sum::<f64>()
        / samples.len() as f64)
        .sqrt();

    let crossings = samples
        .windows(2)
        .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
        .count();
    let zero_crossing_rate = crossings as f64 / samples.len() as f64;

    // Mean absolute first difference: rises with high-frequency content,
    // a cheap stand-in for spectral flux.
    let spectral_flux = samples
        .windows(2)
        .map(|w| (w[1] - w[0]).abs() as f64)
        .sum::<f64>()
        / samples.len() as f64;

    VoiceFeatures {
        rms,
        zero_crossing_rate,
        spectral_flux,
    }
}

/// Scale every feature dimension to unit range so no single one dominates.
fn normalize(mut features: Vec<[f64; 3]>) -> Vec<[f64; 3]> {
    for dim in 0..3 {
        let min = features.iter().map(|f| f[dim]).fold(f64::INFINITY, f64::min);
        let max = features.iter().map(|f| f[dim]).fold(f64::NEG_INFINITY, f64::max);
        let range = max - min;
        if range > 1e-12 {
            for f in &mut features {
                f[dim] = (f[dim] - min) / range;
            }
        } else {
            for f in &mut features {
                f[dim] = 0.0;
            }
        }
    }
    features
}

/// Deterministic k-means: centroids seeded from evenly spaced points.
fn kmeans(features: &[[f64; 3]], k: usize) -> Vec<usize> {
    let n = features.len();
    let mut centroids: Vec<[f64; 3]> = (0..k).map(|i| features[i * n / k]).collect();
    let mut assignments = vec![0usize; n];

    for _ in 0..KMEANS_ITERATIONS {
        let mut changed = false;
        for (i, f) in features.iter().enumerate() {
            let nearest = centroids
                .iter()
                .enumerate()
                .min_by(|a, b| sq_dist(f, a.1).total_cmp(&sq_dist(f, b.1)))
                .map(|(c, _)| c)
                .unwrap_or(0);
            if assignments[i] != nearest {
                assignments[i] = nearest;
                changed = true;
            }
        }

        for (c, centroid) in centroids.iter_mut().enumerate() {
            let members: Vec<&[f64; 3]> = features
                .iter()
                .zip(assignments.iter())
                .filter(|(_, &a)| a == c)
                .map(|(f, _)| f)
                .collect();
            if members.is_empty() {
                continue;
            }
            for dim in 0..3 {
                centroid[dim] =
                    members.iter().map(|m| m[dim]).sum::<f64>() / members.len() as f64;
            }
        }

        if !changed {
            break;
        }
    }

    assignments
}

fn sq_dist(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
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

    /// Audio with a quiet first half and a loud, buzzy second half.
    fn two_voice_audio(secs: f64) -> AudioTrack {
        let rate = 16_000u32;
        let total = (secs * rate as f64) as usize;
        let samples: Vec<f32> = (0..total)
            .map(|i| {
                let t = i as f64 / rate as f64;
                if t < secs / 2.0 {
                    0.05 * (2.0 * std::f64::consts::PI * 120.0 * t).sin() as f32
                } else {
                    0.6 * (2.0 * std::f64::consts::PI * 900.0 * t).sin() as f32
                }
            })
            .collect();
        AudioTrack::new(samples, rate)
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
    fn distinct_voices_are_separated() {
        let audio = two_voice_audio(20.0);
        let t = transcript(vec![
            (0.0, 4.0, "voz tranquila uno"),
            (4.0, 8.0, "voz tranquila dos"),
            (11.0, 14.0, "voz fuerte uno"),
            (14.0, 18.0, "voz fuerte dos"),
        ]);
        let participants = vec![
            participant("Persona 1", &[(0.0, 10.0)]),
            participant("Persona 2", &[(10.0, 20.0)]),
        ];

        let result = attribute(&t, &participants, &audio).unwrap();
        assert_eq!(result[0].attributed_text, "voz tranquila uno voz tranquila dos");
        assert_eq!(result[1].attributed_text, "voz fuerte uno voz fuerte dos");
    }

    #[test]
    fn too_few_segments_is_an_error() {
        let audio = two_voice_audio(10.0);
        let t = transcript(vec![(0.0, 5.0, "solo uno")]);
        let participants = vec![
            participant("Persona 1", &[(0.0, 5.0)]),
            participant("Persona 2", &[(5.0, 10.0)]),
        ];
        assert!(attribute(&t, &participants, &audio).is_err());
    }

    #[test]
    fn silent_audio_is_an_error() {
        let audio = AudioTrack::new(vec![0.0; 16_000 * 10], 16_000);
        let t = transcript(vec![(0.0, 4.0, "uno"), (5.0, 9.0, "dos")]);
        let participants = vec![
            participant("Persona 1", &[(0.0, 5.0)]),
            participant("Persona 2", &[(5.0, 10.0)]),
        ];
        assert!(attribute(&t, &participants, &audio).is_err());
    }

    #[test]
    fn kmeans_is_deterministic() {
        let features = vec![
            [0.0, 0.0, 0.0],
            [0.1, 0.0, 0.1],
            [1.0, 1.0, 1.0],
            [0.9, 1.0, 0.9],
        ];
        let a = kmeans(&features, 2);
        let b = kmeans(&features, 2);
        assert_eq!(a, b);
        assert_eq!(a[0], a[1]);
        assert_eq!(a[2], a[3]);
        assert_ne!(a[0], a[2]);
    }

    #[test]
    fn features_distinguish_energy_levels() {
        let audio = two_voice_audio(20.0);
        let quiet = segment_features(
            &audio,
            &TranscriptSegment {
                start: 0.0,
                end: 5.0,
                text: "a".to_string(),
            },
        );
        let loud = segment_features(
            &audio,
            &TranscriptSegment {
                start: 12.0,
                end: 17.0,
                text: "b".to_string(),
            },
        );
        assert!(loud.rms > quiet.rms * 3.0);
        assert!(loud.zero_crossing_rate > quiet.zero_crossing_rate);
    }

    #[test]
    fn normalize_bounds_every_dimension() {
        let normalized = normalize(vec![[1.0, 10.0, 100.0], [3.0, 30.0, 300.0], [2.0, 20.0, 200.0]]);
        for f in &normalized {
            for &v in f {
                assert!((0.0..=1.0).contains(&v));
            }
        }
        assert_eq!(normalized[0], [0.0, 0.0, 0.0]);
        assert_eq!(normalized[1], [1.0, 1.0, 1.0]);
    }
}
