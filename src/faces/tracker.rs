//! Participant tracking: cluster per-frame face detections into anonymous
//! person identities with visibility intervals.

use crate::config::{FaceConfig, MediaConfig};
use crate::defaults;
use crate::error::{ExpoError, Result};
use crate::faces::detect::{FaceBox, FaceDetector, SkinRegionDetector};
use crate::faces::embed::{Distance, FaceEmbedder, PatchEmbedder};
use crate::media::frames::{Frame, FrameStream};
use crate::types::{round2, FaceAppearance, Participant};
use log::{debug, info};
use std::path::Path;

/// Outcome of one tracking pass over a video.
#[derive(Debug, Clone, Default)]
pub struct TrackingResult {
    /// Participants labeled "Persona 1"… in order of first appearance.
    pub participants: Vec<Participant>,
    /// Analyzed duration in seconds, derived from the sampled frames.
    pub video_duration: f64,
    pub frames_analyzed: usize,
    pub faces_detected: usize,
}

/// Trait seam so the orchestrator can run with scripted participants.
pub trait FaceTracker: Send + Sync {
    fn track(&self, video: &Path) -> Result<TrackingResult>;
}

/// One identity being accumulated during a pass.
struct Prototype {
    embedding: Vec<f32>,
    /// Running count of hits folded into `embedding`.
    hits: usize,
    /// Timestamps of frames where this identity was seen.
    seen_at: Vec<f64>,
    /// Best crop so far, kept for the participant photo.
    best_photo: Option<(f32, Vec<u8>, u32, u32)>,
}

impl Prototype {
    fn fold(&mut self, embedding: &[f32]) {
        // Running mean keeps the prototype centered as appearance drifts.
        let n = self.hits as f32;
        for (p, &e) in self.embedding.iter_mut().zip(embedding.iter()) {
            *p = (*p * n + e) / (n + 1.0);
        }
        self.hits += 1;
    }
}

/// Production tracker: detector + embedder + nearest-prototype clustering.
pub struct ParticipantTracker {
    media: MediaConfig,
    faces: FaceConfig,
    detector: Box<dyn FaceDetector>,
    embedder: Box<dyn FaceEmbedder>,
    distance: Distance,
}

impl ParticipantTracker {
    pub fn new(media: MediaConfig, faces: FaceConfig) -> Self {
        Self {
            media,
            faces,
            detector: Box::new(SkinRegionDetector::new()),
            embedder: Box::new(PatchEmbedder::new()),
            distance: Distance::Cosine,
        }
    }

    pub fn with_backends(
        media: MediaConfig,
        faces: FaceConfig,
        detector: Box<dyn FaceDetector>,
        embedder: Box<dyn FaceEmbedder>,
        distance: Distance,
    ) -> Self {
        Self {
            media,
            faces,
            detector,
            embedder,
            distance,
        }
    }

    fn process_frame(&self, frame: &Frame, prototypes: &mut Vec<Prototype>) -> usize {
        let boxes = self.detector.detect(frame);
        for face in &boxes {
            let embedding = self.embedder.embed(frame, face);

            let nearest = prototypes
                .iter_mut()
                .map(|p| (self.distance.between(&p.embedding, &embedding), p))
                .min_by(|a, b| a.0.total_cmp(&b.0));

            match nearest {
                Some((dist, proto)) if dist <= self.faces.tolerance => {
                    proto.fold(&embedding);
                    proto.seen_at.push(frame.timestamp);
                    maybe_keep_photo(proto, frame, face);
                }
                _ => {
                    let mut proto = Prototype {
                        embedding,
                        hits: 1,
                        seen_at: vec![frame.timestamp],
                        best_photo: None,
                    };
                    maybe_keep_photo(&mut proto, frame, face);
                    prototypes.push(proto);
                }
            }
        }
        boxes.len()
    }
}

impl FaceTracker for ParticipantTracker {
    fn track(&self, video: &Path) -> Result<TrackingResult> {
        let sample_fps = self.faces.sample_fps;
        let stream = FrameStream::open(video, &self.media, sample_fps)?;

        let mut prototypes: Vec<Prototype> = Vec::new();
        let mut frames_analyzed = 0usize;
        let mut faces_detected = 0usize;

        for frame in stream {
            let frame = frame?;
            faces_detected += self.process_frame(&frame, &mut prototypes);
            frames_analyzed += 1;
        }

        if frames_analyzed == 0 {
            return Err(ExpoError::FaceDetection {
                message: format!("no frames decoded from {}", video.display()),
            });
        }

        let sample_period = 1.0 / sample_fps;
        let video_duration = frames_analyzed as f64 * sample_period;

        let participants = assemble_participants(
            prototypes,
            sample_period,
            self.faces.min_visible_secs,
            video_duration,
        );

        info!(
            "tracked {} participant(s) over {} frames ({} detections)",
            participants.len(),
            frames_analyzed,
            faces_detected
        );

        Ok(TrackingResult {
            participants,
            video_duration,
            frames_analyzed,
            faces_detected,
        })
    }
}

/// Keep the highest-confidence crop per prototype, encoded lazily at the end.
fn maybe_keep_photo(proto: &mut Prototype, frame: &Frame, face: &FaceBox) {
    let better = match &proto.best_photo {
        Some((conf, ..)) => face.confidence > *conf,
        None => true,
    };
    if !better {
        return;
    }

    let x1 = face.x.min(frame.width);
    let y1 = face.y.min(frame.height);
    let x2 = (face.x + face.width).min(frame.width);
    let y2 = (face.y + face.height).min(frame.height);
    if x2 <= x1 || y2 <= y1 {
        return;
    }

    let w = x2 - x1;
    let h = y2 - y1;
    let mut crop = Vec::with_capacity((w * h * 3) as usize);
    for y in y1..y2 {
        let row = ((y * frame.width + x1) * 3) as usize;
        crop.extend_from_slice(&frame.rgb[row..row + (w * 3) as usize]);
    }
    proto.best_photo = Some((face.confidence, crop, w, h));
}

/// Encode a raw rgb24 crop as a JPEG thumbnail, longest side capped.
fn encode_photo(rgb: Vec<u8>, width: u32, height: u32) -> Option<Vec<u8>> {
    let img = image::RgbImage::from_raw(width, height, rgb)?;
    let max_side = width.max(height);
    let img = if max_side > defaults::PHOTO_MAX_SIDE {
        let scale = defaults::PHOTO_MAX_SIDE as f32 / max_side as f32;
        image::imageops::resize(
            &img,
            ((width as f32 * scale) as u32).max(1),
            ((height as f32 * scale) as u32).max(1),
            image::imageops::FilterType::Triangle,
        )
    } else {
        img
    };

    let mut out = Vec::new();
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, 85);
    image::DynamicImage::ImageRgb8(img).write_with_encoder(encoder).ok()?;
    Some(out)
}

/// Coalesce hit timestamps into appearance intervals: consecutive hits
/// whose gap is at most twice the sampling period belong to one interval.
fn coalesce(seen_at: &[f64], sample_period: f64) -> Vec<FaceAppearance> {
    let mut intervals = Vec::new();
    let mut iter = seen_at.iter();
    let Some(&first) = iter.next() else {
        return intervals;
    };

    let max_gap = 2.0 * sample_period;
    let mut start = first;
    let mut last = first;
    for &t in iter {
        if t - last > max_gap {
            intervals.push(FaceAppearance {
                start,
                end: last + sample_period,
            });
            start = t;
        }
        last = t;
    }
    intervals.push(FaceAppearance {
        start,
        end: last + sample_period,
    });
    intervals
}

fn assemble_participants(
    prototypes: Vec<Prototype>,
    sample_period: f64,
    min_visible_secs: f64,
    video_duration: f64,
) -> Vec<Participant> {
    let mut built: Vec<(f64, Vec<FaceAppearance>, Option<Vec<u8>>)> = prototypes
        .into_iter()
        .filter_map(|proto| {
            let appearances = coalesce(&proto.seen_at, sample_period);
            let total: f64 = appearances.iter().map(|a| a.duration()).sum();
            if total < min_visible_secs {
                debug!("dropping brief identity ({:.1}s visible)", total);
                return None;
            }
            let first = appearances.first().map(|a| a.start).unwrap_or(0.0);
            let photo = proto
                .best_photo
                .and_then(|(_, rgb, w, h)| encode_photo(rgb, w, h));
            Some((first, appearances, photo))
        })
        .collect();

    built.sort_by(|a, b| a.0.total_cmp(&b.0));

    built
        .into_iter()
        .enumerate()
        .map(|(i, (_, appearances, photo))| {
            let total_time: f64 = appearances.iter().map(|a| a.duration()).sum();
            let percentage = if video_duration > 0.0 {
                round2(total_time / video_duration * 100.0)
            } else {
                0.0
            };
            Participant {
                id: format!("Persona {}", i + 1),
                appearances,
                // Exact sum of the intervals; only the percentage is rounded.
                total_time,
                percentage_of_video: percentage.min(100.0),
                photo,
            }
        })
        .collect()
}

/// Mock tracker for orchestrator tests.
pub struct MockFaceTracker {
    result: Option<TrackingResult>,
}

impl MockFaceTracker {
    pub fn with_result(result: TrackingResult) -> Self {
        Self {
            result: Some(result),
        }
    }

    /// A mock whose `track` fails.
    pub fn failing() -> Self {
        Self { result: None }
    }

    /// Convenience: participants with the given intervals over `duration`.
    pub fn with_participants(intervals: Vec<Vec<(f64, f64)>>, duration: f64) -> Self {
        let participants = intervals
            .into_iter()
            .enumerate()
            .map(|(i, spans)| {
                let appearances: Vec<FaceAppearance> = spans
                    .into_iter()
                    .map(|(start, end)| FaceAppearance { start, end })
                    .collect();
                let total: f64 = appearances.iter().map(|a| a.duration()).sum();
                Participant {
                    id: format!("Persona {}", i + 1),
                    appearances,
                    total_time: total,
                    percentage_of_video: round2(total / duration * 100.0),
                    photo: None,
                }
            })
            .collect();
        Self::with_result(TrackingResult {
            participants,
            video_duration: duration,
            frames_analyzed: duration as usize,
            faces_detected: 0,
        })
    }
}

impl FaceTracker for MockFaceTracker {
    fn track(&self, _video: &Path) -> Result<TrackingResult> {
        match &self.result {
            Some(result) => Ok(result.clone()),
            None => Err(ExpoError::FaceDetection {
                message: "mock tracking failure".to_string(),
            }),
        }
    }
}
