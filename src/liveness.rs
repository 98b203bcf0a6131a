//! Recording authenticity analysis: was the video captured in-camera or
//! re-captured from a screen / produced from a prior file?
//!
//! Live camera footage carries more sensor noise, more natural brightness
//! drift and more frame-to-frame variability than compressed pre-recorded
//! material. Each sampled frame contributes four signals (edge-response
//! variance, brightness delta, motion magnitude, temporal variability) that
//! combine into a 0-100 score.
//!
//! This stage is advisory: it never fails the pipeline. Any internal error
//! is logged and reported as "no verdict".

use crate::config::MediaConfig;
use crate::defaults;
use crate::media::frames::FrameStream;
use crate::types::{LivenessVerdict, RecordingKind};
use log::{debug, info, warn};
use std::path::Path;

/// Per-factor weights of the combined liveness score.
const WEIGHT_METADATA: f64 = 0.20;
const WEIGHT_NOISE: f64 = 0.25;
const WEIGHT_BRIGHTNESS: f64 = 0.20;
const WEIGHT_MOTION: f64 = 0.15;
const WEIGHT_TEMPORAL: f64 = 0.20;

/// Trait seam so the orchestrator can run with a scripted verdict.
pub trait LivenessProbe: Send + Sync {
    /// `None` means "no verdict": the analysis could not run.
    fn analyze(&self, video: &Path) -> Option<LivenessVerdict>;
}

pub struct LivenessDetector {
    media: MediaConfig,
    max_frames: usize,
}

impl LivenessDetector {
    pub fn new(media: MediaConfig) -> Self {
        Self {
            media,
            max_frames: defaults::LIVENESS_MAX_FRAMES,
        }
    }

    /// Analyze a video and classify its recording authenticity.
    ///
    /// Returns `None` instead of an error when the analysis cannot run;
    /// the caller treats that as "no verdict", neither pass nor fail.
    pub fn analyze(&self, video: &Path) -> Option<LivenessVerdict> {
        match self.try_analyze(video) {
            Ok(verdict) => {
                info!(
                    "liveness: {:?} (score {:.1}, confidence {:.1})",
                    verdict.classification, verdict.liveness_score, verdict.confidence
                );
                Some(verdict)
            }
            Err(message) => {
                warn!("liveness analysis skipped: {}", message);
                None
            }
        }
    }

    fn try_analyze(&self, video: &Path) -> std::result::Result<LivenessVerdict, String> {
        let metadata_score = metadata_score(video);

        let stream = FrameStream::open(video, &self.media, defaults::FACE_SAMPLE_FPS)
            .map_err(|e| e.to_string())?;

        let mut noise_levels: Vec<f64> = Vec::new();
        let mut brightness_deltas: Vec<f64> = Vec::new();
        let mut motion_levels: Vec<f64> = Vec::new();
        let mut prev_gray: Option<Vec<f32>> = None;
        let mut frame_count = 0usize;

        for frame in stream {
            let frame = frame.map_err(|e| e.to_string())?;
            let gray = frame.gray();

            noise_levels.push(laplacian_noise(&gray, frame.width as usize));

            if let Some(prev) = &prev_gray {
                let delta = mean_abs_diff(&gray, prev);
                brightness_deltas.push(delta);
                motion_levels.push(delta);
            }

            prev_gray = Some(gray);
            frame_count += 1;
            if frame_count >= self.max_frames {
                break;
            }
        }

        if frame_count < 2 {
            return Err(format!("only {} frame(s) decoded", frame_count));
        }
        debug!("liveness signals over {} frames", frame_count);

        // Frames are sampled at FACE_SAMPLE_FPS, so the count approximates
        // the analyzed duration in seconds.
        let approx_duration = frame_count as f64 / defaults::FACE_SAMPLE_FPS;
        let metadata_score = duration_adjust(metadata_score, approx_duration);

        let avg_noise = mean(&noise_levels);
        let avg_brightness = mean(&brightness_deltas);
        let avg_motion = mean(&motion_levels);
        let temporal = temporal_variability(&noise_levels, &brightness_deltas, &motion_levels);

        let noise_score = (avg_noise * 2.0).min(100.0);
        let brightness_score = (avg_brightness * 1.5).min(100.0);
        let motion_score = (avg_motion * 1.2).min(100.0);

        let score = (metadata_score * WEIGHT_METADATA
            + noise_score * WEIGHT_NOISE
            + brightness_score * WEIGHT_BRIGHTNESS
            + motion_score * WEIGHT_MOTION
            + temporal * WEIGHT_TEMPORAL)
            .clamp(0.0, 100.0);

        let confidence = if score >= 50.0 { score } else { 100.0 - score };

        Ok(LivenessVerdict {
            classification: RecordingKind::from_score(score),
            liveness_score: crate::types::round2(score),
            confidence: crate::types::round2(confidence),
        })
    }
}

impl LivenessProbe for LivenessDetector {
    fn analyze(&self, video: &Path) -> Option<LivenessVerdict> {
        LivenessDetector::analyze(self, video)
    }
}

/// Mock probe for orchestrator tests.
pub struct MockLiveness {
    verdict: Option<LivenessVerdict>,
}

impl MockLiveness {
    pub fn with_verdict(verdict: LivenessVerdict) -> Self {
        Self {
            verdict: Some(verdict),
        }
    }

    pub fn no_verdict() -> Self {
        Self { verdict: None }
    }
}

impl LivenessProbe for MockLiveness {
    fn analyze(&self, _video: &Path) -> Option<LivenessVerdict> {
        self.verdict.clone()
    }
}

/// File-level heuristic: a file written immediately after creation looks
/// like an in-place capture; a long gap suggests post-production.
fn metadata_score(video: &Path) -> f64 {
    let mut score: f64 = 50.0;

    if let Ok(meta) = std::fs::metadata(video) {
        if let (Ok(created), Ok(modified)) = (meta.created(), meta.modified()) {
            let diff = modified
                .duration_since(created)
                .or_else(|e| Ok::<_, ()>(e.duration()))
                .map(|d| d.as_secs_f64())
                .unwrap_or(0.0);
            if diff < 5.0 {
                score += 20.0;
            } else if diff < 30.0 {
                score += 10.0;
            } else if diff > 300.0 {
                score -= 20.0;
            }
        }
    }

    score.clamp(0.0, 100.0)
}

/// Presentation-length sanity adjustment on top of the metadata score.
fn duration_adjust(score: f64, duration_secs: f64) -> f64 {
    let adjusted = if duration_secs < 30.0 {
        score - 10.0
    } else if (60.0..=600.0).contains(&duration_secs) {
        score + 5.0
    } else {
        score
    };
    adjusted.clamp(0.0, 100.0)
}

/// Sensor-noise estimate: variance of the 4-neighbor Laplacian response,
/// normalized so typical live footage lands well above compressed replays.
fn laplacian_noise(gray: &[f32], width: usize) -> f64 {
    if width == 0 || gray.len() < width * 3 {
        return 0.0;
    }
    let height = gray.len() / width;

    let mut responses = Vec::with_capacity((width - 2) * (height - 2));
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let c = gray[y * width + x];
            let lap = gray[(y - 1) * width + x] + gray[(y + 1) * width + x]
                + gray[y * width + x - 1]
                + gray[y * width + x + 1]
                - 4.0 * c;
            responses.push(lap as f64);
        }
    }

    let variance = variance(&responses);
    (variance / 5.0).min(100.0)
}

fn mean_abs_diff(a: &[f32], b: &[f32]) -> f64 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }
    a.iter()
        .zip(b.iter())
        .take(n)
        .map(|(x, y)| (x - y).abs() as f64)
        .sum::<f64>()
        / n as f64
}

/// Live footage shows natural variability in all three signal tracks;
/// a replayed file is suspiciously steady.
fn temporal_variability(noise: &[f64], brightness: &[f64], motion: &[f64]) -> f64 {
    let mut score: f64 = 50.0;

    if !noise.is_empty() {
        let cv = variance(noise).sqrt() / (mean(noise) + 1e-6);
        if cv > 0.2 {
            score += 15.0;
        } else if cv < 0.05 {
            score -= 15.0;
        }
    }
    if !brightness.is_empty() {
        let cv = variance(brightness).sqrt() / (mean(brightness) + 1e-6);
        if cv > 0.3 {
            score += 10.0;
        } else if cv < 0.1 {
            score -= 10.0;
        }
    }
    if !motion.is_empty() {
        let cv = variance(motion).sqrt() / (mean(motion) + 1e-6);
        if cv > 0.4 {
            score += 10.0;
        }
    }

    score.clamp(0.0, 100.0)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64
}
