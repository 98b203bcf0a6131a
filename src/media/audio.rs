//! Audio extraction (stage A): video container → 16 kHz mono float samples.
//!
//! Decodes through an ffmpeg pipe (`-f f32le` to stdout), no intermediate
//! WAV, no seekable-duration requirement. The subprocess runs under a hard
//! deadline and is killed when it expires.

use crate::config::MediaConfig;
use crate::error::{ExpoError, Result};
use log::{debug, info, warn};
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

/// Decoded audio: 16 kHz mono samples normalized to [-1, 1].
#[derive(Debug, Clone, Default)]
pub struct AudioTrack {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioTrack {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Track length in seconds, derived from the sample count.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Samples covering `[start, end]` seconds, clamped to the track.
    pub fn slice_secs(&self, start: f64, end: f64) -> &[f32] {
        let a = ((start.max(0.0) * self.sample_rate as f64) as usize).min(self.samples.len());
        let b = ((end.max(0.0) * self.sample_rate as f64) as usize).min(self.samples.len());
        &self.samples[a..b.max(a)]
    }
}

/// Trait seam for audio extraction so the orchestrator can run without a
/// real decoder in tests.
pub trait AudioExtractor: Send + Sync {
    fn extract(&self, video: &Path) -> Result<AudioTrack>;
}

/// Production extractor driving the ffmpeg subprocess.
pub struct FfmpegAudioExtractor {
    config: MediaConfig,
}

impl FfmpegAudioExtractor {
    pub fn new(config: MediaConfig) -> Self {
        Self { config }
    }
}

impl AudioExtractor for FfmpegAudioExtractor {
    fn extract(&self, video: &Path) -> Result<AudioTrack> {
        if !video.is_file() {
            return Err(ExpoError::AudioExtraction {
                message: format!("video file not found: {}", video.display()),
            });
        }

        let ffmpeg = crate::media::decoder::resolve_ffmpeg(self.config.ffmpeg_path.as_deref())?;
        let sample_rate = self.config.sample_rate;

        debug!("extracting audio from {}", video.display());
        let mut child = Command::new(&ffmpeg)
            .arg("-nostdin")
            .arg("-i")
            .arg(video)
            .args(["-vn", "-f", "f32le", "-acodec", "pcm_f32le"])
            .args(["-ar", &sample_rate.to_string()])
            .args(["-ac", "1", "-"])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ExpoError::AudioExtraction {
                message: format!("failed to spawn decoder: {}", e),
            })?;

        let timeout = Duration::from_secs(self.config.decoder_timeout_secs);
        let raw = run_with_deadline(&mut child, timeout, "audio decode")?;

        if raw.len() % 4 != 0 {
            warn!("decoder produced {} bytes, not a whole f32 count", raw.len());
        }
        let samples: Vec<f32> = raw
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();

        if samples.is_empty() {
            return Err(ExpoError::AudioExtraction {
                message: "decoder produced zero audio bytes".to_string(),
            });
        }

        let track = AudioTrack::new(samples, sample_rate);
        info!(
            "decoded {:.1}s of audio ({} samples)",
            track.duration_secs(),
            track.samples.len()
        );
        Ok(track)
    }
}

/// Drain a piped child's stdout under a deadline, killing it on expiry.
///
/// stdout and stderr are drained on reader threads so the child never
/// blocks on a full pipe; the calling thread polls for exit.
pub(crate) fn run_with_deadline(
    child: &mut Child,
    timeout: Duration,
    what: &str,
) -> Result<Vec<u8>> {
    let stdout = child.stdout.take().ok_or_else(|| ExpoError::AudioExtraction {
        message: "decoder stdout not captured".to_string(),
    })?;
    let stderr = child.stderr.take();

    let (out_tx, out_rx) = crossbeam_channel::bounded(1);
    std::thread::spawn(move || {
        let mut reader = stdout;
        let mut buf = Vec::new();
        let result = reader.read_to_end(&mut buf);
        let _ = out_tx.send((buf, result));
    });

    let (err_tx, err_rx) = crossbeam_channel::bounded(1);
    std::thread::spawn(move || {
        let mut text = String::new();
        if let Some(mut reader) = stderr {
            let _ = reader.read_to_string(&mut text);
        }
        let _ = err_tx.send(text);
    });

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ExpoError::AudioExtraction {
                        message: format!("{} timed out after {:?}", what, timeout),
                    });
                }
                std::thread::sleep(Duration::from_millis(50));
            }
            Err(e) => {
                return Err(ExpoError::AudioExtraction {
                    message: format!("failed to wait for decoder: {}", e),
                })
            }
        }
    };

    let (bytes, read_result) = out_rx
        .recv_timeout(Duration::from_secs(10))
        .map_err(|_| ExpoError::AudioExtraction {
            message: "decoder output reader stalled".to_string(),
        })?;
    read_result.map_err(|e| ExpoError::AudioExtraction {
        message: format!("failed to read decoder output: {}", e),
    })?;

    if !status.success() {
        let stderr_text = err_rx
            .recv_timeout(Duration::from_secs(5))
            .unwrap_or_default();
        let tail: String = stderr_text
            .lines()
            .rev()
            .take(3)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect::<Vec<_>>()
            .join(" | ");
        return Err(ExpoError::AudioExtraction {
            message: format!("decoder exited with {}: {}", status, tail),
        });
    }

    Ok(bytes)
}

/// Mock extractor for orchestrator tests.
pub struct MockAudioExtractor {
    track: AudioTrack,
    should_fail: bool,
}

impl MockAudioExtractor {
    /// A mock returning `secs` seconds of silence at 16 kHz.
    pub fn silence(secs: f64) -> Self {
        Self {
            track: AudioTrack::new(vec![0.0; (secs * 16_000.0) as usize], 16_000),
            should_fail: false,
        }
    }

    pub fn with_track(track: AudioTrack) -> Self {
        Self {
            track,
            should_fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            track: AudioTrack::default(),
            should_fail: true,
        }
    }
}

impl AudioExtractor for MockAudioExtractor {
    fn extract(&self, _video: &Path) -> Result<AudioTrack> {
        if self.should_fail {
            return Err(ExpoError::AudioExtraction {
                message: "mock extraction failure".to_string(),
            });
        }
        Ok(self.track.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_duration_from_sample_count() {
        let track = AudioTrack::new(vec![0.0; 32_000], 16_000);
        assert_eq!(track.duration_secs(), 2.0);
    }

    #[test]
    fn empty_track_duration_zero() {
        let track = AudioTrack::default();
        assert_eq!(track.duration_secs(), 0.0);
    }

    #[test]
    fn slice_secs_clamps_to_track() {
        let track = AudioTrack::new(vec![0.5; 16_000], 16_000);
        assert_eq!(track.slice_secs(0.0, 0.5).len(), 8_000);
        assert_eq!(track.slice_secs(0.5, 10.0).len(), 8_000);
        assert_eq!(track.slice_secs(5.0, 10.0).len(), 0);
        assert_eq!(track.slice_secs(-1.0, 0.25).len(), 4_000);
    }

    #[test]
    fn extract_missing_file_fails() {
        let extractor = FfmpegAudioExtractor::new(MediaConfig::default());
        let err = extractor.extract(Path::new("/nonexistent/video.mp4")).unwrap_err();
        assert!(matches!(err, ExpoError::AudioExtraction { .. }));
    }

    #[test]
    fn mock_extractor_returns_silence() {
        let extractor = MockAudioExtractor::silence(3.0);
        let track = extractor.extract(Path::new("ignored.mp4")).unwrap();
        assert_eq!(track.duration_secs(), 3.0);
        assert!(track.samples.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn mock_extractor_failure() {
        let extractor = MockAudioExtractor::failing();
        assert!(extractor.extract(Path::new("ignored.mp4")).is_err());
    }

    #[test]
    fn f32_byte_parsing_matches_encoding() {
        let values = [0.0f32, 0.5, -0.5, 1.0, -1.0];
        let mut raw = Vec::new();
        for v in values {
            raw.extend_from_slice(&v.to_le_bytes());
        }
        let parsed: Vec<f32> = raw
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        assert_eq!(parsed, values);
    }
}
