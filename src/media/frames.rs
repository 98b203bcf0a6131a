//! Frame sampling: video container → fixed-size RGB frames at a low rate.
//!
//! Frames come out of ffmpeg as raw rgb24 at a fixed analysis resolution,
//! so downstream stages never deal with codec or aspect-ratio variety.

use crate::config::MediaConfig;
use crate::error::{ExpoError, Result};
use log::{debug, warn};
use std::io::Read;
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};

/// A single sampled video frame in packed rgb24.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Zero-based index in sampling order.
    pub index: usize,
    /// Presentation time in seconds, derived from the sampling rate.
    pub timestamp: f64,
    pub width: u32,
    pub height: u32,
    /// Packed rgb24, row-major, `width * height * 3` bytes.
    pub rgb: Vec<u8>,
}

impl Frame {
    /// Luma of the pixel at (x, y) using the Rec. 601 weights.
    pub fn luma(&self, x: u32, y: u32) -> f32 {
        let i = ((y * self.width + x) * 3) as usize;
        let r = self.rgb[i] as f32;
        let g = self.rgb[i + 1] as f32;
        let b = self.rgb[i + 2] as f32;
        0.299 * r + 0.587 * g + 0.114 * b
    }

    /// Full grayscale plane, one f32 luma value per pixel.
    pub fn gray(&self) -> Vec<f32> {
        self.rgb
            .chunks_exact(3)
            .map(|p| 0.299 * p[0] as f32 + 0.587 * p[1] as f32 + 0.114 * p[2] as f32)
            .collect()
    }

    /// Mean luma over the whole frame.
    pub fn mean_brightness(&self) -> f32 {
        let gray = self.gray();
        if gray.is_empty() {
            return 0.0;
        }
        gray.iter().sum::<f32>() / gray.len() as f32
    }

    /// RGB triplet at (x, y).
    pub fn pixel(&self, x: u32, y: u32) -> (u8, u8, u8) {
        let i = ((y * self.width + x) * 3) as usize;
        (self.rgb[i], self.rgb[i + 1], self.rgb[i + 2])
    }
}

/// Streaming iterator over sampled frames of a video file.
///
/// Reads exactly one frame's worth of bytes per `next()` call, so memory
/// stays bounded no matter how long the video is. Dropping the stream
/// kills the decoder subprocess.
#[derive(Debug)]
pub struct FrameStream {
    child: Child,
    stdout: ChildStdout,
    width: u32,
    height: u32,
    fps: f64,
    index: usize,
    done: bool,
}

impl FrameStream {
    /// Open a video and start sampling at `fps` frames per second.
    pub fn open(video: &Path, config: &MediaConfig, fps: f64) -> Result<Self> {
        if !video.is_file() {
            return Err(ExpoError::FrameDecoding {
                message: format!("video file not found: {}", video.display()),
            });
        }
        if fps <= 0.0 {
            return Err(ExpoError::FrameDecoding {
                message: format!("invalid sampling rate: {}", fps),
            });
        }

        let ffmpeg = crate::media::decoder::resolve_ffmpeg(config.ffmpeg_path.as_deref())?;
        let filter = format!(
            "fps={},scale={}:{}",
            fps, config.frame_width, config.frame_height
        );

        debug!("sampling frames from {} ({})", video.display(), filter);
        let mut child = Command::new(&ffmpeg)
            .arg("-nostdin")
            .arg("-i")
            .arg(video)
            .args(["-vf", &filter])
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "-an", "-"])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ExpoError::FrameDecoding {
                message: format!("failed to spawn decoder: {}", e),
            })?;

        let stdout = child.stdout.take().ok_or_else(|| ExpoError::FrameDecoding {
            message: "decoder stdout not captured".to_string(),
        })?;

        Ok(Self {
            child,
            stdout,
            width: config.frame_width,
            height: config.frame_height,
            fps,
            index: 0,
            done: false,
        })
    }

    fn frame_bytes(&self) -> usize {
        (self.width * self.height * 3) as usize
    }

    fn read_one(&mut self) -> Result<Option<Frame>> {
        let mut buf = vec![0u8; self.frame_bytes()];
        let mut filled = 0;
        while filled < buf.len() {
            match self.stdout.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(ExpoError::FrameDecoding {
                        message: format!("failed to read frame data: {}", e),
                    })
                }
            }
        }

        if filled == 0 {
            return Ok(None);
        }
        if filled < buf.len() {
            // Trailing partial frame at stream end; drop it.
            warn!("dropping truncated final frame ({} of {} bytes)", filled, buf.len());
            return Ok(None);
        }

        let frame = Frame {
            index: self.index,
            timestamp: self.index as f64 / self.fps,
            width: self.width,
            height: self.height,
            rgb: buf,
        };
        self.index += 1;
        Ok(Some(frame))
    }

    /// Drain the stream into a vector, keeping at most `limit` frames.
    pub fn collect_frames(mut self, limit: usize) -> Result<Vec<Frame>> {
        let mut frames = Vec::new();
        while frames.len() < limit {
            match self.read_one()? {
                Some(frame) => frames.push(frame),
                None => break,
            }
        }
        Ok(frames)
    }
}

impl Iterator for FrameStream {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_one() {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl Drop for FrameStream {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
