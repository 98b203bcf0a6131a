//! Face embeddings: fixed-length vectors that let the tracker decide
//! whether two detections are the same person.

use crate::faces::detect::FaceBox;
use crate::media::frames::Frame;

/// Distance function between two embeddings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Distance {
    /// 1 − cosine similarity; 0 identical, 2 opposite.
    #[default]
    Cosine,
    /// Euclidean distance.
    L2,
}

impl Distance {
    pub fn between(&self, a: &[f32], b: &[f32]) -> f32 {
        let n = a.len().min(b.len());
        if n == 0 {
            return f32::MAX;
        }
        match self {
            Distance::Cosine => {
                let mut dot = 0.0f32;
                let mut na = 0.0f32;
                let mut nb = 0.0f32;
                for i in 0..n {
                    dot += a[i] * b[i];
                    na += a[i] * a[i];
                    nb += b[i] * b[i];
                }
                if na == 0.0 || nb == 0.0 {
                    return 1.0;
                }
                1.0 - dot / (na.sqrt() * nb.sqrt())
            }
            Distance::L2 => {
                let mut sum = 0.0f32;
                for i in 0..n {
                    let d = a[i] - b[i];
                    sum += d * d;
                }
                sum.sqrt()
            }
        }
    }
}

/// Trait for turning a face crop into an embedding vector.
pub trait FaceEmbedder: Send + Sync {
    fn embed(&self, frame: &Frame, face: &FaceBox) -> Vec<f32>;
}

/// Default embedder: the face crop resampled to a small grayscale patch,
/// mean-subtracted so lighting shifts do not dominate the distance.
pub struct PatchEmbedder {
    side: u32,
}

impl Default for PatchEmbedder {
    fn default() -> Self {
        Self { side: 16 }
    }
}

impl PatchEmbedder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FaceEmbedder for PatchEmbedder {
    fn embed(&self, frame: &Frame, face: &FaceBox) -> Vec<f32> {
        let side = self.side;
        let mut patch = Vec::with_capacity((side * side) as usize);

        let w = face.width.max(1);
        let h = face.height.max(1);
        for py in 0..side {
            for px in 0..side {
                // Nearest-neighbor sample inside the face box, clamped to the frame.
                let sx = (face.x + px * w / side).min(frame.width.saturating_sub(1));
                let sy = (face.y + py * h / side).min(frame.height.saturating_sub(1));
                patch.push(frame.luma(sx, sy));
            }
        }

        let mean = patch.iter().sum::<f32>() / patch.len() as f32;
        for v in &mut patch {
            *v -= mean;
        }
        patch
    }
}
