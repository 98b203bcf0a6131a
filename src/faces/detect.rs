//! Face detection over sampled frames.

use crate::media::frames::Frame;

/// Axis-aligned face region in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Detection confidence, 0.0..=1.0.
    pub confidence: f32,
}

impl FaceBox {
    pub fn area(&self) -> u32 {
        self.width * self.height
    }

    pub fn center(&self) -> (f32, f32) {
        (
            self.x as f32 + self.width as f32 / 2.0,
            self.y as f32 + self.height as f32 / 2.0,
        )
    }
}

/// Trait for face detection so the tracker can run with a mock in tests.
pub trait FaceDetector: Send + Sync {
    /// Detect face regions in one frame. An empty vector is a valid result.
    fn detect(&self, frame: &Frame) -> Vec<FaceBox>;
}

/// Default detector: connected skin-tone regions.
///
/// Classifies pixels by an RGB skin rule, groups them on a coarse grid and
/// keeps grid clusters that are plausibly face-shaped. No learned model,
/// fully deterministic, adequate for webcam presentation footage where
/// faces are large and frontal.
pub struct SkinRegionDetector {
    /// Cells per frame side on the coarse occupancy grid.
    grid: u32,
    /// Minimum fraction of skin pixels for a grid cell to count.
    cell_threshold: f32,
}

impl Default for SkinRegionDetector {
    fn default() -> Self {
        Self {
            grid: 16,
            cell_threshold: 0.35,
        }
    }
}

impl SkinRegionDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// RGB skin classification rule (Peer et al. style thresholds).
    fn is_skin(r: u8, g: u8, b: u8) -> bool {
        let (rf, gf, bf) = (r as i32, g as i32, b as i32);
        rf > 95
            && gf > 40
            && bf > 20
            && rf - rf.min(gf).min(bf) > 15
            && (rf - gf).abs() > 15
            && rf > gf
            && rf > bf
    }

    /// Fill the occupancy grid with per-cell skin-pixel fractions.
    fn occupancy(&self, frame: &Frame) -> Vec<f32> {
        let grid = self.grid as usize;
        let mut skin = vec![0u32; grid * grid];
        let mut total = vec![0u32; grid * grid];

        for y in 0..frame.height {
            let gy = (y * self.grid / frame.height).min(self.grid - 1) as usize;
            for x in 0..frame.width {
                let gx = (x * self.grid / frame.width).min(self.grid - 1) as usize;
                let (r, g, b) = frame.pixel(x, y);
                total[gy * grid + gx] += 1;
                if Self::is_skin(r, g, b) {
                    skin[gy * grid + gx] += 1;
                }
            }
        }

        skin.iter()
            .zip(total.iter())
            .map(|(&s, &t)| if t == 0 { 0.0 } else { s as f32 / t as f32 })
            .collect()
    }

    /// Flood-fill connected occupied cells into clusters.
    fn clusters(&self, occupied: &[bool]) -> Vec<Vec<usize>> {
        let grid = self.grid as usize;
        let mut visited = vec![false; occupied.len()];
        let mut clusters = Vec::new();

        for start in 0..occupied.len() {
            if !occupied[start] || visited[start] {
                continue;
            }
            let mut cluster = Vec::new();
            let mut stack = vec![start];
            visited[start] = true;
            while let Some(cell) = stack.pop() {
                cluster.push(cell);
                let (cy, cx) = (cell / grid, cell % grid);
                let mut push = |ny: usize, nx: usize| {
                    let n = ny * grid + nx;
                    if occupied[n] && !visited[n] {
                        visited[n] = true;
                        stack.push(n);
                    }
                };
                if cy > 0 {
                    push(cy - 1, cx);
                }
                if cy + 1 < grid {
                    push(cy + 1, cx);
                }
                if cx > 0 {
                    push(cy, cx - 1);
                }
                if cx + 1 < grid {
                    push(cy, cx + 1);
                }
            }
            clusters.push(cluster);
        }

        clusters
    }
}

impl FaceDetector for SkinRegionDetector {
    fn detect(&self, frame: &Frame) -> Vec<FaceBox> {
        if frame.width < self.grid || frame.height < self.grid {
            return Vec::new();
        }

        let occupancy = self.occupancy(frame);
        let occupied: Vec<bool> = occupancy.iter().map(|&f| f >= self.cell_threshold).collect();

        let grid = self.grid as usize;
        let cell_w = frame.width as f32 / self.grid as f32;
        let cell_h = frame.height as f32 / self.grid as f32;

        let mut boxes: Vec<FaceBox> = self
            .clusters(&occupied)
            .into_iter()
            .filter_map(|cluster| {
                // A face occupies at least a few cells but not the whole frame.
                if cluster.len() < 4 || cluster.len() > grid * grid / 2 {
                    return None;
                }
                let (mut min_x, mut min_y, mut max_x, mut max_y) = (grid, grid, 0usize, 0usize);
                let mut fill = 0.0f32;
                for &cell in &cluster {
                    let (cy, cx) = (cell / grid, cell % grid);
                    min_x = min_x.min(cx);
                    min_y = min_y.min(cy);
                    max_x = max_x.max(cx);
                    max_y = max_y.max(cy);
                    fill += occupancy[cell];
                }
                let w_cells = max_x - min_x + 1;
                let h_cells = max_y - min_y + 1;
                let aspect = w_cells as f32 / h_cells as f32;
                // Faces are roughly upright rectangles.
                if !(0.3..=2.5).contains(&aspect) {
                    return None;
                }
                let confidence = (fill / cluster.len() as f32).clamp(0.0, 1.0);
                Some(FaceBox {
                    x: (min_x as f32 * cell_w) as u32,
                    y: (min_y as f32 * cell_h) as u32,
                    width: (w_cells as f32 * cell_w) as u32,
                    height: (h_cells as f32 * cell_h) as u32,
                    confidence,
                })
            })
            .collect();

        // Largest faces first; the tracker treats earlier boxes as primary.
        boxes.sort_by(|a, b| b.area().cmp(&a.area()));
        boxes
    }
}

/// Mock detector returning a scripted sequence of per-frame detections.
pub struct MockFaceDetector {
    per_frame: Vec<Vec<FaceBox>>,
}

impl MockFaceDetector {
    pub fn new(per_frame: Vec<Vec<FaceBox>>) -> Self {
        Self { per_frame }
    }
}

impl FaceDetector for MockFaceDetector {
    fn detect(&self, frame: &Frame) -> Vec<FaceBox> {
        self.per_frame.get(frame.index).cloned().unwrap_or_default()
    }
}
