//! Face participant tracking: who appears on screen, when, and for how long.
//!
//! The tracker clusters detected faces across sampled frames into anonymous
//! person identities. Detection and embedding sit behind traits so the
//! geometry-free default backends can be swapped for heavier models.

pub mod detect;
pub mod embed;
pub mod tracker;

pub use detect::{FaceBox, FaceDetector, MockFaceDetector, SkinRegionDetector};
pub use embed::{Distance, FaceEmbedder, PatchEmbedder};
pub use tracker::{FaceTracker, MockFaceTracker, ParticipantTracker, TrackingResult};
