//! Media decoding: everything that talks to the bundled ffmpeg binary.
//!
//! The pipeline drives the decoder itself over pipes instead of going
//! through a helper library, so containers whose headers lack a declared
//! duration still decode: we never ask for duration metadata, we count
//! what comes out of the pipe.

pub mod audio;
pub mod decoder;
pub mod frames;

pub use audio::{AudioExtractor, AudioTrack, FfmpegAudioExtractor, MockAudioExtractor};
pub use decoder::{init_decoder_env, resolve_ffmpeg};
pub use frames::{Frame, FrameStream};
