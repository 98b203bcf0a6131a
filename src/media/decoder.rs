//! Decoder binary discovery.
//!
//! ffmpeg is resolved once at startup and its directory is prepended to the
//! process PATH so every later subprocess invocation finds the same binary.

use crate::error::{ExpoError, Result};
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

static RESOLVED: OnceLock<PathBuf> = OnceLock::new();

/// Resolve the ffmpeg binary: explicit override first, then PATH lookup.
pub fn resolve_ffmpeg(override_path: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = override_path {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return Err(ExpoError::DecoderNotFound {
            message: format!("configured ffmpeg path does not exist: {}", path.display()),
        });
    }

    which::which("ffmpeg").map_err(|e| ExpoError::DecoderNotFound {
        message: format!("ffmpeg not on PATH: {}", e),
    })
}

/// Resolve ffmpeg once per process and prepend its directory to PATH.
///
/// Returns the resolved binary path. Subsequent calls reuse the first
/// resolution regardless of the override argument.
pub fn init_decoder_env(override_path: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = RESOLVED.get() {
        return Ok(path.clone());
    }

    let resolved = resolve_ffmpeg(override_path)?;
    if let Some(dir) = resolved.parent() {
        let current = std::env::var_os("PATH").unwrap_or_default();
        let mut parts = vec![dir.to_path_buf()];
        parts.extend(std::env::split_paths(&current));
        if let Ok(joined) = std::env::join_paths(parts) {
            // Safety note: set_var is process-global; we only extend PATH
            // with the decoder directory, before any worker thread spawns.
            std::env::set_var("PATH", joined);
            debug!("prepended {} to PATH", dir.display());
        }
    }

    info!("decoder resolved: {}", resolved.display());
    let _ = RESOLVED.set(resolved.clone());
    Ok(resolved)
}
