//! Video frame extraction via an ffmpeg subprocess.
//!
//! Frames are transient intermediate artifacts, never persisted state: the target
//! directory is purged before extraction so no stale frames from a prior job leak into a
//! new one, and the caller removes it again once the captions are collected. Each job
//! gets its own directory, so concurrent video jobs cannot interfere.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;

/// Errors raised while decomposing a video into still frames.
#[derive(Debug, Error)]
pub enum FrameExtractionError {
    /// Frame workspace could not be purged or created.
    #[error("failed to prepare frame directory {dir}: {source}")]
    Workspace {
        /// Directory being prepared.
        dir: PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: std::io::Error,
    },
    /// Decoder executable could not be launched.
    #[error("failed to launch frame decoder '{program}': {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying spawn error.
        #[source]
        source: std::io::Error,
    },
    /// Decoder ran but rejected the video.
    #[error("video decode failed: {0}")]
    Decode(String),
    /// Extracted frames could not be enumerated.
    #[error("failed to enumerate extracted frames: {0}")]
    Enumerate(#[source] std::io::Error),
}

/// Decompose `video_path` into ordered still frames under `frames_dir`.
///
/// Samples `fps` frames per second through ffmpeg's `fps` filter and names them with the
/// `frame-%03d.png` pattern. On any decode failure the directory is cleaned up and no
/// partial frame set is returned.
pub async fn extract_frames(
    program: &str,
    video_path: &Path,
    frames_dir: &Path,
    fps: u32,
) -> Result<Vec<PathBuf>, FrameExtractionError> {
    reset_dir(frames_dir)?;

    let pattern = frames_dir.join("frame-%03d.png");
    let output = Command::new(program)
        .arg("-hide_banner")
        .arg("-loglevel")
        .arg("error")
        .arg("-i")
        .arg(video_path)
        .arg("-vf")
        .arg(format!("fps={fps}"))
        .arg(&pattern)
        .output()
        .await
        .map_err(|source| {
            cleanup_dir(frames_dir);
            FrameExtractionError::Spawn {
                program: program.to_string(),
                source,
            }
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        cleanup_dir(frames_dir);
        return Err(FrameExtractionError::Decode(if stderr.is_empty() {
            format!("decoder exited with {}", output.status)
        } else {
            stderr
        }));
    }

    let frames = collect_frames(frames_dir)?;
    if frames.is_empty() {
        cleanup_dir(frames_dir);
        return Err(FrameExtractionError::Decode(
            "decoder produced no frames".to_string(),
        ));
    }

    tracing::debug!(
        video = %video_path.display(),
        frames = frames.len(),
        fps,
        "Extracted video frames"
    );
    Ok(frames)
}

/// Enumerate extracted frames in ascending frame-index order.
///
/// Ordering parses the numeric index out of the `frame-NNN.png` name rather than
/// comparing names lexicographically, so frame 1000 sorts after frame 999.
pub(crate) fn collect_frames(frames_dir: &Path) -> Result<Vec<PathBuf>, FrameExtractionError> {
    let entries = std::fs::read_dir(frames_dir).map_err(FrameExtractionError::Enumerate)?;

    let mut frames: Vec<(u64, PathBuf)> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(FrameExtractionError::Enumerate)?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("png") {
            continue;
        }
        if let Some(index) = frame_index(&path) {
            frames.push((index, path));
        }
    }

    frames.sort_by_key(|(index, _)| *index);
    Ok(frames.into_iter().map(|(_, path)| path).collect())
}

fn frame_index(path: &Path) -> Option<u64> {
    let stem = path.file_stem()?.to_str()?;
    let digits: String = stem.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// Ensure `dir` exists and is empty, purging any stale content from a prior job.
pub(crate) fn reset_dir(dir: &Path) -> Result<(), FrameExtractionError> {
    if dir.exists() {
        std::fs::remove_dir_all(dir).map_err(|source| FrameExtractionError::Workspace {
            dir: dir.to_path_buf(),
            source,
        })?;
    }
    std::fs::create_dir_all(dir).map_err(|source| FrameExtractionError::Workspace {
        dir: dir.to_path_buf(),
        source,
    })
}

/// Best-effort removal of a frame workspace once its frames have been consumed.
pub(crate) fn cleanup_dir(dir: &Path) {
    if let Err(err) = std::fs::remove_dir_all(dir) {
        if err.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(dir = %dir.display(), error = %err, "Failed to remove frame directory");
        }
    }
}
