//! Concurrent frame captioning with order restoration.
//!
//! Frames fan out to the captioning endpoint with bounded concurrency; completion order
//! is arbitrary, so results carry their frame index and are re-sorted before the merge.
//! A single frame's terminal failure fails the whole job: a transcript with silent gaps
//! is worse than an explicit error.

use crate::inference::InferenceClient;
use crate::pipeline::types::VideoError;
use crate::retry::{self, RetryPolicy};
use futures_util::{StreamExt, TryStreamExt, stream};
use std::path::PathBuf;

/// Caption every frame, returning captions in ascending frame-index order.
pub(crate) async fn caption_frames(
    client: &InferenceClient,
    policy: &RetryPolicy,
    frames: &[PathBuf],
    concurrency: usize,
) -> Result<Vec<String>, VideoError> {
    let mut indexed: Vec<(usize, String)> =
        stream::iter(frames.iter().enumerate().map(|(index, path)| async move {
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|source| VideoError::FrameRead { index, source })?;
            let caption = retry::execute(policy, crate::inference::InferenceError::class, || {
                client.caption_image(&bytes)
            })
            .await
            .map_err(|source| VideoError::Captioning { index, source })?;
            Ok::<(usize, String), VideoError>((index, caption))
        }))
        .buffer_unordered(concurrency.max(1))
        .try_collect()
        .await?;

    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, caption)| caption).collect())
}

/// Merge per-frame captions into the final description, one line per frame.
pub(crate) fn merge_captions(captions: &[String]) -> String {
    captions
        .iter()
        .enumerate()
        .map(|(index, caption)| format!("Frame {index}: {caption}"))
        .collect::<Vec<_>>()
        .join("\n")
}
