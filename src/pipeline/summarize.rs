//! Chunked corpus summarization.
//!
//! Each chunk is summarized independently and concurrently; partial summaries are joined
//! back in original chunk order with a single separating space. One exhausted chunk fails
//! the whole summarization so an incomplete summary can never pass for a complete one.

use crate::inference::{GenerationParams, InferenceClient, InferenceError};
use crate::pipeline::chunking::chunk_text;
use crate::pipeline::types::SummarizeError;
use crate::retry::{self, RetryPolicy};
use futures_util::future::try_join_all;

/// Summarize `text` chunk by chunk and merge the partial summaries.
pub(crate) async fn summarize_corpus(
    client: &InferenceClient,
    policy: &RetryPolicy,
    text: &str,
    chunk_size: usize,
    params: &GenerationParams,
) -> Result<String, SummarizeError> {
    let chunks = chunk_text(text, chunk_size)?;
    tracing::debug!(chunks = chunks.len(), chunk_size, "Summarizing corpus");

    // try_join_all resolves in input order no matter when each call completes.
    let summaries = try_join_all(chunks.iter().enumerate().map(|(index, chunk)| async move {
        retry::execute(policy, InferenceError::class, || {
            client.summarize_chunk(chunk, params)
        })
        .await
        .map_err(|source| SummarizeError::Chunk { index, source })
    }))
    .await?;

    Ok(summaries.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};
    use reqwest::Client;
    use serde_json::json;
    use std::time::Duration;

    fn test_client(base_url: String) -> InferenceClient {
        InferenceClient {
            client: Client::builder()
                .user_agent("mediascribe-test")
                .build()
                .expect("client"),
            base_url,
            api_token: "test-token".into(),
            caption_model: "caption-model".into(),
            summarization_model: "summary-model".into(),
            qa_model: "qa-model".into(),
        }
    }

    fn quick_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(20),
            max_jitter: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn joins_chunk_summaries_in_order_with_single_spaces() {
        let server = MockServer::start_async().await;

        // Chunk size 5 splits "aaaaabbbbbccccc" into three chunks; the first completes last.
        for (fragment, summary, delay_ms) in [
            ("aaaaa", "first", 300u64),
            ("bbbbb", "second", 0),
            ("ccccc", "third", 100),
        ] {
            server
                .mock_async(move |when, then| {
                    when.method(POST)
                        .path("/models/summary-model")
                        .body_contains(fragment);
                    then.status(200)
                        .delay(Duration::from_millis(delay_ms))
                        .json_body(json!([{ "summary_text": summary }]));
                })
                .await;
        }

        let client = test_client(server.base_url());
        let merged = summarize_corpus(
            &client,
            &quick_policy(),
            "aaaaabbbbbccccc",
            5,
            &GenerationParams::default(),
        )
        .await
        .expect("summarization succeeded");

        assert_eq!(merged, "first second third");
    }

    #[tokio::test]
    async fn exhausted_chunk_fails_the_whole_summarization() {
        let server = MockServer::start_async().await;

        let ok_mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/models/summary-model")
                    .body_contains("aaaaa");
                then.status(200).json_body(json!([{ "summary_text": "fine" }]));
            })
            .await;
        let failing_mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/models/summary-model")
                    .body_contains("bbbbb");
                then.status(503).json_body(json!({ "error": "model is loading" }));
            })
            .await;

        let client = test_client(server.base_url());
        let error = summarize_corpus(
            &client,
            &quick_policy(),
            "aaaaabbbbb",
            5,
            &GenerationParams::default(),
        )
        .await
        .unwrap_err();

        match error {
            SummarizeError::Chunk { index, source } => {
                assert_eq!(index, 1);
                assert!(matches!(
                    source,
                    crate::retry::RetryError::Exhausted { attempts: 2, .. }
                ));
            }
            other => panic!("expected chunk failure, got {other:?}"),
        }
        // The failing chunk burned its full attempt budget; the healthy chunk ran once.
        failing_mock.assert_hits(2);
        assert!(ok_mock.hits() <= 1);
    }

    #[tokio::test]
    async fn empty_corpus_summarizes_to_empty_text() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/models/summary-model");
                then.status(200).json_body(json!([{ "summary_text": "unused" }]));
            })
            .await;

        let client = test_client(server.base_url());
        let merged = summarize_corpus(
            &client,
            &quick_policy(),
            "",
            2000,
            &GenerationParams::default(),
        )
        .await
        .expect("summarization succeeded");

        assert_eq!(merged, "");
        mock.assert_hits(0);
    }
}
