//! HTTP client wrapper for the hosted model-inference endpoints.

use crate::config::get_config;
use crate::inference::types::{
    AnswerResponse, CaptionResponse, GenerationParams, InferenceError, SummaryResponse,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use serde_json::{Value, json};

/// Lightweight HTTP client for the captioning, summarization, and QA endpoints.
pub struct InferenceClient {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) api_token: String,
    pub(crate) caption_model: String,
    pub(crate) summarization_model: String,
    pub(crate) qa_model: String,
}

impl InferenceClient {
    /// Construct a new client using configuration derived from the environment.
    pub fn new() -> Result<Self, InferenceError> {
        let config = get_config();
        let client = Client::builder()
            .user_agent("mediascribe/0.1")
            .build()?;

        let base_url =
            normalize_base_url(&config.inference_base_url).map_err(InferenceError::InvalidUrl)?;
        tracing::debug!(
            url = %base_url,
            caption_model = %config.caption_model,
            summarization_model = %config.summarization_model,
            qa_model = %config.qa_model,
            "Initialized inference HTTP client"
        );

        Ok(Self {
            client,
            base_url,
            api_token: config.api_token.clone(),
            caption_model: config.caption_model.clone(),
            summarization_model: config.summarization_model.clone(),
            qa_model: config.qa_model.clone(),
        })
    }

    /// Caption a single image, returning the generated text.
    ///
    /// The image bytes are base64-encoded into the request body as the endpoint expects.
    pub async fn caption_image(&self, image: &[u8]) -> Result<String, InferenceError> {
        let encoded = BASE64.encode(image);
        let value = self
            .post_model(&self.caption_model, json!({ "inputs": encoded }))
            .await?;
        let mut captions: Vec<CaptionResponse> = serde_json::from_value(value)
            .map_err(|err| InferenceError::MalformedResponse(err.to_string()))?;
        if captions.is_empty() {
            return Err(InferenceError::MalformedResponse(
                "empty caption array".to_string(),
            ));
        }
        Ok(captions.remove(0).generated_text)
    }

    /// Summarize one corpus chunk with the configured generation parameters.
    pub async fn summarize_chunk(
        &self,
        chunk: &str,
        params: &GenerationParams,
    ) -> Result<String, InferenceError> {
        let body = json!({
            "inputs": chunk,
            "parameters": params,
        });
        let value = self.post_model(&self.summarization_model, body).await?;
        let mut summaries: Vec<SummaryResponse> = serde_json::from_value(value)
            .map_err(|err| InferenceError::MalformedResponse(err.to_string()))?;
        if summaries.is_empty() {
            return Err(InferenceError::MalformedResponse(
                "empty summary array".to_string(),
            ));
        }
        Ok(summaries.remove(0).summary_text)
    }

    /// Issue a single extractive-QA call over the given context.
    ///
    /// A missing or malformed `answer` field is a fatal shape error, never retried.
    pub async fn answer_question(
        &self,
        question: &str,
        context: &str,
    ) -> Result<String, InferenceError> {
        let body = json!({
            "inputs": {
                "question": question,
                "context": context,
            }
        });
        let value = self.post_model(&self.qa_model, body).await?;
        let answer: AnswerResponse = serde_json::from_value(value)
            .map_err(|err| InferenceError::MalformedResponse(err.to_string()))?;
        Ok(answer.answer)
    }

    /// POST a JSON body to `{base}/models/{model}` and decode the response.
    ///
    /// Cold-starting models surface an `error` body mentioning "loading", sometimes on a
    /// success status; those are mapped to [`InferenceError::ModelLoading`] so the retry
    /// loop treats them as transient.
    async fn post_model(&self, model: &str, body: Value) -> Result<Value, InferenceError> {
        let url = format!("{}/models/{}", self.base_url.trim_end_matches('/'), model);
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if let Some(message) = extract_error_message(&text) {
            if message.to_lowercase().contains("loading") {
                return Err(InferenceError::ModelLoading(message));
            }
            if !status.is_success() {
                return Err(InferenceError::UnexpectedStatus {
                    status,
                    body: message,
                });
            }
            return Err(InferenceError::MalformedResponse(message));
        }

        if !status.is_success() {
            let error = InferenceError::UnexpectedStatus { status, body: text };
            tracing::error!(model, error = %error, "Inference request failed");
            return Err(error);
        }

        serde_json::from_str(&text)
            .map_err(|err| InferenceError::MalformedResponse(err.to_string()))
    }
}

/// Pull the `error` field out of an endpoint body, if the body is JSON and carries one.
fn extract_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("error")? {
        Value::String(message) => Some(message.clone()),
        other => Some(other.to_string()),
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::ErrorClass;
    use httpmock::{Method::POST, MockServer};

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

    #[tokio::test]
    async fn caption_image_decodes_generated_text() {
        let server = MockServer::start_async().await;
        let expected_body = BASE64.encode(b"pixels");

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/models/caption-model")
                    .header("authorization", "Bearer test-token")
                    .body_contains(&expected_body);
                then.status(200)
                    .json_body(json!([{ "generated_text": "a cat on a mat" }]));
            })
            .await;

        let client = test_client(server.base_url());
        let caption = client.caption_image(b"pixels").await.expect("caption");

        mock.assert();
        assert_eq!(caption, "a cat on a mat");
    }

    #[tokio::test]
    async fn summarize_chunk_sends_generation_parameters() {
        let server = MockServer::start_async().await;

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/models/summary-model")
                    .body_contains("\"inputs\":\"long text\"")
                    .body_contains("\"max_length\":200")
                    .body_contains("\"top_p\":0.95");
                then.status(200)
                    .json_body(json!([{ "summary_text": "short text" }]));
            })
            .await;

        let client = test_client(server.base_url());
        let summary = client
            .summarize_chunk("long text", &GenerationParams::default())
            .await
            .expect("summary");

        mock.assert();
        assert_eq!(summary, "short text");
    }

    #[tokio::test]
    async fn answer_question_decodes_answer_field() {
        let server = MockServer::start_async().await;

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/models/qa-model")
                    .body_contains("\"question\":\"who?\"")
                    .body_contains("\"context\":\"the context\"");
                then.status(200).json_body(json!({ "answer": "nobody" }));
            })
            .await;

        let client = test_client(server.base_url());
        let answer = client
            .answer_question("who?", "the context")
            .await
            .expect("answer");

        mock.assert();
        assert_eq!(answer, "nobody");
    }

    #[tokio::test]
    async fn service_unavailable_maps_to_transient_status_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/models/caption-model");
                then.status(503).body("upstream unavailable");
            })
            .await;

        let client = test_client(server.base_url());
        let error = client.caption_image(b"pixels").await.unwrap_err();

        assert!(matches!(
            error,
            InferenceError::UnexpectedStatus { status, .. }
                if status == reqwest::StatusCode::SERVICE_UNAVAILABLE
        ));
        assert_eq!(error.class(), ErrorClass::Transient);
    }

    #[tokio::test]
    async fn loading_body_maps_to_model_loading() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/models/summary-model");
                then.status(503).json_body(json!({
                    "error": "Model facebook/bart-large-cnn is currently loading",
                    "estimated_time": 20.0
                }));
            })
            .await;

        let client = test_client(server.base_url());
        let error = client
            .summarize_chunk("text", &GenerationParams::default())
            .await
            .unwrap_err();

        assert!(matches!(error, InferenceError::ModelLoading(_)));
        assert_eq!(error.class(), ErrorClass::Transient);
    }

    #[tokio::test]
    async fn client_error_is_fatal() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/models/qa-model");
                then.status(400).json_body(json!({ "error": "invalid input" }));
            })
            .await;

        let client = test_client(server.base_url());
        let error = client.answer_question("q", "c").await.unwrap_err();

        assert!(matches!(error, InferenceError::UnexpectedStatus { .. }));
        assert_eq!(error.class(), ErrorClass::Fatal);
    }

    #[tokio::test]
    async fn missing_answer_field_is_fatal_shape_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/models/qa-model");
                then.status(200).json_body(json!({ "score": 0.9 }));
            })
            .await;

        let client = test_client(server.base_url());
        let error = client.answer_question("q", "c").await.unwrap_err();

        assert!(matches!(error, InferenceError::MalformedResponse(_)));
        assert_eq!(error.class(), ErrorClass::Fatal);
    }
}
