use crate::error::{EmbeddingError, Result};
use crate::provider::{check_batch, check_count, EmbeddingProvider};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_RETRIES: usize = 4;

/// Embedding client for OpenAI-compatible `/embeddings` endpoints
pub struct OpenAiProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    dimension: usize,
}

impl OpenAiProvider {
    /// Build a client against an OpenAI-compatible API.
    ///
    /// `base_url` defaults to the OpenAI API when empty.
    pub fn new(api_key: &str, base_url: &str, model: &str, dimension: usize) -> Result<Self> {
        let base = if base_url.trim().is_empty() {
            "https://api.openai.com/v1"
        } else {
            base_url.trim()
        };
        let endpoint = format!("{}/embeddings", base.trim_end_matches('/'));
        let client = build_client(api_key)?;

        Ok(Self {
            client,
            endpoint,
            model: model.to_string(),
            dimension,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        check_batch(texts, self.max_batch_size())?;
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = OpenAiRequest {
            model: &self.model,
            input: texts,
            dimensions: Some(self.dimension),
        };

        let response: OpenAiResponse =
            post_with_retry(&self.client, &self.endpoint, &request).await?;

        let mut data = response.data;
        data.sort_by_key(|entry| entry.index);
        let vectors: Vec<Vec<f32>> = data.into_iter().map(|entry| entry.embedding).collect();

        check_count(texts.len(), &vectors)?;
        check_dimensions(&vectors, self.dimension)?;
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn max_batch_size(&self) -> usize {
        2048
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

/// Embedding client for the Hugging Face inference API
pub struct HuggingFaceProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    dimension: usize,
}

impl HuggingFaceProvider {
    pub fn new(api_key: &str, model: &str, dimension: usize) -> Result<Self> {
        let endpoint = format!(
            "https://api-inference.huggingface.co/pipeline/feature-extraction/{model}"
        );
        let client = build_client(api_key)?;

        Ok(Self {
            client,
            endpoint,
            model: model.to_string(),
            dimension,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for HuggingFaceProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        check_batch(texts, self.max_batch_size())?;
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = HuggingFaceRequest {
            inputs: texts,
            options: HuggingFaceOptions { wait_for_model: true },
        };

        let vectors: Vec<Vec<f32>> =
            post_with_retry(&self.client, &self.endpoint, &request).await?;

        check_count(texts.len(), &vectors)?;
        check_dimensions(&vectors, self.dimension)?;
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn max_batch_size(&self) -> usize {
        128
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

fn build_client(api_key: &str) -> Result<reqwest::Client> {
    if api_key.trim().is_empty() {
        return Err(EmbeddingError::invalid_config("missing API key"));
    }

    let mut headers = HeaderMap::new();
    let auth = format!("Bearer {}", api_key.trim());
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&auth)
            .map_err(|_| EmbeddingError::invalid_config("API key is not a valid header value"))?,
    );
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    reqwest::Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .default_headers(headers)
        .build()
        .map_err(|e| EmbeddingError::invalid_config(format!("failed to build HTTP client: {e}")))
}

/// POST with bounded exponential backoff on transient failures.
///
/// Retries 429 and 5xx responses plus connection-level errors; anything
/// else fails the batch immediately.
async fn post_with_retry<B, R>(client: &reqwest::Client, endpoint: &str, body: &B) -> Result<R>
where
    B: Serialize + Sync,
    R: for<'de> Deserialize<'de>,
{
    let mut attempt = 0usize;
    loop {
        let response = client.post(endpoint).json(body).send().await;
        match response {
            Ok(resp) => {
                let status = resp.status();
                if status.is_success() {
                    return resp.json::<R>().await.map_err(|e| {
                        EmbeddingError::batch_failed(format!("failed to parse response: {e}"))
                    });
                }

                let text = resp
                    .text()
                    .await
                    .unwrap_or_else(|_| "<body unavailable>".to_string());
                if should_retry(status) && attempt + 1 < MAX_RETRIES {
                    attempt += 1;
                    let delay = retry_backoff(attempt);
                    log::warn!(
                        "Embedding request failed ({status}), retrying in {delay:?} \
                         (attempt {attempt}/{MAX_RETRIES})"
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
                return Err(EmbeddingError::batch_failed(format!(
                    "request failed ({status}): {text}"
                )));
            }
            Err(err) => {
                if is_retryable_error(&err) && attempt + 1 < MAX_RETRIES {
                    attempt += 1;
                    let delay = retry_backoff(attempt);
                    log::warn!(
                        "Embedding request error ({err}), retrying in {delay:?} \
                         (attempt {attempt}/{MAX_RETRIES})"
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
                return Err(EmbeddingError::batch_failed(format!(
                    "request error: {err}"
                )));
            }
        }
    }
}

fn should_retry(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_body() || err.is_request() || err.is_decode()
}

fn retry_backoff(attempt: usize) -> Duration {
    let capped = attempt.min(5) as u32;
    Duration::from_millis(500 * (1 << capped))
}

fn check_dimensions(vectors: &[Vec<f32>], dimension: usize) -> Result<()> {
    for vector in vectors {
        if vector.len() != dimension {
            return Err(EmbeddingError::batch_failed(format!(
                "API returned {}D vector, expected {}D",
                vector.len(),
                dimension
            )));
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    data: Vec<OpenAiData>,
}

#[derive(Debug, Deserialize)]
struct OpenAiData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Serialize)]
struct HuggingFaceRequest<'a> {
    inputs: &'a [String],
    options: HuggingFaceOptions,
}

#[derive(Serialize)]
struct HuggingFaceOptions {
    wait_for_model: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_is_config_error() {
        assert!(matches!(
            OpenAiProvider::new("", "", "text-embedding-3-small", 1536),
            Err(EmbeddingError::InvalidConfig(_))
        ));
        assert!(matches!(
            HuggingFaceProvider::new("  ", "some/model", 384),
            Err(EmbeddingError::InvalidConfig(_))
        ));
    }

    #[test]
    fn backoff_is_bounded() {
        assert_eq!(retry_backoff(1), Duration::from_millis(1000));
        assert_eq!(retry_backoff(2), Duration::from_millis(2000));
        assert_eq!(retry_backoff(10), retry_backoff(5));
    }

    #[test]
    fn retry_statuses() {
        assert!(should_retry(StatusCode::TOO_MANY_REQUESTS));
        assert!(should_retry(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(should_retry(StatusCode::BAD_GATEWAY));
        assert!(!should_retry(StatusCode::UNAUTHORIZED));
        assert!(!should_retry(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn openai_endpoint_is_normalized() {
        let provider =
            OpenAiProvider::new("key", "https://example.com/v1/", "model", 8).unwrap();
        assert_eq!(provider.endpoint, "https://example.com/v1/embeddings");
    }
}
