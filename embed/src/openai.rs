use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EmbedConfig;
use crate::embed::Embedder;
use crate::error::EmbedError;

pub const MODEL_OPENAI_3_SMALL: &str = "text-embedding-3-small";
pub const MODEL_OPENAI_3_LARGE: &str = "text-embedding-3-large";

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OPENAI_MAX_BATCH: usize = 2048;
const OPENAI_DEFAULT_DIM: usize = 1536;

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    dimensions: usize,
    encoding_format: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f64>,
}

/// Embedder for the OpenAI `/embeddings` endpoint and compatible providers.
pub struct OpenAI {
    client: Client,
    api_key: String,
    model: String,
    dim: usize,
    base_url: String,
}

impl OpenAI {
    pub fn new(cfg: EmbedConfig) -> Result<Self, EmbedError> {
        if cfg.api_key.is_empty() {
            return Err(EmbedError::MissingApiKey);
        }
        let mut builder = Client::builder();
        if let Some(t) = cfg.timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build().map_err(|e| EmbedError::Api(e.to_string()))?;

        Ok(Self {
            client,
            api_key: cfg.api_key,
            model: non_empty(cfg.model, MODEL_OPENAI_3_SMALL),
            dim: if cfg.dimension == 0 {
                OPENAI_DEFAULT_DIM
            } else {
                cfg.dimension
            },
            base_url: non_empty(cfg.base_url, OPENAI_BASE_URL),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn call_api(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let url = format!("{}/embeddings", self.base_url);
        let body = EmbeddingRequest {
            model: &self.model,
            input: texts,
            dimensions: self.dim,
            encoding_format: "float",
        };

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EmbedError::Api(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(EmbedError::Api(format!("HTTP {status}: {body}")));
        }

        let data: EmbeddingResponse = resp
            .json()
            .await
            .map_err(|e| EmbedError::Api(e.to_string()))?;
        debug!(inputs = texts.len(), model = %self.model, "embed: batch embedded");
        assemble(data.data, texts.len())
    }
}

fn non_empty(value: String, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value
    }
}

/// Place response items by their `index`; the provider may reorder them.
fn assemble(items: Vec<EmbeddingData>, expected: usize) -> Result<Vec<Vec<f32>>, EmbedError> {
    let mut vecs: Vec<Option<Vec<f32>>> = vec![None; expected];
    for item in items {
        let slot = vecs.get_mut(item.index).ok_or(EmbedError::UnexpectedIndex {
            index: item.index,
            batch_size: expected,
        })?;
        *slot = Some(item.embedding.iter().map(|&v| v as f32).collect());
    }
    vecs.into_iter()
        .enumerate()
        .map(|(i, v)| v.ok_or(EmbedError::MissingIndex(i)))
        .collect()
}

#[async_trait::async_trait]
impl Embedder for OpenAI {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        if text.is_empty() {
            return Err(EmbedError::EmptyInput);
        }
        self.embed_batch(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or(EmbedError::MissingIndex(0))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Err(EmbedError::EmptyInput);
        }
        let mut result = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(OPENAI_MAX_BATCH) {
            result.extend(self.call_api(chunk).await?);
        }
        Ok(result)
    }

    fn dimension(&self) -> usize {
        self.dim
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(index: usize, v: f64) -> EmbeddingData {
        EmbeddingData {
            index,
            embedding: vec![v, v],
        }
    }

    #[test]
    fn test_assemble_reorders_by_index() {
        let out = assemble(vec![item(1, 2.0), item(0, 1.0)], 2).unwrap();
        assert_eq!(out, vec![vec![1.0, 1.0], vec![2.0, 2.0]]);
    }

    #[test]
    fn test_assemble_rejects_gaps_and_overflow() {
        assert!(matches!(
            assemble(vec![item(0, 1.0)], 2),
            Err(EmbedError::MissingIndex(1))
        ));
        assert!(matches!(
            assemble(vec![item(5, 1.0)], 2),
            Err(EmbedError::UnexpectedIndex { index: 5, .. })
        ));
    }

    #[test]
    fn test_response_parses() {
        let raw = r#"{"object":"list","data":[{"object":"embedding","index":0,"embedding":[0.5,-0.25]}],"model":"m"}"#;
        let resp: EmbeddingResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(assemble(resp.data, 1).unwrap(), vec![vec![0.5, -0.25]]);
    }

    #[test]
    fn test_config_defaults() {
        assert!(matches!(OpenAI::new(EmbedConfig::default()), Err(EmbedError::MissingApiKey)));

        let e = OpenAI::new(EmbedConfig::new("sk-test")).unwrap();
        assert_eq!(e.dimension(), OPENAI_DEFAULT_DIM);
        assert_eq!(e.model(), MODEL_OPENAI_3_SMALL);

        let e = OpenAI::new(
            EmbedConfig::new("sk-test")
                .with_model(MODEL_OPENAI_3_LARGE)
                .with_dimension(256)
                .with_base_url("http://localhost:8080/v1/"),
        )
        .unwrap();
        assert_eq!(e.dimension(), 256);
        assert_eq!(e.base_url, "http://localhost:8080/v1");
    }

    #[tokio::test]
    async fn test_empty_input_rejected() {
        let e = OpenAI::new(EmbedConfig::new("sk-test")).unwrap();
        assert!(matches!(e.embed("").await, Err(EmbedError::EmptyInput)));
        assert!(matches!(e.embed_batch(&[]).await, Err(EmbedError::EmptyInput)));
    }
}
