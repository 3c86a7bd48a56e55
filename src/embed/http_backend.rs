use super::Embedder;
use crate::config::{parse_base_url, EmbeddingConfig};
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Clone, Serialize)]
struct EmbeddingInput {
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct EmbedRequest {
    model: String,
    input: Vec<EmbeddingInput>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum EmbeddingResponse {
    Embeddings { embeddings: Vec<Vec<f64>> },
    Vectors { vectors: Vec<Vec<f64>> },
    Data { data: Vec<EmbeddingData> },
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f64>,
}

impl EmbeddingResponse {
    fn into_embeddings(self) -> Vec<Vec<f64>> {
        match self {
            EmbeddingResponse::Embeddings { embeddings } => embeddings,
            EmbeddingResponse::Vectors { vectors } => vectors,
            EmbeddingResponse::Data { mut data } => {
                // Backends may return items out of order when they carry an index
                if data.iter().all(|d| d.index.is_some()) {
                    data.sort_by_key(|d| d.index);
                }
                data.into_iter().map(|d| d.embedding).collect()
            }
        }
    }
}

/// Embedder backed by an HTTP embeddings endpoint (`POST <url>/embeddings`)
pub struct HttpEmbedder {
    client: Client,
    base_url: Url,
    model_id: String,
    api_key: Option<String>,
    retries: usize,
}

impl HttpEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let base_url = parse_base_url(&config.url)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Embedding(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url,
            model_id: config.model.clone(),
            api_key: config.api_key(),
            retries: config.retries,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Config(format!("Invalid embedding backend URL: {}", e)))
    }

    async fn send_with_retry(&self, request: reqwest::RequestBuilder) -> Result<EmbeddingResponse> {
        let mut last_err: Option<Error> = None;
        for attempt in 0..=self.retries {
            let req = request.try_clone().ok_or_else(|| {
                Error::Embedding("Failed to clone backend request".to_string())
            })?;
            match req.send().await {
                Ok(response) => match response.error_for_status() {
                    Ok(ok) => {
                        return ok
                            .json::<EmbeddingResponse>()
                            .await
                            .map_err(|e| Error::Embedding(format!("Invalid response: {}", e)))
                    }
                    Err(e) => last_err = Some(Error::Embedding(e.to_string())),
                },
                Err(e) => last_err = Some(Error::Embedding(e.to_string())),
            }

            if attempt < self.retries {
                warn!("Embedding request failed (attempt {}), retrying", attempt + 1);
                tokio::time::sleep(Duration::from_millis(200 * (attempt + 1) as u64)).await;
            }
        }

        Err(last_err.unwrap_or_else(|| {
            Error::Embedding("Embedding backend request failed".to_string())
        }))
    }

    async fn request(&self, input: Vec<EmbeddingInput>) -> Result<Vec<Vec<f64>>> {
        let url = self.endpoint("embeddings")?;
        let count = input.len();
        let body = EmbedRequest {
            model: self.model_id.clone(),
            input,
        };

        let mut request = self.client.post(url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        debug!("Requesting {} embeddings from model '{}'", count, self.model_id);
        let embeddings = self.send_with_retry(request).await?.into_embeddings();
        if embeddings.len() != count {
            return Err(Error::Embedding(format!(
                "Expected {} embeddings, got {}",
                count,
                embeddings.len()
            )));
        }
        Ok(embeddings)
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f64>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let input = texts
            .into_iter()
            .map(|text| EmbeddingInput { text, image: None })
            .collect();
        self.request(input).await
    }

    async fn embed_with_image(&self, text: &str, image: Option<&str>) -> Result<Vec<f64>> {
        let input = vec![EmbeddingInput {
            text: text.to_string(),
            image: image.map(str::to_string),
        }];
        self.request(input)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embedding("No embedding returned".to_string()))
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}
