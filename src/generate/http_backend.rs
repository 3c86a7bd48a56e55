use super::{spawn_producer, ChatMessage, FragmentSender, GenerationRequest, GenerationStream, Generator};
use crate::config::{parse_base_url, GenerationConfig};
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Clone, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Option<ChunkContent>,
    #[serde(default)]
    message: Option<ChunkContent>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChunkContent {
    #[serde(default)]
    content: Option<String>,
}

impl ChatChunk {
    fn into_text(self) -> String {
        self.choices
            .into_iter()
            .filter_map(|choice| {
                choice
                    .delta
                    .and_then(|d| d.content)
                    .or_else(|| choice.message.and_then(|m| m.content))
                    .or(choice.text)
            })
            .collect()
    }
}

/// One parsed server-sent event line
#[derive(Debug, PartialEq)]
enum SseLine {
    Fragment(String),
    Done,
    Skip,
}

fn parse_sse_line(line: &str) -> SseLine {
    let line = line.trim_end_matches('\r');
    let Some(data) = line.strip_prefix("data:") else {
        // Comments, `event:`/`id:` fields and blank separators
        return SseLine::Skip;
    };
    let data = data.trim_start();

    if data == "[DONE]" {
        return SseLine::Done;
    }

    match serde_json::from_str::<ChatChunk>(data) {
        Ok(chunk) => {
            let text = chunk.into_text();
            if text.is_empty() {
                SseLine::Skip
            } else {
                SseLine::Fragment(text)
            }
        }
        Err(e) => {
            debug!("Skipping unparseable event data: {}", e);
            SseLine::Skip
        }
    }
}

/// Read the SSE body and forward fragments until `[DONE]`, the end of the
/// body, a transport error, or the consumer going away
async fn pump_events(mut response: reqwest::Response, sender: FragmentSender) {
    let mut buffer: Vec<u8> = Vec::new();

    loop {
        let bytes = match response.chunk().await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => break,
            Err(e) => {
                warn!("Answer stream interrupted: {}", e);
                return;
            }
        };
        buffer.extend_from_slice(&bytes);

        while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line[..line.len() - 1]);
            match parse_sse_line(&line) {
                SseLine::Fragment(text) => {
                    if !sender.send(text).await {
                        return;
                    }
                }
                SseLine::Done => return,
                SseLine::Skip => {}
            }
        }
    }

    // Trailing line without a newline
    if let SseLine::Fragment(text) = parse_sse_line(&String::from_utf8_lossy(&buffer)) {
        sender.send(text).await;
    }
}

fn timed_out() -> Error {
    Error::Generation("Timed out waiting for the backend".to_string())
}

/// Generator backed by an OpenAI-style chat completion endpoint
/// (`POST <url>/chat/completions` with `stream: true`)
pub struct HttpGenerator {
    client: Client,
    base_url: Url,
    model_id: String,
    api_key: Option<String>,
    deadline: Duration,
    channel_capacity: usize,
}

impl HttpGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let base_url = parse_base_url(&config.url)?;
        let client = Client::builder()
            .build()
            .map_err(|e| Error::Generation(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url,
            model_id: config.model.clone(),
            api_key: config.api_key(),
            deadline: config.deadline(),
            channel_capacity: config.channel_capacity,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Config(format!("Invalid generation backend URL: {}", e)))
    }
}

#[async_trait]
impl Generator for HttpGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationStream> {
        let url = self.endpoint("chat/completions")?;
        let body = ChatRequest {
            model: &self.model_id,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: true,
        };

        let mut builder = self
            .client
            .post(url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        debug!(
            "Requesting completion from model '{}' ({} messages)",
            self.model_id,
            request.messages.len()
        );

        // One deadline covers the request, the body and the stream
        let deadline_at = Instant::now() + self.deadline;
        let response = timeout_at(deadline_at, builder.send())
            .await
            .map_err(|_| timed_out())?
            .map_err(|e| Error::Generation(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = timeout_at(deadline_at, response.text())
                .await
                .ok()
                .and_then(|body| body.ok())
                .unwrap_or_default();
            return Err(Error::Generation(format!("HTTP {}: {}", status, detail.trim())));
        }

        let is_event_stream = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/event-stream"));

        if !is_event_stream {
            // Backend ignored `stream: true` and answered in one piece
            let chunk: ChatChunk = timeout_at(deadline_at, response.json())
                .await
                .map_err(|_| timed_out())?
                .map_err(|e| Error::Generation(format!("Invalid response: {}", e)))?;
            return Ok(GenerationStream::from_fragments([chunk.into_text()]));
        }

        Ok(spawn_producer(
            self.channel_capacity,
            deadline_at,
            move |sender| pump_events(response, sender),
        ))
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}
