//! Ask command implementation

use crate::config::Config;
use crate::error::Result;
use crate::generate::GenerationStream;
use crate::pipeline::RetrievalPipeline;
use crate::store::VectorStore;
use futures::StreamExt;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, Serialize)]
pub struct AskResult {
    pub query: String,
    pub answer: String,
}

/// Write fragments to `out` as they arrive and return the full answer
pub async fn stream_answer<W: Write>(mut stream: GenerationStream, out: &mut W) -> Result<String> {
    let mut answer = String::new();
    while let Some(fragment) = stream.next().await {
        out.write_all(fragment.as_bytes())?;
        out.flush()?;
        answer.push_str(&fragment);
    }
    writeln!(out)?;
    Ok(answer)
}

/// Answer one question from a saved store, streaming the answer to `out`
pub async fn cmd_ask<W: Write>(
    config: &Config,
    query: &str,
    store_path: &Path,
    out: &mut W,
) -> Result<AskResult> {
    let store = VectorStore::load(store_path)?;
    let pipeline = RetrievalPipeline::from_config(config)?;

    let stream = pipeline.answer(query, &store).await?;
    let answer = stream_answer(stream, out).await?;

    Ok(AskResult {
        query: query.to_string(),
        answer,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{config_for, mount_chat, mount_embeddings};
    use crate::error::Error;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn saved_store(dir: &TempDir) -> std::path::PathBuf {
        let mut store = VectorStore::new();
        store.add("The sky is blue".to_string(), vec![1.0, 0.0, 0.0], None);
        let path = dir.path().join("chunks.json");
        store.save(&path).unwrap();
        path
    }

    #[tokio::test]
    async fn test_stream_answer_writes_fragments() {
        let stream = GenerationStream::from_fragments(["Blue", ", mostly."]);
        let mut out = Vec::new();
        let answer = stream_answer(stream, &mut out).await.unwrap();

        assert_eq!(answer, "Blue, mostly.");
        assert_eq!(String::from_utf8(out).unwrap(), "Blue, mostly.\n");
    }

    #[tokio::test]
    async fn test_ask_streams_answer() {
        let server = MockServer::start().await;
        mount_embeddings(&server).await;
        mount_chat(&server, &["The sky ", "is blue."]).await;
        let dir = TempDir::new().unwrap();

        let mut out = Vec::new();
        let result = cmd_ask(
            &config_for(&server),
            "what color is the sky",
            &saved_store(&dir),
            &mut out,
        )
        .await
        .unwrap();

        assert_eq!(result.answer, "The sky is blue.");
        assert_eq!(String::from_utf8(out).unwrap(), "The sky is blue.\n");

        let requests = server.received_requests().await.unwrap();
        let chat = requests
            .iter()
            .find(|r| r.url.path() == "/chat/completions")
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&chat.body).unwrap();
        assert_eq!(
            body["messages"][1]["content"],
            "Context: \"The sky is blue\"\n\nQuestion: \"what color is the sky\""
        );
    }

    #[tokio::test]
    async fn test_ask_generation_failure() {
        let server = MockServer::start().await;
        mount_embeddings(&server).await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        let dir = TempDir::new().unwrap();

        let mut out = Vec::new();
        let result = cmd_ask(&config_for(&server), "sky", &saved_store(&dir), &mut out).await;
        assert!(matches!(result, Err(Error::Generation(_))));
        assert!(out.is_empty());
    }
}
