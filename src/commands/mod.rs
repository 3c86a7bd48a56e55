//! CLI commands implementation

pub mod ask;
pub mod chat;
pub mod ingest;
pub mod init;
pub mod search;

pub use ask::*;
pub use chat::*;
pub use ingest::*;
pub use init::*;
pub use search::*;

/// Mock backends shared by the command tests
#[cfg(test)]
pub(crate) mod test_support {
    use crate::config::Config;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

    /// Embeds each input text as `[#"sky", #"grass", 0.5]`
    pub struct KeywordEmbeddings;

    impl Respond for KeywordEmbeddings {
        fn respond(&self, request: &Request) -> ResponseTemplate {
            let body: serde_json::Value = match serde_json::from_slice(&request.body) {
                Ok(body) => body,
                Err(_) => return ResponseTemplate::new(400),
            };
            let data: Vec<serde_json::Value> = body["input"]
                .as_array()
                .map(|inputs| {
                    inputs
                        .iter()
                        .enumerate()
                        .map(|(index, input)| {
                            let text = input["text"].as_str().unwrap_or_default();
                            serde_json::json!({
                                "index": index,
                                "embedding": [
                                    text.matches("sky").count() as f64,
                                    text.matches("grass").count() as f64,
                                    0.5
                                ]
                            })
                        })
                        .collect()
                })
                .unwrap_or_default();
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": data }))
        }
    }

    pub async fn mount_embeddings(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(KeywordEmbeddings)
            .mount(server)
            .await;
    }

    /// Answer every chat completion with the given fragments as SSE
    pub async fn mount_chat(server: &MockServer, fragments: &[&str]) {
        let mut body = String::new();
        for fragment in fragments {
            let event = serde_json::json!({"choices": [{"delta": {"content": fragment}}]});
            body.push_str(&format!("data: {}\n\n", event));
        }
        body.push_str("data: [DONE]\n\n");

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(server)
            .await;
    }

    /// Config pointing both backends at `server`, without API keys
    pub fn config_for(server: &MockServer) -> Config {
        let mut config = Config::default();
        config.embedding.url = server.uri();
        config.embedding.api_key_env = String::new();
        config.embedding.retries = 0;
        config.generation.url = server.uri();
        config.generation.api_key_env = String::new();
        config.chunk.window_size = 5;
        config.chunk.overlap_size = 1;
        config
    }
}
