//! Default values for configuration

/// Default API host shared by the embedding and generation backends
pub fn default_api_host() -> String {
    "https://api.predictionguard.com".to_string()
}

/// Default embedding backend URL
pub fn default_embedding_url() -> String {
    std::env::var("RAGCHAIN_EMBEDDING_URL").unwrap_or_else(|_| default_api_host())
}

/// Default embedding model
pub fn default_embedding_model() -> String {
    "bridgetower-large-itm-mlm-itc".to_string()
}

/// Default environment variable holding the API key
pub fn default_api_key_env() -> String {
    "PGKEY".to_string()
}

/// Default batch size for embedding (backend batch limit)
pub fn default_embedding_batch_size() -> usize {
    20
}

/// Default embedding request timeout in seconds
pub fn default_embedding_timeout() -> u64 {
    10
}

/// Default retry count for embedding requests
pub fn default_embedding_retries() -> usize {
    2
}

/// Default generation backend URL
pub fn default_generation_url() -> String {
    std::env::var("RAGCHAIN_GENERATION_URL").unwrap_or_else(|_| default_api_host())
}

/// Default chat model
pub fn default_generation_model() -> String {
    "Hermes-2-Pro-Mistral-7B".to_string()
}

/// Default maximum tokens per answer
pub fn default_generation_max_tokens() -> u32 {
    1000
}

/// Default sampling temperature
pub fn default_generation_temperature() -> f32 {
    0.1
}

/// Default deadline for a streamed answer in seconds
pub fn default_generation_deadline() -> u64 {
    10
}

/// Default capacity of the answer fragment channel
pub fn default_generation_channel_capacity() -> usize {
    1000
}

/// Default window size in whitespace tokens
pub fn default_chunk_window_size() -> usize {
    100
}

/// Default overlap in whitespace tokens
pub fn default_chunk_overlap_size() -> usize {
    10
}

/// Default user agent
pub fn default_fetch_user_agent() -> String {
    format!("ragchain/{} (Document Fetcher)", env!("CARGO_PKG_VERSION"))
}

/// Default fetch timeout in seconds
pub fn default_fetch_timeout() -> u64 {
    30
}
