//! Retrieval-augmented answering
//!
//! [`RetrievalPipeline`] wires the collaborators together:
//! - ingestion: load source → chunk → embed in batches → [`VectorStore`]
//! - answering: embed query → best match → grounding prompt → generation
//!
//! Progress is reported to a [`PipelineObserver`] at the start and end of
//! each ingestion and query.

mod observer;

pub use observer::*;

use crate::chunk::Chunker;
use crate::config::{
    default_embedding_batch_size, default_generation_max_tokens, default_generation_temperature,
    Config,
};
use crate::embed::{create_embedder, embed_in_batches, embed_one, Embedder};
use crate::error::Result;
use crate::fetch::{DocumentLoader, SourceLoader};
use crate::generate::{create_generator, GenerationRequest, GenerationStream, Generator};
use crate::prompt::grounded_messages;
use crate::similarity::best_match;
use crate::store::VectorStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Label reported to the observer for [`RetrievalPipeline::ingest_text`]
const INLINE_SOURCE: &str = "<inline text>";

/// The chunk selected as context for a query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Retrieval {
    pub chunk_id: usize,
    pub score: f64,
    pub text: String,
    pub metadata: String,
}

pub struct RetrievalPipeline {
    loader: Arc<dyn DocumentLoader>,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    observer: Arc<dyn PipelineObserver>,
    chunker: Chunker,
    batch_size: usize,
    max_tokens: u32,
    temperature: f32,
}

impl RetrievalPipeline {
    pub fn new(
        loader: Arc<dyn DocumentLoader>,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        chunker: Chunker,
    ) -> Self {
        Self {
            loader,
            embedder,
            generator,
            observer: Arc::new(TracingObserver),
            chunker,
            batch_size: default_embedding_batch_size(),
            max_tokens: default_generation_max_tokens(),
            temperature: default_generation_temperature(),
        }
    }

    /// Build a pipeline with the HTTP-backed collaborators described by `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        let loader = Arc::new(SourceLoader::new(&config.fetch)?);
        let embedder: Arc<dyn Embedder> = Arc::from(create_embedder(&config.embedding)?);
        let generator: Arc<dyn Generator> = Arc::from(create_generator(&config.generation)?);
        let chunker = Chunker::new(config.chunk)?;

        Ok(Self::new(loader, embedder, generator, chunker)
            .with_batch_size(config.embedding.batch_size)
            .with_generation_params(config.generation.max_tokens, config.generation.temperature))
    }

    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_generation_params(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }

    pub fn chunker(&self) -> &Chunker {
        &self.chunker
    }

    /// Load `source`, chunk it and embed every chunk into a new store.
    ///
    /// Any failure discards the partially built store.
    pub async fn ingest(&self, source: &str) -> Result<VectorStore> {
        self.observer.ingest_started(source);
        let result = match self.loader.load(source).await {
            Ok(text) => self.build_store(&text).await,
            Err(e) => Err(e),
        };
        self.observer
            .ingest_finished(source, result.as_ref().map(VectorStore::len));
        result
    }

    /// Same as [`Self::ingest`] for text that is already loaded
    pub async fn ingest_text(&self, text: &str) -> Result<VectorStore> {
        self.observer.ingest_started(INLINE_SOURCE);
        let result = self.build_store(text).await;
        self.observer
            .ingest_finished(INLINE_SOURCE, result.as_ref().map(VectorStore::len));
        result
    }

    async fn build_store(&self, text: &str) -> Result<VectorStore> {
        let chunks = self.chunker.split(text);
        debug!(
            "Split text into {} chunks (window {}, overlap {})",
            chunks.len(),
            self.chunker.config().window_size,
            self.chunker.config().overlap_size
        );

        let vectors = embed_in_batches(self.embedder.as_ref(), chunks.clone(), self.batch_size).await?;

        let mut store = VectorStore::new();
        for (chunk, vector) in chunks.into_iter().zip(vectors) {
            store.add(chunk, vector, None);
        }
        Ok(store)
    }

    /// Find the chunk that best matches `query`, without generating
    pub async fn retrieve(&self, query: &str, store: &VectorStore) -> Result<Option<Retrieval>> {
        self.observer.query_started(query);
        let result = self.find_context(query, store).await;
        self.observer.query_finished(
            query,
            result.as_ref().map(|found| found.as_ref().map(|r| r.score)),
        );
        result
    }

    /// Answer `query` from the best-matching chunk of `store`.
    ///
    /// When nothing matches, the model still runs with an empty context and
    /// is instructed to give the fallback answer. The query is reported as
    /// finished once the returned stream ends or is dropped.
    pub async fn answer(&self, query: &str, store: &VectorStore) -> Result<GenerationStream> {
        self.observer.query_started(query);
        match self.grounded_answer(query, store).await {
            Ok((score, stream)) => {
                let observer = Arc::clone(&self.observer);
                let query = query.to_string();
                Ok(stream.on_finish(move || observer.query_finished(&query, Ok(score))))
            }
            Err(e) => {
                self.observer.query_finished(query, Err(&e));
                Err(e)
            }
        }
    }

    async fn grounded_answer(
        &self,
        query: &str,
        store: &VectorStore,
    ) -> Result<(Option<f64>, GenerationStream)> {
        let found = self.find_context(query, store).await?;
        let context = found.as_ref().map(|r| r.text.as_str()).unwrap_or_default();

        let request = GenerationRequest {
            messages: grounded_messages(context, query),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };
        let stream = self.generator.generate(request).await?;
        Ok((found.map(|r| r.score), stream))
    }

    async fn find_context(&self, query: &str, store: &VectorStore) -> Result<Option<Retrieval>> {
        let query_vector = embed_one(self.embedder.as_ref(), query).await?;
        let found = best_match(store, &query_vector)?.map(|scored| Retrieval {
            chunk_id: scored.chunk.id,
            score: scored.score,
            text: scored.chunk.text.clone(),
            metadata: scored.chunk.metadata.clone(),
        });

        match &found {
            Some(r) => debug!("Best match: chunk {} (score {:.4})", r.chunk_id, r.score),
            None => debug!("No chunk scored above the similarity floor"),
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChunkConfig;
    use crate::error::Error;
    use crate::generate::Role;
    use crate::prompt::FALLBACK_ANSWER;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct StaticLoader(std::result::Result<&'static str, &'static str>);

    #[async_trait]
    impl DocumentLoader for StaticLoader {
        async fn load(&self, _source: &str) -> Result<String> {
            self.0
                .map(str::to_string)
                .map_err(|e| Error::Fetch(e.to_string()))
        }
    }

    /// Maps each text to `[#"sky", #"grass", 0.5]` and records batch sizes.
    /// Fails on the batch numbered `fail_on_batch` when set.
    struct KeywordEmbedder {
        batches: Mutex<Vec<usize>>,
        fail_on_batch: Option<usize>,
        query_vector: Option<Vec<f64>>,
    }

    impl KeywordEmbedder {
        fn new() -> Self {
            Self {
                batches: Mutex::new(Vec::new()),
                fail_on_batch: None,
                query_vector: None,
            }
        }
    }

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f64>>> {
            let mut batches = self.batches.lock().unwrap();
            if self.fail_on_batch == Some(batches.len()) {
                return Err(Error::Embedding("backend unavailable".to_string()));
            }
            batches.push(texts.len());

            Ok(texts
                .iter()
                .map(|t| match (&self.query_vector, t.starts_with('?')) {
                    (Some(v), true) => v.clone(),
                    _ => vec![
                        t.matches("sky").count() as f64,
                        t.matches("grass").count() as f64,
                        0.5,
                    ],
                })
                .collect())
        }

        fn model_name(&self) -> &str {
            "keyword"
        }
    }

    struct RecordingGenerator {
        requests: Mutex<Vec<GenerationRequest>>,
        fail: bool,
    }

    impl RecordingGenerator {
        fn new() -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                fail: false,
            }
        }

        fn last_user_message(&self) -> String {
            let requests = self.requests.lock().unwrap();
            let request = requests.last().expect("no generation request");
            assert_eq!(request.messages[1].role, Role::User);
            request.messages[1].content.clone()
        }
    }

    #[async_trait]
    impl Generator for RecordingGenerator {
        async fn generate(&self, request: GenerationRequest) -> Result<GenerationStream> {
            self.requests.lock().unwrap().push(request);
            if self.fail {
                return Err(Error::Generation("model overloaded".to_string()));
            }
            Ok(GenerationStream::from_fragments(["The sky ", "is blue."]))
        }

        fn model_name(&self) -> &str {
            "recording"
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        events: Mutex<Vec<String>>,
    }

    impl PipelineObserver for RecordingObserver {
        fn ingest_started(&self, source: &str) {
            self.events.lock().unwrap().push(format!("ingest_started {}", source));
        }

        fn ingest_finished(&self, source: &str, outcome: std::result::Result<usize, &Error>) {
            let outcome = match outcome {
                Ok(n) => n.to_string(),
                Err(_) => "error".to_string(),
            };
            self.events
                .lock()
                .unwrap()
                .push(format!("ingest_finished {} {}", source, outcome));
        }

        fn query_started(&self, query: &str) {
            self.events.lock().unwrap().push(format!("query_started {}", query));
        }

        fn query_finished(&self, query: &str, outcome: std::result::Result<Option<f64>, &Error>) {
            let outcome = match outcome {
                Ok(Some(_)) => "match",
                Ok(None) => "no match",
                Err(_) => "error",
            };
            self.events
                .lock()
                .unwrap()
                .push(format!("query_finished {} {}", query, outcome));
        }
    }

    fn pipeline(
        loader: StaticLoader,
        embedder: Arc<KeywordEmbedder>,
        generator: Arc<RecordingGenerator>,
        window_size: usize,
        overlap_size: usize,
    ) -> RetrievalPipeline {
        let chunker = Chunker::new(ChunkConfig {
            window_size,
            overlap_size,
        })
        .unwrap();
        RetrievalPipeline::new(Arc::new(loader), embedder, generator, chunker)
    }

    fn sky_and_grass_store() -> VectorStore {
        let mut store = VectorStore::new();
        store.add("The sky is blue".to_string(), vec![1.0, 0.0], None);
        store.add("Grass is green".to_string(), vec![0.0, 1.0], None);
        store
    }

    #[tokio::test]
    async fn test_ingest_embeds_chunks_in_batches_and_order() {
        let embedder = Arc::new(KeywordEmbedder::new());
        let pipeline = pipeline(
            StaticLoader(Ok("a b c d e f g h")),
            embedder.clone(),
            Arc::new(RecordingGenerator::new()),
            4,
            1,
        )
        .with_batch_size(2);

        let store = pipeline.ingest("doc.txt").await.unwrap();

        assert_eq!(*embedder.batches.lock().unwrap(), vec![2, 1]);
        let texts: Vec<&str> = store.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["a b c d", "d e f g", "g h"]);
        let ids: Vec<usize> = store.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(store.get(1).unwrap().metadata, "d e f g");
    }

    #[tokio::test]
    async fn test_ingest_failure_discards_store() {
        let embedder = Arc::new(KeywordEmbedder {
            fail_on_batch: Some(1),
            ..KeywordEmbedder::new()
        });
        let observer = Arc::new(RecordingObserver::default());
        let pipeline = pipeline(
            StaticLoader(Ok("a b c d e f g h")),
            embedder,
            Arc::new(RecordingGenerator::new()),
            4,
            1,
        )
        .with_batch_size(2)
        .with_observer(observer.clone());

        let result = pipeline.ingest("doc.txt").await;
        assert!(matches!(result, Err(Error::Embedding(_))));
        assert_eq!(
            *observer.events.lock().unwrap(),
            vec!["ingest_started doc.txt", "ingest_finished doc.txt error"]
        );
    }

    #[tokio::test]
    async fn test_ingest_loader_failure() {
        let pipeline = pipeline(
            StaticLoader(Err("HTTP 404")),
            Arc::new(KeywordEmbedder::new()),
            Arc::new(RecordingGenerator::new()),
            4,
            1,
        );
        assert!(matches!(
            pipeline.ingest("https://example.com").await,
            Err(Error::Fetch(_))
        ));
    }

    #[tokio::test]
    async fn test_ingest_empty_text_gives_empty_store() {
        let embedder = Arc::new(KeywordEmbedder::new());
        let pipeline = pipeline(
            StaticLoader(Ok("")),
            embedder.clone(),
            Arc::new(RecordingGenerator::new()),
            4,
            1,
        );

        let store = pipeline.ingest_text("   ").await.unwrap();
        assert!(store.is_empty());
        assert!(embedder.batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_answer_grounds_prompt_in_best_chunk() {
        let embedder = Arc::new(KeywordEmbedder::new());
        let generator = Arc::new(RecordingGenerator::new());
        let pipeline = pipeline(StaticLoader(Ok("")), embedder, generator.clone(), 4, 1)
            .with_generation_params(256, 0.3);
        let store = sky_and_grass_store();

        let stream = pipeline
            .answer("what color is the sky", &store)
            .await
            .unwrap();
        assert_eq!(stream.collect_text().await, "The sky is blue.");

        assert_eq!(
            generator.last_user_message(),
            "Context: \"The sky is blue\"\n\nQuestion: \"what color is the sky\""
        );
        let requests = generator.requests.lock().unwrap();
        assert_eq!(requests[0].max_tokens, 256);
        assert_eq!(requests[0].temperature, 0.3);
        assert_eq!(requests[0].messages[0].role, Role::System);
        assert!(requests[0].messages[0].content.contains(FALLBACK_ANSWER));
    }

    #[tokio::test]
    async fn test_answer_with_no_positive_match_uses_empty_context() {
        let embedder = Arc::new(KeywordEmbedder {
            query_vector: Some(vec![-1.0, -1.0]),
            ..KeywordEmbedder::new()
        });
        let generator = Arc::new(RecordingGenerator::new());
        let pipeline = pipeline(StaticLoader(Ok("")), embedder, generator.clone(), 4, 1);
        let store = sky_and_grass_store();

        assert!(pipeline.retrieve("?", &store).await.unwrap().is_none());

        pipeline.answer("?", &store).await.unwrap();
        assert_eq!(
            generator.last_user_message(),
            "Context: \"\"\n\nQuestion: \"?\""
        );
    }

    #[tokio::test]
    async fn test_retrieve() {
        let pipeline = pipeline(
            StaticLoader(Ok("")),
            Arc::new(KeywordEmbedder::new()),
            Arc::new(RecordingGenerator::new()),
            4,
            1,
        );
        let store = sky_and_grass_store();

        let found = pipeline.retrieve("green grass", &store).await.unwrap().unwrap();
        assert_eq!(found.chunk_id, 1);
        assert_eq!(found.text, "Grass is green");
        assert!(found.score > 0.0);

        assert!(pipeline
            .retrieve("green grass", &VectorStore::new())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_zero_query_vector_aborts_query() {
        let embedder = Arc::new(KeywordEmbedder {
            query_vector: Some(vec![0.0, 0.0]),
            ..KeywordEmbedder::new()
        });
        let generator = Arc::new(RecordingGenerator::new());
        let pipeline = pipeline(StaticLoader(Ok("")), embedder, generator.clone(), 4, 1);

        assert!(matches!(
            pipeline.answer("?", &sky_and_grass_store()).await,
            Err(Error::ZeroMagnitudeVector)
        ));
        assert!(generator.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_query_leaves_store_usable() {
        let generator = Arc::new(RecordingGenerator {
            fail: true,
            ..RecordingGenerator::new()
        });
        let pipeline = pipeline(
            StaticLoader(Ok("")),
            Arc::new(KeywordEmbedder::new()),
            generator,
            4,
            1,
        );
        let store = sky_and_grass_store();

        assert!(matches!(
            pipeline.answer("sky", &store).await,
            Err(Error::Generation(_))
        ));
        assert_eq!(store.len(), 2);
        assert!(pipeline.retrieve("sky", &store).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_observer_sees_ingest_and_query_boundaries() {
        let observer = Arc::new(RecordingObserver::default());
        let pipeline = pipeline(
            StaticLoader(Ok("the sky is blue and the grass is green")),
            Arc::new(KeywordEmbedder::new()),
            Arc::new(RecordingGenerator::new()),
            5,
            1,
        )
        .with_observer(observer.clone());

        let store = pipeline.ingest("notes.txt").await.unwrap();
        let mut stream = pipeline.answer("sky", &store).await.unwrap();
        assert_eq!(
            observer.events.lock().unwrap().last().map(String::as_str),
            Some("query_started sky")
        );
        while stream.next_fragment().await.is_some() {}

        assert_eq!(
            *observer.events.lock().unwrap(),
            vec![
                "ingest_started notes.txt",
                "ingest_finished notes.txt 2",
                "query_started sky",
                "query_finished sky match",
            ]
        );
    }
}
