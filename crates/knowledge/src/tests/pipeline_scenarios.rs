//! End-to-end pipeline behavior over real index artifacts.

use crate::embeddings::providers::TrigramProvider;
use crate::embeddings::EmbeddingProvider;
use crate::rag::{AnswerSynthesizer, AskError, InitFailure, PipelineStatus, RagPipeline, ReadyPipeline, Synthesizer};
use crate::types::{Chunk, IndexedVector, PageRef, ScoredChunk};
use crate::vector_index::VectorIndex;
use mentor_core::{AppConfig, AppError, AppResult};
use mentor_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use mentor_prompt::default_answer_prompt;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoSynthesizer;

    #[async_trait::async_trait]
    impl Synthesizer for EchoSynthesizer {
        async fn synthesize(&self, query: &str, _chunks: &[ScoredChunk]) -> AppResult<String> {
            Ok(format!("Echo: {}", query))
        }
    }

    #[derive(Default)]
    struct RecordingClient {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl LlmClient for RecordingClient {
        fn provider_name(&self) -> &str {
            "recording"
        }

        async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
            self.prompts.lock().push(request.prompt.clone());
            Ok(LlmResponse {
                content: "Sirva primeiro.".to_string(),
                model: request.model.clone(),
                usage: LlmUsage::new(10, 3),
            })
        }
    }

    struct BrokenBackend;

    #[async_trait::async_trait]
    impl LlmClient for BrokenBackend {
        fn provider_name(&self) -> &str {
            "broken"
        }

        async fn complete(&self, _request: &LlmRequest) -> AppResult<LlmResponse> {
            Err(AppError::Llm("LLM API error (500): backend exploded".to_string()))
        }
    }

    fn trigram() -> Arc<dyn EmbeddingProvider> {
        Arc::new(TrigramProvider::new(384))
    }

    async fn write_index(dir: &Path, chunks: Vec<Chunk>) -> VectorIndex {
        let embedder = trigram();
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = embedder.embed_batch(&texts).await.unwrap();
        let entries = vectors
            .into_iter()
            .zip(chunks)
            .map(|(vector, chunk)| IndexedVector { vector, chunk })
            .collect();

        let index = VectorIndex::from_entries(embedder, entries).unwrap();
        index.save(dir).unwrap();
        VectorIndex::load(dir, trigram()).unwrap()
    }

    fn book_chunks() -> Vec<Chunk> {
        [
            "Liderança servidora começa por ouvir a equipe.",
            "Pequenos hábitos diários se acumulam em grandes resultados.",
            "A vulnerabilidade é a origem da coragem.",
            "Foque no que está sob seu controle.",
            "Delegar exige confiança e clareza de expectativas.",
            "A disciplina é a ponte entre metas e conquistas.",
            "Negociar é entender o que o outro realmente quer.",
            "Inovar exige tolerar falhas pequenas e rápidas.",
        ]
        .iter()
        .enumerate()
        .map(|(i, text)| {
            Chunk::new(*text)
                .with_page(PageRef::Number(i as i64 + 1))
                .with_author("Autor")
                .with_book_title("Livro")
        })
        .collect()
    }

    fn config_for(index_path: &Path) -> AppConfig {
        let mut config = AppConfig::default();
        config.index_path = index_path.to_path_buf();
        config.llm.provider = "ollama".to_string();
        config.llm.model = "llama3".to_string();
        config
    }

    #[tokio::test]
    async fn test_missing_index_leaves_pipeline_not_initialized() {
        let temp = TempDir::new().unwrap();
        let pipeline = RagPipeline::new(config_for(&temp.path().join("faiss_index_multi_author")));

        let status = pipeline.initialize().await;
        match status {
            PipelineStatus::Failed(InitFailure::MissingIndexArtifacts { missing, .. }) => {
                assert_eq!(missing.len(), 1)
            }
            other => panic!("unexpected status: {:?}", other),
        }

        let err = pipeline.ask("Oi").await.unwrap_err();
        assert_eq!(err, AskError::NotInitialized);
        assert!(err.to_string().contains("não inicializado"));
    }

    #[tokio::test]
    async fn test_ask_before_initialize_is_not_initialized() {
        let pipeline = RagPipeline::new(AppConfig::default());
        for query in ["Oi", "", "Como liderar?"] {
            assert_eq!(pipeline.ask(query).await.unwrap_err(), AskError::NotInitialized);
        }
    }

    #[tokio::test]
    async fn test_empty_index_with_echo_synthesizer() {
        let pipeline = RagPipeline::new(AppConfig::default());
        pipeline.install(ReadyPipeline::new(
            Arc::new(VectorIndex::empty(trigram())),
            Arc::new(EchoSynthesizer),
            5,
        ));

        let answer = pipeline.ask("Teste").await.unwrap();
        assert_eq!(answer.answer, "Echo: Teste");
        assert!(answer.sources.is_empty());
    }

    #[tokio::test]
    async fn test_backend_failure_is_internal_error() {
        let temp = TempDir::new().unwrap();
        let index = write_index(temp.path(), book_chunks()).await;

        let synthesizer =
            AnswerSynthesizer::new(Arc::new(BrokenBackend), default_answer_prompt().unwrap(), "m");
        let pipeline = RagPipeline::new(config_for(temp.path()));
        pipeline.install(ReadyPipeline::new(Arc::new(index), Arc::new(synthesizer), 5));

        let err = pipeline.ask("Como ter coragem?").await.unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("Ocorreu um erro interno"));
        assert!(message.contains("backend exploded"));
        assert!(matches!(
            err,
            AskError::Internal {
                cause: crate::rag::InternalCause::Backend,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_initialize_loads_index_and_round_trips_metadata() {
        let temp = TempDir::new().unwrap();
        let chunk = Chunk::new("Hábitos atômicos mudam identidades.")
            .with_author("A")
            .with_book_title("B")
            .with_page(PageRef::Number(3));
        write_index(temp.path(), vec![chunk]).await;

        let pipeline = RagPipeline::new(config_for(temp.path()));
        assert_eq!(pipeline.initialize().await, PipelineStatus::Ready { chunks: 1 });

        let index = VectorIndex::load(temp.path(), trigram()).unwrap();
        pipeline.install(ReadyPipeline::new(Arc::new(index), Arc::new(EchoSynthesizer), 5));

        let answer = pipeline.ask("hábitos").await.unwrap();
        let source = &answer.sources[0];
        assert_eq!(source.author.as_deref(), Some("A"));
        assert_eq!(source.book_title.as_deref(), Some("B"));
        assert_eq!(source.page, PageRef::Number(3));
    }

    #[tokio::test]
    async fn test_sources_bounded_by_top_k() {
        let temp = TempDir::new().unwrap();
        let index = write_index(temp.path(), book_chunks()).await;

        let pipeline = RagPipeline::new(config_for(temp.path()));
        pipeline.install(ReadyPipeline::new(Arc::new(index), Arc::new(EchoSynthesizer), 3));

        let answer = pipeline.ask("disciplina e hábitos").await.unwrap();
        assert_eq!(answer.sources.len(), 3);
    }

    #[tokio::test]
    async fn test_retrieved_text_reaches_the_prompt() {
        let temp = TempDir::new().unwrap();
        let index = write_index(temp.path(), book_chunks()).await;

        let client = Arc::new(RecordingClient::default());
        let synthesizer =
            AnswerSynthesizer::new(client.clone(), default_answer_prompt().unwrap(), "m");
        let pipeline = RagPipeline::new(config_for(temp.path()));
        pipeline.install(ReadyPipeline::new(Arc::new(index), Arc::new(synthesizer), 2));

        let answer = pipeline
            .ask("Como a vulnerabilidade gera coragem?")
            .await
            .unwrap();
        assert_eq!(answer.answer, "Sirva primeiro.");

        let prompts = client.prompts.lock();
        assert_eq!(prompts.len(), 1);
        for source in &answer.sources {
            assert!(prompts[0].contains(&source.content));
        }
        assert!(prompts[0].contains("A vulnerabilidade é a origem da coragem."));
    }

    #[tokio::test]
    async fn test_index_from_other_model_fails_to_load() {
        let temp = TempDir::new().unwrap();
        write_index(temp.path(), book_chunks()).await;

        let mut config = config_for(temp.path());
        config.embedding.dimensions = 128;

        let status = RagPipeline::new(config).initialize().await;
        assert!(matches!(
            status,
            PipelineStatus::Failed(InitFailure::IndexLoadFailure(_))
        ));
    }

    #[tokio::test]
    async fn test_hosted_llm_without_key_fails_configuration() {
        let temp = TempDir::new().unwrap();
        write_index(temp.path(), book_chunks()).await;

        let mut config = config_for(temp.path());
        config.llm.provider = "openrouter".to_string();
        config.llm.api_key = None;

        let status = RagPipeline::new(config).initialize().await;
        assert!(matches!(
            status,
            PipelineStatus::Failed(InitFailure::LlmConfiguration(_))
        ));
    }

    #[tokio::test]
    async fn test_zero_top_k_never_reaches_ready() {
        let temp = TempDir::new().unwrap();
        write_index(temp.path(), book_chunks()).await;

        let mut config = config_for(temp.path());
        config.retrieval.top_k = 0;

        let pipeline = RagPipeline::new(config);
        let status = pipeline.initialize().await;
        match status {
            PipelineStatus::Failed(InitFailure::InvalidConfiguration(message)) => {
                assert!(message.contains("top_k"))
            }
            other => panic!("unexpected status: {:?}", other),
        }
        assert_eq!(pipeline.ask("Oi").await.unwrap_err(), AskError::NotInitialized);
    }

    #[tokio::test]
    async fn test_concurrent_asks_share_pipeline() {
        let temp = TempDir::new().unwrap();
        let index = write_index(temp.path(), book_chunks()).await;

        let pipeline = Arc::new(RagPipeline::new(config_for(temp.path())));
        pipeline.install(ReadyPipeline::new(Arc::new(index), Arc::new(EchoSynthesizer), 5));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let pipeline = pipeline.clone();
                tokio::spawn(async move { pipeline.ask(&format!("pergunta {}", i)).await })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            let answer = handle.await.unwrap().unwrap();
            assert_eq!(answer.answer, format!("Echo: pergunta {}", i));
        }
    }
}
