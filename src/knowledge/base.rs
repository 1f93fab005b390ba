//! Knowledge Base - 업로드/삭제/질의 facade
//!
//! 저장소, 인덱스, 워커, 검색기, 생성기를 묶어 문서 관리와 질의응답
//! 연산을 제공합니다. 모든 구성 요소는 명시적으로 생성되어 주입됩니다.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::broadcast;

use crate::config::RagConfig;
use crate::embedding::{EmbeddingProvider, HashEmbedding};
use crate::error::{RagError, Result};
use crate::extractor::is_supported;
use crate::generation::{GeminiGenerator, TextGenerator};
use crate::knowledge::chunker::{ChunkConfig, WordWindowChunker};
use crate::knowledge::pipeline::IngestionPipeline;
use crate::knowledge::repository::{
    ChatExchange, Chunk, Document, DocumentId, DocumentRepository, MemoryRepository,
    NewChatExchange, NewDocument,
};
use crate::knowledge::retrieval::{RetrievalOrchestrator, RetrievalResult};
use crate::knowledge::uploads::{ByteStore, FsByteStore, MemoryByteStore};
use crate::knowledge::vector::{LinearScanIndex, VectorIndex};
use crate::knowledge::worker::{IngestEvent, IngestHandle, IngestionWorker};

/// 업로드 요청
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub original_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// 지식 베이스
pub struct KnowledgeBase {
    config: RagConfig,
    repository: Arc<dyn DocumentRepository>,
    uploads: Arc<dyn ByteStore>,
    index: Arc<dyn VectorIndex>,
    retrieval: RetrievalOrchestrator,
    worker: IngestionWorker,
    generator: Arc<dyn TextGenerator>,
}

impl KnowledgeBase {
    /// 메모리 저장소와 해시 임베딩으로 생성
    ///
    /// 업로드 바이트는 `storage.upload_location()`이 가리키는 디렉토리에 파일로 저장하고,
    /// 위치가 없으면 메모리에 둡니다.
    pub fn new(config: RagConfig, generator: Arc<dyn TextGenerator>) -> anyhow::Result<Self> {
        let uploads: Arc<dyn ByteStore> = match config.storage.upload_location() {
            Some(dir) => Arc::new(
                FsByteStore::open(&dir)
                    .with_context(|| format!("Failed to open upload dir: {}", dir.display()))?,
            ),
            None => Arc::new(MemoryByteStore::new()),
        };
        let dimension = config.embedding.dimension;

        Self::from_parts(
            config,
            Arc::new(MemoryRepository::new()),
            uploads,
            Arc::new(HashEmbedding::with_dimension(dimension)),
            Arc::new(LinearScanIndex::new(dimension)),
            generator,
        )
    }

    /// Gemini 생성기로 생성 (API 키는 환경변수)
    pub fn with_gemini(config: RagConfig) -> anyhow::Result<Self> {
        let generator = GeminiGenerator::from_env(&config.generation)?;
        Self::new(config, Arc::new(generator))
    }

    /// 구성 요소를 직접 주입하여 생성
    pub fn from_parts(
        config: RagConfig,
        repository: Arc<dyn DocumentRepository>,
        uploads: Arc<dyn ByteStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        generator: Arc<dyn TextGenerator>,
    ) -> anyhow::Result<Self> {
        config.validate()?;

        let chunker = WordWindowChunker::new(ChunkConfig::from(&config.chunking));
        let pipeline = IngestionPipeline::new(
            repository.clone(),
            uploads.clone(),
            embedder.clone(),
            index.clone(),
        )
        .with_chunker(Arc::new(chunker))
        .with_embed_timeout(config.embedding.timeout());

        let worker = IngestionWorker::new(Arc::new(pipeline), config.ingestion.max_concurrent);
        let retrieval = RetrievalOrchestrator::new(repository.clone(), embedder, index.clone())
            .with_top_k(config.retrieval.top_k);

        tracing::debug!(
            "Knowledge base ready (chunk size {}, overlap {}, top_k {})",
            config.chunking.size,
            config.chunking.overlap,
            config.retrieval.top_k
        );

        Ok(Self {
            config,
            repository,
            uploads,
            index,
            retrieval,
            worker,
            generator,
        })
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    // ========================================================================
    // Documents
    // ========================================================================

    /// 문서 업로드
    ///
    /// 검증 후 바이트를 저장하고 `uploading` 상태의 문서를 만든 뒤,
    /// 수집 작업을 제출하고 완료를 기다리지 않고 반환합니다.
    pub async fn upload(&self, request: UploadRequest) -> Result<(Document, IngestHandle)> {
        let original_name = request.original_name.trim();
        if original_name.is_empty() {
            return Err(RagError::InvalidUpload("file name is empty".to_string()));
        }
        if !is_supported(&request.mime_type) {
            return Err(RagError::UnsupportedFormat(request.mime_type));
        }
        let file_size = request.bytes.len() as u64;
        if file_size > self.config.ingestion.max_upload_bytes {
            return Err(RagError::InvalidUpload(format!(
                "file size {} exceeds limit of {} bytes",
                file_size, self.config.ingestion.max_upload_bytes
            )));
        }
        if self.worker.is_closed() {
            return Err(RagError::WorkerClosed);
        }

        let document = self
            .repository
            .create_document(NewDocument {
                name: uuid::Uuid::new_v4().to_string(),
                original_name: original_name.to_string(),
                mime_type: request.mime_type.clone(),
                file_size,
            })
            .await?;

        if let Err(e) = self
            .uploads
            .save(document.id, request.bytes, &request.mime_type)
            .await
        {
            self.repository.delete_document(document.id).await?;
            return Err(e);
        }

        let handle = match self.worker.submit(document.id) {
            Ok(handle) => handle,
            Err(e) => {
                self.uploads.remove(document.id).await?;
                self.repository.delete_document(document.id).await?;
                return Err(e);
            }
        };

        tracing::info!(
            "Uploaded document {} ({}, {} bytes)",
            document.id,
            document.original_name,
            document.file_size
        );
        Ok((document, handle))
    }

    /// 문서 삭제 (청크, 인덱스 레코드, 원본 바이트 포함)
    pub async fn delete_document(&self, id: DocumentId) -> Result<bool> {
        let removed = self.repository.delete_document(id).await?;
        let records = self.index.remove_by_document(id)?;
        self.uploads.remove(id).await?;

        if removed {
            tracing::info!("Deleted document {} ({} index records)", id, records);
        }
        Ok(removed)
    }

    /// 전체 문서 목록 (최근 업로드 순)
    pub async fn documents(&self) -> Result<Vec<Document>> {
        self.repository.list_documents().await
    }

    pub async fn document(&self, id: DocumentId) -> Result<Option<Document>> {
        self.repository.get_document(id).await
    }

    /// 문서의 청크 (chunk_index 순)
    pub async fn chunks(&self, id: DocumentId) -> Result<Vec<Chunk>> {
        self.repository.get_chunks_for_document(id).await
    }

    // ========================================================================
    // Query
    // ========================================================================

    /// 설정된 top-k로 검색
    pub async fn retrieve(&self, query: &str) -> RetrievalResult {
        self.retrieval.retrieve_default(query).await
    }

    /// 질문에 답하고 대화 기록에 저장
    pub async fn ask(&self, query: &str) -> Result<ChatExchange> {
        let query = query.trim();
        if query.is_empty() {
            return Err(RagError::InvalidQuery("query must not be empty".to_string()));
        }

        let retrieved = self.retrieval.retrieve_default(query).await;
        tracing::debug!(
            "Answering with {} contexts via {}",
            retrieved.len(),
            self.generator.name()
        );

        let response = self.generator.generate(query, &retrieved.contexts).await?;

        self.repository
            .create_chat_exchange(NewChatExchange {
                query: query.to_string(),
                response,
                sources: retrieved.sources,
            })
            .await
    }

    /// 대화 기록 (오래된 순)
    pub async fn chat_history(&self) -> Result<Vec<ChatExchange>> {
        self.repository.chat_exchanges().await
    }

    pub async fn clear_chat_history(&self) -> Result<usize> {
        self.repository.clear_chat_exchanges().await
    }

    // ========================================================================
    // Worker
    // ========================================================================

    /// 수집 이벤트 구독
    pub fn subscribe(&self) -> broadcast::Receiver<IngestEvent> {
        self.worker.subscribe()
    }

    /// 제출된 모든 수집 작업 완료까지 대기
    pub async fn wait_idle(&self) {
        self.worker.wait_idle().await;
    }

    /// 새 업로드를 막고 진행 중인 수집 완료까지 대기
    pub async fn shutdown(&self) {
        self.worker.shutdown().await;
    }
}

// ============================================================================
// Tests
// ============================================================================
