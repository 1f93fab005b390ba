//! Ingestion Pipeline - 문서 하나의 수집 처리
//!
//! 추출 → 청킹 → 청크별 임베딩 → 저장/인덱싱 순서로 진행하며
//! 문서 상태를 `processing`을 거쳐 `completed` 또는 `error`로 옮깁니다.
//!
//! 청크 하나의 임베딩 실패는 경고만 남기고 건너뜁니다. 청크 인덱스는
//! 성공한 청크 수로 매기므로 항상 `0..chunk_count` 연속입니다.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::embedding::{estimate_tokens, EmbeddingProvider};
use crate::error::{RagError, Result};
use crate::extractor::ContentExtractor;
use crate::knowledge::chunker::{Chunker, WordWindowChunker};
use crate::knowledge::repository::{
    ChunkMetadata, Document, DocumentId, DocumentRepository, DocumentStatus, DocumentUpdate,
    NewChunk,
};
use crate::knowledge::uploads::ByteStore;
use crate::knowledge::vector::{VectorIndex, VectorRecord};

/// 청크 하나의 기본 임베딩 제한 시간
pub const DEFAULT_EMBED_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// ProcessingResult
// ============================================================================

/// 문서 처리 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub success: bool,
    pub chunks_created: usize,
    pub error: Option<String>,
}

impl ProcessingResult {
    pub fn succeeded(chunks_created: usize) -> Self {
        Self {
            success: true,
            chunks_created,
            error: None,
        }
    }

    pub fn failed(error: impl ToString) -> Self {
        Self {
            success: false,
            chunks_created: 0,
            error: Some(error.to_string()),
        }
    }
}

// ============================================================================
// IngestionPipeline
// ============================================================================

/// 문서 수집 파이프라인
pub struct IngestionPipeline {
    repository: Arc<dyn DocumentRepository>,
    uploads: Arc<dyn ByteStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    chunker: Arc<dyn Chunker>,
    extractor: ContentExtractor,
    embed_timeout: Duration,
}

impl IngestionPipeline {
    /// 기본 청커(1000/200)와 기본 제한 시간으로 생성
    pub fn new(
        repository: Arc<dyn DocumentRepository>,
        uploads: Arc<dyn ByteStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        Self {
            repository,
            uploads,
            embedder,
            index,
            chunker: Arc::new(WordWindowChunker::default()),
            extractor: ContentExtractor::new(),
            embed_timeout: DEFAULT_EMBED_TIMEOUT,
        }
    }

    pub fn with_chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = chunker;
        self
    }

    pub fn with_embed_timeout(mut self, timeout: Duration) -> Self {
        self.embed_timeout = timeout;
        self
    }

    /// 문서 하나 처리
    ///
    /// 에러를 반환하지 않고 [`ProcessingResult`]로 보고합니다.
    /// - 문서가 없거나 `processing`으로 전이할 수 없으면 상태를 바꾸지 않고 실패
    /// - 그 이후의 실패는 문서를 `error`로 만들고 부분 결과를 정리
    pub async fn ingest(&self, document_id: DocumentId) -> ProcessingResult {
        let document = match self.repository.get_document(document_id).await {
            Ok(Some(doc)) => doc,
            Ok(None) => return ProcessingResult::failed(RagError::DocumentNotFound(document_id)),
            Err(e) => return ProcessingResult::failed(e),
        };

        match self
            .repository
            .update_document(document_id, DocumentUpdate::status(DocumentStatus::Processing))
            .await
        {
            Ok(Some(_)) => {}
            Ok(None) => return ProcessingResult::failed(RagError::DocumentNotFound(document_id)),
            Err(e) => {
                tracing::debug!("Document {} not started: {}", document_id, e);
                return ProcessingResult::failed(e);
            }
        }

        tracing::debug!(
            "Processing document {} ({}, {})",
            document.id,
            document.original_name,
            document.mime_type
        );

        let outcome = match self.process(&document).await {
            Ok(created) => self.complete(document_id, created).await.map(|_| created),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(created) => {
                tracing::info!(
                    "Processed document {} ({}): {} chunks",
                    document.id,
                    document.original_name,
                    created
                );
                ProcessingResult::succeeded(created)
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to process document {} ({}): {}",
                    document.id,
                    document.original_name,
                    e
                );
                self.mark_failed(document_id).await;
                ProcessingResult::failed(e)
            }
        }
    }

    /// 추출, 청킹, 임베딩, 저장. 생성된 청크 수 반환
    async fn process(&self, document: &Document) -> Result<usize> {
        let upload = self.uploads.load(document.id).await?;
        let text = self
            .extractor
            .extract(upload.bytes, &document.mime_type)
            .await?;

        let fragments = self.chunker.chunk(&text);
        tracing::debug!(
            "Document {}: {} chars, {} fragments",
            document.id,
            text.len(),
            fragments.len()
        );

        let mut created = 0;
        for (position, fragment) in fragments.into_iter().enumerate() {
            let embedding = match self.embed_fragment(position, &fragment).await {
                Ok(embedding) => embedding,
                Err(e) => {
                    tracing::warn!("Document {}: skipping fragment: {}", document.id, e);
                    continue;
                }
            };

            let chunk = self
                .repository
                .create_chunk(NewChunk {
                    document_id: document.id,
                    metadata: ChunkMetadata {
                        tokens: estimate_tokens(&fragment),
                        original_document: document.original_name.clone(),
                    },
                    content: fragment,
                    embedding,
                    chunk_index: created,
                })
                .await?;

            self.index.insert(VectorRecord {
                chunk_id: chunk.id,
                document_id: chunk.document_id,
                chunk_index: chunk.chunk_index,
                content: chunk.content,
                embedding: chunk.embedding,
            })?;

            created += 1;
        }

        Ok(created)
    }

    /// 제한 시간 안에 fragment 임베딩
    async fn embed_fragment(&self, position: usize, fragment: &str) -> Result<Vec<f64>> {
        let embedding = tokio::time::timeout(self.embed_timeout, self.embedder.embed(fragment))
            .await
            .map_err(|_| RagError::ChunkEmbeddingFailure {
                index: position,
                reason: format!("timed out after {:?}", self.embed_timeout),
            })?
            .map_err(|e| RagError::ChunkEmbeddingFailure {
                index: position,
                reason: e.to_string(),
            })?;

        if embedding.len() != self.embedder.dimension() {
            return Err(RagError::ChunkEmbeddingFailure {
                index: position,
                reason: format!(
                    "expected {} dimensions, got {}",
                    self.embedder.dimension(),
                    embedding.len()
                ),
            });
        }
        Ok(embedding)
    }

    async fn complete(&self, document_id: DocumentId, chunk_count: usize) -> Result<()> {
        let update = DocumentUpdate {
            status: Some(DocumentStatus::Completed),
            chunk_count: Some(chunk_count),
            processed_at: Some(Utc::now()),
        };
        self.repository
            .update_document(document_id, update)
            .await?
            .ok_or(RagError::DocumentNotFound(document_id))?;
        Ok(())
    }

    /// 부분 결과 정리 후 `error` 상태로 전환 (실패는 로그만)
    async fn mark_failed(&self, document_id: DocumentId) {
        match self.index.remove_by_document(document_id) {
            Ok(0) => {}
            Ok(n) => tracing::debug!("Removed {} index records of document {}", n, document_id),
            Err(e) => tracing::warn!("Failed to clean index for document {}: {}", document_id, e),
        }
        if let Err(e) = self.repository.delete_chunks_for_document(document_id).await {
            tracing::warn!("Failed to clean chunks for document {}: {}", document_id, e);
        }

        let update = DocumentUpdate {
            status: Some(DocumentStatus::Error),
            chunk_count: Some(0),
            processed_at: None,
        };
        match self.repository.update_document(document_id, update).await {
            Ok(_) => {}
            Err(e) => tracing::debug!("Document {} not marked as error: {}", document_id, e),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
