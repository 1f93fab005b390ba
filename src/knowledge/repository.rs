//! Document Repository - 문서/청크/대화 기록 저장소
//!
//! 영속 저장소는 이 크레이트 범위 밖이므로 [`DocumentRepository`] 트레이트로
//! 경계를 두고, 메모리 구현 [`MemoryRepository`]를 제공합니다.
//!
//! 문서 상태 전이는 저장소가 원자적으로 검증합니다:
//! `uploading → processing → completed | error`

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// 문서 ID
pub type DocumentId = i64;

// ============================================================================
// Document Types
// ============================================================================

/// 문서 처리 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Uploading,
    Processing,
    Completed,
    Error,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Uploading => "uploading",
            DocumentStatus::Processing => "processing",
            DocumentStatus::Completed => "completed",
            DocumentStatus::Error => "error",
        }
    }

    /// 허용된 전이인지 확인
    ///
    /// `uploading → processing`, `processing → completed | error` 만 허용합니다.
    pub fn can_transition_to(self, next: DocumentStatus) -> bool {
        matches!(
            (self, next),
            (DocumentStatus::Uploading, DocumentStatus::Processing)
                | (DocumentStatus::Processing, DocumentStatus::Completed)
                | (DocumentStatus::Processing, DocumentStatus::Error)
        )
    }

    /// 더 이상 전이할 수 없는 상태
    pub fn is_terminal(self) -> bool {
        matches!(self, DocumentStatus::Completed | DocumentStatus::Error)
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 업로드된 문서
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    /// 저장소 내부 이름
    pub name: String,
    /// 사용자가 업로드한 파일 이름 (출처 표시에 사용)
    pub original_name: String,
    pub mime_type: String,
    pub file_size: u64,
    pub status: DocumentStatus,
    pub chunk_count: usize,
    pub uploaded_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// 새 문서 입력용 구조체
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub name: String,
    pub original_name: String,
    pub mime_type: String,
    pub file_size: u64,
}

/// 문서 부분 업데이트
#[derive(Debug, Clone, Default)]
pub struct DocumentUpdate {
    pub status: Option<DocumentStatus>,
    pub chunk_count: Option<usize>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl DocumentUpdate {
    /// 상태만 변경
    pub fn status(status: DocumentStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}

// ============================================================================
// Chunk Types
// ============================================================================

/// 청크 메타데이터
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    /// 추정 토큰 수
    pub tokens: usize,
    /// 원본 문서 파일 이름
    pub original_document: String,
}

/// 임베딩된 텍스트 조각
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: i64,
    pub document_id: DocumentId,
    pub content: String,
    pub embedding: Vec<f64>,
    pub chunk_index: usize,
    pub metadata: ChunkMetadata,
}

/// 새 청크 입력용 구조체
#[derive(Debug, Clone)]
pub struct NewChunk {
    pub document_id: DocumentId,
    pub content: String,
    pub embedding: Vec<f64>,
    pub chunk_index: usize,
    pub metadata: ChunkMetadata,
}

// ============================================================================
// Chat Types
// ============================================================================

/// 답변 출처 (문서 이름 + 청크 인덱스)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub document_name: String,
    pub chunk_index: usize,
}

/// 질문/답변 기록
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatExchange {
    pub id: i64,
    pub query: String,
    pub response: String,
    pub sources: Vec<SourceRef>,
    pub created_at: DateTime<Utc>,
}

/// 새 대화 기록 입력용 구조체
#[derive(Debug, Clone)]
pub struct NewChatExchange {
    pub query: String,
    pub response: String,
    pub sources: Vec<SourceRef>,
}

// ============================================================================
// DocumentRepository Trait
// ============================================================================

/// 문서 저장소 트레이트 (async)
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn get_document(&self, id: DocumentId) -> Result<Option<Document>>;

    /// 전체 문서 목록 (최근 업로드 순)
    async fn list_documents(&self) -> Result<Vec<Document>>;

    /// 문서 생성 (`uploading` 상태, 청크 0개)
    async fn create_document(&self, new_doc: NewDocument) -> Result<Document>;

    /// 문서 부분 업데이트
    ///
    /// 상태 변경이 허용되지 않으면 `InvalidTransition`을 반환하고 아무것도 바꾸지 않습니다.
    /// 문서가 없으면 `Ok(None)`.
    async fn update_document(&self, id: DocumentId, update: DocumentUpdate)
        -> Result<Option<Document>>;

    /// 문서 삭제 (청크도 함께 삭제)
    async fn delete_document(&self, id: DocumentId) -> Result<bool>;

    /// 청크 생성 (문서가 `processing` 상태여야 함)
    async fn create_chunk(&self, new_chunk: NewChunk) -> Result<Chunk>;

    /// 문서의 청크 목록 (chunk_index 순)
    async fn get_chunks_for_document(&self, document_id: DocumentId) -> Result<Vec<Chunk>>;

    /// 문서의 청크 전체 삭제, 삭제된 개수 반환
    async fn delete_chunks_for_document(&self, document_id: DocumentId) -> Result<usize>;

    async fn create_chat_exchange(&self, new_exchange: NewChatExchange) -> Result<ChatExchange>;

    /// 대화 기록 (오래된 순)
    async fn chat_exchanges(&self) -> Result<Vec<ChatExchange>>;

    async fn clear_chat_exchanges(&self) -> Result<usize>;
}

// ============================================================================
// MemoryRepository
// ============================================================================

#[derive(Debug, Default)]
struct RepositoryState {
    documents: BTreeMap<DocumentId, Document>,
    chunks: Vec<Chunk>,
    chat: Vec<ChatExchange>,
}

/// 메모리 저장소
///
/// 단일 `RwLock` 아래에 모든 테이블을 둬서 문서 삭제와 청크 삭제가 원자적입니다.
#[derive(Debug)]
pub struct MemoryRepository {
    state: RwLock<RepositoryState>,
    next_document_id: AtomicI64,
    next_chunk_id: AtomicI64,
    next_chat_id: AtomicI64,
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(RepositoryState::default()),
            next_document_id: AtomicI64::new(1),
            next_chunk_id: AtomicI64::new(1),
            next_chat_id: AtomicI64::new(1),
        }
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, RepositoryState>> {
        self.state.read().map_err(RagError::storage)
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, RepositoryState>> {
        self.state.write().map_err(RagError::storage)
    }
}

#[async_trait]
impl DocumentRepository for MemoryRepository {
    async fn get_document(&self, id: DocumentId) -> Result<Option<Document>> {
        Ok(self.read()?.documents.get(&id).cloned())
    }

    async fn list_documents(&self) -> Result<Vec<Document>> {
        let mut docs: Vec<Document> = self.read()?.documents.values().cloned().collect();
        docs.sort_by(|a, b| {
            b.uploaded_at
                .cmp(&a.uploaded_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(docs)
    }

    async fn create_document(&self, new_doc: NewDocument) -> Result<Document> {
        let id = self.next_document_id.fetch_add(1, Ordering::SeqCst);
        let doc = Document {
            id,
            name: new_doc.name,
            original_name: new_doc.original_name,
            mime_type: new_doc.mime_type,
            file_size: new_doc.file_size,
            status: DocumentStatus::Uploading,
            chunk_count: 0,
            uploaded_at: Utc::now(),
            processed_at: None,
        };
        self.write()?.documents.insert(id, doc.clone());
        Ok(doc)
    }

    async fn update_document(
        &self,
        id: DocumentId,
        update: DocumentUpdate,
    ) -> Result<Option<Document>> {
        let mut state = self.write()?;
        let Some(doc) = state.documents.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(next) = update.status {
            if !doc.status.can_transition_to(next) {
                return Err(RagError::InvalidTransition {
                    from: doc.status,
                    to: next,
                });
            }
            doc.status = next;
        }
        if let Some(count) = update.chunk_count {
            doc.chunk_count = count;
        }
        if let Some(at) = update.processed_at {
            doc.processed_at = Some(at);
        }

        Ok(Some(doc.clone()))
    }

    async fn delete_document(&self, id: DocumentId) -> Result<bool> {
        let mut state = self.write()?;
        let removed = state.documents.remove(&id).is_some();
        state.chunks.retain(|c| c.document_id != id);
        Ok(removed)
    }

    async fn create_chunk(&self, new_chunk: NewChunk) -> Result<Chunk> {
        let mut state = self.write()?;
        match state.documents.get(&new_chunk.document_id) {
            None => return Err(RagError::DocumentNotFound(new_chunk.document_id)),
            Some(doc) if doc.status != DocumentStatus::Processing => {
                return Err(RagError::Storage(format!(
                    "document {} is {}, chunks can only be added while processing",
                    doc.id, doc.status
                )));
            }
            Some(_) => {}
        }

        let chunk = Chunk {
            id: self.next_chunk_id.fetch_add(1, Ordering::SeqCst),
            document_id: new_chunk.document_id,
            content: new_chunk.content,
            embedding: new_chunk.embedding,
            chunk_index: new_chunk.chunk_index,
            metadata: new_chunk.metadata,
        };
        state.chunks.push(chunk.clone());
        Ok(chunk)
    }

    async fn get_chunks_for_document(&self, document_id: DocumentId) -> Result<Vec<Chunk>> {
        let mut chunks: Vec<Chunk> = self
            .read()?
            .chunks
            .iter()
            .filter(|c| c.document_id == document_id)
            .cloned()
            .collect();
        chunks.sort_by_key(|c| c.chunk_index);
        Ok(chunks)
    }

    async fn delete_chunks_for_document(&self, document_id: DocumentId) -> Result<usize> {
        let mut state = self.write()?;
        let before = state.chunks.len();
        state.chunks.retain(|c| c.document_id != document_id);
        Ok(before - state.chunks.len())
    }

    async fn create_chat_exchange(&self, new_exchange: NewChatExchange) -> Result<ChatExchange> {
        let exchange = ChatExchange {
            id: self.next_chat_id.fetch_add(1, Ordering::SeqCst),
            query: new_exchange.query,
            response: new_exchange.response,
            sources: new_exchange.sources,
            created_at: Utc::now(),
        };
        self.write()?.chat.push(exchange.clone());
        Ok(exchange)
    }

    async fn chat_exchanges(&self) -> Result<Vec<ChatExchange>> {
        Ok(self.read()?.chat.clone())
    }

    async fn clear_chat_exchanges(&self) -> Result<usize> {
        let mut state = self.write()?;
        let count = state.chat.len();
        state.chat.clear();
        Ok(count)
    }
}

// ============================================================================
// Tests
// ============================================================================
