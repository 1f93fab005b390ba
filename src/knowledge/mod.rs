//! Knowledge 모듈 - 문서 수집과 검색
//!
//! - Chunker: 단어 윈도우 텍스트 분할
//! - Vector: 선형 스캔 코사인 유사도 검색
//! - Repository / Uploads: 문서, 청크, 대화 기록, 원본 바이트 저장
//! - Pipeline / Worker: 문서 단위 수집과 백그라운드 실행
//! - Retrieval: 질의 → 컨텍스트 + 출처
//! - Base: 업로드/삭제/질의 facade

mod base;
mod chunker;
mod pipeline;
mod repository;
mod retrieval;
mod uploads;
mod vector;
mod worker;

// Re-exports
pub use base::{KnowledgeBase, UploadRequest};
pub use chunker::{
    chunk_words, default_chunker, ChunkConfig, Chunker, WordWindowChunker, CHUNK_OVERLAP,
    CHUNK_SIZE,
};
pub use pipeline::{IngestionPipeline, ProcessingResult, DEFAULT_EMBED_TIMEOUT};
pub use repository::{
    ChatExchange, Chunk, ChunkMetadata, Document, DocumentId, DocumentRepository,
    DocumentStatus, DocumentUpdate, MemoryRepository, NewChatExchange, NewChunk, NewDocument,
    SourceRef,
};
pub use retrieval::{RetrievalOrchestrator, RetrievalResult, DEFAULT_TOP_K};
pub use uploads::{get_data_dir, ByteStore, FsByteStore, MemoryByteStore, StoredUpload};
pub use vector::{cosine_similarity, LinearScanIndex, SearchHit, VectorIndex, VectorRecord};
pub use worker::{IngestEvent, IngestHandle, IngestionWorker};
