//! palank-docs - 업로드 문서 기반 RAG 검색 코어
//!
//! 업로드된 문서(텍스트, PDF, DOCX)에서 텍스트를 추출해 청크로 나누고,
//! 임베딩하여 벡터 인덱스에 넣은 뒤, 질의와 가장 유사한 청크를
//! 출처와 함께 찾아 답변 생성에 넘깁니다.
//!
//! ```text
//! bytes → extractor → chunker → embedding → vector index
//! query → embedding → vector index (top-k) → contexts + sources → generation
//! ```

pub mod config;
pub mod embedding;
pub mod error;
pub mod extractor;
pub mod generation;
pub mod knowledge;
pub mod logging;

// Re-exports
pub use config::{load_config, parse_config, RagConfig};
pub use embedding::{EmbeddingProvider, HashEmbedding, DEFAULT_DIMENSION};
pub use error::{RagError, Result};
pub use extractor::{extract_text, ContentExtractor, DocumentFormat};
pub use generation::{build_prompt, get_api_key, has_api_key, GeminiGenerator, TextGenerator};
pub use knowledge::{
    ChatExchange, Chunk, ChunkConfig, Chunker, Document, DocumentId, DocumentRepository,
    DocumentStatus, IngestEvent, IngestHandle, IngestionPipeline, IngestionWorker, KnowledgeBase,
    LinearScanIndex, MemoryRepository, ProcessingResult, RetrievalOrchestrator, RetrievalResult,
    SourceRef, UploadRequest, VectorIndex, WordWindowChunker,
};
pub use logging::init_logging;
