//! 에러 타입 모듈
//!
//! 수집(ingestion)과 검색(retrieval) 파이프라인 전체에서 사용하는 에러 분류입니다.
//! - 문서 단위 치명적 에러: `UnsupportedFormat`, `ExtractionFailure`
//! - 청크 단위 비치명적 에러: `ChunkEmbeddingFailure` (로그 후 건너뜀)
//! - 검색 단위 비치명적 에러: `IndexQueryFailure`, `DocumentNotFound`

use thiserror::Error;

use crate::knowledge::{DocumentId, DocumentStatus};

/// palank-docs 메인 에러 타입
#[derive(Error, Debug)]
pub enum RagError {
    /// 지원하지 않는 MIME 타입
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// 선언된 타입에 맞지 않는 손상된 바이트
    #[error("extraction failed: {0}")]
    ExtractionFailure(String),

    /// 임베딩 생성 실패
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// 특정 청크의 임베딩 실패 (비치명적)
    #[error("embedding of chunk {index} failed: {reason}")]
    ChunkEmbeddingFailure { index: usize, reason: String },

    /// 유사도 검색 실패
    #[error("index query failed: {0}")]
    IndexQueryFailure(String),

    /// 인덱스 삽입 실패
    #[error("index insert failed: {0}")]
    IndexInsert(String),

    /// 존재하지 않는 문서 참조
    #[error("document not found: {0}")]
    DocumentNotFound(DocumentId),

    /// 허용되지 않는 라이프사이클 전이
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: DocumentStatus,
        to: DocumentStatus,
    },

    /// 저장소(리포지토리, 바이트 저장소) 에러
    #[error("storage error: {0}")]
    Storage(String),

    /// 업로드 검증 실패
    #[error("invalid upload: {0}")]
    InvalidUpload(String),

    /// 빈 질의 등 잘못된 질의
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// 텍스트 생성 서비스 에러
    #[error("generation failed: {0}")]
    Generation(String),

    /// 종료된 워커에 작업 제출
    #[error("ingestion worker is shut down")]
    WorkerClosed,

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RagError {
    /// 락 poisoning 등 저장소 내부 에러 변환
    pub(crate) fn storage(err: impl std::fmt::Display) -> Self {
        RagError::Storage(err.to_string())
    }
}

/// palank-docs Result 타입
pub type Result<T> = std::result::Result<T, RagError>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_format_display() {
        let err = RagError::UnsupportedFormat("image/png".to_string());
        assert_eq!(err.to_string(), "unsupported format: image/png");
    }

    #[test]
    fn test_chunk_embedding_failure_display() {
        let err = RagError::ChunkEmbeddingFailure {
            index: 3,
            reason: "timed out".to_string(),
        };
        assert_eq!(err.to_string(), "embedding of chunk 3 failed: timed out");
    }

    #[test]
    fn test_invalid_transition_display() {
        let err = RagError::InvalidTransition {
            from: DocumentStatus::Completed,
            to: DocumentStatus::Processing,
        };
        assert_eq!(
            err.to_string(),
            "invalid status transition: completed -> processing"
        );
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing upload");
        let err: RagError = io_err.into();
        assert!(matches!(err, RagError::Io(_)));
        assert!(err.to_string().contains("missing upload"));
    }
}
