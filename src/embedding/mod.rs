//! 임베딩 모듈 - 텍스트 벡터화
//!
//! 텍스트를 고정 차원 벡터로 변환하는 프로바이더 인터페이스입니다.
//! 기본 구현인 [`HashEmbedding`]은 학습되지 않은 해시 기반 지문이며,
//! 실제 임베딩 모델로 교체할 수 있도록 [`EmbeddingProvider`] 뒤에 둡니다.
//!
//! ## 사용법
//! ```rust,ignore
//! let embedder = HashEmbedding::new();
//! let embedding = embedder.embed("Hello, world!").await?;
//! assert_eq!(embedding.len(), 1536);
//! ```

mod fingerprint;

use async_trait::async_trait;

use crate::error::{RagError, Result};

pub use fingerprint::{fingerprint, string_hash};

/// 기본 임베딩 차원
pub const DEFAULT_DIMENSION: usize = 1536;

/// 토큰 추정 비율 (4자 ≈ 1토큰)
const CHARS_PER_TOKEN: usize = 4;

// ============================================================================
// EmbeddingProvider Trait
// ============================================================================

/// 임베딩 프로바이더 트레이트
///
/// 텍스트를 벡터로 변환하는 인터페이스입니다.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// 단일 텍스트 임베딩
    async fn embed(&self, text: &str) -> Result<Vec<f64>>;

    /// 임베딩 차원 수
    fn dimension(&self) -> usize;

    /// 프로바이더 이름
    fn name(&self) -> &str;
}

// ============================================================================
// Hash Embedding
// ============================================================================

/// 해시 기반 지문 임베딩
///
/// 같은 텍스트는 항상 같은 벡터를 만듭니다. 의미 이해는 없고
/// 단어 겹침만 반영하는 placeholder입니다.
#[derive(Debug, Clone)]
pub struct HashEmbedding {
    dimension: usize,
}

impl HashEmbedding {
    /// 기본 차원(1536)으로 생성
    pub fn new() -> Self {
        Self::with_dimension(DEFAULT_DIMENSION)
    }

    /// 차원을 지정하여 생성
    pub fn with_dimension(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for HashEmbedding {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f64>> {
        // 차원 x 단어 수만큼 삼각함수를 계산하므로 blocking 풀에서 실행
        let text = text.to_string();
        let dimension = self.dimension;
        tokio::task::spawn_blocking(move || fingerprint(&text, dimension))
            .await
            .map_err(|e| RagError::Embedding(format!("embedding task failed: {}", e)))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "hash-fingerprint"
    }
}

// ============================================================================
// Utility Functions
// ============================================================================

/// 토큰 수 추정 (UTF-16 길이 / 4, 올림)
pub fn estimate_tokens(text: &str) -> usize {
    text.encode_utf16().count().div_ceil(CHARS_PER_TOKEN)
}

// ============================================================================
// Tests
// ============================================================================
