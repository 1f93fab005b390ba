//! Retrieval Orchestrator - 질의 → 컨텍스트 + 출처
//!
//! 임베딩이나 인덱스 검색이 실패하면 빈 결과를 돌려주고,
//! 문서를 찾을 수 없는 검색 결과는 건너뜁니다. 에러를 반환하지 않습니다.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::knowledge::repository::{DocumentId, DocumentRepository, SourceRef};
use crate::knowledge::vector::{SearchHit, VectorIndex};

/// 기본 검색 결과 수
pub const DEFAULT_TOP_K: usize = 5;

/// 검색 결과 (contexts[i]의 출처가 sources[i])
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub contexts: Vec<String>,
    pub sources: Vec<SourceRef>,
}

impl RetrievalResult {
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }
}

/// 검색 오케스트레이터
pub struct RetrievalOrchestrator {
    repository: Arc<dyn DocumentRepository>,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    top_k: usize,
}

impl RetrievalOrchestrator {
    pub fn new(
        repository: Arc<dyn DocumentRepository>,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        Self {
            repository,
            embedder,
            index,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// 설정된 기본 top-k로 검색
    pub async fn retrieve_default(&self, query: &str) -> RetrievalResult {
        self.retrieve(query, self.top_k).await
    }

    /// 질의와 가장 유사한 청크 `k`개의 내용과 출처
    ///
    /// # Arguments
    /// * `query` - 자연어 질의
    /// * `k` - 최대 결과 수
    ///
    /// # Returns
    /// 유사도 순위 순서의 컨텍스트와 출처. 실패 시 빈 결과
    pub async fn retrieve(&self, query: &str, k: usize) -> RetrievalResult {
        let hits = match self.search(query, k).await {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!("Retrieval degraded to empty result: {}", e);
                return RetrievalResult::default();
            }
        };

        // 호출 한 번 안에서 문서당 조회 한 번
        let mut names: HashMap<DocumentId, Option<String>> = HashMap::new();
        let mut result = RetrievalResult::default();

        for hit in hits {
            if !names.contains_key(&hit.document_id) {
                let name = match self.repository.get_document(hit.document_id).await {
                    Ok(Some(doc)) => Some(doc.original_name),
                    Ok(None) => None,
                    Err(e) => {
                        tracing::debug!("Document {} lookup failed: {}", hit.document_id, e);
                        None
                    }
                };
                names.insert(hit.document_id, name);
            }

            match names.get(&hit.document_id).cloned().flatten() {
                Some(document_name) => {
                    result.contexts.push(hit.content);
                    result.sources.push(SourceRef {
                        document_name,
                        chunk_index: hit.chunk_index,
                    });
                }
                None => {
                    tracing::debug!(
                        "Skipping chunk {} of missing document {}",
                        hit.chunk_id,
                        hit.document_id
                    );
                }
            }
        }

        result
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        let embedding = self.embedder.embed(query).await?;
        self.index.query(&embedding, k)
    }
}

// ============================================================================
// Tests
// ============================================================================
