//! Vector Index - 벡터 검색 트레이트 및 선형 스캔 구현
//!
//! 모든 레코드를 순회하는 브루트포스 검색입니다. 레코드 수가 커지면
//! [`VectorIndex`] 뒤에 ANN 구현을 끼워 넣을 수 있습니다.

use std::cmp::Ordering;
use std::sync::RwLock;

use crate::error::{RagError, Result};
use crate::knowledge::DocumentId;

// ============================================================================
// Types
// ============================================================================

/// 인덱스 레코드 (청크 하나)
#[derive(Debug, Clone)]
pub struct VectorRecord {
    /// 청크 ID (chunks.id)
    pub chunk_id: i64,
    /// 문서 ID (documents.id)
    pub document_id: DocumentId,
    /// 청크 인덱스 (0-based)
    pub chunk_index: usize,
    /// 청크 텍스트
    pub content: String,
    /// 임베딩 벡터
    pub embedding: Vec<f64>,
}

/// 검색 결과
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub chunk_id: i64,
    pub document_id: DocumentId,
    pub chunk_index: usize,
    pub content: String,
    /// 코사인 유사도 (-1.0 ~ 1.0)
    pub similarity: f64,
}

// ============================================================================
// VectorIndex Trait
// ============================================================================

/// 벡터 인덱스 트레이트
///
/// 동기 인터페이스입니다. 구현체는 내부 락을 `.await` 너머로 잡지 않습니다.
pub trait VectorIndex: Send + Sync {
    /// 레코드 추가
    fn insert(&self, record: VectorRecord) -> Result<()>;

    /// 유사도 상위 `k`개 검색 (내림차순, 동점은 삽입 순서)
    fn query(&self, embedding: &[f64], k: usize) -> Result<Vec<SearchHit>>;

    /// 문서의 모든 레코드 삭제, 삭제된 개수 반환
    fn remove_by_document(&self, document_id: DocumentId) -> Result<usize>;

    /// 레코드 개수
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 특정 문서의 레코드 존재 여부
    fn has_document(&self, document_id: DocumentId) -> bool;
}

// ============================================================================
// LinearScanIndex
// ============================================================================

/// 선형 스캔 인덱스 (메모리)
#[derive(Debug)]
pub struct LinearScanIndex {
    dimension: usize,
    records: RwLock<Vec<VectorRecord>>,
}

impl LinearScanIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            records: RwLock::new(Vec::new()),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

impl VectorIndex for LinearScanIndex {
    fn insert(&self, record: VectorRecord) -> Result<()> {
        if record.embedding.len() != self.dimension {
            return Err(RagError::IndexInsert(format!(
                "embedding dimension {} does not match index dimension {}",
                record.embedding.len(),
                self.dimension
            )));
        }

        let mut records = self
            .records
            .write()
            .map_err(|e| RagError::IndexInsert(e.to_string()))?;
        records.push(record);
        Ok(())
    }

    fn query(&self, embedding: &[f64], k: usize) -> Result<Vec<SearchHit>> {
        if embedding.len() != self.dimension {
            return Err(RagError::IndexQueryFailure(format!(
                "query dimension {} does not match index dimension {}",
                embedding.len(),
                self.dimension
            )));
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let records = self
            .records
            .read()
            .map_err(|e| RagError::IndexQueryFailure(e.to_string()))?;

        let mut scored: Vec<(f64, &VectorRecord)> = records
            .iter()
            .map(|r| (cosine_similarity(embedding, &r.embedding), r))
            .collect();

        // 안정 정렬이므로 동점은 삽입 순서 유지
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(similarity, r)| SearchHit {
                chunk_id: r.chunk_id,
                document_id: r.document_id,
                chunk_index: r.chunk_index,
                content: r.content.clone(),
                similarity,
            })
            .collect())
    }

    fn remove_by_document(&self, document_id: DocumentId) -> Result<usize> {
        let mut records = self.records.write().map_err(RagError::storage)?;
        let before = records.len();
        records.retain(|r| r.document_id != document_id);
        Ok(before - records.len())
    }

    fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    fn has_document(&self, document_id: DocumentId) -> bool {
        self.records
            .read()
            .map(|r| r.iter().any(|rec| rec.document_id == document_id))
            .unwrap_or(false)
    }
}

// ============================================================================
// Utility Functions
// ============================================================================

/// 코사인 유사도 계산
///
/// 두 벡터 간의 코사인 유사도를 계산합니다.
/// 결과는 -1.0 ~ 1.0 범위입니다.
///
/// # Arguments
/// * `a` - 첫 번째 벡터
/// * `b` - 두 번째 벡터
///
/// # Returns
/// 코사인 유사도. 길이가 다르거나 비어 있거나 영벡터면 0.0
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::fingerprint;

    fn record(chunk_id: i64, document_id: DocumentId, embedding: Vec<f64>) -> VectorRecord {
        VectorRecord {
            chunk_id,
            document_id,
            chunk_index: 0,
            content: format!("chunk {}", chunk_id),
            embedding,
        }
    }

    #[test]
    fn test_cosine_similarity_same() {
        let a = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_cosine_similarity_orthogonal_and_opposite() {
        let a = vec![1.0, 0.0, 0.0];
        assert!(cosine_similarity(&a, &[0.0, 1.0, 0.0]).abs() < 1e-12);
        assert!((cosine_similarity(&a, &[-1.0, 0.0, 0.0]) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_cosine_similarity_degenerate() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_fingerprint_reflexive_similarity() {
        let v = fingerprint("annual leave must be requested two weeks ahead", 1536);
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_query_empty_index() {
        let index = LinearScanIndex::new(3);
        assert!(index.is_empty());
        assert!(index.query(&[1.0, 0.0, 0.0], 5).unwrap().is_empty());
    }

    #[test]
    fn test_query_top_k_order() {
        let index = LinearScanIndex::new(2);
        index.insert(record(1, 10, vec![0.0, 1.0])).unwrap();
        index.insert(record(2, 10, vec![1.0, 0.0])).unwrap();
        index.insert(record(3, 11, vec![1.0, 1.0])).unwrap();
        index.insert(record(4, 11, vec![-1.0, 0.0])).unwrap();

        let hits = index.query(&[1.0, 0.0], 3).unwrap();
        let ids: Vec<i64> = hits.iter().map(|h| h.chunk_id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
        assert!(hits.windows(2).all(|w| w[0].similarity >= w[1].similarity));
    }

    #[test]
    fn test_query_k_larger_than_index() {
        let index = LinearScanIndex::new(2);
        index.insert(record(1, 1, vec![1.0, 0.0])).unwrap();
        assert_eq!(index.query(&[1.0, 0.0], 10).unwrap().len(), 1);
        assert!(index.query(&[1.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let index = LinearScanIndex::new(2);
        for id in [7, 3, 5] {
            index.insert(record(id, 1, vec![2.0, 2.0])).unwrap();
        }
        index.insert(record(9, 1, vec![0.0, 1.0])).unwrap();

        let hits = index.query(&[1.0, 1.0], 3).unwrap();
        let ids: Vec<i64> = hits.iter().map(|h| h.chunk_id).collect();
        assert_eq!(ids, vec![7, 3, 5]);
    }

    #[test]
    fn test_dimension_mismatch() {
        let index = LinearScanIndex::new(3);
        let err = index.insert(record(1, 1, vec![1.0])).unwrap_err();
        assert!(matches!(err, RagError::IndexInsert(_)));

        let err = index.query(&[1.0], 1).unwrap_err();
        assert!(matches!(err, RagError::IndexQueryFailure(_)));
    }

    #[test]
    fn test_remove_by_document() {
        let index = LinearScanIndex::new(2);
        index.insert(record(1, 1, vec![1.0, 0.0])).unwrap();
        index.insert(record(2, 2, vec![1.0, 0.0])).unwrap();
        index.insert(record(3, 1, vec![0.0, 1.0])).unwrap();

        assert!(index.has_document(1));
        assert_eq!(index.remove_by_document(1).unwrap(), 2);
        assert!(!index.has_document(1));
        assert_eq!(index.len(), 1);
        assert_eq!(index.remove_by_document(1).unwrap(), 0);

        let hits = index.query(&[1.0, 0.0], 5).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document_id, 2);
    }
}
