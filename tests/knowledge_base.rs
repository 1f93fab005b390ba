//! KnowledgeBase 통합 테스트
//!
//! 업로드부터 백그라운드 수집, 검색, 질의응답, 삭제까지 공개 API만으로 검증합니다.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use palank_docs::embedding::fingerprint;
use palank_docs::knowledge::{ByteStore, MemoryByteStore, VectorIndex};
use palank_docs::{
    DocumentStatus, EmbeddingProvider, HashEmbedding, IngestEvent, KnowledgeBase,
    LinearScanIndex, MemoryRepository, RagConfig, RagError, Result, TextGenerator,
    UploadRequest,
};
use tokio::sync::{Notify, Semaphore};

const DIM: usize = 64;

// ─── Test Doubles ───────────────────────────────────────────────────

/// 호출된 컨텍스트를 기록하는 생성기
#[derive(Default)]
struct RecordingGenerator {
    calls: Mutex<Vec<(String, Vec<String>)>>,
}

#[async_trait]
impl TextGenerator for RecordingGenerator {
    async fn generate(&self, query: &str, contexts: &[String]) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((query.to_string(), contexts.to_vec()));
        Ok(format!("answer from {} contexts", contexts.len()))
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// 허가가 주어질 때까지 임베딩을 멈추는 임베더
struct GatedEmbedder {
    inner: HashEmbedding,
    gate: Semaphore,
    entered: Notify,
}

impl GatedEmbedder {
    fn new() -> Self {
        Self {
            inner: HashEmbedding::with_dimension(DIM),
            gate: Semaphore::new(0),
            entered: Notify::new(),
        }
    }

    fn open(&self, permits: usize) {
        self.gate.add_permits(permits);
    }
}

#[async_trait]
impl EmbeddingProvider for GatedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f64>> {
        self.entered.notify_one();
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| RagError::Embedding(e.to_string()))?;
        permit.forget();
        self.inner.embed(text).await
    }

    fn dimension(&self) -> usize {
        DIM
    }

    fn name(&self) -> &str {
        "gated"
    }
}

/// 스위치로 고장 낼 수 있는 임베더
struct SwitchableEmbedder {
    inner: HashEmbedding,
    broken: AtomicBool,
}

#[async_trait]
impl EmbeddingProvider for SwitchableEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f64>> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(RagError::Embedding("embedding service unavailable".to_string()));
        }
        self.inner.embed(text).await
    }

    fn dimension(&self) -> usize {
        DIM
    }

    fn name(&self) -> &str {
        "switchable"
    }
}

// ─── Helpers ────────────────────────────────────────────────────────

struct Setup {
    kb: KnowledgeBase,
    index: Arc<LinearScanIndex>,
    uploads: Arc<MemoryByteStore>,
    generator: Arc<RecordingGenerator>,
}

fn config() -> RagConfig {
    let mut config = RagConfig::default();
    config.embedding.dimension = DIM;
    config.ingestion.max_concurrent = 3;
    config
}

fn setup_with(embedder: Arc<dyn EmbeddingProvider>) -> Setup {
    let index = Arc::new(LinearScanIndex::new(DIM));
    let uploads = Arc::new(MemoryByteStore::new());
    let generator = Arc::new(RecordingGenerator::default());
    let kb = KnowledgeBase::from_parts(
        config(),
        Arc::new(MemoryRepository::new()),
        uploads.clone(),
        embedder,
        index.clone(),
        generator.clone(),
    )
    .unwrap();
    Setup {
        kb,
        index,
        uploads,
        generator,
    }
}

fn setup() -> Setup {
    setup_with(Arc::new(HashEmbedding::with_dimension(DIM)))
}

fn text(name: &str, body: &str) -> UploadRequest {
    UploadRequest {
        original_name: name.to_string(),
        mime_type: "text/plain".to_string(),
        bytes: body.as_bytes().to_vec(),
    }
}

fn words(prefix: &str, n: usize) -> String {
    (0..n)
        .map(|i| format!("{}{}", prefix, i))
        .collect::<Vec<_>>()
        .join(" ")
}

// ─── Tests ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_upload_ingests_in_background() {
    let s = setup();
    let (doc, handle) = s.kb.upload(text("long.txt", &words("w", 1500))).await.unwrap();
    assert_eq!(doc.status, DocumentStatus::Uploading);

    let result = handle.wait().await;
    assert!(result.success);
    assert_eq!(result.chunks_created, 2);

    let doc = s.kb.document(doc.id).await.unwrap().unwrap();
    assert_eq!(doc.status, DocumentStatus::Completed);
    assert_eq!(doc.chunk_count, 2);

    let chunks = s.kb.chunks(doc.id).await.unwrap();
    assert_eq!(chunks[0].chunk_index, 0);
    assert_eq!(chunks[1].chunk_index, 1);
    assert_eq!(chunks[0].content.split(' ').count(), 1000);
    assert!(chunks[1].content.starts_with("w800 "));
    assert!(chunks[1].content.ends_with(" w1499"));
    assert_eq!(s.index.len(), 2);
}

#[tokio::test]
async fn test_lifecycle_is_monotonic() {
    let embedder = Arc::new(GatedEmbedder::new());
    let s = setup_with(embedder.clone());
    let mut events = s.kb.subscribe();

    let (doc, handle) = s.kb.upload(text("gated.txt", "alpha bravo charlie")).await.unwrap();
    assert_eq!(doc.status, DocumentStatus::Uploading);

    // 첫 임베딩 호출 시점에는 processing
    embedder.entered.notified().await;
    let current = s.kb.document(doc.id).await.unwrap().unwrap();
    assert_eq!(current.status, DocumentStatus::Processing);
    assert!(s.kb.chunks(doc.id).await.unwrap().is_empty());

    embedder.open(1);
    assert!(handle.wait().await.success);

    let done = s.kb.document(doc.id).await.unwrap().unwrap();
    assert_eq!(done.status, DocumentStatus::Completed);
    assert!(done.processed_at.is_some());

    assert_eq!(
        events.recv().await.unwrap(),
        IngestEvent::Started { document_id: doc.id }
    );
    assert_eq!(
        events.recv().await.unwrap(),
        IngestEvent::Completed {
            document_id: doc.id,
            chunks_created: 1
        }
    );
}

#[tokio::test]
async fn test_failed_extraction_ends_in_error() {
    let s = setup();
    let (doc, handle) = s
        .kb
        .upload(UploadRequest {
            original_name: "broken.txt".to_string(),
            mime_type: "text/plain".to_string(),
            bytes: vec![0xff, 0xfe, 0xfd],
        })
        .await
        .unwrap();

    let result = handle.wait().await;
    assert!(!result.success);
    assert!(result.error.unwrap().contains("UTF-8"));

    let doc = s.kb.document(doc.id).await.unwrap().unwrap();
    assert_eq!(doc.status, DocumentStatus::Error);
    assert_eq!(doc.chunk_count, 0);
    assert!(s.kb.chunks(doc.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cascade_delete() {
    let s = setup();
    let (keep, h1) = s.kb.upload(text("keep.txt", "shared words kept here")).await.unwrap();
    let (gone, h2) = s.kb.upload(text("gone.txt", "shared words removed here")).await.unwrap();
    h1.wait().await;
    h2.wait().await;
    assert_eq!(s.index.len(), 2);

    assert!(s.kb.delete_document(gone.id).await.unwrap());
    assert!(!s.kb.delete_document(gone.id).await.unwrap());

    assert!(s.kb.document(gone.id).await.unwrap().is_none());
    assert!(s.kb.chunks(gone.id).await.unwrap().is_empty());
    assert!(!s.index.has_document(gone.id));
    assert!(s.uploads.load(gone.id).await.is_err());

    let result = s.kb.retrieve("shared words removed here").await;
    assert!(result.sources.iter().all(|src| src.document_name == "keep.txt"));
    assert_eq!(result.len(), 1);

    let docs = s.kb.documents().await.unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].id, keep.id);
}

#[tokio::test]
async fn test_delete_during_processing_cleans_up() {
    let embedder = Arc::new(GatedEmbedder::new());
    let s = setup_with(embedder.clone());

    let body = words("x", 2000); // fragment 3개
    let (doc, handle) = s.kb.upload(text("midway.txt", &body)).await.unwrap();

    embedder.entered.notified().await;
    embedder.open(1);
    // 두 번째 fragment에서 다시 멈춤
    embedder.entered.notified().await;
    assert!(s.kb.delete_document(doc.id).await.unwrap());
    embedder.open(10);

    let result = handle.wait().await;
    assert!(!result.success);
    assert!(!s.index.has_document(doc.id));
    assert!(s.kb.chunks(doc.id).await.unwrap().is_empty());
    assert!(s.kb.document(doc.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_retrieval_degrades_when_embedding_fails() {
    let embedder = Arc::new(SwitchableEmbedder {
        inner: HashEmbedding::with_dimension(DIM),
        broken: AtomicBool::new(false),
    });
    let s = setup_with(embedder.clone());

    let (_, handle) = s.kb.upload(text("a.txt", "quarterly revenue grew")).await.unwrap();
    assert!(handle.wait().await.success);
    assert_eq!(s.kb.retrieve("quarterly revenue grew").await.len(), 1);

    embedder.broken.store(true, Ordering::SeqCst);
    let result = s.kb.retrieve("quarterly revenue grew").await;
    assert!(result.contexts.is_empty());
    assert!(result.sources.is_empty());

    // 검색이 비어도 답변은 생성
    let exchange = s.kb.ask("quarterly revenue grew").await.unwrap();
    assert!(exchange.sources.is_empty());
    assert_eq!(exchange.response, "answer from 0 contexts");
}

#[tokio::test]
async fn test_concurrent_ingestion() {
    let s = setup();
    let mut ids = Vec::new();
    for i in 0..10 {
        let body = words(&format!("d{}w", i), 900 + i * 100);
        let (doc, _) = s.kb.upload(text(&format!("doc{}.txt", i), &body)).await.unwrap();
        ids.push(doc.id);
    }

    s.kb.wait_idle().await;

    let mut total = 0;
    for id in ids {
        let doc = s.kb.document(id).await.unwrap().unwrap();
        assert_eq!(doc.status, DocumentStatus::Completed);
        let chunks = s.kb.chunks(id).await.unwrap();
        assert_eq!(chunks.len(), doc.chunk_count);
        for (expected, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, expected);
            assert_eq!(chunk.document_id, id);
        }
        total += chunks.len();
    }
    assert_eq!(s.index.len(), total);
}

#[tokio::test]
async fn test_ask_records_provenance() {
    let s = setup();
    let policy = "employees receive fifteen vacation days per calendar year";
    let (_, h1) = s.kb.upload(text("handbook.txt", policy)).await.unwrap();
    let (_, h2) = s
        .kb
        .upload(text("infra.txt", "deployments run through the staging cluster first"))
        .await
        .unwrap();
    h1.wait().await;
    h2.wait().await;

    let exchange = s.kb.ask(&format!("  {}  ", policy)).await.unwrap();
    assert_eq!(exchange.query, policy);
    assert_eq!(exchange.response, "answer from 2 contexts");
    assert_eq!(exchange.sources.len(), 2);
    assert_eq!(exchange.sources[0].document_name, "handbook.txt");
    assert_eq!(exchange.sources[0].chunk_index, 0);

    let calls = s.generator.calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, policy);
    assert_eq!(calls[0].1[0], policy);

    let history = s.kb.chat_history().await.unwrap();
    assert_eq!(history, vec![exchange]);

    assert_eq!(s.kb.clear_chat_history().await.unwrap(), 1);
    assert!(s.kb.chat_history().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_index_records_match_fingerprints() {
    let s = setup();
    let (doc, handle) = s.kb.upload(text("a.txt", "  deterministic   embedding text ")).await.unwrap();
    handle.wait().await;

    let chunks = s.kb.chunks(doc.id).await.unwrap();
    assert_eq!(chunks[0].content, "deterministic embedding text");
    assert_eq!(chunks[0].embedding, fingerprint("deterministic embedding text", DIM));

    let hits = s.index.query(&chunks[0].embedding, 1).unwrap();
    assert_eq!(hits[0].chunk_id, chunks[0].id);
    assert!((hits[0].similarity - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_shutdown_waits_for_in_flight_work() {
    let s = setup();
    let (doc, _) = s.kb.upload(text("a.txt", "finish before shutdown")).await.unwrap();

    s.kb.shutdown().await;

    let doc = s.kb.document(doc.id).await.unwrap().unwrap();
    assert_eq!(doc.status, DocumentStatus::Completed);
    assert!(matches!(
        s.kb.upload(text("b.txt", "too late")).await,
        Err(RagError::WorkerClosed)
    ));
}
