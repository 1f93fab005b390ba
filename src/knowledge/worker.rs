//! Ingestion Worker - 백그라운드 문서 수집
//!
//! 업로드 요청은 파이프라인 완료를 기다리지 않고 반환합니다. 각 문서는 별도
//! tokio 태스크에서 처리되고, 진행 상황은 broadcast 채널로 알립니다.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, Notify, Semaphore};
use tokio::task::JoinHandle;

use crate::error::{RagError, Result};
use crate::knowledge::pipeline::{IngestionPipeline, ProcessingResult};
use crate::knowledge::DocumentId;

/// 이벤트 채널 버퍼 크기
const EVENT_CAPACITY: usize = 256;

// ============================================================================
// Events & Handles
// ============================================================================

/// 수집 진행 이벤트
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestEvent {
    Started {
        document_id: DocumentId,
    },
    Completed {
        document_id: DocumentId,
        chunks_created: usize,
    },
    Failed {
        document_id: DocumentId,
        error: String,
    },
}

impl IngestEvent {
    pub fn document_id(&self) -> DocumentId {
        match self {
            IngestEvent::Started { document_id }
            | IngestEvent::Completed { document_id, .. }
            | IngestEvent::Failed { document_id, .. } => *document_id,
        }
    }
}

/// 제출된 수집 작업 핸들
///
/// 버려도 작업은 계속 진행됩니다.
#[derive(Debug)]
pub struct IngestHandle {
    document_id: DocumentId,
    task: JoinHandle<ProcessingResult>,
}

impl IngestHandle {
    pub fn document_id(&self) -> DocumentId {
        self.document_id
    }

    /// 처리 완료까지 대기
    pub async fn wait(self) -> ProcessingResult {
        match self.task.await {
            Ok(result) => result,
            Err(e) => ProcessingResult::failed(format!("ingestion task aborted: {}", e)),
        }
    }
}

// ============================================================================
// Pending Tracker
// ============================================================================

/// 대기 중인 작업 수 추적
#[derive(Debug, Default)]
struct Pending {
    count: AtomicUsize,
    idle: Notify,
}

impl Pending {
    async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            // 카운트 확인 전에 등록해야 알림을 놓치지 않음
            notified.as_mut().enable();
            if self.count.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// 태스크 종료 시 (panic 포함) 카운트 감소
struct PendingGuard(Arc<Pending>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.0.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

// ============================================================================
// IngestionWorker
// ============================================================================

/// 수집 워커
///
/// 동시에 실행되는 파이프라인 수는 세마포어로 제한합니다.
pub struct IngestionWorker {
    pipeline: Arc<IngestionPipeline>,
    permits: Arc<Semaphore>,
    update_tx: broadcast::Sender<IngestEvent>,
    pending: Arc<Pending>,
    closed: AtomicBool,
}

impl IngestionWorker {
    pub fn new(pipeline: Arc<IngestionPipeline>, max_concurrent: usize) -> Self {
        let (update_tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            pipeline,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            update_tx,
            pending: Arc::new(Pending::default()),
            closed: AtomicBool::new(false),
        }
    }

    /// 수집 이벤트 구독
    pub fn subscribe(&self) -> broadcast::Receiver<IngestEvent> {
        self.update_tx.subscribe()
    }

    /// 처리 대기/진행 중인 작업 수
    pub fn pending(&self) -> usize {
        self.pending.count.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// 문서 수집 작업 제출 (즉시 반환)
    ///
    /// tokio 런타임 안에서 호출해야 합니다.
    pub fn submit(&self, document_id: DocumentId) -> Result<IngestHandle> {
        if self.is_closed() {
            return Err(RagError::WorkerClosed);
        }

        self.pending.count.fetch_add(1, Ordering::SeqCst);
        let guard = PendingGuard(self.pending.clone());
        let pipeline = self.pipeline.clone();
        let permits = self.permits.clone();
        let update_tx = self.update_tx.clone();

        let task = tokio::spawn(async move {
            let _guard = guard;
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return ProcessingResult::failed(RagError::WorkerClosed),
            };

            let _ = update_tx.send(IngestEvent::Started { document_id });
            let result = pipeline.ingest(document_id).await;

            let event = if result.success {
                IngestEvent::Completed {
                    document_id,
                    chunks_created: result.chunks_created,
                }
            } else {
                IngestEvent::Failed {
                    document_id,
                    error: result.error.clone().unwrap_or_default(),
                }
            };
            let _ = update_tx.send(event);
            result
        });

        tracing::debug!("Submitted document {} for ingestion", document_id);
        Ok(IngestHandle { document_id, task })
    }

    /// 제출된 모든 작업이 끝날 때까지 대기
    pub async fn wait_idle(&self) {
        self.pending.wait_idle().await;
    }

    /// 새 작업 접수를 멈추고 진행 중인 작업 완료까지 대기
    pub async fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let pending = self.pending();
        if pending > 0 {
            tracing::info!("Waiting for {} ingestion tasks", pending);
        }
        self.wait_idle().await;
    }
}

// ============================================================================
// Tests
// ============================================================================
