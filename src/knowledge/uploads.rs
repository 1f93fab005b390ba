//! Upload Byte Store - 업로드 원본 바이트 저장소
//!
//! 파이프라인은 문서 ID로 원본 바이트를 다시 읽습니다.
//! 저장 위치 (파일 저장소 기본값): ~/.local/share/.palank-docs/uploads

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{RagError, Result};
use crate::knowledge::DocumentId;

// ============================================================================
// Data Directory
// ============================================================================

/// 데이터 디렉토리 경로 (~/.local/share/.palank-docs/)
pub fn get_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".palank-docs")
}

// ============================================================================
// ByteStore Trait
// ============================================================================

/// 저장된 업로드
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// 업로드 바이트 저장소 트레이트 (async)
#[async_trait]
pub trait ByteStore: Send + Sync {
    /// 문서의 원본 바이트 저장 (같은 ID는 덮어씀)
    async fn save(&self, document_id: DocumentId, bytes: Vec<u8>, mime_type: &str) -> Result<()>;

    /// 원본 바이트 로드, 없으면 `DocumentNotFound`
    async fn load(&self, document_id: DocumentId) -> Result<StoredUpload>;

    /// 원본 바이트 삭제, 삭제 여부 반환
    async fn remove(&self, document_id: DocumentId) -> Result<bool>;
}

// ============================================================================
// MemoryByteStore
// ============================================================================

/// 메모리 바이트 저장소
#[derive(Debug, Default)]
pub struct MemoryByteStore {
    uploads: RwLock<HashMap<DocumentId, StoredUpload>>,
}

impl MemoryByteStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ByteStore for MemoryByteStore {
    async fn save(&self, document_id: DocumentId, bytes: Vec<u8>, mime_type: &str) -> Result<()> {
        let upload = StoredUpload {
            bytes,
            mime_type: mime_type.to_string(),
        };
        self.uploads
            .write()
            .map_err(RagError::storage)?
            .insert(document_id, upload);
        Ok(())
    }

    async fn load(&self, document_id: DocumentId) -> Result<StoredUpload> {
        self.uploads
            .read()
            .map_err(RagError::storage)?
            .get(&document_id)
            .cloned()
            .ok_or(RagError::DocumentNotFound(document_id))
    }

    async fn remove(&self, document_id: DocumentId) -> Result<bool> {
        Ok(self
            .uploads
            .write()
            .map_err(RagError::storage)?
            .remove(&document_id)
            .is_some())
    }
}

// ============================================================================
// FsByteStore
// ============================================================================

/// 파일 시스템 바이트 저장소
///
/// 파일 이름은 UUID v4이며, 문서 ID → (파일 경로, MIME) 매핑은 메모리에 둡니다.
#[derive(Debug)]
pub struct FsByteStore {
    dir: PathBuf,
    entries: RwLock<HashMap<DocumentId, (PathBuf, String)>>,
}

impl FsByteStore {
    /// 디렉토리 열기 (없으면 생성)
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            entries: RwLock::new(HashMap::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry(&self, document_id: DocumentId) -> Result<Option<(PathBuf, String)>> {
        Ok(self
            .entries
            .read()
            .map_err(RagError::storage)?
            .get(&document_id)
            .cloned())
    }
}

#[async_trait]
impl ByteStore for FsByteStore {
    async fn save(&self, document_id: DocumentId, bytes: Vec<u8>, mime_type: &str) -> Result<()> {
        let path = self.dir.join(uuid::Uuid::new_v4().to_string());
        tokio::fs::write(&path, &bytes).await?;

        let previous = self
            .entries
            .write()
            .map_err(RagError::storage)?
            .insert(document_id, (path, mime_type.to_string()));

        if let Some((old_path, _)) = previous {
            if let Err(e) = tokio::fs::remove_file(&old_path).await {
                tracing::debug!("Failed to remove replaced upload {}: {}", old_path.display(), e);
            }
        }
        Ok(())
    }

    async fn load(&self, document_id: DocumentId) -> Result<StoredUpload> {
        let (path, mime_type) = self
            .entry(document_id)?
            .ok_or(RagError::DocumentNotFound(document_id))?;
        let bytes = tokio::fs::read(&path).await?;
        Ok(StoredUpload { bytes, mime_type })
    }

    async fn remove(&self, document_id: DocumentId) -> Result<bool> {
        let removed = self
            .entries
            .write()
            .map_err(RagError::storage)?
            .remove(&document_id);

        match removed {
            Some((path, _)) => {
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
