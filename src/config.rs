//! 설정 모듈
//!
//! TOML 파일에서 파이프라인 설정을 읽습니다. 모든 섹션은 기본값을 가지므로
//! 설정 파일 없이 `RagConfig::default()`로도 동작합니다.
//!
//! ```toml
//! [chunking]
//! size = 1000
//! overlap = 200
//!
//! [retrieval]
//! top_k = 5
//! ```
//!
//! API 키는 설정 파일이 아닌 환경변수에서만 읽습니다 (`generation::get_api_key`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::embedding::DEFAULT_DIMENSION;
use crate::knowledge::{get_data_dir, CHUNK_OVERLAP, CHUNK_SIZE};

/// 업로드 최대 크기 (50MB)
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

// ============================================================================
// Config Types
// ============================================================================

/// 전체 설정
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    pub chunking: ChunkingConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
    pub ingestion: IngestionConfig,
    pub generation: GenerationConfig,
    pub storage: StorageConfig,
}

/// 청킹 설정 (단어 단위)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub size: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            size: CHUNK_SIZE,
            overlap: CHUNK_OVERLAP,
        }
    }
}

/// 임베딩 설정
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub dimension: usize,
    /// 청크 하나의 임베딩 제한 시간 (초)
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_DIMENSION,
            timeout_secs: 30,
        }
    }
}

impl EmbeddingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// 검색 설정
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 5 }
    }
}

/// 수집 설정
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// 동시에 실행되는 문서 파이프라인 수
    pub max_concurrent: usize,
    pub max_upload_bytes: u64,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// 텍스트 생성 설정 (Gemini)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            timeout_secs: 60,
            max_retries: 3,
        }
    }
}

/// 업로드 바이트 저장 설정
///
/// `upload_dir`이 있으면 그 디렉토리에, `persist_uploads`만 켜져 있으면
/// 기본 데이터 디렉토리에 저장합니다. 둘 다 없으면 메모리 저장소를 사용합니다.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub upload_dir: Option<PathBuf>,
    pub persist_uploads: bool,
}

impl StorageConfig {
    /// 파일 저장소 위치 (메모리 저장소면 None)
    pub fn upload_location(&self) -> Option<PathBuf> {
        match &self.upload_dir {
            Some(dir) => Some(dir.clone()),
            None if self.persist_uploads => Some(get_data_dir().join("uploads")),
            None => None,
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

/// 생성 요청 재시도 상한
pub const MAX_GENERATION_RETRIES: u32 = 10;

impl RagConfig {
    /// 설정 검증
    pub fn validate(&self) -> Result<()> {
        if self.chunking.size == 0 {
            bail!("chunking.size must be > 0");
        }
        if self.chunking.overlap >= self.chunking.size {
            bail!(
                "chunking.overlap ({}) must be smaller than chunking.size ({})",
                self.chunking.overlap,
                self.chunking.size
            );
        }
        if self.embedding.dimension == 0 {
            bail!("embedding.dimension must be > 0");
        }
        if self.embedding.timeout_secs == 0 {
            bail!("embedding.timeout_secs must be > 0");
        }
        if self.retrieval.top_k == 0 {
            bail!("retrieval.top_k must be >= 1");
        }
        if self.ingestion.max_concurrent == 0 {
            bail!("ingestion.max_concurrent must be >= 1");
        }
        if self.generation.timeout_secs == 0 {
            bail!("generation.timeout_secs must be > 0");
        }
        if self.generation.max_retries > MAX_GENERATION_RETRIES {
            bail!(
                "generation.max_retries ({}) must be <= {}",
                self.generation.max_retries,
                MAX_GENERATION_RETRIES
            );
        }
        Ok(())
    }
}

/// TOML 문자열에서 설정 파싱 및 검증
pub fn parse_config(content: &str) -> Result<RagConfig> {
    let config: RagConfig = toml::from_str(content).context("Failed to parse config")?;
    config.validate()?;
    Ok(config)
}

/// 설정 파일 로드
pub fn load_config(path: &Path) -> Result<RagConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Invalid config file: {}", path.display()))
}

// ============================================================================
// Tests
// ============================================================================
