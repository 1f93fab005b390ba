//! Text Chunking Module
//!
//! 단어 단위 슬라이딩 윈도우로 텍스트를 겹치는 청크로 나눕니다.
//! 윈도우 크기 1000 단어, 겹침 200 단어 (stride 800).

// ============================================================================
// Chunk Configuration
// ============================================================================

/// 청크당 최대 단어 수
pub const CHUNK_SIZE: usize = 1000;

/// 연속 청크 간 겹치는 단어 수
pub const CHUNK_OVERLAP: usize = 200;

/// 청킹 설정 (단어 단위)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    /// 청크당 최대 단어 수
    pub size: usize,
    /// 겹침 단어 수 (`size`보다 작아야 함)
    pub overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            size: CHUNK_SIZE,
            overlap: CHUNK_OVERLAP,
        }
    }
}

impl ChunkConfig {
    /// 윈도우 시작 위치 간격
    pub fn stride(&self) -> usize {
        self.size - self.overlap
    }
}

impl From<&crate::config::ChunkingConfig> for ChunkConfig {
    fn from(config: &crate::config::ChunkingConfig) -> Self {
        Self {
            size: config.size,
            overlap: config.overlap,
        }
    }
}

// ============================================================================
// Chunker Trait
// ============================================================================

/// 텍스트 청킹 전략 트레이트
pub trait Chunker: Send + Sync {
    /// 텍스트를 청크로 분할
    fn chunk(&self, text: &str) -> Vec<String>;

    /// 청커 이름
    fn name(&self) -> &'static str;
}

// ============================================================================
// WordWindowChunker
// ============================================================================

/// 단어 윈도우 청커
///
/// 청크 `i`는 단어 `[i*stride, i*stride+size)` 범위이며,
/// 윈도우 시작이 단어 수 이상이 되면 멈춥니다.
#[derive(Debug, Clone, Default)]
pub struct WordWindowChunker {
    config: ChunkConfig,
}

impl WordWindowChunker {
    /// 설정으로 생성
    ///
    /// # Panics
    /// `overlap >= size`이면 panic (설정 검증은 `RagConfig::validate`에서 수행)
    pub fn new(config: ChunkConfig) -> Self {
        assert!(
            config.overlap < config.size,
            "chunk overlap must be smaller than chunk size"
        );
        Self { config }
    }

    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }
}

impl Chunker for WordWindowChunker {
    fn chunk(&self, text: &str) -> Vec<String> {
        chunk_words(text, self.config.size, self.config.overlap)
    }

    fn name(&self) -> &'static str {
        "word-window"
    }
}

/// 기본 청커 (1000 단어 / 200 겹침)
pub fn default_chunker() -> Box<dyn Chunker> {
    Box::new(WordWindowChunker::default())
}

/// 텍스트를 단어 윈도우 청크로 분할
///
/// # Arguments
/// * `text` - 분할할 텍스트
/// * `chunk_size` - 청크 당 단어 수
/// * `overlap` - 청크 간 중첩 단어 수
///
/// # Returns
/// 단어를 공백 하나로 이은 청크 목록 (빈 청크 제외)
pub fn chunk_words(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let stride = chunk_size.saturating_sub(overlap).max(1);

    (0..words.len())
        .step_by(stride)
        .map(|start| {
            let end = (start + chunk_size).min(words.len());
            words[start..end].join(" ")
        })
        .map(|chunk| chunk.trim().to_string())
        .filter(|chunk| !chunk.is_empty())
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered_words(n: usize) -> String {
        (0..n).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ")
    }

    fn words_of(chunk: &str) -> Vec<&str> {
        chunk.split(' ').collect()
    }

    #[test]
    fn test_chunk_words_small_example() {
        let chunks = chunk_words("a b c d e f g h i j", 4, 1);
        assert_eq!(chunks, vec!["a b c d", "d e f g", "g h i j", "j"]);
    }

    #[test]
    fn test_empty_text() {
        assert!(chunk_words("", 1000, 200).is_empty());
        assert!(chunk_words("  \n\t ", 1000, 200).is_empty());
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = chunk_words("  hello\n\n   world  ", 1000, 200);
        assert_eq!(chunks, vec!["hello world"]);
    }

    #[test]
    fn test_1500_words() {
        let text = numbered_words(1500);
        let chunks = WordWindowChunker::default().chunk(&text);

        assert_eq!(chunks.len(), 2);
        let first = words_of(&chunks[0]);
        let second = words_of(&chunks[1]);
        assert_eq!(first.len(), 1000);
        assert_eq!(first[0], "w0");
        assert_eq!(first[999], "w999");
        assert_eq!(second.len(), 700);
        assert_eq!(second[0], "w800");
        assert_eq!(second[699], "w1499");
    }

    #[test]
    fn test_exactly_one_window_emits_tail() {
        // 시작 위치 800 < 1000 이므로 두 번째 (짧은) 청크가 생김
        let chunks = chunk_words(&numbered_words(1000), 1000, 200);
        assert_eq!(chunks.len(), 2);
        assert_eq!(words_of(&chunks[1]).len(), 200);
        assert_eq!(words_of(&chunks[1])[0], "w800");
    }

    #[test]
    fn test_chunk_count_follows_stride() {
        for n in [1, 799, 800, 801, 1600, 1601, 4321] {
            let chunks = chunk_words(&numbered_words(n), 1000, 200);
            assert_eq!(chunks.len(), n.div_ceil(800), "n = {}", n);
        }
    }

    #[test]
    fn test_consecutive_chunks_overlap() {
        let chunks = chunk_words(&numbered_words(3000), 1000, 200);
        for pair in chunks.windows(2) {
            let prev = words_of(&pair[0]);
            let next = words_of(&pair[1]);
            assert!(prev.len() <= 1000 && next.len() <= 1000);
            if next.len() >= 200 {
                assert_eq!(&prev[prev.len() - 200..], &next[..200]);
            }
        }
    }

    #[test]
    fn test_chunker_trait() {
        let chunker = default_chunker();
        assert_eq!(chunker.name(), "word-window");
        assert_eq!(chunker.chunk("one two three").len(), 1);
    }

    #[test]
    fn test_config_stride() {
        assert_eq!(ChunkConfig::default().stride(), 800);
    }

    #[test]
    #[should_panic(expected = "chunk overlap")]
    fn test_invalid_config_panics() {
        let _ = WordWindowChunker::new(ChunkConfig {
            size: 10,
            overlap: 10,
        });
    }
}
