//! 콘텐츠 추출 모듈
//!
//! 업로드된 바이트와 MIME 타입을 받아 평문 텍스트를 추출합니다.
//! - 텍스트 파일: UTF-8 디코딩
//! - PDF 파일: pdf-extract로 페이지별 텍스트 추출
//! - DOCX 파일: word/document.xml의 텍스트 런만 추출

pub mod docx;
pub mod pdf;

use crate::error::{RagError, Result};

/// 지원 MIME 타입
pub const MIME_TEXT: &str = "text/plain";
pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

// ============================================================================
// Document Format
// ============================================================================

/// 지원하는 문서 포맷
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// 평문 텍스트
    PlainText,
    /// PDF
    Pdf,
    /// Word (OOXML)
    Docx,
}

impl DocumentFormat {
    /// MIME 타입으로 포맷 결정
    ///
    /// 대소문자와 파라미터(`; charset=utf-8`)는 무시합니다.
    pub fn from_mime(mime_type: &str) -> Option<Self> {
        let essence = mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            MIME_TEXT => Some(DocumentFormat::PlainText),
            MIME_PDF => Some(DocumentFormat::Pdf),
            MIME_DOCX => Some(DocumentFormat::Docx),
            _ => None,
        }
    }
}

/// MIME 타입 지원 여부
pub fn is_supported(mime_type: &str) -> bool {
    DocumentFormat::from_mime(mime_type).is_some()
}

/// 바이트에서 텍스트 추출
///
/// 지원하지 않는 MIME 타입은 `UnsupportedFormat`,
/// 손상된 바이트는 `ExtractionFailure`를 반환합니다.
pub fn extract_text(bytes: &[u8], mime_type: &str) -> Result<String> {
    let format = DocumentFormat::from_mime(mime_type)
        .ok_or_else(|| RagError::UnsupportedFormat(mime_type.to_string()))?;

    match format {
        DocumentFormat::PlainText => decode_plain_text(bytes),
        DocumentFormat::Pdf => pdf::extract_text_from_pdf(bytes),
        DocumentFormat::Docx => docx::extract_text_from_docx(bytes),
    }
}

fn decode_plain_text(bytes: &[u8]) -> Result<String> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8(bytes.to_vec())
        .map_err(|e| RagError::ExtractionFailure(format!("text is not valid UTF-8: {}", e)))
}

// ============================================================================
// Content Extractor
// ============================================================================

/// 콘텐츠 추출기
///
/// PDF/DOCX 파싱은 CPU 바운드이므로 blocking 풀에서 실행합니다.
#[derive(Debug, Clone, Default)]
pub struct ContentExtractor;

impl ContentExtractor {
    pub fn new() -> Self {
        Self
    }

    /// 바이트에서 텍스트 추출 (async)
    pub async fn extract(&self, bytes: Vec<u8>, mime_type: &str) -> Result<String> {
        let mime_type = mime_type.to_string();
        tokio::task::spawn_blocking(move || extract_text(&bytes, &mime_type))
            .await
            .map_err(|e| RagError::ExtractionFailure(format!("extraction task failed: {}", e)))?
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_mime() {
        assert_eq!(
            DocumentFormat::from_mime("text/plain"),
            Some(DocumentFormat::PlainText)
        );
        assert_eq!(
            DocumentFormat::from_mime("Text/Plain; charset=utf-8"),
            Some(DocumentFormat::PlainText)
        );
        assert_eq!(
            DocumentFormat::from_mime(MIME_DOCX),
            Some(DocumentFormat::Docx)
        );
        assert_eq!(DocumentFormat::from_mime("image/png"), None);
        assert!(is_supported(MIME_PDF));
    }

    #[test]
    fn test_unsupported_mime_returns_error() {
        let err = extract_text(b"foo", "application/octet-stream").unwrap_err();
        assert!(matches!(err, RagError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_plain_text() {
        let text = extract_text("안녕하세요 world".as_bytes(), MIME_TEXT).unwrap();
        assert_eq!(text, "안녕하세요 world");
    }

    #[test]
    fn test_plain_text_strips_bom() {
        let text = extract_text(b"\xEF\xBB\xBFhello", MIME_TEXT).unwrap();
        assert_eq!(text, "hello");
    }

    #[test]
    fn test_invalid_utf8_is_extraction_failure() {
        let err = extract_text(&[0xff, 0xfe, 0x00, 0x41], MIME_TEXT).unwrap_err();
        assert!(matches!(err, RagError::ExtractionFailure(_)));
    }

    #[tokio::test]
    async fn test_async_extract() {
        let extractor = ContentExtractor::new();
        let text = extractor
            .extract(b"async text".to_vec(), MIME_TEXT)
            .await
            .unwrap();
        assert_eq!(text, "async text");

        let err = extractor.extract(b"x".to_vec(), "video/mp4").await.unwrap_err();
        assert!(matches!(err, RagError::UnsupportedFormat(_)));
    }
}
