//! PDF 텍스트 추출 모듈
//!
//! pdf-extract 크레이트를 사용하여 PDF에서 텍스트를 추출합니다.
//! 레이아웃/컬럼 복원은 하지 않습니다.

use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::error::{RagError, Result};

/// PDF 바이트에서 텍스트 추출
///
/// 모든 페이지의 텍스트를 페이지 순서대로 이어 붙이고,
/// 페이지 사이는 줄바꿈 하나로 구분합니다.
pub fn extract_text_from_pdf(bytes: &[u8]) -> Result<String> {
    // pdf-extract는 일부 손상된 입력에서 panic 하므로 에러로 변환
    let pages = catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
    }))
    .map_err(|_| RagError::ExtractionFailure("PDF parser panicked on malformed input".to_string()))?
    .map_err(|e| RagError::ExtractionFailure(format!("Failed to extract text from PDF: {}", e)))?;

    let text = join_pages(&pages);
    if text.is_empty() {
        tracing::warn!("No text extracted from PDF. It might be a scanned document.");
    }

    Ok(text)
}

/// 페이지별 텍스트를 줄바꿈으로 연결
///
/// 각 페이지는 앞뒤 공백을 제거하고, 빈 페이지는 제외합니다.
fn join_pages(pages: &[String]) -> String {
    pages
        .iter()
        .map(|page| page.trim())
        .filter(|page| !page.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

// ============================================================================
// Tests
// ============================================================================
