//! DOCX 텍스트 추출 모듈
//!
//! DOCX는 ZIP 아카이브이며 본문은 `word/document.xml`에 있습니다.
//! 텍스트 런(`w:t`)만 모으고 서식 정보는 버립니다.

use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{RagError, Result};

/// 본문 XML 경로
const DOCUMENT_PART: &str = "word/document.xml";

/// ZIP 엔트리 최대 압축 해제 크기 (zip-bomb 방지)
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// DOCX 바이트에서 텍스트 추출
///
/// 문단은 빈 줄로 구분되고, `w:tab`은 탭, `w:br`/`w:cr`은 줄바꿈이 됩니다.
pub fn extract_text_from_docx(bytes: &[u8]) -> Result<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| RagError::ExtractionFailure(format!("unreadable DOCX archive: {}", e)))?;

    let entry = archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| RagError::ExtractionFailure(format!("{} not found: {}", DOCUMENT_PART, e)))?;

    let mut xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut xml)
        .map_err(|e| RagError::ExtractionFailure(format!("failed to read {}: {}", DOCUMENT_PART, e)))?;

    if xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(RagError::ExtractionFailure(format!(
            "{} exceeds size limit ({} bytes)",
            DOCUMENT_PART, MAX_XML_ENTRY_BYTES
        )));
    }

    let text = extract_runs(&xml)?;
    Ok(text.trim().to_string())
}

/// WordprocessingML에서 텍스트 런 추출
fn extract_runs(xml: &[u8]) -> Result<String> {
    let mut out = String::new();
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text = true;
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => out.push_str("\n\n"),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" => out.push('\t'),
                b"br" | b"cr" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Text(te)) if in_text => {
                let text = te
                    .unescape()
                    .map_err(|e| RagError::ExtractionFailure(format!("malformed DOCX text: {}", e)))?;
                out.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(RagError::ExtractionFailure(format!(
                    "malformed DOCX XML at {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(out)
}

// ============================================================================
// Tests
// ============================================================================
