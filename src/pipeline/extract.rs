//! Text extraction from uploaded documents.
//!
//! Dispatches on MIME type to one of three stateless strategies: PDF text extraction,
//! word-processor (DOCX) raw-text extraction, or a plain-text read. Anything else is an
//! unsupported file type. Each strategy is a pure transform from a file path to text.

use crate::pipeline::types::DocumentError;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::io::Read;
use std::path::Path;

/// MIME type of DOCX word-processing documents.
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Extract plain text from `path` according to its MIME type.
pub fn extract_text(path: &Path, mime_type: &str) -> Result<String, DocumentError> {
    match mime_type {
        "application/pdf" => pdf_text(path),
        DOCX_MIME => docx_text(path),
        "text/plain" => plain_text(path),
        other => Err(DocumentError::UnsupportedFileType(other.to_string())),
    }
}

fn plain_text(path: &Path) -> Result<String, DocumentError> {
    std::fs::read_to_string(path).map_err(|source| DocumentError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn pdf_text(path: &Path) -> Result<String, DocumentError> {
    let bytes = std::fs::read(path).map_err(|source| DocumentError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let doc = lopdf::Document::load_mem(&bytes).map_err(|err| DocumentError::PdfExtraction {
        name: display_name(path),
        reason: err.to_string(),
    })?;

    let mut text = String::new();
    for (page_num, _) in doc.get_pages() {
        if let Ok(page_text) = doc.extract_text(&[page_num]) {
            text.push_str(&page_text);
            text.push('\n');
        }
    }

    Ok(text)
}

fn docx_text(path: &Path) -> Result<String, DocumentError> {
    let file = std::fs::File::open(path).map_err(|source| DocumentError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let mut archive =
        zip::ZipArchive::new(file).map_err(|err| DocumentError::WordExtraction {
            name: display_name(path),
            reason: format!("Failed to open DOCX: {err}"),
        })?;

    let mut document_xml =
        archive
            .by_name("word/document.xml")
            .map_err(|err| DocumentError::WordExtraction {
                name: display_name(path),
                reason: format!("Failed to find document.xml: {err}"),
            })?;

    let mut xml_content = String::new();
    document_xml
        .read_to_string(&mut xml_content)
        .map_err(|err| DocumentError::WordExtraction {
            name: display_name(path),
            reason: format!("Failed to read document.xml: {err}"),
        })?;

    parse_docx_xml(&xml_content).map_err(|reason| DocumentError::WordExtraction {
        name: display_name(path),
        reason,
    })
}

/// Walk the WordprocessingML body, collecting `w:t` runs and breaking on `w:p` paragraphs.
fn parse_docx_xml(xml: &str) -> Result<String, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut text = String::new();
    let mut in_text_element = false;
    let mut in_paragraph = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref element)) => match element.local_name().as_ref() {
                b"t" => in_text_element = true,
                b"p" => in_paragraph = true,
                _ => {}
            },
            Ok(Event::End(ref element)) => match element.local_name().as_ref() {
                b"t" => in_text_element = false,
                b"p" => {
                    if in_paragraph {
                        text.push('\n');
                        in_paragraph = false;
                    }
                }
                _ => {}
            },
            Ok(Event::Text(content)) => {
                if in_text_element {
                    let decoded = content.xml_content().unwrap_or_default();
                    text.push_str(&decoded);
                }
            }
            Ok(Event::Eof) => break,
            Err(err) => return Err(format!("XML parsing error: {err}")),
            _ => {}
        }
    }

    Ok(text)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("document")
        .to_string()
}
