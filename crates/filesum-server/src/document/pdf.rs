use lopdf::Document as PdfDocument;
use std::path::Path;
use tracing::debug;

use crate::utils::error::ExtractError;

/// Parse PDF using lopdf. Page texts joined by a single space, page order kept.
pub(crate) fn extract_pdf(path: &Path) -> Result<String, ExtractError> {
    let doc = PdfDocument::load(path)
        .map_err(|e| ExtractError::DecodeError(format!("Failed to load PDF file: {}", e)))?;
    let pages = doc.get_pages();

    let mut texts = Vec::with_capacity(pages.len());
    for page_num in pages.keys() {
        let text = doc.extract_text(&[*page_num]).map_err(|e| {
            ExtractError::DecodeError(format!("Failed to extract text from page {}: {}", page_num, e))
        })?;
        texts.push(text);
    }

    debug!("PDF {:?}: {} pages", path, texts.len());
    Ok(texts.join(" "))
}
