use std::path::Path;
use tracing::{debug, warn};

use super::format::{DocumentFormat, Generation};
use super::{markup, office, pdf, spreadsheet, text};
use crate::config::ExtractorConfig;
use crate::utils::error::ExtractError;

/// Format-dispatching content extractor.
///
/// Checks the size limit before any format work, then hands the file to the
/// decoder of its [`DocumentFormat`]. Callers only ever see text or an
/// [`ExtractError`]; decoders fail closed.
#[derive(Debug, Clone)]
pub struct DocumentParser {
    max_file_size_kb: u64,
    word_converter: String,
}

impl DocumentParser {
    pub fn new(max_file_size_kb: u64, config: &ExtractorConfig) -> Self {
        Self {
            max_file_size_kb,
            word_converter: config.word_converter.clone(),
        }
    }

    /// Extract with the configured size limit
    pub fn extract(&self, path: &Path) -> Result<String, ExtractError> {
        self.extract_with_limit(path, self.max_file_size_kb)
    }

    pub fn extract_with_limit(&self, path: &Path, size_limit_kb: u64) -> Result<String, ExtractError> {
        check_size(path, size_limit_kb)?;

        let format = DocumentFormat::from_path(path).ok_or_else(|| {
            let extension = path
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            ExtractError::UnsupportedFormat(extension)
        })?;

        debug!("Parsing file: {:?} (type: {})", path, format);

        let content = match format {
            DocumentFormat::Pdf => pdf::extract_pdf(path),
            DocumentFormat::Word(Generation::OpenXml) => office::extract_docx(path),
            DocumentFormat::Word(Generation::Legacy) => {
                office::extract_legacy_doc(path, &self.word_converter)
            }
            DocumentFormat::Markdown => markup::extract_markdown(path),
            DocumentFormat::PlainText => text::extract_plain_text(path),
            DocumentFormat::Spreadsheet(Generation::OpenXml) => spreadsheet::extract_xlsx(path),
            DocumentFormat::Spreadsheet(Generation::Legacy) => spreadsheet::extract_xls(path),
            DocumentFormat::Csv => spreadsheet::extract_csv(path),
            DocumentFormat::Html => markup::extract_html(path),
            DocumentFormat::Presentation(Generation::OpenXml) => office::extract_pptx(path),
            DocumentFormat::Presentation(Generation::Legacy) => {
                Err(ExtractError::UnsupportedFormat(format.to_string()))
            }
        }
        .inspect_err(|e| warn!("Failed to extract {:?} as {}: {}", path, format, e))?;

        if content.trim().is_empty() {
            return Err(ExtractError::EmptyContent);
        }

        debug!("Parsed {} characters from {:?}", content.chars().count(), path);
        Ok(content)
    }
}

fn check_size(path: &Path, limit_kb: u64) -> Result<(), ExtractError> {
    let size_bytes = std::fs::metadata(path)?.len();
    if size_bytes > limit_kb.saturating_mul(1024) {
        let size_kb = size_bytes.div_ceil(1024);
        warn!(
            "File size ({}KB) exceeds limit ({}KB): {:?}",
            size_kb, limit_kb, path
        );
        return Err(ExtractError::SizeExceeded { size_kb, limit_kb });
    }
    Ok(())
}
