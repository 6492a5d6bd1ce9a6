use encoding_rs::{GB18030, GBK, UTF_8};
use std::fmt;
use std::path::Path;

use crate::utils::error::ExtractError;

/// Encodings tried for plain text, in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Gbk,
    Gb18030,
    Ascii,
}

const DECODE_ORDER: [TextEncoding; 4] = [
    TextEncoding::Utf8,
    TextEncoding::Gbk,
    TextEncoding::Gb18030,
    TextEncoding::Ascii,
];

impl TextEncoding {
    fn decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            Self::Utf8 => {
                let (text, had_errors) = UTF_8.decode_with_bom_removal(bytes);
                (!had_errors).then(|| text.into_owned())
            }
            Self::Gbk => GBK
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(|text| text.into_owned()),
            Self::Gb18030 => GB18030
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(|text| text.into_owned()),
            Self::Ascii => bytes
                .is_ascii()
                .then(|| String::from_utf8_lossy(bytes).into_owned()),
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Utf8 => "UTF-8",
            Self::Gbk => "GBK",
            Self::Gb18030 => "GB18030",
            Self::Ascii => "ASCII",
        })
    }
}

/// First successful decode wins; no lossy replacement.
pub fn decode_text(bytes: &[u8]) -> Result<(String, TextEncoding), ExtractError> {
    DECODE_ORDER
        .iter()
        .find_map(|encoding| encoding.decode(bytes).map(|text| (text, *encoding)))
        .ok_or_else(|| {
            ExtractError::DecodeError(format!(
                "none of {} could decode the file",
                DECODE_ORDER
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })
}

pub(crate) fn extract_plain_text(path: &Path) -> Result<String, ExtractError> {
    let raw = std::fs::read(path)?;
    let (text, encoding) = decode_text(&raw)?;
    tracing::debug!("Decoded {:?} as {}", path, encoding);
    Ok(text)
}
