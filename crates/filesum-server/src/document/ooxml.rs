//! Helpers for reading parts out of Office Open XML (zip) containers.

use quick_xml::events::{BytesRef, BytesStart, BytesText};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;

use crate::utils::error::ExtractError;

pub(crate) fn open_archive(path: &Path) -> Result<ZipArchive<File>, ExtractError> {
    let file = File::open(path)?;
    ZipArchive::new(file)
        .map_err(|e| ExtractError::DecodeError(format!("Not a valid Office archive: {}", e)))
}

pub(crate) fn read_part(archive: &mut ZipArchive<File>, name: &str) -> Result<String, ExtractError> {
    let mut part = archive
        .by_name(name)
        .map_err(|e| ExtractError::DecodeError(format!("Missing part {}: {}", name, e)))?;
    let mut xml = String::new();
    part.read_to_string(&mut xml)
        .map_err(|e| ExtractError::DecodeError(format!("Failed to read {}: {}", name, e)))?;
    Ok(xml)
}

pub(crate) fn has_part(archive: &mut ZipArchive<File>, name: &str) -> bool {
    archive.by_name(name).is_ok()
}

pub(crate) fn xml_error(err: impl std::fmt::Display) -> ExtractError {
    ExtractError::DecodeError(format!("Malformed XML: {}", err))
}

/// Append a text event, unescaping any entity that is still inline.
pub(crate) fn push_text(buf: &mut String, text: &BytesText<'_>) -> Result<(), ExtractError> {
    let raw = std::str::from_utf8(text).map_err(xml_error)?;
    let unescaped = quick_xml::escape::unescape(raw).map_err(xml_error)?;
    buf.push_str(&unescaped);
    Ok(())
}

/// Append an entity reference (`&amp;`, `&#20013;`, ...) reported as its own event.
pub(crate) fn push_entity(buf: &mut String, entity: &BytesRef<'_>) -> Result<(), ExtractError> {
    let name = std::str::from_utf8(entity).map_err(xml_error)?;

    if let Some(code) = name.strip_prefix('#') {
        let value = match code.strip_prefix('x').or_else(|| code.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16),
            None => code.parse::<u32>(),
        }
        .map_err(xml_error)?;
        let ch = char::from_u32(value)
            .ok_or_else(|| xml_error(format!("invalid character reference &{};", name)))?;
        buf.push(ch);
        return Ok(());
    }

    let resolved = match name {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        other => return Err(xml_error(format!("unknown entity &{};", other))),
    };
    buf.push_str(resolved);
    Ok(())
}

pub(crate) fn attr_value(element: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .map(|attr| String::from_utf8_lossy(&attr.value).into_owned())
}
