use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Command;
use tracing::{debug, warn};

use super::ooxml::{attr_value, has_part, open_archive, push_entity, push_text, read_part, xml_error};
use super::text::decode_text;
use crate::utils::error::ExtractError;

/// Paragraph texts of `word/document.xml`, one paragraph per line.
pub(crate) fn extract_docx(path: &Path) -> Result<String, ExtractError> {
    let mut archive = open_archive(path)?;
    let xml = read_part(&mut archive, "word/document.xml")?;
    let paragraphs = docx_paragraphs(&xml)?;

    debug!("DOCX {:?}: {} paragraphs", path, paragraphs.len());
    Ok(paragraphs.join("\n"))
}

fn docx_paragraphs(xml: &str) -> Result<Vec<String>, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => match e.name().as_ref() {
                b"w:p" => current = Some(String::new()),
                b"w:t" => in_text = true,
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:p" => paragraphs.push(String::new()),
                b"w:tab" => {
                    if let Some(p) = current.as_mut() {
                        p.push('\t');
                    }
                }
                b"w:br" | b"w:cr" => {
                    if let Some(p) = current.as_mut() {
                        p.push('\n');
                    }
                }
                _ => {}
            },
            Event::End(e) => match e.name().as_ref() {
                b"w:p" => {
                    if let Some(p) = current.take() {
                        paragraphs.push(p);
                    }
                }
                b"w:t" => in_text = false,
                _ => {}
            },
            Event::Text(t) if in_text => {
                if let Some(p) = current.as_mut() {
                    push_text(p, &t)?;
                }
            }
            Event::GeneralRef(r) if in_text => {
                if let Some(p) = current.as_mut() {
                    push_entity(p, &r)?;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}

/// Shape texts of every slide, slides in presentation order, one shape per line.
pub(crate) fn extract_pptx(path: &Path) -> Result<String, ExtractError> {
    let mut archive = open_archive(path)?;
    let slides = slide_order(&mut archive)?;

    if slides.is_empty() {
        warn!("No slide files found in PPTX archive {:?}", path);
    }

    let mut lines = Vec::new();
    for slide in &slides {
        let xml = read_part(&mut archive, slide)?;
        lines.extend(slide_shape_texts(&xml)?);
    }

    debug!("PPTX {:?}: {} slides, {} text shapes", path, slides.len(), lines.len());
    Ok(lines.join("\n"))
}

/// Slide part names in the order listed by `ppt/presentation.xml`.
/// Falls back to numeric file-name order when the presentation part is absent.
fn slide_order(archive: &mut zip::ZipArchive<std::fs::File>) -> Result<Vec<String>, ExtractError> {
    if has_part(archive, "ppt/presentation.xml") && has_part(archive, "ppt/_rels/presentation.xml.rels") {
        let presentation = read_part(archive, "ppt/presentation.xml")?;
        let rels = read_part(archive, "ppt/_rels/presentation.xml.rels")?;
        let targets = relationship_targets(&rels)?;

        let mut reader = Reader::from_str(&presentation);
        let mut slides = Vec::new();
        loop {
            match reader.read_event().map_err(xml_error)? {
                Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"p:sldId" => {
                    let Some(rel_id) = attr_value(&e, b"r:id") else {
                        continue;
                    };
                    match targets.get(&rel_id) {
                        Some(target) => slides.push(resolve_target(target)),
                        None => warn!("Slide relationship {} has no target", rel_id),
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }
        return Ok(slides);
    }

    // Sort slides by number (slide1.xml, slide2.xml, ..., slide10.xml)
    let mut slides: Vec<(u32, String)> = archive
        .file_names()
        .filter(|name| name.starts_with("ppt/slides/slide") && name.ends_with(".xml"))
        .filter_map(|name| {
            let number = name
                .trim_start_matches("ppt/slides/slide")
                .trim_end_matches(".xml")
                .parse::<u32>()
                .ok()?;
            Some((number, name.to_string()))
        })
        .collect();
    slides.sort_by_key(|(number, _)| *number);
    Ok(slides.into_iter().map(|(_, name)| name).collect())
}

fn relationship_targets(rels_xml: &str) -> Result<HashMap<String, String>, ExtractError> {
    let mut reader = Reader::from_str(rels_xml);
    let mut targets = HashMap::new();
    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) = (attr_value(&e, b"Id"), attr_value(&e, b"Target")) {
                    targets.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(targets)
}

fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("ppt/{}", target),
    }
}

/// Text of each `p:sp` shape that carries a text body, paragraphs joined by newline.
fn slide_shape_texts(xml: &str) -> Result<Vec<String>, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut shapes = Vec::new();
    let mut paragraphs: Option<Vec<String>> = None;
    let mut in_text = false;

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => match e.name().as_ref() {
                b"p:sp" => paragraphs = Some(Vec::new()),
                b"a:p" => {
                    if let Some(ps) = paragraphs.as_mut() {
                        ps.push(String::new());
                    }
                }
                b"a:t" => in_text = true,
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"a:p" => {
                    if let Some(ps) = paragraphs.as_mut() {
                        ps.push(String::new());
                    }
                }
                b"a:br" => {
                    if let Some(p) = paragraphs.as_mut().and_then(|ps| ps.last_mut()) {
                        p.push('\n');
                    }
                }
                _ => {}
            },
            Event::End(e) => match e.name().as_ref() {
                b"p:sp" => {
                    if let Some(ps) = paragraphs.take() {
                        let text = ps.join("\n");
                        if !text.trim().is_empty() {
                            shapes.push(text);
                        }
                    }
                }
                b"a:t" => in_text = false,
                _ => {}
            },
            Event::Text(t) if in_text => {
                if let Some(p) = paragraphs.as_mut().and_then(|ps| ps.last_mut()) {
                    push_text(p, &t)?;
                }
            }
            Event::GeneralRef(r) if in_text => {
                if let Some(p) = paragraphs.as_mut().and_then(|ps| ps.last_mut()) {
                    push_entity(p, &r)?;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(shapes)
}

/// Legacy binary .doc through an external converter that prints plain text.
pub(crate) fn extract_legacy_doc(path: &Path, converter: &str) -> Result<String, ExtractError> {
    debug!("Converting legacy Word file {:?} with {}", path, converter);

    let output = Command::new(converter).arg(path).output().map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            ExtractError::ConverterUnavailable(converter.to_string())
        } else {
            ExtractError::DecodeError(format!("Failed to run {}: {}", converter, e))
        }
    })?;

    if !output.status.success() {
        let err = String::from_utf8_lossy(&output.stderr);
        warn!("{} failed on {:?}: {}", converter, path, err.trim());
        return Err(ExtractError::DecodeError(format!(
            "{} exited with {}",
            converter, output.status
        )));
    }

    let (text, _) = decode_text(&output.stdout)?;
    Ok(text)
}
