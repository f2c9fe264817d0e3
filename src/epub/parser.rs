//! EPUB package parsing (container.xml and OPF)

use std::collections::HashMap;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::book::{GuideReference, Metadata};
use crate::error::{Error, Result};

/// Parsed OPF package data.
pub struct OpfData {
    pub metadata: Metadata,
    /// Manifest id -> item, hrefs as written in the OPF.
    pub manifest: HashMap<String, ManifestItem>,
    /// Spine idrefs in reading order with their `linear` flag.
    pub spine: Vec<(String, bool)>,
    pub guide: Vec<GuideReference>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ManifestItem {
    pub href: String,
    pub media_type: String,
    pub properties: Option<String>,
}

/// Parse META-INF/container.xml to find the OPF path.
pub fn parse_container_xml(bytes: &[u8]) -> Result<String> {
    let content = String::from_utf8(strip_bom(bytes).to_vec())?;

    let mut reader = Reader::from_str(&content);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) if local_name(e.name().as_ref()) == b"rootfile" => {
                if let Some(path) = attribute(&e, b"full-path")? {
                    return Ok(path);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
    }

    Err(Error::InvalidEpub("No rootfile found in container.xml".into()))
}

/// Parse OPF package document.
pub fn parse_opf(content: &str) -> Result<OpfData> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut metadata = Metadata::default();
    let mut manifest: HashMap<String, ManifestItem> = HashMap::new();
    let mut spine: Vec<(String, bool)> = Vec::new();
    let mut guide: Vec<GuideReference> = Vec::new();
    let mut epub2_cover_id: Option<String> = None;

    let mut in_metadata = false;
    let mut current_element: Option<&'static str> = None;
    let mut buf_text = String::new();

    loop {
        let (e, is_empty) = match reader.read_event() {
            Ok(Event::Start(e)) => (e, false),
            Ok(Event::Empty(e)) => (e, true),
            Ok(Event::Text(e)) => {
                if current_element.is_some() {
                    buf_text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
                continue;
            }
            Ok(Event::GeneralRef(e)) => {
                if current_element.is_some()
                    && let Some(resolved) = resolve_entity(&String::from_utf8_lossy(e.as_ref()))
                {
                    buf_text.push_str(&resolved);
                }
                continue;
            }
            Ok(Event::End(e)) => {
                let name = e.name();
                if local_name(name.as_ref()) == b"metadata" {
                    in_metadata = false;
                }

                if let Some(elem) = current_element.take() {
                    let text = std::mem::take(&mut buf_text).trim().to_string();
                    match elem {
                        "title" if metadata.title.is_empty() => metadata.title = text,
                        "creator" => metadata.authors.push(text),
                        "language" if metadata.language.is_empty() => metadata.language = text,
                        "identifier" if metadata.identifier.is_empty() => metadata.identifier = text,
                        _ => {}
                    }
                }
                continue;
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => continue,
        };

        let name = e.name();
        match local_name(name.as_ref()) {
            b"metadata" if !is_empty => in_metadata = true,
            b"title" if in_metadata && !is_empty => current_element = Some("title"),
            b"creator" if in_metadata && !is_empty => current_element = Some("creator"),
            b"language" if in_metadata && !is_empty => current_element = Some("language"),
            b"identifier" if in_metadata && !is_empty => current_element = Some("identifier"),
            b"item" => {
                let id = attribute(&e, b"id")?.unwrap_or_default();
                if !id.is_empty() {
                    manifest.insert(
                        id,
                        ManifestItem {
                            href: attribute(&e, b"href")?.unwrap_or_default(),
                            media_type: attribute(&e, b"media-type")?.unwrap_or_default(),
                            properties: attribute(&e, b"properties")?,
                        },
                    );
                }
            }
            b"itemref" => {
                if let Some(idref) = attribute(&e, b"idref")? {
                    let linear = attribute(&e, b"linear")?.is_none_or(|v| v != "no");
                    spine.push((idref, linear));
                }
            }
            b"meta" => {
                if attribute(&e, b"name")?.as_deref() == Some("cover")
                    && let Some(cover_id) = attribute(&e, b"content")?.filter(|c| !c.is_empty())
                {
                    epub2_cover_id = Some(cover_id);
                }
            }
            b"reference" => {
                if let (Some(kind), Some(href)) = (attribute(&e, b"type")?, attribute(&e, b"href")?) {
                    guide.push(GuideReference {
                        kind,
                        title: attribute(&e, b"title")?.unwrap_or_default(),
                        href,
                    });
                }
            }
            _ => {}
        }
    }

    // Detect cover image (EPUB3 property takes priority)
    let epub3_cover = manifest.values().find(|item| {
        item.properties
            .as_ref()
            .is_some_and(|props| props.split_ascii_whitespace().any(|p| p == "cover-image"))
    });

    if let Some(cover_item) = epub3_cover {
        metadata.cover_image = Some(cover_item.href.clone());
    } else if let Some(cover_id) = epub2_cover_id
        && let Some(item) = manifest.get(&cover_id)
    {
        metadata.cover_image = Some(item.href.clone());
    }

    Ok(OpfData {
        metadata,
        manifest,
        spine,
        guide,
    })
}

// ----------------------------------------------------------------------------
// Helpers
// ----------------------------------------------------------------------------

fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes().flatten() {
        if local_name(attr.key.as_ref()) == key {
            return Ok(Some(String::from_utf8(attr.value.to_vec())?));
        }
    }
    Ok(None)
}

/// Strip UTF-8 BOM if present.
pub fn strip_bom(data: &[u8]) -> &[u8] {
    if data.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &data[3..]
    } else {
        data
    }
}

/// Extract local name from namespaced XML name (e.g., "dc:title" -> "title").
fn local_name(name: &[u8]) -> &[u8] {
    name.iter()
        .rposition(|&b| b == b':')
        .map(|i| &name[i + 1..])
        .unwrap_or(name)
}

/// Resolve XML entity references.
fn resolve_entity(entity: &str) -> Option<String> {
    match entity {
        "apos" => return Some("'".to_string()),
        "quot" => return Some("\"".to_string()),
        "lt" => return Some("<".to_string()),
        "gt" => return Some(">".to_string()),
        "amp" => return Some("&".to_string()),
        _ => {}
    }

    let code = match entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => entity.strip_prefix('#')?.parse::<u32>().ok()?,
    };
    char::from_u32(code).map(|c| c.to_string())
}
