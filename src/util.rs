//! Byte decoding, href resolution and image header probing.

use std::borrow::Cow;

use memchr::memmem;
use percent_encoding::percent_decode_str;

/// Media types of content documents, the only spine items that get converted.
const DOCUMENT_MEDIA_TYPES: &[&str] = &[
    "application/xhtml+xml",
    "text/html",
    "text/x-oeb1-document",
    "application/x-dtbook+xml",
];

/// Whether a manifest media type names an (X)HTML content document.
pub fn is_document_media_type(media_type: &str) -> bool {
    let base = media_type.split(';').next().unwrap_or_default().trim();
    DOCUMENT_MEDIA_TYPES
        .iter()
        .any(|m| m.eq_ignore_ascii_case(base))
}

/// Decode bytes to a string.
///
/// UTF-8 is tried first (a BOM is honored), then the hint encoding, then
/// Windows-1252, which is what most legacy ebooks without a declaration use.
pub fn decode_text<'a>(bytes: &'a [u8], hint_encoding: Option<&str>) -> Cow<'a, str> {
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);
    if !malformed {
        return result;
    }

    if let Some(name) = hint_encoding
        && let Some(encoding) = encoding_rs::Encoding::for_label(name.as_bytes())
    {
        let (result, _, _) = encoding.decode(bytes);
        return result;
    }

    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    result
}

/// Decode a markup document, using its XML declaration as the hint.
pub fn decode_document(bytes: &[u8]) -> Cow<'_, str> {
    decode_text(bytes, extract_xml_encoding(bytes))
}

/// Extract the `encoding="..."` value of an XML declaration.
///
/// Only the first 100 bytes are inspected.
pub fn extract_xml_encoding(bytes: &[u8]) -> Option<&str> {
    let prefix = &bytes[..bytes.len().min(100)];
    let decl = &prefix[memmem::find(prefix, b"<?xml")?..];

    let lowered: Vec<u8> = decl.to_ascii_lowercase();
    let after = &decl[memmem::find(&lowered, b"encoding=")? + 9..];

    let quote = *after.first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    let end = memchr::memchr(quote, &after[1..])? + 1;
    std::str::from_utf8(&after[1..end]).ok()
}

/// Resolve `href` relative to the document at `base`.
///
/// Both are container-relative paths. Fragments and queries are dropped and
/// percent escapes decoded. Returns `None` for absolute URLs, `data:` URIs
/// and pure fragment references.
pub fn resolve_href(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    let path = href.split(['#', '?']).next().unwrap_or_default();
    if path.is_empty() || path.contains("://") || path.starts_with("data:") {
        return None;
    }

    let mut parts: Vec<&str> = if path.starts_with('/') {
        Vec::new()
    } else {
        let mut dir: Vec<&str> = base.split('/').collect();
        dir.pop();
        dir.into_iter().filter(|p| !p.is_empty()).collect()
    };

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }

    Some(percent_decode(&parts.join("/")))
}

/// Strip a fragment and decode percent escapes, leaving the path otherwise
/// untouched. Used for hrefs that are already container-relative.
pub fn normalize_href(href: &str) -> String {
    let path = href.split('#').next().unwrap_or_default();
    percent_decode(path.trim())
}

fn percent_decode(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

/// Read `(width, height)` from the header of a PNG, JPEG or GIF image.
pub fn extract_image_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    match data {
        [0x89, b'P', b'N', b'G', ..] if data.len() >= 24 => {
            let width = u32::from_be_bytes([data[16], data[17], data[18], data[19]]);
            let height = u32::from_be_bytes([data[20], data[21], data[22], data[23]]);
            Some((width, height))
        }
        [0xFF, 0xD8, ..] => extract_jpeg_dimensions(data),
        [b'G', b'I', b'F', ..] if data.len() >= 10 => {
            let width = u16::from_le_bytes([data[6], data[7]]) as u32;
            let height = u16::from_le_bytes([data[8], data[9]]) as u32;
            Some((width, height))
        }
        _ => None,
    }
}

/// Walk JPEG segments until a start-of-frame marker.
fn extract_jpeg_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    let mut i = 2;
    while i + 4 < data.len() {
        if data[i] != 0xFF {
            i += 1;
            continue;
        }

        let marker = data[i + 1];
        let is_sof = matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_sof && i + 9 < data.len() {
            let height = u16::from_be_bytes([data[i + 5], data[i + 6]]) as u32;
            let width = u16::from_be_bytes([data[i + 7], data[i + 8]]) as u32;
            return Some((width, height));
        }

        let length = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
        i += 2 + length;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_text_falls_back_to_cp1252() {
        let bytes = b"caf\xe9";
        assert_eq!(decode_text(bytes, None), "caf\u{e9}");
        assert_eq!(decode_text("plain".as_bytes(), None), "plain");
    }

    #[test]
    fn test_decode_document_uses_declared_encoding() {
        let bytes = b"<?xml version=\"1.0\" encoding=\"iso-8859-1\"?><p>\xe0</p>";
        assert!(decode_document(bytes).contains('\u{e0}'));
    }

    #[test]
    fn test_extract_xml_encoding() {
        assert_eq!(
            extract_xml_encoding(b"<?xml version='1.0' encoding='UTF-8'?>"),
            Some("UTF-8")
        );
        assert_eq!(
            extract_xml_encoding(b"<?xml version=\"1.0\" ENCODING=\"cp1252\"?>"),
            Some("cp1252")
        );
        assert_eq!(extract_xml_encoding(b"<html></html>"), None);
        assert_eq!(extract_xml_encoding(b"<?xml version=\"1.0\"?>"), None);
    }

    #[test]
    fn test_resolve_href() {
        assert_eq!(
            resolve_href("text/ch1.xhtml", "../images/a%20b.png").as_deref(),
            Some("images/a b.png")
        );
        assert_eq!(
            resolve_href("ch1.xhtml", "style.css#x").as_deref(),
            Some("style.css")
        );
        assert_eq!(
            resolve_href("a/b/c.xhtml", "./d.css").as_deref(),
            Some("a/b/d.css")
        );
        assert_eq!(resolve_href("ch1.xhtml", "#note"), None);
        assert_eq!(resolve_href("ch1.xhtml", "http://example.com/x.css"), None);
    }

    #[test]
    fn test_normalize_href() {
        assert_eq!(normalize_href("cover%20page.xhtml#top"), "cover page.xhtml");
    }

    #[test]
    fn test_document_media_types() {
        assert!(is_document_media_type("application/xhtml+xml"));
        assert!(is_document_media_type("text/html; charset=utf-8"));
        assert!(!is_document_media_type("image/png"));
    }

    #[test]
    fn test_png_dimensions() {
        let mut png = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        png.extend_from_slice(&[0, 0, 0, 13]);
        png.extend_from_slice(b"IHDR");
        png.extend_from_slice(&640u32.to_be_bytes());
        png.extend_from_slice(&480u32.to_be_bytes());
        assert_eq!(extract_image_dimensions(&png), Some((640, 480)));
    }

    #[test]
    fn test_gif_dimensions() {
        let gif = [b'G', b'I', b'F', b'8', b'9', b'a', 0x20, 0x00, 0x10, 0x00];
        assert_eq!(extract_image_dimensions(&gif), Some((32, 16)));
    }

    #[test]
    fn test_jpeg_dimensions() {
        let jpeg = [
            0xFF, 0xD8, // SOI
            0xFF, 0xE0, 0x00, 0x04, 0x00, 0x00, // APP0, 2 bytes payload
            0xFF, 0xC0, 0x00, 0x0B, 0x08, 0x01, 0x2C, 0x01, 0x90, 0x03, 0x00,
        ];
        assert_eq!(extract_image_dimensions(&jpeg), Some((400, 300)));
    }

    #[test]
    fn test_unknown_image() {
        assert_eq!(extract_image_dimensions(b"not an image at all, really"), None);
    }
}
