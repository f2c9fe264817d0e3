use std::io::{Read, Seek};
use std::path::Path;

use log::{debug, warn};
use zip::ZipArchive;

use super::parser::{OpfData, parse_container_xml, parse_opf, strip_bom};
use crate::book::Book;
use crate::error::{Error, Result};
use crate::util::normalize_href;

/// Read an EPUB file from disk into a [`Book`].
///
/// Extracts metadata, spine, guide and all manifest resources. Resource keys
/// and spine hrefs are OPF-relative with percent escapes decoded.
///
/// # Example
///
/// ```no_run
/// use mobiml::read_epub;
///
/// let book = read_epub("path/to/book.epub")?;
/// println!("Title: {}", book.metadata.title);
/// # Ok::<(), mobiml::Error>(())
/// ```
pub fn read_epub<P: AsRef<Path>>(path: P) -> Result<Book> {
    let file = std::fs::File::open(path)?;
    read_epub_from_reader(file)
}

/// Read an EPUB from any [`Read`] + [`Seek`] source.
///
/// ```no_run
/// use std::io::Cursor;
/// use mobiml::epub::read_epub_from_reader;
///
/// let epub_data: Vec<u8> = std::fs::read("book.epub")?;
/// let book = read_epub_from_reader(Cursor::new(epub_data))?;
/// # Ok::<(), mobiml::Error>(())
/// ```
pub fn read_epub_from_reader<R: Read + Seek>(reader: R) -> Result<Book> {
    let mut archive = ZipArchive::new(reader)?;

    // 1. Find the OPF file path from container.xml
    let container = read_archive_file_bytes(&mut archive, "META-INF/container.xml")?;
    let opf_path = parse_container_xml(&container)?;
    let opf_dir = Path::new(&opf_path)
        .parent()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_default();

    // 2. Parse the OPF file
    let opf_bytes = read_archive_file_bytes(&mut archive, &opf_path)?;
    let opf_content = String::from_utf8(strip_bom(&opf_bytes).to_vec())?;
    let OpfData {
        mut metadata,
        manifest,
        spine,
        guide,
    } = parse_opf(&opf_content)?;

    metadata.cover_image = metadata.cover_image.map(|href| normalize_href(&href));

    let mut book = Book::new();
    book.metadata = metadata;
    book.guide = guide;

    // 3. Load all resources from manifest
    for item in manifest.values() {
        let full_path = resolve_path(&opf_dir, &item.href);
        match read_archive_file_bytes(&mut archive, &full_path) {
            Ok(data) => book.add_resource(normalize_href(&item.href), data, item.media_type.clone()),
            Err(e) => warn!("Manifest item {} could not be read: {e}", item.href),
        }
    }

    // 4. Build spine from spine IDs
    for (id, linear) in spine {
        let Some(item) = manifest.get(&id) else {
            debug!("Spine references unknown manifest id {id}");
            continue;
        };
        book.add_spine_item(&id, normalize_href(&item.href), item.media_type.clone());
        if let Some(added) = book.spine.last_mut() {
            added.linear = linear;
        }
    }

    if book.spine.is_empty() {
        return Err(Error::InvalidEpub("Spine is empty".into()));
    }

    Ok(book)
}

fn read_archive_file_bytes<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: &str,
) -> Result<Vec<u8>> {
    // Try direct lookup first
    match archive.by_name(path) {
        Ok(mut file) => {
            let mut contents = Vec::new();
            file.read_to_end(&mut contents)?;
            return Ok(contents);
        }
        Err(zip::result::ZipError::FileNotFound) => {}
        Err(e) => return Err(e.into()),
    }

    // Fallback: try percent-decoded path (handles malformed EPUBs)
    let decoded = percent_encoding::percent_decode_str(path)
        .decode_utf8()
        .map_err(|_| Error::InvalidEpub(format!("Invalid UTF-8 in path: {}", path)))?;

    let mut file = archive.by_name(&decoded)?;
    let mut contents = Vec::new();
    file.read_to_end(&mut contents)?;
    Ok(contents)
}

fn resolve_path(base: &str, href: &str) -> String {
    let href = href.split('#').next().unwrap_or_default();
    if base.is_empty() {
        href.to_string()
    } else {
        format!("{}/{}", base, href)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_path() {
        assert_eq!(resolve_path("", "ch1.xhtml"), "ch1.xhtml");
        assert_eq!(resolve_path("OEBPS", "text/ch1.xhtml"), "OEBPS/text/ch1.xhtml");
        assert_eq!(resolve_path("OEBPS", "ch1.xhtml#top"), "OEBPS/ch1.xhtml");
    }

    #[test]
    fn test_not_a_zip() {
        let result = read_epub_from_reader(std::io::Cursor::new(b"not a zip".to_vec()));
        assert!(matches!(result, Err(Error::Zip(_))));
    }
}
