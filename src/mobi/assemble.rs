//! Whole-book conversion on top of the per-document transducer.

use log::{debug, info, warn};

use super::{ImageResolver, MobiDocument, MobiMlizer};
use crate::book::Book;
use crate::dom::parse_html_bytes;
use crate::error::{Error, Result};
use crate::style::{StyleSource, Stylesheet, Stylizer, extract_stylesheets};
use crate::util::{decode_text, extract_image_dimensions, is_document_media_type, normalize_href, resolve_href};

/// Image sizes read from the headers of a book's image resources.
#[derive(Debug, Clone, Copy)]
pub struct BookImages<'a> {
    book: &'a Book,
    /// Href of the document image sources are relative to.
    base: &'a str,
}

impl<'a> BookImages<'a> {
    pub fn new(book: &'a Book, base: &'a str) -> Self {
        Self { book, base }
    }
}

impl ImageResolver for BookImages<'_> {
    fn dimensions(&self, src: &str) -> Option<(u32, u32)> {
        let href = resolve_href(self.base, src)?;
        let resource = self.book.get_resource(&href)?;
        extract_image_dimensions(&resource.data)
    }
}

/// Drop the HTML cover page when the book also declares a cover image,
/// which the reader shows on its own.
///
/// Needs both a cover image in the metadata and a `cover` guide reference.
/// The guide reference is removed either way. The cover page leaves the
/// spine, and its resource is deleted too when it is a content document.
pub fn remove_html_cover(book: &mut Book) {
    if book.metadata.cover_image.is_none() || book.guide_reference("cover").is_none() {
        return;
    }
    let Some(reference) = book.remove_guide_reference("cover") else {
        return;
    };

    let href = normalize_href(&reference.href);
    let Some(media_type) = book.get_resource(&href).map(|r| r.media_type.clone()) else {
        warn!("Cover page {href} is not in the manifest");
        return;
    };

    if book.remove_spine_item(&href).is_some() {
        debug!("Removed HTML cover {href}");
        if is_document_media_type(&media_type) {
            book.remove_resource(&href);
        }
    }
}

impl MobiMlizer {
    /// Convert every content document in the spine, replacing each unit's
    /// resource bytes with its MobiML. Returns the converted units in
    /// reading order.
    pub fn convert_book(&mut self, book: &mut Book) -> Result<Vec<MobiDocument>> {
        info!("Converting XHTML to Mobipocket markup...");
        remove_html_cover(book);

        let mut documents = Vec::new();
        for item in &book.spine {
            if !is_document_media_type(&item.media_type) {
                debug!("Skipping non-document spine item {}", item.href);
                continue;
            }
            let resource = book.get_resource(&item.href).ok_or_else(|| {
                Error::InvalidEpub(format!("Spine item {} has no content", item.href))
            })?;

            debug!("Converting {}", item.href);
            let source = parse_html_bytes(&resource.data);
            let sheets = load_stylesheets(book, &item.href, extract_stylesheets(&source));
            let styles = Stylizer::new(&source, &sheets, &self.profile);
            let images = BookImages::new(book, &item.href);

            let mut document = self.convert_document(&source, &styles, &images);
            document.href = item.href.clone();
            documents.push(document);
        }

        for document in &documents {
            if let Some(resource) = book.resources.get_mut(&document.href) {
                resource.data = document.to_xml().into_bytes();
            }
        }
        Ok(documents)
    }
}

/// Parse the stylesheets a document references, in document order.
fn load_stylesheets(book: &Book, base: &str, sources: Vec<StyleSource>) -> Vec<Stylesheet> {
    sources
        .into_iter()
        .filter_map(|source| match source {
            StyleSource::Embedded(css) => Some(Stylesheet::parse(&css)),
            StyleSource::Linked(href) => {
                let resource = resolve_href(base, &href).and_then(|path| book.get_resource(&path));
                match resource {
                    Some(resource) => Some(Stylesheet::parse(&decode_text(&resource.data, None))),
                    None => {
                        warn!("Stylesheet {href} referenced from {base} not found");
                        None
                    }
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::Metadata;
    use crate::mobi::ConvertOptions;
    use crate::profile::OutputProfile;

    const XHTML: &str = "application/xhtml+xml";

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut data = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        data.extend_from_slice(&[0, 0, 0, 13]);
        data.extend_from_slice(b"IHDR");
        data.extend_from_slice(&width.to_be_bytes());
        data.extend_from_slice(&height.to_be_bytes());
        data
    }

    fn book_with_cover(cover_image: bool, guide: bool) -> Book {
        let mut book = Book::new();
        book.metadata = Metadata::new("Book");
        if cover_image {
            book.metadata.cover_image = Some("cover.jpg".to_string());
        }
        book.add_resource("cover.jpg", vec![0xFF, 0xD8], "image/jpeg");
        book.add_resource("cover.xhtml", b"<p>cover</p>".to_vec(), XHTML);
        book.add_resource("ch1.xhtml", b"<p>text</p>".to_vec(), XHTML);
        book.add_spine_item("cover", "cover.xhtml", XHTML);
        book.add_spine_item("ch1", "ch1.xhtml", XHTML);
        if guide {
            book.add_guide_reference("cover", "Cover", "cover.xhtml");
        }
        book
    }

    #[test]
    fn test_remove_html_cover() {
        let mut book = book_with_cover(true, true);
        remove_html_cover(&mut book);
        assert!(book.guide.is_empty());
        assert_eq!(book.spine.len(), 1);
        assert_eq!(book.spine[0].href, "ch1.xhtml");
        assert!(book.get_resource("cover.xhtml").is_none());
        assert!(book.get_resource("cover.jpg").is_some());
    }

    #[test]
    fn test_cover_kept_without_cover_image() {
        let mut book = book_with_cover(false, true);
        remove_html_cover(&mut book);
        assert_eq!(book.guide.len(), 1);
        assert_eq!(book.spine.len(), 2);
    }

    #[test]
    fn test_cover_kept_without_guide_reference() {
        let mut book = book_with_cover(true, false);
        remove_html_cover(&mut book);
        assert_eq!(book.spine.len(), 2);
        assert!(book.get_resource("cover.xhtml").is_some());
    }

    #[test]
    fn test_missing_cover_page_only_drops_reference() {
        let mut book = book_with_cover(true, false);
        book.add_guide_reference("cover", "Cover", "missing.xhtml");
        remove_html_cover(&mut book);
        assert!(book.guide.is_empty());
        assert_eq!(book.spine.len(), 2);
    }

    #[test]
    fn test_image_cover_page_keeps_resource() {
        let mut book = book_with_cover(true, false);
        book.add_spine_item("img", "cover.jpg", "image/jpeg");
        book.add_guide_reference("cover", "Cover", "cover.jpg");
        remove_html_cover(&mut book);
        assert!(book.spine.iter().all(|item| item.href != "cover.jpg"));
        assert!(book.get_resource("cover.jpg").is_some());
    }

    #[test]
    fn test_book_images_resolve_relative_to_document() {
        let mut book = Book::new();
        book.add_resource("images/fig.png", png(320, 240), "image/png");
        let images = BookImages::new(&book, "text/ch1.xhtml");
        assert_eq!(images.dimensions("../images/fig.png"), Some((320, 240)));
        assert_eq!(images.dimensions("fig.png"), None);
        assert_eq!(images.dimensions("http://example.com/fig.png"), None);
    }

    #[test]
    fn test_convert_book() {
        let mut book = book_with_cover(true, true);
        book.add_resource(
            "ch1.xhtml",
            br#"<html><head><link rel="stylesheet" href="styles/main.css"/><link rel="stylesheet" href="gone.css"/></head>
<body><p class="big">text</p><p><img src="fig.png"/></p></body></html>"#
                .to_vec(),
            XHTML,
        );
        book.add_resource("styles/main.css", b"body, p { margin: 0 } .big { font-size: 24pt }".to_vec(), "text/css");
        book.add_resource("fig.png", png(100, 50), "image/png");

        let mut converter = MobiMlizer::new(OutputProfile::default(), ConvertOptions::default());
        let documents = converter.convert_book(&mut book).unwrap();

        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].href, "ch1.xhtml");
        let stored = String::from_utf8(book.get_resource("ch1.xhtml").unwrap().data.clone()).unwrap();
        assert_eq!(stored, documents[0].to_xml());
        assert!(stored.contains(r#"<font size="7">text</font>"#), "{stored}");
        assert!(stored.contains(r#"width="100" height="50""#), "{stored}");
    }

    #[test]
    fn test_convert_book_rejects_missing_unit() {
        let mut book = Book::new();
        book.add_spine_item("ch1", "ch1.xhtml", XHTML);
        let mut converter = MobiMlizer::new(OutputProfile::default(), ConvertOptions::default());
        assert!(matches!(converter.convert_book(&mut book), Err(Error::InvalidEpub(_))));
    }
}
