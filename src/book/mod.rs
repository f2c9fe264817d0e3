use std::collections::HashMap;

/// An unpacked ebook: the content units to convert and everything they
/// reference.
#[derive(Debug, Clone, Default)]
pub struct Book {
    pub metadata: Metadata,
    pub spine: Vec<SpineItem>,
    pub guide: Vec<GuideReference>,
    /// Resources keyed by OPF-relative, percent-decoded href.
    pub resources: HashMap<String, Resource>,
}

/// Book metadata (Dublin Core subset)
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub title: String,
    pub authors: Vec<String>,
    pub language: String,
    pub identifier: String,
    /// Href of the cover image resource.
    pub cover_image: Option<String>,
}

/// An item in the reading order (spine)
#[derive(Debug, Clone, PartialEq)]
pub struct SpineItem {
    pub id: String,
    pub href: String,
    pub media_type: String,
    pub linear: bool,
}

/// A `<guide>` reference such as the cover page or the start of the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuideReference {
    /// Reference type (`cover`, `toc`, `text`, ...).
    pub kind: String,
    pub title: String,
    /// Target href with any fragment kept.
    pub href: String,
}

/// A resource (content document, image, CSS, font, etc.)
#[derive(Debug, Clone)]
pub struct Resource {
    pub data: Vec<u8>,
    pub media_type: String,
}

impl Book {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource to the book
    pub fn add_resource(&mut self, href: impl Into<String>, data: Vec<u8>, media_type: impl Into<String>) {
        self.resources.insert(href.into(), Resource {
            data,
            media_type: media_type.into(),
        });
    }

    /// Get a resource by href
    pub fn get_resource(&self, href: &str) -> Option<&Resource> {
        self.resources.get(href)
    }

    pub fn remove_resource(&mut self, href: &str) -> Option<Resource> {
        self.resources.remove(href)
    }

    /// Add a spine item
    pub fn add_spine_item(&mut self, id: impl Into<String>, href: impl Into<String>, media_type: impl Into<String>) {
        self.spine.push(SpineItem {
            id: id.into(),
            href: href.into(),
            media_type: media_type.into(),
            linear: true,
        });
    }

    /// Remove the spine item pointing at `href`.
    pub fn remove_spine_item(&mut self, href: &str) -> Option<SpineItem> {
        let index = self.spine.iter().position(|item| item.href == href)?;
        Some(self.spine.remove(index))
    }

    pub fn add_guide_reference(&mut self, kind: impl Into<String>, title: impl Into<String>, href: impl Into<String>) {
        self.guide.push(GuideReference {
            kind: kind.into(),
            title: title.into(),
            href: href.into(),
        });
    }

    /// First guide reference of the given type.
    pub fn guide_reference(&self, kind: &str) -> Option<&GuideReference> {
        self.guide.iter().find(|r| r.kind.eq_ignore_ascii_case(kind))
    }

    /// Remove and return the first guide reference of the given type.
    pub fn remove_guide_reference(&mut self, kind: &str) -> Option<GuideReference> {
        let index = self.guide.iter().position(|r| r.kind.eq_ignore_ascii_case(kind))?;
        Some(self.guide.remove(index))
    }
}

impl Metadata {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.authors.push(author.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    pub fn with_cover_image(mut self, href: impl Into<String>) -> Self {
        self.cover_image = Some(href.into());
        self
    }
}
