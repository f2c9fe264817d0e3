//! # mobiml
//!
//! Converts styled XHTML ebook content into Mobipocket markup (MobiML), the
//! HTML 3.2 dialect Mobipocket and early Kindle readers render.
//!
//! ## Features
//!
//! - CSS cascade over each content document, resolved to points
//! - Font sizes mapped onto the seven-step `<font size>` ladder
//! - Margins, padding and indents emulated with blockquotes and
//!   `height`/`width` paragraph attributes
//! - Lists and tables passed through, or tables flattened on request
//! - Superscript and subscript emulation, page breaks, anchors
//! - EPUB input with removal of a redundant HTML cover page
//!
//! ## Quick Start
//!
//! ```no_run
//! use mobiml::{ConvertOptions, MobiMlizer, OutputProfile, read_epub};
//!
//! let mut book = read_epub("input.epub").unwrap();
//! let mut converter = MobiMlizer::new(OutputProfile::default(), ConvertOptions::default());
//! for document in converter.convert_book(&mut book).unwrap() {
//!     println!("{}: {} bytes", document.href, document.to_xml().len());
//! }
//! ```
//!
//! ## Working with Books
//!
//! A [`Book`] can also be assembled in memory:
//!
//! ```
//! use mobiml::{Book, ConvertOptions, Metadata, MobiMlizer, OutputProfile};
//!
//! let mut book = Book::new();
//! book.metadata = Metadata::new("My Book")
//!     .with_author("Author Name")
//!     .with_language("en")
//!     .with_identifier("urn:uuid:0b7c6b1e-5f3a-4c1d-9a57-3f1e2d4c5b6a");
//!
//! book.add_resource("chapter1.xhtml", b"<p>Hello</p>".to_vec(), "application/xhtml+xml");
//! book.add_spine_item("ch1", "chapter1.xhtml", "application/xhtml+xml");
//!
//! let mut converter = MobiMlizer::new(OutputProfile::default(), ConvertOptions::default());
//! let documents = converter.convert_book(&mut book).unwrap();
//! assert!(documents[0].to_xml().contains("Hello"));
//! ```

pub mod book;
pub mod dom;
pub mod epub;
pub mod error;
pub mod mobi;
pub mod profile;
pub mod style;
pub(crate) mod util;

pub use book::{Book, GuideReference, Metadata, Resource, SpineItem};
pub use epub::{read_epub, read_epub_from_reader};
pub use error::{Error, Result};
pub use mobi::{ConvertOptions, ImageResolver, MobiDocument, MobiMlizer, NoImages};
pub use profile::OutputProfile;
