//! Error types for mobiml operations.

use thiserror::Error;

/// Errors raised while loading input, reading a profile, or writing output.
///
/// The markup conversion itself never fails: malformed styles and markup
/// degrade the output instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid EPUB: {0}")]
    InvalidEpub(String),

    #[error("Invalid output profile: {0}")]
    InvalidProfile(String),

    #[error("UTF-8 decoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

pub type Result<T> = std::result::Result<T, Error>;
