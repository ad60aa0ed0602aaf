//! Error types for template rendering operations.

use thiserror::Error;

/// Result type for template rendering operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure modes of opening and rendering a template.
///
/// Structural failures abort the whole render: a template that is not a
/// valid ZIP container or an XML part that does not parse leaves nothing
/// sensible to produce. Content-level anomalies (a token with no value in
/// the context, a rich-text payload that is not a delta) are deliberately
/// not represented here; they degrade to empty or passthrough output so a
/// single bad field cannot sink the document.
#[derive(Error, Debug)]
pub enum Error {
    /// Input bytes are not a valid document container
    #[error("Archive format error: {0}")]
    ArchiveFormat(String),

    /// An XML part failed to parse
    #[error("Malformed markup: {0}")]
    MalformedMarkup(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Error::ArchiveFormat(err.to_string())
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::MalformedMarkup(err.to_string())
    }
}
