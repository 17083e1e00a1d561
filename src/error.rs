use thiserror::Error;

pub type Result<T> = std::result::Result<T, PDFError>;

/// Errors raised while reading, mutating or writing a PDF document.
///
/// Low-level parsing and crypto errors surface directly. The resolver in
/// tolerant mode downgrades resolution failures to a null object; strict
/// mode propagates them. The serializer never recovers.
#[derive(Debug, Error)]
pub enum PDFError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed or missing `%PDF-M.N` header.
    #[error("invalid or missing PDF header")]
    InvalidHeader,
    /// Unrecognized `M.N` in the header or catalog Version entry.
    #[error("unsupported PDF version: {0}")]
    InvalidVersion(String),
    /// Malformed COS syntax: bad framing, bad xref rows, unexpected EOF.
    #[error("parse error: {0}")]
    Parse(String),
    /// A reference could not be resolved to a live object.
    #[error("resolution error: {0}")]
    Resolution(String),
    /// Stream filter failure: unknown name, bad payload, bad predictor.
    #[error("filter error: {0}")]
    Filter(String),
    /// Encryption dictionary or cipher failure.
    #[error("crypto error: {0}")]
    Crypto(String),
    /// The serializer hit an inconsistency it will not paper over.
    #[error("write error: {0}")]
    Write(String),
    /// Page or stream access on a document that is still encrypted.
    #[error("document is locked; decrypt it first")]
    DocumentLocked,
}

impl PDFError {
    pub(crate) fn parse(msg: impl Into<String>) -> Self {
        PDFError::Parse(msg.into())
    }

    pub(crate) fn resolution(msg: impl Into<String>) -> Self {
        PDFError::Resolution(msg.into())
    }

    pub(crate) fn filter(msg: impl Into<String>) -> Self {
        PDFError::Filter(msg.into())
    }

    pub(crate) fn crypto(msg: impl Into<String>) -> Self {
        PDFError::Crypto(msg.into())
    }

    pub(crate) fn write(msg: impl Into<String>) -> Self {
        PDFError::Write(msg.into())
    }
}
