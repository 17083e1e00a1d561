//! A low-level library for reading, mutating and writing PDF files.
//!
//! The crate implements the COS (file syntax) layer of the PDF format:
//! the byte-oriented tokenizer, the cross-reference machinery that maps
//! object identities to file offsets (including cross-reference streams
//! and object streams), the stream filter set, and the standard security
//! handler for password-based encryption, revisions 2 through 4. On top
//! of that sits a thin document model exposing the catalog, document
//! information, page tree and page objects.
//!
//! ```no_run
//! use pdfcos::PDFDocument;
//!
//! # fn main() -> pdfcos::Result<()> {
//! let document = PDFDocument::from_filename("sample.pdf")?;
//! for page in document.pages()? {
//!     println!("{:?}", page.mediabox());
//! }
//! # Ok(())
//! # }
//! ```

pub(crate) mod arc4;
pub(crate) mod bytes;
pub(crate) mod constants;
pub mod date;
pub mod document;
pub mod error;
pub mod filters;
pub mod objects;
pub mod page;
pub(crate) mod parser;
pub mod security;
pub mod tokenizer;
pub mod version;
pub mod writer;
pub mod xref;

pub use date::PDFDate;
pub use document::{Info, PDFDocument};
pub use error::{PDFError, Result};
pub use objects::{Dictionary, HexString, ObjectId, PDFObject, Stream};
pub use page::Page;
pub use security::{PermsAcquired, StandardSecurityHandler};
pub use tokenizer::{ContentStreamTokenizer, ContentToken, Token, Tokenizer};
pub use version::PDFVersion;
pub use writer::Serializer;
pub use xref::{XrefEntry, XrefTable};
