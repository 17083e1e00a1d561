/// Macro to define the COS keyword table.
///
/// Generates a module of byte-string constants for the structural keywords
/// of the file syntax.
macro_rules! pdf_key {
    ($(($ident:ident,$value:literal)),+$(,)?) => {
        /// Module containing the structural keywords of the COS syntax.
        pub(crate) mod pdf_key {
            $(
                pub(crate) const $ident: &[u8] = $value;
            )+
        }
    }
}

pdf_key!(
    (TRAILER, b"trailer"),
    (XREF, b"xref"),
    (R, b"R"),
    (OBJ, b"obj"),
    (START_XREF, b"startxref"),
    (TRUE, b"true"),
    (FALSE, b"false"),
    (NULL, b"null"),
    (END_OBJ, b"endobj"),
    (STREAM, b"stream"),
    (END_STREAM, b"endstream"),
    (EOF_MARKER, b"%%EOF"),
);

/// Key for page tree nodes.
pub(crate) const KIDS: &[u8] = b"Kids";
/// Key for object type.
pub(crate) const TYPE: &[u8] = b"Type";
/// Key for previous cross-reference section.
pub(crate) const PREV: &[u8] = b"Prev";
/// Key for cross-reference table size.
pub(crate) const SIZE: &[u8] = b"Size";
/// Key for document catalog.
pub(crate) const ROOT: &[u8] = b"Root";
/// Key for count of pages below a tree node.
pub(crate) const COUNT: &[u8] = b"Count";
/// Key for pages object type.
pub(crate) const PAGES: &[u8] = b"Pages";
/// Key for page object type.
pub(crate) const PAGE: &[u8] = b"Page";
/// Key for catalog object type.
pub(crate) const CATALOG: &[u8] = b"Catalog";
/// Key for outlines.
pub(crate) const OUTLINES: &[u8] = b"Outlines";
/// Key for stream length.
pub(crate) const LENGTH: &[u8] = b"Length";
/// Key for the parent of a page or tree node.
pub(crate) const PARENT: &[u8] = b"Parent";
/// Key for stream filters.
pub(crate) const FILTER: &[u8] = b"Filter";
/// Key for stream filter parameters.
pub(crate) const DECODE_PARMS: &[u8] = b"DecodeParms";

pub(crate) const INFO: &[u8] = b"Info";
pub(crate) const ENCRYPT: &[u8] = b"Encrypt";
pub(crate) const ID: &[u8] = b"ID";
pub(crate) const VERSION: &[u8] = b"Version";
pub(crate) const METADATA: &[u8] = b"Metadata";

pub(crate) const PRODUCER: &[u8] = b"Producer";
pub(crate) const CREATOR: &[u8] = b"Creator";
pub(crate) const CREATION_DATE: &[u8] = b"CreationDate";
pub(crate) const AUTHOR: &[u8] = b"Author";
pub(crate) const TITLE: &[u8] = b"Title";
pub(crate) const SUBJECT: &[u8] = b"Subject";
pub(crate) const KEYWORDS: &[u8] = b"Keywords";
pub(crate) const MOD_DATE: &[u8] = b"ModDate";
pub(crate) const TRAPPED: &[u8] = b"Trapped";

/// Stream types that carry cross-reference machinery rather than document
/// content. They are rebuilt rather than copied on save.
pub(crate) const XREF_TYPE: &[u8] = b"XRef";
pub(crate) const OBJ_STM: &[u8] = b"ObjStm";
