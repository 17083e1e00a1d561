use indexmap::IndexMap;

use crate::bytes::hex2bytes;
use crate::constants::TYPE;

/// Identity of an indirect object: object number and generation number.
///
/// The combination serves as the unique identifier for an indirect object.
/// Throughout its existence, an indirect object retains the object number
/// and generation number it was initially assigned, even if it is modified.
pub type ObjectId = (u32, u16);

/// A PDF value in the COS (file syntax) layer.
///
/// Every object in a PDF document is one of these variants. Any object used
/// as an element of an array or as a value in a dictionary may be specified
/// either directly or by an indirect reference, which consists of the
/// object number, the generation number and the `R` keyword:
///
/// ```plaintext
/// << /Length 8 0 R >>
/// ```
///
/// Containers hold references raw; resolution happens through the document
/// so that identity-preserving operations (cloning, serialization) can still
/// see the reference itself.
#[derive(Debug, Clone, PartialEq)]
pub enum PDFObject {
    /// The `null` keyword. Also the result of resolving a free or missing
    /// reference in tolerant mode.
    Null,
    /// The keywords `true` and `false`.
    Boolean(bool),
    /// An integer, specified by signed or unsigned decimal constants.
    /// Exponential format is not part of the syntax.
    Integer(i64),
    /// A real number. Only decimal format is allowed.
    Real(f64),
    /// A literal string: `(...)` with balanced parentheses. Holds the raw
    /// decoded bytes; interpretation (text, dates) is up to the reader.
    String(Vec<u8>),
    /// A hexadecimal string: `<...>`. The raw hex form is retained so an
    /// unmodified object round-trips byte for byte.
    HexString(HexString),
    /// A name: an atomic symbol introduced by a slash, e.g. `/Type`. Names
    /// are byte sequences; `#HH` escapes are already decoded here.
    Name(Vec<u8>),
    /// An ordered, heterogeneous sequence of objects: `[ ... ]`.
    Array(Vec<PDFObject>),
    /// An associative table of name keys and object values: `<< ... >>`.
    Dictionary(Dictionary),
    /// A stream: a dictionary of metadata plus an opaque byte payload.
    Stream(Stream),
    /// An indirect reference: `<number> <generation> R`.
    Reference(ObjectId),
}

impl PDFObject {
    pub fn is_null(&self) -> bool {
        matches!(self, PDFObject::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PDFObject::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PDFObject::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Integer or real as a float. Many dictionary entries (rectangles,
    /// UserUnit) accept either form.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PDFObject::Integer(value) => Some(*value as f64),
            PDFObject::Real(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&[u8]> {
        match self {
            PDFObject::Name(atom) => Some(atom),
            _ => None,
        }
    }

    /// The byte content of a literal or hex string.
    pub fn as_string_bytes(&self) -> Option<Vec<u8>> {
        match self {
            PDFObject::String(bytes) => Some(bytes.clone()),
            PDFObject::HexString(hex) => Some(hex.value()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[PDFObject]> {
        match self {
            PDFObject::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<PDFObject>> {
        match self {
            PDFObject::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            PDFObject::Dictionary(dict) => Some(dict),
            PDFObject::Stream(stream) => Some(&stream.dict),
            _ => None,
        }
    }

    pub fn as_dict_mut(&mut self) -> Option<&mut Dictionary> {
        match self {
            PDFObject::Dictionary(dict) => Some(dict),
            PDFObject::Stream(stream) => Some(&mut stream.dict),
            _ => None,
        }
    }

    pub fn as_stream(&self) -> Option<&Stream> {
        match self {
            PDFObject::Stream(stream) => Some(stream),
            _ => None,
        }
    }

    pub fn as_stream_mut(&mut self) -> Option<&mut Stream> {
        match self {
            PDFObject::Stream(stream) => Some(stream),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<ObjectId> {
        match self {
            PDFObject::Reference(id) => Some(*id),
            _ => None,
        }
    }
}

impl From<bool> for PDFObject {
    fn from(value: bool) -> Self {
        PDFObject::Boolean(value)
    }
}

impl From<i64> for PDFObject {
    fn from(value: i64) -> Self {
        PDFObject::Integer(value)
    }
}

impl From<f64> for PDFObject {
    fn from(value: f64) -> Self {
        PDFObject::Real(value)
    }
}

impl From<Dictionary> for PDFObject {
    fn from(value: Dictionary) -> Self {
        PDFObject::Dictionary(value)
    }
}

impl From<Vec<PDFObject>> for PDFObject {
    fn from(value: Vec<PDFObject>) -> Self {
        PDFObject::Array(value)
    }
}

impl From<Stream> for PDFObject {
    fn from(value: Stream) -> Self {
        PDFObject::Stream(value)
    }
}

/// A hexadecimal string. The raw hex digits are kept alongside the decoded
/// value so that unmodified strings serialize back to their original form.
#[derive(Debug, Clone, PartialEq)]
pub struct HexString {
    /// The hex digits, whitespace stripped, padded to even length.
    raw: Vec<u8>,
}

impl HexString {
    /// Builds a hex string from its raw digit form. An odd final digit is
    /// padded with a trailing zero, so `<A>` decodes to `0xA0`.
    pub fn new(mut raw: Vec<u8>) -> Self {
        raw.retain(|b| !crate::bytes::is_whitespace(*b));
        if raw.len() % 2 != 0 {
            raw.push(b'0');
        }
        HexString { raw }
    }

    /// Builds a hex string holding the given bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut raw = Vec::with_capacity(data.len() * 2);
        for b in data {
            raw.extend_from_slice(format!("{:02X}", b).as_bytes());
        }
        HexString { raw }
    }

    /// The raw hex digits.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// The decoded byte value.
    pub fn value(&self) -> Vec<u8> {
        // The raw form was validated/padded at construction.
        hex2bytes(&self.raw).unwrap_or_default()
    }
}

/// An associative table of name keys and object values.
///
/// Keys are the raw name atoms (without the leading slash). Insertion order
/// is preserved so a parsed dictionary round-trips in its original order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dictionary(IndexMap<Vec<u8>, PDFObject>);

impl Dictionary {
    pub fn new() -> Self {
        Dictionary(IndexMap::new())
    }

    pub fn get(&self, key: &[u8]) -> Option<&PDFObject> {
        self.0.get(key)
    }

    pub fn get_mut(&mut self, key: &[u8]) -> Option<&mut PDFObject> {
        self.0.get_mut(key)
    }

    pub fn set(&mut self, key: impl Into<Vec<u8>>, value: impl Into<PDFObject>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &[u8]) -> Option<PDFObject> {
        self.0.shift_remove(key)
    }

    pub fn has(&self, key: &[u8]) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Vec<u8>, &PDFObject)> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&Vec<u8>, &mut PDFObject)> {
        self.0.iter_mut()
    }

    /// The Type entry as a name, if present and a name.
    pub fn type_name(&self) -> Option<&[u8]> {
        self.get(TYPE).and_then(PDFObject::as_name)
    }

    /// Returns true if the Type entry names `expected`.
    pub fn type_is(&self, expected: &[u8]) -> bool {
        self.type_name() == Some(expected)
    }
}

impl<K: Into<Vec<u8>>, const N: usize> From<[(K, PDFObject); N]> for Dictionary {
    fn from(entries: [(K, PDFObject); N]) -> Self {
        let mut dict = Dictionary::new();
        for (key, value) in entries {
            dict.set(key, value);
        }
        dict
    }
}

/// A stream object: a dictionary of metadata and an opaque byte payload.
///
/// Objects with a large amount of data, such as page content or embedded
/// files, are represented by streams. The payload here is exactly the bytes
/// between `stream` and `endstream`; filters are applied on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    pub dict: Dictionary,
    pub data: Vec<u8>,
}

impl Stream {
    pub fn new(mut dict: Dictionary, data: Vec<u8>) -> Self {
        dict.set(crate::constants::LENGTH, data.len() as i64);
        Stream { dict, data }
    }

    /// The filter names attached to this stream, in application order.
    /// A single name and an array of names are both accepted; references
    /// inside the entry must already be resolved by the caller.
    pub fn filter_names(&self) -> Vec<Vec<u8>> {
        match self.dict.get(crate::constants::FILTER) {
            Some(PDFObject::Name(name)) => vec![name.clone()],
            Some(PDFObject::Array(items)) => items
                .iter()
                .filter_map(|item| item.as_name().map(|n| n.to_vec()))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Returns true if any attached filter is the Crypt filter. Such
    /// streams handle their own decryption and are skipped by the
    /// document-wide decryption pass.
    pub fn uses_crypt_filter(&self) -> bool {
        self.filter_names().iter().any(|name| name == b"Crypt")
    }
}

/// Decodes a text string: UTF-16BE with BOM, UTF-8 with BOM, or raw bytes
/// treated as one-byte codes otherwise.
pub fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(b"\xfe\xff") {
        let units: Vec<u16> = utf16
            .chunks(2)
            .map(|pair| u16::from_be_bytes([pair[0], *pair.get(1).unwrap_or(&0)]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    if let Some(utf8) = bytes.strip_prefix(b"\xef\xbb\xbf") {
        return String::from_utf8_lossy(utf8).into_owned();
    }
    bytes.iter().map(|&b| b as char).collect()
}
