use crate::constants::pdf_key;
use crate::objects::{Dictionary, HexString, ObjectId, PDFObject, Stream};
use crate::version::PDFVersion;
use crate::xref::XrefEntry;

/// Serializes objects and file structure into a growable byte buffer.
///
/// The writer owns offset bookkeeping: every indirect object records the
/// position it was emitted at, and the cross-reference section is written
/// from those positions.
pub struct Serializer {
    buf: Vec<u8>,
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Serializer {
    pub fn new() -> Self {
        Serializer { buf: Vec::new() }
    }

    /// Current byte position, i.e. the offset the next write lands at.
    pub fn position(&self) -> u64 {
        self.buf.len() as u64
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// `%PDF-M.N` plus a binary-marker comment of four high bytes, so
    /// transfer tooling treats the file as binary.
    pub fn write_header(&mut self, version: PDFVersion) {
        self.push(format!("%PDF-{version}\n").as_bytes());
        self.push(b"%\xe2\xe3\xcf\xd3\n");
    }

    /// Emits `n g obj`, the serialized value and `endobj`. Returns the
    /// byte offset the object starts at.
    pub fn write_object(&mut self, id: ObjectId, object: &PDFObject) -> u64 {
        let offset = self.position();
        self.push(format!("{} {} obj\n", id.0, id.1).as_bytes());
        self.write_value(object);
        self.push(b"\nendobj\n");
        offset
    }

    /// Serializes one value in its direct form.
    pub fn write_value(&mut self, object: &PDFObject) {
        match object {
            PDFObject::Null => self.push(b"null"),
            PDFObject::Boolean(true) => self.push(b"true"),
            PDFObject::Boolean(false) => self.push(b"false"),
            PDFObject::Integer(value) => self.push(value.to_string().as_bytes()),
            PDFObject::Real(value) => self.write_real(*value),
            PDFObject::String(bytes) => self.write_string(bytes),
            PDFObject::HexString(hex) => self.write_hex_string(hex),
            PDFObject::Name(atom) => self.write_name(atom),
            PDFObject::Array(items) => self.write_array(items),
            PDFObject::Dictionary(dict) => self.write_dictionary(dict),
            PDFObject::Reference((number, generation)) => {
                self.push(format!("{number} {generation} R").as_bytes())
            }
            PDFObject::Stream(stream) => self.write_stream(stream),
        }
    }

    /// Reals keep a decimal point so they re-parse as reals.
    fn write_real(&mut self, value: f64) {
        if value.fract() == 0.0 && value.abs() < 1e15 {
            self.push(format!("{value:.1}").as_bytes());
        } else {
            self.push(format!("{value}").as_bytes());
        }
    }

    /// Literal form when every byte is printable, hex form otherwise.
    fn write_string(&mut self, bytes: &[u8]) {
        let printable = bytes
            .iter()
            .all(|&b| (0x20..0x7f).contains(&b) || matches!(b, b'\n' | b'\r' | b'\t'));
        if !printable {
            return self.write_hex_string(&HexString::from_bytes(bytes));
        }
        self.push(b"(");
        for &b in bytes {
            match b {
                b'(' | b')' | b'\\' => {
                    self.push(&[b'\\', b]);
                }
                b'\n' => self.push(b"\\n"),
                b'\r' => self.push(b"\\r"),
                b'\t' => self.push(b"\\t"),
                _ => self.push(&[b]),
            }
        }
        self.push(b")");
    }

    fn write_hex_string(&mut self, hex: &HexString) {
        self.push(b"<");
        self.push(hex.raw());
        self.push(b">");
    }

    /// Names escape anything outside the printable range, the delimiters
    /// and `#` itself as `#HH`.
    fn write_name(&mut self, atom: &[u8]) {
        self.push(b"/");
        for &b in atom {
            let regular =
                (b'!'..=b'~').contains(&b) && !crate::bytes::is_delimiter(b) && b != b'#';
            if regular {
                self.push(&[b]);
            } else {
                self.push(format!("#{b:02X}").as_bytes());
            }
        }
    }

    fn write_array(&mut self, items: &[PDFObject]) {
        self.push(b"[");
        for (idx, item) in items.iter().enumerate() {
            if idx > 0 {
                self.push(b" ");
            }
            self.write_value(item);
        }
        self.push(b"]");
    }

    fn write_dictionary(&mut self, dict: &Dictionary) {
        self.push(b"<< ");
        for (key, value) in dict.iter() {
            self.write_name(key);
            self.push(b" ");
            self.write_value(value);
            self.push(b" ");
        }
        self.push(b">>");
    }

    fn write_stream(&mut self, stream: &Stream) {
        self.write_dictionary(&stream.dict);
        self.push(b"\nstream\n");
        self.push(&stream.data);
        self.push(b"\nendstream");
    }

    /// Writes a classic cross-reference table. `entries` must be sorted
    /// by object number; contiguous runs become subsections. Returns the
    /// offset of the `xref` keyword for the trailer's `startxref`.
    pub fn write_xref_section(&mut self, entries: &[(u32, XrefEntry)]) -> u64 {
        let offset = self.position();
        self.push(pdf_key::XREF);
        self.push(b"\n");

        let mut idx = 0usize;
        while idx < entries.len() {
            // extend the run while object numbers stay consecutive
            let mut end = idx + 1;
            while end < entries.len() && entries[end].0 == entries[end - 1].0 + 1 {
                end += 1;
            }
            let run = &entries[idx..end];
            self.push(format!("{} {}\n", run[0].0, run.len()).as_bytes());
            for (_, entry) in run {
                // each formatted entry is exactly 20 bytes
                match entry {
                    XrefEntry::InUse { offset, generation } => {
                        self.push(format!("{offset:010} {generation:05} n\r\n").as_bytes());
                    }
                    XrefEntry::Free {
                        next_free,
                        next_generation,
                    } => {
                        self.push(
                            format!("{next_free:010} {next_generation:05} f\r\n").as_bytes(),
                        );
                    }
                    XrefEntry::Compressed { .. } => {
                        // classic tables cannot express compressed entries;
                        // the save path never produces them here
                        self.push(format!("{:010} {:05} f\r\n", 0, 0).as_bytes());
                    }
                }
            }
            idx = end;
        }
        offset
    }

    /// `trailer`, the dictionary, then `startxref` and the offset.
    pub fn write_trailer(&mut self, dict: &Dictionary, startxref: u64) {
        self.push(pdf_key::TRAILER);
        self.push(b"\n");
        self.write_dictionary(dict);
        self.push(b"\nstartxref\n");
        self.push(format!("{startxref}\n").as_bytes());
    }

    pub fn write_eof(&mut self) {
        self.push(pdf_key::EOF_MARKER);
        self.push(b"\n");
    }
}
