//! Fixture builder assembling small PDF files byte by byte, with offsets
//! computed as objects are appended. Parsing tests should not depend on
//! the library's own serializer for their inputs.
#![allow(dead_code)]

pub struct PdfBuilder {
    data: Vec<u8>,
    /// Objects appended since the last xref section.
    entries: Vec<(u32, usize)>,
    max_number: u32,
    wrote_xref: bool,
}

impl PdfBuilder {
    pub fn new(version: &str) -> Self {
        PdfBuilder {
            data: format!("%PDF-{version}\n").into_bytes(),
            entries: Vec::new(),
            max_number: 0,
            wrote_xref: false,
        }
    }

    /// Current byte offset, i.e. where the next append lands.
    pub fn offset(&self) -> usize {
        self.data.len()
    }

    /// Appends `<number> 0 obj <body> endobj`.
    pub fn add_object(&mut self, number: u32, body: &str) {
        self.entries.push((number, self.data.len()));
        self.max_number = self.max_number.max(number);
        self.data
            .extend_from_slice(format!("{number} 0 obj\n{body}\nendobj\n").as_bytes());
    }

    /// Appends `<number> 0 obj` with a verbatim body, for fixtures that
    /// need malformed framing.
    pub fn add_raw_object(&mut self, number: u32, body: &[u8]) {
        self.entries.push((number, self.data.len()));
        self.max_number = self.max_number.max(number);
        self.data
            .extend_from_slice(format!("{number} 0 obj\n").as_bytes());
        self.data.extend_from_slice(body);
        self.data.extend_from_slice(b"\nendobj\n");
    }

    /// Appends a stream object; `dict_entries` must not include Length.
    pub fn add_stream_object(&mut self, number: u32, dict_entries: &str, payload: &[u8]) {
        self.entries.push((number, self.data.len()));
        self.max_number = self.max_number.max(number);
        self.data.extend_from_slice(
            format!(
                "{number} 0 obj\n<< {dict_entries} /Length {} >>\nstream\n",
                payload.len()
            )
            .as_bytes(),
        );
        self.data.extend_from_slice(payload);
        self.data.extend_from_slice(b"\nendstream\nendobj\n");
    }

    /// Writes a classic xref section covering the objects added since the
    /// last one, a trailer with `extra` entries, `startxref` and `%%EOF`.
    /// Returns the offset of the `xref` keyword for use as a later Prev.
    pub fn write_xref(&mut self, trailer_extra: &str) -> usize {
        let xref_offset = self.data.len();
        let mut entries = std::mem::take(&mut self.entries);
        entries.sort_unstable_by_key(|(number, _)| *number);

        let mut rows: Vec<(u32, String)> = Vec::new();
        if !self.wrote_xref {
            rows.push((0, "0000000000 65535 f\r\n".to_string()));
        }
        for (number, offset) in entries {
            rows.push((number, format!("{offset:010} {:05} n\r\n", 0)));
        }
        self.wrote_xref = true;

        self.data.extend_from_slice(b"xref\n");
        let mut idx = 0usize;
        while idx < rows.len() {
            let mut end = idx + 1;
            while end < rows.len() && rows[end].0 == rows[end - 1].0 + 1 {
                end += 1;
            }
            self.data
                .extend_from_slice(format!("{} {}\n", rows[idx].0, end - idx).as_bytes());
            for (_, row) in &rows[idx..end] {
                self.data.extend_from_slice(row.as_bytes());
            }
            idx = end;
        }

        let size = self.max_number + 1;
        self.data.extend_from_slice(
            format!("trailer\n<< /Size {size} {trailer_extra} >>\nstartxref\n{xref_offset}\n%%EOF\n")
                .as_bytes(),
        );
        xref_offset
    }

    /// Ends a file whose cross-reference section was written by hand (for
    /// cross-reference stream fixtures).
    pub fn finish_with_startxref(&mut self, offset: usize) {
        self.data
            .extend_from_slice(format!("startxref\n{offset}\n%%EOF\n").as_bytes());
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// A 4-page document with a nested page tree: the root holds two
/// intermediate nodes of two pages each. Page media boxes are distinct so
/// tests can tell pages apart.
pub fn nested_tree_pdf() -> Vec<u8> {
    let mut builder = PdfBuilder::new("1.7");
    builder.add_object(1, "<< /Type /Catalog /Pages 2 0 R >>");
    builder.add_object(
        2,
        "<< /Type /Pages /Kids [3 0 R 4 0 R] /Count 4 >>",
    );
    builder.add_object(
        3,
        "<< /Type /Pages /Parent 2 0 R /Kids [5 0 R 6 0 R] /Count 2 >>",
    );
    builder.add_object(
        4,
        "<< /Type /Pages /Parent 2 0 R /Kids [7 0 R 8 0 R] /Count 2 >>",
    );
    for (number, parent, width) in [(5, 3, 100), (6, 3, 200), (7, 4, 300), (8, 4, 400)] {
        builder.add_object(
            number,
            &format!(
                "<< /Type /Page /Parent {parent} 0 R /MediaBox [0 0 {width} {width}] >>"
            ),
        );
    }
    builder.write_xref("/Root 1 0 R");
    builder.into_bytes()
}
