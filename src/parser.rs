use std::collections::{BTreeMap, HashSet};

use log::warn;

use crate::constants::{LENGTH, PREV, SIZE, pdf_key};
use crate::error::{PDFError, Result};
use crate::filters;
use crate::objects::{Dictionary, ObjectId, PDFObject, Stream};
use crate::tokenizer::Tokenizer;
use crate::version::PDFVersion;
use crate::xref::{XrefEntry, XrefSubsection, XrefTable, merge_xref_tables};

/// How far a `Length` side trip may chain through references before the
/// resolver calls it a cycle.
const MAX_LENGTH_DEPTH: usize = 4;

/// Everything the reader extracts from a raw buffer. Compressed entries
/// are left unexpanded; their containers may still be encrypted, so the
/// document expands them once a decryption key is available.
pub(crate) struct ParsedFile {
    pub version: PDFVersion,
    /// `(table, trailer)` per increment, most recent first.
    pub updates: Vec<(XrefTable, Dictionary)>,
    /// The merged cross-reference mapping.
    pub xref: BTreeMap<ObjectId, XrefEntry>,
    /// The effective (most recent) trailer.
    pub trailer: Dictionary,
    /// Every uncompressed in-use object, parsed eagerly.
    pub objects: BTreeMap<ObjectId, PDFObject>,
    /// Object-stream members still to be extracted:
    /// `(identity, container number, index within)`.
    pub pending_compressed: Vec<(ObjectId, u32, u32)>,
}

/// Reads a whole document from a borrowed byte buffer.
///
/// The reader works trailer-first: it locates `startxref` near the end,
/// walks the `Prev` chain of cross-reference sections, merges them, and
/// then parses every in-use object up front.
pub(crate) struct Reader<'a> {
    t: Tokenizer<'a>,
    strict: bool,
    xref: BTreeMap<ObjectId, XrefEntry>,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(data: &'a [u8], strict: bool) -> Self {
        Reader {
            t: Tokenizer::new(data),
            strict,
            xref: BTreeMap::new(),
        }
    }

    pub(crate) fn read(mut self) -> Result<ParsedFile> {
        let version = self.parse_header()?;

        let mut offset = self.lookup_xref_start()?;
        let mut updates: Vec<(XrefTable, Dictionary)> = Vec::new();
        let mut visited = HashSet::new();

        loop {
            if !visited.insert(offset) {
                if self.strict {
                    return Err(PDFError::parse("cross-reference Prev chain loops"));
                }
                warn!("cross-reference Prev chain loops; stopping at offset {offset}");
                break;
            }
            let (table, trailer) = self.parse_xref_and_trailer(offset)?;
            let prev = trailer.get(PREV).and_then(PDFObject::as_i64);
            updates.push((table, trailer));
            match prev {
                Some(prev) if prev >= 0 => offset = prev as usize,
                Some(_) => return Err(PDFError::parse("negative Prev offset")),
                None => break,
            }
        }

        let tables: Vec<XrefTable> = updates.iter().map(|(table, _)| table.clone()).collect();
        self.xref = merge_xref_tables(&tables);
        let trailer = updates[0].1.clone();

        let (objects, pending_compressed) = self.load_objects()?;

        Ok(ParsedFile {
            version,
            updates,
            xref: std::mem::take(&mut self.xref),
            trailer,
            objects,
            pending_compressed,
        })
    }

    /// The `%PDF-M.N` comment that must open the file.
    fn parse_header(&mut self) -> Result<PDFVersion> {
        self.t.seek(0);
        if !self.t.starts_with(b"%") {
            return Err(PDFError::InvalidHeader);
        }
        let comment = self.t.parse_comment();
        let text = comment
            .strip_prefix(b"PDF-")
            .ok_or(PDFError::InvalidHeader)?;
        let text = std::str::from_utf8(text.get(..3).ok_or(PDFError::InvalidHeader)?)
            .map_err(|_| PDFError::InvalidHeader)?;
        text.try_into()
    }

    /// Scans backwards from the end of the buffer for `startxref` and
    /// reads the decimal offset that follows it.
    fn lookup_xref_start(&mut self) -> Result<usize> {
        let data = self.t.data();
        let window_start = data.len().saturating_sub(1024);
        let keyword = pdf_key::START_XREF;
        let found = data[window_start..]
            .windows(keyword.len())
            .rposition(|window| window == keyword)
            .ok_or_else(|| PDFError::parse("cannot locate xref: 'startxref' missing"))?;

        self.t.seek(window_start + found + keyword.len());
        self.t.skip_whitespace();
        let offset = self
            .t
            .parse_raw_uint()
            .ok_or_else(|| PDFError::parse("'startxref' not followed by an offset"))?;
        Ok(offset as usize)
    }

    /// Parses the cross-reference section at `offset`: either a classic
    /// `xref` table followed by `trailer`, or a cross-reference stream
    /// whose dictionary doubles as the trailer. In tolerant mode a
    /// misaligned offset is corrected to the nearest plausible section.
    fn parse_xref_and_trailer(&mut self, offset: usize) -> Result<(XrefTable, Dictionary)> {
        self.t.seek(offset);
        self.t.skip_whitespace();

        if self.t.advance_if_next(pdf_key::XREF) {
            let table = self.parse_classic_xref()?;
            self.t.skip_whitespace();
            if !self.t.advance_if_next(pdf_key::TRAILER) {
                return Err(PDFError::parse("expected 'trailer' after xref table"));
            }
            let trailer = match self.t.next_object()? {
                PDFObject::Dictionary(dict) => dict,
                _ => return Err(PDFError::parse("trailer is not a dictionary")),
            };
            return Ok((table, trailer));
        }

        if self.looks_like_indirect_object() {
            return self.parse_xref_stream();
        }

        if self.strict {
            return Err(PDFError::parse(format!(
                "offset {offset} does not point to a cross-reference section"
            )));
        }
        let corrected = self.correct_xref_offset(offset)?;
        warn!("misaligned startxref {offset}; using nearest section at {corrected}");
        self.t.seek(corrected);
        self.t.skip_whitespace();
        if self.t.advance_if_next(pdf_key::XREF) {
            let table = self.parse_classic_xref()?;
            self.t.skip_whitespace();
            if !self.t.advance_if_next(pdf_key::TRAILER) {
                return Err(PDFError::parse("expected 'trailer' after xref table"));
            }
            match self.t.next_object()? {
                PDFObject::Dictionary(dict) => Ok((table, dict)),
                _ => Err(PDFError::parse("trailer is not a dictionary")),
            }
        } else {
            self.parse_xref_stream()
        }
    }

    /// Probes for `<num> <gen> obj` at the cursor without consuming it.
    fn looks_like_indirect_object(&mut self) -> bool {
        let start = self.t.position();
        let looks = (|t: &mut Tokenizer| {
            t.parse_raw_uint()?;
            t.skip_whitespace();
            t.parse_raw_uint()?;
            t.skip_whitespace();
            t.advance_if_next(pdf_key::OBJ).then_some(())
        })(&mut self.t)
        .is_some();
        self.t.seek(start);
        looks
    }

    /// Finds the in-file `xref` keyword closest to the claimed offset.
    /// Only used in tolerant mode.
    fn correct_xref_offset(&self, claimed: usize) -> Result<usize> {
        let data = self.t.data();
        let keyword = pdf_key::XREF;
        let mut best: Option<usize> = None;
        for pos in 0..data.len().saturating_sub(keyword.len()) {
            if !data[pos..].starts_with(keyword) {
                continue;
            }
            // skip the tail of 'startxref'
            if pos >= 5 && &data[pos - 5..pos] == b"start" {
                continue;
            }
            let closer = match best {
                Some(prev) => pos.abs_diff(claimed) < prev.abs_diff(claimed),
                None => true,
            };
            if closer {
                best = Some(pos);
            }
        }
        best.ok_or_else(|| PDFError::parse("no cross-reference section found in file"))
    }

    /// One or more subsections of `<first> <count>` followed by exactly
    /// `count` twenty-byte entries.
    fn parse_classic_xref(&mut self) -> Result<XrefTable> {
        let mut table = XrefTable::new();
        loop {
            self.t.skip_whitespace();
            let start = self.t.position();
            let Some(first) = self.t.parse_raw_uint() else {
                break;
            };
            self.t.skip_whitespace();
            let Some(count) = self.t.parse_raw_uint() else {
                // not a subsection header after all
                self.t.seek(start);
                break;
            };

            let mut entries = Vec::with_capacity(count as usize);
            for row in 0..count {
                self.t.skip_whitespace();
                let offset = self.t.parse_raw_uint();
                self.t.skip_whitespace();
                let generation = self.t.parse_raw_uint();
                self.t.skip_whitespace();
                let status = self.t.take_bytes(1)?[0];

                let (Some(offset), Some(generation)) = (offset, generation) else {
                    return Err(PDFError::parse(format!("bad xref entry at row {}", row + 1)));
                };
                match status {
                    b'n' => entries.push(XrefEntry::InUse {
                        offset,
                        generation: generation as u16,
                    }),
                    b'f' => entries.push(XrefEntry::Free {
                        next_free: offset as u32,
                        next_generation: generation as u16,
                    }),
                    other => {
                        return Err(PDFError::parse(format!(
                            "bad xref entry status 0x{other:02x} at row {}",
                            row + 1
                        )));
                    }
                }
            }
            table.subsections.push(XrefSubsection {
                start: first as u32,
                entries,
            });
        }
        Ok(table)
    }

    /// A cross-reference stream: decoded payload read in fixed-width
    /// fields per `W`, entry ranges per `Index`, the stream dictionary
    /// doubling as the trailer.
    fn parse_xref_stream(&mut self) -> Result<(XrefTable, Dictionary)> {
        let offset = self.t.position() as u64;
        let object = self.read_object_at(offset, None, 0)?;
        let stream = object
            .as_stream()
            .ok_or_else(|| PDFError::parse("cross-reference stream is not a stream"))?;

        // Cross-reference streams are never encrypted.
        let decoded = filters::decode_stream(stream, None)?;
        let dict = &stream.dict;

        let size = dict
            .get(SIZE)
            .and_then(PDFObject::as_i64)
            .ok_or_else(|| PDFError::parse("cross-reference stream has no Size"))?;

        let widths: Vec<usize> = match dict.get(b"W").and_then(PDFObject::as_array) {
            Some(items) => items
                .iter()
                .map(|i| i.as_i64().map(|v| v as usize))
                .collect::<Option<_>>()
                .ok_or_else(|| PDFError::parse("bad W array in cross-reference stream"))?,
            None => vec![1, 2, 4],
        };
        if widths.len() < 3 {
            return Err(PDFError::parse("W array must hold three field widths"));
        }

        let indices: Vec<i64> = match dict.get(b"Index").and_then(PDFObject::as_array) {
            Some(items) => items
                .iter()
                .map(PDFObject::as_i64)
                .collect::<Option<_>>()
                .ok_or_else(|| PDFError::parse("bad Index array in cross-reference stream"))?,
            None => vec![0, size],
        };

        let mut cursor = 0usize;
        let mut read_field = |width: usize, default: u64| -> Result<u64> {
            if width == 0 {
                return Ok(default);
            }
            let slice = decoded
                .get(cursor..cursor + width)
                .ok_or_else(|| PDFError::parse("cross-reference stream data too short"))?;
            cursor += width;
            Ok(slice.iter().fold(0u64, |acc, b| acc << 8 | *b as u64))
        };

        let mut table = XrefTable::new();
        for pair in indices.chunks(2) {
            let &[first, count] = pair else {
                return Err(PDFError::parse("Index array has an odd number of values"));
            };
            let mut entries = Vec::with_capacity(count.max(0) as usize);
            for _ in 0..count {
                let field_type = read_field(widths[0], 1)?;
                let second = read_field(widths[1], 0)?;
                let third = read_field(widths[2], 0)?;
                let entry = match field_type {
                    0 => XrefEntry::Free {
                        next_free: second as u32,
                        next_generation: third as u16,
                    },
                    1 => XrefEntry::InUse {
                        offset: second,
                        generation: third as u16,
                    },
                    2 => XrefEntry::Compressed {
                        container: second as u32,
                        index: third as u32,
                    },
                    other => {
                        // Unknown types read as references to null
                        warn!("unknown xref stream entry type {other}");
                        XrefEntry::Free {
                            next_free: 0,
                            next_generation: 0,
                        }
                    }
                };
                entries.push(entry);
            }
            table.subsections.push(XrefSubsection {
                start: first as u32,
                entries,
            });
        }

        Ok((table, dict.clone()))
    }

    /// Walks the merged table and parses every uncompressed in-use entry.
    /// Compressed entries are collected for later expansion.
    fn load_objects(
        &mut self,
    ) -> Result<(BTreeMap<ObjectId, PDFObject>, Vec<(ObjectId, u32, u32)>)> {
        let mut objects = BTreeMap::new();
        let mut pending = Vec::new();

        let entries: Vec<(ObjectId, XrefEntry)> =
            self.xref.iter().map(|(id, entry)| (*id, *entry)).collect();
        for (id, entry) in entries {
            match entry {
                XrefEntry::Free { .. } => {}
                XrefEntry::Compressed { container, index } => {
                    pending.push((id, container, index));
                }
                XrefEntry::InUse { offset, .. } => {
                    match self.read_object_at(offset, Some(id), 0) {
                        Ok(object) => {
                            objects.insert(id, object);
                        }
                        Err(err) if !self.strict => {
                            warn!("failed to load object {} {}: {err}", id.0, id.1);
                            objects.insert(id, PDFObject::Null);
                        }
                        Err(err) => return Err(err),
                    }
                }
            }
        }
        Ok((objects, pending))
    }

    /// Parses `<n> <g> obj` at `offset` followed by a value and, for
    /// streams, exactly `Length` payload bytes bracketed by `stream` and
    /// `endstream`.
    fn read_object_at(
        &mut self,
        offset: u64,
        expected: Option<ObjectId>,
        depth: usize,
    ) -> Result<PDFObject> {
        self.t.seek(offset as usize);
        self.t.skip_whitespace();

        let number = self
            .t
            .parse_raw_uint()
            .ok_or_else(|| PDFError::parse(format!("no indirect object at offset {offset}")))?;
        self.t.skip_whitespace();
        let generation = self
            .t
            .parse_raw_uint()
            .ok_or_else(|| PDFError::parse(format!("no indirect object at offset {offset}")))?;
        self.t.skip_whitespace();
        if !self.t.advance_if_next(pdf_key::OBJ) {
            return Err(PDFError::parse(format!(
                "missing 'obj' keyword at offset {offset}"
            )));
        }

        if let Some((expected_num, expected_gen)) = expected {
            if (number as u32, generation as u16) != (expected_num, expected_gen) {
                let msg = format!(
                    "object at offset {offset} is {number} {generation}, \
                     expected {expected_num} {expected_gen}"
                );
                if self.strict {
                    return Err(PDFError::parse(msg));
                }
                warn!("{msg}");
            }
        }

        let object = self.t.next_object()?;
        self.t.skip_whitespace();

        if !self.t.starts_with(pdf_key::STREAM) {
            return Ok(object);
        }

        // A stream: its dictionary precedes the keyword.
        let dict = match object {
            PDFObject::Dictionary(dict) => dict,
            _ => return Err(PDFError::parse("stream payload without a dictionary")),
        };
        let length = self.resolve_stream_length(&dict, depth)?;

        self.t.advance(pdf_key::STREAM.len());
        self.t.skip_one_eol();
        let data = self
            .t
            .take_bytes(length)
            .map_err(|_| PDFError::parse("stream Length runs past end of file"))?
            .to_vec();
        self.t.skip_one_eol();
        self.t.skip_whitespace();
        if !self.t.advance_if_next(pdf_key::END_STREAM) {
            return Err(PDFError::parse(
                "stream Length does not match 'endstream' position",
            ));
        }

        Ok(PDFObject::Stream(Stream { dict, data }))
    }

    /// The Length entry, following one indirect reference if needed. The
    /// side trip preserves the cursor.
    fn resolve_stream_length(&mut self, dict: &Dictionary, depth: usize) -> Result<usize> {
        match dict.get(LENGTH) {
            Some(PDFObject::Integer(value)) if *value >= 0 => Ok(*value as usize),
            Some(PDFObject::Reference(id)) => {
                if depth >= MAX_LENGTH_DEPTH {
                    return Err(PDFError::resolution(
                        "cycle while resolving stream Length",
                    ));
                }
                let entry = self.xref.get(id).copied();
                let Some(XrefEntry::InUse { offset, .. }) = entry else {
                    return Err(PDFError::resolution(format!(
                        "stream Length {} {} R is not a live object",
                        id.0, id.1
                    )));
                };
                let saved = self.t.position();
                let value = self.read_object_at(offset, Some(*id), depth + 1)?;
                self.t.seek(saved);
                value
                    .as_i64()
                    .filter(|v| *v >= 0)
                    .map(|v| v as usize)
                    .ok_or_else(|| PDFError::parse("stream Length target is not an integer"))
            }
            _ => Err(PDFError::parse("stream dictionary has no usable Length")),
        }
    }
}

/// Tokenizes the decoded payload of an object stream starting at `First`
/// and returns its member objects in order.
pub(crate) fn extract_objstm_members(decoded: &[u8], first: usize) -> Result<Vec<PDFObject>> {
    let body = decoded
        .get(first..)
        .ok_or_else(|| PDFError::parse("object stream First offset past end of data"))?;
    let mut tokenizer = Tokenizer::new(body);
    let mut members = Vec::new();
    loop {
        tokenizer.skip_whitespace();
        if tokenizer.at_end() {
            break;
        }
        members.push(tokenizer.next_object()?);
    }
    Ok(members)
}
