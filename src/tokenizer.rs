use crate::bytes::{is_delimiter, is_whitespace};
use crate::error::{PDFError, Result};
use crate::objects::{Dictionary, HexString, ObjectId, PDFObject};

/// A unit produced by the tokenizer: a complete object, or a comment.
///
/// Comments are interpreted as whitespace by the syntax but are surfaced
/// here because header recognition needs them.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Object(PDFObject),
    Comment(Vec<u8>),
}

/// A cursor over a byte buffer that produces COS tokens.
///
/// The tokenizer handles every direct object form: booleans, numbers,
/// names, literal and hex strings, arrays, dictionaries, references and
/// comments. Indirect-object framing, streams and cross-reference tables
/// are layered on top by the parser, which drives the cursor directly.
pub struct Tokenizer<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Tokenizer { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.data.len());
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub(crate) fn data(&self) -> &'a [u8] {
        self.data
    }

    fn current(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.data.get(self.pos + offset).copied()
    }

    pub(crate) fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.data.len());
    }

    pub(crate) fn starts_with(&self, prefix: &[u8]) -> bool {
        self.data[self.pos..].starts_with(prefix)
    }

    /// Advances past `keyword` if it starts at the cursor.
    pub(crate) fn advance_if_next(&mut self, keyword: &[u8]) -> bool {
        if self.starts_with(keyword) {
            self.advance(keyword.len());
            true
        } else {
            false
        }
    }

    /// Like [`advance_if_next`], but the keyword must end at a whitespace
    /// or delimiter boundary. Reserved words are only recognized there.
    fn advance_keyword(&mut self, keyword: &[u8]) -> bool {
        if !self.starts_with(keyword) {
            return false;
        }
        match self.peek_at(keyword.len()) {
            Some(b) if !is_whitespace(b) && !is_delimiter(b) => false,
            _ => {
                self.advance(keyword.len());
                true
            }
        }
    }

    pub(crate) fn skip_whitespace(&mut self) {
        while let Some(b) = self.current() {
            if !is_whitespace(b) {
                break;
            }
            self.pos += 1;
        }
    }

    /// Takes exactly `n` bytes, failing if the buffer ends first.
    pub(crate) fn take_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.pos + n > self.data.len() {
            return Err(PDFError::parse("unexpected end of input"));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Consumes a run of ASCII digits as an unsigned integer.
    pub(crate) fn parse_raw_uint(&mut self) -> Option<u64> {
        let start = self.pos;
        while self.current().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        crate::bytes::ascii_to_u64(&self.data[start..self.pos])
    }

    /// Skips exactly one end-of-line marker (`\r`, `\n` or `\r\n`) if the
    /// cursor sits on one. Used after the `stream` keyword.
    pub(crate) fn skip_one_eol(&mut self) {
        match self.current() {
            Some(b'\r') => {
                self.pos += 1;
                if self.current() == Some(b'\n') {
                    self.pos += 1;
                }
            }
            Some(b'\n') => self.pos += 1,
            _ => {}
        }
    }

    /// Produces the next token, or `None` at the end of input.
    pub fn next_token(&mut self) -> Result<Option<Token>> {
        self.skip_whitespace();
        let Some(b) = self.current() else {
            return Ok(None);
        };

        let token = match b {
            b'%' => Token::Comment(self.parse_comment()),
            b'/' => Token::Object(PDFObject::Name(self.parse_name()?)),
            b'<' if self.peek_at(1) == Some(b'<') => {
                Token::Object(PDFObject::Dictionary(self.parse_dictionary()?))
            }
            b'<' => Token::Object(PDFObject::HexString(self.parse_hex_string()?)),
            b'[' => Token::Object(PDFObject::Array(self.parse_array()?)),
            b'(' => Token::Object(PDFObject::String(self.parse_literal_string()?)),
            b'0'..=b'9' => match self.try_parse_reference() {
                Some(id) => Token::Object(PDFObject::Reference(id)),
                None => Token::Object(self.parse_numeric()?),
            },
            b'+' | b'-' | b'.' => Token::Object(self.parse_numeric()?),
            _ if self.advance_keyword(b"true") => Token::Object(PDFObject::Boolean(true)),
            _ if self.advance_keyword(b"false") => Token::Object(PDFObject::Boolean(false)),
            _ if self.advance_keyword(b"null") => Token::Object(PDFObject::Null),
            _ => {
                return Err(PDFError::parse(format!(
                    "unexpected byte 0x{b:02x} at offset {}",
                    self.pos
                )));
            }
        };
        Ok(Some(token))
    }

    /// Produces the next object, treating comments as whitespace. Fails at
    /// the end of input.
    pub fn next_object(&mut self) -> Result<PDFObject> {
        loop {
            match self.next_token()? {
                Some(Token::Object(object)) => return Ok(object),
                Some(Token::Comment(_)) => continue,
                None => return Err(PDFError::parse("unexpected end of input")),
            }
        }
    }

    /// `%` to end of line, exclusive of the marker itself.
    pub(crate) fn parse_comment(&mut self) -> Vec<u8> {
        self.pos += 1; // past the %
        let start = self.pos;
        while let Some(b) = self.current() {
            if b == b'\r' || b == b'\n' {
                break;
            }
            self.pos += 1;
        }
        self.data[start..self.pos].to_vec()
    }

    /// A name: `/` then bytes up to the next whitespace or delimiter, with
    /// `#HH` two-digit hex escapes decoded in place.
    fn parse_name(&mut self) -> Result<Vec<u8>> {
        self.pos += 1; // past the /
        let mut atom = Vec::new();
        while let Some(b) = self.current() {
            if is_whitespace(b) || is_delimiter(b) {
                break;
            }
            if b == b'#' {
                let hi = self.peek_at(1).and_then(crate::bytes::hex_value);
                let lo = self.peek_at(2).and_then(crate::bytes::hex_value);
                if let (Some(hi), Some(lo)) = (hi, lo) {
                    atom.push(hi << 4 | lo);
                    self.advance(3);
                    continue;
                }
            }
            atom.push(b);
            self.pos += 1;
        }
        Ok(atom)
    }

    /// `<...>` of hex digits. Whitespace inside is ignored and an odd final
    /// digit is padded with a trailing zero.
    fn parse_hex_string(&mut self) -> Result<HexString> {
        self.pos += 1; // past the <
        let start = self.pos;
        while let Some(b) = self.current() {
            if b == b'>' {
                let raw = self.data[start..self.pos].to_vec();
                self.pos += 1;
                return Ok(HexString::new(raw));
            }
            self.pos += 1;
        }
        Err(PDFError::parse("hex string is missing its closing '>'"))
    }

    /// `(...)` with balanced parentheses, escapes and octal codes.
    fn parse_literal_string(&mut self) -> Result<Vec<u8>> {
        self.pos += 1; // past the (
        let mut out = Vec::new();
        let mut depth = 1usize;

        loop {
            let Some(b) = self.current() else {
                return Err(PDFError::parse("literal string is missing its closing ')'"));
            };
            match b {
                b'\\' => match self.peek_at(1) {
                    Some(b'n') => {
                        out.push(b'\n');
                        self.advance(2);
                    }
                    Some(b'r') => {
                        out.push(b'\r');
                        self.advance(2);
                    }
                    Some(b't') => {
                        out.push(b'\t');
                        self.advance(2);
                    }
                    Some(b'b') => {
                        out.push(0x08);
                        self.advance(2);
                    }
                    Some(b'f') => {
                        out.push(0x0c);
                        self.advance(2);
                    }
                    Some(esc @ (b'(' | b')' | b'\\')) => {
                        out.push(esc);
                        self.advance(2);
                    }
                    // A backslash at the end of a line continues the string
                    Some(b'\r') => {
                        self.advance(2);
                        if self.current() == Some(b'\n') {
                            self.advance(1);
                        }
                    }
                    Some(b'\n') => self.advance(2),
                    // One to three octal digits produce a single byte
                    Some(b'0'..=b'7') => {
                        self.advance(1);
                        let mut code = 0u32;
                        let mut count = 0;
                        while count < 3 {
                            match self.current() {
                                Some(digit @ b'0'..=b'7') => {
                                    code = code * 8 + (digit - b'0') as u32;
                                    self.advance(1);
                                    count += 1;
                                }
                                _ => break,
                            }
                        }
                        out.push((code & 0xff) as u8);
                    }
                    // Unknown escape: the backslash is kept as-is
                    _ => {
                        out.push(b'\\');
                        self.advance(1);
                    }
                },
                b'(' => {
                    depth += 1;
                    out.push(b);
                    self.advance(1);
                }
                b')' => {
                    depth -= 1;
                    self.advance(1);
                    if depth == 0 {
                        return Ok(out);
                    }
                    out.push(b);
                }
                _ => {
                    out.push(b);
                    self.advance(1);
                }
            }
        }
    }

    /// `<< ... >>` of alternating names and values.
    fn parse_dictionary(&mut self) -> Result<Dictionary> {
        self.advance(2); // past the <<
        let mut dict = Dictionary::new();
        loop {
            self.skip_whitespace();
            if self.advance_if_next(b">>") {
                return Ok(dict);
            }
            match self.current() {
                Some(b'%') => {
                    self.parse_comment();
                }
                Some(b'/') => {
                    let key = self.parse_name()?;
                    let value = self.next_object()?;
                    dict.set(key, value);
                }
                Some(b) => {
                    return Err(PDFError::parse(format!(
                        "dictionary key must be a name, found byte 0x{b:02x}"
                    )));
                }
                None => return Err(PDFError::parse("dictionary is missing its closing '>>'")),
            }
        }
    }

    /// `[ ... ]` of heterogeneous values.
    fn parse_array(&mut self) -> Result<Vec<PDFObject>> {
        self.advance(1); // past the [
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            match self.current() {
                Some(b']') => {
                    self.advance(1);
                    return Ok(items);
                }
                Some(b'%') => {
                    self.parse_comment();
                }
                Some(_) => items.push(self.next_object()?),
                None => return Err(PDFError::parse("array is missing its closing ']'")),
            }
        }
    }

    /// `<number> <generation> R`, recognized by lookahead before integer
    /// parsing. Restores the cursor and yields `None` if the shape does
    /// not hold.
    fn try_parse_reference(&mut self) -> Option<ObjectId> {
        let start = self.pos;
        let result = (|| {
            let number = self.parse_raw_uint()?;
            if !self.current().is_some_and(is_whitespace) {
                return None;
            }
            self.skip_whitespace();
            let generation = self.parse_raw_uint()?;
            if !self.current().is_some_and(is_whitespace) {
                return None;
            }
            self.skip_whitespace();
            if !self.advance_keyword(b"R") {
                return None;
            }
            Some((u32::try_from(number).ok()?, u16::try_from(generation).ok()?))
        })();
        if result.is_none() {
            self.pos = start;
        }
        result
    }

    /// An integer or real. A dot anywhere makes it a real.
    fn parse_numeric(&mut self) -> Result<PDFObject> {
        let start = self.pos;
        if matches!(self.current(), Some(b'+' | b'-')) {
            self.pos += 1;
        }
        let mut is_real = false;
        while let Some(b) = self.current() {
            match b {
                b'0'..=b'9' => self.pos += 1,
                b'.' => {
                    is_real = true;
                    self.pos += 1;
                }
                _ => break,
            }
        }
        // only sign, digit and dot bytes were consumed
        let text = String::from_utf8_lossy(&self.data[start..self.pos]);
        if is_real {
            let value: f64 = text
                .parse()
                .map_err(|_| PDFError::parse(format!("invalid real number '{text}'")))?;
            Ok(PDFObject::Real(value))
        } else {
            let value: i64 = text
                .parse()
                .map_err(|_| PDFError::parse(format!("invalid integer '{text}'")))?;
            Ok(PDFObject::Integer(value))
        }
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token().transpose()
    }
}

/// A token produced inside a content stream: an object, or an operator.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentToken {
    Object(PDFObject),
    Operator(Vec<u8>),
}

/// Tokenizer variant for content streams.
///
/// Content streams interleave operands (ordinary objects) with operator
/// keywords, which are name-like byte sequences not preceded by a slash.
/// This tokenizer yields both; interpretation of the operators is left to
/// downstream consumers.
pub struct ContentStreamTokenizer<'a> {
    inner: Tokenizer<'a>,
}

impl<'a> ContentStreamTokenizer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        ContentStreamTokenizer {
            inner: Tokenizer::new(data),
        }
    }

    pub fn next_token(&mut self) -> Result<Option<ContentToken>> {
        loop {
            self.inner.skip_whitespace();
            let Some(b) = self.inner.current() else {
                return Ok(None);
            };
            match b {
                b'%' => {
                    self.inner.parse_comment();
                }
                b'/' | b'<' | b'[' | b'(' | b'+' | b'-' | b'.' | b'0'..=b'9' => {
                    return Ok(Some(ContentToken::Object(self.inner.next_object()?)));
                }
                _ => {
                    if self.inner.advance_keyword(b"true") {
                        return Ok(Some(ContentToken::Object(PDFObject::Boolean(true))));
                    }
                    if self.inner.advance_keyword(b"false") {
                        return Ok(Some(ContentToken::Object(PDFObject::Boolean(false))));
                    }
                    if self.inner.advance_keyword(b"null") {
                        return Ok(Some(ContentToken::Object(PDFObject::Null)));
                    }
                    return Ok(Some(ContentToken::Operator(self.parse_operator()?)));
                }
            }
        }
    }

    fn parse_operator(&mut self) -> Result<Vec<u8>> {
        let mut atom = Vec::new();
        while let Some(b) = self.inner.current() {
            if is_whitespace(b) || is_delimiter(b) {
                break;
            }
            atom.push(b);
            self.inner.advance(1);
        }
        if atom.is_empty() {
            return Err(PDFError::parse("empty operator in content stream"));
        }
        Ok(atom)
    }
}

impl<'a> Iterator for ContentStreamTokenizer<'a> {
    type Item = Result<ContentToken>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token().transpose()
    }
}
