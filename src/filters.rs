use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

use crate::bytes::{hex_value, is_whitespace};
use crate::constants::DECODE_PARMS;
use crate::error::{PDFError, Result};
use crate::objects::{Dictionary, ObjectId, PDFObject, Stream};
use crate::security::StandardSecurityHandler;

/// Decryption state handed to the Crypt filter. The handler knows the
/// document's crypt filters; the key is the file encryption key and the
/// reference identifies the object whose bytes are being processed.
pub struct CryptContext<'a> {
    pub handler: &'a StandardSecurityHandler,
    pub key: &'a [u8],
    pub reference: ObjectId,
}

/// Decodes the payload of a stream by applying its filters left to right
/// on the running buffer.
pub fn decode_stream(stream: &Stream, crypt: Option<&CryptContext>) -> Result<Vec<u8>> {
    let filters = stream.filter_names();
    let parms = decode_parms_list(stream.dict.get(DECODE_PARMS), filters.len());
    decode_with(&filters, &parms, &stream.data, crypt)
}

/// Applies the named filters in order to `data`.
pub fn decode_with(
    filters: &[Vec<u8>],
    parms: &[Option<Dictionary>],
    data: &[u8],
    crypt: Option<&CryptContext>,
) -> Result<Vec<u8>> {
    let mut output = data.to_vec();
    for (idx, name) in filters.iter().enumerate() {
        let params = parms.get(idx).and_then(Option::as_ref);
        output = match name.as_slice() {
            b"ASCIIHexDecode" => ascii_hex_decode(&output)?,
            b"ASCII85Decode" => ascii85_decode(&output)?,
            b"RunLengthDecode" => run_length_decode(&output)?,
            b"FlateDecode" => flate_decode(&output, params)?,
            b"Crypt" => crypt_decode(&output, params, crypt)?,
            other => {
                return Err(PDFError::filter(format!(
                    "unsupported filter '{}'",
                    String::from_utf8_lossy(other)
                )));
            }
        };
    }
    Ok(output)
}

/// Encodes `data` for a stream whose Filter entry lists `filters`. Since
/// decoding runs left to right, encoding applies the filters in reverse.
pub fn encode_with(
    filters: &[Vec<u8>],
    parms: &[Option<Dictionary>],
    data: &[u8],
) -> Result<Vec<u8>> {
    let mut output = data.to_vec();
    for (idx, name) in filters.iter().enumerate().rev() {
        let params = parms.get(idx).and_then(Option::as_ref);
        output = match name.as_slice() {
            b"ASCIIHexDecode" => ascii_hex_encode(&output),
            b"ASCII85Decode" => ascii85_encode(&output),
            b"RunLengthDecode" => run_length_encode(&output),
            b"FlateDecode" => flate_encode(&output, params)?,
            other => {
                return Err(PDFError::filter(format!(
                    "unsupported filter '{}' for encoding",
                    String::from_utf8_lossy(other)
                )));
            }
        };
    }
    Ok(output)
}

/// Normalizes a DecodeParms entry (single dictionary or array aligned with
/// the filter list) into one optional dictionary per filter.
pub(crate) fn decode_parms_list(entry: Option<&PDFObject>, count: usize) -> Vec<Option<Dictionary>> {
    let mut parms = match entry {
        Some(PDFObject::Dictionary(dict)) => vec![Some(dict.clone())],
        Some(PDFObject::Array(items)) => items
            .iter()
            .map(|item| match item {
                PDFObject::Dictionary(dict) => Some(dict.clone()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };
    parms.resize_with(count, || None);
    parms
}

/// Hex representation of bytes, terminated by `>`.
fn ascii_hex_decode(data: &[u8]) -> Result<Vec<u8>> {
    let Some(&b'>') = data.last() else {
        return Err(PDFError::filter("ASCIIHex: EOD '>' not at end of stream"));
    };
    let mut out = Vec::with_capacity(data.len() / 2);
    let mut high: Option<u8> = None;
    for &b in &data[..data.len() - 1] {
        if is_whitespace(b) {
            continue;
        }
        let value = hex_value(b)
            .ok_or_else(|| PDFError::filter(format!("ASCIIHex: invalid digit 0x{b:02x}")))?;
        match high.take() {
            Some(hi) => out.push(hi << 4 | value),
            None => high = Some(value),
        }
    }
    // An odd final digit behaves as if followed by zero
    if let Some(hi) = high {
        out.push(hi << 4);
    }
    Ok(out)
}

fn ascii_hex_encode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() * 2 + 1);
    for b in data {
        out.extend_from_slice(format!("{b:02X}").as_bytes());
    }
    out.push(b'>');
    out
}

/// Adobe base-85: four bytes to five characters in `!`..`u`, `z` as the
/// shorthand for four zero bytes, terminated by `~>`.
fn ascii85_decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut stripped: Vec<u8> = data
        .iter()
        .copied()
        .filter(|b| !is_whitespace(*b))
        .collect();
    if let Some(rest) = stripped.strip_prefix(b"<~") {
        stripped = rest.to_vec();
    }
    let body = stripped
        .strip_suffix(b"~>")
        .ok_or_else(|| PDFError::filter("ASCII85: EOD '~>' not at end of stream"))?;

    let mut out = Vec::with_capacity(body.len() * 4 / 5 + 4);
    let mut group = [0u8; 5];
    let mut filled = 0usize;

    // A partial final group is padded with 'u' (84) and contributes one
    // byte fewer than its character count.
    fn flush(group: &[u8; 5], filled: usize, out: &mut Vec<u8>) -> Result<()> {
        let mut value = 0u64;
        for i in 0..5 {
            let digit = if i < filled { group[i] } else { 84 };
            value = value * 85 + digit as u64;
        }
        let value = u32::try_from(value)
            .map_err(|_| PDFError::filter("ASCII85: group value out of range"))?;
        out.extend_from_slice(&value.to_be_bytes()[..filled - 1]);
        Ok(())
    }

    for &b in body {
        if b == b'z' {
            if filled != 0 {
                return Err(PDFError::filter("ASCII85: 'z' inside a group"));
            }
            out.extend_from_slice(&[0, 0, 0, 0]);
            continue;
        }
        if !(b'!'..=b'u').contains(&b) {
            return Err(PDFError::filter(format!("ASCII85: invalid byte 0x{b:02x}")));
        }
        group[filled] = b - b'!';
        filled += 1;
        if filled == 5 {
            flush(&group, 5, &mut out)?;
            filled = 0;
        }
    }

    match filled {
        0 => {}
        1 => return Err(PDFError::filter("ASCII85: dangling final character")),
        _ => flush(&group, filled, &mut out)?,
    }
    Ok(out)
}

fn ascii85_encode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() * 5 / 4 + 2);
    for chunk in data.chunks(4) {
        let mut padded = [0u8; 4];
        padded[..chunk.len()].copy_from_slice(chunk);
        let mut value = u32::from_be_bytes(padded);
        if value == 0 && chunk.len() == 4 {
            out.push(b'z');
            continue;
        }
        let mut digits = [0u8; 5];
        for digit in digits.iter_mut().rev() {
            *digit = (value % 85) as u8 + b'!';
            value /= 85;
        }
        out.extend_from_slice(&digits[..chunk.len() + 1]);
    }
    out.extend_from_slice(b"~>");
    out
}

/// Run-length decoding. For each lead byte L: 0..=127 copies the next
/// L + 1 bytes verbatim, 129..=255 repeats the next byte 257 - L times,
/// and 128 terminates without consuming further data.
fn run_length_decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut idx = 0usize;
    while idx < data.len() {
        let lead = data[idx];
        idx += 1;
        match lead {
            0..=127 => {
                let count = lead as usize + 1;
                let run = data
                    .get(idx..idx + count)
                    .ok_or_else(|| PDFError::filter("RunLength: literal run past end of data"))?;
                out.extend_from_slice(run);
                idx += count;
            }
            128 => break,
            129..=255 => {
                let &value = data
                    .get(idx)
                    .ok_or_else(|| PDFError::filter("RunLength: repeat run past end of data"))?;
                out.extend(std::iter::repeat(value).take(257 - lead as usize));
                idx += 1;
            }
        }
    }
    Ok(out)
}

fn run_length_encode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut idx = 0usize;
    while idx < data.len() {
        // length of the repeat run starting here, capped at 128
        let mut run = 1usize;
        while idx + run < data.len() && data[idx + run] == data[idx] && run < 128 {
            run += 1;
        }
        if run >= 2 {
            out.push((257 - run) as u8);
            out.push(data[idx]);
            idx += run;
            continue;
        }
        // literal run up to the next three-byte repeat
        let start = idx;
        while idx < data.len() && idx - start < 128 {
            if idx + 2 < data.len() && data[idx] == data[idx + 1] && data[idx] == data[idx + 2] {
                break;
            }
            idx += 1;
        }
        out.push((idx - start - 1) as u8);
        out.extend_from_slice(&data[start..idx]);
    }
    out.push(128);
    out
}

/// Predictor parameters for FlateDecode.
struct PredictorParams {
    predictor: i64,
    colors: usize,
    bits_per_component: usize,
    columns: usize,
}

impl PredictorParams {
    fn from_dict(params: Option<&Dictionary>) -> Self {
        let int = |key: &[u8], default: i64| {
            params
                .and_then(|p| p.get(key))
                .and_then(PDFObject::as_i64)
                .unwrap_or(default)
        };
        PredictorParams {
            predictor: int(b"Predictor", 1),
            colors: int(b"Colors", 1).max(1) as usize,
            bits_per_component: int(b"BitsPerComponent", 8).max(1) as usize,
            columns: int(b"Columns", 1).max(1) as usize,
        }
    }

    fn sample_length(&self) -> usize {
        (self.colors * self.bits_per_component).div_ceil(8)
    }

    fn row_length(&self) -> usize {
        self.sample_length() * self.columns
    }
}

fn flate_decode(data: &[u8], params: Option<&Dictionary>) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut uncompressed = Vec::new();
    decoder
        .read_to_end(&mut uncompressed)
        .map_err(|e| PDFError::filter(format!("FlateDecode: {e}")))?;

    let params = PredictorParams::from_dict(params);
    match params.predictor {
        1 => Ok(uncompressed),
        2 => Err(PDFError::filter("FlateDecode: TIFF Predictor 2 not supported")),
        10..=15 => Ok(undo_png_prediction(&uncompressed, &params)?),
        other => Err(PDFError::filter(format!(
            "FlateDecode: Predictor {other} not supported"
        ))),
    }
}

fn flate_encode(data: &[u8], params: Option<&Dictionary>) -> Result<Vec<u8>> {
    let params = PredictorParams::from_dict(params);
    let filtered = match params.predictor {
        1 => data.to_vec(),
        2 => return Err(PDFError::filter("FlateDecode: TIFF Predictor 2 not supported")),
        10..=15 => apply_png_prediction(data, &params)?,
        other => {
            return Err(PDFError::filter(format!(
                "FlateDecode: Predictor {other} not supported"
            )));
        }
    };
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&filtered)
        .and_then(|_| encoder.finish())
        .map_err(|e| PDFError::filter(format!("FlateDecode: {e}")))
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let (a, b, c) = (a as i32, b as i32, c as i32);
    let p = a + b - c;
    let pa = (p - a).abs();
    let pb = (p - b).abs();
    let pc = (p - c).abs();
    if pa <= pb && pa <= pc {
        a as u8
    } else if pb <= pc {
        b as u8
    } else {
        c as u8
    }
}

/// Undoes the per-row PNG filters. Each encoded row is the filter type
/// byte followed by `row_length` filtered bytes; reconstruction uses the
/// decoded left (a), up (b) and up-left (c) neighbors, modulo 256.
fn undo_png_prediction(filtered: &[u8], params: &PredictorParams) -> Result<Vec<u8>> {
    let sample_length = params.sample_length();
    let row_length = params.row_length();
    let mut previous = vec![0u8; row_length];
    let mut output = Vec::with_capacity(filtered.len());

    for chunk in filtered.chunks(1 + row_length) {
        let filter_type = chunk[0];
        let mut row = chunk[1..].to_vec();
        for c in 0..row.len() {
            let left = if c >= sample_length { row[c - sample_length] } else { 0 };
            let up = previous[c];
            let up_left = if c >= sample_length {
                previous[c - sample_length]
            } else {
                0
            };
            row[c] = match filter_type {
                0 => row[c],
                1 => row[c].wrapping_add(left),
                2 => row[c].wrapping_add(up),
                3 => row[c].wrapping_add((((left as u16 + up as u16) / 2) & 0xff) as u8),
                4 => row[c].wrapping_add(paeth(left, up, up_left)),
                other => {
                    return Err(PDFError::filter(format!(
                        "FlateDecode [png]: row uses unsupported filter {other}"
                    )));
                }
            };
        }
        output.extend_from_slice(&row);
        previous = row;
    }
    Ok(output)
}

/// Applies the PNG filter named by the predictor (10 is None, 11 Sub, 12
/// Up, 13 Average, 14 Paeth; 15 picks Paeth). The reference bytes come
/// from the unfiltered data so that decoding is the exact inverse.
fn apply_png_prediction(data: &[u8], params: &PredictorParams) -> Result<Vec<u8>> {
    let sample_length = params.sample_length();
    let row_length = params.row_length();
    let filter_type: u8 = match params.predictor {
        10..=14 => (params.predictor - 10) as u8,
        15 => 4,
        _ => unreachable!("checked by caller"),
    };

    let mut previous = vec![0u8; row_length];
    let mut output = Vec::with_capacity(data.len() + data.len() / row_length.max(1) + 1);

    for raw in data.chunks(row_length) {
        output.push(filter_type);
        for c in 0..raw.len() {
            let left = if c >= sample_length { raw[c - sample_length] } else { 0 };
            let up = previous[c];
            let up_left = if c >= sample_length {
                previous[c - sample_length]
            } else {
                0
            };
            let encoded = match filter_type {
                0 => raw[c],
                1 => raw[c].wrapping_sub(left),
                2 => raw[c].wrapping_sub(up),
                3 => raw[c].wrapping_sub((((left as u16 + up as u16) / 2) & 0xff) as u8),
                4 => raw[c].wrapping_sub(paeth(left, up, up_left)),
                _ => unreachable!(),
            };
            output.push(encoded);
        }
        previous = raw.to_vec();
        previous.resize(row_length, 0);
    }
    Ok(output)
}

/// The Crypt filter defers to the security handler. `Identity` passes the
/// input through unchanged; any other name selects a crypt filter from the
/// encryption dictionary's CF table.
fn crypt_decode(
    data: &[u8],
    params: Option<&Dictionary>,
    crypt: Option<&CryptContext>,
) -> Result<Vec<u8>> {
    let name = params
        .and_then(|p| p.get(b"Name"))
        .and_then(PDFObject::as_name)
        .unwrap_or(b"Identity");
    if name == b"Identity" {
        return Ok(data.to_vec());
    }
    let Some(ctx) = crypt else {
        return Err(PDFError::crypto(
            "Crypt filter present but the document has no decryption key",
        ));
    };
    let crypt_filter = ctx.handler.crypt_filter(name).ok_or_else(|| {
        PDFError::crypto(format!(
            "crypt filter '{}' not defined by the encryption dictionary",
            String::from_utf8_lossy(name)
        ))
    })?;
    ctx.handler
        .decrypt_with_filter(ctx.key, data, ctx.reference, &crypt_filter)
}
