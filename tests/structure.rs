use pdfcos::filters::{decode_with, encode_with};
use pdfcos::{PDFDocument, PDFError, PDFObject};

mod common;

use common::PdfBuilder;

fn simple_pdf() -> Vec<u8> {
    let mut builder = PdfBuilder::new("1.4");
    builder.add_object(1, "<< /Type /Catalog /Pages 2 0 R >>");
    builder.add_object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>");
    builder.add_object(
        3,
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R >>",
    );
    builder.add_stream_object(4, "", b"q\n0 0 612 792 re\nf\nQ");
    builder.add_object(5, "<< /Producer (pdfcos) /CreationDate (D:20240102030405Z) >>");
    builder.write_xref("/Root 1 0 R /Info 5 0 R");
    builder.into_bytes()
}

#[test]
fn simple_parse() {
    let document = PDFDocument::from_bytes(&simple_pdf()).unwrap();

    // the merged table covers exactly Size entries
    let size = document
        .trailer()
        .get(b"Size")
        .and_then(PDFObject::as_i64)
        .unwrap();
    assert_eq!(document.xref().len() as i64, size);

    let catalog = document.catalog().unwrap();
    assert!(catalog.type_is(b"Catalog"));

    // every in-use entry resolved into the store
    for (&id, entry) in document.xref() {
        if !entry.is_free() {
            assert!(!document.get_object(id).unwrap().is_null());
        }
    }

    let pages = document.pages().unwrap();
    assert_eq!(pages.len(), 1);
    let contents = pages[0].dict().unwrap().get(b"Contents").unwrap();
    assert!(document.resolve(contents).unwrap().as_stream().is_some());
    assert_eq!(pages[0].content_data().unwrap(), b"q\n0 0 612 792 re\nf\nQ");
    assert_eq!(pages[0].mediabox(), Some([0.0, 0.0, 612.0, 792.0]));
}

#[test]
fn incremental_update() {
    let mut builder = PdfBuilder::new("1.4");
    builder.add_object(1, "<< /Type /Catalog /Pages 2 0 R >>");
    builder.add_object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>");
    builder.add_object(
        3,
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 100 100] >>",
    );
    let first_xref = builder.write_xref("/Root 1 0 R");

    // an appended revision replaces page 3
    builder.add_object(
        3,
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 999 999] >>",
    );
    builder.write_xref(&format!("/Root 1 0 R /Prev {first_xref}"));

    let document = PDFDocument::from_bytes(&builder.into_bytes()).unwrap();
    assert_eq!(document.updates().len(), 2);

    let size = document
        .trailer()
        .get(b"Size")
        .and_then(PDFObject::as_i64)
        .unwrap();
    assert_eq!(document.xref().len() as i64, size);

    // the newer entry shadows the older one
    let pages = document.pages().unwrap();
    assert_eq!(pages[0].mediabox(), Some([0.0, 0.0, 999.0, 999.0]));
}

#[test]
fn compressed_xref_and_object_stream() {
    let mut builder = PdfBuilder::new("1.5");

    let content_raw: &[u8] = b"q\n0.000008871 0 595.32 841.92 re\nf\nQ";
    let content = encode_with(&[b"FlateDecode".to_vec()], &[None], content_raw).unwrap();
    let content_offset = builder.offset();
    builder.add_stream_object(4, "/Filter /FlateDecode", &content);

    // objects 1..3 live inside an object stream
    let members = [
        "<< /Type /Catalog /Pages 2 0 R >>",
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>",
        "<< /Type /Page /Parent 2 0 R /Contents 4 0 R /MediaBox [0 0 595 842] >>",
    ];
    let mut pairs = String::new();
    let mut bodies = String::new();
    let mut member_offset = 0usize;
    for (index, member) in members.iter().enumerate() {
        pairs.push_str(&format!("{} {} ", index + 1, member_offset));
        member_offset += member.len() + 1;
        bodies.push_str(member);
        bodies.push('\n');
    }
    let first = pairs.len();
    let payload = format!("{pairs}{bodies}");
    let objstm_offset = builder.offset();
    builder.add_stream_object(
        5,
        &format!("/Type /ObjStm /N 3 /First {first}"),
        payload.as_bytes(),
    );

    // the cross-reference stream maps 1..3 into the object stream
    let xref_offset = builder.offset();
    let be16 = |value: usize| [(value >> 8) as u8, (value & 0xff) as u8];
    let mut rows: Vec<u8> = Vec::new();
    rows.extend_from_slice(&[0, 0, 0, 0xff, 0xff]); // object 0: free
    for index in 0..3u8 {
        rows.push(2);
        rows.extend_from_slice(&be16(5));
        rows.extend_from_slice(&be16(index as usize));
    }
    rows.push(1);
    rows.extend_from_slice(&be16(content_offset));
    rows.extend_from_slice(&[0, 0]);
    rows.push(1);
    rows.extend_from_slice(&be16(objstm_offset));
    rows.extend_from_slice(&[0, 0]);
    rows.push(1);
    rows.extend_from_slice(&be16(xref_offset));
    rows.extend_from_slice(&[0, 0]);

    builder.add_stream_object(
        6,
        "/Type /XRef /Size 7 /W [1 2 2] /Root 1 0 R",
        &rows,
    );
    builder.finish_with_startxref(xref_offset);

    let document = PDFDocument::from_bytes(&builder.into_bytes()).unwrap();

    // the catalog resolves through the object stream
    let catalog = document.catalog().unwrap();
    assert!(catalog.type_is(b"Catalog"));

    let pages = document.pages().unwrap();
    assert_eq!(pages.len(), 1);
    assert!(pages[0].content_data().unwrap().starts_with(b"q\n"));
}

#[test]
fn bad_stream_length() {
    let mut builder = PdfBuilder::new("1.4");
    builder.add_object(1, "<< /Type /Catalog /Pages 2 0 R >>");
    builder.add_object(2, "<< /Type /Pages /Kids [] /Count 0 >>");
    // Length overshoots the payload, so 'endstream' is not at the
    // computed offset
    builder.add_raw_object(3, b"<< /Length 60 >>\nstream\nq Q\nendstream");
    builder.write_xref("/Root 1 0 R");
    let bytes = builder.into_bytes();

    // strict mode refuses the document outright
    assert!(matches!(
        PDFDocument::from_bytes_strict(&bytes),
        Err(PDFError::Parse(_))
    ));

    // tolerant mode soft-fails the object to null
    let document = PDFDocument::from_bytes(&bytes).unwrap();
    assert!(document.get_object((3, 0)).unwrap().is_null());
}

#[test]
fn startxref_offset_correction() {
    let bytes = simple_pdf();
    let text = String::from_utf8(bytes.clone()).unwrap();
    let real_offset = text
        .rfind("startxref\n")
        .map(|pos| text[pos + 10..].trim().trim_end_matches("%%EOF").trim())
        .unwrap()
        .parse::<usize>()
        .unwrap();
    let skewed = text.replace(
        &format!("startxref\n{real_offset}"),
        &format!("startxref\n{}", real_offset + 3),
    );

    // tolerant mode snaps to the nearest xref section
    let document = PDFDocument::from_bytes(skewed.as_bytes()).unwrap();
    assert!(document.catalog().unwrap().type_is(b"Catalog"));

    // strict mode refuses
    assert!(PDFDocument::from_bytes_strict(skewed.as_bytes()).is_err());
}

#[test]
fn filter_round_trips() {
    // the documented vectors
    assert_eq!(
        decode_with(&[b"ASCIIHexDecode".to_vec()], &[None], b"50444673>", None).unwrap(),
        b"PDFs"
    );
    assert_eq!(
        decode_with(&[b"ASCII85Decode".to_vec()], &[None], b":ddco~>", None).unwrap(),
        b"PDFs"
    );
    let flated = encode_with(&[b"FlateDecode".to_vec()], &[None], b"PDFs").unwrap();
    assert_eq!(
        decode_with(&[b"FlateDecode".to_vec()], &[None], &flated, None).unwrap(),
        b"PDFs"
    );
}
