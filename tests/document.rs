use pdfcos::objects::{Dictionary, ObjectId, PDFObject, Stream};
use pdfcos::{PDFDocument, PDFVersion, PermsAcquired, Serializer, StandardSecurityHandler};

mod common;

use common::{PdfBuilder, nested_tree_pdf};

fn page_dict(width: i64) -> Dictionary {
    let mut page = Dictionary::new();
    page.set("Type", PDFObject::Name(b"Page".to_vec()));
    page.set(
        "MediaBox",
        PDFObject::Array(vec![
            PDFObject::Integer(0),
            PDFObject::Integer(0),
            PDFObject::Integer(width),
            PDFObject::Integer(width),
        ]),
    );
    page
}

/// Counts the leaf pages reachable from a tree node by DFS.
fn leaves_below(document: &PDFDocument, id: ObjectId) -> usize {
    let dict = document.get_object(id).unwrap().as_dict().unwrap();
    if dict.type_is(b"Page") {
        return 1;
    }
    let mut total = 0;
    if let Some(kids) = dict.get(b"Kids").and_then(PDFObject::as_array) {
        for kid in kids {
            total += leaves_below(document, kid.as_reference().unwrap());
        }
    }
    total
}

/// Every page-tree node's Count must equal its reachable leaf count.
fn assert_counts_consistent(document: &PDFDocument) {
    for (id, object) in document.objects() {
        let Some(dict) = object.as_dict() else { continue };
        if dict.type_is(b"Pages") {
            let count = dict.get(b"Count").and_then(PDFObject::as_i64).unwrap();
            assert_eq!(
                count as usize,
                leaves_below(document, id),
                "Count of node {} {} does not match its leaves",
                id.0,
                id.1
            );
        }
    }
}

#[test]
fn page_mutation_round_trip() {
    let mut document = PDFDocument::from_bytes(&nested_tree_pdf()).unwrap();
    assert_eq!(document.page_count().unwrap(), 4);

    document.insert_page(0, page_dict(300)).unwrap();
    document.append_page(page_dict(500)).unwrap();
    assert_counts_consistent(&document);

    let mut saved = Vec::new();
    document.save(&mut saved).unwrap();

    let reparsed = PDFDocument::from_bytes(&saved).unwrap();
    let pages = reparsed.pages().unwrap();
    assert_eq!(pages.len(), 6);
    assert_eq!(pages[0].mediabox(), Some([0.0, 0.0, 300.0, 300.0]));
    assert_eq!(pages[5].mediabox(), Some([0.0, 0.0, 500.0, 500.0]));
    // the original four keep their order in the middle
    assert_eq!(pages[1].mediabox(), Some([0.0, 0.0, 100.0, 100.0]));
    assert_eq!(pages[4].mediabox(), Some([0.0, 0.0, 400.0, 400.0]));
    assert_counts_consistent(&reparsed);
}

#[test]
fn remove_and_replace_pages() {
    let mut document = PDFDocument::from_bytes(&nested_tree_pdf()).unwrap();

    let removed = document.remove_page(1).unwrap();
    assert_eq!(
        removed.get(b"MediaBox").and_then(PDFObject::as_array).map(|a| a.len()),
        Some(4)
    );
    assert_eq!(document.page_count().unwrap(), 3);
    assert_counts_consistent(&document);

    let replaced_id = document.replace_page(0, page_dict(777)).unwrap();
    assert_eq!(document.page_count().unwrap(), 3);
    let pages = document.pages().unwrap();
    assert_eq!(pages[0].id, replaced_id);
    assert_eq!(pages[0].mediabox(), Some([0.0, 0.0, 777.0, 777.0]));
    assert_counts_consistent(&document);

    // the removed page's object is gone from the store
    let old_ids: Vec<ObjectId> = document
        .objects()
        .filter(|(_, object)| {
            object
                .as_dict()
                .is_some_and(|dict| dict.type_is(b"Page"))
        })
        .map(|(id, _)| id)
        .collect();
    assert_eq!(old_ids.len(), 3);
}

#[test]
fn cross_document_clone() {
    // source: one page with contents and a resource chain
    let mut builder = PdfBuilder::new("1.6");
    builder.add_object(1, "<< /Type /Catalog /Pages 2 0 R >>");
    builder.add_object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>");
    builder.add_object(
        3,
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 240 240] \
         /Resources 5 0 R /Contents 4 0 R >>",
    );
    builder.add_stream_object(4, "", b"q\nBT /F1 11 Tf (cloned) Tj ET\nQ");
    builder.add_object(5, "<< /Font << /F1 6 0 R >> >>");
    builder.add_object(
        6,
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>",
    );
    builder.write_xref("/Root 1 0 R");
    let source = PDFDocument::from_bytes(&builder.into_bytes()).unwrap();

    let mut target = PDFDocument::from_bytes(&nested_tree_pdf()).unwrap();
    let cloned_id = target.insert_page_from(2, &source, 0).unwrap();

    assert_eq!(target.page_count().unwrap(), 5);
    assert_counts_consistent(&target);

    let pages = target.pages().unwrap();
    assert_eq!(pages[2].id, cloned_id);
    assert_eq!(pages[2].mediabox(), Some([0.0, 0.0, 240.0, 240.0]));
    assert_eq!(
        pages[2].content_data().unwrap(),
        b"q\nBT /F1 11 Tf (cloned) Tj ET\nQ"
    );

    // the resource chain was deep-copied under fresh numbers
    let resources = pages[2].resources().unwrap();
    let font = target
        .resolve(resources.get(b"Font").unwrap())
        .unwrap()
        .as_dict()
        .unwrap();
    let helvetica = target.resolve(font.get(b"F1").unwrap()).unwrap();
    assert!(helvetica.as_dict().unwrap().type_is(b"Font"));

    // the source document is untouched
    assert_eq!(source.page_count().unwrap(), 1);

    // a save/reparse keeps the clone intact
    let mut saved = Vec::new();
    target.save(&mut saved).unwrap();
    let reparsed = PDFDocument::from_bytes(&saved).unwrap();
    assert_eq!(reparsed.page_count().unwrap(), 5);
    assert_eq!(
        reparsed.pages().unwrap()[2].content_data().unwrap(),
        b"q\nBT /F1 11 Tf (cloned) Tj ET\nQ"
    );
}

/// Assembles an encrypted single-page document using the security
/// handler itself for the O/U entries and the object ciphertexts.
fn encrypted_pdf(user_password: &[u8], owner_password: &[u8]) -> Vec<u8> {
    let id0 = b"\x8b\xd9\x2a\x11\x45\x00\x33\x7f".to_vec();

    let mut encryption = Dictionary::new();
    encryption.set("Filter", PDFObject::Name(b"Standard".to_vec()));
    encryption.set("V", 4i64);
    encryption.set("R", 4i64);
    encryption.set("Length", 128i64);
    encryption.set("P", -3904i64);
    let mut std_cf = Dictionary::new();
    std_cf.set("Type", PDFObject::Name(b"CryptFilter".to_vec()));
    std_cf.set("CFM", PDFObject::Name(b"AESV2".to_vec()));
    let mut cf = Dictionary::new();
    cf.set("StdCF", PDFObject::Dictionary(std_cf));
    encryption.set("CF", cf);
    encryption.set("StmF", PDFObject::Name(b"StdCF".to_vec()));
    encryption.set("StrF", PDFObject::Name(b"StdCF".to_vec()));

    let handler = StandardSecurityHandler::new(encryption.clone(), id0.clone()).unwrap();
    let o = handler.compute_owner_value(owner_password, user_password);
    encryption.set("O", PDFObject::String(o.clone()));

    let mut handler_with_o = StandardSecurityHandler::new(encryption.clone(), id0.clone()).unwrap();
    let u = handler_with_o.compute_user_value(user_password).unwrap();
    encryption.set("U", PDFObject::String(u));
    handler_with_o = StandardSecurityHandler::new(encryption.clone(), id0.clone()).unwrap();

    let key = handler_with_o
        .authenticate_user_password(user_password)
        .unwrap()
        .expect("self-computed U entry must authenticate");

    // object identities: 1 catalog, 2 pages, 3 page, 4 contents, 5 info,
    // 6 encryption dictionary
    let content = handler_with_o
        .encrypt_object(&key, b"q\n0 0 200 200 re\nf\nQ", (4, 0), pdfcos::security::CryptTarget::Stream)
        .unwrap();
    let title = handler_with_o
        .encrypt_object(&key, b"locked away", (5, 0), pdfcos::security::CryptTarget::String)
        .unwrap();

    let mut catalog = Dictionary::new();
    catalog.set("Type", PDFObject::Name(b"Catalog".to_vec()));
    catalog.set("Pages", PDFObject::Reference((2, 0)));

    let mut pages = Dictionary::new();
    pages.set("Type", PDFObject::Name(b"Pages".to_vec()));
    pages.set("Kids", PDFObject::Array(vec![PDFObject::Reference((3, 0))]));
    pages.set("Count", 1i64);

    let mut page = Dictionary::new();
    page.set("Type", PDFObject::Name(b"Page".to_vec()));
    page.set("Parent", PDFObject::Reference((2, 0)));
    page.set(
        "MediaBox",
        PDFObject::Array(vec![
            PDFObject::Integer(0),
            PDFObject::Integer(0),
            PDFObject::Integer(200),
            PDFObject::Integer(200),
        ]),
    );
    page.set("Contents", PDFObject::Reference((4, 0)));

    let mut info = Dictionary::new();
    info.set("Title", PDFObject::String(title));

    let mut ser = Serializer::new();
    ser.write_header(PDFVersion::V1_6);
    let mut entries = vec![(
        0u32,
        pdfcos::XrefEntry::Free {
            next_free: 0,
            next_generation: 65535,
        },
    )];
    let objects: Vec<(ObjectId, PDFObject)> = vec![
        ((1, 0), PDFObject::Dictionary(catalog)),
        ((2, 0), PDFObject::Dictionary(pages)),
        ((3, 0), PDFObject::Dictionary(page)),
        ((4, 0), PDFObject::Stream(Stream::new(Dictionary::new(), content))),
        ((5, 0), PDFObject::Dictionary(info)),
        ((6, 0), PDFObject::Dictionary(encryption)),
    ];
    for (id, object) in &objects {
        let offset = ser.write_object(*id, object);
        entries.push((
            id.0,
            pdfcos::XrefEntry::InUse {
                offset,
                generation: id.1,
            },
        ));
    }
    let startxref = ser.write_xref_section(&entries);

    let mut trailer = Dictionary::new();
    trailer.set("Size", 7i64);
    trailer.set("Root", PDFObject::Reference((1, 0)));
    trailer.set("Info", PDFObject::Reference((5, 0)));
    trailer.set("Encrypt", PDFObject::Reference((6, 0)));
    trailer.set(
        "ID",
        PDFObject::Array(vec![
            PDFObject::String(id0.clone()),
            PDFObject::String(id0),
        ]),
    );
    ser.write_trailer(&trailer, startxref);
    ser.write_eof();
    ser.into_bytes()
}

#[test]
fn password_authentication() {
    let bytes = encrypted_pdf(b"u", b"o");
    let mut document = PDFDocument::from_bytes(&bytes).unwrap();

    // the empty password does not open this document
    assert!(document.is_locked());
    assert_eq!(document.access_level(), PermsAcquired::None);
    assert!(document.pages().is_err());

    assert_eq!(document.decrypt("x").unwrap(), PermsAcquired::None);
    assert!(document.is_locked());

    assert_eq!(document.decrypt("u").unwrap(), PermsAcquired::User);
    assert!(!document.is_locked());

    let pages = document.pages().unwrap();
    assert_eq!(pages[0].content_data().unwrap(), b"q\n0 0 200 200 re\nf\nQ");
    assert_eq!(document.info().unwrap().title().unwrap(), "locked away");

    // the owner password grants owner access
    let mut fresh = PDFDocument::from_bytes(&bytes).unwrap();
    assert_eq!(fresh.decrypt("o").unwrap(), PermsAcquired::Owner);
}

#[test]
fn empty_user_password_opens_on_parse() {
    let bytes = encrypted_pdf(b"", b"owner only");
    let document = PDFDocument::from_bytes(&bytes).unwrap();
    assert!(!document.is_locked());
    assert_eq!(document.access_level(), PermsAcquired::User);
    assert_eq!(
        document.pages().unwrap()[0].content_data().unwrap(),
        b"q\n0 0 200 200 re\nf\nQ"
    );
}

#[test]
fn encrypted_save_round_trip() {
    let bytes = encrypted_pdf(b"u", b"o");
    let mut document = PDFDocument::from_bytes(&bytes).unwrap();
    assert_eq!(document.decrypt("u").unwrap(), PermsAcquired::User);

    let mut saved = Vec::new();
    document.save(&mut saved).unwrap();

    // the rewrite is still encrypted under the same passwords
    let mut reparsed = PDFDocument::from_bytes(&saved).unwrap();
    assert!(reparsed.is_locked());
    assert_eq!(reparsed.decrypt("wrong").unwrap(), PermsAcquired::None);
    assert_eq!(reparsed.decrypt("u").unwrap(), PermsAcquired::User);
    assert_eq!(
        reparsed.pages().unwrap()[0].content_data().unwrap(),
        b"q\n0 0 200 200 re\nf\nQ"
    );
    assert_eq!(reparsed.info().unwrap().title().unwrap(), "locked away");
}

#[test]
fn info_and_catalog_accessors() {
    let mut builder = PdfBuilder::new("1.4");
    builder.add_object(
        1,
        "<< /Type /Catalog /Pages 2 0 R /Version /1.6 /PageLayout /TwoColumnLeft /Lang (en-US) >>",
    );
    builder.add_object(2, "<< /Type /Pages /Kids [] /Count 0 >>");
    builder.add_object(
        3,
        "<< /Title (A Tale of Two Objects) /Author (K. Yang) \
         /Producer (pdfcos) /CreationDate (D:20240102030405+01'30) \
         /Trapped /False >>",
    );
    builder.write_xref("/Root 1 0 R /Info 3 0 R");
    let document = PDFDocument::from_bytes(&builder.into_bytes()).unwrap();

    // the catalog Version wins over the older header
    assert_eq!(document.header_version(), PDFVersion::V1_4);
    assert_eq!(document.pdf_version(), PDFVersion::V1_6);
    assert_eq!(document.page_layout(), b"TwoColumnLeft".to_vec());
    assert_eq!(document.page_mode(), b"UseNone".to_vec());
    assert_eq!(document.language().unwrap(), "en-US");

    let info = document.info().unwrap();
    assert_eq!(info.title().unwrap(), "A Tale of Two Objects");
    assert_eq!(info.author().unwrap(), "K. Yang");
    assert_eq!(info.producer().unwrap(), "pdfcos");
    assert_eq!(info.trapped().unwrap(), b"False".to_vec());

    let date = info.creation_date().unwrap();
    assert_eq!((date.year, date.month, date.day), (2024, 1, 2));
    assert_eq!((date.hour, date.minute, date.second), (3, 4, 5));
    assert_eq!((date.offset_hour, date.offset_minute), (1, 30));
}

#[test]
fn build_document_from_scratch() {
    let mut document = PDFDocument::new();

    let content_id = document.add_object(PDFObject::Stream(Stream::new(
        Dictionary::new(),
        b"q\n10 10 m\n90 90 l\nS\nQ".to_vec(),
    )));
    let mut page = page_dict(612);
    page.set("Contents", PDFObject::Reference(content_id));
    document.append_page(page).unwrap();
    document.append_page(page_dict(300)).unwrap();

    let mut saved = Vec::new();
    document.save(&mut saved).unwrap();
    assert!(saved.starts_with(b"%PDF-1.7\n"));
    assert!(saved.ends_with(b"%%EOF\n"));

    let reparsed = PDFDocument::from_bytes(&saved).unwrap();
    assert_eq!(reparsed.page_count().unwrap(), 2);
    assert_eq!(
        reparsed.pages().unwrap()[0].content_data().unwrap(),
        b"q\n10 10 m\n90 90 l\nS\nQ"
    );
    assert_counts_consistent(&reparsed);
}
