//! In-memory PDF fixtures shared by unit tests

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

/// How a page-tree slot of a fixture should be broken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Damage {
    /// Kids entry points at an object that does not exist
    MissingObject,
    /// Contents points at an integer instead of a stream
    BadContents,
}

/// Build a PDF whose page `n` (1-based) draws the text `Page n`
pub fn build_pdf(page_count: usize) -> Vec<u8> {
    build_damaged_pdf(page_count, &[])
}

/// Build a PDF with the given 0-based page slots damaged
pub fn build_damaged_pdf(page_count: usize, damaged: &[(usize, Damage)]) -> Vec<u8> {
    save(&mut fixture_document(page_count, damaged))
}

/// Build a PDF whose non-stream objects, catalog included, sit in a
/// compressed object stream
pub fn build_compressed_pdf(page_count: usize) -> Vec<u8> {
    let mut doc = fixture_document(page_count, &[]);
    let mut buffer = Vec::new();
    doc.save_modern(&mut buffer).unwrap();
    buffer
}

/// Serialize a fixture document
pub fn save(doc: &mut Document) -> Vec<u8> {
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// Object graph of a fixture before serialization
///
/// Resources and MediaBox live on the Pages node so pages exercise
/// attribute inheritance.
pub fn fixture_document(page_count: usize, damaged: &[(usize, Damage)]) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
    ]));
    let resources = Dictionary::from_iter(vec![(
        "Font",
        Object::Dictionary(Dictionary::from_iter(vec![("F1", Object::Reference(font_id))])),
    )]);

    let mut kids = Vec::new();
    for index in 0..page_count {
        let damage = damaged
            .iter()
            .find(|(slot, _)| *slot == index)
            .map(|(_, damage)| *damage);

        if damage == Some(Damage::MissingObject) {
            kids.push(Object::Reference((90_000 + index as u32, 0)));
            continue;
        }

        let contents_id = if damage == Some(Damage::BadContents) {
            doc.add_object(Object::Integer(42))
        } else {
            let text = format!("BT /F1 12 Tf 72 720 Td (Page {}) Tj ET", index + 1);
            doc.add_object(Stream::new(Dictionary::new(), text.into_bytes()))
        };

        let page_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("Contents", Object::Reference(contents_id)),
        ]));
        kids.push(Object::Reference(page_id));
    }

    let pages = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Count", Object::Integer(page_count as i64)),
        ("Kids", Object::Array(kids)),
        ("Resources", Object::Dictionary(resources)),
        (
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ]),
        ),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));
    doc
}

/// Object id of a fixture's page tree root
pub fn pages_root(doc: &Document) -> ObjectId {
    doc.catalog()
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .unwrap()
}

/// Drop the trailing `startxref` pointer and everything after it
///
/// Works for both classic tables and cross-reference streams.
pub fn strip_startxref(bytes: &[u8]) -> Vec<u8> {
    let cut = bytes
        .windows(9)
        .rposition(|w| w == b"startxref")
        .expect("fixture has a startxref pointer");
    bytes[..cut].to_vec()
}

/// Point `startxref` at an offset past the end of the file
pub fn break_startxref(bytes: &[u8]) -> Vec<u8> {
    let mut broken = strip_startxref(bytes);
    broken.extend_from_slice(b"startxref\n123456789\n%%EOF\n");
    broken
}

/// The `Page n` labels of every page of a serialized document, in order
pub fn page_labels(bytes: &[u8]) -> Vec<String> {
    let doc = Document::load_mem(bytes).unwrap();
    doc.get_pages()
        .values()
        .map(|&id| {
            let content = doc.get_page_content(id).unwrap();
            let text = String::from_utf8_lossy(&content);
            let start = text.find('(').unwrap() + 1;
            let end = text.find(')').unwrap();
            text[start..end].to_string()
        })
        .collect()
}

/// `Page first` through `Page last`, inclusive
pub fn labels(first: usize, last: usize) -> Vec<String> {
    (first..=last).map(|n| format!("Page {}", n)).collect()
}
