//! Document information dictionary

use lopdf::{Dictionary, Document, Object, StringFormat};

/// Descriptive metadata read from the trailer's Info dictionary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentInfo {
    /// Document title (if present)
    pub title: Option<String>,
    /// Document author (if present)
    pub author: Option<String>,
    /// Producing application (if present)
    pub producer: Option<String>,
}

/// Read the Info dictionary, tolerating a missing or malformed one
pub fn read_info(doc: &Document) -> DocumentInfo {
    let dict = match doc.trailer.get(b"Info") {
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Dictionary(dict)) => dict,
            _ => return DocumentInfo::default(),
        },
        Ok(Object::Dictionary(dict)) => dict,
        _ => return DocumentInfo::default(),
    };

    DocumentInfo {
        title: text_entry(dict, b"Title"),
        author: text_entry(dict, b"Author"),
        producer: text_entry(dict, b"Producer"),
    }
}

fn text_entry(dict: &Dictionary, key: &[u8]) -> Option<String> {
    match dict.get(key) {
        Ok(Object::String(bytes, _)) => decode_text_string(bytes).filter(|s| !s.is_empty()),
        _ => None,
    }
}

/// Decode a PDF text string (UTF-16BE with BOM, otherwise PDFDocEncoding as Latin-1)
pub fn decode_text_string(bytes: &[u8]) -> Option<String> {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16(&units).ok()
    } else {
        Some(bytes.iter().map(|&b| b as char).collect())
    }
}

/// Encode a text string object, using UTF-16BE only when the text is not ASCII
pub fn encode_text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::String(text.as_bytes().to_vec(), StringFormat::Literal);
    }

    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}
