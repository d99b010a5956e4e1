//! Opening source documents and indexing their pages
//!
//! The page table is built by walking the page tree directly rather than
//! through lopdf's page iterator: a slot whose object is missing or damaged
//! still counts as a page, so it can fail on its own later instead of
//! silently renumbering every page after it.

use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use log::{debug, info, warn};
use lopdf::{Dictionary, Document, Object, ObjectId};

use super::metadata::{read_info, DocumentInfo};
use super::repair::rebuild_xref;
use crate::error::{Error, Result};

/// Page tree nesting beyond this depth is treated as corrupt
const MAX_TREE_DEPTH: usize = 256;

/// Page attributes a page may inherit from its ancestors
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Inherited page attributes collected while walking the page tree
#[derive(Debug, Clone, Default)]
pub struct InheritedAttributes {
    entries: Vec<(Vec<u8>, Object)>,
}

impl InheritedAttributes {
    fn merged_with(&self, node: &Dictionary) -> Self {
        let mut merged = self.clone();
        for key in INHERITABLE {
            if let Ok(value) = node.get(key) {
                merged.entries.retain(|(existing, _)| existing.as_slice() != key);
                merged.entries.push((key.to_vec(), value.clone()));
            }
        }
        merged
    }

    /// Attribute name/value pairs, nearest ancestor winning
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &Object)> {
        self.entries.iter().map(|(key, value)| (key.as_slice(), value))
    }
}

#[derive(Debug, Clone)]
struct PageSlot {
    id: ObjectId,
    inherited: InheritedAttributes,
}

/// A parsed source PDF with an indexed page table
///
/// Read-only once opened; splitting only ever borrows it.
#[derive(Debug)]
pub struct SourceDocument {
    doc: Document,
    pages: Vec<PageSlot>,
    info: DocumentInfo,
    source: String,
    byte_len: u64,
    repaired: bool,
}

/// One page of a [`SourceDocument`]
#[derive(Debug, Clone, Copy)]
pub struct PageHandle<'a> {
    index: usize,
    slot: &'a PageSlot,
    doc: &'a Document,
}

impl<'a> PageHandle<'a> {
    /// 0-based position in the source document
    pub fn index(&self) -> usize {
        self.index
    }

    /// Object id of the page in the source document
    pub fn object_id(&self) -> ObjectId {
        self.slot.id
    }

    /// Attributes inherited from the page tree
    pub fn inherited(&self) -> &'a InheritedAttributes {
        &self.slot.inherited
    }

    /// The page dictionary, if the page object exists and is a dictionary
    pub fn dictionary(&self) -> Result<&'a Dictionary> {
        let (number, generation) = self.slot.id;
        match self.doc.get_object(self.slot.id) {
            Ok(Object::Dictionary(dict)) => Ok(dict),
            Ok(other) => Err(Error::PageAccess {
                index: self.index,
                reason: format!(
                    "page object {} {} R is {}, not a dictionary",
                    number,
                    generation,
                    object_kind(other)
                ),
            }),
            Err(_) => Err(Error::PageAccess {
                index: self.index,
                reason: format!("page object {} {} R is missing", number, generation),
            }),
        }
    }
}

impl SourceDocument {
    /// Open and index a PDF file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::SourceNotFound(path.to_path_buf()));
        }

        let bytes = fs::read(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::SourceNotFound(path.to_path_buf()),
            _ => Error::Io(e),
        })?;

        Self::from_bytes(&bytes, path.display().to_string())
    }

    /// Parse and index a PDF held in memory
    ///
    /// `source` is only used to label log lines and errors.
    pub fn from_bytes(bytes: &[u8], source: impl Into<String>) -> Result<Self> {
        let source = source.into();

        let strict = Document::load_mem(bytes)
            .map_err(|e| e.to_string())
            .and_then(|doc| index_pages(&doc).map(|pages| (doc, pages)));

        let (doc, pages, repaired) = match strict {
            Ok((doc, pages)) => (doc, pages, false),
            Err(strict_err) => {
                warn!(
                    "{}: strict parse failed ({}), rebuilding cross-reference table",
                    source, strict_err
                );
                let (doc, pages) = load_repaired(bytes).map_err(|reason| Error::Read {
                    source_name: source.clone(),
                    reason: format!("{}; recovery failed: {}", strict_err, reason),
                })?;
                info!("{}: recovered {} pages", source, pages.len());
                (doc, pages, true)
            }
        };

        let info = read_info(&doc);
        debug!(
            "{}: PDF {} with {} pages",
            source,
            doc.version,
            pages.len()
        );

        Ok(SourceDocument {
            doc,
            pages,
            info,
            source,
            byte_len: bytes.len() as u64,
            repaired,
        })
    }

    /// Number of pages in the page table
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Page at a 0-based index
    pub fn page_at(&self, index: usize) -> Result<PageHandle<'_>> {
        let slot = self.pages.get(index).ok_or_else(|| Error::PageAccess {
            index,
            reason: format!("out of range (document has {} pages)", self.pages.len()),
        })?;
        Ok(PageHandle {
            index,
            slot,
            doc: &self.doc,
        })
    }

    /// All pages in document order
    pub fn pages(&self) -> impl Iterator<Item = PageHandle<'_>> {
        self.pages.iter().enumerate().map(|(index, slot)| PageHandle {
            index,
            slot,
            doc: &self.doc,
        })
    }

    /// Underlying object graph
    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Info dictionary contents
    pub fn info(&self) -> &DocumentInfo {
        &self.info
    }

    /// PDF header version, e.g. `1.7`
    pub fn version(&self) -> &str {
        &self.doc.version
    }

    /// Path or label the document was opened from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Size of the source in bytes
    pub fn byte_len(&self) -> u64 {
        self.byte_len
    }

    /// Whether lenient cross-reference recovery was needed to open the file
    pub fn is_repaired(&self) -> bool {
        self.repaired
    }
}

fn load_repaired(bytes: &[u8]) -> std::result::Result<(Document, Vec<PageSlot>), String> {
    let rebuilt = rebuild_xref(bytes)?;
    debug!("Located {} objects while rebuilding", rebuilt.objects);
    let doc = Document::load_mem(&rebuilt.bytes).map_err(|e| e.to_string())?;
    let pages = index_pages(&doc)?;
    Ok((doc, pages))
}

fn has_type(dict: &Dictionary, name: &[u8]) -> bool {
    matches!(dict.get(b"Type"), Ok(Object::Name(n)) if n.as_slice() == name)
}

/// Short description of an object's kind for error messages
pub(crate) fn object_kind(object: &Object) -> &'static str {
    match object {
        Object::Null => "null",
        Object::Boolean(_) => "a boolean",
        Object::Integer(_) => "an integer",
        Object::Real(_) => "a real",
        Object::Name(_) => "a name",
        Object::String(..) => "a string",
        Object::Array(_) => "an array",
        Object::Dictionary(_) => "a dictionary",
        Object::Stream(_) => "a stream",
        Object::Reference(_) => "a reference",
    }
}

/// Find the catalog, falling back to a scan when the trailer has no usable Root
fn find_catalog(doc: &Document) -> Option<ObjectId> {
    if let Ok(Object::Reference(id)) = doc.trailer.get(b"Root") {
        if matches!(doc.get_object(*id), Ok(Object::Dictionary(_))) {
            return Some(*id);
        }
    }

    let found = doc.objects.iter().find_map(|(id, object)| match object {
        Object::Dictionary(dict) if has_type(dict, b"Catalog") => Some(*id),
        _ => None,
    });
    if let Some((number, generation)) = found {
        warn!(
            "Trailer has no usable Root, using catalog {} {} R",
            number, generation
        );
    }
    found
}

fn index_pages(doc: &Document) -> std::result::Result<Vec<PageSlot>, String> {
    let catalog_id = find_catalog(doc).ok_or("no document catalog")?;
    let catalog = doc.get_dictionary(catalog_id).map_err(|e| e.to_string())?;
    let root_id = match catalog.get(b"Pages") {
        Ok(Object::Reference(id)) => *id,
        _ => return Err("catalog has no page tree".to_string()),
    };
    let root = match doc.get_object(root_id) {
        Ok(Object::Dictionary(dict)) => dict,
        _ => return Err("page tree root is missing".to_string()),
    };

    let mut walker = PageTreeWalker {
        doc,
        visited: HashSet::new(),
        pages: Vec::new(),
    };
    walker.walk(root_id, &InheritedAttributes::default(), 0);

    if let Ok(Object::Integer(count)) = root.get(b"Count") {
        if *count != walker.pages.len() as i64 {
            warn!(
                "Page tree declares {} pages but {} were found",
                count,
                walker.pages.len()
            );
        }
    }

    Ok(walker.pages)
}

struct PageTreeWalker<'a> {
    doc: &'a Document,
    visited: HashSet<ObjectId>,
    pages: Vec<PageSlot>,
}

impl<'a> PageTreeWalker<'a> {
    fn walk(&mut self, node_id: ObjectId, inherited: &InheritedAttributes, depth: usize) {
        if depth > MAX_TREE_DEPTH {
            warn!("Page tree deeper than {} levels, truncating", MAX_TREE_DEPTH);
            return;
        }
        if !self.visited.insert(node_id) {
            warn!(
                "Page tree node {} {} R is referenced twice, ignoring repeat",
                node_id.0, node_id.1
            );
            return;
        }

        let doc = self.doc;
        let node = match doc.get_object(node_id) {
            Ok(Object::Dictionary(dict)) => dict,
            // Unreadable slot: keep it as a page so the failure stays local.
            _ => {
                self.pages.push(PageSlot {
                    id: node_id,
                    inherited: inherited.clone(),
                });
                return;
            }
        };

        let is_tree_node =
            has_type(node, b"Pages") || (!has_type(node, b"Page") && node.has(b"Kids"));
        if !is_tree_node {
            self.pages.push(PageSlot {
                id: node_id,
                inherited: inherited.clone(),
            });
            return;
        }

        let inherited = inherited.merged_with(node);
        let kids = match node.get(b"Kids") {
            Ok(Object::Array(kids)) => kids,
            Ok(Object::Reference(id)) => match doc.get_object(*id) {
                Ok(Object::Array(kids)) => kids,
                _ => {
                    warn!("Kids of {} {} R is not an array", node_id.0, node_id.1);
                    return;
                }
            },
            _ => {
                warn!("Page tree node {} {} R has no Kids", node_id.0, node_id.1);
                return;
            }
        };

        for kid in kids {
            match kid {
                Object::Reference(id) => self.walk(*id, &inherited, depth + 1),
                other => warn!(
                    "Skipping {} in Kids of {} {} R",
                    object_kind(other),
                    node_id.0,
                    node_id.1
                ),
            }
        }
    }
}
