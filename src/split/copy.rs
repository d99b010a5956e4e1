//! Copying source pages into a fresh per-range document
//!
//! Objects are renumbered as they are copied, the same way merging renumbers
//! every input before combining it. Each page is validated before anything
//! is written to the target, so a page that fails leaves no orphaned objects.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use log::debug;
use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};

use super::plan::OutputRange;
use crate::error::{Error, Result};
use crate::pdf::metadata::encode_text_string;
use crate::pdf::reader::object_kind;
use crate::pdf::{PageHandle, SourceDocument};

/// Value written to the Producer entry of every output
pub const PRODUCER: &str = concat!("pdflex ", env!("CARGO_PKG_VERSION"));

/// A target document under construction for one output range
pub struct RangeBuilder<'a> {
    source: &'a Document,
    title: Option<&'a str>,
    range: OutputRange,
    target: Document,
    pages_id: ObjectId,
    kids: Vec<ObjectId>,
    /// Source id -> target id of every object copied or reserved so far
    id_map: HashMap<ObjectId, ObjectId>,
    /// Source ids of the pages belonging to this range
    range_pages: HashSet<ObjectId>,
    pending: Vec<(ObjectId, ObjectId)>,
}

impl<'a> RangeBuilder<'a> {
    pub fn new(source: &'a SourceDocument, range: OutputRange) -> Self {
        let range_pages = range
            .pages()
            .filter_map(|index| source.page_at(index).ok())
            .map(|page| page.object_id())
            .collect();

        let mut target = Document::with_version(source.version());
        let pages_id = target.new_object_id();

        Self {
            source: source.document(),
            title: source.info().title.as_deref(),
            range,
            target,
            pages_id,
            kids: Vec::new(),
            id_map: HashMap::new(),
            range_pages,
            pending: Vec::new(),
        }
    }

    /// Pages successfully copied so far
    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Copy one page (and everything it references) into the target
    pub fn add_page(&mut self, page: &PageHandle<'a>) -> Result<()> {
        let dict = page.dictionary()?;
        if let Ok(contents) = dict.get(b"Contents") {
            self.check_contents(page.index(), contents, true)?;
        }

        let page_id = match self.id_map.get(&page.object_id()) {
            Some(&reserved) => reserved,
            None => self.reserve(page.object_id()),
        };

        let mut copied = Dictionary::new();
        for (key, value) in dict.iter() {
            if key.as_slice() == b"Parent" {
                continue;
            }
            let value = self.translate(value);
            copied.set(key.clone(), value);
        }
        for (key, value) in page.inherited().iter() {
            if !copied.has(key) {
                let value = self.translate(value);
                copied.set(key.to_vec(), value);
            }
        }
        copied.set("Type", Object::Name(b"Page".to_vec()));
        copied.set("Parent", Object::Reference(self.pages_id));

        self.target.objects.insert(page_id, Object::Dictionary(copied));
        self.drain_pending();
        self.kids.push(page_id);
        Ok(())
    }

    /// Every Contents entry must resolve to a stream
    fn check_contents(&self, index: usize, contents: &Object, top_level: bool) -> Result<()> {
        let unusable = |reason: String| Error::PageAccess { index, reason };

        match contents {
            Object::Null | Object::Stream(_) => Ok(()),
            Object::Array(parts) if top_level => parts
                .iter()
                .try_for_each(|part| self.check_contents(index, part, false)),
            Object::Reference(id) => match self.source.get_object(*id) {
                Ok(Object::Stream(_)) | Ok(Object::Null) => Ok(()),
                Ok(Object::Array(parts)) if top_level => parts
                    .iter()
                    .try_for_each(|part| self.check_contents(index, part, false)),
                Ok(other) => Err(unusable(format!(
                    "content stream {} {} R is {}",
                    id.0,
                    id.1,
                    object_kind(other)
                ))),
                Err(_) => Err(unusable(format!(
                    "content stream {} {} R is missing",
                    id.0, id.1
                ))),
            },
            other => Err(unusable(format!("Contents is {}", object_kind(other)))),
        }
    }

    fn reserve(&mut self, source_id: ObjectId) -> ObjectId {
        let target_id = self.target.new_object_id();
        self.id_map.insert(source_id, target_id);
        target_id
    }

    /// Rewrite references in a direct object, queueing referenced objects for copying
    fn translate(&mut self, object: &Object) -> Object {
        match object {
            Object::Reference(id) => self.map_reference(*id),
            Object::Array(items) => {
                Object::Array(items.iter().map(|item| self.translate(item)).collect())
            }
            Object::Dictionary(dict) => Object::Dictionary(self.translate_dict(dict)),
            Object::Stream(stream) => {
                let mut copy = stream.clone();
                copy.dict = self.translate_dict(&stream.dict);
                Object::Stream(copy)
            }
            other => other.clone(),
        }
    }

    fn translate_dict(&mut self, dict: &Dictionary) -> Dictionary {
        let mut copy = Dictionary::new();
        for (key, value) in dict.iter() {
            let value = self.translate(value);
            copy.set(key.clone(), value);
        }
        copy
    }

    fn map_reference(&mut self, id: ObjectId) -> Object {
        if let Some(&target_id) = self.id_map.get(&id) {
            return Object::Reference(target_id);
        }
        // Filled in when the page itself is copied.
        if self.range_pages.contains(&id) {
            return Object::Reference(self.reserve(id));
        }

        match self.source.get_object(id) {
            Err(_) => {
                debug!("Dangling reference {} {} R replaced with null", id.0, id.1);
                Object::Null
            }
            Ok(Object::Dictionary(dict)) if is_page_tree_member(dict) => Object::Null,
            Ok(_) => {
                let target_id = self.reserve(id);
                self.pending.push((id, target_id));
                Object::Reference(target_id)
            }
        }
    }

    fn drain_pending(&mut self) {
        let source = self.source;
        while let Some((source_id, target_id)) = self.pending.pop() {
            let copied = match source.get_object(source_id) {
                Ok(object) => self.translate(object),
                Err(_) => Object::Null,
            };
            self.target.objects.insert(target_id, copied);
        }
    }

    /// Build the page tree, catalog and Info dictionary, then serialize
    pub fn finish(mut self) -> Result<Vec<u8>> {
        let range = self.range;
        let failed = |reason: String| Error::RangeSerialization {
            start: range.start,
            end: range.end,
            reason,
        };

        if self.kids.is_empty() {
            return Err(failed("no pages could be copied".to_string()));
        }

        // Pages referenced from copied pages but which failed themselves.
        let unfilled: Vec<ObjectId> = self
            .id_map
            .values()
            .filter(|id| !self.target.objects.contains_key(*id))
            .copied()
            .collect();
        for id in unfilled {
            self.target.objects.insert(id, Object::Null);
        }

        let kids: Vec<Object> = self.kids.iter().map(|&id| Object::Reference(id)).collect();
        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name(b"Pages".to_vec()));
        pages.set("Count", Object::Integer(self.kids.len() as i64));
        pages.set("Kids", Object::Array(kids));
        self.target
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(self.pages_id));
        let catalog_id = self.target.add_object(catalog);

        let mut info = Dictionary::new();
        info.set(
            "Producer",
            Object::String(PRODUCER.as_bytes().to_vec(), StringFormat::Literal),
        );
        info.set("CreationDate", pdf_date_now());
        if let Some(title) = self.title {
            info.set("Title", encode_text_string(title));
        }
        let info_id = self.target.add_object(info);

        self.target.trailer.set("Root", Object::Reference(catalog_id));
        self.target.trailer.set("Info", Object::Reference(info_id));

        let mut buffer = Vec::new();
        self.target
            .save_to(&mut buffer)
            .map_err(|e| failed(e.to_string()))?;
        Ok(buffer)
    }
}

fn is_page_tree_member(dict: &Dictionary) -> bool {
    matches!(
        dict.get(b"Type"),
        Ok(Object::Name(name)) if name.as_slice() == b"Page" || name.as_slice() == b"Pages"
    )
}

/// Current time as a PDF date string, `D:YYYYMMDDHHmmSS+00'00'`
fn pdf_date_now() -> Object {
    let stamp = Utc::now().format("D:%Y%m%d%H%M%S+00'00'").to_string();
    Object::String(stamp.into_bytes(), StringFormat::Literal)
}
