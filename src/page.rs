use std::collections::{HashMap, HashSet};

use log::warn;

use crate::constants::{COUNT, KIDS, PAGE, PAGES, PARENT, TYPE};
use crate::document::PDFDocument;
use crate::error::{PDFError, Result};
use crate::filters;
use crate::objects::{Dictionary, ObjectId, PDFObject};

/// A view over one page object in a document.
///
/// The page is addressed by identity; every accessor resolves through the
/// document's store, so attribute reads see current state even across
/// mutations of other pages.
pub struct Page<'a> {
    doc: &'a PDFDocument,
    pub id: ObjectId,
}

impl<'a> Page<'a> {
    pub(crate) fn new(doc: &'a PDFDocument, id: ObjectId) -> Self {
        Page { doc, id }
    }

    pub fn dict(&self) -> Result<&'a Dictionary> {
        self.doc
            .get_object(self.id)?
            .as_dict()
            .ok_or_else(|| PDFError::resolution("page object is not a dictionary"))
    }

    fn attr(&self, key: &[u8]) -> Option<&'a PDFObject> {
        self.doc.dict_get(self.dict().ok()?, key)
    }

    fn rect(&self, key: &[u8]) -> Option<[f64; 4]> {
        let items = self.attr(key)?.as_array()?;
        if items.len() != 4 {
            return None;
        }
        let mut rect = [0f64; 4];
        for (slot, item) in rect.iter_mut().zip(items) {
            *slot = self.doc.resolve(item).ok()?.as_f64()?;
        }
        Some(rect)
    }

    /// The boundaries of the physical medium the page is printed or
    /// displayed on.
    pub fn mediabox(&self) -> Option<[f64; 4]> {
        self.rect(b"MediaBox")
    }

    /// The visible region of the page.
    pub fn cropbox(&self) -> Option<[f64; 4]> {
        self.rect(b"CropBox")
    }

    pub fn bleedbox(&self) -> Option<[f64; 4]> {
        self.rect(b"BleedBox")
    }

    pub fn trimbox(&self) -> Option<[f64; 4]> {
        self.rect(b"TrimBox")
    }

    pub fn artbox(&self) -> Option<[f64; 4]> {
        self.rect(b"ArtBox")
    }

    /// Clockwise rotation in degrees, a multiple of 90. Defaults to 0.
    pub fn rotation(&self) -> i64 {
        self.attr(b"Rotate").and_then(PDFObject::as_i64).unwrap_or(0)
    }

    /// Size of a user-space unit in multiples of 1/72 inch. Defaults to 1.
    pub fn user_unit(&self) -> f64 {
        self.attr(b"UserUnit")
            .and_then(PDFObject::as_f64)
            .unwrap_or(1.0)
    }

    /// The tab order name for annotations on this page (R, C or S).
    pub fn tab_order(&self) -> Option<Vec<u8>> {
        self.attr(b"Tabs")?.as_name().map(|name| name.to_vec())
    }

    /// The page's resource dictionary. Absent when the page inherits its
    /// resources from an ancestor node.
    pub fn resources(&self) -> Option<&'a Dictionary> {
        self.attr(b"Resources")?.as_dict()
    }

    /// The page's annotation dictionaries, resolved.
    pub fn annotations(&self) -> Vec<&'a PDFObject> {
        let Some(items) = self.attr(b"Annots").and_then(PDFObject::as_array) else {
            return Vec::new();
        };
        items
            .iter()
            .filter_map(|item| self.doc.resolve(item).ok())
            .filter(|item| !item.is_null())
            .collect()
    }

    /// The decoded content stream of the page. A Contents array is
    /// concatenated in order with a newline between parts.
    pub fn content_data(&self) -> Result<Vec<u8>> {
        self.doc.require_unlocked()?;
        let Some(contents) = self.dict()?.get(b"Contents") else {
            return Ok(Vec::new());
        };

        let mut parts: Vec<Vec<u8>> = Vec::new();
        match contents {
            PDFObject::Reference(id) => match self.doc.resolve(contents)? {
                PDFObject::Array(items) => {
                    for item in items {
                        self.push_content_part(item, &mut parts)?;
                    }
                }
                _ => parts.push(self.doc.get_stream_data(*id)?),
            },
            PDFObject::Array(items) => {
                for item in items {
                    self.push_content_part(item, &mut parts)?;
                }
            }
            PDFObject::Stream(stream) => {
                parts.push(filters::decode_stream(stream, None)?);
            }
            _ => return Err(PDFError::resolution("Contents is not a stream or array")),
        }
        Ok(parts.join(&b"\n"[..]))
    }

    fn push_content_part(&self, item: &PDFObject, parts: &mut Vec<Vec<u8>>) -> Result<()> {
        match item {
            PDFObject::Reference(id) => parts.push(self.doc.get_stream_data(*id)?),
            PDFObject::Stream(stream) => parts.push(filters::decode_stream(stream, None)?),
            _ => warn!("ignoring non-stream entry in Contents array"),
        }
        Ok(())
    }
}

enum Descend {
    /// The tree node, the position within its Kids, and the page identity.
    Found {
        tree: ObjectId,
        kid_idx: usize,
        page: ObjectId,
    },
    /// Leaves remaining to skip after exhausting this subtree.
    Remaining(usize),
}

impl PDFDocument {
    /// The identity of the root page-tree node.
    pub(crate) fn root_pages_id(&self) -> Result<ObjectId> {
        self.catalog()?
            .get(PAGES)
            .and_then(PDFObject::as_reference)
            .ok_or_else(|| PDFError::resolution("catalog Pages is not an indirect reference"))
    }

    /// All leaf pages in document order, by depth-first walk of the page
    /// tree.
    pub fn pages(&self) -> Result<Vec<Page<'_>>> {
        self.require_unlocked()?;
        let root = self.root_pages_id()?;
        let mut ids = Vec::new();
        let mut visited = HashSet::new();
        self.collect_pages(root, &mut visited, &mut ids)?;
        Ok(ids.into_iter().map(|id| Page::new(self, id)).collect())
    }

    pub fn page_count(&self) -> Result<usize> {
        Ok(self.pages()?.len())
    }

    pub fn get_page(&self, index: usize) -> Result<Page<'_>> {
        let mut pages = self.pages()?;
        if index >= pages.len() {
            return Err(PDFError::resolution(format!(
                "page index {index} out of range"
            )));
        }
        Ok(pages.swap_remove(index))
    }

    fn collect_pages(
        &self,
        node_id: ObjectId,
        visited: &mut HashSet<ObjectId>,
        out: &mut Vec<ObjectId>,
    ) -> Result<()> {
        if !visited.insert(node_id) {
            let msg = format!("page tree cycles through {} {}", node_id.0, node_id.1);
            if self.strict {
                return Err(PDFError::parse(msg));
            }
            warn!("{msg}");
            return Ok(());
        }

        let Some(dict) = self.get_object(node_id)?.as_dict() else {
            if self.strict {
                return Err(PDFError::resolution("page tree node is not a dictionary"));
            }
            warn!("page tree node {} {} is not a dictionary", node_id.0, node_id.1);
            return Ok(());
        };

        if dict.type_is(PAGE) {
            out.push(node_id);
            return Ok(());
        }

        let kids = match self.dict_get(dict, KIDS).and_then(PDFObject::as_array) {
            Some(kids) => kids,
            None => return Ok(()),
        };
        for kid in kids {
            match kid.as_reference() {
                Some(kid_id) => self.collect_pages(kid_id, visited, out)?,
                None => warn!("page tree kid is not an indirect reference"),
            }
        }
        Ok(())
    }

    /// Descends to the tree node whose leaf range covers `remaining`.
    fn locate_page_slot(
        &self,
        node_id: ObjectId,
        mut remaining: usize,
        visited: &mut HashSet<ObjectId>,
    ) -> Result<Descend> {
        if !visited.insert(node_id) {
            return Err(PDFError::write("page tree cycles"));
        }
        let dict = self
            .get_object(node_id)?
            .as_dict()
            .ok_or_else(|| PDFError::write("page tree node is not a dictionary"))?;
        let kids = self
            .dict_get(dict, KIDS)
            .and_then(PDFObject::as_array)
            .ok_or_else(|| PDFError::write("page tree node has no Kids array"))?;

        for (kid_idx, kid) in kids.iter().enumerate() {
            let Some(kid_id) = kid.as_reference() else {
                continue;
            };
            let Some(kid_dict) = self.get_object(kid_id)?.as_dict() else {
                continue;
            };
            if kid_dict.type_is(PAGES) {
                match self.locate_page_slot(kid_id, remaining, visited)? {
                    found @ Descend::Found { .. } => return Ok(found),
                    Descend::Remaining(rest) => remaining = rest,
                }
            } else if kid_dict.type_is(PAGE) {
                if remaining == 0 {
                    return Ok(Descend::Found {
                        tree: node_id,
                        kid_idx,
                        page: kid_id,
                    });
                }
                remaining -= 1;
            }
        }
        Ok(Descend::Remaining(remaining))
    }

    /// Inserts a page dictionary before logical index `index`. The page
    /// is stored as a fresh indirect object and wired into the tree node
    /// whose leaf range covers the index.
    pub fn insert_page(&mut self, index: usize, page: Dictionary) -> Result<ObjectId> {
        self.require_unlocked()?;
        let total = self.page_count()?;
        if index > total {
            return Err(PDFError::write(format!("page index {index} out of range")));
        }

        let mut page = page;
        page.remove(PARENT);
        if !page.has(TYPE) {
            page.set(TYPE, PDFObject::Name(b"Page".to_vec()));
        }
        let id = self.add_object(PDFObject::Dictionary(page));
        self.attach_page(index, id, total)?;
        Ok(id)
    }

    /// Appends a page dictionary after the last page.
    pub fn append_page(&mut self, page: Dictionary) -> Result<ObjectId> {
        let total = self.page_count()?;
        self.insert_page(total, page)
    }

    /// Removes the page at `index` from the tree and the store, returning
    /// its dictionary. Resources the page shared with others are left in
    /// place.
    pub fn remove_page(&mut self, index: usize) -> Result<Dictionary> {
        self.require_unlocked()?;
        let root = self.root_pages_id()?;
        let mut visited = HashSet::new();
        let Descend::Found {
            tree,
            kid_idx,
            page,
        } = self.locate_page_slot(root, index, &mut visited)?
        else {
            return Err(PDFError::write(format!("page index {index} out of range")));
        };

        self.kids_mut(tree)?.remove(kid_idx);
        self.adjust_counts(tree, -1)?;

        let mut dict = match self.delete_object(page) {
            Some(PDFObject::Dictionary(dict)) => dict,
            Some(other) => {
                // put it back; the tree pointed at something else entirely
                self.set_object(page, other);
                return Err(PDFError::write("page entry is not a dictionary"));
            }
            None => Dictionary::new(),
        };
        dict.remove(PARENT);
        Ok(dict)
    }

    /// Replaces the page at `index` with a new page dictionary. The old
    /// page object is deleted from the store.
    pub fn replace_page(&mut self, index: usize, page: Dictionary) -> Result<ObjectId> {
        self.require_unlocked()?;
        let root = self.root_pages_id()?;
        let mut visited = HashSet::new();
        let Descend::Found {
            tree,
            kid_idx,
            page: old,
        } = self.locate_page_slot(root, index, &mut visited)?
        else {
            return Err(PDFError::write(format!("page index {index} out of range")));
        };

        let mut page = page;
        page.remove(PARENT);
        if !page.has(TYPE) {
            page.set(TYPE, PDFObject::Name(b"Page".to_vec()));
        }
        page.set(PARENT, PDFObject::Reference(tree));

        self.delete_object(old);
        let id = self.add_object(PDFObject::Dictionary(page));
        self.kids_mut(tree)?[kid_idx] = PDFObject::Reference(id);
        Ok(id)
    }

    /// Clones a page out of another document and inserts it before
    /// `index`. Every reference reachable from the page is rewritten into
    /// this document; references that would walk back into the source's
    /// page tree become null, and self-references point at the clone.
    pub fn insert_page_from(
        &mut self,
        index: usize,
        source: &PDFDocument,
        source_index: usize,
    ) -> Result<ObjectId> {
        self.require_unlocked()?;
        source.require_unlocked()?;
        let total = self.page_count()?;
        if index > total {
            return Err(PDFError::write(format!("page index {index} out of range")));
        }

        let source_page = source.get_page(source_index)?.id;
        let id = self.clone_object_from(source, source_page)?;

        if let Some(dict) = self.get_object_mut(id).and_then(PDFObject::as_dict_mut) {
            dict.remove(PARENT);
            if !dict.has(TYPE) {
                dict.set(TYPE, PDFObject::Name(b"Page".to_vec()));
            }
        }
        self.attach_page(index, id, total)?;
        Ok(id)
    }

    /// Deep-copies `root_id` and everything reachable from it out of
    /// `source`, allocating fresh object numbers here. Returns the new
    /// identity of the copied root.
    fn clone_object_from(&mut self, source: &PDFDocument, root_id: ObjectId) -> Result<ObjectId> {
        let new_root = self.allocate_id();
        let mut map: HashMap<ObjectId, ObjectId> = HashMap::new();
        map.insert(root_id, new_root);

        let cloned = self.clone_value(source, source.get_object(root_id)?, &mut map)?;
        self.objects.insert(new_root, cloned);
        Ok(new_root)
    }

    fn clone_value(
        &mut self,
        source: &PDFDocument,
        value: &PDFObject,
        map: &mut HashMap<ObjectId, ObjectId>,
    ) -> Result<PDFObject> {
        match value {
            PDFObject::Reference(id) => {
                if let Some(new_id) = map.get(id) {
                    return Ok(PDFObject::Reference(*new_id));
                }
                let target = source.get_object(*id)?;
                if let Some(dict) = target.as_dict() {
                    // never drag the source's page tree across
                    if dict.type_is(PAGES) || dict.type_is(PAGE) {
                        warn!(
                            "clone of {} {} cut a reference into the source page tree",
                            id.0, id.1
                        );
                        return Ok(PDFObject::Null);
                    }
                }
                let new_id = self.allocate_id();
                map.insert(*id, new_id);
                let cloned = self.clone_value(source, target, map)?;
                self.objects.insert(new_id, cloned);
                Ok(PDFObject::Reference(new_id))
            }
            PDFObject::Dictionary(dict) => {
                let mut cloned = Dictionary::new();
                for (key, entry) in dict.iter() {
                    cloned.set(key.clone(), self.clone_value(source, entry, map)?);
                }
                Ok(PDFObject::Dictionary(cloned))
            }
            PDFObject::Array(items) => {
                let mut cloned = Vec::with_capacity(items.len());
                for item in items {
                    cloned.push(self.clone_value(source, item, map)?);
                }
                Ok(PDFObject::Array(cloned))
            }
            PDFObject::Stream(stream) => {
                let mut dict = Dictionary::new();
                for (key, entry) in stream.dict.iter() {
                    dict.set(key.clone(), self.clone_value(source, entry, map)?);
                }
                Ok(PDFObject::Stream(crate::objects::Stream {
                    dict,
                    data: stream.data.clone(),
                }))
            }
            direct => Ok(direct.clone()),
        }
    }

    /// Wires an already-stored page object into the tree before logical
    /// index `index`. `total` is the page count prior to insertion.
    fn attach_page(&mut self, index: usize, page_id: ObjectId, total: usize) -> Result<()> {
        let root = self.root_pages_id()?;

        let (tree, kid_idx) = if total == 0 || index == total {
            // empty tree, or appending after the last page: the new page
            // joins the root's Kids directly
            let dict = self
                .get_object(root)?
                .as_dict()
                .ok_or_else(|| PDFError::write("page tree root is not a dictionary"))?;
            let kids_len = dict
                .get(KIDS)
                .and_then(PDFObject::as_array)
                .map(|kids| kids.len())
                .unwrap_or(0);
            (root, kids_len)
        } else {
            let mut visited = HashSet::new();
            match self.locate_page_slot(root, index, &mut visited)? {
                Descend::Found { tree, kid_idx, .. } => (tree, kid_idx),
                Descend::Remaining(_) => {
                    return Err(PDFError::write("page tree is inconsistent with its Count"));
                }
            }
        };

        if let Some(dict) = self.get_object_mut(page_id).and_then(PDFObject::as_dict_mut) {
            dict.set(PARENT, PDFObject::Reference(tree));
        }

        let kids = self.kids_mut(tree)?;
        let kid_idx = kid_idx.min(kids.len());
        kids.insert(kid_idx, PDFObject::Reference(page_id));

        self.adjust_counts(tree, 1)
    }

    fn kids_mut(&mut self, tree: ObjectId) -> Result<&mut Vec<PDFObject>> {
        let dict = self
            .get_object_mut(tree)
            .and_then(PDFObject::as_dict_mut)
            .ok_or_else(|| PDFError::write("page tree node is not a dictionary"))?;
        if !dict.has(KIDS) {
            dict.set(KIDS, PDFObject::Array(Vec::new()));
        }
        dict.get_mut(KIDS)
            .and_then(PDFObject::as_array_mut)
            .ok_or_else(|| PDFError::write("page tree Kids is not a direct array"))
    }

    /// Adds `delta` to Count on the node and every ancestor up to the
    /// root.
    fn adjust_counts(&mut self, start: ObjectId, delta: i64) -> Result<()> {
        let mut node = Some(start);
        let mut visited = HashSet::new();
        while let Some(id) = node {
            if !visited.insert(id) {
                return Err(PDFError::write("page tree Parent chain cycles"));
            }
            let Some(dict) = self.get_object_mut(id).and_then(PDFObject::as_dict_mut) else {
                break;
            };
            let count = dict.get(COUNT).and_then(PDFObject::as_i64).unwrap_or(0);
            dict.set(COUNT, count + delta);
            node = dict.get(PARENT).and_then(PDFObject::as_reference);
        }
        Ok(())
    }
}
