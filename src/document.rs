use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::Path;

use log::warn;

use crate::constants::{
    AUTHOR, CREATION_DATE, CREATOR, DECODE_PARMS, ENCRYPT, FILTER, ID, INFO, KEYWORDS, LENGTH,
    METADATA, MOD_DATE, OBJ_STM, PREV, PRODUCER, ROOT, SIZE, SUBJECT, TITLE, TRAPPED, TYPE,
    VERSION, XREF_TYPE,
};
use crate::date::PDFDate;
use crate::error::{PDFError, Result};
use crate::filters::{self, CryptContext};
use crate::objects::{Dictionary, HexString, ObjectId, PDFObject, Stream, decode_text_string};
use crate::parser::{Reader, extract_objstm_members};
use crate::security::{CryptTarget, PermsAcquired, StandardSecurityHandler};
use crate::version::PDFVersion;
use crate::writer::Serializer;
use crate::xref::{XrefEntry, XrefTable};

static NULL_OBJECT: PDFObject = PDFObject::Null;

/// Maximum reference hops before resolution reports a cycle.
const MAX_RESOLVE_DEPTH: usize = 32;

/// An in-memory PDF document.
///
/// The document owns the indirect object store. After parsing, every live
/// object from the merged cross-reference mapping is present in the store;
/// references are lookup keys into it, never owning handles. Mutation goes
/// through the store and [`PDFDocument::save`] serializes it back out with
/// a fresh cross-reference table.
pub struct PDFDocument {
    pub(crate) version: PDFVersion,
    pub(crate) strict: bool,
    pub(crate) trailer: Dictionary,
    updates: Vec<(XrefTable, Dictionary)>,
    xref: BTreeMap<ObjectId, XrefEntry>,
    pub(crate) objects: BTreeMap<ObjectId, PDFObject>,
    pending_compressed: Vec<(ObjectId, u32, u32)>,
    pub(crate) max_id: u32,
    /// Objects deleted in this revision: the slot stays unused and its
    /// generation is bumped if ever reused.
    pub(crate) freed: Vec<ObjectId>,
    handler: Option<StandardSecurityHandler>,
    encrypt_ref: Option<ObjectId>,
    file_key: Option<Vec<u8>>,
    store_decrypted: bool,
    access: PermsAcquired,
}

impl PDFDocument {
    /// An empty document with a catalog and an empty page tree.
    pub fn new() -> Self {
        let mut objects = BTreeMap::new();

        let mut pages = Dictionary::new();
        pages.set(TYPE, PDFObject::Name(b"Pages".to_vec()));
        pages.set(b"Kids", PDFObject::Array(Vec::new()));
        pages.set(b"Count", 0i64);
        objects.insert((1, 0), PDFObject::Dictionary(pages));

        let mut catalog = Dictionary::new();
        catalog.set(TYPE, PDFObject::Name(b"Catalog".to_vec()));
        catalog.set(b"Pages", PDFObject::Reference((1, 0)));
        objects.insert((2, 0), PDFObject::Dictionary(catalog));

        let mut trailer = Dictionary::new();
        trailer.set(ROOT, PDFObject::Reference((2, 0)));

        PDFDocument {
            version: PDFVersion::V1_7,
            strict: false,
            trailer,
            updates: Vec::new(),
            xref: BTreeMap::new(),
            objects,
            pending_compressed: Vec::new(),
            max_id: 2,
            freed: Vec::new(),
            handler: None,
            encrypt_ref: None,
            file_key: None,
            store_decrypted: false,
            access: PermsAcquired::Owner,
        }
    }

    /// Opens a document from a file path.
    pub fn from_filename(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_bytes(&data)
    }

    /// Parses a document from raw bytes in tolerant mode.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::parse_with(data, false)
    }

    /// Parses a document from raw bytes, raising on every recoverable
    /// anomaly instead of soft-failing.
    pub fn from_bytes_strict(data: &[u8]) -> Result<Self> {
        Self::parse_with(data, true)
    }

    fn parse_with(data: &[u8], strict: bool) -> Result<Self> {
        let parsed = Reader::new(data, strict).read()?;

        let mut max_id = 0u32;
        for (number, _) in parsed.xref.keys() {
            max_id = max_id.max(*number);
        }

        let mut document = PDFDocument {
            version: parsed.version,
            strict,
            trailer: parsed.trailer,
            updates: parsed.updates,
            xref: parsed.xref,
            objects: parsed.objects,
            pending_compressed: parsed.pending_compressed,
            max_id,
            freed: Vec::new(),
            handler: None,
            encrypt_ref: None,
            file_key: None,
            store_decrypted: false,
            access: PermsAcquired::Owner,
        };
        document.setup_encryption()?;

        if document.handler.is_none() {
            document.store_decrypted = true;
            document.expand_object_streams()?;
        } else {
            document.access = PermsAcquired::None;
            // Many producers encrypt under the empty user password.
            document.decrypt("")?;
        }
        Ok(document)
    }

    fn setup_encryption(&mut self) -> Result<()> {
        let Some(entry) = self.trailer.get(ENCRYPT) else {
            return Ok(());
        };
        self.encrypt_ref = entry.as_reference();
        let encryption = match self.resolve(entry)?.as_dict() {
            Some(dict) => dict.clone(),
            None => {
                return Err(PDFError::crypto("Encrypt entry is not a dictionary"));
            }
        };

        let filter = encryption.get(FILTER).and_then(PDFObject::as_name);
        if filter != Some(b"Standard") {
            let msg = "only the standard security handler is supported";
            if self.strict {
                return Err(PDFError::crypto(msg));
            }
            warn!("{msg}; leaving document encrypted");
            return Ok(());
        }

        let id0 = self
            .trailer
            .get(ID)
            .and_then(PDFObject::as_array)
            .and_then(|ids| ids.first())
            .and_then(PDFObject::as_string_bytes);
        let id0 = match id0 {
            Some(bytes) => bytes,
            None if self.strict => {
                return Err(PDFError::crypto("encrypted document has no file ID"));
            }
            None => {
                warn!("encrypted document has no file ID; key derivation may fail");
                Vec::new()
            }
        };

        self.handler = Some(StandardSecurityHandler::new(encryption, id0)?);
        Ok(())
    }

    /// Attempts to unlock the document. Returns the access level the
    /// password grants. An unencrypted document reports owner access for
    /// any password.
    pub fn decrypt(&mut self, password: &str) -> Result<PermsAcquired> {
        let Some(handler) = &self.handler else {
            return Ok(PermsAcquired::Owner);
        };
        let password = password.as_bytes();

        let (key, level) = if let Some(key) = handler.authenticate_owner_password(password)? {
            (key, PermsAcquired::Owner)
        } else if let Some(key) = handler.authenticate_user_password(password)? {
            (key, PermsAcquired::User)
        } else {
            return Ok(PermsAcquired::None);
        };

        self.file_key = Some(key);
        self.access = level;
        if !self.store_decrypted {
            self.decrypt_store()?;
            self.store_decrypted = true;
            self.expand_object_streams()?;
        }
        Ok(level)
    }

    /// The access level gained so far.
    pub fn access_level(&self) -> PermsAcquired {
        self.access
    }

    /// True while an encrypted document has not been unlocked.
    pub fn is_locked(&self) -> bool {
        self.handler.is_some() && self.file_key.is_none()
    }

    pub(crate) fn require_unlocked(&self) -> Result<()> {
        if self.is_locked() {
            return Err(PDFError::DocumentLocked);
        }
        Ok(())
    }

    /// Walks every stored object and decrypts strings and stream payloads
    /// in place with the per-object key. The encryption dictionary itself,
    /// cross-reference streams and Crypt-filtered streams are left alone.
    fn decrypt_store(&mut self) -> Result<()> {
        let (Some(handler), Some(key)) = (&self.handler, &self.file_key) else {
            return Ok(());
        };
        let skip_metadata = !handler.encrypt_metadata();

        for (&id, object) in self.objects.iter_mut() {
            if Some(id) == self.encrypt_ref {
                continue;
            }
            decrypt_in_place(handler, key, object, id, skip_metadata)?;
        }
        Ok(())
    }

    /// Extracts the members of every object stream named by a compressed
    /// xref entry. Containers were decrypted beforehand, so the members
    /// themselves need no further decryption.
    fn expand_object_streams(&mut self) -> Result<()> {
        let pending = std::mem::take(&mut self.pending_compressed);
        if pending.is_empty() {
            return Ok(());
        }

        let mut members_by_container: HashMap<u32, Vec<PDFObject>> = HashMap::new();
        for (id, container, index) in pending {
            if !members_by_container.contains_key(&container) {
                let members = self.extract_container((container, 0));
                let members = match members {
                    Ok(members) => members,
                    Err(err) if !self.strict => {
                        warn!("failed to expand object stream {container}: {err}");
                        Vec::new()
                    }
                    Err(err) => return Err(err),
                };
                members_by_container.insert(container, members);
            }

            let member = members_by_container[&container].get(index as usize).cloned();
            match member {
                Some(object) => {
                    self.objects.insert(id, object);
                }
                None if self.strict => {
                    return Err(PDFError::resolution(format!(
                        "object stream {container} has no member at index {index}"
                    )));
                }
                None => {
                    self.objects.insert(id, PDFObject::Null);
                }
            }
        }
        Ok(())
    }

    fn extract_container(&self, id: ObjectId) -> Result<Vec<PDFObject>> {
        let stream = self
            .objects
            .get(&id)
            .and_then(PDFObject::as_stream)
            .ok_or_else(|| {
                PDFError::resolution(format!("object stream {} is not a stream", id.0))
            })?;
        let decoded = self.decode_with_crypt(stream, id)?;
        let first = stream
            .dict
            .get(b"First")
            .and_then(PDFObject::as_i64)
            .filter(|v| *v >= 0)
            .ok_or_else(|| PDFError::parse("object stream has no First offset"))?;
        extract_objstm_members(&decoded, first as usize)
    }

    /// Looks up an object by identity. A missing or freed identity is a
    /// null object in tolerant mode and a resolution error in strict mode.
    pub fn get_object(&self, id: ObjectId) -> Result<&PDFObject> {
        match self.objects.get(&id) {
            Some(object) => Ok(object),
            None if self.strict => Err(PDFError::resolution(format!(
                "object {} {} not found",
                id.0, id.1
            ))),
            None => Ok(&NULL_OBJECT),
        }
    }

    pub fn get_object_mut(&mut self, id: ObjectId) -> Option<&mut PDFObject> {
        self.objects.get_mut(&id)
    }

    /// Every live `(identity, object)` pair in the store, in numeric
    /// order.
    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &PDFObject)> {
        self.objects.iter().map(|(id, object)| (*id, object))
    }

    /// Follows references until a direct object is reached. Containers
    /// store references raw; this is the transparent-read side.
    pub fn resolve<'a>(&'a self, object: &'a PDFObject) -> Result<&'a PDFObject> {
        let mut current = object;
        for _ in 0..MAX_RESOLVE_DEPTH {
            match current {
                PDFObject::Reference(id) => current = self.get_object(*id)?,
                direct => return Ok(direct),
            }
        }
        Err(PDFError::resolution("reference chain too deep"))
    }

    /// Resolved read of a dictionary entry; resolution failures read as
    /// absent.
    pub fn dict_get<'a>(&'a self, dict: &'a Dictionary, key: &[u8]) -> Option<&'a PDFObject> {
        let raw = dict.get(key)?;
        match self.resolve(raw) {
            Ok(PDFObject::Null) => None,
            Ok(value) => Some(value),
            Err(_) => None,
        }
    }

    // --- store mutation ---

    /// Stores a new indirect object under a fresh object number.
    /// Numbers are assigned monotonically and never reused.
    pub fn add_object(&mut self, object: impl Into<PDFObject>) -> ObjectId {
        self.max_id += 1;
        let id = (self.max_id, 0);
        self.objects.insert(id, object.into());
        id
    }

    pub(crate) fn allocate_id(&mut self) -> ObjectId {
        self.max_id += 1;
        (self.max_id, 0)
    }

    pub fn set_object(&mut self, id: ObjectId, object: impl Into<PDFObject>) {
        self.max_id = self.max_id.max(id.0);
        self.objects.insert(id, object.into());
    }

    /// Deletes an indirect object. The slot becomes a free-list entry;
    /// the object number is not reclaimed within this revision.
    pub fn delete_object(&mut self, id: ObjectId) -> Option<PDFObject> {
        let removed = self.objects.remove(&id);
        if removed.is_some() {
            self.freed.push(id);
        }
        removed
    }

    // --- document model ---

    /// The header version, before considering the catalog.
    pub fn header_version(&self) -> PDFVersion {
        self.version
    }

    /// The effective PDF version: the later of the header version and the
    /// catalog's Version entry.
    pub fn pdf_version(&self) -> PDFVersion {
        let catalog_version = self
            .catalog()
            .ok()
            .and_then(|catalog| self.dict_get(catalog, VERSION))
            .and_then(PDFObject::as_name)
            .and_then(|name| std::str::from_utf8(name).ok())
            .and_then(|text| PDFVersion::try_from(text).ok());
        match catalog_version {
            Some(version) => self.version.max(version),
            None => self.version,
        }
    }

    pub fn trailer(&self) -> &Dictionary {
        &self.trailer
    }

    /// The merged cross-reference mapping built during parse.
    pub fn xref(&self) -> &BTreeMap<ObjectId, XrefEntry> {
        &self.xref
    }

    /// Every `(table, trailer)` increment, most recent first.
    pub fn updates(&self) -> &[(XrefTable, Dictionary)] {
        &self.updates
    }

    /// The root of the document's object hierarchy.
    pub fn catalog(&self) -> Result<&Dictionary> {
        let root = self
            .trailer
            .get(ROOT)
            .ok_or_else(|| PDFError::resolution("trailer has no Root entry"))?;
        self.resolve(root)?
            .as_dict()
            .ok_or_else(|| PDFError::resolution("catalog is not a dictionary"))
    }

    /// The document information dictionary, if any.
    pub fn info(&self) -> Option<Info<'_>> {
        let info = self.trailer.get(INFO)?;
        let dict = self.resolve(info).ok()?.as_dict()?;
        Some(Info { doc: self, dict })
    }

    /// The raw bytes of the document-level XMP metadata stream, passed
    /// through undecoded filters but not interpreted.
    pub fn xmp_metadata(&self) -> Result<Option<Vec<u8>>> {
        let catalog = self.catalog()?;
        let Some(entry) = catalog.get(METADATA) else {
            return Ok(None);
        };
        let id = entry.as_reference();
        let stream = match self.resolve(entry)?.as_stream() {
            Some(stream) => stream,
            None => return Ok(None),
        };
        let data = match id {
            Some(id) => self.decode_with_crypt(stream, id)?,
            None => filters::decode_stream(stream, None)?,
        };
        Ok(Some(data))
    }

    /// The page layout name the viewer should open with.
    pub fn page_layout(&self) -> Vec<u8> {
        self.catalog()
            .ok()
            .and_then(|catalog| self.dict_get(catalog, b"PageLayout"))
            .and_then(PDFObject::as_name)
            .map(|name| name.to_vec())
            .unwrap_or_else(|| b"SinglePage".to_vec())
    }

    /// The page mode name the viewer should open with.
    pub fn page_mode(&self) -> Vec<u8> {
        self.catalog()
            .ok()
            .and_then(|catalog| self.dict_get(catalog, b"PageMode"))
            .and_then(PDFObject::as_name)
            .map(|name| name.to_vec())
            .unwrap_or_else(|| b"UseNone".to_vec())
    }

    /// The document's natural-language identifier, if declared.
    pub fn language(&self) -> Option<String> {
        let catalog = self.catalog().ok()?;
        let lang = self.dict_get(catalog, b"Lang")?;
        lang.as_string_bytes().map(|b| decode_text_string(&b))
    }

    /// The outline (bookmark) root dictionary, if any.
    pub fn outlines(&self) -> Option<&Dictionary> {
        let catalog = self.catalog().ok()?;
        self.dict_get(catalog, crate::constants::OUTLINES)?.as_dict()
    }

    // --- stream data ---

    /// Decoded payload of the stream stored under `id`.
    pub fn get_stream_data(&self, id: ObjectId) -> Result<Vec<u8>> {
        self.require_unlocked()?;
        let stream = self
            .get_object(id)?
            .as_stream()
            .ok_or_else(|| PDFError::resolution(format!("object {} {} is not a stream", id.0, id.1)))?;
        self.decode_with_crypt(stream, id)
    }

    /// Decodes a stream, resolving indirect Filter and DecodeParms
    /// entries and supplying the Crypt filter with its context.
    fn decode_with_crypt(&self, stream: &Stream, id: ObjectId) -> Result<Vec<u8>> {
        let filters_entry = stream.dict.get(FILTER).map(|f| self.resolve(f)).transpose()?;
        let filter_names: Vec<Vec<u8>> = match filters_entry {
            None | Some(PDFObject::Null) => Vec::new(),
            Some(PDFObject::Name(name)) => vec![name.clone()],
            Some(PDFObject::Array(items)) => {
                let mut names = Vec::with_capacity(items.len());
                for item in items {
                    match self.resolve(item)?.as_name() {
                        Some(name) => names.push(name.to_vec()),
                        None => return Err(PDFError::filter("Filter entry is not a name")),
                    }
                }
                names
            }
            Some(_) => return Err(PDFError::filter("Filter entry is not a name or array")),
        };

        let parms_entry = stream
            .dict
            .get(DECODE_PARMS)
            .map(|p| self.resolve(p))
            .transpose()?;
        let parms = filters::decode_parms_list(parms_entry, filter_names.len());

        let ctx = match (&self.handler, &self.file_key) {
            (Some(handler), Some(key)) => Some(CryptContext {
                handler,
                key,
                reference: id,
            }),
            _ => None,
        };
        filters::decode_with(&filter_names, &parms, &stream.data, ctx.as_ref())
    }

    // --- writing ---

    /// Serializes the document to any writer.
    pub fn save<W: Write>(&self, target: &mut W) -> Result<()> {
        let bytes = self.to_bytes()?;
        target.write_all(&bytes)?;
        Ok(())
    }

    /// Serializes the document into a byte buffer: header, every live
    /// object in numeric order, a classic cross-reference table, trailer
    /// and EOF marker.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.require_unlocked()?;
        if !self.trailer.has(ROOT) {
            return Err(PDFError::write("document has no catalog"));
        }

        let mut ser = Serializer::new();
        ser.write_header(self.version);

        let mut written: Vec<(u32, XrefEntry)> = Vec::new();
        let mut free_slots: Vec<(u32, u16)> = vec![(0, 65535)];
        for id in &self.freed {
            free_slots.push((id.0, id.1.saturating_add(1)));
        }

        for (&id, object) in &self.objects {
            // Carrier streams for the old xref machinery are rebuilt, not
            // copied: their members are written individually.
            if let PDFObject::Stream(stream) = object {
                if stream.dict.type_is(XREF_TYPE) || stream.dict.type_is(OBJ_STM) {
                    free_slots.push((id.0, id.1));
                    continue;
                }
            }

            let mut owned: Option<PDFObject> = None;
            if self.should_encrypt_on_save(id) {
                owned = Some(self.encrypt_for_save(object.clone(), id)?);
            }
            // The Length entry must describe the payload actually written;
            // encryption may have changed it.
            if let PDFObject::Stream(stream) = owned.as_ref().unwrap_or(object) {
                let stored = stream.dict.get(LENGTH).and_then(PDFObject::as_i64);
                if stored != Some(stream.data.len() as i64) {
                    let mut fixed = stream.clone();
                    fixed.dict.set(LENGTH, fixed.data.len() as i64);
                    owned = Some(PDFObject::Stream(fixed));
                }
            }

            let offset = ser.write_object(id, owned.as_ref().unwrap_or(object));
            written.push((
                id.0,
                XrefEntry::InUse {
                    offset,
                    generation: id.1,
                },
            ));
        }

        // Free slots chain through each other and terminate back at zero.
        free_slots.sort_unstable();
        free_slots.dedup_by_key(|(number, _)| *number);
        for idx in 0..free_slots.len() {
            let (number, generation) = free_slots[idx];
            let next_free = free_slots.get(idx + 1).map(|(n, _)| *n).unwrap_or(0);
            written.push((
                number,
                XrefEntry::Free {
                    next_free,
                    next_generation: generation,
                },
            ));
        }
        written.sort_unstable_by_key(|(number, _)| *number);

        let startxref = ser.write_xref_section(&written);

        let mut trailer = self.trailer.clone();
        for stale in [
            PREV,
            TYPE,
            LENGTH,
            FILTER,
            DECODE_PARMS,
            b"W".as_slice(),
            b"Index".as_slice(),
            b"First".as_slice(),
            b"XRefStm".as_slice(),
        ] {
            trailer.remove(stale);
        }
        let size = written.last().map(|(number, _)| number + 1).unwrap_or(1);
        trailer.set(SIZE, size as i64);
        ser.write_trailer(&trailer, startxref);
        ser.write_eof();

        Ok(ser.into_bytes())
    }

    fn should_encrypt_on_save(&self, id: ObjectId) -> bool {
        self.handler.is_some() && self.file_key.is_some() && Some(id) != self.encrypt_ref
    }

    /// Re-encrypts strings and stream payloads of one object for output.
    fn encrypt_for_save(&self, mut object: PDFObject, id: ObjectId) -> Result<PDFObject> {
        let (Some(handler), Some(key)) = (&self.handler, &self.file_key) else {
            return Ok(object);
        };
        let skip_metadata = !handler.encrypt_metadata();
        encrypt_in_place(handler, key, &mut object, id, skip_metadata)?;
        Ok(object)
    }
}

impl Default for PDFDocument {
    fn default() -> Self {
        Self::new()
    }
}

fn stream_is_exempt(stream: &Stream, skip_metadata: bool) -> bool {
    if stream.uses_crypt_filter() {
        return true;
    }
    if stream.dict.type_is(XREF_TYPE) {
        return true;
    }
    skip_metadata && stream.dict.type_is(METADATA)
}

fn decrypt_in_place(
    handler: &StandardSecurityHandler,
    key: &[u8],
    object: &mut PDFObject,
    id: ObjectId,
    skip_metadata: bool,
) -> Result<()> {
    match object {
        PDFObject::String(bytes) => {
            *bytes = handler.decrypt_object(key, bytes, id, CryptTarget::String)?;
        }
        PDFObject::HexString(hex) => {
            let plain = handler.decrypt_object(key, &hex.value(), id, CryptTarget::String)?;
            *hex = HexString::from_bytes(&plain);
        }
        PDFObject::Array(items) => {
            for item in items {
                decrypt_in_place(handler, key, item, id, skip_metadata)?;
            }
        }
        PDFObject::Dictionary(dict) => {
            for (_, value) in dict.iter_mut() {
                decrypt_in_place(handler, key, value, id, skip_metadata)?;
            }
        }
        PDFObject::Stream(stream) => {
            for (_, value) in stream.dict.iter_mut() {
                decrypt_in_place(handler, key, value, id, skip_metadata)?;
            }
            if !stream_is_exempt(stream, skip_metadata) {
                stream.data = handler.decrypt_object(key, &stream.data, id, CryptTarget::Stream)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn encrypt_in_place(
    handler: &StandardSecurityHandler,
    key: &[u8],
    object: &mut PDFObject,
    id: ObjectId,
    skip_metadata: bool,
) -> Result<()> {
    match object {
        PDFObject::String(bytes) => {
            *bytes = handler.encrypt_object(key, bytes, id, CryptTarget::String)?;
        }
        PDFObject::HexString(hex) => {
            let cipher = handler.encrypt_object(key, &hex.value(), id, CryptTarget::String)?;
            *hex = HexString::from_bytes(&cipher);
        }
        PDFObject::Array(items) => {
            for item in items {
                encrypt_in_place(handler, key, item, id, skip_metadata)?;
            }
        }
        PDFObject::Dictionary(dict) => {
            for (_, value) in dict.iter_mut() {
                encrypt_in_place(handler, key, value, id, skip_metadata)?;
            }
        }
        PDFObject::Stream(stream) => {
            for (_, value) in stream.dict.iter_mut() {
                encrypt_in_place(handler, key, value, id, skip_metadata)?;
            }
            if !stream_is_exempt(stream, skip_metadata) {
                stream.data = handler.encrypt_object(key, &stream.data, id, CryptTarget::Stream)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Read access to the document information dictionary.
///
/// Since PDF 2.0 most of these keys are deprecated in favor of the
/// metadata stream; CreationDate and ModDate remain current.
pub struct Info<'a> {
    doc: &'a PDFDocument,
    dict: &'a Dictionary,
}

impl<'a> Info<'a> {
    pub fn dict(&self) -> &Dictionary {
        self.dict
    }

    fn text(&self, key: &[u8]) -> Option<String> {
        self.doc
            .dict_get(self.dict, key)?
            .as_string_bytes()
            .map(|b| decode_text_string(&b))
    }

    pub fn title(&self) -> Option<String> {
        self.text(TITLE)
    }

    pub fn author(&self) -> Option<String> {
        self.text(AUTHOR)
    }

    pub fn subject(&self) -> Option<String> {
        self.text(SUBJECT)
    }

    pub fn keywords(&self) -> Option<String> {
        self.text(KEYWORDS)
    }

    pub fn creator(&self) -> Option<String> {
        self.text(CREATOR)
    }

    pub fn producer(&self) -> Option<String> {
        self.text(PRODUCER)
    }

    pub fn creation_date(&self) -> Option<PDFDate> {
        self.text(CREATION_DATE)?.parse().ok()
    }

    pub fn modify_date(&self) -> Option<PDFDate> {
        self.text(MOD_DATE)?.parse().ok()
    }

    /// Whether the document carries trapping information: the name True,
    /// False or Unknown.
    pub fn trapped(&self) -> Option<Vec<u8>> {
        self.doc
            .dict_get(self.dict, TRAPPED)?
            .as_name()
            .map(|name| name.to_vec())
    }
}
