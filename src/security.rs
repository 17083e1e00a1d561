use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use md5::{Digest, Md5};
use rand::RngCore;

use crate::arc4::Arc4;
use crate::error::{PDFError, Result};
use crate::objects::{Dictionary, ObjectId, PDFObject};

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

/// The 32-byte padding applied to every user-supplied password before key
/// derivation. Defined by the standard; used verbatim.
pub const PASSWORD_PADDING: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01,
    0x08, 0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53,
    0x69, 0x7A,
];

/// Access gained by a password.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermsAcquired {
    /// The password authenticated as neither; the document stays locked.
    None,
    /// User-level access under the document's permission bits.
    User,
    /// Owner-level (full) access. Unencrypted documents report this.
    Owner,
}

/// How a string or stream is transformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptMethod {
    Identity,
    Arc4,
    Aes,
}

/// What kind of content is being encrypted or decrypted. Version 4
/// documents select the crypt filter by this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptTarget {
    Stream,
    String,
}

/// Pads or truncates a password to exactly 32 bytes using the fixed
/// padding pattern.
pub fn pad_password(password: &[u8]) -> [u8; 32] {
    let mut padded = [0u8; 32];
    let take = password.len().min(32);
    padded[..take].copy_from_slice(&password[..take]);
    padded[take..].copy_from_slice(&PASSWORD_PADDING[..32 - take]);
    padded
}

fn xor_key(key: &[u8], counter: u8) -> Vec<u8> {
    key.iter().map(|b| b ^ counter).collect()
}

/// The standard security handler, revisions 2 through 4.
///
/// Implements password-based key derivation, owner/user authentication and
/// per-object encryption with ARC4 or AES-128-CBC. Construction fails for
/// revisions 5 and 6 (AES-256), which are out of scope.
pub struct StandardSecurityHandler {
    encryption: Dictionary,
    id0: Vec<u8>,
}

impl StandardSecurityHandler {
    /// Builds a handler from the trailer's encryption dictionary and the
    /// first element of the file identifier array.
    pub fn new(encryption: Dictionary, id0: Vec<u8>) -> Result<Self> {
        let handler = StandardSecurityHandler { encryption, id0 };
        let revision = handler.revision();
        if !(2..=4).contains(&revision) {
            return Err(PDFError::crypto(format!(
                "unsupported security handler revision {revision}"
            )));
        }
        if !(1..=4).contains(&handler.version()) {
            return Err(PDFError::crypto(format!(
                "unsupported encryption version {}",
                handler.version()
            )));
        }
        Ok(handler)
    }

    pub fn revision(&self) -> i64 {
        self.encryption
            .get(b"R")
            .and_then(PDFObject::as_i64)
            .unwrap_or(0)
    }

    pub fn version(&self) -> i64 {
        self.encryption
            .get(b"V")
            .and_then(PDFObject::as_i64)
            .unwrap_or(0)
    }

    /// The file encryption key length in bytes. The Length entry is in
    /// bits and defaults to 40.
    pub fn key_length(&self) -> usize {
        let bits = self
            .encryption
            .get(b"Length")
            .and_then(PDFObject::as_i64)
            .unwrap_or(40);
        ((bits / 8).clamp(5, 16)) as usize
    }

    fn owner_value(&self) -> Result<Vec<u8>> {
        self.encryption
            .get(b"O")
            .and_then(PDFObject::as_string_bytes)
            .ok_or_else(|| PDFError::crypto("encryption dictionary has no O entry"))
    }

    fn user_value(&self) -> Result<Vec<u8>> {
        self.encryption
            .get(b"U")
            .and_then(PDFObject::as_string_bytes)
            .ok_or_else(|| PDFError::crypto("encryption dictionary has no U entry"))
    }

    /// The P entry as its low 32 bits, the form fed into key derivation.
    fn permissions(&self) -> u32 {
        self.encryption
            .get(b"P")
            .and_then(PDFObject::as_i64)
            .unwrap_or(-1) as u32
    }

    /// Whether metadata streams are encrypted along with everything else.
    pub fn encrypt_metadata(&self) -> bool {
        self.encryption
            .get(b"EncryptMetadata")
            .and_then(PDFObject::as_bool)
            .unwrap_or(true)
    }

    /// Looks up a named crypt filter in the CF table.
    pub fn crypt_filter(&self, name: &[u8]) -> Option<Dictionary> {
        self.encryption
            .get(b"CF")
            .and_then(PDFObject::as_dict)
            .and_then(|cf| cf.get(name))
            .and_then(PDFObject::as_dict)
            .cloned()
    }

    /// Derives the file encryption key from a password (Algorithm 2).
    pub fn compute_encryption_key(&self, password: &[u8]) -> Result<Vec<u8>> {
        let mut hasher = Md5::new();
        hasher.update(pad_password(password));
        hasher.update(self.owner_value()?);
        hasher.update(self.permissions().to_le_bytes());
        hasher.update(&self.id0);
        if self.revision() >= 4 && !self.encrypt_metadata() {
            hasher.update([0xff, 0xff, 0xff, 0xff]);
        }
        let mut digest = hasher.finalize().to_vec();

        let key_length = self.key_length();
        if self.revision() >= 3 {
            for _ in 0..50 {
                digest = Md5::digest(&digest[..key_length]).to_vec();
            }
        }
        digest.truncate(key_length);
        Ok(digest)
    }

    /// Computes the O entry from the owner password, falling back to the
    /// user password when there is none (Algorithm 3).
    pub fn compute_owner_value(&self, owner_password: &[u8], user_password: &[u8]) -> Vec<u8> {
        let source = if owner_password.is_empty() {
            user_password
        } else {
            owner_password
        };
        let mut digest = Md5::digest(pad_password(source)).to_vec();
        if self.revision() >= 3 {
            for _ in 0..50 {
                digest = Md5::digest(&digest).to_vec();
            }
        }
        let cipher_key = &digest[..self.key_length()];

        let mut crypt = Arc4::new(cipher_key).apply(&pad_password(user_password));
        if self.revision() >= 3 {
            for counter in 1..20 {
                crypt = Arc4::new(&xor_key(cipher_key, counter)).apply(&crypt);
            }
        }
        crypt
    }

    /// Computes the U entry for a user password (Algorithm 4 for revision
    /// 2, Algorithm 5 for revisions 3 and 4).
    pub fn compute_user_value(&self, password: &[u8]) -> Result<Vec<u8>> {
        let key = self.compute_encryption_key(password)?;
        Ok(self.user_value_from_key(&key))
    }

    fn user_value_from_key(&self, key: &[u8]) -> Vec<u8> {
        if self.revision() == 2 {
            return Arc4::new(key).apply(&PASSWORD_PADDING);
        }
        let mut hasher = Md5::new();
        hasher.update(PASSWORD_PADDING);
        hasher.update(&self.id0);
        let mut cipher = Arc4::new(key).apply(&hasher.finalize());
        for counter in 1..20 {
            cipher = Arc4::new(&xor_key(key, counter)).apply(&cipher);
        }
        pad_password(&cipher).to_vec()
    }

    /// Authenticates a user password (Algorithm 6). On success returns the
    /// file encryption key.
    pub fn authenticate_user_password(&self, password: &[u8]) -> Result<Option<Vec<u8>>> {
        let key = self.compute_encryption_key(password)?;
        let computed = self.user_value_from_key(&key);
        let stored = self.user_value()?;

        let matched = if self.revision() == 2 {
            stored == computed
        } else {
            // Only the first 16 bytes participate in the comparison
            stored.get(..16) == computed.get(..16)
        };
        Ok(matched.then_some(key))
    }

    /// Authenticates an owner password (Algorithm 7). The stored O entry
    /// is decrypted into what is presumed to be the user password, which
    /// is then authenticated the usual way.
    pub fn authenticate_owner_password(&self, password: &[u8]) -> Result<Option<Vec<u8>>> {
        let mut digest = Md5::digest(pad_password(password)).to_vec();
        if self.revision() >= 3 {
            for _ in 0..50 {
                digest = Md5::digest(&digest).to_vec();
            }
        }
        let cipher_key = &digest[..self.key_length()];

        let mut user_password = self.owner_value()?;
        if self.revision() == 2 {
            user_password = Arc4::new(cipher_key).apply(&user_password);
        } else {
            for counter in (0..20).rev() {
                user_password = Arc4::new(&xor_key(cipher_key, counter)).apply(&user_password);
            }
        }
        self.authenticate_user_password(&user_password)
    }

    /// Derives the per-object crypt key (Algorithm 1): the file key is
    /// extended with the low 3 bytes of the object number and low 2 bytes
    /// of the generation, little-endian, plus `sAlT` for AES, then hashed
    /// and truncated to `min(key length + 5, 16)` bytes.
    pub fn compute_object_key(
        &self,
        file_key: &[u8],
        reference: ObjectId,
        method: CryptMethod,
    ) -> Vec<u8> {
        let mut extended = file_key.to_vec();
        extended.extend_from_slice(&(reference.0).to_le_bytes()[..3]);
        extended.extend_from_slice(&(reference.1 as u32).to_le_bytes()[..2]);
        if method == CryptMethod::Aes {
            extended.extend_from_slice(b"sAlT");
        }
        let digest = Md5::digest(&extended);
        let take = (file_key.len() + 5).min(16);
        digest[..take].to_vec()
    }

    /// Picks the crypt method for `target`. Versions 1 through 3 always
    /// use ARC4; version 4 consults the StmF/StrF crypt filter names.
    pub fn crypt_method(&self, target: CryptTarget) -> Result<CryptMethod> {
        if self.version() != 4 {
            return Ok(CryptMethod::Arc4);
        }
        let key: &[u8] = match target {
            CryptTarget::Stream => b"StmF",
            CryptTarget::String => b"StrF",
        };
        let name = self
            .encryption
            .get(key)
            .and_then(PDFObject::as_name)
            .unwrap_or(b"Identity");
        if name == b"Identity" {
            return Ok(CryptMethod::Identity);
        }
        let filter = self.crypt_filter(name).unwrap_or_default();
        self.filter_method(&filter)
    }

    /// The method named by a crypt filter's CFM entry.
    pub fn filter_method(&self, crypt_filter: &Dictionary) -> Result<CryptMethod> {
        match crypt_filter
            .get(b"CFM")
            .and_then(PDFObject::as_name)
            .unwrap_or(b"Identity")
        {
            b"Identity" => Ok(CryptMethod::Identity),
            b"V2" => Ok(CryptMethod::Arc4),
            b"AESV2" => Ok(CryptMethod::Aes),
            other => Err(PDFError::crypto(format!(
                "unknown crypt filter method '{}'",
                String::from_utf8_lossy(other)
            ))),
        }
    }

    /// Decrypts the bytes of the object identified by `reference`.
    pub fn decrypt_object(
        &self,
        file_key: &[u8],
        data: &[u8],
        reference: ObjectId,
        target: CryptTarget,
    ) -> Result<Vec<u8>> {
        let method = self.crypt_method(target)?;
        self.apply_crypt(method, file_key, data, reference, false)
    }

    /// Encrypts the bytes of the object identified by `reference`.
    pub fn encrypt_object(
        &self,
        file_key: &[u8],
        data: &[u8],
        reference: ObjectId,
        target: CryptTarget,
    ) -> Result<Vec<u8>> {
        let method = self.crypt_method(target)?;
        self.apply_crypt(method, file_key, data, reference, true)
    }

    /// Decrypts with an explicitly chosen crypt filter, as the Crypt
    /// stream filter requires.
    pub fn decrypt_with_filter(
        &self,
        file_key: &[u8],
        data: &[u8],
        reference: ObjectId,
        crypt_filter: &Dictionary,
    ) -> Result<Vec<u8>> {
        let method = self.filter_method(crypt_filter)?;
        self.apply_crypt(method, file_key, data, reference, false)
    }

    fn apply_crypt(
        &self,
        method: CryptMethod,
        file_key: &[u8],
        data: &[u8],
        reference: ObjectId,
        encrypt: bool,
    ) -> Result<Vec<u8>> {
        match method {
            CryptMethod::Identity => Ok(data.to_vec()),
            CryptMethod::Arc4 => {
                let key = self.compute_object_key(file_key, reference, method);
                Ok(Arc4::new(&key).apply(data))
            }
            CryptMethod::Aes => {
                let key = self.compute_object_key(file_key, reference, method);
                if key.len() != 16 {
                    return Err(PDFError::crypto("AES requires a 16-byte object key"));
                }
                if encrypt {
                    aes_encrypt(&key, data)
                } else {
                    aes_decrypt(&key, data)
                }
            }
        }
    }
}

/// AES-128-CBC with a random 16-byte IV prefixed to the ciphertext and
/// PKCS#7 padding.
fn aes_encrypt(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut iv = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut iv);
    let cipher = Aes128CbcEnc::new_from_slices(key, &iv)
        .map_err(|_| PDFError::crypto("invalid AES key or IV length"))?;
    let mut out = iv.to_vec();
    out.extend_from_slice(&cipher.encrypt_padded_vec_mut::<Pkcs7>(data));
    Ok(out)
}

fn aes_decrypt(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    if data.is_empty() {
        return Ok(Vec::new());
    }
    if data.len() < 32 || data.len() % 16 != 0 {
        return Err(PDFError::crypto("AES payload is not IV plus whole blocks"));
    }
    let (iv, ciphertext) = data.split_at(16);
    let cipher = Aes128CbcDec::new_from_slices(key, iv)
        .map_err(|_| PDFError::crypto("invalid AES key or IV length"))?;
    cipher
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| PDFError::crypto("bad AES padding"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler(user: &[u8], owner: &[u8], revision: i64, version: i64, length: i64) -> StandardSecurityHandler {
        let mut encryption = Dictionary::new();
        encryption.set("Filter", PDFObject::Name(b"Standard".to_vec()));
        encryption.set("R", revision);
        encryption.set("V", version);
        encryption.set("Length", length);
        encryption.set("P", -44i64);
        if version == 4 {
            let mut cf = Dictionary::new();
            let mut std_cf = Dictionary::new();
            std_cf.set("CFM", PDFObject::Name(b"AESV2".to_vec()));
            cf.set("StdCF", PDFObject::Dictionary(std_cf));
            encryption.set("CF", cf);
            encryption.set("StmF", PDFObject::Name(b"StdCF".to_vec()));
            encryption.set("StrF", PDFObject::Name(b"StdCF".to_vec()));
        }

        let id0 = b"\x01\x23\x45\x67\x89\xab\xcd\xef".to_vec();
        let mut handler = StandardSecurityHandler::new(encryption, id0.clone()).unwrap();
        let o = handler.compute_owner_value(owner, user);
        handler
            .encryption
            .set("O", PDFObject::String(o));
        let u = handler.compute_user_value(user).unwrap();
        handler
            .encryption
            .set("U", PDFObject::String(u));
        handler
    }

    #[test]
    fn password_padding() {
        assert_eq!(pad_password(b""), PASSWORD_PADDING);
        let padded = pad_password(b"u");
        assert_eq!(padded[0], b'u');
        assert_eq!(&padded[1..], &PASSWORD_PADDING[..31]);
        // over-long passwords truncate
        assert_eq!(pad_password(&[b'x'; 40])[..], [b'x'; 32]);
    }

    #[test]
    fn authenticate_r4() {
        let handler = handler(b"u", b"o", 4, 4, 128);
        assert!(handler.authenticate_user_password(b"u").unwrap().is_some());
        assert!(handler.authenticate_owner_password(b"o").unwrap().is_some());
        assert!(handler.authenticate_user_password(b"x").unwrap().is_none());
        assert!(handler.authenticate_owner_password(b"x").unwrap().is_none());

        // the key handed back by either path is the same file key
        let from_user = handler.authenticate_user_password(b"u").unwrap().unwrap();
        let from_owner = handler.authenticate_owner_password(b"o").unwrap().unwrap();
        assert_eq!(from_user, from_owner);
        assert_eq!(from_user.len(), 16);
    }

    #[test]
    fn authenticate_r2() {
        let handler = handler(b"user", b"owner", 2, 1, 40);
        assert!(handler.authenticate_user_password(b"user").unwrap().is_some());
        assert!(handler.authenticate_owner_password(b"owner").unwrap().is_some());
        assert!(handler.authenticate_user_password(b"owner").unwrap().is_none());
    }

    #[test]
    fn empty_user_password_authenticates_by_default() {
        let handler = handler(b"", b"secret", 3, 2, 128);
        assert!(handler.authenticate_user_password(b"").unwrap().is_some());
        assert!(handler.authenticate_owner_password(b"secret").unwrap().is_some());
    }

    #[test]
    fn object_key_is_stable_and_salted() {
        let handler = handler(b"u", b"o", 4, 4, 128);
        let key = handler.authenticate_user_password(b"u").unwrap().unwrap();

        let first = handler.compute_object_key(&key, (7, 0), CryptMethod::Arc4);
        let second = handler.compute_object_key(&key, (7, 0), CryptMethod::Arc4);
        assert_eq!(first, second);
        assert_eq!(first.len(), 16);

        let aes = handler.compute_object_key(&key, (7, 0), CryptMethod::Aes);
        assert_ne!(first, aes);

        let other = handler.compute_object_key(&key, (8, 0), CryptMethod::Arc4);
        assert_ne!(first, other);
    }

    #[test]
    fn arc4_object_round_trip() {
        let handler = handler(b"u", b"o", 3, 2, 128);
        let key = handler.authenticate_user_password(b"u").unwrap().unwrap();

        let cipher = handler
            .encrypt_object(&key, b"(top secret)", (4, 0), CryptTarget::String)
            .unwrap();
        assert_ne!(cipher, b"(top secret)");
        let plain = handler
            .decrypt_object(&key, &cipher, (4, 0), CryptTarget::String)
            .unwrap();
        assert_eq!(plain, b"(top secret)");
    }

    #[test]
    fn aes_object_round_trip() {
        let handler = handler(b"u", b"o", 4, 4, 128);
        let key = handler.authenticate_user_password(b"u").unwrap().unwrap();

        let cipher = handler
            .encrypt_object(&key, b"stream payload", (5, 0), CryptTarget::Stream)
            .unwrap();
        // IV prefix plus one padded block
        assert_eq!(cipher.len(), 32);
        let plain = handler
            .decrypt_object(&key, &cipher, (5, 0), CryptTarget::Stream)
            .unwrap();
        assert_eq!(plain, b"stream payload");
    }

    #[test]
    fn unsupported_revision_is_rejected() {
        let mut encryption = Dictionary::new();
        encryption.set("R", 6i64);
        encryption.set("V", 5i64);
        assert!(StandardSecurityHandler::new(encryption, Vec::new()).is_err());
    }
}
