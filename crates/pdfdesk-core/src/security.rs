//! Standard security handler
//!
//! Authenticates a user or owner password against a document's `/Encrypt`
//! dictionary and decrypts its strings and streams in place. Covers RC4
//! (V1/V2, R2/R3), crypt filters (V4: RC4 or AES-128) and AES-256 (V5,
//! R5/R6).

use crate::error::PdfDeskError;
use aes::cipher::block_padding::{NoPadding, Pkcs7};
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use lopdf::{Dictionary, Document, Object, ObjectId};
use md5::Md5;
use rc4::cipher::consts::{U10, U11, U12, U13, U14, U15, U16, U5, U6, U7, U8, U9};
use rc4::cipher::{KeyInit, StreamCipher};
use rc4::Rc4;
use sha2::{Digest, Sha256, Sha384, Sha512};

/// Password padding string from the standard security handler.
pub(crate) const PASSWORD_PAD: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08,
    0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

/// AES-256 passwords are truncated to this many UTF-8 bytes.
const MAX_AES256_PASSWORD: usize = 127;

fn decryption(message: impl Into<String>) -> PdfDeskError {
    PdfDeskError::Decryption(message.into())
}

/// How strings or streams are encrypted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cipher {
    Identity,
    Rc4,
    Aes128,
    Aes256,
}

/// A file key that has been unlocked with a valid password.
#[derive(Debug, Clone)]
pub struct SecurityHandler {
    key: Vec<u8>,
    strings: Cipher,
    streams: Cipher,
    encrypt_metadata: bool,
    dictionary_id: Option<ObjectId>,
}

/// Parsed `/Encrypt` dictionary of the standard handler.
struct StandardSecurity {
    revision: i64,
    key_length: usize,
    owner: Vec<u8>,
    user: Vec<u8>,
    owner_key: Vec<u8>,
    user_key: Vec<u8>,
    permissions: i64,
    encrypt_metadata: bool,
    file_id: Vec<u8>,
    strings: Cipher,
    streams: Cipher,
}

impl SecurityHandler {
    /// Unlock `doc` with `password`. Returns `None` for documents without
    /// an `/Encrypt` entry.
    pub fn open(doc: &Document, password: &str) -> Result<Option<Self>, PdfDeskError> {
        let (dict, dictionary_id) = match doc.trailer.get(b"Encrypt") {
            Err(_) => return Ok(None),
            Ok(Object::Reference(id)) => {
                let dict = doc
                    .get_dictionary(*id)
                    .map_err(|e| decryption(format!("bad /Encrypt dictionary: {}", e)))?;
                (dict, Some(*id))
            }
            Ok(Object::Dictionary(dict)) => (dict, None),
            Ok(_) => return Err(decryption("bad /Encrypt entry")),
        };

        let security = StandardSecurity::parse(doc, dict)?;
        let key = security.authenticate(password)?;
        tracing::debug!(
            revision = security.revision,
            strings = ?security.strings,
            streams = ?security.streams,
            "password accepted"
        );

        Ok(Some(Self {
            key,
            strings: security.strings,
            streams: security.streams,
            encrypt_metadata: security.encrypt_metadata,
            dictionary_id,
        }))
    }

    /// Decrypt every string and stream of `doc` and drop the encryption
    /// dictionary.
    pub fn decrypt_document(&self, doc: &mut Document) -> Result<(), PdfDeskError> {
        let mut streams = 0usize;
        for (&id, object) in doc.objects.iter_mut() {
            if Some(id) == self.dictionary_id {
                continue;
            }
            if let Object::Stream(stream) = object {
                let kind = stream.dict.get(b"Type").and_then(Object::as_name).ok();
                // Cross-reference streams are never encrypted
                if kind == Some(b"XRef".as_slice()) {
                    continue;
                }
                let skip = kind == Some(b"Metadata".as_slice()) && !self.encrypt_metadata;
                if !skip {
                    let plain = self.decrypt_bytes(self.streams, id, &stream.content)?;
                    stream.set_content(plain);
                    streams += 1;
                }
                self.decrypt_strings(id, &mut stream.dict)?;
            } else {
                self.decrypt_object_strings(id, object)?;
            }
        }

        if let Some(id) = self.dictionary_id {
            doc.objects.remove(&id);
        }
        doc.trailer.remove(b"Encrypt");
        tracing::debug!(streams, "decrypted document");
        Ok(())
    }

    fn decrypt_strings(&self, id: ObjectId, dict: &mut Dictionary) -> Result<(), PdfDeskError> {
        for (_, value) in dict.iter_mut() {
            self.decrypt_object_strings(id, value)?;
        }
        Ok(())
    }

    fn decrypt_object_strings(&self, id: ObjectId, object: &mut Object) -> Result<(), PdfDeskError> {
        match object {
            Object::String(bytes, _) => {
                *bytes = self.decrypt_bytes(self.strings, id, bytes)?;
            }
            Object::Array(items) => {
                for item in items {
                    self.decrypt_object_strings(id, item)?;
                }
            }
            Object::Dictionary(dict) => self.decrypt_strings(id, dict)?,
            _ => {}
        }
        Ok(())
    }

    fn decrypt_bytes(&self, cipher: Cipher, id: ObjectId, data: &[u8]) -> Result<Vec<u8>, PdfDeskError> {
        match cipher {
            Cipher::Identity => Ok(data.to_vec()),
            Cipher::Rc4 => {
                let mut plain = data.to_vec();
                rc4_apply(&object_key(&self.key, id, false), &mut plain)?;
                Ok(plain)
            }
            Cipher::Aes128 => aes_cbc_decrypt(&object_key(&self.key, id, true), data),
            Cipher::Aes256 => aes_cbc_decrypt(&self.key, data),
        }
    }
}

impl StandardSecurity {
    fn parse(doc: &Document, dict: &Dictionary) -> Result<Self, PdfDeskError> {
        let filter = dict.get(b"Filter").and_then(Object::as_name).unwrap_or(b"Standard".as_slice());
        if filter != b"Standard" {
            return Err(decryption(format!(
                "unsupported security handler /{}",
                String::from_utf8_lossy(filter)
            )));
        }

        let integer = |key: &[u8]| dict.get(key).and_then(Object::as_i64).ok();
        let bytes = |key: &[u8]| {
            dict.get(key)
                .and_then(Object::as_str)
                .map(<[u8]>::to_vec)
                .unwrap_or_default()
        };

        let version = integer(b"V").unwrap_or(0);
        let revision = integer(b"R").ok_or_else(|| decryption("missing /R"))?;
        let permissions = integer(b"P").ok_or_else(|| decryption("missing /P"))?;
        let length_bits = integer(b"Length");

        let (key_length, strings, streams) = match version {
            1 => (5, Cipher::Rc4, Cipher::Rc4),
            2 | 3 => (key_bytes(length_bits, 5)?, Cipher::Rc4, Cipher::Rc4),
            4 => (
                key_bytes(length_bits, 16)?,
                crypt_filter(dict, b"StrF")?,
                crypt_filter(dict, b"StmF")?,
            ),
            5 => (32, crypt_filter(dict, b"StrF")?, crypt_filter(dict, b"StmF")?),
            other => return Err(decryption(format!("unsupported encryption version V={}", other))),
        };

        let file_id = doc
            .trailer
            .get(b"ID")
            .and_then(Object::as_array)
            .ok()
            .and_then(|ids| ids.first())
            .and_then(|id| id.as_str().ok())
            .map(<[u8]>::to_vec)
            .unwrap_or_default();

        let security = Self {
            revision,
            key_length,
            owner: bytes(b"O"),
            user: bytes(b"U"),
            owner_key: bytes(b"OE"),
            user_key: bytes(b"UE"),
            permissions,
            encrypt_metadata: dict
                .get(b"EncryptMetadata")
                .and_then(Object::as_bool)
                .unwrap_or(true),
            file_id,
            strings,
            streams,
        };

        let min_len = if revision >= 5 { 48 } else { 32 };
        if security.owner.len() < min_len || security.user.len() < min_len {
            return Err(decryption("/O or /U entry is too short"));
        }
        Ok(security)
    }

    /// Derive the file key from a user or owner password.
    fn authenticate(&self, password: &str) -> Result<Vec<u8>, PdfDeskError> {
        match self.revision {
            2..=4 => {
                let padded = pad_password(&latin1_password(password));
                if let Some(key) = self.check_user_password(&padded) {
                    return Ok(key);
                }
                let user = self.user_password_from_owner(&padded)?;
                self.check_user_password(&user)
                    .ok_or(PdfDeskError::IncorrectPassword)
            }
            5 | 6 => self.aes256_key(password),
            other => Err(decryption(format!("unsupported security revision R={}", other))),
        }
    }

    /// File key for a padded password, if it matches `/U`.
    fn check_user_password(&self, padded: &[u8; 32]) -> Option<Vec<u8>> {
        let key = self.rc4_file_key(padded);
        let expected = user_entry(&key, self.revision, &self.file_id).ok()?;
        let significant = if self.revision == 2 { 32 } else { 16 };
        (self.user.get(..significant)? == &expected[..significant]).then_some(key)
    }

    fn rc4_file_key(&self, padded: &[u8; 32]) -> Vec<u8> {
        rc4_file_key(
            padded,
            &self.owner[..32],
            self.permissions,
            &self.file_id,
            self.revision,
            self.key_length,
            self.encrypt_metadata,
        )
    }

    /// Recover the padded user password from `/O` with the owner password.
    fn user_password_from_owner(&self, padded_owner: &[u8; 32]) -> Result<[u8; 32], PdfDeskError> {
        let key = owner_rc4_key(padded_owner, self.revision, self.key_length);
        let mut user = [0u8; 32];
        user.copy_from_slice(&self.owner[..32]);
        if self.revision == 2 {
            rc4_apply(&key, &mut user)?;
        } else {
            for round in (0..=19u8).rev() {
                let round_key: Vec<u8> = key.iter().map(|b| b ^ round).collect();
                rc4_apply(&round_key, &mut user)?;
            }
        }
        Ok(user)
    }

    fn aes256_key(&self, password: &str) -> Result<Vec<u8>, PdfDeskError> {
        let password = &password.as_bytes()[..password.len().min(MAX_AES256_PASSWORD)];
        let hash = |salt: &[u8], extra: &[u8]| -> Result<Vec<u8>, PdfDeskError> {
            if self.revision == 5 {
                let mut hasher = Sha256::new();
                hasher.update(password);
                hasher.update(salt);
                hasher.update(extra);
                Ok(hasher.finalize().to_vec())
            } else {
                hardened_hash(password, salt, extra)
            }
        };

        let user = &self.user[..48];
        if hash(&user[32..40], &[])? == user[..32] {
            let intermediate = hash(&user[40..48], &[])?;
            return unwrap_file_key(&intermediate, &self.user_key);
        }

        let owner = &self.owner[..48];
        if hash(&owner[32..40], user)? == owner[..32] {
            let intermediate = hash(&owner[40..48], user)?;
            return unwrap_file_key(&intermediate, &self.owner_key);
        }

        Err(PdfDeskError::IncorrectPassword)
    }
}

fn key_bytes(length_bits: Option<i64>, default: usize) -> Result<usize, PdfDeskError> {
    let Some(bits) = length_bits else {
        return Ok(default);
    };
    match bits {
        40..=128 if bits % 8 == 0 => Ok(bits as usize / 8),
        other => Err(decryption(format!("invalid key length {}", other))),
    }
}

/// Cipher named by `/StrF` or `/StmF` through the `/CF` dictionary.
fn crypt_filter(dict: &Dictionary, entry: &[u8]) -> Result<Cipher, PdfDeskError> {
    let name = dict.get(entry).and_then(Object::as_name).unwrap_or(b"Identity".as_slice());
    if name == b"Identity" {
        return Ok(Cipher::Identity);
    }
    let method = dict
        .get(b"CF")
        .and_then(Object::as_dict)
        .and_then(|filters| filters.get(name))
        .and_then(Object::as_dict)
        .and_then(|filter| filter.get(b"CFM"))
        .and_then(Object::as_name)
        .unwrap_or(b"None".as_slice());
    match method {
        b"None" => Ok(Cipher::Identity),
        b"V2" => Ok(Cipher::Rc4),
        b"AESV2" => Ok(Cipher::Aes128),
        b"AESV3" => Ok(Cipher::Aes256),
        other => Err(decryption(format!(
            "unsupported crypt filter method /{}",
            String::from_utf8_lossy(other)
        ))),
    }
}

/// Password bytes for the RC4 revisions, which expect PDFDocEncoding.
fn latin1_password(password: &str) -> Vec<u8> {
    if password.chars().all(|c| (c as u32) <= 0xFF) {
        password.chars().map(|c| c as u8).collect()
    } else {
        password.as_bytes().to_vec()
    }
}

pub(crate) fn pad_password(password: &[u8]) -> [u8; 32] {
    let mut padded = PASSWORD_PAD;
    let len = password.len().min(32);
    padded[..len].copy_from_slice(&password[..len]);
    padded[len..].copy_from_slice(&PASSWORD_PAD[..32 - len]);
    padded
}

/// File key for the RC4 and AES-128 revisions.
pub(crate) fn rc4_file_key(
    padded: &[u8; 32],
    owner: &[u8],
    permissions: i64,
    file_id: &[u8],
    revision: i64,
    key_length: usize,
    encrypt_metadata: bool,
) -> Vec<u8> {
    let mut hasher = Md5::new();
    hasher.update(padded);
    hasher.update(owner);
    hasher.update((permissions as u32).to_le_bytes());
    hasher.update(file_id);
    if revision >= 4 && !encrypt_metadata {
        hasher.update([0xFF; 4]);
    }
    let mut hash = hasher.finalize().to_vec();
    if revision >= 3 {
        for _ in 0..50 {
            hash = Md5::digest(&hash[..key_length]).to_vec();
        }
    }
    hash.truncate(key_length);
    hash
}

/// RC4 key derived from the owner password (used to build or read `/O`).
pub(crate) fn owner_rc4_key(padded_owner: &[u8; 32], revision: i64, key_length: usize) -> Vec<u8> {
    let mut hash = Md5::digest(padded_owner).to_vec();
    if revision >= 3 {
        for _ in 0..50 {
            hash = Md5::digest(&hash).to_vec();
        }
    }
    let length = if revision == 2 { 5 } else { key_length };
    hash.truncate(length);
    hash
}

/// Expected `/U` value for a file key (first 16 bytes significant from R3).
pub(crate) fn user_entry(key: &[u8], revision: i64, file_id: &[u8]) -> Result<Vec<u8>, PdfDeskError> {
    if revision == 2 {
        let mut entry = PASSWORD_PAD.to_vec();
        rc4_apply(key, &mut entry)?;
        return Ok(entry);
    }

    let mut hasher = Md5::new();
    hasher.update(PASSWORD_PAD);
    hasher.update(file_id);
    let mut entry = hasher.finalize().to_vec();
    for round in 0..=19u8 {
        let round_key: Vec<u8> = key.iter().map(|b| b ^ round).collect();
        rc4_apply(&round_key, &mut entry)?;
    }
    entry.extend_from_slice(&[0; 16]);
    Ok(entry)
}

/// Per-object key for RC4 and AES-128.
pub(crate) fn object_key(file_key: &[u8], id: ObjectId, aes: bool) -> Vec<u8> {
    let mut hasher = Md5::new();
    hasher.update(file_key);
    hasher.update(&id.0.to_le_bytes()[..3]);
    hasher.update(&id.1.to_le_bytes()[..2]);
    if aes {
        hasher.update(b"sAlT");
    }
    let hash = hasher.finalize();
    hash[..(file_key.len() + 5).min(16)].to_vec()
}

/// RC4 with a 40 to 128 bit key; encryption and decryption are the same.
pub(crate) fn rc4_apply(key: &[u8], data: &mut [u8]) -> Result<(), PdfDeskError> {
    macro_rules! apply {
        ($($len:literal => $size:ty),*) => {
            match key.len() {
                $($len => Rc4::<$size>::new_from_slice(key)
                    .map(|mut cipher| cipher.apply_keystream(data))
                    .map_err(|_| decryption("invalid RC4 key")),)*
                other => Err(decryption(format!("unsupported RC4 key length {}", other))),
            }
        };
    }
    apply!(5 => U5, 6 => U6, 7 => U7, 8 => U8, 9 => U9, 10 => U10,
           11 => U11, 12 => U12, 13 => U13, 14 => U14, 15 => U15, 16 => U16)
}

/// Decrypt `iv || ciphertext` with PKCS#7 padding.
fn aes_cbc_decrypt(key: &[u8], data: &[u8]) -> Result<Vec<u8>, PdfDeskError> {
    if data.is_empty() {
        return Ok(Vec::new());
    }
    if data.len() < 32 || data.len() % 16 != 0 {
        return Err(decryption(format!("AES data of {} bytes is malformed", data.len())));
    }
    let (iv, ciphertext) = data.split_at(16);
    let mut buffer = ciphertext.to_vec();
    let plain = match key.len() {
        16 => cbc::Decryptor::<aes::Aes128>::new_from_slices(key, iv)
            .map_err(|_| decryption("invalid AES key"))?
            .decrypt_padded_mut::<Pkcs7>(&mut buffer),
        32 => cbc::Decryptor::<aes::Aes256>::new_from_slices(key, iv)
            .map_err(|_| decryption("invalid AES key"))?
            .decrypt_padded_mut::<Pkcs7>(&mut buffer),
        other => return Err(decryption(format!("unsupported AES key length {}", other))),
    }
    .map_err(|_| decryption("bad AES padding"))?;
    Ok(plain.to_vec())
}

/// Decrypt `/UE` or `/OE` (AES-256, zero IV, no padding).
fn unwrap_file_key(intermediate: &[u8], wrapped: &[u8]) -> Result<Vec<u8>, PdfDeskError> {
    if wrapped.len() != 32 {
        return Err(decryption("/UE or /OE entry must be 32 bytes"));
    }
    let mut buffer = wrapped.to_vec();
    cbc::Decryptor::<aes::Aes256>::new_from_slices(&intermediate[..32], &[0u8; 16])
        .map_err(|_| decryption("invalid AES key"))?
        .decrypt_padded_mut::<NoPadding>(&mut buffer)
        .map_err(|_| decryption("bad /UE or /OE entry"))?;
    Ok(buffer)
}

/// Iterated SHA-2 password hash of revision 6.
pub(crate) fn hardened_hash(password: &[u8], salt: &[u8], extra: &[u8]) -> Result<Vec<u8>, PdfDeskError> {
    let mut hasher = Sha256::new();
    hasher.update(password);
    hasher.update(salt);
    hasher.update(extra);
    let mut k = hasher.finalize().to_vec();

    let mut round = 0usize;
    loop {
        let block: Vec<u8> = [password, k.as_slice(), extra].concat();
        let mut k1 = block.repeat(64);
        let len = k1.len();
        let e = cbc::Encryptor::<aes::Aes128>::new_from_slices(&k[..16], &k[16..32])
            .map_err(|_| decryption("invalid AES key"))?
            .encrypt_padded_mut::<NoPadding>(&mut k1, len)
            .map_err(|_| decryption("hash input is not block aligned"))?
            .to_vec();

        let selector: u32 = e[..16].iter().map(|&b| b as u32).sum::<u32>() % 3;
        k = match selector {
            0 => Sha256::digest(&e).to_vec(),
            1 => Sha384::digest(&e).to_vec(),
            _ => Sha512::digest(&e).to_vec(),
        };

        round += 1;
        let last = e.last().copied().unwrap_or(0) as usize;
        if round >= 64 && last + 32 <= round {
            break;
        }
    }
    k.truncate(32);
    Ok(k)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_rc4_is_symmetric_and_checks_key_length() {
        let mut data = b"Plaintext".to_vec();
        rc4_apply(b"Key12", &mut data).unwrap();
        assert_ne!(data, b"Plaintext");
        rc4_apply(b"Key12", &mut data).unwrap();
        assert_eq!(data, b"Plaintext");

        assert!(rc4_apply(b"abc", &mut data).is_err());
    }

    #[test]
    fn test_password_padding() {
        assert_eq!(pad_password(b""), PASSWORD_PAD);
        let padded = pad_password(b"abc");
        assert_eq!(&padded[..3], b"abc");
        assert_eq!(&padded[3..], &PASSWORD_PAD[..29]);
        assert_eq!(pad_password(&[b'x'; 40]), [b'x'; 32]);
    }

    #[test]
    fn test_latin1_passwords() {
        assert_eq!(latin1_password("café"), vec![b'c', b'a', b'f', 0xE9]);
        assert_eq!(latin1_password("암호"), "암호".as_bytes().to_vec());
    }

    #[test]
    fn test_object_key_lengths() {
        assert_eq!(object_key(&[1; 5], (7, 0), false).len(), 10);
        assert_eq!(object_key(&[1; 16], (7, 0), false).len(), 16);
        assert_ne!(object_key(&[1; 16], (7, 0), true), object_key(&[1; 16], (7, 0), false));
    }

    #[test]
    fn test_aes_rejects_malformed_data() {
        assert!(aes_cbc_decrypt(&[0; 16], &[0; 20]).is_err());
        assert!(aes_cbc_decrypt(&[0; 16], &[0; 16]).is_err());
        assert_eq!(aes_cbc_decrypt(&[0; 16], &[]).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_key_length_validation() {
        assert_eq!(key_bytes(None, 5).unwrap(), 5);
        assert_eq!(key_bytes(Some(128), 5).unwrap(), 16);
        assert!(key_bytes(Some(256), 5).is_err());
        assert!(key_bytes(Some(44), 5).is_err());
    }

    #[test]
    fn test_hardened_hash_is_deterministic() {
        let a = hardened_hash(b"secret", &[1; 8], &[]).unwrap();
        let b = hardened_hash(b"secret", &[1; 8], &[]).unwrap();
        let c = hardened_hash(b"Secret", &[1; 8], &[]).unwrap();
        assert_eq!(a.len(), 32);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
