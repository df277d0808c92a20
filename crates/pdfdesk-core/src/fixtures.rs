//! Builders for small PDFs and images used by tests.

use crate::security::{
    hardened_hash, object_key, owner_rc4_key, pad_password, rc4_apply, rc4_file_key, user_entry,
};
use aes::cipher::block_padding::{NoPadding, Pkcs7};
use aes::cipher::{BlockEncryptMut, KeyIvInit};
use image::{ImageBuffer, ImageFormat, Rgb, Rgba};
use lopdf::{
    content::Content, content::Operation, Dictionary, Document, Object, ObjectId, Stream,
    StringFormat,
};
use std::io::Cursor;

/// Create a valid PDF with `num_pages` US Letter pages, each showing "Page N".
pub fn create_test_pdf(num_pages: u32) -> Vec<u8> {
    create_labelled_pdf(num_pages, "Page")
}

/// Like [`create_test_pdf`], with every page showing "`label` N".
pub fn create_labelled_pdf(num_pages: u32, label: &str) -> Vec<u8> {
    save(&mut labelled_document(num_pages, label))
}

fn labelled_document(num_pages: u32, label: &str) -> Document {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut page_ids = Vec::new();

    for i in 0..num_pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new(
                    "Tf",
                    vec![Object::Name(b"F1".to_vec()), Object::Integer(12)],
                ),
                Operation::new("Td", vec![Object::Integer(100), Object::Integer(700)]),
                Operation::new(
                    "Tj",
                    vec![Object::String(
                        format!("{} {}", label, i + 1).into_bytes(),
                        lopdf::StringFormat::Literal,
                    )],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));

        let page = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("Contents", Object::Reference(content_id)),
        ]);
        let page_id = doc.add_object(page);
        page_ids.push(page_id);
    }

    // MediaBox and Resources live on the Pages node so pages inherit them
    let font_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Courier".to_vec())),
    ]));
    let pages = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Count", Object::Integer(num_pages as i64)),
        (
            "Kids",
            Object::Array(page_ids.iter().map(|id| Object::Reference(*id)).collect()),
        ),
        (
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ]),
        ),
        (
            "Resources",
            Object::Dictionary(Dictionary::from_iter(vec![(
                "Font",
                Object::Dictionary(Dictionary::from_iter(vec![(
                    "F1",
                    Object::Reference(font_id),
                )])),
            )])),
        ),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]);
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", Object::Reference(catalog_id));
    doc
}

fn save(doc: &mut Document) -> Vec<u8> {
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// Standard security handler variants for [`create_encrypted_pdf`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionScheme {
    /// RC4, 128-bit key (V2, R3)
    Rc4V2R3,
    /// AES-128 through the StdCF crypt filter (V4, R4)
    Aes128V4R4,
    /// AES-256 (V5, R6)
    Aes256V5R6,
}

const FILE_ID: [u8; 16] = *b"pdfdesk-fixture!";
const PERMISSIONS: i64 = -3904;

/// A [`create_test_pdf`] document with an Info `/Title` of
/// "Quarterly report", encrypted with the given passwords.
pub fn create_encrypted_pdf(
    num_pages: u32,
    user_password: &str,
    owner_password: &str,
    scheme: EncryptionScheme,
) -> Vec<u8> {
    let mut doc = labelled_document(num_pages, "Page");
    let info_id = doc.add_object(Dictionary::from_iter(vec![(
        "Title",
        Object::string_literal("Quarterly report"),
    )]));
    doc.trailer.set("Info", Object::Reference(info_id));
    doc.trailer.set(
        "ID",
        Object::Array(vec![
            Object::String(FILE_ID.to_vec(), StringFormat::Hexadecimal),
            Object::String(FILE_ID.to_vec(), StringFormat::Hexadecimal),
        ]),
    );

    let (encrypt, file_key) = match scheme {
        EncryptionScheme::Rc4V2R3 => rc4_security(user_password, owner_password, 3, None),
        EncryptionScheme::Aes128V4R4 => {
            rc4_security(user_password, owner_password, 4, Some(b"AESV2".as_slice()))
        }
        EncryptionScheme::Aes256V5R6 => aes256_security(user_password, owner_password),
    };

    let ids: Vec<ObjectId> = doc.objects.keys().copied().collect();
    for id in ids {
        let key = match scheme {
            EncryptionScheme::Rc4V2R3 => object_key(&file_key, id, false),
            EncryptionScheme::Aes128V4R4 => object_key(&file_key, id, true),
            EncryptionScheme::Aes256V5R6 => file_key.clone(),
        };
        let aes = scheme != EncryptionScheme::Rc4V2R3;
        let object = doc.objects.get_mut(&id).unwrap();
        if let Object::Stream(stream) = object {
            let encrypted = encrypt_bytes(&key, aes, &stream.content);
            stream.set_content(encrypted);
            encrypt_strings(&key, aes, &mut stream.dict);
        } else {
            encrypt_object(&key, aes, object);
        }
    }

    let encrypt_id = doc.add_object(encrypt);
    doc.trailer.set("Encrypt", Object::Reference(encrypt_id));
    save(&mut doc)
}

fn hex(bytes: &[u8]) -> Object {
    Object::String(bytes.to_vec(), StringFormat::Hexadecimal)
}

fn crypt_filters(method: &[u8], length: i64) -> Object {
    Object::Dictionary(Dictionary::from_iter(vec![(
        "StdCF",
        Object::Dictionary(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"CryptFilter".to_vec())),
            ("CFM", Object::Name(method.to_vec())),
            ("AuthEvent", Object::Name(b"DocOpen".to_vec())),
            ("Length", Object::Integer(length)),
        ])),
    )]))
}

/// `/Encrypt` dictionary and file key for revisions 3 and 4.
fn rc4_security(
    user_password: &str,
    owner_password: &str,
    revision: i64,
    crypt_filter: Option<&[u8]>,
) -> (Dictionary, Vec<u8>) {
    let key_length = 16;
    let padded_user = pad_password(user_password.as_bytes());

    let owner_key = owner_rc4_key(&pad_password(owner_password.as_bytes()), revision, key_length);
    let mut owner = padded_user.to_vec();
    for round in 0..=19u8 {
        let round_key: Vec<u8> = owner_key.iter().map(|b| b ^ round).collect();
        rc4_apply(&round_key, &mut owner).unwrap();
    }

    let file_key = rc4_file_key(
        &padded_user,
        &owner,
        PERMISSIONS,
        &FILE_ID,
        revision,
        key_length,
        true,
    );
    let user = user_entry(&file_key, revision, &FILE_ID).unwrap();

    let mut dict = Dictionary::from_iter(vec![
        ("Filter", Object::Name(b"Standard".to_vec())),
        ("V", Object::Integer(if crypt_filter.is_some() { 4 } else { 2 })),
        ("R", Object::Integer(revision)),
        ("Length", Object::Integer(128)),
        ("O", hex(&owner)),
        ("U", hex(&user)),
        ("P", Object::Integer(PERMISSIONS)),
    ]);
    if let Some(method) = crypt_filter {
        dict.set("CF", crypt_filters(method, 16));
        dict.set("StmF", Object::Name(b"StdCF".to_vec()));
        dict.set("StrF", Object::Name(b"StdCF".to_vec()));
    }
    (dict, file_key)
}

/// `/Encrypt` dictionary and file key for revision 6.
fn aes256_security(user_password: &str, owner_password: &str) -> (Dictionary, Vec<u8>) {
    let file_key: Vec<u8> = (0..32u8).map(|i| i.wrapping_mul(37).wrapping_add(11)).collect();
    let user_password = user_password.as_bytes();
    let owner_password = owner_password.as_bytes();

    let (user_validation, user_key_salt) = ([1u8; 8], [2u8; 8]);
    let mut user = hardened_hash(user_password, &user_validation, &[]).unwrap();
    user.extend_from_slice(&user_validation);
    user.extend_from_slice(&user_key_salt);
    let user_wrap = hardened_hash(user_password, &user_key_salt, &[]).unwrap();

    let (owner_validation, owner_key_salt) = ([3u8; 8], [4u8; 8]);
    let mut owner = hardened_hash(owner_password, &owner_validation, &user).unwrap();
    owner.extend_from_slice(&owner_validation);
    owner.extend_from_slice(&owner_key_salt);
    let owner_wrap = hardened_hash(owner_password, &owner_key_salt, &user).unwrap();

    let dict = Dictionary::from_iter(vec![
        ("Filter", Object::Name(b"Standard".to_vec())),
        ("V", Object::Integer(5)),
        ("R", Object::Integer(6)),
        ("Length", Object::Integer(256)),
        ("CF", crypt_filters(b"AESV3", 32)),
        ("StmF", Object::Name(b"StdCF".to_vec())),
        ("StrF", Object::Name(b"StdCF".to_vec())),
        ("O", hex(&owner)),
        ("U", hex(&user)),
        ("OE", hex(&wrap_file_key(&owner_wrap, &file_key))),
        ("UE", hex(&wrap_file_key(&user_wrap, &file_key))),
        ("P", Object::Integer(PERMISSIONS)),
    ]);
    (dict, file_key)
}

fn wrap_file_key(key: &[u8], file_key: &[u8]) -> Vec<u8> {
    let mut buffer = file_key.to_vec();
    cbc::Encryptor::<aes::Aes256>::new_from_slices(key, &[0u8; 16])
        .unwrap()
        .encrypt_padded_mut::<NoPadding>(&mut buffer, 32)
        .unwrap();
    buffer
}

fn encrypt_bytes(key: &[u8], aes: bool, data: &[u8]) -> Vec<u8> {
    if !aes {
        let mut encrypted = data.to_vec();
        rc4_apply(key, &mut encrypted).unwrap();
        return encrypted;
    }

    let iv = [0x5Au8; 16];
    let len = data.len();
    let mut buffer = data.to_vec();
    buffer.resize(len + 16 - len % 16, 0);
    let ciphertext = match key.len() {
        16 => cbc::Encryptor::<aes::Aes128>::new_from_slices(key, &iv)
            .unwrap()
            .encrypt_padded_mut::<Pkcs7>(&mut buffer, len)
            .unwrap()
            .to_vec(),
        _ => cbc::Encryptor::<aes::Aes256>::new_from_slices(key, &iv)
            .unwrap()
            .encrypt_padded_mut::<Pkcs7>(&mut buffer, len)
            .unwrap()
            .to_vec(),
    };
    [iv.as_slice(), ciphertext.as_slice()].concat()
}

fn encrypt_strings(key: &[u8], aes: bool, dict: &mut Dictionary) {
    for (_, value) in dict.iter_mut() {
        encrypt_object(key, aes, value);
    }
}

fn encrypt_object(key: &[u8], aes: bool, object: &mut Object) {
    match object {
        Object::String(bytes, format) => {
            *bytes = encrypt_bytes(key, aes, bytes);
            *format = StringFormat::Hexadecimal;
        }
        Object::Array(items) => items.iter_mut().for_each(|item| encrypt_object(key, aes, item)),
        Object::Dictionary(dict) => encrypt_strings(key, aes, dict),
        _ => {}
    }
}

/// The Info dictionary `/Title`, if present and readable.
pub fn document_title(bytes: &[u8]) -> Option<String> {
    let doc = Document::load_mem(bytes).ok()?;
    let info = doc.trailer.get(b"Info").and_then(Object::as_reference).ok()?;
    let title = doc.get_dictionary(info).ok()?.get(b"Title").ok()?.as_str().ok()?;
    Some(String::from_utf8_lossy(title).into_owned())
}

/// Text drawn by each page's first `Tj`, in page order.
pub fn page_labels(bytes: &[u8]) -> Vec<String> {
    let doc = Document::load_mem(bytes).unwrap();
    doc.get_pages()
        .into_values()
        .map(|page_id| {
            let content = doc.get_page_content(page_id).unwrap_or_default();
            let content = Content::decode(&content).unwrap();
            content
                .operations
                .iter()
                .find(|op| op.operator == "Tj")
                .and_then(|op| op.operands.first())
                .and_then(|obj| obj.as_str().ok())
                .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
                .unwrap_or_default()
        })
        .collect()
}

pub fn create_png(width: u32, height: u32) -> Vec<u8> {
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, 128])
    });
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

pub fn create_png_with_alpha(width: u32, height: u32) -> Vec<u8> {
    let img = ImageBuffer::from_fn(width, height, |x, _| Rgba([200, 30, 30, (x % 256) as u8]));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

pub fn create_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 90])
    });
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)
        .unwrap();
    bytes
}
