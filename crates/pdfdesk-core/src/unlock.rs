//! Password removal
//!
//! Decrypts a protected document with the user-supplied password and saves
//! it without an `/Encrypt` dictionary.

use crate::document;
use crate::error::PdfDeskError;
use crate::security::SecurityHandler;

/// Decrypt `bytes` with `password` and return an unprotected copy.
///
/// The password may be either the user or the owner password. Documents
/// that are not encrypted are re-saved unchanged in content.
pub fn unlock_document(bytes: &[u8], password: &str) -> Result<Vec<u8>, PdfDeskError> {
    let mut doc = document::load(bytes)?;

    match SecurityHandler::open(&doc, password)? {
        Some(handler) => handler.decrypt_document(&mut doc)?,
        None => tracing::debug!("document is not encrypted, re-saving"),
    }

    document::save(&mut doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{
        create_encrypted_pdf, create_test_pdf, document_title, page_labels, EncryptionScheme,
    };
    use pretty_assertions::assert_eq;

    const SCHEMES: [EncryptionScheme; 3] = [
        EncryptionScheme::Rc4V2R3,
        EncryptionScheme::Aes128V4R4,
        EncryptionScheme::Aes256V5R6,
    ];

    fn assert_unlocked(result: &[u8], pages: usize) {
        let expected: Vec<String> = (1..=pages).map(|i| format!("Page {}", i)).collect();
        assert_eq!(page_labels(result), expected);
        assert_eq!(document_title(result).as_deref(), Some("Quarterly report"));
        let doc = lopdf::Document::load_mem(result).unwrap();
        assert!(doc.trailer.get(b"Encrypt").is_err());
    }

    #[test]
    fn test_unencrypted_document_passes_through() {
        let pdf = create_test_pdf(2);
        let result = unlock_document(&pdf, "").unwrap();
        assert_eq!(page_labels(&result), vec!["Page 1", "Page 2"]);
        assert!(!lopdf::Document::load_mem(&result).unwrap().is_encrypted());
    }

    #[test]
    fn test_password_ignored_for_unencrypted_document() {
        let pdf = create_test_pdf(1);
        assert!(unlock_document(&pdf, "secret").is_ok());
    }

    #[test]
    fn test_garbage_is_a_parse_error() {
        assert!(matches!(
            unlock_document(b"garbage", "x"),
            Err(PdfDeskError::ParseError(_))
        ));
    }

    #[test]
    fn test_rc4_document_with_empty_user_password() {
        let pdf = create_encrypted_pdf(3, "", "owner", EncryptionScheme::Rc4V2R3);
        assert_ne!(document_title(&pdf).as_deref(), Some("Quarterly report"));

        let result = unlock_document(&pdf, "").unwrap();
        assert_unlocked(&result, 3);
    }

    #[test]
    fn test_user_password_unlocks_every_scheme() {
        for scheme in SCHEMES {
            let pdf = create_encrypted_pdf(2, "user", "owner", scheme);
            let result = unlock_document(&pdf, "user")
                .unwrap_or_else(|e| panic!("{:?}: {}", scheme, e));
            assert_unlocked(&result, 2);
        }
    }

    #[test]
    fn test_owner_password_unlocks_every_scheme() {
        for scheme in SCHEMES {
            let pdf = create_encrypted_pdf(2, "user", "owner", scheme);
            let result = unlock_document(&pdf, "owner")
                .unwrap_or_else(|e| panic!("{:?}: {}", scheme, e));
            assert_unlocked(&result, 2);
        }
    }

    #[test]
    fn test_wrong_password_is_rejected() {
        for scheme in SCHEMES {
            let pdf = create_encrypted_pdf(1, "user", "owner", scheme);
            let err = unlock_document(&pdf, "guess").unwrap_err();
            assert!(
                matches!(err, PdfDeskError::IncorrectPassword),
                "{:?}: {:?}",
                scheme,
                err
            );
            assert!(err.is_password_error());
        }
    }

    #[test]
    fn test_empty_password_rejected_when_user_password_set() {
        let pdf = create_encrypted_pdf(1, "user", "owner", EncryptionScheme::Rc4V2R3);
        assert!(matches!(
            unlock_document(&pdf, ""),
            Err(PdfDeskError::IncorrectPassword)
        ));
    }

    #[test]
    fn test_unknown_security_handler_is_a_decryption_error() {
        let pdf = create_encrypted_pdf(1, "", "owner", EncryptionScheme::Rc4V2R3);
        let mut doc = lopdf::Document::load_mem(&pdf).unwrap();
        let id = doc.trailer.get(b"Encrypt").unwrap().as_reference().unwrap();
        doc.get_dictionary_mut(id)
            .unwrap()
            .set("Filter", lopdf::Object::Name(b"Adobe.PubSec".to_vec()));
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();

        let err = unlock_document(&bytes, "").unwrap_err();
        assert!(matches!(err, PdfDeskError::Decryption(_)));
        assert!(!err.is_password_error());
    }
}
