use wallet_custody::crypto::kdf::{derive_key_from_pin, KdfSalt, MIN_PBKDF2_ITERATIONS};
use wallet_custody::crypto::random::OsEntropy;
use wallet_custody::security::envelope::{decrypt, encrypt, EncryptedBlob, TAG_LEN};
use wallet_custody::CustodyError;

const AAD: &[u8] = b"wallet-custody/v1|0xabc|device|0";

fn salt() -> KdfSalt {
    KdfSalt::from_bytes([7u8; 32])
}

#[test]
fn test_seal_and_open_with_pin_key() {
    let key = derive_key_from_pin("246810", &salt(), MIN_PBKDF2_ITERATIONS).unwrap();
    let blob = encrypt(b"share bytes", &key, AAD, &OsEntropy).unwrap();
    assert_eq!(blob.ciphertext.len(), b"share bytes".len() + TAG_LEN);
    assert_eq!(decrypt(&blob, &key, AAD).unwrap().as_slice(), b"share bytes");
}

#[test]
fn test_wrong_pin_or_salt_fails() {
    let key = derive_key_from_pin("246810", &salt(), MIN_PBKDF2_ITERATIONS).unwrap();
    let blob = encrypt(b"share bytes", &key, AAD, &OsEntropy).unwrap();

    let other_pin = derive_key_from_pin("246811", &salt(), MIN_PBKDF2_ITERATIONS).unwrap();
    assert!(matches!(decrypt(&blob, &other_pin, AAD), Err(CustodyError::DecryptionFailed)));

    let other_salt = derive_key_from_pin("246810", &KdfSalt::from_bytes([8u8; 32]), MIN_PBKDF2_ITERATIONS).unwrap();
    assert!(matches!(decrypt(&blob, &other_salt, AAD), Err(CustodyError::DecryptionFailed)));
}

#[test]
fn test_every_tampered_byte_is_detected() {
    let key = derive_key_from_pin("246810", &salt(), MIN_PBKDF2_ITERATIONS).unwrap();
    let blob = encrypt(b"0123456789", &key, AAD, &OsEntropy).unwrap();

    for i in 0..blob.ciphertext.len() {
        let mut tampered = blob.clone();
        tampered.ciphertext[i] ^= 0x01;
        assert!(matches!(decrypt(&tampered, &key, AAD), Err(CustodyError::DecryptionFailed)), "byte {i}");
    }
    for i in 0..blob.iv.len() {
        let mut tampered = blob.clone();
        tampered.iv[i] ^= 0x80;
        assert!(matches!(decrypt(&tampered, &key, AAD), Err(CustodyError::DecryptionFailed)), "iv {i}");
    }
}

#[test]
fn test_context_is_bound() {
    let key = derive_key_from_pin("246810", &salt(), MIN_PBKDF2_ITERATIONS).unwrap();
    let blob = encrypt(b"share", &key, AAD, &OsEntropy).unwrap();
    assert!(decrypt(&blob, &key, b"wallet-custody/v1|0xabc|server|0").is_err());
    assert!(decrypt(&blob, &key, b"wallet-custody/v1|0xabc|device|1").is_err());
}

#[test]
fn test_truncated_blob_rejected() {
    let key = derive_key_from_pin("246810", &salt(), MIN_PBKDF2_ITERATIONS).unwrap();
    let blob = encrypt(b"share", &key, AAD, &OsEntropy).unwrap();
    let short = EncryptedBlob::new(blob.ciphertext[..TAG_LEN - 1].to_vec(), blob.iv);
    assert!(matches!(decrypt(&short, &key, AAD), Err(CustodyError::DecryptionFailed)));

    let empty = EncryptedBlob::new(Vec::new(), blob.iv);
    assert!(matches!(decrypt(&empty, &key, AAD), Err(CustodyError::DecryptionFailed)));
}

#[test]
fn test_base64_parts_round_trip() {
    let key = derive_key_from_pin("246810", &salt(), MIN_PBKDF2_ITERATIONS).unwrap();
    let blob = encrypt(b"share", &key, AAD, &OsEntropy).unwrap();
    let parsed = EncryptedBlob::from_base64_parts(&blob.ciphertext_base64(), &blob.iv_base64()).unwrap();
    assert_eq!(parsed, blob);
    assert!(EncryptedBlob::from_base64_parts(&blob.ciphertext_base64(), "AAAA").is_err());
}
