//! Compact recoverable block signatures.
//!
//! A block is signed over the magic-prefixed hash of its (signature-zeroed)
//! block hash. The 65-byte signature carries a Bitcoin-style recovery
//! header byte, so validation recovers the public key and compares it to
//! the one stored in the header.

use once_cell::sync::Lazy;
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{All, Message, PublicKey, Secp256k1, SecretKey};
use thiserror::Error;

static SECP: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("invalid recovery header byte {0}")]
    BadHeaderByte(u8),
    #[error("malformed compact signature")]
    Malformed,
    #[error("public key recovery failed")]
    RecoveryFailed,
}

/// Produce a 65-byte compact signature with the compressed-key recovery
/// header (`31 + recovery_id`).
pub fn sign_compact(secret: &SecretKey, hash: &[u8; 32]) -> [u8; 65] {
    let message = Message::from_slice(hash).expect("32-byte digest");
    let recoverable = SECP.sign_ecdsa_recoverable(&message, secret);
    let (recovery_id, data) = recoverable.serialize_compact();

    let mut signature = [0u8; 65];
    signature[0] = 27 + recovery_id.to_i32() as u8 + 4;
    signature[1..].copy_from_slice(&data);
    signature
}

/// Recover the compressed public key a compact signature was made with.
pub fn recover_pubkey(hash: &[u8; 32], signature: &[u8; 65]) -> Result<[u8; 33], SignatureError> {
    let header = signature[0];
    if !(27..=34).contains(&header) {
        return Err(SignatureError::BadHeaderByte(header));
    }
    let recovery_id = RecoveryId::from_i32(i32::from((header - 27) & 3))
        .map_err(|_| SignatureError::Malformed)?;
    let recoverable = RecoverableSignature::from_compact(&signature[1..], recovery_id)
        .map_err(|_| SignatureError::Malformed)?;
    let message = Message::from_slice(hash).map_err(|_| SignatureError::Malformed)?;
    let pubkey: PublicKey = SECP
        .recover_ecdsa(&message, &recoverable)
        .map_err(|_| SignatureError::RecoveryFailed)?;
    Ok(pubkey.serialize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::AccountId;
    use secp256k1::rand::thread_rng;

    #[test]
    fn sign_and_recover_roundtrip() {
        let (secret, public) = SECP.generate_keypair(&mut thread_rng());
        let hash = [0x5Au8; 32];

        let signature = sign_compact(&secret, &hash);
        let recovered = recover_pubkey(&hash, &signature).unwrap();
        assert_eq!(recovered, public.serialize());
        assert_eq!(
            AccountId::from_pubkey(&recovered),
            AccountId::from_pubkey(&public.serialize())
        );
    }

    #[test]
    fn recovery_fails_on_wrong_hash() {
        let (secret, public) = SECP.generate_keypair(&mut thread_rng());
        let signature = sign_compact(&secret, &[0x5Au8; 32]);

        // Either recovery errors out or yields a different key.
        match recover_pubkey(&[0xA5u8; 32], &signature) {
            Ok(recovered) => assert_ne!(recovered, public.serialize()),
            Err(_) => {}
        }
    }

    #[test]
    fn bad_header_byte_rejected() {
        let mut signature = [0u8; 65];
        signature[0] = 0x01;
        assert_eq!(
            recover_pubkey(&[0u8; 32], &signature).unwrap_err(),
            SignatureError::BadHeaderByte(0x01)
        );
    }
}
