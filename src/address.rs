//! Account identifiers and their address forms.
//!
//! An account id is the HASH160 of a compressed secp256k1 public key — the
//! same 20 bytes that sit inside a version-0 witness program. The RPC
//! surface speaks bech32; everything else in the core uses the raw bytes.

use std::fmt;

use bech32::{self, FromBase32, ToBase32, Variant};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::encoding::{hex20, EncodingError};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid bech32: {0}")]
    Bech32(String),
    #[error("wrong address prefix: expected {expected}, got {got}")]
    WrongHrp { expected: String, got: String },
    #[error("address must be a version-0 key hash program")]
    NotKeyHash,
}

/// 20-byte account identifier (P2WPKH key hash).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct AccountId(pub [u8; 20]);

impl AccountId {
    pub const ZERO: AccountId = AccountId([0u8; 20]);

    /// HASH160 of a compressed public key.
    pub fn from_pubkey(pubkey: &[u8; 33]) -> AccountId {
        let sha = Sha256::digest(pubkey);
        let ripe = Ripemd160::digest(sha);
        AccountId(ripe.into())
    }

    /// Parse the 40-hex-char form used by the mining protocol.
    pub fn from_hex(s: &str) -> Result<AccountId, EncodingError> {
        Ok(AccountId(hex20(s)?))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Encode as a bech32 version-0 witness address under the given prefix.
    pub fn to_address(&self, hrp: &str) -> String {
        let mut data = vec![bech32::u5::try_from_u8(0).expect("witness version 0 fits in u5")];
        data.extend(self.0.to_base32());
        bech32::encode(hrp, data, Variant::Bech32).expect("static hrp is valid")
    }

    /// Decode a bech32 version-0 key-hash address under the given prefix.
    pub fn from_address(addr: &str, hrp: &str) -> Result<AccountId, AddressError> {
        let (got_hrp, data, variant) =
            bech32::decode(addr).map_err(|e| AddressError::Bech32(e.to_string()))?;
        if got_hrp != hrp {
            return Err(AddressError::WrongHrp {
                expected: hrp.to_string(),
                got: got_hrp,
            });
        }
        if data.is_empty() || data[0].to_u8() != 0 || variant != Variant::Bech32 {
            return Err(AddressError::NotKeyHash);
        }
        let program = Vec::<u8>::from_base32(&data[1..])
            .map_err(|e| AddressError::Bech32(e.to_string()))?;
        let bytes: [u8; 20] = program.try_into().map_err(|_| AddressError::NotKeyHash)?;
        Ok(AccountId(bytes))
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self.to_hex())
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
