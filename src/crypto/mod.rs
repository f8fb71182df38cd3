//! Hash primitives for the capacity lottery.

pub mod shabal256;

pub use shabal256::{shabal256, shabal256_lite};

use sha2::{Digest, Sha256};

/// Double SHA-256, the hash used for block ids, txids and the
/// generation-signature chain.
pub fn sha256d(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    second.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256d_empty() {
        // sha256(sha256(""))
        assert_eq!(
            hex::encode(sha256d(b"")),
            "5df6e0e2761359d30a8275058e299fcc0381534545f55cf43e41983f5d4c9456"
        );
    }
}
