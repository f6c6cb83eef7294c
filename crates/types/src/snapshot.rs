//! Sidechain snapshot types.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::{G1Point, G2Point};

/// Block claims of a sidechain block, as committed in a snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct BlockClaims {
    pub chain_id: u32,
    pub height: u32,
    pub tx_count: u32,
    pub prev_block: [u8; 32],
    pub tx_root: [u8; 32],
    pub state_root: [u8; 32],
    pub header_root: [u8; 32],
}

impl BlockClaims {
    /// Encoded size: three u32 fields and four 32-byte roots.
    pub const ENCODED_LEN: usize = 3 * 4 + 4 * 32;

    /// Canonical (borsh-compatible) encoding; this is what the group signature covers.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::ENCODED_LEN);
        out.extend_from_slice(&self.chain_id.to_le_bytes());
        out.extend_from_slice(&self.height.to_le_bytes());
        out.extend_from_slice(&self.tx_count.to_le_bytes());
        out.extend_from_slice(&self.prev_block);
        out.extend_from_slice(&self.tx_root);
        out.extend_from_slice(&self.state_root);
        out.extend_from_slice(&self.header_root);
        out
    }

    /// Decode claims from their canonical encoding.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        borsh::from_slice(bytes).ok()
    }
}

/// Group signature over block claims: the signing group key and the signature.
#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct GroupSignature {
    pub public_key: G2Point,
    pub signature: G1Point,
}

/// A committed snapshot.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct Snapshot {
    /// Host chain block at which the snapshot was committed
    pub committed_at: u64,
    pub block_claims: BlockClaims,
    pub signature: GroupSignature,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_claims_encoding_is_canonical() {
        let claims = BlockClaims {
            chain_id: 1,
            height: 1024,
            tx_count: 3,
            ..Default::default()
        };
        let bytes = claims.to_bytes();
        assert_eq!(bytes.len(), BlockClaims::ENCODED_LEN);
        assert_eq!(bytes, borsh::to_vec(&claims).unwrap());
        assert_eq!(BlockClaims::from_bytes(&bytes), Some(claims));
        assert_eq!(BlockClaims::from_bytes(&bytes[..bytes.len() - 1]), None);
    }
}
