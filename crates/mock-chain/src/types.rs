//! RPC-compatible types for the mock chain.
//!
//! Byte payloads travel hex-encoded; everything else is the module's own
//! serde representation.

use jsonrpsee::types::ErrorObjectOwned;
use serde::{Deserialize, Serialize};

use ethdkg_module::{ModuleCall, ModuleError};
use ethdkg_types::{Address, Phase};

/// Error code for calls the module rejected.
pub const CALL_REJECTED: i32 = -32000;
/// Error code for malformed RPC parameters.
pub const INVALID_PARAMS: i32 = -32602;

/// Block info response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockInfo {
    pub height: u64,
    pub nonce: u64,
    pub phase: Phase,
    pub phase_start_block: u64,
    pub consensus_running: bool,
    /// Hex-encoded validator addresses
    pub validators: Vec<String>,
}

/// Outcome of a committed call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallReceipt {
    pub block_height: u64,
    /// Index of the first event the call emitted
    pub first_event: usize,
    pub events_emitted: usize,
}

pub fn invalid_params(msg: impl Into<String>) -> ErrorObjectOwned {
    ErrorObjectOwned::owned(INVALID_PARAMS, msg.into(), None::<()>)
}

/// Module rejections carry the error's debug form as data.
pub fn call_rejected(err: &ModuleError) -> ErrorObjectOwned {
    ErrorObjectOwned::owned(CALL_REJECTED, err.to_string(), Some(format!("{err:?}")))
}

/// Parse a 20-byte hex address, with or without `0x`.
pub fn parse_address(s: &str) -> Result<Address, ErrorObjectOwned> {
    let bytes = hex::decode(s.trim_start_matches("0x"))
        .map_err(|e| invalid_params(format!("invalid address hex: {e}")))?;
    bytes
        .try_into()
        .map_err(|_| invalid_params("address must be 20 bytes"))
}

pub fn encode_address(address: &Address) -> String {
    format!("0x{}", hex::encode(address))
}

/// Decode a hex-encoded borsh `ModuleCall`.
pub fn decode_call(s: &str) -> Result<ModuleCall, ErrorObjectOwned> {
    let bytes = hex::decode(s.trim_start_matches("0x"))
        .map_err(|e| invalid_params(format!("invalid call hex: {e}")))?;
    borsh::from_slice(&bytes).map_err(|e| invalid_params(format!("invalid call encoding: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address() {
        let address = parse_address("0x0101010101010101010101010101010101010101").unwrap();
        assert_eq!(address, [1u8; 20]);
        assert_eq!(encode_address(&address), "0x0101010101010101010101010101010101010101");

        assert!(parse_address("0x01").is_err());
        assert!(parse_address("zz").is_err());
    }

    #[test]
    fn test_decode_call() {
        let call = ModuleCall::SubmitGpkj {
            gpkj: Default::default(),
        };
        let encoded = hex::encode(borsh::to_vec(&call).unwrap());
        assert_eq!(decode_call(&encoded).unwrap(), call);
        assert!(decode_call("ff").is_err());
    }
}
