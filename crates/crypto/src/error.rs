//! Error types for cryptographic operations.

use thiserror::Error;

/// Errors that can occur during cryptographic operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("Invalid G1 point encoding")]
    InvalidG1Point,

    #[error("Invalid G2 point encoding")]
    InvalidG2Point,

    #[error("Point is zero or the identity")]
    ZeroPoint,

    #[error("Invalid scalar encoding")]
    InvalidScalar,

    #[error("DLEQ proof verification failed")]
    DleqVerificationFailed,

    #[error("Signature verification failed")]
    SignatureVerificationFailed,

    #[error("Insufficient threshold shares: need {required}, got {got}")]
    InsufficientShares { required: usize, got: usize },

    #[error("Invalid share index")]
    InvalidShareIndex,

    #[error("Duplicate share index")]
    DuplicateShareIndex,

    #[error("Lagrange interpolation failed")]
    LagrangeInterpolationFailed,

    #[error("Key derivation failed")]
    KeyDerivationFailed,
}
