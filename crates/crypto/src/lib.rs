//! Cryptographic primitives for ETHDKG on BLS12-381.
//!
//! The on-chain module treats everything here as a trusted primitive with an
//! ok-or-fail contract:
//!
//! - **Points**: compressed encodings, validation, hashing to G1 and the
//!   second G1 generator `H1` used by key shares.
//! - **DLEQ**: Chaum-Pedersen proofs that two points share a discrete log.
//!   Key-share correctness proofs and shared-key proofs both use them.
//! - **Shares**: Diffie-Hellman shared keys, share encryption and Feldman
//!   verification of a share against a dealer's commitments.
//! - **BLS**: the pairing equations checked for key shares, the master public
//!   key and GPKJ values, plus group signatures over snapshot claims.

pub mod bls;
pub mod curve;
pub mod dleq;
pub mod error;
pub mod shares;

pub use bls::{aggregate_signatures, sign, verify_gpkj, verify_key_share_pair, verify_signature};
pub use curve::{compress_g1, compress_g2, decode_g1, decode_g2, h1, hash_to_g1, random_scalar};
pub use dleq::{prove_dleq, verify_dleq};
pub use error::CryptoError;
pub use shares::{decrypt_share, encrypt_share, evaluate_commitments, shared_key, share_position, verify_share};
