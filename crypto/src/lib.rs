//! Cryptographic primitives for the tumbler protocol: Blake2b hashing,
//! Ed25519 key management, and message signing.

pub mod hash;
pub mod keys;
pub mod sign;

pub use hash::{blake2b_256, blake2b_256_multi, hash_transaction, input_signing_digest};
pub use keys::{generate_keypair, keypair_from_seed, public_from_private};
pub use sign::{sign_message, verify_signature};
