//! Cryptographic key types for node identity and signing.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A 32-byte Ed25519 public key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey(pub [u8; 32]);

/// A 32-byte Ed25519 private key (secret scalar).
///
/// This type intentionally does not implement `Debug`, `Serialize`, or `Clone`
/// to prevent accidental exposure. Key bytes are zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey(pub [u8; 32]);

/// A 64-byte Ed25519 signature.
#[derive(Clone, PartialEq, Eq)]
pub struct Signature(pub [u8; 64]);

// Signatures ride the wire as length-prefixed byte strings (the witness
// field of an input, the trailing field of a queue beacon). Serde has no
// built-in [u8; 64] support at that layout, so both directions are spelled
// out: emit the raw bytes, and on the way in accept either a borrowed byte
// string or a byte sequence, insisting on exactly 64 bytes.
impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.0)
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct WitnessBytes;

        impl<'de> serde::de::Visitor<'de> for WitnessBytes {
            type Value = [u8; 64];

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a 64-byte witness signature")
            }

            fn visit_bytes<E: serde::de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
                v.try_into().map_err(|_| E::invalid_length(v.len(), &self))
            }

            fn visit_seq<A: serde::de::SeqAccess<'de>>(
                self,
                mut seq: A,
            ) -> Result<Self::Value, A::Error> {
                let mut bytes = [0u8; 64];
                let mut filled = 0usize;
                while let Some(byte) = seq.next_element::<u8>()? {
                    if filled == bytes.len() {
                        return Err(serde::de::Error::invalid_length(filled + 1, &self));
                    }
                    bytes[filled] = byte;
                    filled += 1;
                }
                if filled != bytes.len() {
                    return Err(serde::de::Error::invalid_length(filled, &self));
                }
                Ok(bytes)
            }
        }

        deserializer.deserialize_bytes(WitnessBytes).map(Signature)
    }
}

impl Signature {
    /// The all-zero placeholder signature of an unsigned message.
    pub const EMPTY: Self = Self([0u8; 64]);

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Signature(")?;
        for b in &self.0[..4] {
            write!(f, "{:02x}", b)?;
        }
        write!(f, "..)")
    }
}

impl PublicKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// An Ed25519 key pair (public + private).
///
/// Use `tumbler_crypto::generate_keypair()` or
/// `tumbler_crypto::keypair_from_seed()` to construct key pairs.
/// This struct is intentionally just data.
pub struct KeyPair {
    pub public: PublicKey,
    pub private: PrivateKey,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_roundtrips_through_bincode() {
        let mut bytes = [0u8; 64];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = i as u8;
        }
        let sig = Signature(bytes);
        let encoded = bincode::serialize(&sig).unwrap();
        let decoded: Signature = bincode::deserialize(&encoded).unwrap();
        assert_eq!(decoded, sig);
    }

    #[test]
    fn truncated_signature_bytes_are_rejected() {
        let sig = Signature([7u8; 64]);
        let encoded = bincode::serialize(&sig).unwrap();
        assert!(bincode::deserialize::<Signature>(&encoded[..encoded.len() - 1]).is_err());
    }

    #[test]
    fn empty_signature_is_the_zero_witness() {
        assert_eq!(Signature::EMPTY.as_bytes(), &[0u8; 64]);
    }
}
