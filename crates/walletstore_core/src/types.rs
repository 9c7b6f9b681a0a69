//! Core identifier and byte-container types.

use sha2::{Digest, Sha256};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

fn write_hex(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    for b in bytes {
        write!(f, "{b:02x}")?;
    }
    Ok(())
}

/// A 32-byte transaction hash.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TxId(pub [u8; 32]);

impl TxId {
    /// Creates a transaction id from raw hash bytes.
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the raw hash bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxId(")?;
        write_hex(f, &self.0)?;
        write!(f, ")")
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hex(f, &self.0)
    }
}

/// A 32-byte block hash.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockHash(pub [u8; 32]);

impl BlockHash {
    /// Creates a block hash from raw bytes.
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the raw hash bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockHash(")?;
        write_hex(f, &self.0)?;
        write!(f, ")")
    }
}

/// A 20-byte key fingerprint identifying a public key.
///
/// Derived by double-SHA-256 of the serialized public key, truncated to
/// 20 bytes. The all-zero id marks "no key".
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyId(pub [u8; 20]);

impl KeyId {
    /// The null id, used where no master key has been set.
    pub const ZERO: Self = Self([0u8; 20]);

    /// Creates a key id from raw fingerprint bytes.
    #[must_use]
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Computes the fingerprint of a serialized public key.
    #[must_use]
    pub fn from_pub_key(pub_key: &PubKey) -> Self {
        let first = Sha256::digest(pub_key.as_bytes());
        let second = Sha256::digest(first);
        let mut id = [0u8; 20];
        id.copy_from_slice(&second[..20]);
        Self(id)
    }

    /// Returns the raw fingerprint bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Returns `true` if this is the null id.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl fmt::Debug for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyId(")?;
        write_hex(f, &self.0)?;
        write!(f, ")")
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hex(f, &self.0)
    }
}

/// A 20-byte script hash keying a stored redeem script.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScriptId(pub [u8; 20]);

impl ScriptId {
    /// Creates a script id from raw hash bytes.
    #[must_use]
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Returns the raw hash bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Debug for ScriptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScriptId(")?;
        write_hex(f, &self.0)?;
        write!(f, ")")
    }
}

/// A serialized public key.
///
/// Opaque to the store; length varies with the key encoding (compressed
/// or uncompressed).
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PubKey(Vec<u8>);

impl PubKey {
    /// Creates a public key from serialized bytes.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Returns the serialized bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the fingerprint of this key.
    #[must_use]
    pub fn id(&self) -> KeyId {
        KeyId::from_pub_key(self)
    }
}

impl fmt::Debug for PubKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PubKey(")?;
        write_hex(f, &self.0)?;
        write!(f, ")")
    }
}

/// Private key material, zeroized on drop.
///
/// Holds plaintext secret bytes while they pass between the caller and the
/// engine. The container wipes itself when dropped and redacts its
/// contents from `Debug` output.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecretBytes(Vec<u8>);

impl SecretBytes {
    /// Creates a secret container from raw bytes.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Returns the secret bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the length of the secret.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the container is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretBytes({} bytes)", self.0.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_id_is_deterministic() {
        let pub_key = PubKey::new(vec![0x02; 33]);
        assert_eq!(KeyId::from_pub_key(&pub_key), pub_key.id());
    }

    #[test]
    fn key_id_distinguishes_keys() {
        let a = PubKey::new(vec![0x02; 33]);
        let b = PubKey::new(vec![0x03; 33]);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn zero_key_id() {
        assert!(KeyId::ZERO.is_zero());
        assert!(!KeyId::new([1u8; 20]).is_zero());
    }

    #[test]
    fn txid_display_is_hex() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0xAB;
        assert!(TxId::new(bytes).to_string().starts_with("ab00"));
    }

    #[test]
    fn secret_bytes_debug_is_redacted() {
        let secret = SecretBytes::new(vec![1, 2, 3]);
        let printed = format!("{secret:?}");
        assert_eq!(printed, "SecretBytes(3 bytes)");
    }
}
