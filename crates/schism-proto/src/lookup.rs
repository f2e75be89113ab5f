//! Lookup key: the content-derived name of an issued certificate.
//!
//! LookupKey = hex(SHA-256(identity "," sorted principals joined by ",")).
//!
//! The key depends only on the identity and the membership of the principal
//! set. Certificate type, TTL and serial never contribute, so a verifier that
//! knows who it expects can locate the certificate without any issuance
//! metadata.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Separator placed between the identity and each sorted principal.
const SEPARATOR: &str = ",";

/// Lowercase hex SHA-256 digest addressing an issued certificate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LookupKey(String);

impl LookupKey {
    /// Derive the lookup key for an identity and its principals.
    ///
    /// Principals are sorted ascending by byte value before hashing, so any
    /// ordering of the same set yields the same key. An empty principal set
    /// hashes the identity alone.
    pub fn derive<S: AsRef<str>>(identity: &str, principals: &[S]) -> Self {
        let mut sorted: Vec<&str> = principals.iter().map(AsRef::as_ref).collect();
        sorted.sort_unstable();

        let mut hasher = Sha256::new();
        hasher.update(identity.as_bytes());
        for principal in sorted {
            hasher.update(SEPARATOR.as_bytes());
            hasher.update(principal.as_bytes());
        }

        Self(hex::encode(hasher.finalize()))
    }

    /// The hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LookupKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Derive the lookup key for `identity` and `principals`.
pub fn derive_lookup_key<S: AsRef<str>>(identity: &str, principals: &[S]) -> LookupKey {
    LookupKey::derive(identity, principals)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_reference_vector() {
        let key = derive_lookup_key("test.schism.example.com", &["test.schism.example.com"]);
        assert_eq!(
            key.as_str(),
            "73f386e91cac74186f60ba0aca0a410c234b3cfafb68f20541e4c5a828a1491b"
        );
    }

    #[test]
    fn user_reference_vector() {
        let key = derive_lookup_key("user@test.schism.example.com", &["user1", "app_user"]);
        assert_eq!(
            key.as_str(),
            "1d2206f7294dedac0c991bbf3656db48a7e93cc913c7e467c4c9d2d6149ab83c"
        );
    }

    #[test]
    fn matches_joined_string_digest() {
        let key = derive_lookup_key("id", &["b", "a"]);
        let expected = hex::encode(Sha256::digest(b"id,a,b"));
        assert_eq!(key.as_str(), expected);
    }

    #[test]
    fn empty_principals_hash_identity_only() {
        let key = derive_lookup_key::<&str>("lonely.example.com", &[]);
        let expected = hex::encode(Sha256::digest(b"lonely.example.com"));
        assert_eq!(key.as_str(), expected);
    }

    #[test]
    fn output_is_lowercase_hex() {
        let key = derive_lookup_key("h1", &["h1"]);
        assert_eq!(key.as_str().len(), 64);
        assert!(
            key.as_str()
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        );
    }

    #[test]
    fn sort_is_bytewise() {
        // Uppercase sorts before lowercase by byte value.
        let key = derive_lookup_key("id", &["b", "B", "a"]);
        let expected = hex::encode(Sha256::digest(b"id,B,a,b"));
        assert_eq!(key.as_str(), expected);
    }

    #[test]
    fn identity_changes_key() {
        assert_ne!(
            derive_lookup_key("a.example.com", &["x"]),
            derive_lookup_key("b.example.com", &["x"])
        );
    }

    mod proptests {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            /// Any permutation of the principal list produces the same key.
            #[test]
            fn invariant_under_permutation(
                identity in "[a-z0-9@.]{0,24}",
                principals in proptest::collection::vec("[a-zA-Z0-9_.-]{0,12}", 0..8),
                seed in any::<u64>(),
            ) {
                let mut shuffled = principals.clone();
                // Deterministic rotation + reversal driven by the seed.
                if !shuffled.is_empty() {
                    let len = shuffled.len();
                    shuffled.rotate_left((seed as usize) % len);
                }
                if seed % 2 == 0 {
                    shuffled.reverse();
                }

                prop_assert_eq!(
                    derive_lookup_key(&identity, &principals),
                    derive_lookup_key(&identity, &shuffled)
                );
            }
        }
    }
}
