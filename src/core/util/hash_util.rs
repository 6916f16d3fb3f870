use std::collections::BTreeMap;

use k8s_openapi::ByteString;
use sha2::{Digest, Sha256};

/// Stable hash of string-valued object data (keys are visited in sorted order).
pub fn hash_string_data(data: &BTreeMap<String, String>) -> String {
    let mut hasher = Sha256::new();
    for (key, value) in data {
        feed(&mut hasher, key.as_bytes());
        feed(&mut hasher, value.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Stable hash of binary object data, e.g. secret contents.
pub fn hash_binary_data(data: &BTreeMap<String, ByteString>) -> String {
    let mut hasher = Sha256::new();
    for (key, value) in data {
        feed(&mut hasher, key.as_bytes());
        feed(&mut hasher, &value.0);
    }
    hex::encode(hasher.finalize())
}

// Length-prefixed so that ("ab", "c") and ("a", "bc") differ.
fn feed(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_be_bytes());
    hasher.update(bytes);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_order_independent_and_boundary_safe() {
        let mut a = BTreeMap::new();
        a.insert("x".to_string(), "1".to_string());
        a.insert("y".to_string(), "2".to_string());

        let mut b = BTreeMap::new();
        b.insert("y".to_string(), "2".to_string());
        b.insert("x".to_string(), "1".to_string());
        assert_eq!(hash_string_data(&a), hash_string_data(&b));

        let mut c = BTreeMap::new();
        c.insert("ab".to_string(), "c".to_string());
        let mut d = BTreeMap::new();
        d.insert("a".to_string(), "bc".to_string());
        assert_ne!(hash_string_data(&c), hash_string_data(&d));
    }

    #[test]
    fn binary_hash_changes_with_content() {
        let mut secret = BTreeMap::new();
        secret.insert("credentials".to_string(), ByteString(b"one".to_vec()));
        let before = hash_binary_data(&secret);

        secret.insert("credentials".to_string(), ByteString(b"two".to_vec()));
        assert_ne!(before, hash_binary_data(&secret));
        assert_eq!(before.len(), 64);
    }
}
