use sha3::{Digest, Sha3_256};
use uuid::Uuid;

pub fn get_sha3_256_hash(data: &str) -> String {
    hash_bytes(data.as_bytes())
}

pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha3_256::default();
    hasher.update(data);
    format!("{:X}", hasher.finalize())
}

/// Random bearer key for passwordless portal access.
pub fn new_access_key() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Compares two hex digests without short-circuiting on the first differing byte.
pub fn digest_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter()
        .zip(b)
        .fold(0u8, |acc, (x, y)| acc | (x.to_ascii_uppercase() ^ y.to_ascii_uppercase()))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha3_of_empty_input() {
        assert_eq!(
            get_sha3_256_hash(""),
            "A7FFC6F8BF1ED76651C14756A061D662F580FF4DE43B49FA82D80A4B80F8434A"
        );
    }

    #[test]
    fn access_keys_are_unique_hex() {
        let a = new_access_key();
        let b = new_access_key();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn digest_comparison_ignores_case() {
        assert!(digest_eq("abc1", "ABC1"));
        assert!(!digest_eq("abc1", "abc2"));
        assert!(!digest_eq("abc", "abc1"));
    }
}
