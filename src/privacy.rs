use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of a client address.
pub fn hash_address(address: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(address.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// The first `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_address() {
        let hash = hash_address("127.0.0.1");
        assert_eq!(hash.len(), 64);
        assert_eq!(
            hash,
            "12ca17b49af2289436f303e0166030a21e525d266e209267433801a8fd4071a0"
        );
        assert_ne!(hash, hash_address("127.0.0.2"));
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("Mozilla/5.0", 7), "Mozilla");
        assert_eq!(truncate_chars("short", 50), "short");
        assert_eq!(truncate_chars("ééé", 2), "éé");
        assert_eq!(truncate_chars("", 3), "");
    }
}
