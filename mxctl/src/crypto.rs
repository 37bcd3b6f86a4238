use base64::{Engine as _, engine::general_purpose};
use rand::{Rng, thread_rng};

/// Generates a cryptographically secure API key with 256 bits of entropy.
///
/// The key is formatted as `mx-{base64url_encoded_random_bytes}` where the
/// random bytes are 32 bytes (256 bits) of cryptographically secure random data.
pub fn generate_api_key() -> String {
    // Generate 32 bytes (256 bits) of cryptographically secure random data
    let mut key_bytes = [0u8; 32];
    thread_rng().fill(&mut key_bytes);

    format!("mx-{}", general_purpose::URL_SAFE_NO_PAD.encode(key_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_api_key_format() {
        let key = generate_api_key();

        // Should start with "mx-"
        assert!(key.starts_with("mx-"));

        // Should be correct length: "mx-" (3) + base64url(32 bytes) (43)
        assert_eq!(key.len(), 46);

        // Should only contain valid base64url characters after prefix
        let key_part = &key[3..];
        assert!(key_part.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_generate_api_key_uniqueness() {
        let mut keys = HashSet::new();

        // Generate 1000 keys and ensure they're all unique
        for _ in 0..1000 {
            let key = generate_api_key();
            assert!(keys.insert(key), "Generated duplicate API key");
        }
    }

    #[test]
    fn test_generate_api_key_no_padding() {
        let key = generate_api_key();

        // Should not contain padding characters
        assert!(!key.contains('='));
    }
}
