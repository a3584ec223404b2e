/// One-time email verification codes
///
/// Codes are six decimal digits (100000-999999) and live for ten minutes.
/// Only a SHA-256 digest of the code, salted with the address it was sent
/// to, is persisted.

use chrono::Duration;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Number of digits in a verification code
pub const CODE_LENGTH: usize = 6;

/// How long a code stays valid
pub fn code_ttl() -> Duration {
    Duration::minutes(10)
}

/// Generates a fresh six-digit code
pub fn generate_code() -> String {
    let code: u32 = rand::thread_rng().gen_range(100_000..=999_999);
    code.to_string()
}

/// Digest stored in place of the plaintext code
pub fn hash_code(email: &str, code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(email.as_bytes());
    hasher.update(b":");
    hasher.update(code.as_bytes());
    hex::encode(hasher.finalize())
}

/// Cheap shape check run before hitting the database
pub fn is_well_formed(code: &str) -> bool {
    code.len() == CODE_LENGTH && code.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_codes_are_six_digits() {
        for _ in 0..200 {
            let code = generate_code();
            assert!(is_well_formed(&code), "bad code {code}");
            let value: u32 = code.parse().unwrap();
            assert!((100_000..=999_999).contains(&value));
        }
    }

    #[test]
    fn test_hash_is_bound_to_email() {
        let a = hash_code("a@example.com", "123456");
        let b = hash_code("b@example.com", "123456");
        assert_ne!(a, b);
        assert_eq!(a, hash_code("a@example.com", "123456"));
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_well_formed() {
        assert!(is_well_formed("000123"));
        assert!(!is_well_formed("12345"));
        assert!(!is_well_formed("1234567"));
        assert!(!is_well_formed("12a456"));
    }

    #[test]
    fn test_ttl_is_ten_minutes() {
        assert_eq!(code_ttl().num_minutes(), 10);
    }
}
