use bcrypt::{hash, verify};

use crate::error::AppError;

const HASH_COST: u32 = 10;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    hash(password, HASH_COST).map_err(|e| AppError::system_exception(format!("hash failed: {}", e)))
}

/// A missing or unparsable hash never matches.
pub fn check_password(password_hash: Option<&str>, password: &str) -> bool {
    match password_hash {
        Some(h) if !h.is_empty() => verify(password, h).unwrap_or(false),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hashing() {
        let hashed = hash_password("cat").unwrap();
        assert_ne!(hashed, "cat");
        assert!(!check_password(Some(&hashed), "dog"));
        assert!(check_password(Some(&hashed), "cat"));
    }

    #[test]
    fn unset_or_garbage_hash_never_matches() {
        assert!(!check_password(None, "cat"));
        assert!(!check_password(Some(""), ""));
        assert!(!check_password(Some("not-a-bcrypt-hash"), "cat"));
    }

    #[test]
    fn same_password_hashes_differently() {
        let a = hash_password("cat").unwrap();
        let b = hash_password("cat").unwrap();
        assert_ne!(a, b);
        assert!(check_password(Some(&b), "cat"));
    }
}
