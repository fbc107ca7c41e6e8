use md5::{Digest, Md5};

const GRAVATAR_BASE: &str = "https://www.gravatar.com/avatar/";

pub fn avatar_url(email: &str, size: u32) -> String {
    let mut hasher = Md5::new();
    hasher.update(email.to_lowercase().as_bytes());
    let digest = hasher.finalize();
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    format!("{}{}?d=identicon&s={}", GRAVATAR_BASE, hex, size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn avatar() {
        assert_eq!(
            avatar_url("john@example.com", 128),
            "https://www.gravatar.com/avatar/d4c74594d841139328695756648b6bd6?d=identicon&s=128"
        );
    }

    #[test]
    fn avatar_ignores_email_case() {
        assert_eq!(avatar_url("John@Example.COM", 36), avatar_url("john@example.com", 36));
    }

    #[test]
    fn avatar_hashes_the_address_as_given() {
        assert_ne!(avatar_url(" john@example.com", 36), avatar_url("john@example.com", 36));
    }
}
