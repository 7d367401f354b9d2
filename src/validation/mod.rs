//! Syntactic checks applied before a request reaches storage.

use regex::Regex;
use std::sync::LazyLock;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321 path limit
const MAX_LOCAL_PART_LENGTH: usize = 64;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?(\.[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
    )
    .expect("email pattern is valid")
});

/// Whether `email` has the shape of a mailbox address.
///
/// Says nothing about deliverability or whether the address is already registered.
pub fn is_valid_email(email: &str) -> bool {
    if email.is_empty() || email.len() > MAX_EMAIL_LENGTH {
        return false;
    }

    match email.rsplit_once('@') {
        Some((local, _)) if local.len() <= MAX_LOCAL_PART_LENGTH => EMAIL_REGEX.is_match(email),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_addresses() {
        assert!(is_valid_email("alice@example.com"));
        assert!(is_valid_email("user.name+tag@example.co.uk"));
        assert!(is_valid_email("o'brien@mail-server.example.org"));
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("alice.example.com"));
        assert!(!is_valid_email("alice@"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("alice@example"));
        assert!(!is_valid_email("alice@@example.com"));
        assert!(!is_valid_email(".alice@example.com"));
        assert!(!is_valid_email("alice..smith@example.com"));
        assert!(!is_valid_email("alice@-example.com"));
        assert!(!is_valid_email("alice smith@example.com"));
    }

    #[test]
    fn enforces_length_limits() {
        let local = "a".repeat(65);
        assert!(!is_valid_email(&format!("{local}@example.com")));

        let label = "b".repeat(60);
        let long = format!("alice@{label}.{label}.{label}.{label}.{label}.com");
        assert!(long.len() > MAX_EMAIL_LENGTH);
        assert!(!is_valid_email(&long));
    }
}
