use std::sync::OnceLock;

use regex::Regex;

/// Loose shape check: something@something.tld, no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());
    re.is_match(email.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_email() {
        assert!(is_valid_email("ana@example.com"));
        assert!(is_valid_email(" ana.maria+filmes@mail.com.br "));
        assert!(!is_valid_email("ana@example"));
        assert!(!is_valid_email("ana example@mail.com"));
        assert!(!is_valid_email(""));
    }
}
