use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;

/// Hex chars kept from the SHA-256 digest.
const FINGERPRINT_LEN: usize = 32;

/// Content-derived cache key for a question.
///
/// Only the question text feeds the fingerprint: the same question asked from
/// any session resolves to the same cached answer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Rebuild from a stored key, rejecting anything that is not a fingerprint.
    pub fn parse(raw: &str) -> Option<Self> {
        let valid = raw.len() == FINGERPRINT_LEN
            && raw.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        valid.then(|| Self(raw.to_string()))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Case-fold and collapse every whitespace run into one space.
pub fn normalize_question(question: &str) -> String {
    question
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn compute_key(question: &str) -> Fingerprint {
    let normalized = normalize_question(question);
    let digest = Sha256::digest(normalized.as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(FINGERPRINT_LEN);
    Fingerprint(hex)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_question() {
        assert_eq!(normalize_question("  Hello \t World\n"), "hello world");
        assert_eq!(normalize_question("¿Cuál es la TRM HOY?"), "¿cuál es la trm hoy?");
        assert_eq!(normalize_question("   "), "");
    }

    #[test]
    fn test_trivial_variants_collide() {
        assert_eq!(compute_key(" Hello  World "), compute_key("hello world"));
        assert_eq!(compute_key("HELLO\nworld"), compute_key("hello world"));
    }

    #[test]
    fn test_different_questions_differ() {
        assert_ne!(compute_key("hello world"), compute_key("hello world!"));
        assert_ne!(compute_key("helloworld"), compute_key("hello world"));
    }

    #[test]
    fn test_fingerprint_shape() {
        let key = compute_key("anything");
        assert_eq!(key.as_str().len(), FINGERPRINT_LEN);
        assert_eq!(Fingerprint::parse(key.as_str()), Some(key.clone()));
        assert_eq!(Fingerprint::parse("not-a-key"), None);
        assert_eq!(Fingerprint::parse(&key.as_str().to_uppercase()), None);
    }
}
