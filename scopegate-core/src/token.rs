//! Random token generation

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Length of generated root tokens
pub const TOKEN_LENGTH: usize = 64;

/// Generate a random alphanumeric token of `len` characters
pub fn random_alphanumeric(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Generate a root-format token
pub fn generate_token() -> String {
    random_alphanumeric(TOKEN_LENGTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_shape() {
        let token = generate_token();
        assert_eq!(token.len(), TOKEN_LENGTH);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(token, generate_token());
    }
}
