pub mod login_history;
pub mod password_reset;
pub mod refresh_token;
pub mod user;

/// Generate an opaque token: 256 bits of randomness as a 64-char hex string.
#[must_use]
pub fn generate_hex_token() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; crate::constants::tokens::OPAQUE_TOKEN_BYTES] = rng.random();

    bytes.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_token_shape() {
        let token = generate_hex_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_hex_tokens_are_unique() {
        assert_ne!(generate_hex_token(), generate_hex_token());
    }
}
