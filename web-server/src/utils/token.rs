// web-server/src/utils/token.rs
use rand::{thread_rng, Rng};
use rand::distributions::Alphanumeric;

/// Length of issued SIWE nonces
pub const NONCE_LENGTH: usize = 17;

/// Generate a cryptographically secure random alphanumeric token of specified length
pub fn generate_secure_token(length: usize) -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Generate a nonce suitable for the `Nonce` field of an EIP-4361 message
pub fn generate_nonce() -> String {
    generate_secure_token(NONCE_LENGTH)
}
