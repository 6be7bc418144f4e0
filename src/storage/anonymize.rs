//! Patient identifier anonymization.
//!
//! Every non-empty identifier is replaced by a fresh random token. Tokens are
//! drawn independently per write, so the same patient gets a different token
//! on every entry and nothing can be joined back to the original value.

use rand::Rng;

/// Length of the replacement token.
pub const TOKEN_LEN: usize = 8;

const TOKEN_ALPHABET: &[u8] = b"0123456789abcdef";

/// Replace `patient_id` with a random token, or `None` if it is absent or empty.
pub fn anonymize_patient_id(patient_id: Option<&str>) -> Option<String> {
    match patient_id {
        Some(id) if !id.is_empty() => Some(loop {
            let token = random_token();
            if token != id {
                break token;
            }
        }),
        _ => None,
    }
}

fn random_token() -> String {
    let mut rng = rand::thread_rng();
    (0..TOKEN_LEN)
        .map(|_| TOKEN_ALPHABET[rng.gen_range(0..TOKEN_ALPHABET.len())] as char)
        .collect()
}
