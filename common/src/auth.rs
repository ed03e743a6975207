use base64::{engine::general_purpose, Engine as _};
use hmac::Hmac;
use pbkdf2::pbkdf2;
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

const PBKDF2_ROUNDS: u32 = 600_000;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct User {
    pub username: String,
    pub password_hash: String, // Base64 encoded
    pub salt: String,          // Base64 encoded
}

pub fn hash_password(password: &str) -> (String, String) {
    let mut salt = [0u8; 16];
    OsRng.fill_bytes(&mut salt);
    let salt_b64 = general_purpose::STANDARD.encode(salt);

    let mut dk = [0u8; 32];
    pbkdf2::<Hmac<Sha256>>(password.as_bytes(), &salt, PBKDF2_ROUNDS, &mut dk)
        .expect("HMAC should not fail");
    let hash_b64 = general_purpose::STANDARD.encode(dk);

    (hash_b64, salt_b64)
}

pub fn verify_password(password: &str, hash: &str, salt: &str) -> bool {
    let salt_bytes = match general_purpose::STANDARD.decode(salt) {
        Ok(s) => s,
        Err(_) => return false,
    };

    let hash_bytes = match general_purpose::STANDARD.decode(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    let mut dk = [0u8; 32];
    pbkdf2::<Hmac<Sha256>>(password.as_bytes(), &salt_bytes, PBKDF2_ROUNDS, &mut dk)
        .expect("HMAC should not fail");

    // Constant time comparison
    dk.ct_eq(&hash_bytes).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_roundtrip() {
        let (hash, salt) = hash_password("hunter2");
        assert!(verify_password("hunter2", &hash, &salt));
        assert!(!verify_password("hunter3", &hash, &salt));
    }

    #[test]
    fn verify_rejects_malformed_encoding() {
        assert!(!verify_password("hunter2", "not base64!", "also not"));
    }
}
