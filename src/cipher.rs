//! Password encryption for the login form.
//!
//! When the login page carries a non-blank salt the portal expects the
//! password to be AES-CBC encrypted with that salt as the raw key. The
//! plaintext is a random 64 character prefix followed by the password and
//! the IV is another random 16 character string, both drawn from
//! [`ALPHABET`].

use aes::{Aes128, Aes192, Aes256};
use block_modes::{block_padding::Pkcs7, BlockMode, Cbc, InvalidKeyIvLength};
use rand::{
    distributions::{Distribution, Uniform},
    rngs::{OsRng, StdRng},
    Rng, SeedableRng,
};

/// The characters random prefixes and IVs are drawn from. Visually ambiguous
/// characters (`0`, `O`, `1`, `l`, ...) are left out.
pub const ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTWXYZabcdefhijkmnprstwxyz2345678";

/// The AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

const PREFIX_LEN: usize = 64;
const IV_LEN: usize = BLOCK_SIZE;

/// Encrypt `password` with the server-supplied `salt`, falling back to the
/// plaintext password if encryption isn't possible.
///
/// A fallback is logged as a warning.
pub fn encrypt(password: &str, salt: &str) -> String {
    match try_encrypt(password, salt) {
        Encryption::Plain(password) => password,
        Encryption::Encrypted(ciphertext) => ciphertext,
        Encryption::Fallback { password, reason } => {
            log::warn!(
                "Unable to encrypt the password, submitting it unencrypted: {}",
                reason
            );
            password
        },
    }
}

/// Encrypt `password` with `salt`, reporting exactly what happened.
pub fn try_encrypt(password: &str, salt: &str) -> Encryption {
    let salt = salt.trim();

    if salt.is_empty() {
        return Encryption::Plain(password.to_string());
    }

    match encrypt_with_fresh_randomness(password, salt) {
        Ok(ciphertext) => Encryption::Encrypted(ciphertext),
        Err(reason) => Encryption::Fallback {
            password: password.to_string(),
            reason,
        },
    }
}

fn encrypt_with_fresh_randomness(
    password: &str,
    salt: &str,
) -> Result<String, CipherError> {
    let mut rng = StdRng::from_rng(OsRng)?;

    let prefix = random_string(&mut rng, PREFIX_LEN, ALPHABET);
    let iv = random_string(&mut rng, IV_LEN, ALPHABET);

    let mut plaintext = prefix;
    plaintext.push_str(password);

    let ciphertext =
        aes_cbc_encrypt(plaintext.as_bytes(), salt.as_bytes(), iv.as_bytes())?;

    Ok(base64::encode(&ciphertext))
}

/// Generate a string of `length` characters picked uniformly from
/// `alphabet`.
///
/// `alphabet` must be non-empty ASCII.
pub fn random_string<R: Rng + ?Sized>(
    rng: &mut R,
    length: usize,
    alphabet: &[u8],
) -> String {
    if alphabet.is_empty() {
        return String::new();
    }

    let index = Uniform::from(0..alphabet.len());

    (0..length)
        .map(|_| char::from(alphabet[index.sample(rng)]))
        .collect()
}

/// AES-CBC with PKCS#7 padding, picking the key size from the key's length.
fn aes_cbc_encrypt(
    plaintext: &[u8],
    key: &[u8],
    iv: &[u8],
) -> Result<Vec<u8>, CipherError> {
    let ciphertext = match key.len() {
        16 => Cbc::<Aes128, Pkcs7>::new_from_slices(key, iv)?
            .encrypt_vec(plaintext),
        24 => Cbc::<Aes192, Pkcs7>::new_from_slices(key, iv)?
            .encrypt_vec(plaintext),
        32 => Cbc::<Aes256, Pkcs7>::new_from_slices(key, iv)?
            .encrypt_vec(plaintext),
        other => return Err(CipherError::InvalidKeyLength(other)),
    };

    Ok(ciphertext)
}

/// The result of [`try_encrypt()`].
#[derive(Debug)]
pub enum Encryption {
    /// The salt was blank so the server wants the password as-is.
    Plain(String),
    /// The base64-encoded ciphertext.
    Encrypted(String),
    /// Encryption failed and the plaintext password should be used instead.
    Fallback { password: String, reason: CipherError },
}

impl Encryption {
    /// The value to put in the login form's `password` field.
    pub fn into_password(self) -> String {
        match self {
            Encryption::Plain(p)
            | Encryption::Encrypted(p)
            | Encryption::Fallback { password: p, .. } => p,
        }
    }
}

/// Reasons password encryption may fail.
#[derive(Debug, thiserror::Error)]
pub enum CipherError {
    #[error("Unable to seed the random number generator")]
    Randomness(#[from] rand::Error),
    #[error("The salt is {0} bytes long, expected 16, 24 or 32")]
    InvalidKeyLength(usize),
    #[error("Invalid key or IV length")]
    InvalidKeyIv(#[from] InvalidKeyIvLength),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    const SALT: &str = "rjaXQkmMhJcDnEpN";

    #[test]
    fn blank_salt_leaves_the_password_alone() {
        for salt in &["", " ", "\t\n  "] {
            assert_eq!(encrypt("hunter2", salt), "hunter2");
        }
    }

    #[test]
    fn encrypted_password_is_base64_of_whole_blocks() {
        let password = "My Super Secret Password!";

        let got = encrypt(password, SALT);

        let raw = base64::decode(&got).unwrap();
        assert!(!raw.is_empty());
        assert_eq!(raw.len() % BLOCK_SIZE, 0);
        // 64 byte prefix + 25 byte password, padded up to the next block
        assert_eq!(raw.len(), 96);
    }

    #[test]
    fn salt_is_trimmed_before_use() {
        let got = try_encrypt("password", &format!("  {}\n", SALT));

        assert!(matches!(got, Encryption::Encrypted(_)));
    }

    #[test]
    fn encryption_is_not_deterministic() {
        let first = encrypt("password", SALT);
        let second = encrypt("password", SALT);

        assert_ne!(first, second);
    }

    #[test]
    fn larger_keys_select_larger_ciphers() {
        let salt = "0123456789abcdef0123456789abcdef";

        let got = try_encrypt("password", salt);

        assert!(matches!(got, Encryption::Encrypted(_)));
    }

    #[test]
    fn bad_key_length_falls_back_to_plaintext() {
        let got = try_encrypt("password", "short");

        match got {
            Encryption::Fallback { password, reason } => {
                assert_eq!(password, "password");
                assert!(matches!(reason, CipherError::InvalidKeyLength(5)));
            },
            other => panic!("Expected a fallback, found {:?}", other),
        }
        assert_eq!(encrypt("password", "short"), "password");
    }

    #[test]
    fn random_strings_only_use_the_alphabet() {
        let mut rng = StdRng::seed_from_u64(42);

        let got = random_string(&mut rng, 64, ALPHABET);

        assert_eq!(got.len(), 64);
        assert!(got.bytes().all(|b| ALPHABET.contains(&b)));
    }

    #[test]
    fn random_string_with_a_single_letter_alphabet() {
        let mut rng = StepRng::new(0, 1);

        let got = random_string(&mut rng, 5, b"x");

        assert_eq!(got, "xxxxx");
    }
}
