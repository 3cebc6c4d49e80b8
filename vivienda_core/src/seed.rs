//! Seed derivation from a public beacon value and an operator secret.
//!
//! The seed is `HMAC-SHA3-512(key = secret, message = pulse output)`. Anyone
//! holding both inputs recomputes the same 64 bytes, which in turn fix every
//! draw of the selection run.

use std::fmt;

use blake3::Hasher;
use hmac::{Hmac, Mac};
use sha3::Sha3_512;
use zeroize::{Zeroize, Zeroizing};

use crate::error::{Result, SelectionError};

pub const SEED_BYTES: usize = 64;
const FINGERPRINT_LABEL: &[u8] = b"vivienda::seed-fingerprint";

type HmacSha3_512 = Hmac<Sha3_512>;

/// Digest that configures the selection stream for one run.
#[derive(Clone, PartialEq, Eq)]
pub struct Seed([u8; SEED_BYTES]);

impl Seed {
    pub fn from_bytes(bytes: [u8; SEED_BYTES]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SEED_BYTES] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// BLAKE3 tag of the seed, safe to publish before the secret is revealed.
    pub fn fingerprint(&self) -> [u8; 32] {
        let mut hasher = Hasher::new();
        hasher.update(FINGERPRINT_LABEL);
        hasher.update(&self.0);
        *hasher.finalize().as_bytes()
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Seed")
            .field(&hex::encode(&self.fingerprint()[..8]))
            .finish()
    }
}

impl Drop for Seed {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Decodes a hex field, accepting either case and surrounding whitespace.
pub fn decode_hex(field: &str, value: &str) -> Result<Vec<u8>> {
    hex::decode(value.trim())
        .map_err(|err| SelectionError::invalid(format!("{field} is not valid hex: {err}")))
}

/// Derives the run seed from the hex-encoded pulse output and secret.
pub fn derive_seed(public_hex: &str, private_hex: &str) -> Result<Seed> {
    let public = decode_hex("public random value", public_hex)?;
    let private = Zeroizing::new(decode_hex("secret", private_hex)?);
    derive_seed_from_bytes(&public, &private)
}

pub fn derive_seed_from_bytes(public: &[u8], private: &[u8]) -> Result<Seed> {
    let mut mac = <HmacSha3_512 as Mac>::new_from_slice(private)
        .map_err(|err| SelectionError::invalid(format!("secret rejected as HMAC key: {err}")))?;
    mac.update(public);
    let digest = mac.finalize().into_bytes();
    let mut bytes = [0u8; SEED_BYTES];
    bytes.copy_from_slice(&digest);
    Ok(Seed(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHA3_512_BLOCK: usize = 72;

    const PULSE: &str = "efb173055770e9f5f568dd560d0aab9f676feead9dee9e98db6b0e7818434286\
                         c33eba482ca5535ce98a389c459238f031c70adcdf1c3f80181d2d329c17c66e";

    #[test]
    fn same_inputs_same_seed() {
        let a = derive_seed(PULSE, "deadbeef").unwrap();
        let b = derive_seed(PULSE, "deadbeef").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn secret_changes_seed() {
        let a = derive_seed(PULSE, "").unwrap();
        let b = derive_seed(PULSE, "01").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn zero_padded_secrets_are_the_same_key() {
        // HMAC pads short keys with zeros up to the block size.
        let empty = derive_seed(PULSE, "").unwrap();
        for secret in ["00", "0000", "00".repeat(SHA3_512_BLOCK).as_str()] {
            assert_eq!(derive_seed(PULSE, secret).unwrap(), empty, "secret {secret:?}");
        }
        assert_eq!(
            derive_seed(PULSE, "ab").unwrap(),
            derive_seed(PULSE, "ab00").unwrap()
        );
        let hashed = "00".repeat(SHA3_512_BLOCK + 1);
        assert_ne!(derive_seed(PULSE, &hashed).unwrap(), empty);
    }

    #[test]
    fn hex_case_and_padding_are_ignored() {
        let lower = derive_seed(PULSE, "deadbeef").unwrap();
        let upper = derive_seed(&PULSE.to_uppercase(), "  DEADBEEF\n").unwrap();
        assert_eq!(lower, upper);
    }

    #[test]
    fn malformed_hex_rejected() {
        let odd = derive_seed(PULSE, "abc").unwrap_err();
        assert!(matches!(odd, SelectionError::InvalidInput(_)));
        let bad_digit = derive_seed("zz", "").unwrap_err();
        assert!(matches!(bad_digit, SelectionError::InvalidInput(_)));
    }

    #[test]
    fn debug_output_hides_seed() {
        let seed = derive_seed(PULSE, "deadbeef").unwrap();
        let rendered = format!("{seed:?}");
        assert!(!rendered.contains(&seed.to_hex()));
        assert_eq!(rendered.len(), "Seed(\"\")".len() + 16);
    }
}
