use aes::Aes256;
use fpe::ff1::{BinaryNumeralString, FF1};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

use crate::config::HasherConfig;

type HmacSha256 = Hmac<Sha256>;

/// Reason an encrypted token was rejected.
///
/// Converters turn these into the lenient pass-through result; they are
/// only surfaced for logging and tests.
#[derive(Debug, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("Decoding string failed")]
    DecodingFailed,
    #[error("FF1 decryption failed")]
    DecryptionFailed,
    #[error("Incorrect MAC")]
    IncorrectMac,
    #[error("Invalid data length")]
    InvalidDataLength,
    #[error("Sentinel byte was {received}, expected {expected}")]
    SentinelMismatch { received: u8, expected: u8 },
}

impl From<base62::DecodeError> for CodecError {
    fn from(_: base62::DecodeError) -> CodecError {
        CodecError::DecodingFailed
    }
}

// Maximum number of bytes we can base62 encode (an u128).
const MAX_BUFFER: usize = 16;

// The sentinel byte, in case we don't fill the full 16 bytes.
const SENTINEL: u8 = 1;

/// Keyed encoder/decoder for single integers.
///
/// The number is encrypted with FF1 over AES-256, followed by a truncated
/// HMAC-SHA256 of the ciphertext, and the bytes are base62 encoded. Unlike
/// hashids tokens, tampered or forged tokens are rejected.
pub struct Codec {
    ff1: FF1<Aes256>,
    hmac: HmacSha256,
    hmac_length: usize,
    zero_pad_length: usize,
}

impl Codec {
    /// Creates a codec for the hasher `name`.
    ///
    /// The hasher's salt is the master key; `name` separates the keys of
    /// hashers sharing a salt, so their tokens are not interchangeable.
    pub fn new(name: &str, config: &HasherConfig) -> Codec {
        let hkdf = Hkdf::<Sha256>::new(None, config.salt.as_bytes());
        let mut ff1_key = [0u8; 32];
        let mut hmac_key = [0u8; 32];
        hkdf.expand(format!("{}/ff1", name).as_bytes(), &mut ff1_key)
            .expect("Length 32 should be valid");
        hkdf.expand(format!("{}/hmac", name).as_bytes(), &mut hmac_key)
            .expect("Length 32 should be valid");
        Codec {
            ff1: FF1::<Aes256>::new(&ff1_key, 2).expect("Radix 2 should be valid"),
            hmac: HmacSha256::new_from_slice(&hmac_key).expect("Key length 32 should be valid"),
            hmac_length: config.hmac_length as usize,
            zero_pad_length: config.zero_pad_length as usize,
        }
    }

    /// Encrypts `num` and encodes it as a base62 string.
    pub fn encode(&self, num: u64) -> String {
        let bytes = self.encrypt(num);
        let mut num_array = [0u8; MAX_BUFFER];
        num_array[..bytes.len()].copy_from_slice(&bytes);
        if bytes.len() < num_array.len() {
            num_array[bytes.len()] = SENTINEL;
        }
        base62::encode(u128::from_le_bytes(num_array))
    }

    /// Decodes a string produced by [`Codec::encode`] with the same key.
    pub fn decode(&self, encoded: &str) -> Result<u64, CodecError> {
        let num = base62::decode(encoded)?;
        let num_array = num.to_le_bytes();

        let length = if self.hmac_length + self.zero_pad_length < MAX_BUFFER {
            let length = last_nonzero(&num_array);
            if num_array[length] != SENTINEL {
                return Err(CodecError::SentinelMismatch {
                    received: num_array[length],
                    expected: SENTINEL,
                });
            }
            length
        } else {
            MAX_BUFFER
        };

        self.decrypt(&num_array[..length])
    }

    fn encrypt(&self, num: u64) -> Vec<u8> {
        // Encrypt `num` using form-preserving encryption.
        let pt = num_to_le_vec(num, self.zero_pad_length);
        let mut result = self
            .ff1
            .encrypt(&[], &BinaryNumeralString::from_bytes_le(&pt))
            .expect("Radix 2 should be valid")
            .to_bytes_le();

        let mac = self.truncated_mac(&result);
        result.extend_from_slice(&mac);
        result
    }

    fn decrypt(&self, data: &[u8]) -> Result<u64, CodecError> {
        if data.len() < self.hmac_length + self.zero_pad_length {
            return Err(CodecError::InvalidDataLength);
        }
        let (encrypted_num, received_mac) = data.split_at(data.len() - self.hmac_length);
        if self.truncated_mac(encrypted_num) != received_mac {
            return Err(CodecError::IncorrectMac);
        }

        let decrypted = self
            .ff1
            .decrypt(&[], &BinaryNumeralString::from_bytes_le(encrypted_num))
            .map_err(|_| CodecError::DecryptionFailed)?
            .to_bytes_le();
        if decrypted.len() > 8 {
            return Err(CodecError::InvalidDataLength);
        }
        Ok(le_vec_to_num(&decrypted))
    }

    fn truncated_mac(&self, ciphertext: &[u8]) -> Vec<u8> {
        let mut hmac = self.hmac.clone();
        hmac.update(ciphertext);
        hmac.finalize().into_bytes()[..self.hmac_length].to_vec()
    }
}

fn last_nonzero(bytes: &[u8]) -> usize {
    bytes.iter().rposition(|&b| b != 0).unwrap_or(0)
}

// Little-endian bytes of `num`, without trailing zero bytes beyond `min_length`.
fn num_to_le_vec(num: u64, min_length: usize) -> Vec<u8> {
    let bytes = num.to_le_bytes();
    let prefix_length = (last_nonzero(&bytes) + 1).max(min_length);
    bytes[..prefix_length].to_vec()
}

fn le_vec_to_num(bytes: &[u8]) -> u64 {
    let mut arr = [0; 8];
    arr[..bytes.len()].copy_from_slice(bytes);
    u64::from_le_bytes(arr)
}
