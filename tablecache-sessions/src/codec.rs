//! Authenticated, optionally encrypted, time-limited value encoding
//!
//! An encoded value is `base64url(timestamp|payload|mac)` where `payload`
//! is the base64url JSON of the value (encrypted first when a block key is
//! configured) and `mac` is HMAC-SHA256 over `name|timestamp|payload`.
//! Binding the name into the MAC keeps a value issued under one cookie
//! name from being accepted under another.

use crate::error::{CodecError, CodecResult};
use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes128Gcm, Aes256Gcm, Nonce};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::Sha256;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

/// Default maximum age of an encoded value, in seconds (30 days)
pub const DEFAULT_MAX_AGE: i64 = 86400 * 30;

/// Default maximum length of an encoded value
pub const DEFAULT_MAX_LENGTH: usize = 4096;

const NONCE_LEN: usize = 12;

enum BlockCipher {
    Aes128(Box<Aes128Gcm>),
    Aes256(Box<Aes256Gcm>),
}

impl BlockCipher {
    fn new(key: &[u8]) -> CodecResult<Self> {
        let invalid = |_| CodecError::InvalidBlockKey(key.len());
        match key.len() {
            16 => Ok(Self::Aes128(Box::new(
                Aes128Gcm::new_from_slice(key).map_err(invalid)?,
            ))),
            32 => Ok(Self::Aes256(Box::new(
                Aes256Gcm::new_from_slice(key).map_err(invalid)?,
            ))),
            n => Err(CodecError::InvalidBlockKey(n)),
        }
    }

    /// Returns `nonce || ciphertext`
    fn encrypt(&self, plaintext: &[u8]) -> CodecResult<Vec<u8>> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = match self {
            Self::Aes128(cipher) => cipher.encrypt(&nonce, plaintext),
            Self::Aes256(cipher) => cipher.encrypt(&nonce, plaintext),
        }
        .map_err(|_| CodecError::Encrypt)?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    fn decrypt(&self, data: &[u8]) -> CodecResult<Vec<u8>> {
        if data.len() < NONCE_LEN {
            return Err(CodecError::Decrypt);
        }
        let (nonce, ciphertext) = data.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce);
        match self {
            Self::Aes128(cipher) => cipher.decrypt(nonce, ciphertext),
            Self::Aes256(cipher) => cipher.decrypt(nonce, ciphertext),
        }
        .map_err(|_| CodecError::Decrypt)
    }
}

/// Codec signing values with a hash key and optionally encrypting them
/// with a block key
pub struct SecureCookie {
    hash_key: Vec<u8>,
    block: Option<BlockCipher>,
    max_age: i64,
    min_age: i64,
    max_length: usize,
    clock: fn() -> i64,
}

impl SecureCookie {
    /// Create a codec.
    ///
    /// `hash_key` authenticates values and should be 32 or 64 random
    /// bytes. `block_key`, when given, must be 16 or 32 bytes and selects
    /// AES-128-GCM or AES-256-GCM.
    pub fn new(hash_key: &[u8], block_key: Option<&[u8]>) -> CodecResult<Self> {
        if hash_key.is_empty() {
            return Err(CodecError::HashKeyNotSet);
        }
        let block = block_key.map(BlockCipher::new).transpose()?;

        Ok(Self {
            hash_key: hash_key.to_vec(),
            block,
            max_age: DEFAULT_MAX_AGE,
            min_age: 0,
            max_length: DEFAULT_MAX_LENGTH,
            clock: unix_now,
        })
    }

    /// Maximum age in seconds; values older than this fail to decode.
    /// Zero or negative disables the check.
    pub fn set_max_age(&mut self, max_age: i64) {
        self.max_age = max_age;
    }

    pub fn max_age(&self) -> i64 {
        self.max_age
    }

    /// Minimum age in seconds; values younger than this fail to decode
    pub fn set_min_age(&mut self, min_age: i64) {
        self.min_age = min_age;
    }

    /// Maximum encoded length; zero disables the check
    pub fn set_max_length(&mut self, max_length: usize) {
        self.max_length = max_length;
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn is_encrypting(&self) -> bool {
        self.block.is_some()
    }

    #[cfg(test)]
    pub(crate) fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    /// Serialize, optionally encrypt, and sign `value` under `name`
    pub fn encode<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> CodecResult<String> {
        let mut payload =
            serde_json::to_vec(value).map_err(|e| CodecError::Serialize(e.to_string()))?;
        if let Some(block) = &self.block {
            payload = block.encrypt(&payload)?;
        }
        let payload = URL_SAFE_NO_PAD.encode(payload);

        let mut signed = format!("{}|{}|{}", name, (self.clock)(), payload).into_bytes();
        let mac = self.mac(&signed)?;
        signed.push(b'|');
        signed.extend_from_slice(&mac);

        // The name is authenticated but not transmitted
        let encoded = URL_SAFE_NO_PAD.encode(&signed[name.len() + 1..]);
        if self.max_length != 0 && encoded.len() > self.max_length {
            return Err(CodecError::ValueTooLong);
        }
        Ok(encoded)
    }

    /// Verify, check age, optionally decrypt, and deserialize `value`
    pub fn decode<T: DeserializeOwned>(&self, name: &str, value: &str) -> CodecResult<T> {
        if self.max_length != 0 && value.len() > self.max_length {
            return Err(CodecError::ValueTooLong);
        }

        let decoded = URL_SAFE_NO_PAD
            .decode(value)
            .map_err(|e| CodecError::Base64(e.to_string()))?;

        // timestamp|payload|mac, the mac is raw bytes and comes last
        let mut parts = decoded.splitn(3, |b| *b == b'|');
        let (Some(timestamp), Some(payload), Some(mac)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(CodecError::InvalidFormat);
        };

        let mut signed = Vec::with_capacity(name.len() + 2 + timestamp.len() + payload.len());
        signed.extend_from_slice(name.as_bytes());
        signed.push(b'|');
        signed.extend_from_slice(timestamp);
        signed.push(b'|');
        signed.extend_from_slice(payload);
        self.verify_mac(&signed, mac)?;

        let timestamp: i64 = std::str::from_utf8(timestamp)
            .ok()
            .and_then(|t| t.parse().ok())
            .ok_or(CodecError::TimestampInvalid)?;
        let now = (self.clock)();
        if self.min_age != 0 && timestamp > now - self.min_age {
            return Err(CodecError::TimestampTooNew);
        }
        if self.max_age > 0 && timestamp < now - self.max_age {
            return Err(CodecError::TimestampExpired);
        }

        let mut payload = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|e| CodecError::Base64(e.to_string()))?;
        if let Some(block) = &self.block {
            payload = block.decrypt(&payload)?;
        }

        serde_json::from_slice(&payload).map_err(|e| CodecError::Serialize(e.to_string()))
    }

    fn mac(&self, data: &[u8]) -> CodecResult<Vec<u8>> {
        let mut mac =
            <HmacSha256 as Mac>::new_from_slice(&self.hash_key).map_err(|_| CodecError::HashKeyNotSet)?;
        mac.update(data);
        Ok(mac.finalize().into_bytes().to_vec())
    }

    fn verify_mac(&self, data: &[u8], expected: &[u8]) -> CodecResult<()> {
        let mut mac =
            <HmacSha256 as Mac>::new_from_slice(&self.hash_key).map_err(|_| CodecError::HashKeyNotSet)?;
        mac.update(data);
        // Constant-time comparison
        mac.verify_slice(expected)
            .map_err(|_| CodecError::MacInvalid)
    }
}

impl fmt::Debug for SecureCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureCookie")
            .field("encrypting", &self.block.is_some())
            .field("max_age", &self.max_age)
            .field("min_age", &self.min_age)
            .field("max_length", &self.max_length)
            .finish_non_exhaustive()
    }
}

fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Build codecs from alternating hash and block keys.
///
/// Pass several pairs to rotate keys: the first pair encodes, every pair
/// is tried when decoding. An empty or missing block key disables
/// encryption for that pair.
pub fn codecs_from_pairs(key_pairs: &[&[u8]]) -> CodecResult<Vec<SecureCookie>> {
    key_pairs
        .chunks(2)
        .map(|pair| {
            let block_key = pair.get(1).copied().filter(|key| !key.is_empty());
            SecureCookie::new(pair[0], block_key)
        })
        .collect()
}

/// Encode with the first codec that succeeds
pub fn encode_multi<T: Serialize + ?Sized>(
    name: &str,
    value: &T,
    codecs: &[SecureCookie],
) -> CodecResult<String> {
    let mut last_error = CodecError::NoCodecs;
    for codec in codecs {
        match codec.encode(name, value) {
            Ok(encoded) => return Ok(encoded),
            Err(e) => last_error = e,
        }
    }
    Err(last_error)
}

/// Decode with the first codec that accepts the value
pub fn decode_multi<T: DeserializeOwned>(
    name: &str,
    value: &str,
    codecs: &[SecureCookie],
) -> CodecResult<T> {
    let mut last_error = CodecError::NoCodecs;
    for codec in codecs {
        match codec.decode(name, value) {
            Ok(decoded) => return Ok(decoded),
            Err(e) => last_error = e,
        }
    }
    Err(last_error)
}

/// Cryptographically random key of `len` bytes
pub fn generate_random_key(len: usize) -> Vec<u8> {
    let mut key = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut key);
    key
}
