use std::collections::BTreeMap;
use std::fmt;

use crate::codec::Codec;
use crate::config::{Algorithm, HasherConfig};
use crate::hashids::Hashids;
use crate::{Error, Result};

/// A route parameter value: either an integer or a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParamValue {
    Int(i64),
    Str(String),
}

/// Route parameters, keyed by name.
pub type Parameters = BTreeMap<String, ParamValue>;

impl ParamValue {
    /// The value as a non-negative integer, if it is one or spells one.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            ParamValue::Int(n) => u64::try_from(*n).ok(),
            ParamValue::Str(s) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => {
                s.parse().ok()
            }
            ParamValue::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(s) => Some(s),
            ParamValue::Int(_) => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParamValue::Int(n) => write!(f, "{}", n),
            ParamValue::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(n: i64) -> Self {
        ParamValue::Int(n)
    }
}

impl From<i32> for ParamValue {
    fn from(n: i32) -> Self {
        ParamValue::Int(n.into())
    }
}

impl From<u32> for ParamValue {
    fn from(n: u32) -> Self {
        ParamValue::Int(n.into())
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Str(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Str(s)
    }
}

/// Reversible integer <-> token conversion.
///
/// Implementations are immutable after construction and shared between
/// threads through the [`HasherRegistry`](crate::HasherRegistry).
pub trait Converter: Send + Sync {
    /// Encodes a single non-negative integer.
    fn encode(&self, value: u64) -> Result<String>;

    /// Encodes several integers into one combined token.
    fn encode_many(&self, values: &[u64]) -> Result<String>;

    /// Every integer carried by `token`, or an empty vector if it is foreign.
    fn decode_many(&self, token: &str) -> Vec<u64>;

    /// Decodes `token` to its first integer.
    ///
    /// Tokens that do not decode are handed back unchanged, so that hand-edited
    /// URLs reach the handler as a string it will reject on its own terms.
    fn decode(&self, token: &str) -> ParamValue {
        match self.decode_many(token).first() {
            Some(&n) => match i64::try_from(n) {
                Ok(n) => ParamValue::Int(n),
                Err(_) => ParamValue::Str(token.to_string()),
            },
            None => ParamValue::Str(token.to_string()),
        }
    }

    /// Encodes a route parameter value.
    fn encode_value(&self, value: &ParamValue) -> Result<String> {
        let n = value.as_u64().ok_or_else(|| Error::EncodingFailed {
            value: value.to_string(),
            reason: "only non-negative integers can be encoded".to_string(),
        })?;
        self.encode(n)
    }

    /// Decodes a route parameter value; integers are left as they are.
    fn decode_value(&self, value: &ParamValue) -> ParamValue {
        match value {
            ParamValue::Str(token) => self.decode(token),
            ParamValue::Int(_) => value.clone(),
        }
    }
}

/// Converter backed by the hashids algorithm.
pub struct HashidsConverter {
    hashids: Hashids,
}

impl HashidsConverter {
    pub fn new(config: &HasherConfig) -> Self {
        HashidsConverter {
            hashids: Hashids::new(config),
        }
    }
}

impl Converter for HashidsConverter {
    fn encode(&self, value: u64) -> Result<String> {
        Ok(self.hashids.encode(&[value]))
    }

    fn encode_many(&self, values: &[u64]) -> Result<String> {
        if values.is_empty() {
            return Err(Error::EncodingFailed {
                value: String::new(),
                reason: "nothing to encode".to_string(),
            });
        }
        Ok(self.hashids.encode(values))
    }

    fn decode_many(&self, token: &str) -> Vec<u64> {
        self.hashids.decode(token)
    }
}

/// Converter backed by the keyed FF1 codec; carries exactly one integer per token.
pub struct EncryptedConverter {
    codec: Codec,
}

impl EncryptedConverter {
    pub fn new(name: &str, config: &HasherConfig) -> Self {
        EncryptedConverter {
            codec: Codec::new(name, config),
        }
    }
}

impl Converter for EncryptedConverter {
    fn encode(&self, value: u64) -> Result<String> {
        Ok(self.codec.encode(value))
    }

    fn encode_many(&self, values: &[u64]) -> Result<String> {
        match values {
            [value] => self.encode(*value),
            _ => Err(Error::EncodingFailed {
                value: format!("{:?}", values),
                reason: "encrypted tokens carry exactly one integer".to_string(),
            }),
        }
    }

    fn decode_many(&self, token: &str) -> Vec<u64> {
        match self.codec.decode(token) {
            Ok(n) => vec![n],
            Err(e) => {
                tracing::trace!(token, error = %e, "token rejected");
                Vec::new()
            }
        }
    }
}

/// Builds the converter for hasher `name`.
pub fn build_converter(name: &str, config: &HasherConfig) -> Box<dyn Converter> {
    match config.algorithm {
        Algorithm::Hashids => Box::new(HashidsConverter::new(config)),
        Algorithm::Encrypted => Box::new(EncryptedConverter::new(name, config)),
    }
}
