use std::collections::{BTreeMap, HashSet};

use serde::Deserialize;

use crate::{Error, Result};

/// Name of the hasher used when a declaration does not pick one.
pub const DEFAULT_HASHER: &str = "default";

/// Alphabet used when none is configured.
pub const DEFAULT_ALPHABET: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ1234567890";

const MIN_ALPHABET_LENGTH: usize = 16;

/// Upper bound for `minimum_length`; padding is rebuilt on every encode.
pub const MAX_MINIMUM_LENGTH: usize = 255;

// Builder errors are raised before the configuration has a name.
const UNNAMED_HASHER: &str = "*";

/// Reversible algorithm backing a hasher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    /// Salted alphabet shuffling, short tokens, no integrity check.
    #[default]
    Hashids,
    /// FF1 format-preserving encryption with a truncated HMAC tag.
    Encrypted,
}

/// Settings for one named hasher.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HasherConfig {
    pub(crate) algorithm: Algorithm,
    pub(crate) salt: String,
    pub(crate) minimum_length: usize,
    pub(crate) alphabet: String,
    pub(crate) hmac_length: u8,
    pub(crate) zero_pad_length: u8,
}

impl Default for HasherConfig {
    fn default() -> Self {
        HasherConfig {
            algorithm: Algorithm::Hashids,
            salt: String::new(),
            minimum_length: 0,
            alphabet: DEFAULT_ALPHABET.to_string(),
            hmac_length: 4,
            zero_pad_length: 4,
        }
    }
}

impl HasherConfig {
    /// Creates a hashids configuration with the given `salt` and other settings in
    /// default values.
    /// - `minimum_length` defaults to 0, tokens are as short as the value allows.
    /// - `alphabet` defaults to the 62 ASCII letters and digits.
    /// - `hmac_length` and `zero_pad_length` default to 4 and only matter for
    ///   [`Algorithm::Encrypted`].
    pub fn new(salt: impl Into<String>) -> Self {
        HasherConfig {
            salt: salt.into(),
            ..HasherConfig::default()
        }
    }

    /// Selects the algorithm.
    pub fn algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Sets the minimum token length; shorter tokens are padded.
    /// Values above [`MAX_MINIMUM_LENGTH`] are rejected by [`HasherConfig::validate`].
    pub fn minimum_length(mut self, minimum_length: usize) -> Self {
        self.minimum_length = minimum_length;
        self
    }

    /// Sets the token alphabet.
    /// The alphabet must hold at least 16 unique characters and no whitespace.
    pub fn alphabet(mut self, alphabet: impl Into<String>) -> Result<Self> {
        let alphabet = alphabet.into();
        check_alphabet(&alphabet).map_err(|reason| Error::Configuration {
            hasher: UNNAMED_HASHER.to_string(),
            reason,
        })?;
        self.alphabet = alphabet;
        Ok(self)
    }

    /// Sets the number of bytes in the HMAC of encrypted tokens.
    /// The value must be between 0 and 8.
    pub fn hmac_length(mut self, hmac_length: u8) -> Result<Self> {
        if hmac_length > 8 {
            return Err(Error::Configuration {
                hasher: UNNAMED_HASHER.to_string(),
                reason: format!("hmac_length must be at most 8, got {}", hmac_length),
            });
        }
        self.hmac_length = hmac_length;
        Ok(self)
    }

    /// Sets the number of bytes to zero-pad numbers before encryption.
    /// The value must be between 0 and 8.
    pub fn zero_pad_length(mut self, zero_pad_length: u8) -> Result<Self> {
        if zero_pad_length > 8 {
            return Err(Error::Configuration {
                hasher: UNNAMED_HASHER.to_string(),
                reason: format!("zero_pad_length must be at most 8, got {}", zero_pad_length),
            });
        }
        self.zero_pad_length = zero_pad_length;
        Ok(self)
    }

    pub fn get_algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn salt(&self) -> &str {
        &self.salt
    }

    pub fn get_minimum_length(&self) -> usize {
        self.minimum_length
    }

    pub fn get_alphabet(&self) -> &str {
        &self.alphabet
    }

    /// Checks every setting; deserialized configurations skip the builder checks,
    /// so the registry calls this before building anything.
    pub fn validate(&self, hasher: &str) -> Result<()> {
        let fail = |reason: String| Error::Configuration {
            hasher: hasher.to_string(),
            reason,
        };
        check_alphabet(&self.alphabet).map_err(fail)?;
        if self.minimum_length > MAX_MINIMUM_LENGTH {
            return Err(fail(format!(
                "minimum_length must be at most {}, got {}",
                MAX_MINIMUM_LENGTH, self.minimum_length
            )));
        }
        if self.hmac_length > 8 {
            return Err(fail(format!(
                "hmac_length must be at most 8, got {}",
                self.hmac_length
            )));
        }
        if self.zero_pad_length > 8 {
            return Err(fail(format!(
                "zero_pad_length must be at most 8, got {}",
                self.zero_pad_length
            )));
        }
        if self.algorithm == Algorithm::Encrypted && self.salt.is_empty() {
            return Err(fail("encrypted hashers need a non-empty salt".to_string()));
        }
        Ok(())
    }
}

fn check_alphabet(alphabet: &str) -> std::result::Result<(), String> {
    if alphabet.chars().any(char::is_whitespace) {
        return Err("alphabet cannot contain whitespace".to_string());
    }
    let mut seen = HashSet::new();
    for c in alphabet.chars() {
        if !seen.insert(c) {
            return Err(format!("alphabet contains '{}' more than once", c));
        }
    }
    if seen.len() < MIN_ALPHABET_LENGTH {
        return Err(format!(
            "alphabet must contain at least {} unique characters, got {}",
            MIN_ALPHABET_LENGTH,
            seen.len()
        ));
    }
    Ok(())
}

fn default_hasher_name() -> String {
    DEFAULT_HASHER.to_string()
}

/// All hasher configurations of an application.
///
/// ```
/// use paramhash::Settings;
///
/// let settings = Settings::from_toml_str(r#"
///     [hashers.default]
///     salt = "s"
///     minimum_length = 8
///
///     [hashers.secure]
///     algorithm = "encrypted"
///     salt = "another secret"
/// "#).unwrap();
///
/// assert_eq!(settings.default_hasher(), "default");
/// assert_eq!(settings.hashers().count(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default = "default_hasher_name")]
    default_hasher: String,
    #[serde(default)]
    hashers: BTreeMap<String, HasherConfig>,
}

impl Settings {
    /// Creates settings holding `default` under the name `"default"`.
    pub fn new(default: HasherConfig) -> Self {
        let mut hashers = BTreeMap::new();
        hashers.insert(DEFAULT_HASHER.to_string(), default);
        Settings {
            default_hasher: DEFAULT_HASHER.to_string(),
            hashers,
        }
    }

    /// Adds or replaces a named hasher.
    pub fn hasher(mut self, name: impl Into<String>, config: HasherConfig) -> Self {
        self.hashers.insert(name.into(), config);
        self
    }

    /// Picks another hasher as the default.
    pub fn default_hasher_name(mut self, name: impl Into<String>) -> Self {
        self.default_hasher = name.into();
        self
    }

    /// Parses settings from TOML.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| Error::Configuration {
            hasher: UNNAMED_HASHER.to_string(),
            reason: e.message().to_string(),
        })
    }

    pub fn default_hasher(&self) -> &str {
        &self.default_hasher
    }

    pub fn get(&self, name: &str) -> Option<&HasherConfig> {
        self.hashers.get(name)
    }

    pub fn hashers(&self) -> impl Iterator<Item = (&str, &HasherConfig)> {
        self.hashers.iter().map(|(name, config)| (name.as_str(), config))
    }

    /// Validates every hasher and the presence of the default one.
    pub fn validate(&self) -> Result<()> {
        if !self.hashers.contains_key(&self.default_hasher) {
            return Err(Error::Configuration {
                hasher: self.default_hasher.clone(),
                reason: "default hasher is not configured".to_string(),
            });
        }
        for (name, config) in &self.hashers {
            config.validate(name)?;
        }
        Ok(())
    }
}
