use once_cell::sync::Lazy;
use regex::Regex;

use crate::{Error, Result};

static PARAMETER_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,99}$").expect("Pattern should be valid"));

/// Whether `name` may be declared as a hashed parameter.
pub fn is_valid_parameter_name(name: &str) -> bool {
    PARAMETER_NAME.is_match(name)
}

/// The parameters of one handler that are hashed with one hasher.
///
/// Parameter names keep their declaration order; repeated names are kept once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashConfiguration {
    parameters: Vec<String>,
    hasher: Option<String>,
}

impl HashConfiguration {
    /// Creates a configuration, failing with [`Error::InvalidParameter`] on the
    /// first name that is not an identifier of at most 100 characters.
    ///
    /// ```
    /// use paramhash::HashConfiguration;
    ///
    /// let config = HashConfiguration::new(["id", "userId", "id"], None).unwrap();
    /// assert_eq!(config.parameters(), ["id", "userId"]);
    /// assert!(HashConfiguration::new(["user-id"], None).is_err());
    /// ```
    pub fn new<I, S>(parameters: I, hasher: Option<String>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = Vec::new();
        for name in parameters {
            let name = name.into();
            if !is_valid_parameter_name(&name) {
                return Err(Error::InvalidParameter { name });
            }
            if !names.contains(&name) {
                names.push(name);
            }
        }
        Ok(HashConfiguration {
            parameters: names,
            hasher,
        })
    }

    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    /// The hasher name, `None` meaning the registry default.
    pub fn hasher(&self) -> Option<&str> {
        self.hasher.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parameters.iter().any(|p| p == name)
    }

    pub(crate) fn retain<F: FnMut(&str) -> bool>(&mut self, mut keep: F) {
        self.parameters.retain(|name| keep(name));
    }

    /// Appends the parameters of `other` not already present.
    pub(crate) fn merge(&mut self, other: HashConfiguration) {
        for name in other.parameters {
            if !self.contains(&name) {
                self.parameters.push(name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("id", true)]
    #[case("_id", true)]
    #[case("userId2", true)]
    #[case("user_id", true)]
    #[case("2id", false)]
    #[case("user-id", false)]
    #[case("", false)]
    #[case("id ", false)]
    #[case("ïd", false)]
    fn test_parameter_names(#[case] name: &str, #[case] valid: bool) {
        assert_eq!(is_valid_parameter_name(name), valid);
    }

    #[test]
    fn test_name_length_limit() {
        assert!(is_valid_parameter_name(&"a".repeat(100)));
        assert!(!is_valid_parameter_name(&"a".repeat(101)));
    }

    #[test]
    fn test_construction_fails_fast() {
        assert_eq!(
            HashConfiguration::new(["id", "bad name", "other"], None),
            Err(Error::InvalidParameter {
                name: "bad name".to_string()
            })
        );
    }

    #[test]
    fn test_order_and_duplicates() {
        let config =
            HashConfiguration::new(["userId", "id", "userId"], Some("secure".to_string()))
                .unwrap();
        assert_eq!(config.parameters(), ["userId", "id"]);
        assert_eq!(config.hasher(), Some("secure"));
        assert!(config.contains("id"));
        assert!(!config.contains("slug"));
    }

    #[test]
    fn test_merge() {
        let mut a = HashConfiguration::new(["id"], None).unwrap();
        a.merge(HashConfiguration::new(["userId", "id"], None).unwrap());
        assert_eq!(a.parameters(), ["id", "userId"]);
    }

    #[test]
    fn test_empty() {
        let config = HashConfiguration::new(Vec::<String>::new(), None).unwrap();
        assert!(config.is_empty());
        assert_eq!(config.hasher(), None);
    }
}
