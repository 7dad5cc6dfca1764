use std::sync::Arc;

use dashmap::DashMap;

use crate::config::Settings;
use crate::converter::{build_converter, Converter};
use crate::{Error, Result};

/// Named converters, built on first use and shared for the registry's lifetime.
///
/// Settings are validated when the registry is created, so building a
/// converter later cannot fail; the only per-call error is an unknown name.
pub struct HasherRegistry {
    settings: Settings,
    converters: DashMap<String, Arc<dyn Converter>>,
}

impl HasherRegistry {
    /// Creates a registry, failing with [`Error::Configuration`] on invalid settings.
    ///
    /// ```
    /// use paramhash::{HasherConfig, HasherRegistry, ParamValue, Settings};
    ///
    /// let registry = HasherRegistry::new(Settings::new(HasherConfig::new("s").minimum_length(8))).unwrap();
    /// let converter = registry.get_converter("default").unwrap();
    ///
    /// assert_eq!(converter.encode(123).unwrap(), "4V6YxNrM");
    /// assert_eq!(converter.decode("4V6YxNrM"), ParamValue::Int(123));
    /// ```
    pub fn new(settings: Settings) -> Result<Self> {
        settings.validate()?;
        Ok(HasherRegistry {
            settings,
            converters: DashMap::new(),
        })
    }

    /// Returns the converter for `name`, building it on first access.
    pub fn get_converter(&self, name: &str) -> Result<Arc<dyn Converter>> {
        if let Some(converter) = self.converters.get(name) {
            return Ok(converter.value().clone());
        }
        let config = self
            .settings
            .get(name)
            .ok_or_else(|| Error::HasherNotFound {
                name: name.to_string(),
            })?;

        // The entry holds the shard lock while building, so concurrent first
        // callers all receive the same instance.
        let entry = self
            .converters
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::debug!(hasher = name, algorithm = ?config.algorithm, "building converter");
                Arc::from(build_converter(name, config))
            });
        Ok(entry.value().clone())
    }

    /// Returns the converter of the default hasher.
    pub fn default_converter(&self) -> Result<Arc<dyn Converter>> {
        self.get_converter(self.settings.default_hasher())
    }

    /// `name`, or the default hasher's name when none is given.
    pub fn resolve_name<'a>(&'a self, name: Option<&'a str>) -> &'a str {
        name.unwrap_or_else(|| self.settings.default_hasher())
    }

    pub fn default_name(&self) -> &str {
        self.settings.default_hasher()
    }

    pub fn has_hasher(&self, name: &str) -> bool {
        self.settings.get(name).is_some()
    }

    /// Number of converters built so far.
    pub fn built(&self) -> usize {
        self.converters.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Algorithm, HasherConfig};

    fn registry() -> HasherRegistry {
        let settings = Settings::new(HasherConfig::new("s").minimum_length(8)).hasher(
            "secure",
            HasherConfig::new("Test key here").algorithm(Algorithm::Encrypted),
        );
        HasherRegistry::new(settings).unwrap()
    }

    #[test]
    fn test_lazy_and_cached() {
        let registry = registry();
        assert_eq!(registry.built(), 0);

        let a = registry.get_converter("default").unwrap();
        let b = registry.get_converter("default").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.built(), 1);

        registry.get_converter("secure").unwrap();
        assert_eq!(registry.built(), 2);
    }

    #[test]
    fn test_hasher_not_found() {
        let registry = registry();
        assert_eq!(
            registry.get_converter("nonexistent").err(),
            Some(Error::HasherNotFound {
                name: "nonexistent".to_string()
            })
        );
        assert_eq!(registry.built(), 0);
    }

    #[test]
    fn test_default_resolution() {
        let registry = registry();
        assert_eq!(registry.resolve_name(None), "default");
        assert_eq!(registry.resolve_name(Some("secure")), "secure");
        assert_eq!(
            registry.default_converter().unwrap().encode(123).unwrap(),
            "4V6YxNrM"
        );
    }

    #[test]
    fn test_invalid_settings_fail_at_build() {
        let settings = Settings::new(HasherConfig::new("s"))
            .hasher("broken", HasherConfig::new("").algorithm(Algorithm::Encrypted));
        assert!(matches!(
            HasherRegistry::new(settings),
            Err(Error::Configuration { ref hasher, .. }) if hasher == "broken"
        ));
    }

    #[test]
    fn test_concurrent_first_access() {
        let registry = registry();
        let converters: Vec<Arc<dyn Converter>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| registry.get_converter("secure").unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(registry.built(), 1);
        for converter in &converters[1..] {
            assert!(Arc::ptr_eq(&converters[0], converter));
        }
    }
}
