//! Resolution of a handler's hashing declarations.
//!
//! Structured [`HashAttribute`](crate::HashAttribute) markers take priority
//! over the legacy `@Hash(...)` doc comment marker. Results are memoized per
//! handler method in a [`ConfigurationCache`] that callers own and may share.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::configuration::{is_valid_parameter_name, HashConfiguration};
use crate::handler::{resolve_controller, HandlerCatalog, HandlerMethod, MethodKey};
use crate::Result;

static LEGACY_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)@Hash\s*\((?P<body>.*?)\)").expect("Pattern should be valid")
});

/// Which declaration form a configuration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationSource {
    Attribute,
    DocComment,
}

/// The hashing declarations of one handler method, one entry per hasher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfiguration {
    configurations: Vec<HashConfiguration>,
    source: DeclarationSource,
    duplicate: bool,
}

impl ResolvedConfiguration {
    pub fn configurations(&self) -> &[HashConfiguration] {
        &self.configurations
    }

    pub fn source(&self) -> DeclarationSource {
        self.source
    }

    /// Set when both declaration forms were present and the doc comment was ignored.
    pub fn has_duplicate(&self) -> bool {
        self.duplicate
    }

    /// All hashed parameter names, across hashers.
    pub fn parameters(&self) -> impl Iterator<Item = &str> {
        self.configurations
            .iter()
            .flat_map(|c| c.parameters().iter().map(String::as_str))
    }

    pub fn is_empty(&self) -> bool {
        self.configurations.iter().all(HashConfiguration::is_empty)
    }
}

/// Reads the structured markers of `method`.
///
/// Markers naming the same hasher are merged. A parameter already declared
/// under another hasher keeps its first hasher and the later declaration is
/// dropped with a warning. An invalid parameter name fails the whole
/// declaration with [`Error::InvalidParameter`](crate::Error::InvalidParameter).
pub fn extract_modern(method: &HandlerMethod) -> Result<Option<Vec<HashConfiguration>>> {
    if method.attributes().is_empty() {
        return Ok(None);
    }

    let mut configurations: Vec<HashConfiguration> = Vec::new();
    for attribute in method.attributes() {
        let hasher = attribute.hasher_name();
        let mut config = HashConfiguration::new(
            attribute.parameters().iter().cloned(),
            hasher.map(str::to_string),
        )?;
        config.retain(|name| {
            let owner = configurations
                .iter()
                .find(|c| c.hasher() != hasher && c.contains(name));
            match owner {
                Some(owner) => {
                    tracing::warn!(
                        handler = %method.key(),
                        parameter = name,
                        kept = owner.hasher().unwrap_or("(default)"),
                        dropped = hasher.unwrap_or("(default)"),
                        "parameter is declared under two hashers, keeping the first"
                    );
                    false
                }
                None => true,
            }
        });

        match configurations.iter_mut().find(|c| c.hasher() == hasher) {
            Some(existing) => existing.merge(config),
            None if !config.is_empty() => configurations.push(config),
            None => {}
        }
    }
    Ok(Some(configurations))
}

/// Reads the legacy `@Hash(...)` marker from the doc comment of `method`.
///
/// Accepts `@Hash("id")`, `@Hash({"id", "userId"})` and `@Hash(["id", "userId"])`.
/// Entries that are not quoted valid names are dropped; the rest still apply.
pub fn extract_legacy(method: &HandlerMethod) -> Option<HashConfiguration> {
    let doc = method.doc_comment()?;
    let captures = LEGACY_MARKER.captures(doc)?;
    let body = captures.name("body").map_or("", |m| m.as_str()).trim();

    let list = body
        .strip_prefix('{')
        .and_then(|b| b.strip_suffix('}'))
        .or_else(|| body.strip_prefix('[').and_then(|b| b.strip_suffix(']')))
        .unwrap_or(body);

    let names = list
        .split(',')
        .map(|item| item.trim_matches(|c: char| c.is_whitespace() || c == '*'))
        .filter(|item| !item.is_empty())
        .filter_map(|item| match unquote(item) {
            Some(name) if is_valid_parameter_name(name) => Some(name),
            _ => {
                tracing::warn!(handler = %method.key(), entry = item, "dropping invalid @Hash entry");
                None
            }
        })
        .collect::<Vec<_>>();

    HashConfiguration::new(names, None).ok()
}

fn unquote(item: &str) -> Option<&str> {
    item.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| item.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
}

/// Memoized resolution results keyed by handler method.
///
/// Errors are not stored; a failing method is resolved again on the next call.
#[derive(Debug, Default)]
pub struct ConfigurationCache {
    entries: DashMap<MethodKey, Option<Arc<ResolvedConfiguration>>>,
}

impl ConfigurationCache {
    pub fn new() -> Self {
        ConfigurationCache::default()
    }

    /// Returns the cached entry for `key`, computing it first if missing.
    ///
    /// `compute` runs while the entry is locked, so it runs at most once per key
    /// even with concurrent callers.
    pub fn get_or_compute<F>(
        &self,
        key: MethodKey,
        compute: F,
    ) -> Result<Option<Arc<ResolvedConfiguration>>>
    where
        F: FnOnce() -> Result<Option<ResolvedConfiguration>>,
    {
        if let Some(entry) = self.entries.get(&key) {
            return Ok(entry.value().clone());
        }
        match self.entries.entry(key) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                let resolved = compute()?.map(Arc::new);
                entry.insert(resolved.clone());
                Ok(resolved)
            }
        }
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Determines the hashing configuration of handler methods.
pub struct ConfigurationResolver {
    cache: Arc<ConfigurationCache>,
    catalog: Arc<dyn HandlerCatalog>,
}

impl ConfigurationResolver {
    pub fn new(cache: Arc<ConfigurationCache>, catalog: Arc<dyn HandlerCatalog>) -> Self {
        ConfigurationResolver { cache, catalog }
    }

    pub fn cache(&self) -> &Arc<ConfigurationCache> {
        &self.cache
    }

    pub fn catalog(&self) -> &dyn HandlerCatalog {
        self.catalog.as_ref()
    }

    /// Resolves `method`, returning `None` when it declares nothing.
    pub fn resolve(&self, method: &HandlerMethod) -> Result<Option<Arc<ResolvedConfiguration>>> {
        self.cache
            .get_or_compute(method.key(), || Self::compute(method))
    }

    /// Resolves the handler behind a controller reference such as `OrderController::show`.
    pub fn resolve_controller(
        &self,
        reference: &str,
    ) -> Result<Option<Arc<ResolvedConfiguration>>> {
        let method = resolve_controller(self.catalog.as_ref(), reference)?;
        self.resolve(&method)
    }

    fn compute(method: &HandlerMethod) -> Result<Option<ResolvedConfiguration>> {
        let modern = extract_modern(method)?;
        let legacy = extract_legacy(method);

        let resolved = match (modern, legacy) {
            (Some(configurations), legacy) => {
                let duplicate = legacy.is_some();
                if duplicate {
                    tracing::warn!(
                        handler = %method.key(),
                        "handler declares hashed parameters twice, ignoring @Hash doc comment"
                    );
                }
                Some(ResolvedConfiguration {
                    configurations,
                    source: DeclarationSource::Attribute,
                    duplicate,
                })
            }
            (None, Some(config)) => Some(ResolvedConfiguration {
                configurations: vec![config],
                source: DeclarationSource::DocComment,
                duplicate: false,
            }),
            (None, None) => None,
        };

        tracing::debug!(
            handler = %method.key(),
            parameters = ?resolved.as_ref().map(|r| r.parameters().collect::<Vec<_>>()),
            "resolved hashing configuration"
        );
        Ok(resolved)
    }
}
