//! Handler metadata as exposed by the host framework.
//!
//! A handler method may carry hashing declarations in two forms: structured
//! [`HashAttribute`] markers and a legacy `@Hash(...)` marker inside its doc
//! comment. Handlers are looked up through a [`HandlerCatalog`] by the
//! controller reference stored on each route.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{Error, Result};

/// Method name used for handler references that name only a type.
pub const CALLABLE_METHOD: &str = "call";

static TYPE_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(?:(?:\\|::|\.)[A-Za-z_][A-Za-z0-9_]*)*$")
        .expect("Pattern should be valid")
});

static METHOD_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("Pattern should be valid"));

/// A structured hashing marker attached to a handler method.
///
/// Names are validated when the configuration is resolved, not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashAttribute {
    parameters: Vec<String>,
    hasher: Option<String>,
}

impl HashAttribute {
    /// Marks a single parameter.
    pub fn new(parameter: impl Into<String>) -> Self {
        HashAttribute {
            parameters: vec![parameter.into()],
            hasher: None,
        }
    }

    /// Marks an ordered list of parameters.
    pub fn list<I, S>(parameters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        HashAttribute {
            parameters: parameters.into_iter().map(Into::into).collect(),
            hasher: None,
        }
    }

    /// Picks the hasher; without one the registry default applies.
    pub fn hasher(mut self, name: impl Into<String>) -> Self {
        self.hasher = Some(name.into());
        self
    }

    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    pub fn hasher_name(&self) -> Option<&str> {
        self.hasher.as_deref()
    }
}

/// Stable identity of a handler method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodKey(String, String);

impl MethodKey {
    pub fn new(class: &str, method: &str) -> Self {
        MethodKey(class.to_string(), method.to_string())
    }

    pub fn class(&self) -> &str {
        &self.0
    }

    pub fn method(&self) -> &str {
        &self.1
    }
}

impl fmt::Display for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}::{}", self.0, self.1)
    }
}

/// Metadata of one handler method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerMethod {
    class: String,
    method: String,
    attributes: Vec<HashAttribute>,
    doc_comment: Option<String>,
}

impl HandlerMethod {
    pub fn new(class: impl Into<String>, method: impl Into<String>) -> Self {
        HandlerMethod {
            class: class.into(),
            method: method.into(),
            attributes: Vec::new(),
            doc_comment: None,
        }
    }

    pub fn with_attribute(mut self, attribute: HashAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn with_doc_comment(mut self, doc_comment: impl Into<String>) -> Self {
        self.doc_comment = Some(doc_comment.into());
        self
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn attributes(&self) -> &[HashAttribute] {
        &self.attributes
    }

    pub fn doc_comment(&self) -> Option<&str> {
        self.doc_comment.as_deref()
    }

    pub fn key(&self) -> MethodKey {
        MethodKey::new(&self.class, &self.method)
    }
}

/// Lookup of handler methods by type and method name.
pub trait HandlerCatalog: Send + Sync {
    fn find(&self, class: &str, method: &str) -> Option<Arc<HandlerMethod>>;
}

/// A catalog filled at startup.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    methods: HashMap<MethodKey, Arc<HandlerMethod>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        InMemoryCatalog::default()
    }

    pub fn register(&mut self, method: HandlerMethod) -> &mut Self {
        self.methods.insert(method.key(), Arc::new(method));
        self
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl HandlerCatalog for InMemoryCatalog {
    fn find(&self, class: &str, method: &str) -> Option<Arc<HandlerMethod>> {
        self.methods.get(&MethodKey::new(class, method)).cloned()
    }
}

/// Splits a controller reference into type and method.
///
/// Accepted forms are `Type::method`, `service:method` and a bare `Type`,
/// which refers to [`CALLABLE_METHOD`].
pub fn parse_controller(reference: &str) -> Result<(String, String)> {
    let invalid = || Error::InvalidController {
        reference: reference.to_string(),
    };

    let (class, method) = if let Some((class, method)) = reference.rsplit_once("::") {
        (class, method)
    } else if let Some((service, method)) = reference.split_once(':') {
        (service, method)
    } else {
        (reference, CALLABLE_METHOD)
    };

    if !TYPE_PATH.is_match(class) || !METHOD_NAME.is_match(method) {
        return Err(invalid());
    }
    Ok((class.to_string(), method.to_string()))
}

/// Resolves a controller reference to catalogued handler metadata.
pub fn resolve_controller(
    catalog: &dyn HandlerCatalog,
    reference: &str,
) -> Result<Arc<HandlerMethod>> {
    let (class, method) = parse_controller(reference)?;
    catalog
        .find(&class, &method)
        .ok_or(Error::MissingClassOrMethod { class, method })
}
