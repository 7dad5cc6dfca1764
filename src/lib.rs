//! `paramhash` hides sequential integer IDs in URLs by hashing route parameters
//! when URLs are generated and turning them back into integers after matching,
//! so application code keeps working with plain integers.
//!
//! Handlers declare which of their parameters are hashed, and with which named
//! hasher. A [`RouterDecorator`] wraps an existing [`Router`] and rewrites the
//! declared parameters before delegating URL generation; a [`ParameterDecoder`]
//! reverses the rewrite for matched requests.
//!
//! Two algorithms are available per hasher:
//!
//! - `hashids` (default) produces short tokens from a salt, a minimum length
//!   and an alphabet. It is an obfuscation scheme, not encryption.
//! - `encrypted` uses [format-preserving encryption](https://en.wikipedia.org/wiki/Format-preserving_encryption)
//!   (FF1 with AES256) and a truncated HMAC (SHA256), so forged tokens are rejected.
//!
//! Tokens that do not decode are passed through unchanged: a hand-edited URL
//! reaches the handler as a string, and the handler's own checks reject it.
//!
//! # Usage
//!
//! ## Declaring hashed parameters
//!
//! ```
//! use std::sync::Arc;
//! use paramhash::{
//!     ConfigurationCache, ConfigurationResolver, HandlerMethod, HashAttribute, HasherRegistry,
//!     InMemoryCatalog, ParamValue, ParameterDecoder, ParameterTransformFactory, Parameters,
//!     PatternRouter, ReferenceType, Route, RouteCollection, Router, RouterDecorator, Settings,
//! };
//!
//! let settings = Settings::from_toml_str(r#"
//!     [hashers.default]
//!     salt = "s"
//!     minimum_length = 8
//! "#).unwrap();
//!
//! // Structured markers; a `@Hash("id")` doc comment works too.
//! let mut catalog = InMemoryCatalog::new();
//! catalog.register(HandlerMethod::new("OrderController", "show").with_attribute(HashAttribute::new("id")));
//!
//! let mut routes = RouteCollection::new();
//! routes.add("order_show", Route::new("/orders/{id}").controller("OrderController::show"));
//!
//! let factory = Arc::new(ParameterTransformFactory::new(
//!     Arc::new(HasherRegistry::new(settings).unwrap()),
//!     ConfigurationResolver::new(Arc::new(ConfigurationCache::new()), Arc::new(catalog)),
//! ));
//! let router = RouterDecorator::new(PatternRouter::new(routes), factory.clone());
//!
//! let mut parameters = Parameters::new();
//! parameters.insert("id".to_string(), 123.into());
//! let url = router.generate("order_show", parameters, ReferenceType::AbsolutePath).unwrap();
//! assert_eq!(url, "/orders/4V6YxNrM");
//!
//! let mut attributes = router.match_path(&url).unwrap();
//! ParameterDecoder::new(factory).decode(&mut attributes).unwrap();
//! assert_eq!(attributes["id"], ParamValue::Int(123));
//! ```
//!
//! ## Low level API
//!
//! Converters can be used on their own through the [`HasherRegistry`].
//!
//! ```
//! use paramhash::{HasherConfig, HasherRegistry, ParamValue, Settings};
//!
//! let registry = HasherRegistry::new(Settings::new(HasherConfig::new("this is my salt"))).unwrap();
//! let converter = registry.get_converter("default").unwrap();
//! assert_eq!(converter.encode(12345).unwrap(), "NkK9");
//! assert_eq!(converter.decode("NkK9"), ParamValue::Int(12345));
//! assert_eq!(converter.decode("garbage"), ParamValue::from("garbage"));
//! ```

mod codec;
mod config;
mod configuration;
mod converter;
mod decorator;
mod error;
mod factory;
mod handler;
mod hashids;
mod listener;
mod registry;
mod resolver;
mod router;
mod transform;

pub use codec::{Codec, CodecError};
pub use config::{
    Algorithm, HasherConfig, Settings, DEFAULT_ALPHABET, DEFAULT_HASHER, MAX_MINIMUM_LENGTH,
};
pub use configuration::{is_valid_parameter_name, HashConfiguration};
pub use converter::{
    build_converter, Converter, EncryptedConverter, HashidsConverter, ParamValue, Parameters,
};
pub use decorator::RouterDecorator;
pub use error::{Error, Result};
pub use factory::ParameterTransformFactory;
pub use handler::{
    parse_controller, resolve_controller, HandlerCatalog, HandlerMethod, HashAttribute,
    InMemoryCatalog, MethodKey, CALLABLE_METHOD,
};
pub use hashids::Hashids;
pub use listener::ParameterDecoder;
pub use registry::HasherRegistry;
pub use resolver::{
    extract_legacy, extract_modern, ConfigurationCache, ConfigurationResolver, DeclarationSource,
    ResolvedConfiguration,
};
pub use router::{
    CacheWarmer, PatternRouter, ReferenceType, RequestContext, Route, RouteCollection, Router,
    CONTROLLER_ATTRIBUTE, LOCALE_ATTRIBUTE, ROUTE_ATTRIBUTE,
};
pub use transform::{
    CompositeTransform, DecodeTransform, EncodeTransform, NoOpTransform, ParameterTransform,
};
