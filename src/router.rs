//! The router contract and a small pattern-based router implementing it.
//!
//! Route paths use `{name}` placeholders, e.g. `/orders/{id}/{slug}`.

use std::collections::BTreeMap;
use std::path::Path;

use once_cell::sync::OnceCell;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;

use crate::converter::{ParamValue, Parameters};
use crate::{Error, Result};

/// Parameter naming the matched route.
pub const ROUTE_ATTRIBUTE: &str = "_route";
/// Parameter naming the handler of the matched route.
pub const CONTROLLER_ATTRIBUTE: &str = "_controller";
/// Parameter holding the request locale.
pub const LOCALE_ATTRIBUTE: &str = "_locale";

// Unreserved characters stay as they are, everything else is escaped.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Form of a generated URL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReferenceType {
    /// `/base/orders/1`
    #[default]
    AbsolutePath,
    /// `https://example.com/base/orders/1`
    AbsoluteUrl,
    /// `../orders/1`, relative to the current path
    RelativePath,
    /// `//example.com/base/orders/1`
    NetworkPath,
}

/// Information about the current request used when generating URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    base_url: String,
    path_info: String,
    method: String,
    host: String,
    scheme: String,
    http_port: u16,
    https_port: u16,
    parameters: BTreeMap<String, String>,
}

impl Default for RequestContext {
    fn default() -> Self {
        RequestContext {
            base_url: String::new(),
            path_info: "/".to_string(),
            method: "GET".to_string(),
            host: "localhost".to_string(),
            scheme: "http".to_string(),
            http_port: 80,
            https_port: 443,
            parameters: BTreeMap::new(),
        }
    }
}

impl RequestContext {
    pub fn new() -> Self {
        RequestContext::default()
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_path_info(mut self, path_info: impl Into<String>) -> Self {
        self.path_info = path_info.into();
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    pub fn with_ports(mut self, http_port: u16, https_port: u16) -> Self {
        self.http_port = http_port;
        self.https_port = https_port;
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn path_info(&self) -> &str {
        &self.path_info
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }

    fn authority(&self) -> String {
        let port = match self.scheme.as_str() {
            "http" if self.http_port != 80 => Some(self.http_port),
            "https" if self.https_port != 443 => Some(self.https_port),
            _ => None,
        };
        match port {
            Some(port) => format!("{}:{}", self.host, port),
            None => self.host.clone(),
        }
    }
}

/// A route definition: path pattern, handler reference and defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    path: String,
    controller: Option<String>,
    defaults: Parameters,
}

impl Route {
    pub fn new(path: impl Into<String>) -> Self {
        Route {
            path: path.into(),
            controller: None,
            defaults: Parameters::new(),
        }
    }

    /// Sets the handler reference, e.g. `OrderController::show`.
    pub fn controller(mut self, controller: impl Into<String>) -> Self {
        self.controller = Some(controller.into());
        self
    }

    /// Sets a default value for a parameter.
    pub fn default_value(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.defaults.insert(name.into(), value.into());
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn get_controller(&self) -> Option<&str> {
        self.controller.as_deref()
    }

    pub fn defaults(&self) -> &Parameters {
        &self.defaults
    }

    /// Placeholder names in path order.
    pub fn variables(&self) -> Vec<&str> {
        let mut names = Vec::new();
        let mut rest = self.path.as_str();
        while let Some(start) = rest.find('{') {
            let Some(len) = rest[start..].find('}') else {
                break;
            };
            let name = &rest[start + 1..start + len];
            if !name.is_empty() {
                names.push(name);
            }
            rest = &rest[start + len + 1..];
        }
        names
    }
}

/// Named routes in registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteCollection {
    routes: Vec<(String, Route)>,
}

impl RouteCollection {
    pub fn new() -> Self {
        RouteCollection::default()
    }

    /// Adds a route, replacing any route with the same name.
    pub fn add(&mut self, name: impl Into<String>, route: Route) -> &mut Self {
        let name = name.into();
        self.routes.retain(|(existing, _)| *existing != name);
        self.routes.push((name, route));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Route> {
        self.routes
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, route)| route)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Route)> {
        self.routes.iter().map(|(name, route)| (name.as_str(), route))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Finds `name`, falling back to `name.<locale>` with the locale taken from
    /// `parameters` or the context.
    pub fn find_localized(
        &self,
        name: &str,
        parameters: &Parameters,
        context: &RequestContext,
    ) -> Option<&Route> {
        if let Some(route) = self.get(name) {
            return Some(route);
        }
        let locale = match parameters.get(LOCALE_ATTRIBUTE) {
            Some(locale) => locale.to_string(),
            None => context.parameter(LOCALE_ATTRIBUTE)?.to_string(),
        };
        self.get(&format!("{}.{}", name, locale))
    }
}

/// Something that can precompute state ahead of the first request.
pub trait CacheWarmer {
    /// Warms caches under `cache_dir`, returning what was warmed.
    fn warm_up(&self, cache_dir: &Path) -> Result<Vec<String>>;
}

/// URL generation and matching.
pub trait Router {
    fn generate(
        &self,
        name: &str,
        parameters: Parameters,
        reference_type: ReferenceType,
    ) -> Result<String>;

    /// Matches a path, returning its parameters plus `_route` and `_controller`.
    fn match_path(&self, path: &str) -> Result<Parameters>;

    fn route_collection(&self) -> &RouteCollection;

    fn context(&self) -> &RequestContext;

    fn set_context(&mut self, context: RequestContext);

    /// The router's cache warmer, if it has one.
    fn as_cache_warmer(&self) -> Option<&dyn CacheWarmer> {
        None
    }
}

struct CompiledRoute {
    name: String,
    regex: Regex,
    variables: Vec<String>,
}

/// Router over a fixed [`RouteCollection`].
pub struct PatternRouter {
    routes: RouteCollection,
    context: RequestContext,
    compiled: OnceCell<Vec<CompiledRoute>>,
}

impl PatternRouter {
    pub fn new(routes: RouteCollection) -> Self {
        PatternRouter {
            routes,
            context: RequestContext::default(),
            compiled: OnceCell::new(),
        }
    }

    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = context;
        self
    }

    fn compiled(&self) -> &[CompiledRoute] {
        self.compiled.get_or_init(|| {
            self.routes
                .iter()
                .map(|(name, route)| compile(name, route))
                .collect()
        })
    }

    fn expand_path(&self, name: &str, route: &Route, parameters: &Parameters) -> Result<String> {
        let variables = route.variables();
        let missing: Vec<String> = variables
            .iter()
            .filter(|&&v| !parameters.contains_key(v) && !route.defaults().contains_key(v))
            .map(|v| v.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(Error::MissingParameters {
                route: name.to_string(),
                parameters: missing,
            });
        }

        let mut path = String::with_capacity(route.path().len());
        let mut rest = route.path();
        while let Some(start) = rest.find('{') {
            let Some(len) = rest[start..].find('}') else {
                break;
            };
            path.push_str(&rest[..start]);
            let variable = &rest[start + 1..start + len];
            let value = parameters
                .get(variable)
                .or_else(|| route.defaults().get(variable))
                .map(ToString::to_string)
                .unwrap_or_default();
            if value.is_empty() {
                return Err(Error::InvalidParameterValue {
                    name: variable.to_string(),
                    value,
                });
            }
            path.extend(utf8_percent_encode(&value, COMPONENT));
            rest = &rest[start + len + 1..];
        }
        path.push_str(rest);
        Ok(path)
    }
}

fn compile(name: &str, route: &Route) -> CompiledRoute {
    let mut pattern = String::from("^");
    let mut variables = Vec::new();
    let mut rest = route.path();
    while let Some(start) = rest.find('{') {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        pattern.push_str(&regex::escape(&rest[..start]));
        pattern.push_str("([^/]+)");
        variables.push(rest[start + 1..start + len].to_string());
        rest = &rest[start + len + 1..];
    }
    pattern.push_str(&regex::escape(rest));
    pattern.push('$');

    CompiledRoute {
        name: name.to_string(),
        regex: Regex::new(&pattern).expect("Escaped pattern should be valid"),
        variables,
    }
}

fn query_string(parameters: &Parameters, route: &Route, variables: &[&str]) -> String {
    parameters
        .iter()
        .filter(|(name, _)| !name.starts_with('_') && !variables.contains(&name.as_str()))
        .filter(|(name, value)| route.defaults().get(*name) != Some(*value))
        .map(|(name, value)| {
            format!(
                "{}={}",
                utf8_percent_encode(name, COMPONENT),
                utf8_percent_encode(&value.to_string(), COMPONENT)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Path from the directory of `base` to `target`, both absolute.
fn relative_path(base: &str, target: &str) -> String {
    if base == target {
        return String::new();
    }
    let mut source: Vec<&str> = base.trim_start_matches('/').split('/').collect();
    let mut target_dirs: Vec<&str> = target.trim_start_matches('/').split('/').collect();
    source.pop();
    let target_file = target_dirs.pop().unwrap_or_default();

    let common = source
        .iter()
        .zip(target_dirs.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let ups = source.len() - common;
    target_dirs.drain(..common);
    target_dirs.push(target_file);

    let path = format!("{}{}", "../".repeat(ups), target_dirs.join("/"));
    let first_slash = path.find('/');
    let colon_first = match (path.find(':'), first_slash) {
        (Some(colon), Some(slash)) => colon < slash,
        (Some(_), None) => true,
        _ => false,
    };
    if path.is_empty() || path.starts_with('/') || colon_first {
        format!("./{}", path)
    } else {
        path
    }
}

impl Router for PatternRouter {
    fn generate(
        &self,
        name: &str,
        parameters: Parameters,
        reference_type: ReferenceType,
    ) -> Result<String> {
        let route = self
            .routes
            .find_localized(name, &parameters, &self.context)
            .ok_or_else(|| Error::RouteNotFound {
                name: name.to_string(),
            })?;

        let path = self.expand_path(name, route, &parameters)?;
        let query = query_string(&parameters, route, &route.variables());
        let query = if query.is_empty() {
            query
        } else {
            format!("?{}", query)
        };
        let url = format!("{}{}", self.context.base_url(), path);

        Ok(match reference_type {
            ReferenceType::AbsolutePath => format!("{}{}", url, query),
            ReferenceType::AbsoluteUrl => format!(
                "{}://{}{}{}",
                self.context.scheme(),
                self.context.authority(),
                url,
                query
            ),
            ReferenceType::NetworkPath => format!("//{}{}{}", self.context.authority(), url, query),
            ReferenceType::RelativePath => {
                let base = format!("{}{}", self.context.base_url(), self.context.path_info());
                format!("{}{}", relative_path(&base, &url), query)
            }
        })
    }

    fn match_path(&self, path: &str) -> Result<Parameters> {
        let path_only = path.split('?').next().unwrap_or_default();
        for compiled in self.compiled() {
            let Some(captures) = compiled.regex.captures(path_only) else {
                continue;
            };
            let route = self
                .routes
                .get(&compiled.name)
                .expect("Compiled routes come from the collection");

            let mut parameters = route.defaults().clone();
            for (variable, capture) in compiled.variables.iter().zip(captures.iter().skip(1)) {
                if let Some(capture) = capture {
                    let value = percent_decode_str(capture.as_str()).decode_utf8_lossy();
                    parameters.insert(variable.clone(), ParamValue::Str(value.into_owned()));
                }
            }
            parameters.insert(ROUTE_ATTRIBUTE.to_string(), compiled.name.as_str().into());
            if let Some(controller) = route.get_controller() {
                parameters.insert(CONTROLLER_ATTRIBUTE.to_string(), controller.into());
            }
            return Ok(parameters);
        }
        Err(Error::NoMatch {
            path: path.to_string(),
        })
    }

    fn route_collection(&self) -> &RouteCollection {
        &self.routes
    }

    fn context(&self) -> &RequestContext {
        &self.context
    }

    fn set_context(&mut self, context: RequestContext) {
        self.context = context;
    }

    fn as_cache_warmer(&self) -> Option<&dyn CacheWarmer> {
        Some(self)
    }
}

impl CacheWarmer for PatternRouter {
    /// Compiles the route patterns. Nothing is written to `cache_dir`.
    fn warm_up(&self, _cache_dir: &Path) -> Result<Vec<String>> {
        Ok(self.compiled().iter().map(|c| c.name.clone()).collect())
    }
}
