use std::path::Path;
use std::sync::Arc;

use crate::converter::Parameters;
use crate::factory::ParameterTransformFactory;
use crate::router::{CacheWarmer, ReferenceType, RequestContext, RouteCollection, Router};
use crate::Result;

/// Wraps a router so that generated URLs carry hashed parameters.
///
/// Only [`Router::generate`] is intercepted; everything else goes straight to
/// the wrapped router. Routes whose name starts with `_` (profiler, assets and
/// other internal routes) are never rewritten.
///
/// ```
/// use std::sync::Arc;
/// use paramhash::{
///     ConfigurationCache, ConfigurationResolver, HandlerMethod, HashAttribute, HasherConfig,
///     HasherRegistry, InMemoryCatalog, ParameterTransformFactory, Parameters, PatternRouter,
///     ReferenceType, Route, RouteCollection, Router, RouterDecorator, Settings,
/// };
///
/// let mut catalog = InMemoryCatalog::new();
/// catalog.register(HandlerMethod::new("OrderController", "show").with_attribute(HashAttribute::new("id")));
///
/// let mut routes = RouteCollection::new();
/// routes.add("order_show", Route::new("/orders/{id}").controller("OrderController::show"));
///
/// let factory = ParameterTransformFactory::new(
///     Arc::new(HasherRegistry::new(Settings::new(HasherConfig::new("s").minimum_length(8))).unwrap()),
///     ConfigurationResolver::new(Arc::new(ConfigurationCache::new()), Arc::new(catalog)),
/// );
/// let router = RouterDecorator::new(PatternRouter::new(routes), Arc::new(factory));
///
/// let mut parameters = Parameters::new();
/// parameters.insert("id".to_string(), 123.into());
/// let url = router.generate("order_show", parameters, ReferenceType::AbsolutePath).unwrap();
/// assert_eq!(url, "/orders/4V6YxNrM");
/// ```
pub struct RouterDecorator<R: Router> {
    inner: R,
    factory: Arc<ParameterTransformFactory>,
}

impl<R: Router> RouterDecorator<R> {
    pub fn new(inner: R, factory: Arc<ParameterTransformFactory>) -> Self {
        RouterDecorator { inner, factory }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    pub fn factory(&self) -> &Arc<ParameterTransformFactory> {
        &self.factory
    }

    fn encode_parameters(&self, name: &str, parameters: &mut Parameters) -> Result<()> {
        if name.starts_with('_') {
            return Ok(());
        }
        let Some(route) = self.inner.route_collection().find_localized(
            name,
            parameters,
            self.inner.context(),
        ) else {
            return Ok(());
        };

        let transform = self.factory.create_encode_transform(route)?;
        if transform.need_to_process() {
            transform.process(parameters)?;
        }
        Ok(())
    }
}

impl<R: Router> Router for RouterDecorator<R> {
    fn generate(
        &self,
        name: &str,
        mut parameters: Parameters,
        reference_type: ReferenceType,
    ) -> Result<String> {
        self.encode_parameters(name, &mut parameters)?;
        self.inner.generate(name, parameters, reference_type)
    }

    fn match_path(&self, path: &str) -> Result<Parameters> {
        self.inner.match_path(path)
    }

    fn route_collection(&self) -> &RouteCollection {
        self.inner.route_collection()
    }

    fn context(&self) -> &RequestContext {
        self.inner.context()
    }

    fn set_context(&mut self, context: RequestContext) {
        self.inner.set_context(context);
    }

    fn as_cache_warmer(&self) -> Option<&dyn CacheWarmer> {
        Some(self)
    }
}

impl<R: Router> CacheWarmer for RouterDecorator<R> {
    /// Warms the wrapped router; one without a cache warmer warms nothing.
    fn warm_up(&self, cache_dir: &Path) -> Result<Vec<String>> {
        match self.inner.as_cache_warmer() {
            Some(warmer) => warmer.warm_up(cache_dir),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HasherConfig, Settings};
    use crate::converter::ParamValue;
    use crate::handler::{HandlerMethod, HashAttribute, InMemoryCatalog};
    use crate::registry::HasherRegistry;
    use crate::resolver::{ConfigurationCache, ConfigurationResolver};
    use crate::router::{PatternRouter, Route};
    use std::sync::Mutex;

    fn factory() -> Arc<ParameterTransformFactory> {
        let mut catalog = InMemoryCatalog::new();
        catalog.register(
            HandlerMethod::new("OrderController", "show").with_attribute(HashAttribute::new("id")),
        );
        Arc::new(ParameterTransformFactory::new(
            Arc::new(
                HasherRegistry::new(Settings::new(HasherConfig::new("s").minimum_length(8)))
                    .unwrap(),
            ),
            ConfigurationResolver::new(Arc::new(ConfigurationCache::new()), Arc::new(catalog)),
        ))
    }

    /// Records what reaches it and generates nothing but the name.
    #[derive(Default)]
    struct RecordingRouter {
        routes: RouteCollection,
        context: RequestContext,
        generated: Mutex<Vec<(String, Parameters)>>,
    }

    impl Router for RecordingRouter {
        fn generate(
            &self,
            name: &str,
            parameters: Parameters,
            _reference_type: ReferenceType,
        ) -> Result<String> {
            self.generated
                .lock()
                .unwrap()
                .push((name.to_string(), parameters));
            Ok(name.to_string())
        }

        fn match_path(&self, _path: &str) -> Result<Parameters> {
            let mut parameters = Parameters::new();
            parameters.insert("id".to_string(), "4V6YxNrM".into());
            Ok(parameters)
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
    }

    fn recording() -> RouterDecorator<RecordingRouter> {
        let mut routes = RouteCollection::new();
        routes
            .add("order_show", Route::new("/orders/{id}").controller("OrderController::show"))
            .add("_profiler", Route::new("/_profiler/{id}").controller("OrderController::show"))
            .add("about.fr", Route::new("/a-propos/{id}").controller("OrderController::show"));
        RouterDecorator::new(
            RecordingRouter {
                routes,
                ..RecordingRouter::default()
            },
            factory(),
        )
    }

    fn forwarded(router: &RouterDecorator<RecordingRouter>) -> Parameters {
        router.inner().generated.lock().unwrap().last().unwrap().1.clone()
    }

    fn id(value: i64) -> Parameters {
        let mut parameters = Parameters::new();
        parameters.insert("id".to_string(), value.into());
        parameters
    }

    #[test]
    fn test_generate_encodes() {
        let router = recording();
        router
            .generate("order_show", id(123), ReferenceType::AbsolutePath)
            .unwrap();
        assert_eq!(forwarded(&router)["id"], ParamValue::from("4V6YxNrM"));
    }

    #[test]
    fn test_internal_routes_untouched() {
        let router = recording();
        router
            .generate("_profiler", id(123), ReferenceType::AbsolutePath)
            .unwrap();
        assert_eq!(forwarded(&router)["id"], ParamValue::Int(123));
    }

    #[test]
    fn test_unknown_route_is_forwarded_untouched() {
        let router = recording();
        router
            .generate("unknown", id(123), ReferenceType::AbsolutePath)
            .unwrap();
        assert_eq!(forwarded(&router)["id"], ParamValue::Int(123));
    }

    #[test]
    fn test_locale_fallback() {
        let mut router = recording();
        let mut parameters = id(123);
        parameters.insert("_locale".to_string(), "fr".into());
        router
            .generate("about", parameters, ReferenceType::AbsolutePath)
            .unwrap();
        assert_eq!(forwarded(&router)["id"], ParamValue::from("4V6YxNrM"));

        router.set_context(RequestContext::new().with_parameter("_locale", "fr"));
        router
            .generate("about", id(123), ReferenceType::AbsolutePath)
            .unwrap();
        assert_eq!(forwarded(&router)["id"], ParamValue::from("4V6YxNrM"));
    }

    #[test]
    fn test_passthrough() {
        let mut router = recording();
        assert_eq!(
            router.match_path("/orders/4V6YxNrM").unwrap()["id"],
            ParamValue::from("4V6YxNrM")
        );
        assert_eq!(router.route_collection().len(), 3);

        router.set_context(RequestContext::new().with_host("example.com"));
        assert_eq!(router.context().host(), "example.com");
        assert_eq!(router.inner().context().host(), "example.com");
    }

    #[test]
    fn test_warm_up_without_warmer() {
        let router = recording();
        assert!(router.warm_up(Path::new("/tmp")).unwrap().is_empty());
    }

    #[test]
    fn test_warm_up_delegates() {
        let mut routes = RouteCollection::new();
        routes.add("order_show", Route::new("/orders/{id}"));
        let router = RouterDecorator::new(PatternRouter::new(routes), factory());
        assert_eq!(router.warm_up(Path::new("/tmp")).unwrap(), ["order_show"]);
    }
}
