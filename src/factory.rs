use std::sync::Arc;

use crate::handler::HandlerMethod;
use crate::registry::HasherRegistry;
use crate::resolver::{ConfigurationResolver, ResolvedConfiguration};
use crate::router::Route;
use crate::transform::{
    CompositeTransform, DecodeTransform, EncodeTransform, NoOpTransform, ParameterTransform,
};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Encode,
    Decode,
}

/// Builds the transform that applies to a route or a handler method.
///
/// Metadata that cannot be determined (unknown controller, missing method,
/// unknown hasher) yields a [`NoOpTransform`] instead of an error, so that
/// URL generation keeps working. Invalid declarations are still reported.
pub struct ParameterTransformFactory {
    registry: Arc<HasherRegistry>,
    resolver: ConfigurationResolver,
}

impl ParameterTransformFactory {
    pub fn new(registry: Arc<HasherRegistry>, resolver: ConfigurationResolver) -> Self {
        ParameterTransformFactory { registry, resolver }
    }

    pub fn registry(&self) -> &Arc<HasherRegistry> {
        &self.registry
    }

    pub fn resolver(&self) -> &ConfigurationResolver {
        &self.resolver
    }

    /// Transform for parameters passed to URL generation for `route`.
    pub fn create_encode_transform(&self, route: &Route) -> Result<Box<dyn ParameterTransform>> {
        match route.get_controller() {
            Some(reference) => self.for_controller(reference, Direction::Encode),
            None => Ok(Box::new(NoOpTransform)),
        }
    }

    /// Transform for matched parameters before `method` is invoked.
    pub fn create_decode_transform(
        &self,
        method: &HandlerMethod,
    ) -> Result<Box<dyn ParameterTransform>> {
        let resolved = self.resolver.resolve(method);
        self.recover(resolved, method.key().to_string())
            .and_then(|resolved| self.build(resolved, Direction::Decode))
    }

    /// Transform for matched parameters of the handler behind a controller reference.
    pub fn create_decode_transform_for_controller(
        &self,
        reference: &str,
    ) -> Result<Box<dyn ParameterTransform>> {
        self.for_controller(reference, Direction::Decode)
    }

    fn for_controller(
        &self,
        reference: &str,
        direction: Direction,
    ) -> Result<Box<dyn ParameterTransform>> {
        let resolved = self.resolver.resolve_controller(reference);
        self.recover(resolved, reference.to_string())
            .and_then(|resolved| self.build(resolved, direction))
    }

    fn recover(
        &self,
        resolved: Result<Option<Arc<ResolvedConfiguration>>>,
        handler: String,
    ) -> Result<Option<Arc<ResolvedConfiguration>>> {
        match resolved {
            Err(e) if e.is_recoverable() => {
                tracing::warn!(%handler, error = %e, "cannot resolve hashed parameters, leaving them as they are");
                Ok(None)
            }
            other => other,
        }
    }

    fn build(
        &self,
        resolved: Option<Arc<ResolvedConfiguration>>,
        direction: Direction,
    ) -> Result<Box<dyn ParameterTransform>> {
        let Some(resolved) = resolved else {
            return Ok(Box::new(NoOpTransform));
        };

        // One group per effective hasher, so an unnamed marker and one naming
        // the default hasher share a converter.
        let mut groups: Vec<(&str, Vec<String>)> = Vec::new();
        for config in resolved.configurations().iter().filter(|c| !c.is_empty()) {
            let hasher = self.registry.resolve_name(config.hasher());
            let claimed = |name: &String| groups.iter().any(|(_, names)| names.contains(name));
            let fresh: Vec<String> = config
                .parameters()
                .iter()
                .filter(|name| !claimed(*name))
                .cloned()
                .collect();
            match groups.iter_mut().find(|(name, _)| *name == hasher) {
                Some((_, names)) => names.extend(fresh),
                None if !fresh.is_empty() => groups.push((hasher, fresh)),
                None => {}
            }
        }

        let mut transforms: Vec<Box<dyn ParameterTransform>> = Vec::new();
        for (hasher, parameters) in groups {
            let converter = match self.registry.get_converter(hasher) {
                Ok(converter) => converter,
                Err(e @ Error::HasherNotFound { .. }) => {
                    tracing::warn!(error = %e, ?parameters, "skipping hashed parameters");
                    continue;
                }
                Err(e) => return Err(e),
            };
            transforms.push(match direction {
                Direction::Encode => {
                    Box::new(EncodeTransform::new(converter, parameters)) as Box<dyn ParameterTransform>
                }
                Direction::Decode => Box::new(DecodeTransform::new(converter, parameters)),
            });
        }

        Ok(match transforms.len() {
            0 => Box::new(NoOpTransform) as Box<dyn ParameterTransform>,
            1 => transforms.remove(0),
            _ => Box::new(CompositeTransform::new(transforms)),
        })
    }
}
