use std::sync::Arc;

use crate::converter::{ParamValue, Parameters};
use crate::factory::ParameterTransformFactory;
use crate::handler::HandlerMethod;
use crate::router::CONTROLLER_ATTRIBUTE;
use crate::Result;

/// Turns hashed path parameters back into integers after routing.
///
/// Hosts call this between matching a request and invoking its handler.
pub struct ParameterDecoder {
    factory: Arc<ParameterTransformFactory>,
}

impl ParameterDecoder {
    pub fn new(factory: Arc<ParameterTransformFactory>) -> Self {
        ParameterDecoder { factory }
    }

    /// Decodes matched attributes in place, finding the handler through `_controller`.
    pub fn decode(&self, attributes: &mut Parameters) -> Result<()> {
        let Some(controller) = attributes
            .get(CONTROLLER_ATTRIBUTE)
            .and_then(ParamValue::as_str)
            .map(str::to_string)
        else {
            return Ok(());
        };

        let transform = self
            .factory
            .create_decode_transform_for_controller(&controller)?;
        if transform.need_to_process() {
            transform.process(attributes)?;
        }
        Ok(())
    }

    /// Decodes attributes for a handler the host has already located.
    pub fn decode_for(&self, method: &HandlerMethod, attributes: &mut Parameters) -> Result<()> {
        let transform = self.factory.create_decode_transform(method)?;
        transform.process(attributes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HasherConfig, Settings};
    use crate::handler::{HashAttribute, InMemoryCatalog};
    use crate::registry::HasherRegistry;
    use crate::resolver::{ConfigurationCache, ConfigurationResolver};

    fn decoder() -> ParameterDecoder {
        let mut catalog = InMemoryCatalog::new();
        catalog.register(
            HandlerMethod::new("OrderController", "show").with_attribute(HashAttribute::new("id")),
        );
        ParameterDecoder::new(Arc::new(ParameterTransformFactory::new(
            Arc::new(
                HasherRegistry::new(Settings::new(HasherConfig::new("s").minimum_length(8)))
                    .unwrap(),
            ),
            ConfigurationResolver::new(Arc::new(ConfigurationCache::new()), Arc::new(catalog)),
        )))
    }

    fn attributes(controller: Option<&str>, id: &str) -> Parameters {
        let mut attributes = Parameters::new();
        attributes.insert("id".to_string(), id.into());
        attributes.insert("slug".to_string(), "4V6YxNrM".into());
        if let Some(controller) = controller {
            attributes.insert(CONTROLLER_ATTRIBUTE.to_string(), controller.into());
        }
        attributes
    }

    #[test]
    fn test_decode() {
        let mut attributes = attributes(Some("OrderController::show"), "4V6YxNrM");
        decoder().decode(&mut attributes).unwrap();
        assert_eq!(attributes["id"], ParamValue::Int(123));
        assert_eq!(attributes["slug"], ParamValue::from("4V6YxNrM"));
    }

    #[test]
    fn test_foreign_token_passes_through() {
        let mut attributes = attributes(Some("OrderController::show"), "hand-edited");
        decoder().decode(&mut attributes).unwrap();
        assert_eq!(attributes["id"], ParamValue::from("hand-edited"));
    }

    #[test]
    fn test_without_controller() {
        let decoder = decoder();
        for controller in [None, Some("Unknown::show"), Some("??")] {
            let mut attributes = attributes(controller, "4V6YxNrM");
            let before = attributes.clone();
            decoder.decode(&mut attributes).unwrap();
            assert_eq!(attributes, before);
        }
    }

    #[test]
    fn test_decode_for() {
        let method = HandlerMethod::new("Standalone", "show").with_doc_comment(r#"@Hash("id")"#);
        let mut attributes = attributes(None, "4V6YxNrM");
        decoder().decode_for(&method, &mut attributes).unwrap();
        assert_eq!(attributes["id"], ParamValue::Int(123));
    }
}
