use std::sync::Arc;

use crate::converter::{Converter, ParamValue, Parameters};
use crate::Result;

/// Rewrites a fixed set of named parameters in place.
///
/// Names absent from the map are skipped, and keys that are not configured
/// are never touched.
pub trait ParameterTransform: Send + Sync {
    fn process(&self, parameters: &mut Parameters) -> Result<()>;

    /// False when processing cannot change anything.
    fn need_to_process(&self) -> bool;
}

/// Replaces integer parameters with tokens.
pub struct EncodeTransform {
    converter: Arc<dyn Converter>,
    parameters: Vec<String>,
}

impl EncodeTransform {
    pub fn new(converter: Arc<dyn Converter>, parameters: Vec<String>) -> Self {
        EncodeTransform {
            converter,
            parameters,
        }
    }

    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }
}

impl ParameterTransform for EncodeTransform {
    fn process(&self, parameters: &mut Parameters) -> Result<()> {
        for name in &self.parameters {
            if let Some(value) = parameters.get_mut(name) {
                let token = self.converter.encode_value(value)?;
                tracing::trace!(parameter = %name, %value, %token, "encoded parameter");
                *value = ParamValue::Str(token);
            }
        }
        Ok(())
    }

    fn need_to_process(&self) -> bool {
        !self.parameters.is_empty()
    }
}

/// Replaces tokens with the integers they carry; foreign tokens stay as they are.
pub struct DecodeTransform {
    converter: Arc<dyn Converter>,
    parameters: Vec<String>,
}

impl DecodeTransform {
    pub fn new(converter: Arc<dyn Converter>, parameters: Vec<String>) -> Self {
        DecodeTransform {
            converter,
            parameters,
        }
    }

    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }
}

impl ParameterTransform for DecodeTransform {
    fn process(&self, parameters: &mut Parameters) -> Result<()> {
        for name in &self.parameters {
            if let Some(value) = parameters.get_mut(name) {
                let decoded = self.converter.decode_value(value);
                tracing::trace!(parameter = %name, token = %value, value = %decoded, "decoded parameter");
                *value = decoded;
            }
        }
        Ok(())
    }

    fn need_to_process(&self) -> bool {
        !self.parameters.is_empty()
    }
}

/// Leaves parameters alone.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpTransform;

impl ParameterTransform for NoOpTransform {
    fn process(&self, _parameters: &mut Parameters) -> Result<()> {
        Ok(())
    }

    fn need_to_process(&self) -> bool {
        false
    }
}

/// Applies several transforms in order, one per hasher.
#[derive(Default)]
pub struct CompositeTransform {
    transforms: Vec<Box<dyn ParameterTransform>>,
}

impl CompositeTransform {
    pub fn new(transforms: Vec<Box<dyn ParameterTransform>>) -> Self {
        CompositeTransform { transforms }
    }

    pub fn push(&mut self, transform: Box<dyn ParameterTransform>) {
        self.transforms.push(transform);
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

impl ParameterTransform for CompositeTransform {
    fn process(&self, parameters: &mut Parameters) -> Result<()> {
        for transform in self.transforms.iter().filter(|t| t.need_to_process()) {
            transform.process(parameters)?;
        }
        Ok(())
    }

    fn need_to_process(&self) -> bool {
        self.transforms.iter().any(|t| t.need_to_process())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HasherConfig;
    use crate::converter::HashidsConverter;
    use crate::Error;

    fn converter(salt: &str) -> Arc<dyn Converter> {
        Arc::new(HashidsConverter::new(&HasherConfig::new(salt).minimum_length(8)))
    }

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn params(entries: &[(&str, ParamValue)]) -> Parameters {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_encode() {
        let transform = EncodeTransform::new(converter("s"), names(&["id", "missing"]));
        let mut parameters = params(&[("id", 123.into()), ("slug", "abc".into())]);

        transform.process(&mut parameters).unwrap();
        assert_eq!(
            parameters,
            params(&[("id", "4V6YxNrM".into()), ("slug", "abc".into())])
        );
        assert!(transform.need_to_process());
    }

    #[test]
    fn test_encode_failure() {
        let transform = EncodeTransform::new(converter("s"), names(&["id"]));
        let mut parameters = params(&[("id", "abc".into())]);
        assert!(matches!(
            transform.process(&mut parameters),
            Err(Error::EncodingFailed { .. })
        ));
    }

    #[test]
    fn test_decode() {
        let transform = DecodeTransform::new(converter("s"), names(&["id", "other"]));
        let mut parameters = params(&[
            ("id", "4V6YxNrM".into()),
            ("other", "garbage".into()),
            ("slug", "4V6YxNrM".into()),
        ]);

        transform.process(&mut parameters).unwrap();
        assert_eq!(
            parameters,
            params(&[
                ("id", 123.into()),
                ("other", "garbage".into()),
                ("slug", "4V6YxNrM".into()),
            ])
        );
    }

    #[test]
    fn test_noop() {
        let mut parameters = params(&[("id", 123.into())]);
        let before = parameters.clone();
        NoOpTransform.process(&mut parameters).unwrap();
        assert_eq!(parameters, before);
        assert!(!NoOpTransform.need_to_process());
    }

    #[test]
    fn test_need_to_process_empty() {
        assert!(!EncodeTransform::new(converter("s"), Vec::new()).need_to_process());
        assert!(!DecodeTransform::new(converter("s"), Vec::new()).need_to_process());
        assert!(!CompositeTransform::default().need_to_process());
    }

    #[test]
    fn test_composite_uses_each_converter() {
        let default = converter("s");
        let secure = converter("another salt");
        let transform = CompositeTransform::new(vec![
            Box::new(EncodeTransform::new(default.clone(), names(&["id"]))),
            Box::new(EncodeTransform::new(secure.clone(), names(&["userId"]))),
        ]);
        let mut parameters = params(&[("id", 7.into()), ("userId", 7.into())]);

        transform.process(&mut parameters).unwrap();
        let id = parameters["id"].to_string();
        let user_id = parameters["userId"].to_string();
        assert_ne!(id, user_id);
        assert_eq!(default.decode(&id), ParamValue::Int(7));
        assert_eq!(secure.decode(&user_id), ParamValue::Int(7));
        assert_eq!(transform.len(), 2);
    }
}
