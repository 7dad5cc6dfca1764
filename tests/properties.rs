use std::sync::Arc;

use paramhash::{
    Algorithm, Converter, DecodeTransform, EncodeTransform, HasherConfig, HasherRegistry,
    NoOpTransform, ParamValue, ParameterTransform, Parameters, Settings,
};
use proptest::prelude::*;

fn registry(salt: &str, minimum_length: usize) -> HasherRegistry {
    let settings = Settings::new(HasherConfig::new(salt).minimum_length(minimum_length))
        .hasher(
            "secure",
            HasherConfig::new(format!("{} key", salt)).algorithm(Algorithm::Encrypted),
        );
    HasherRegistry::new(settings).unwrap()
}

fn converters(salt: &str, minimum_length: usize) -> Vec<Arc<dyn Converter>> {
    let registry = registry(salt, minimum_length);
    ["default", "secure"]
        .iter()
        .map(|name| registry.get_converter(name).unwrap())
        .collect()
}

proptest! {
    #[test]
    fn decode_inverts_encode(n in 0u64..=i64::MAX as u64, salt in "[a-z ]{0,12}", minimum_length in 0usize..20) {
        for converter in converters(&salt, minimum_length) {
            let token = converter.encode(n).unwrap();
            prop_assert_eq!(converter.decode(&token), ParamValue::Int(n as i64));
        }
    }

    #[test]
    fn encode_is_deterministic(n in any::<u64>(), salt in "[a-zA-Z0-9]{0,12}") {
        let first = converters(&salt, 8);
        let second = converters(&salt, 8);
        for (a, b) in first.iter().zip(second.iter()) {
            prop_assert_eq!(a.encode(n).unwrap(), b.encode(n).unwrap());
        }
    }

    #[test]
    fn decode_never_panics(token in "\\PC{0,40}") {
        for converter in converters("s", 8) {
            match converter.decode(&token) {
                ParamValue::Str(s) => prop_assert_eq!(s, token.clone()),
                ParamValue::Int(n) => prop_assert!(n >= 0),
            }
        }
    }

    #[test]
    fn hashids_pads_to_minimum_length(n in any::<u64>(), minimum_length in 0usize..40) {
        let converter = registry("pad", minimum_length).get_converter("default").unwrap();
        prop_assert!(converter.encode(n).unwrap().len() >= minimum_length);
    }

    #[test]
    fn unconfigured_keys_are_untouched(
        extra in prop::collection::btree_map("[a-z]{1,8}", "[a-zA-Z0-9]{0,8}", 0..6),
        id in 0i64..1_000_000,
    ) {
        let converter = registry("s", 8).get_converter("default").unwrap();
        let mut parameters: Parameters = extra
            .iter()
            .filter(|(k, _)| k.as_str() != "id")
            .map(|(k, v)| (k.clone(), ParamValue::Str(v.clone())))
            .collect();
        let untouched = parameters.clone();
        parameters.insert("id".to_string(), ParamValue::Int(id));

        let transforms: Vec<Box<dyn ParameterTransform>> = vec![
            Box::new(EncodeTransform::new(converter.clone(), vec!["id".to_string()])),
            Box::new(DecodeTransform::new(converter.clone(), vec!["id".to_string()])),
            Box::new(NoOpTransform),
        ];
        for transform in &transforms {
            let mut processed = parameters.clone();
            transform.process(&mut processed).unwrap();
            processed.remove("id");
            prop_assert_eq!(&processed, &untouched);
        }
    }
}
