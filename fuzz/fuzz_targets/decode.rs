#![no_main]
use libfuzzer_sys::fuzz_target;
use paramhash::{Algorithm, HasherConfig, HasherRegistry, Settings};

fuzz_target!(|data: &[u8]| {
    let settings = Settings::new(HasherConfig::new("random-key").minimum_length(8)).hasher(
        "secure",
        HasherConfig::new("random-key").algorithm(Algorithm::Encrypted),
    );
    let registry = HasherRegistry::new(settings).unwrap();
    let token = String::from_utf8_lossy(data);
    for name in ["default", "secure"] {
        let _ = registry.get_converter(name).unwrap().decode(&token);
    }
});
