//! Fuzz target for tract_typology.json parsing and validation.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tt_config::{validate_config, TypologyConfig};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    // Should never panic, only return an error
    if let Ok(config) = TypologyConfig::from_str(text) {
        let _ = validate_config(&config);
    }
});
