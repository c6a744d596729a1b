//! Fuzz target for unit batch parsing and feature derivation.
//!
//! Input files come from outside the tool, so parsing and the ratio
//! transforms must reject bad records without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tt_config::default_features;
use tt_core::features::transform_units;
use tt_core::input::parse_units;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(units) = parse_units(text) {
        if let Ok((matrix, report)) = transform_units(&units, &default_features()) {
            assert_eq!(report.retained + report.excluded.len(), report.total);
            assert_eq!(matrix.len(), report.retained);
            assert!(matrix.values.is_finite());
        }
    }
});
