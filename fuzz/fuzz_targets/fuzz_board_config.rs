//! Fuzz target: `BoardConfig::from_json`
//!
//! Feeds arbitrary bytes to the configuration parser and asserts that it
//! never panics and that anything it accepts passes validation again.
//!
//! cargo fuzz run fuzz_board_config

#![no_main]

use explorerhat::BoardConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    if let Ok(config) = BoardConfig::from_json(text) {
        assert!(config.validate().is_ok());
        assert!(config.output_timing().pulse_fps >= 1);
    }
});
