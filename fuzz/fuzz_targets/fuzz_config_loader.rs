#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parsing either format and validating must never panic.
    if let Ok(cfg) = cover_config::load_toml(data) {
        let _ = cfg.validate();
    }
    if let Ok(cfg) = cover_config::load_yaml(data) {
        let _ = cfg.validate();
    }
    let _ = cover_config::parse_duration_ms(data);
});
