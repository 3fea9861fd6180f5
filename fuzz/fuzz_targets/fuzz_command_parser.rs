#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    if let Ok(cmd) = data.parse::<cover_core::CoverCommand>() {
        // Display output must be accepted by the parser again.
        let again = cmd.to_string().parse::<cover_core::CoverCommand>();
        assert!(again.is_ok(), "{cmd} does not parse back");
    }
    if let Ok(mut script) = data.parse::<cover_core::Script>() {
        let end = script.last_at_ms();
        let _ = script.take_due(end);
        assert!(script.is_done());
    }
});
