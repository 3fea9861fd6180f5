//! Human-readable error descriptions and structured JSON error formatting.

use cover_core::error::{BuildError, CoverError};

fn find<'a, T: std::error::Error + 'static>(err: &'a eyre::Report) -> Option<&'a T> {
    err.chain().find_map(|e| e.downcast_ref::<T>())
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = find::<BuildError>(err) {
        return match be {
            BuildError::MissingActivator => {
                "What happened: No activation device was provided to the cover.\nLikely causes: The button/switch output failed to initialize or was not wired into the builder.\nHow to fix: Ensure the activation output is created successfully and passed via with_activator(...).".to_string()
            }
            BuildError::MissingOpenEndstop | BuildError::MissingCloseEndstop => format!(
                "What happened: {be}.\nLikely causes: An endstop input failed to initialize or was not wired into the builder.\nHow to fix: Check open_endstop/close_endstop in the config and the sensor wiring."
            ),
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Zero or inconsistent durations in the [cover] section.\nHow to fix: Edit the config file, then rerun `check`."
            ),
        };
    }

    if let Some(ce) = find::<CoverError>(err) {
        return match ce {
            CoverError::DeviceFault(msg) => format!(
                "What happened: The activation device failed ({msg}).\nLikely causes: Relay board unpowered or unplugged, wrong pin, or missing GPIO permissions.\nHow to fix: Check the door_activate_button/door_switch wiring and pin, then restart. The door state was not changed."
            ),
            CoverError::Config(msg) => format!(
                "What happened: Configuration is invalid ({msg}).\nLikely causes: Missing or out-of-range values in the [cover] section.\nHow to fix: Edit the config file and run `check` until it passes."
            ),
            CoverError::InvalidCommand(msg) => format!(
                "What happened: Command not understood ({msg}).\nLikely causes: Typo or a position outside 0..1.\nHow to fix: Use open, close, stop, toggle, or `position 0.4`; scripts look like \"0:open,6s:stop\"."
            ),
            CoverError::State(msg) => format!(
                "What happened: {msg}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from init
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("open gpio") || (lower.contains("pin") && lower.contains("open")) {
        return "What happened: Failed to initialize GPIO pins.\nLikely causes: Incorrect pin numbers or insufficient GPIO permissions.\nHow to fix: Fix the pins in the config; ensure the process has permission to access GPIO.".to_string();
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: 2 for configuration and usage problems, 3 for device faults, 1 otherwise.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if find::<BuildError>(err).is_some() {
        return 2;
    }
    match find::<CoverError>(err) {
        Some(CoverError::Config(_) | CoverError::InvalidCommand(_)) => 2,
        Some(CoverError::DeviceFault(_)) => 3,
        _ => 1,
    }
}

pub fn reason_name(err: &eyre::Report) -> &'static str {
    if find::<BuildError>(err).is_some() {
        return "Build";
    }
    match find::<CoverError>(err) {
        Some(CoverError::DeviceFault(_)) => "DeviceFault",
        Some(CoverError::Config(_)) => "Config",
        Some(CoverError::InvalidCommand(_)) => "InvalidCommand",
        Some(CoverError::State(_)) => "State",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;
    json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}
