use cover_config::{ActivationKind, ReversePolicy, load_toml};
use rstest::rstest;

const BASE: &str = r#"
[cover]
name = "Garage"
door_activate_button = { pin = 17, id = "garage_button" }
button_press_interval = "500ms"
open_endstop = { pin = 22, active_low = true }
open_duration = "15s"
close_endstop = { pin = 23, active_low = true }
close_duration = 16000
"#;

#[test]
fn accepts_minimal_button_config() {
    let cfg = load_toml(BASE).expect("parse TOML");
    cfg.validate().expect("valid config should pass");

    let act = cfg.cover.activation().expect("activation");
    assert_eq!(act.kind, ActivationKind::Button);
    assert_eq!(act.interval_ms, 500);
    assert_eq!(act.device.label(), "garage_button");
    assert_eq!(cfg.cover.open_duration, 15_000);
    assert_eq!(cfg.cover.close_duration, 16_000);
    assert_eq!(cfg.cover.endstop_debounce, 50);
    assert_eq!(cfg.cover.publish_interval, 1000);
    assert_eq!(cfg.cover.reverse_policy, ReversePolicy::StopThenReverse);
    assert_eq!(cfg.runner.tick_ms, 20);
}

#[test]
fn accepts_switch_variant() {
    let toml = r#"
[cover]
door_switch = { pin = 5 }
switch_interval = "1s"
open_endstop = { pin = 22 }
open_duration = "20s"
close_endstop = { pin = 23 }
close_duration = "20s"
reverse_policy = "ignore"
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    cfg.validate().expect("valid");
    let act = cfg.cover.activation().unwrap();
    assert_eq!(act.kind, ActivationKind::Switch);
    assert_eq!(act.interval_ms, 1000);
    assert_eq!(act.device.label(), "gpio5");
    assert_eq!(cfg.cover.reverse_policy, ReversePolicy::Ignore);
}

#[test]
fn missing_endstop_reference_fails_to_parse() {
    let toml = r#"
[cover]
door_activate_button = { pin = 17 }
button_press_interval = 500
open_duration = 15000
close_endstop = { pin = 23 }
close_duration = 16000
"#;
    let err = load_toml(toml).expect_err("open_endstop is required");
    assert!(err.to_string().contains("open_endstop"));
}

#[rstest]
#[case("button_press_interval = \"500ms\"", "button_press_interval = 0", "button_press_interval must be > 0")]
#[case("open_duration = \"15s\"", "open_duration = 0", "open_duration must be > 0")]
#[case("close_duration = 16000", "close_duration = \"0s\"", "close_duration must be > 0")]
#[case("open_duration = \"15s\"", "open_duration = \"11min\"", "unreasonably large")]
#[case("button_press_interval = \"500ms\"", "button_press_interval = \"20s\"", "activation interval must be shorter")]
#[case("close_endstop = { pin = 23, active_low = true }", "close_endstop = { pin = 22 }", "share pin 22")]
#[case("door_activate_button = { pin = 17, id = \"garage_button\" }", "door_activate_button = { pin = 23 }", "share pin 23")]
fn rejects_invalid_values(#[case] from: &str, #[case] to: &str, #[case] needle: &str) {
    let toml = BASE.replace(from, to);
    assert_ne!(toml, BASE, "replacement must apply");
    let cfg = load_toml(&toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should be rejected");
    assert!(
        format!("{err}").contains(needle),
        "expected {needle:?} in {err}"
    );
}

#[test]
fn rejects_both_activation_devices() {
    let toml = format!("{BASE}door_switch = {{ pin = 6 }}\nswitch_interval = 500\n");
    let cfg = load_toml(&toml).expect("parse TOML");
    let err = cfg.validate().expect_err("both set");
    assert!(format!("{err}").contains("not both"));
}

#[test]
fn rejects_missing_activation_device() {
    let toml = BASE
        .replace("door_activate_button = { pin = 17, id = \"garage_button\" }\n", "")
        .replace("button_press_interval = \"500ms\"\n", "");
    let cfg = load_toml(&toml).expect("parse TOML");
    let err = cfg.validate().expect_err("no device");
    assert!(format!("{err}").contains("missing activation device"));
}

#[test]
fn rejects_button_without_interval() {
    let toml = BASE.replace("button_press_interval = \"500ms\"\n", "");
    let cfg = load_toml(&toml).expect("parse TOML");
    let err = cfg.validate().expect_err("no interval");
    assert!(format!("{err}").contains("button_press_interval is required"));
}

#[test]
fn rejects_debounce_longer_than_travel() {
    let toml = format!("{BASE}endstop_debounce = \"20s\"\n");
    let cfg = load_toml(&toml).expect("parse TOML");
    let err = cfg.validate().expect_err("debounce too long");
    assert!(format!("{err}").contains("endstop_debounce"));
}

#[rstest]
#[case("[runner]\ntick_ms = 0\n", "runner.tick_ms")]
#[case("[logging]\nrotation = \"weekly\"\n", "logging.rotation")]
fn rejects_invalid_ambient_sections(#[case] extra: &str, #[case] needle: &str) {
    let toml = format!("{BASE}{extra}");
    let cfg = load_toml(&toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should be rejected");
    assert!(format!("{err}").contains(needle));
}

#[test]
fn bad_duration_unit_is_a_parse_error() {
    let toml = BASE.replace("open_duration = \"15s\"", "open_duration = \"15 parsecs\"");
    let err = load_toml(&toml).expect_err("unknown unit");
    assert!(err.to_string().contains("unknown unit"));
}
