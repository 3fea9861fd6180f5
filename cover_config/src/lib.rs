#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the single-control cover.
//!
//! - `Config` and sub-structs are deserialized from TOML or YAML and validated.
//! - `[cover]` options: `door_activate_button` or `door_switch` with its
//!   interval, `open_endstop`/`open_duration`, `close_endstop`/`close_duration`.
//! - Durations accept integer milliseconds or suffixed strings (`"500ms"`, `"15s"`).
use serde::Deserialize;
use serde::de::Deserializer;
use std::path::Path;

/// Reference to a physical device: a GPIO pin plus an optional display id.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct DeviceRef {
    /// Human-readable name used in logs.
    #[serde(default)]
    pub id: Option<String>,
    /// BCM pin number.
    pub pin: u8,
    /// Treat low level as active when true
    #[serde(default)]
    pub active_low: bool,
}

impl DeviceRef {
    pub fn label(&self) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| format!("gpio{}", self.pin))
    }
}

/// What to do when asked to reverse while the door is moving.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReversePolicy {
    /// Stop, then start in the other direction one activation interval later.
    #[default]
    StopThenReverse,
    /// Leave the door alone and log the request.
    Ignore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationKind {
    /// Momentary button: pulse for the interval.
    Button,
    /// Switch: flip for the interval, then flip back.
    Switch,
}

/// The activation device resolved from either the button or the switch options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activation {
    pub kind: ActivationKind,
    pub device: DeviceRef,
    pub interval_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct CoverCfg {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub door_activate_button: Option<DeviceRef>,
    /// Pulse width of a button press; also the minimum spacing of presses.
    #[serde(default, deserialize_with = "de_opt_duration_ms")]
    pub button_press_interval: Option<u64>,
    #[serde(default)]
    pub door_switch: Option<DeviceRef>,
    /// Hold time of a switch toggle; also the minimum spacing of toggles.
    #[serde(default, deserialize_with = "de_opt_duration_ms")]
    pub switch_interval: Option<u64>,
    pub open_endstop: DeviceRef,
    #[serde(deserialize_with = "de_duration_ms")]
    pub open_duration: u64,
    pub close_endstop: DeviceRef,
    #[serde(deserialize_with = "de_duration_ms")]
    pub close_duration: u64,
    #[serde(
        default = "default_endstop_debounce_ms",
        deserialize_with = "de_duration_ms"
    )]
    pub endstop_debounce: u64,
    /// Re-read the endstops this long after startup (sensors that settle late).
    #[serde(default, deserialize_with = "de_duration_ms")]
    pub setup_delay: u64,
    #[serde(default)]
    pub reverse_policy: ReversePolicy,
    /// Snapshot period while the door moves.
    #[serde(
        default = "default_publish_interval_ms",
        deserialize_with = "de_duration_ms"
    )]
    pub publish_interval: u64,
}

fn default_name() -> String {
    "Single Control Cover".to_string()
}

fn default_endstop_debounce_ms() -> u64 {
    50
}

fn default_publish_interval_ms() -> u64 {
    1000
}

impl CoverCfg {
    /// Resolve the activation device. Exactly one of button or switch must be set,
    /// together with its interval.
    pub fn activation(&self) -> eyre::Result<Activation> {
        match (&self.door_activate_button, &self.door_switch) {
            (Some(_), Some(_)) => {
                eyre::bail!("cover: set either door_activate_button or door_switch, not both")
            }
            (None, None) => {
                eyre::bail!("cover: missing activation device (door_activate_button or door_switch)")
            }
            (Some(device), None) => {
                let Some(interval_ms) = self.button_press_interval else {
                    eyre::bail!("cover.button_press_interval is required with door_activate_button");
                };
                Ok(Activation {
                    kind: ActivationKind::Button,
                    device: device.clone(),
                    interval_ms,
                })
            }
            (None, Some(device)) => {
                let Some(interval_ms) = self.switch_interval else {
                    eyre::bail!("cover.switch_interval is required with door_switch");
                };
                Ok(Activation {
                    kind: ActivationKind::Switch,
                    device: device.clone(),
                    interval_ms,
                })
            }
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RunnerCfg {
    /// Cooperative loop period in milliseconds
    pub tick_ms: u64,
}

impl Default for RunnerCfg {
    fn default() -> Self {
        Self { tick_ms: 20 }
    }
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub cover: CoverCfg,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub runner: RunnerCfg,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

pub fn load_yaml(s: &str) -> Result<Config, serde_yaml::Error> {
    serde_yaml::from_str::<Config>(s)
}

/// Read and parse a config file; `.yaml`/`.yml` are parsed as YAML, everything else as TOML.
pub fn load_path(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {:?}: {}", path, e))?;
    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));
    if is_yaml {
        load_yaml(&text).map_err(|e| eyre::eyre!("invalid configuration in {:?}: {}", path, e))
    } else {
        load_toml(&text).map_err(|e| eyre::eyre!("invalid configuration in {:?}: {}", path, e))
    }
}

/// Parse a duration into milliseconds.
///
/// Accepts a bare number (milliseconds) or a number followed by `ms`, `s`, `min`
/// or `h`. Fractions are allowed and rounded to the nearest millisecond.
pub fn parse_duration_ms(text: &str) -> Result<u64, String> {
    let t = text.trim();
    let split = t
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(t.len());
    let (num, unit) = t.split_at(split);
    if num.is_empty() {
        return Err(format!("invalid duration {text:?}: missing number"));
    }
    let value: f64 = num
        .parse()
        .map_err(|_| format!("invalid duration {text:?}: bad number"))?;
    let scale = match unit.trim() {
        "" | "ms" => 1.0,
        "s" => 1_000.0,
        "min" => 60_000.0,
        "h" => 3_600_000.0,
        other => return Err(format!("invalid duration {text:?}: unknown unit {other:?}")),
    };
    let ms = (value * scale).round();
    if !ms.is_finite() || ms > u64::MAX as f64 {
        return Err(format!("invalid duration {text:?}: out of range"));
    }
    Ok(ms as u64)
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DurationToml {
    Millis(u64),
    Text(String),
}

impl DurationToml {
    fn into_ms<E: serde::de::Error>(self) -> Result<u64, E> {
        match self {
            DurationToml::Millis(ms) => Ok(ms),
            DurationToml::Text(s) => parse_duration_ms(&s).map_err(E::custom),
        }
    }
}

fn de_duration_ms<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    DurationToml::deserialize(deserializer)?.into_ms()
}

fn de_opt_duration_ms<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<DurationToml> = Option::deserialize(deserializer)?;
    opt.map(DurationToml::into_ms).transpose()
}

/// Anything above this is almost certainly a unit mistake.
const MAX_TRAVEL_MS: u64 = 10 * 60 * 1000;

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        let c = &self.cover;

        // Activation
        let activation = c.activation()?;
        if activation.interval_ms == 0 {
            match activation.kind {
                ActivationKind::Button => eyre::bail!("cover.button_press_interval must be > 0"),
                ActivationKind::Switch => eyre::bail!("cover.switch_interval must be > 0"),
            }
        }

        // Travel durations
        if c.open_duration == 0 {
            eyre::bail!("cover.open_duration must be > 0");
        }
        if c.close_duration == 0 {
            eyre::bail!("cover.close_duration must be > 0");
        }
        if c.open_duration > MAX_TRAVEL_MS {
            eyre::bail!("cover.open_duration is unreasonably large (>10min)");
        }
        if c.close_duration > MAX_TRAVEL_MS {
            eyre::bail!("cover.close_duration is unreasonably large (>10min)");
        }
        let shortest = c.open_duration.min(c.close_duration);
        if activation.interval_ms >= shortest {
            eyre::bail!("cover: activation interval must be shorter than open/close durations");
        }
        if c.endstop_debounce >= shortest {
            eyre::bail!("cover.endstop_debounce must be shorter than open/close durations");
        }
        if c.publish_interval == 0 {
            eyre::bail!("cover.publish_interval must be > 0");
        }

        // Device references
        let pins = [
            ("activation", activation.device.pin),
            ("open_endstop", c.open_endstop.pin),
            ("close_endstop", c.close_endstop.pin),
        ];
        for (i, (name_a, pin_a)) in pins.iter().enumerate() {
            for (name_b, pin_b) in &pins[i + 1..] {
                if pin_a == pin_b {
                    eyre::bail!("cover: {name_a} and {name_b} share pin {pin_a}");
                }
            }
        }

        // Runner
        if !(1..=1000).contains(&self.runner.tick_ms) {
            eyre::bail!("runner.tick_ms must be in [1, 1000]");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never, daily, hourly");
        }

        Ok(())
    }
}
