//! Host commands and timed command scripts.
//!
//! Text forms: `open`, `close`, `stop`, `toggle`, `position 0.4` (or `position 40%`).
//! A script is a list of `<time>:<command>` entries separated by `,` or `;`,
//! e.g. `0:open, 6s:stop, 8s:close`.

use core::str::FromStr;

use crate::error::CoverError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoverCommand {
    Open,
    Close,
    Stop,
    Toggle,
    /// Target position, 0.0 closed .. 1.0 open.
    Position(f32),
}

impl core::fmt::Display for CoverCommand {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            CoverCommand::Open => f.write_str("open"),
            CoverCommand::Close => f.write_str("close"),
            CoverCommand::Stop => f.write_str("stop"),
            CoverCommand::Toggle => f.write_str("toggle"),
            CoverCommand::Position(p) => write!(f, "position {p:.2}"),
        }
    }
}

fn parse_fraction(text: &str) -> Result<f32, CoverError> {
    let t = text.trim();
    let (num, divisor) = match t.strip_suffix('%') {
        Some(pct) => (pct.trim(), 100.0),
        None => (t, 1.0),
    };
    let value: f32 = num
        .parse()
        .map_err(|_| CoverError::InvalidCommand(format!("bad position {text:?}")))?;
    let value = value / divisor;
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(CoverError::InvalidCommand(format!(
            "position {text:?} outside 0..1 (or 0%..100%)"
        )));
    }
    Ok(value)
}

impl FromStr for CoverCommand {
    type Err = CoverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (word, rest) = s.split_once(char::is_whitespace).unwrap_or((s, ""));
        let rest = rest.trim();
        let cmd = match word.to_ascii_lowercase().as_str() {
            "open" => CoverCommand::Open,
            "close" => CoverCommand::Close,
            "stop" => CoverCommand::Stop,
            "toggle" => CoverCommand::Toggle,
            "position" | "pos" => {
                if rest.is_empty() {
                    return Err(CoverError::InvalidCommand(
                        "position needs a value, e.g. `position 0.4`".into(),
                    ));
                }
                return Ok(CoverCommand::Position(parse_fraction(rest)?));
            }
            "" => return Err(CoverError::InvalidCommand("empty command".into())),
            other => {
                return Err(CoverError::InvalidCommand(format!(
                    "unknown command {other:?} (expected open, close, stop, toggle, position <0..1>)"
                )));
            }
        };
        if !rest.is_empty() {
            return Err(CoverError::InvalidCommand(format!(
                "{word} takes no argument, got {rest:?}"
            )));
        }
        Ok(cmd)
    }
}

/// Commands scheduled at fixed offsets from the start of a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Script {
    entries: Vec<(u64, CoverCommand)>,
    next: usize,
}

impl Script {
    pub fn new(mut entries: Vec<(u64, CoverCommand)>) -> Self {
        // Stable: same-time entries keep their written order
        entries.sort_by_key(|(at, _)| *at);
        Self { entries, next: 0 }
    }

    pub fn entries(&self) -> &[(u64, CoverCommand)] {
        &self.entries
    }

    /// Time of the last entry, 0 for an empty script.
    pub fn last_at_ms(&self) -> u64 {
        self.entries.last().map_or(0, |(at, _)| *at)
    }

    /// Entries due at `now_ms` that were not handed out before.
    pub fn take_due(&mut self, now_ms: u64) -> Vec<CoverCommand> {
        let start = self.next;
        while self.next < self.entries.len() && self.entries[self.next].0 <= now_ms {
            self.next += 1;
        }
        self.entries[start..self.next]
            .iter()
            .map(|(_, cmd)| *cmd)
            .collect()
    }

    pub fn is_done(&self) -> bool {
        self.next >= self.entries.len()
    }
}

impl FromStr for Script {
    type Err = CoverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut entries = Vec::new();
        for item in s.split([',', ';', '\n']) {
            let item = item.trim();
            if item.is_empty() {
                continue;
            }
            let Some((at, cmd)) = item.split_once(':') else {
                return Err(CoverError::InvalidCommand(format!(
                    "script entry {item:?} must look like <time>:<command>"
                )));
            };
            let at_ms = cover_config::parse_duration_ms(at).map_err(CoverError::InvalidCommand)?;
            entries.push((at_ms, cmd.parse()?));
        }
        Ok(Script::new(entries))
    }
}
