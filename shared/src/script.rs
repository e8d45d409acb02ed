//! Command script grammar
//!
//! A steady-state frame is a `\n`-joined sequence of command lines, each a
//! verb followed by space-separated arguments. Scripts that address `pin`
//! resources are bracketed with `lock`/`unlock` instructions so every pin a
//! script touches stays held for the script's whole execution.

use thiserror::Error;

/// Malformed built-in command arguments. These are local to one instruction:
/// the interpreter logs them and moves on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    #[error("invalid value for pin lock: {0}")]
    InvalidPin(String),

    #[error("invalid value for pause: {0}")]
    InvalidPause(String),
}

/// One parsed command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// Acquire exclusive hold of a pin, retrying while it is busy
    Lock(u32),
    /// Mark pins free
    Unlock(Vec<u32>),
    /// Suspend the queue for the given number of milliseconds
    Pause(u64),
    /// Any other verb, resolved against the handler registry
    Invoke { verb: String, args: Vec<String> },
}

impl Instruction {
    /// Parse one command line. Lines split on single spaces; the first token
    /// is the verb.
    pub fn parse(line: &str) -> Result<Self, ScriptError> {
        let mut parts = line.split(' ');
        let verb = parts.next().unwrap_or_default();

        match verb {
            "lock" => {
                let arg = parts.next().unwrap_or_default();
                arg.parse::<u32>()
                    .map(Self::Lock)
                    .map_err(|_| ScriptError::InvalidPin(arg.to_string()))
            }
            "unlock" => {
                let arg = parts.next().unwrap_or_default();
                Ok(Self::Unlock(
                    arg.split(',').filter_map(|p| p.parse().ok()).collect(),
                ))
            }
            "pause" => {
                let arg = parts.next().unwrap_or_default();
                arg.parse::<u64>()
                    .map(Self::Pause)
                    .map_err(|_| ScriptError::InvalidPause(arg.to_string()))
            }
            _ => Ok(Self::Invoke {
                verb: verb.to_string(),
                args: parts.map(str::to_string).collect(),
            }),
        }
    }
}

/// Pin referenced by a line, if the line addresses one (`pin <digits>...`).
///
/// Only the leading digits of the second token count, so `pin 3x on` still
/// references pin 3.
fn referenced_pin(line: &str) -> Option<u32> {
    let mut parts = line.split(' ');
    if parts.next()? != "pin" {
        return None;
    }
    let digits: String = parts
        .next()?
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Expand one inbound script into the ordered instruction line list.
///
/// Pins referenced by `pin` lines are collected deduplicated in discovery
/// order; one `lock <pin>` per pin is prepended in reverse discovery order
/// (last-discovered pin locked first) and a single trailing
/// `unlock <p1,p2,...>` in discovery order is appended.
pub fn expand_script(script: &str) -> Vec<String> {
    let lines: Vec<&str> = script.split('\n').collect();

    let mut pins: Vec<u32> = Vec::new();
    for line in &lines {
        if let Some(pin) = referenced_pin(line) {
            if !pins.contains(&pin) {
                pins.push(pin);
            }
        }
    }

    let mut expanded = Vec::with_capacity(lines.len() + pins.len() + 1);
    for pin in pins.iter().rev() {
        expanded.push(format!("lock {pin}"));
    }
    expanded.extend(lines.iter().map(|l| (*l).to_string()));
    if !pins.is_empty() {
        let joined = pins
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(",");
        expanded.push(format!("unlock {joined}"));
    }
    expanded
}
