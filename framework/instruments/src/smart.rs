use std::io::Read;
use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use thiserror::Error;
use waf_tunnel_sample_model::{empty_counter_set, CounterSet, TrackedCounter};

/// Position of the raw value in a `smartctl -A` attribute line, counting whitespace-separated
/// fields.
const RAW_VALUE_FIELD: usize = 9;

/// Backstop for a hung diagnostic tool. smartctl normally returns well within a second; a read
/// that takes this long is reported as failed so the sampling loop keeps its cadence.
const DEFAULT_DEADLINE: Duration = Duration::from_secs(10);

/// Failure to obtain a counter reading. Never fatal to a run: the scheduler records an
/// absent-value sample for the tick and moves on.
#[derive(Debug, Error)]
pub enum SmartReadError {
    #[error("failed to run smartctl: {0}")]
    Io(#[from] std::io::Error),
    #[error("smartctl exited with {status}")]
    NonZeroExit { status: ExitStatus },
    #[error("smartctl did not finish within {0:?}")]
    TimedOut(Duration),
    #[error("smartctl output could not be parsed: {0}")]
    Malformed(String),
}

/// Source of tracked-counter readings.
///
/// The scheduler only sees this trait, so its state machine can be driven by a scripted source in
/// tests while production runs use [SmartReader].
pub trait CounterSource {
    fn read(&mut self, device: &str) -> Result<CounterSet, SmartReadError>;
}

/// Reads the tracked counters by invoking `smartctl -A` against the device.
#[derive(Debug)]
pub struct SmartReader {
    json: bool,
    deadline: Duration,
}

impl SmartReader {
    /// `json` selects smartctl's structured output mode instead of scraping the attribute table.
    pub fn new(json: bool) -> Self {
        Self {
            json,
            deadline: DEFAULT_DEADLINE,
        }
    }
}

impl CounterSource for SmartReader {
    fn read(&mut self, device: &str) -> Result<CounterSet, SmartReadError> {
        let mut cmd = Command::new("smartctl");
        cmd.arg("-A");
        if self.json {
            cmd.arg("--json");
        }
        cmd.arg(device);

        let stdout = run_with_deadline(cmd, self.deadline)?;
        if self.json {
            parse_json_attributes(&stdout)
        } else {
            Ok(parse_attribute_lines(&stdout))
        }
    }
}

/// Run the command to completion, killing it if the deadline passes first.
fn run_with_deadline(mut cmd: Command, deadline: Duration) -> Result<String, SmartReadError> {
    cmd.stdout(Stdio::piped()).stderr(Stdio::null());
    let mut child = cmd.spawn()?;
    let started = Instant::now();

    loop {
        match child.try_wait()? {
            Some(status) => {
                let mut stdout = String::new();
                if let Some(mut pipe) = child.stdout.take() {
                    pipe.read_to_string(&mut stdout)?;
                }
                if !status.success() {
                    return Err(SmartReadError::NonZeroExit { status });
                }
                return Ok(stdout);
            }
            None if started.elapsed() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(SmartReadError::TimedOut(deadline));
            }
            None => std::thread::sleep(Duration::from_millis(50)),
        }
    }
}

/// Scan the human-readable attribute table for each tracked counter. Extraction is best-effort: a
/// line that names a counter but carries no parseable raw value leaves that counter absent.
fn parse_attribute_lines(stdout: &str) -> CounterSet {
    let mut counters = empty_counter_set();
    for line in stdout.lines() {
        for counter in TrackedCounter::ALL {
            if !line.contains(counter.name()) {
                continue;
            }
            if let Some(value) = line
                .split_whitespace()
                .nth(RAW_VALUE_FIELD)
                .and_then(|field| field.parse().ok())
            {
                counters.insert(counter, Some(value));
            }
        }
    }
    counters
}

/// Extract tracked counters from `smartctl --json` output, matching attribute table entries by
/// name and taking the raw value.
fn parse_json_attributes(stdout: &str) -> Result<CounterSet, SmartReadError> {
    let root: serde_json::Value =
        serde_json::from_str(stdout).map_err(|e| SmartReadError::Malformed(e.to_string()))?;

    let mut counters = empty_counter_set();
    let table = root
        .pointer("/ata_smart_attributes/table")
        .and_then(|table| table.as_array());
    if let Some(table) = table {
        for entry in table {
            let Some(name) = entry.get("name").and_then(|name| name.as_str()) else {
                continue;
            };
            for counter in TrackedCounter::ALL {
                if counter.name() != name {
                    continue;
                }
                if let Some(value) = entry.pointer("/raw/value").and_then(|value| value.as_u64()) {
                    counters.insert(counter, Some(value));
                }
            }
        }
    }
    Ok(counters)
}
