use tabled::settings::Style;
use tabled::{Table, Tabled};

use waf_tunnel_sample_model::{SampleLog, TrackedCounter};

#[derive(Tabled)]
struct CounterRow {
    counter: &'static str,
    first: String,
    last: String,
    delta: String,
}

/// Print a per-counter overview of the run: the first and last observed value of each tracked
/// counter and the difference between them. Counters the device never reported render as empty
/// cells.
pub fn print_run_summary(log: &SampleLog) {
    if log.is_empty() {
        println!("\nNo samples were collected");
        return;
    }

    println!("\nSummary of tracked counters");
    let rows = TrackedCounter::ALL
        .iter()
        .map(|counter| {
            let first = log
                .samples
                .iter()
                .find_map(|s| s.device_counters.get(counter).copied().flatten());
            let last = log
                .samples
                .iter()
                .rev()
                .find_map(|s| s.device_counters.get(counter).copied().flatten());
            let delta = first.zip(last).map(|(f, l)| l as i64 - f as i64);

            CounterRow {
                counter: counter.name(),
                first: first.map(|v| v.to_string()).unwrap_or_default(),
                last: last.map(|v| v.to_string()).unwrap_or_default(),
                delta: delta.map(|v| v.to_string()).unwrap_or_default(),
            }
        })
        .collect::<Vec<_>>();

    let mut table = Table::new(&rows);
    table.with(Style::modern());

    println!("{}", table);
}
