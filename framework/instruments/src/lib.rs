mod diskstats;
mod report;
mod smart;

pub use diskstats::read_os_counters;
pub use report::print_run_summary;
pub use smart::{CounterSource, SmartReadError, SmartReader};
