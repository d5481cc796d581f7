use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Spinner that shows the operator where the run is, updated by the scheduler once per tick.
///
/// There is no progress bar proper because the workload's runtime is not known up front; the
/// spinner carries the phase, elapsed time and sample count instead.
pub(crate) fn start_progress() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .expect("Failed to set progress style"),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
