use anyhow::Context;
use waf_tunnel_core::prelude::InterruptedError;
use waf_tunnel_instruments::{print_run_summary, CounterSource, SmartReader};
use waf_tunnel_sample_model::{empty_counter_set, OutputPaths, Session};

use crate::definition::MonitorDefinitionBuilder;
use crate::monitor::start_monitor;
use crate::progress::start_progress;
use crate::scheduler::SampleScheduler;
use crate::shutdown::start_shutdown_listener;
use crate::supervisor::BenchmarkSupervisor;
use crate::types::WafTunnelResult;

pub fn run(builder: MonitorDefinitionBuilder) -> WafTunnelResult<()> {
    let definition = builder.build()?;

    log::info!(
        "Running monitor {} against {}",
        definition.name,
        definition.device.display()
    );

    let session = Session::start();
    let paths = OutputPaths::new(&definition.out_dir, &definition.experiment_name, &session);
    paths.ensure_dir()?;

    let runtime = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    let shutdown_handle = start_shutdown_listener(&runtime)?;

    let device = definition.device.display().to_string();
    let mut source = SmartReader::new(definition.json_smart);

    // Baseline before the workload starts writing, so the run's deltas are relative to the
    // device at rest.
    let baseline = match source.read(&device) {
        Ok(counters) => counters,
        Err(e) => {
            log::error!("Failed to read baseline counters, normalized deltas will be unavailable: {e}");
            empty_counter_set()
        }
    };

    // A workload that cannot start aborts the run here, before any sampling.
    let supervisor = match &definition.job_file {
        Some(job_file) => Some(BenchmarkSupervisor::start(
            &definition.device,
            job_file,
            &paths.workload_log_prefix,
        )?),
        None => None,
    };

    // The harness's own footprint can pollute the host-side counters, so watch for it.
    start_monitor(shutdown_handle.new_listener());

    let progress = if definition.no_progress {
        None
    } else {
        Some(start_progress())
    };

    let scheduler = SampleScheduler::new(
        &definition,
        &mut source,
        supervisor,
        shutdown_handle.new_listener(),
        baseline,
        &paths,
        progress,
    );
    let outcome = scheduler.run()?;

    println!("\nSaved structured samples to {}", paths.json_path.display());
    println!("Saved tabular samples to {}", paths.csv_path.display());
    print_run_summary(&outcome.log);

    if outcome.interrupted {
        println!("Run interrupted after {} samples", outcome.log.len());
        return Err(InterruptedError::default().into());
    }

    println!("Run complete with {} samples collected", outcome.log.len());
    Ok(())
}
