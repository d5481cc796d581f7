use std::time::{Duration, Instant};

use anyhow::Context;
use indicatif::ProgressBar;
use waf_tunnel_core::prelude::DelegatedShutdownListener;
use waf_tunnel_instruments::{read_os_counters, CounterSource};
use waf_tunnel_sample_model::{
    empty_counter_set, flush, CounterSet, OutputPaths, Sample, SampleLog,
};

use crate::definition::MonitorDefinition;
use crate::supervisor::BenchmarkSupervisor;
use crate::types::WafTunnelResult;

/// Mid-run flushes bound how much data a crash can lose. The flush when the run finishes is the
/// authoritative one; a failed periodic flush only logs.
const PERIODIC_FLUSH_EVERY: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Sampling while the workload we launched is still running.
    RunningWithBenchmark,
    /// Sampling with no workload of our own; ends only by interruption.
    Observing,
    /// The workload has exited; keep sampling for a bounded window to catch trailing writes the
    /// device is still committing.
    GracePeriod,
    /// An interruption was observed at a tick boundary; take one final sample and stop.
    ShuttingDown,
    Done,
}

impl Phase {
    fn describe(&self) -> &'static str {
        match self {
            Phase::RunningWithBenchmark => "benchmark running",
            Phase::Observing => "observing",
            Phase::GracePeriod => "grace period",
            Phase::ShuttingDown => "shutting down",
            Phase::Done => "done",
        }
    }
}

pub(crate) struct RunOutcome {
    pub(crate) log: SampleLog,
    pub(crate) interrupted: bool,
}

/// Drives the fixed-interval tick loop and owns the sample log for the run's lifetime.
pub(crate) struct SampleScheduler<'a> {
    device: String,
    device_name: String,
    interval: Duration,
    grace: Duration,
    source: &'a mut dyn CounterSource,
    supervisor: Option<BenchmarkSupervisor>,
    shutdown_listener: DelegatedShutdownListener,
    baseline: CounterSet,
    paths: &'a OutputPaths,
    progress: Option<ProgressBar>,
    phase: Phase,
    log: SampleLog,
}

impl<'a> SampleScheduler<'a> {
    pub(crate) fn new(
        definition: &MonitorDefinition,
        source: &'a mut dyn CounterSource,
        supervisor: Option<BenchmarkSupervisor>,
        shutdown_listener: DelegatedShutdownListener,
        baseline: CounterSet,
        paths: &'a OutputPaths,
        progress: Option<ProgressBar>,
    ) -> Self {
        let device = definition.device.display().to_string();
        let phase = if supervisor.is_some() {
            Phase::RunningWithBenchmark
        } else {
            Phase::Observing
        };
        Self {
            log: SampleLog::new(device.clone()),
            device,
            device_name: definition.device_name.clone(),
            interval: definition.interval,
            grace: definition.grace,
            source,
            supervisor,
            shutdown_listener,
            baseline,
            paths,
            progress,
            phase,
        }
    }

    /// Run the loop to completion and persist everything that was collected.
    ///
    /// The shutdown flag is checked once per iteration, at the top, so a tick is never abandoned
    /// mid-operation. Only the final flush can fail this function; every acquisition failure
    /// degrades into an absent-value sample instead.
    pub(crate) fn run(mut self) -> WafTunnelResult<RunOutcome> {
        let started = Instant::now();
        let mut grace_ticks_left = 0u64;
        let mut interrupted = false;

        while self.phase != Phase::Done {
            if self.phase != Phase::ShuttingDown && self.shutdown_listener.should_shutdown() {
                self.phase = Phase::ShuttingDown;
            }

            match self.phase {
                Phase::RunningWithBenchmark => {
                    let running = self.supervisor.as_mut().is_some_and(|s| s.is_running());
                    if !running {
                        grace_ticks_left = grace_tick_budget(self.grace, self.interval);
                        log::info!(
                            "Workload finished, sampling trailing writes for {grace_ticks_left} more ticks"
                        );
                        self.phase = Phase::GracePeriod;
                        continue;
                    }
                    self.take_sample(started);
                    std::thread::sleep(self.interval);
                }
                Phase::Observing => {
                    self.take_sample(started);
                    std::thread::sleep(self.interval);
                }
                Phase::GracePeriod => {
                    if grace_ticks_left == 0 {
                        self.phase = Phase::Done;
                        continue;
                    }
                    self.take_sample(started);
                    grace_ticks_left -= 1;
                    std::thread::sleep(self.interval);
                }
                Phase::ShuttingDown => {
                    interrupted = true;
                    self.take_sample(started);
                    if let Some(supervisor) = self.supervisor.as_mut() {
                        supervisor.terminate();
                    }
                    self.phase = Phase::Done;
                }
                Phase::Done => {}
            }
        }

        if let Some(progress) = &self.progress {
            progress.finish_and_clear();
        }

        flush(&self.log, self.paths).context("Final flush of the sample log failed")?;

        Ok(RunOutcome {
            log: self.log,
            interrupted,
        })
    }

    /// One tick's worth of acquisition. Failures produce an absent-value sample so the series
    /// keeps its cadence for downstream analysis.
    fn take_sample(&mut self, started: Instant) {
        let timestamp = chrono::Utc::now().timestamp();
        let device_counters = match self.source.read(&self.device) {
            Ok(counters) => counters,
            Err(e) => {
                log::error!("Failed to read device counters: {e}");
                empty_counter_set()
            }
        };
        let os_counters = read_os_counters(&self.device_name);

        self.log
            .append(Sample::new(timestamp, device_counters, &self.baseline, os_counters));

        let message = format!(
            "{}: {}s elapsed, {} samples",
            self.phase.describe(),
            started.elapsed().as_secs(),
            self.log.len()
        );
        match &self.progress {
            Some(progress) => progress.set_message(message),
            None => log::info!("{message}"),
        }

        if self.log.len() % PERIODIC_FLUSH_EVERY == 0 {
            if let Err(e) = flush(&self.log, self.paths) {
                log::error!("Periodic flush failed, continuing to sample: {e:#}");
            }
        }
    }
}

/// Number of sampling ticks that fit in the post-workload window, rounding up so a window shorter
/// than one interval still gets a tick.
fn grace_tick_budget(grace: Duration, interval: Duration) -> u64 {
    if grace.is_zero() {
        return 0;
    }
    grace.as_millis().div_ceil(interval.as_millis().max(1)) as u64
}
