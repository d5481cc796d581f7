use std::fs::File;
use std::path::Path;
use std::process::{Child, Command, Stdio};

use anyhow::Context;

use crate::fio_binary::fio_path;
use crate::types::WafTunnelResult;

/// Granularity of fio's bandwidth and IOPS logs, in milliseconds.
const FIO_LOG_AVG_MSEC: u32 = 1000;

/// Owns the external fio workload for the lifetime of a run.
///
/// The workload runs concurrently with the sampling loop but shares nothing with it in memory;
/// the only communication is the device itself and the process exit status.
pub(crate) struct BenchmarkSupervisor {
    child: Option<Child>,
}

impl BenchmarkSupervisor {
    /// Launch fio against `device` with the supplied job file. fio's JSON results and
    /// bandwidth/IOPS logs land next to the run's other artifacts under `log_prefix`.
    ///
    /// A workload that cannot be launched is fatal for the run; this is checked before any
    /// sampling starts.
    pub(crate) fn start(
        device: &Path,
        job_file: &Path,
        log_prefix: &Path,
    ) -> WafTunnelResult<Self> {
        let fio = fio_path()?;

        let stdout_log = File::create(log_prefix.with_extension("out")).with_context(|| {
            format!(
                "Failed to create workload output log {}",
                log_prefix.with_extension("out").display()
            )
        })?;
        let stderr_log = stdout_log
            .try_clone()
            .context("Failed to redirect workload stderr")?;

        let child = Command::new(fio)
            .arg(format!("--filename={}", device.display()))
            .arg("--output-format=json")
            .arg(format!("--output={}.json", log_prefix.display()))
            .arg(format!("--write_bw_log={}", log_prefix.display()))
            .arg(format!("--write_iops_log={}", log_prefix.display()))
            .arg(format!("--log_avg_msec={FIO_LOG_AVG_MSEC}"))
            .arg(job_file)
            .stdout(Stdio::from(stdout_log))
            .stderr(Stdio::from(stderr_log))
            .spawn()
            .with_context(|| {
                format!(
                    "Failed to launch fio with job file {} against {}",
                    job_file.display(),
                    device.display()
                )
            })?;

        log::info!(
            "Started fio (pid {}) with job file {}",
            child.id(),
            job_file.display()
        );
        Ok(Self { child: Some(child) })
    }

    /// Non-blocking liveness check. The first call that observes the exit also reaps the process;
    /// a non-zero exit status is reported to the operator but still counts as completion.
    pub(crate) fn is_running(&mut self) -> bool {
        let Some(child) = self.child.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(Some(status)) => {
                if status.success() {
                    log::info!("Workload completed");
                } else {
                    log::warn!("Workload exited with {status}; treating the run as complete");
                }
                self.child = None;
                false
            }
            Ok(None) => true,
            Err(e) => {
                log::error!("Failed to poll the workload process: {e}");
                self.child = None;
                false
            }
        }
    }

    /// Terminate the workload and wait for it to exit. Idempotent: a workload that has already
    /// exited and been reaped is a no-op.
    pub(crate) fn terminate(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                log::warn!("Failed to terminate the workload process: {e}");
            }
            match child.wait() {
                Ok(status) => log::info!("Workload terminated with {status}"),
                Err(e) => log::warn!("Failed to reap the workload process: {e}"),
            }
        }
    }
}

impl Drop for BenchmarkSupervisor {
    fn drop(&mut self) {
        self.terminate();
    }
}

#[cfg(test)]
impl BenchmarkSupervisor {
    /// Wrap an arbitrary child process so scheduler tests can script workload lifetimes without
    /// a fio binary.
    pub(crate) fn from_child(child: Child) -> Self {
        Self { child: Some(child) }
    }
}
