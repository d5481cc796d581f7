use std::path::PathBuf;
use std::time::Duration;

use anyhow::bail;

use crate::cli::WafTunnelCli;

/// The builder for a monitor definition.
///
/// This must be used at the start of a monitor binary to define the run before handing it to
/// [crate::run::run].
pub struct MonitorDefinitionBuilder {
    /// The name of the monitor. Recommended value is `env!("CARGO_PKG_NAME")`.
    name: String,
    /// This value is initialised for you from the command line.
    #[doc(hidden)]
    cli: WafTunnelCli,
    workload_required: bool,
}

pub struct MonitorDefinition {
    pub name: String,
    /// Full path of the device under measurement, as passed to the diagnostic tool.
    pub device: PathBuf,
    /// Short device name used to look the device up in the OS statistics table.
    pub device_name: String,
    /// Present only for benchmark-coupled monitors.
    pub job_file: Option<PathBuf>,
    pub experiment_name: String,
    pub interval: Duration,
    pub grace: Duration,
    pub out_dir: PathBuf,
    pub json_smart: bool,
    pub no_progress: bool,
}

impl MonitorDefinitionBuilder {
    /// Initialise a new monitor definition from the monitor name and command line arguments.
    pub fn new_with_init(name: &str) -> Self {
        Self::new(name, crate::init::init())
    }

    fn new(name: &str, cli: WafTunnelCli) -> Self {
        Self {
            name: name.to_string(),
            cli,
            workload_required: false,
        }
    }

    /// Declare that this monitor drives a fio workload itself, making `--job` mandatory.
    pub fn with_workload(mut self) -> Self {
        self.workload_required = true;
        self
    }

    pub(crate) fn build(self) -> anyhow::Result<MonitorDefinition> {
        if self.workload_required && self.cli.job.is_none() {
            bail!("{} drives a fio workload and needs --job <file>", self.name);
        }
        if !self.workload_required && self.cli.job.is_some() {
            bail!(
                "{} only observes the device and does not accept --job",
                self.name
            );
        }
        if self.cli.interval == 0 {
            bail!("Sampling interval must be at least one second");
        }

        let device_name = match self.cli.device.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => bail!("'{}' is not a device path", self.cli.device.display()),
        };

        Ok(MonitorDefinition {
            name: self.name,
            device: self.cli.device,
            device_name,
            job_file: self.cli.job,
            experiment_name: self.cli.name,
            interval: Duration::from_secs(self.cli.interval),
            grace: Duration::from_secs(self.cli.grace),
            out_dir: self.cli.out_dir,
            json_smart: self.cli.json_smart,
            no_progress: self.cli.no_progress,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> WafTunnelCli {
        WafTunnelCli::try_parse_from(args).expect("failed to parse test arguments")
    }

    #[test]
    fn benchmark_coupled_monitor_requires_a_job_file() {
        let builder = MonitorDefinitionBuilder::new("waf_bench", cli(&["waf_bench", "/dev/sda"]))
            .with_workload();

        assert!(builder.build().is_err());
    }

    #[test]
    fn observe_only_monitor_rejects_a_job_file() {
        let builder = MonitorDefinitionBuilder::new(
            "waf_watch",
            cli(&["waf_watch", "/dev/sda", "--job", "randwrite.fio"]),
        );

        assert!(builder.build().is_err());
    }

    #[test]
    fn device_short_name_is_derived_from_the_path() {
        let definition = MonitorDefinitionBuilder::new(
            "waf_bench",
            cli(&["waf_bench", "/dev/nvme0n1", "--job", "randwrite.fio"]),
        )
        .with_workload()
        .build()
        .unwrap();

        assert_eq!(definition.device_name, "nvme0n1");
        assert_eq!(definition.interval, Duration::from_secs(1));
        assert_eq!(definition.grace, Duration::from_secs(20));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let builder = MonitorDefinitionBuilder::new(
            "waf_watch",
            cli(&["waf_watch", "/dev/sda", "--interval", "0"]),
        );

        assert!(builder.build().is_err());
    }
}
