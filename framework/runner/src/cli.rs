use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(about, long_about = None)]
pub struct WafTunnelCli {
    /// Path to the block device under measurement, e.g. /dev/nvme0n1
    pub device: PathBuf,

    /// fio job file describing the write workload to run against the device.
    ///
    /// Required by benchmark-coupled monitors, which drive the workload themselves. Observe-only
    /// monitors reject it, since they assume the load is generated elsewhere.
    #[clap(long)]
    pub job: Option<PathBuf>,

    /// A name for this experiment run, used in the output directory name
    #[clap(long, default_value = "")]
    pub name: String,

    /// Sampling interval in seconds
    #[clap(long, default_value = "1")]
    pub interval: u64,

    /// How long to keep sampling after the workload exits, in seconds.
    ///
    /// The device may still be committing writes it accepted while the workload ran; this window
    /// captures that trailing activity.
    #[clap(long, default_value = "20")]
    pub grace: u64,

    /// Directory under which per-run artifact directories are created
    #[clap(long, default_value = "./waf_logs")]
    pub out_dir: PathBuf,

    /// Ask smartctl for JSON output instead of scraping the human-readable attribute table
    #[clap(long, default_value = "false")]
    pub json_smart: bool,

    /// Do not show a spinner on the CLI.
    ///
    /// This is recommended for CI/CD environments where the spinner isn't being looked at by
    /// anyone and is just adding noise to the logs.
    #[clap(long, default_value = "false")]
    pub no_progress: bool,
}
