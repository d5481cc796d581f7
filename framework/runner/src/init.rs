use crate::cli::WafTunnelCli;
use clap::Parser;

/// Initialise logging and the CLI for a monitor binary.
pub(crate) fn init() -> WafTunnelCli {
    env_logger::init();

    WafTunnelCli::parse()
}
