use waf_tunnel_runner::prelude::*;

/// Observe-only acquisition: sample the device's write counters at a fixed interval until
/// interrupted, for workloads generated outside the harness.
fn main() -> WafTunnelResult<()> {
    let definition = MonitorDefinitionBuilder::new_with_init(env!("CARGO_PKG_NAME"));

    run(definition)?;

    Ok(())
}
