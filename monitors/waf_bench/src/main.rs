use waf_tunnel_runner::prelude::*;

/// Benchmark-coupled acquisition: drive a fio workload against the device and sample the write
/// counters until the workload completes, plus a grace window for trailing writes.
fn main() -> WafTunnelResult<()> {
    let definition = MonitorDefinitionBuilder::new_with_init(env!("CARGO_PKG_NAME")).with_workload();

    run(definition)?;

    Ok(())
}
