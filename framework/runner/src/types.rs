/// Recommended error type for a monitor's `main` function. Compatible with everything the runner
/// returns, so `?` propagates cleanly and an interrupted run exits non-zero.
pub type WafTunnelResult<T> = anyhow::Result<T>;
