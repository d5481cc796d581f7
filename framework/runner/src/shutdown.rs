use tokio::signal;
use waf_tunnel_core::prelude::ShutdownHandle;

/// Listen for an interruption (Ctrl-C) or termination request and translate it into the
/// cooperative shutdown signal.
///
/// The process is never killed from here: the sampling loop observes the signal at its next tick
/// boundary, takes a final sample, terminates any live workload, and flushes before exiting.
pub(crate) fn start_shutdown_listener(
    runtime: &tokio::runtime::Runtime,
) -> anyhow::Result<ShutdownHandle> {
    let handle = ShutdownHandle::default();

    let listener_handle = handle.clone();
    runtime.spawn(async move {
        wait_for_signal().await;
        listener_handle.shutdown();
        println!("\nReceived shutdown signal, finishing the current tick...");
    });

    Ok(handle)
}

#[cfg(unix)]
async fn wait_for_signal() {
    let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())
        .expect("Failed to install SIGTERM handler");
    tokio::select! {
        result = signal::ctrl_c() => {
            result.expect("Failed to receive Ctrl-C signal");
        }
        _ = terminate.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    signal::ctrl_c()
        .await
        .expect("Failed to receive Ctrl-C signal");
}
