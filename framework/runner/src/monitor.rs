use sysinfo::{Pid, ProcessesToUpdate, System};
use waf_tunnel_core::prelude::DelegatedShutdownListener;

/// Monitor the resource usage of the harness process itself and report high usage.
///
/// Note that this won't stop the run, it will just log a warning so the operator knows the
/// host-side counters may include noise from the harness rather than only the workload.
///
/// The CPU usage for the process is collected every [sysinfo::MINIMUM_CPU_UPDATE_INTERVAL] and
/// checked. If it is above 10% with respect to the number of cores then a warning is logged.
pub(crate) fn start_monitor(mut shutdown_listener: DelegatedShutdownListener) {
    std::thread::Builder::new()
        .name("monitor".to_string())
        .spawn(move || {
            let this_process_pid = Pid::from_u32(std::process::id());
            let mut sys = System::new();

            sys.refresh_cpu_all();
            let cpu_count = sys.cpus().len().max(1);

            loop {
                if shutdown_listener.should_shutdown() {
                    break;
                }

                sys.refresh_processes(ProcessesToUpdate::Some(&[this_process_pid]), true);

                if let Some(process) = sys.process(this_process_pid) {
                    let usage = process.cpu_usage() / cpu_count as f32;
                    if usage > 10.0 {
                        log::warn!("High CPU usage detected. The harness is using {:.2}% of the CPU, with {} available cores; device measurements may be perturbed", usage, cpu_count);
                    }
                }

                std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
            }
        })
        .expect("Failed to start monitor thread");
}
