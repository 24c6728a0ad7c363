use std::io;
use std::process::ExitCode;

use rtprobe::{PrivilegeGate, Probe, ProbeOptions, ProcessPrivileges, RuntimeConfig, VulkanRuntime};
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let probe = Probe::new(PrivilegeGate::new(ProcessPrivileges), ProbeOptions::default());
    println!("{}", probe.gate().describe_privileges());

    let report = probe.run(|| VulkanRuntime::new(&RuntimeConfig::default()));

    if let Err(err) = report.write_to(&mut io::stdout().lock(), &mut io::stderr().lock()) {
        error!(error = %err, "failed to write report");
    }

    ExitCode::from(report.exit_code())
}
