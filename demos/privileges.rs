//! Checking for privileges

use tracing::info;
use tracing_subscriber::filter::LevelFilter;

use rtprobe::{Capability, PrivilegeGate, PrivilegeSource, ProcessPrivileges};

fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt().with_max_level(LevelFilter::DEBUG).init();

    let gate = PrivilegeGate::new(ProcessPrivileges);
    info!(has_required_privilege = gate.has_required_privilege());

    let capabilities = ProcessPrivileges.capabilities()?;
    let last_capability = ProcessPrivileges.last_capability()?;
    info!(capabilities = %capabilities.to_text(last_capability), last_capability);

    for capability in Capability::all().filter(|&capability| capabilities.is_permitted(capability)) {
        info!(
            %capability,
            effective = capabilities.is_effective(capability),
            inheritable = capabilities.is_inheritable(capability),
            "permitted",
        );
    }

    Ok(())
}
