//! Listing accelerators and their queue families

use std::error::Error;

use tracing::info;
use tracing_subscriber::filter::LevelFilter;

use rtprobe::{AcceleratorRuntime, FamilyCandidates, RuntimeConfig, VulkanRuntime};

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt().with_max_level(LevelFilter::INFO).init();

    let runtime = VulkanRuntime::new(&RuntimeConfig::default())?;

    for accelerator in runtime.enumerate_accelerators()? {
        let properties = runtime.properties(accelerator)?;
        let families = runtime.queue_families(accelerator)?;
        let candidates = FamilyCandidates::scan(&families);

        info!(
            name = %properties.name,
            device_type = %properties.device_type,
            api_version = %properties.api_version,
            general = ?candidates.general,
            compute = ?candidates.compute,
        );

        for family in families {
            info!(index = family.index, flags = ?family.flags, queue_count = family.queue_count);
        }
    }

    Ok(())
}
