//! Probe whether the current process can obtain a realtime-priority compute queue from the GPU driver
//!
//! The probe works in two steps:
//! 1. A [`PrivilegeGate`] checks whether `CAP_SYS_NICE` is in the effective capability set of the process. Without
//!    it, drivers refuse global queue priorities above "medium", so the probe stops right there.
//! 2. A [`Negotiator`] selects the first accelerator with a dedicated compute queue family and asks its driver for a
//!    single queue with [`GlobalPriority::Realtime`]. A refusal by the driver is an expected outcome
//!    ([`Outcome::DeniedByPolicy`]) that is kept apart from actual failures.
//!
//! Both the operating system and the accelerator runtime are reached through traits ([`PrivilegeSource`] and
//! [`AcceleratorRuntime`]), with [`ProcessPrivileges`] and [`VulkanRuntime`] as the real implementations.
//!
//! ```no_run
//! use rtprobe::{PrivilegeGate, Probe, ProbeOptions, ProcessPrivileges, RuntimeConfig, VulkanRuntime};
//!
//! let probe = Probe::new(PrivilegeGate::new(ProcessPrivileges), ProbeOptions::default());
//! println!("{}", probe.gate().describe_privileges());
//!
//! let report = probe.run(|| VulkanRuntime::new(&RuntimeConfig::default()));
//! report.write_to(&mut std::io::stdout(), &mut std::io::stderr())?;
//! # Ok::<(), std::io::Error>(())
//! ```

#![deny(improper_ctypes)]
#![deny(improper_ctypes_definitions)]
#![deny(missing_debug_implementations)]

#[cfg(not(target_os = "linux"))]
compile_error!("rtprobe only supports Linux");

#[macro_use]
extern crate num_derive;

pub use accelerator::{
    AcceleratorDescriptor, AcceleratorProperties, DeviceType, GlobalPriority, QueueFamilyDescriptor, QueueFlags,
    QueueRequest,
};
pub use capability::{Capability, CapabilityFlags, CapabilitySet, CapabilityText};
pub use error::{NegotiationFailure, ProbeError, RuntimeError};
pub use negotiate::{AcceleratorRuntime, ExecutionContext, FamilyCandidates, Negotiator, Outcome, Selection};
pub use privilege::{PrivilegeGate, PrivilegeSnapshot, PrivilegeSource, ProcessPrivileges};
pub use probe::{Probe, ProbeOptions, ProbeReport};
pub use version::ApiVersion;
pub use vulkan::{RuntimeConfig, VulkanContext, VulkanRuntime};

mod accelerator;
mod capability;
mod capsys;
mod error;
mod negotiate;
mod privilege;
mod probe;
mod version;
mod vulkan;
