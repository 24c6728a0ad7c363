use std::fmt::{Debug, Display};

use rtprobe::{
    ApiVersion, Capability, CapabilitySet, CapabilityText, GlobalPriority, NegotiationFailure, PrivilegeGate, ProbeError,
    ProbeOptions, ProcessPrivileges, QueueFamilyDescriptor, QueueRequest, RuntimeConfig, RuntimeError, Selection,
    VulkanContext, VulkanRuntime,
};
use static_assertions::assert_impl_all;

assert_impl_all!(ApiVersion: Copy, Debug, Ord, Send, Sync);
assert_impl_all!(Capability: Copy, Debug, Ord, Send, Sync);
assert_impl_all!(CapabilitySet: Copy, Debug, Display, Send, Sync);
assert_impl_all!(CapabilityText: Copy, Debug, Display, Send, Sync);
assert_impl_all!(GlobalPriority: Copy, Debug, Ord, Send, Sync);
assert_impl_all!(QueueFamilyDescriptor: Copy, Debug, Send, Sync);
assert_impl_all!(QueueRequest: Copy, Debug, Send, Sync);
assert_impl_all!(ProbeOptions: Copy, Debug, Default, Send, Sync);
assert_impl_all!(RuntimeConfig: Copy, Debug, Default, Send, Sync);
assert_impl_all!(Selection<usize>: Clone, Debug, Send, Sync);
assert_impl_all!(PrivilegeGate<ProcessPrivileges>: Debug, Send, Sync);
assert_impl_all!(VulkanRuntime: Debug);
assert_impl_all!(VulkanContext: Debug);

assert_impl_all!(RuntimeError: std::error::Error, Clone, Send, Sync);
assert_impl_all!(NegotiationFailure: std::error::Error, Clone, Send, Sync);
assert_impl_all!(ProbeError: std::error::Error, Clone, Send, Sync);
