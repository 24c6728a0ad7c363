//! Descriptions of accelerators, their queue families and queue requests

#![deny(unsafe_code)]

use std::fmt::{self, Display, Formatter};

use bitflags::bitflags;
use num_traits::FromPrimitive;

use crate::version::ApiVersion;

bitflags! {
    /// The kinds of work the queues of a queue family support
    ///
    /// The bit values are those of `VkQueueFlagBits`.
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub struct QueueFlags: u32 {
        const GRAPHICS = 0x0000_0001;
        const COMPUTE = 0x0000_0002;
        const TRANSFER = 0x0000_0004;
        const SPARSE_BINDING = 0x0000_0008;
        const PROTECTED = 0x0000_0010;
        const VIDEO_DECODE = 0x0000_0020;
        const VIDEO_ENCODE = 0x0000_0040;
        const OPTICAL_FLOW = 0x0000_0100;

        /// Families supporting both graphics and compute work
        const GENERAL = Self::GRAPHICS.bits() | Self::COMPUTE.bits();
    }
}

/// The type of an accelerator
///
/// The discriminants are those of `VkPhysicalDeviceType`.
#[derive(Clone, Copy, Debug, Default, Eq, FromPrimitive, Hash, PartialEq)]
#[repr(i32)]
pub enum DeviceType {
    #[default]
    Other = 0,
    IntegratedGpu = 1,
    DiscreteGpu = 2,
    VirtualGpu = 3,
    Cpu = 4,
}

impl DeviceType {
    /// Returns the [`DeviceType`] with the given raw value, falling back to [`DeviceType::Other`] for unknown values
    pub fn from_raw(raw: i32) -> Self {
        Self::from_i32(raw).unwrap_or_default()
    }
}

impl Display for DeviceType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Other => "other",
            Self::IntegratedGpu => "integrated GPU",
            Self::DiscreteGpu => "discrete GPU",
            Self::VirtualGpu => "virtual GPU",
            Self::Cpu => "CPU",
        })
    }
}

/// Properties of an accelerator as reported by the runtime
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct AcceleratorProperties {
    /// Human-readable device name
    pub name: String,

    pub device_type: DeviceType,

    /// Highest API version the accelerator supports
    pub api_version: ApiVersion,

    pub vendor_id: u32,
    pub device_id: u32,
}

/// A queue family of an accelerator
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct QueueFamilyDescriptor {
    /// Position of the family within its accelerator's list, used to address it when requesting queues
    pub index: u32,

    pub flags: QueueFlags,

    /// Number of queues available in this family
    pub queue_count: u32,
}

impl QueueFamilyDescriptor {
    /// Returns whether this family supports both graphics and compute work
    pub fn is_general(&self) -> bool {
        self.flags.contains(QueueFlags::GENERAL)
    }

    /// Returns whether this family supports compute work without also supporting graphics work
    pub fn is_dedicated_compute(&self) -> bool {
        self.flags.contains(QueueFlags::COMPUTE) && !self.is_general()
    }
}

/// An accelerator together with the information selection is based on
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct AcceleratorDescriptor<H> {
    /// Opaque handle assigned by the runtime
    pub handle: H,

    pub properties: AcceleratorProperties,

    /// Queue families in the order reported by the runtime
    pub queue_families: Vec<QueueFamilyDescriptor>,
}

/// The system-wide scheduling tier of a queue
///
/// The discriminants are those of `VkQueueGlobalPriorityKHR`. Drivers require `CAP_SYS_NICE` (or an equivalent
/// privilege) for tiers above [`GlobalPriority::Medium`].
#[derive(Clone, Copy, Debug, Default, Eq, FromPrimitive, Hash, Ord, PartialEq, PartialOrd)]
#[repr(u32)]
pub enum GlobalPriority {
    Low = 128,

    #[default]
    Medium = 256,

    High = 512,
    Realtime = 1024,
}

impl GlobalPriority {
    /// Returns the raw value of this [`GlobalPriority`]
    pub const fn raw(self) -> u32 {
        self as u32
    }

    /// Returns the [`GlobalPriority`] with the given raw value, if there is one
    pub fn from_raw(raw: u32) -> Option<Self> {
        Self::from_u32(raw)
    }
}

impl Display for GlobalPriority {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Realtime => "realtime",
        })
    }
}

/// A request for queues of a single family
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QueueRequest {
    pub queue_family_index: u32,

    /// Number of queues to create, always `1` for requests made by the negotiator
    pub queue_count: u32,

    /// Priority of the queues relative to other queues of the same device, between `0.0` and `1.0`
    pub queue_priority: f32,

    pub global_priority: GlobalPriority,
}

impl QueueRequest {
    /// Creates a request for a single queue of the given family with the highest relative priority
    pub const fn single(queue_family_index: u32, global_priority: GlobalPriority) -> Self {
        Self {
            queue_family_index,
            queue_count: 1,
            queue_priority: 1.0,
            global_priority,
        }
    }
}
