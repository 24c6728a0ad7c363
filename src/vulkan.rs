//! An [`AcceleratorRuntime`] backed by the Vulkan loader
//!
//! Accelerators are Vulkan physical devices, execution contexts are logical devices with a single queue created with
//! a global priority (`VK_KHR_global_priority`/`VK_EXT_global_priority`).

use std::ffi::{c_char, CStr};
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::accelerator::{AcceleratorProperties, DeviceType, QueueFamilyDescriptor, QueueFlags, QueueRequest};
use crate::error::RuntimeError;
use crate::negotiate::AcceleratorRuntime;
use crate::version::ApiVersion;

/// Target used for logging calls to Vulkan functions using the `tracing` crate
pub(crate) const TRACING_TARGET: &str = "rtprobe::vulkan";

/// Device extensions enabling global queue priorities, in order of preference
const GLOBAL_PRIORITY_EXTENSIONS: [&CStr; 2] = [c"VK_KHR_global_priority", c"VK_EXT_global_priority"];

/// Parameters of the Vulkan instance created by a [`VulkanRuntime`]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct RuntimeConfig {
    pub application_name: &'static CStr,
    pub application_version: ApiVersion,
    pub engine_name: &'static CStr,
    pub engine_version: ApiVersion,

    /// Highest API version the application uses
    pub api_version: ApiVersion,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            application_name: c"rtprobe",
            application_version: ApiVersion::V1_0,
            engine_name: c"no engine",
            engine_version: ApiVersion::V1_0,
            api_version: ApiVersion::V1_2,
        }
    }
}

/// Owner of the Vulkan instance, shared between the runtime and the contexts created from it
struct InstanceOwner {
    // Keeps the loader library loaded while the instance is alive
    _entry: ash::Entry,
    instance: ash::Instance,
}

impl Drop for InstanceOwner {
    fn drop(&mut self) {
        debug!(target: TRACING_TARGET, instance = ?self.instance.handle(), "vkDestroyInstance");

        // SAFETY:
        // - The instance was created by `vkCreateInstance` and is destroyed only here
        // - All devices created from it hold an `Arc<InstanceOwner>`, so they have been destroyed already
        unsafe { self.instance.destroy_instance(None) };
    }
}

/// A Vulkan instance
pub struct VulkanRuntime {
    owner: Arc<InstanceOwner>,
}

impl VulkanRuntime {
    /// Loads the Vulkan loader and creates an instance
    ///
    /// # Errors
    /// Returns [`RuntimeError::Unavailable`] if the loader cannot be found and another [`RuntimeError`] if creating
    /// the instance fails
    pub fn new(config: &RuntimeConfig) -> Result<Self, RuntimeError> {
        // SAFETY:
        // The loader is trusted to be a conforming Vulkan implementation, no other code of this process depends on
        // the state of the dynamic linker
        let entry = unsafe { ash::Entry::load() }.map_err(|err| RuntimeError::Unavailable(err.to_string()))?;

        let application_info = vk::ApplicationInfo::default()
            .application_name(config.application_name)
            .application_version(config.application_version.into())
            .engine_name(config.engine_name)
            .engine_version(config.engine_version.into())
            .api_version(config.api_version.into());

        let create_info = vk::InstanceCreateInfo::default().application_info(&application_info);

        // SAFETY:
        // `create_info` and everything it points to are valid for the duration of the call because they are live
        // locals
        let result = unsafe { entry.create_instance(&create_info, None) };

        debug!(
            target: TRACING_TARGET,
            result = ?result.as_ref().map(ash::Instance::handle),
            input.api_version = %config.api_version,
            "vkCreateInstance",
        );

        let instance = result.map_err(|result| runtime_error("vkCreateInstance", result))?;

        Ok(Self {
            owner: Arc::new(InstanceOwner {
                _entry: entry,
                instance,
            }),
        })
    }

    fn instance(&self) -> &ash::Instance {
        &self.owner.instance
    }
}

impl Debug for VulkanRuntime {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("VulkanRuntime")
            .field("instance", &self.instance().handle())
            .finish()
    }
}

impl AcceleratorRuntime for VulkanRuntime {
    type Handle = vk::PhysicalDevice;
    type Context = VulkanContext;

    fn enumerate_accelerators(&self) -> Result<Vec<Self::Handle>, RuntimeError> {
        // SAFETY:
        // The instance is valid as long as `self` is live
        let result = unsafe { self.instance().enumerate_physical_devices() };

        debug!(
            target: TRACING_TARGET,
            result = ?result.as_ref().map(Vec::len),
            "vkEnumeratePhysicalDevices",
        );

        result.map_err(|result| runtime_error("vkEnumeratePhysicalDevices", result))
    }

    fn properties(&self, accelerator: Self::Handle) -> Result<AcceleratorProperties, RuntimeError> {
        // SAFETY:
        // `accelerator` was enumerated from this instance
        let properties = unsafe { self.instance().get_physical_device_properties(accelerator) };

        let properties = AcceleratorProperties {
            name: fixed_string(&properties.device_name),
            device_type: DeviceType::from_raw(properties.device_type.as_raw()),
            api_version: ApiVersion::from(properties.api_version),
            vendor_id: properties.vendor_id,
            device_id: properties.device_id,
        };

        debug!(
            target: TRACING_TARGET,
            physical_device = ?accelerator,
            output.name = %properties.name,
            output.api_version = %properties.api_version,
            "vkGetPhysicalDeviceProperties",
        );

        Ok(properties)
    }

    fn queue_families(&self, accelerator: Self::Handle) -> Result<Vec<QueueFamilyDescriptor>, RuntimeError> {
        // SAFETY:
        // `accelerator` was enumerated from this instance
        let properties = unsafe { self.instance().get_physical_device_queue_family_properties(accelerator) };

        debug!(
            target: TRACING_TARGET,
            physical_device = ?accelerator,
            output.count = properties.len(),
            "vkGetPhysicalDeviceQueueFamilyProperties",
        );

        let families = properties
            .iter()
            .enumerate()
            .map(|(index, properties)| {
                let index = u32::try_from(index).map_err(|_| RuntimeError::Truncated {
                    call: "vkGetPhysicalDeviceQueueFamilyProperties",
                    code: vk::Result::INCOMPLETE.as_raw(),
                })?;

                Ok(QueueFamilyDescriptor {
                    index,
                    flags: QueueFlags::from_bits_retain(properties.queue_flags.as_raw()),
                    queue_count: properties.queue_count,
                })
            })
            .collect::<Result<_, _>>()?;

        Ok(families)
    }

    fn create_context(&self, accelerator: Self::Handle, request: &QueueRequest) -> Result<Self::Context, RuntimeError> {
        let priority_extension = self.global_priority_extension(accelerator)?;

        let queue_priorities = vec![request.queue_priority; request.queue_count as usize];

        let mut global_priority_info = vk::DeviceQueueGlobalPriorityCreateInfoKHR::default()
            .global_priority(vk::QueueGlobalPriorityKHR::from_raw(request.global_priority.raw() as i32));

        let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
            .queue_family_index(request.queue_family_index)
            .queue_priorities(&queue_priorities)
            .push_next(&mut global_priority_info)];

        let extension_names: Vec<*const c_char> = priority_extension.iter().map(|name| name.as_ptr()).collect();

        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&extension_names);

        // SAFETY:
        // - `accelerator` was enumerated from this instance
        // - `create_info` and everything it points to are valid for the duration of the call because they are live
        //   locals
        let result = unsafe { self.instance().create_device(accelerator, &create_info, None) };

        debug!(
            target: TRACING_TARGET,
            result = ?result.as_ref().map(ash::Device::handle),
            input.physical_device = ?accelerator,
            input.queue_family_index = request.queue_family_index,
            input.queue_count = request.queue_count,
            input.global_priority = %request.global_priority,
            input.extension = ?priority_extension,
            "vkCreateDevice",
        );

        let device = result.map_err(|result| runtime_error("vkCreateDevice", result))?;

        // SAFETY:
        // The device was created with `request.queue_count >= 1` queues of `request.queue_family_index`
        let queue = unsafe { device.get_device_queue(request.queue_family_index, 0) };

        Ok(VulkanContext {
            device,
            queue,
            _owner: Arc::clone(&self.owner),
        })
    }
}

impl VulkanRuntime {
    /// Returns the name of the global priority extension supported by the given physical device, if any
    fn global_priority_extension(
        &self,
        accelerator: vk::PhysicalDevice,
    ) -> Result<Option<&'static CStr>, RuntimeError> {
        // SAFETY:
        // `accelerator` was enumerated from this instance
        let result = unsafe { self.instance().enumerate_device_extension_properties(accelerator) };

        debug!(
            target: TRACING_TARGET,
            result = ?result.as_ref().map(Vec::len),
            input.physical_device = ?accelerator,
            "vkEnumerateDeviceExtensionProperties",
        );

        let extensions = result.map_err(|result| runtime_error("vkEnumerateDeviceExtensionProperties", result))?;

        Ok(GLOBAL_PRIORITY_EXTENSIONS.into_iter().find(|name| {
            extensions
                .iter()
                .any(|extension| fixed_string(&extension.extension_name).as_bytes() == name.to_bytes())
        }))
    }
}

/// A Vulkan logical device with a single high-priority queue
///
/// The device is destroyed when this is dropped.
pub struct VulkanContext {
    device: ash::Device,
    queue: vk::Queue,
    _owner: Arc<InstanceOwner>,
}

impl VulkanContext {
    /// Returns the raw handle of the logical device
    pub fn device(&self) -> vk::Device {
        self.device.handle()
    }

    /// Returns the raw handle of the created queue
    pub fn queue(&self) -> vk::Queue {
        self.queue
    }
}

impl Debug for VulkanContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("VulkanContext")
            .field("device", &self.device.handle())
            .field("queue", &self.queue)
            .finish()
    }
}

impl Drop for VulkanContext {
    fn drop(&mut self) {
        debug!(target: TRACING_TARGET, device = ?self.device.handle(), "vkDestroyDevice");

        // SAFETY:
        // - The device was created by `vkCreateDevice` and is destroyed only here
        // - No objects have been created from the device
        // - The instance is still alive because `self._owner` is live
        unsafe { self.device.destroy_device(None) };
    }
}

/// Maps a Vulkan result code to a [`RuntimeError`]
fn runtime_error(call: &'static str, result: vk::Result) -> RuntimeError {
    match result {
        vk::Result::INCOMPLETE => RuntimeError::Truncated {
            call,
            code: result.as_raw(),
        },
        vk::Result::ERROR_NOT_PERMITTED_KHR => RuntimeError::NotPermitted { call },
        result => RuntimeError::Failed {
            call,
            code: result.as_raw(),
        },
    }
}

/// Converts a fixed-size, null-terminated string reported by Vulkan into a [`String`]
///
/// Everything from the first null character on is ignored. If there is none, the whole array is used.
fn fixed_string(chars: &[c_char]) -> String {
    let bytes: Vec<u8> = chars.iter().take_while(|&&c| c != 0).map(|&c| c as u8).collect();
    String::from_utf8_lossy(&bytes).into_owned()
}
