//! Fake collaborators with a fixed state

use std::cell::RefCell;
use std::io;

use rtprobe::{
    AcceleratorProperties, AcceleratorRuntime, ApiVersion, Capability, CapabilitySet, DeviceType, PrivilegeSource,
    QueueFamilyDescriptor, QueueFlags, QueueRequest, RuntimeError,
};

/// A [`PrivilegeSource`] returning fixed values
///
/// `None` makes the corresponding query fail with [`io::ErrorKind::PermissionDenied`].
#[derive(Clone, Copy, Debug, Default)]
pub struct FakePrivileges {
    pub capabilities: Option<CapabilitySet>,
    pub secure_execution: Option<bool>,
    pub last_capability: Option<u8>,
}

impl FakePrivileges {
    pub fn with_capabilities(capabilities: CapabilitySet) -> Self {
        Self {
            capabilities: Some(capabilities),
            secure_execution: Some(false),
            last_capability: Some(Capability::LAST.number()),
        }
    }

    pub fn failing() -> Self {
        Self::default()
    }
}

impl PrivilegeSource for FakePrivileges {
    fn capabilities(&self) -> io::Result<CapabilitySet> {
        self.capabilities.ok_or_else(|| permission_denied("capget"))
    }

    fn secure_execution(&self) -> io::Result<bool> {
        self.secure_execution.ok_or_else(|| permission_denied("getauxval"))
    }

    fn last_capability(&self) -> io::Result<u8> {
        self.last_capability.ok_or_else(|| permission_denied("reading cap_last_cap"))
    }
}

fn permission_denied(call: &str) -> io::Error {
    io::Error::new(io::ErrorKind::PermissionDenied, format!("{call} failed"))
}

/// A fake accelerator
#[derive(Clone, Debug)]
pub struct FakeAccelerator {
    pub properties: Result<AcceleratorProperties, RuntimeError>,
    pub queue_families: Result<Vec<QueueFamilyDescriptor>, RuntimeError>,
}

impl FakeAccelerator {
    /// Creates an accelerator with the given name and version and no queue families
    pub fn new(name: &str, api_version: ApiVersion) -> Self {
        Self {
            properties: Ok(AcceleratorProperties {
                name: name.to_owned(),
                device_type: DeviceType::DiscreteGpu,
                api_version,
                vendor_id: 0x1002,
                device_id: 0x73BF,
            }),
            queue_families: Ok(Vec::new()),
        }
    }

    /// Appends a queue family with the given flags, using the next index
    pub fn family(mut self, flags: QueueFlags) -> Self {
        if let Ok(queue_families) = &mut self.queue_families {
            queue_families.push(QueueFamilyDescriptor {
                index: queue_families.len() as u32,
                flags,
                queue_count: 1,
            });
        }

        self
    }

    /// Makes querying the properties fail
    pub fn failing_properties(mut self, err: RuntimeError) -> Self {
        self.properties = Err(err);
        self
    }

    /// Makes querying the queue families fail
    pub fn failing_queue_families(mut self, err: RuntimeError) -> Self {
        self.queue_families = Err(err);
        self
    }
}

/// A call made into a [`FakeRuntime`]
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    EnumerateAccelerators,
    Properties(usize),
    QueueFamilies(usize),
    CreateContext(usize, QueueRequest),
}

/// A context created by a [`FakeRuntime`]
#[derive(Clone, Debug, PartialEq)]
pub struct FakeContext {
    pub accelerator: usize,
    pub request: QueueRequest,
}

/// An [`AcceleratorRuntime`] with a fixed set of accelerators, recording all calls made into it
///
/// Handles are positions in the list of accelerators.
#[derive(Debug)]
pub struct FakeRuntime {
    accelerators: Result<Vec<FakeAccelerator>, RuntimeError>,
    create_result: Result<(), RuntimeError>,
    calls: RefCell<Vec<Call>>,
}

impl FakeRuntime {
    /// Creates a runtime with the given accelerators on which context creation succeeds
    pub fn new(accelerators: Vec<FakeAccelerator>) -> Self {
        Self {
            accelerators: Ok(accelerators),
            create_result: Ok(()),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Creates a runtime whose enumeration fails
    pub fn failing_enumeration(err: RuntimeError) -> Self {
        Self {
            accelerators: Err(err),
            create_result: Ok(()),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Makes context creation fail with the given error
    pub fn failing_creation(mut self, err: RuntimeError) -> Self {
        self.create_result = Err(err);
        self
    }

    /// Makes context creation fail as not permitted
    pub fn denying_creation(self) -> Self {
        self.failing_creation(RuntimeError::NotPermitted { call: "vkCreateDevice" })
    }

    /// Returns all calls made so far
    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    fn accelerator(&self, handle: usize) -> &FakeAccelerator {
        match &self.accelerators {
            Ok(accelerators) => &accelerators[handle],
            Err(..) => panic!("accelerator {handle} queried although enumeration failed"),
        }
    }
}

impl AcceleratorRuntime for FakeRuntime {
    type Handle = usize;
    type Context = FakeContext;

    fn enumerate_accelerators(&self) -> Result<Vec<usize>, RuntimeError> {
        self.record(Call::EnumerateAccelerators);
        self.accelerators
            .as_ref()
            .map(|accelerators| (0..accelerators.len()).collect())
            .map_err(Clone::clone)
    }

    fn properties(&self, accelerator: usize) -> Result<AcceleratorProperties, RuntimeError> {
        self.record(Call::Properties(accelerator));
        self.accelerator(accelerator).properties.clone()
    }

    fn queue_families(&self, accelerator: usize) -> Result<Vec<QueueFamilyDescriptor>, RuntimeError> {
        self.record(Call::QueueFamilies(accelerator));
        self.accelerator(accelerator).queue_families.clone()
    }

    fn create_context(&self, accelerator: usize, request: &QueueRequest) -> Result<FakeContext, RuntimeError> {
        self.record(Call::CreateContext(accelerator, *request));
        self.create_result.clone().map(|()| FakeContext {
            accelerator,
            request: *request,
        })
    }
}
