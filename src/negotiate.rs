//! Selecting an accelerator and negotiating a high-priority compute context with its driver

use std::fmt::Debug;

use tracing::{debug, info};

use crate::accelerator::{
    AcceleratorDescriptor, AcceleratorProperties, GlobalPriority, QueueFamilyDescriptor, QueueRequest,
};
use crate::error::{NegotiationFailure, RuntimeError};
use crate::version::ApiVersion;

/// An accelerator runtime, i.e. the driver-facing side of the negotiator
///
/// Implementations report failures of individual calls as [`RuntimeError`]s. A refusal of
/// [`create_context`](AcceleratorRuntime::create_context) because of missing privileges must be reported as
/// [`RuntimeError::NotPermitted`] so that it can be told apart from other failures.
pub trait AcceleratorRuntime {
    /// Opaque handle of an accelerator
    type Handle: Copy + Debug;

    /// A created execution context
    type Context;

    /// Returns handles of all accelerators visible to the runtime, in enumeration order
    fn enumerate_accelerators(&self) -> Result<Vec<Self::Handle>, RuntimeError>;

    /// Returns the properties of an accelerator
    fn properties(&self, accelerator: Self::Handle) -> Result<AcceleratorProperties, RuntimeError>;

    /// Returns the queue families of an accelerator, ordered by their index
    fn queue_families(&self, accelerator: Self::Handle) -> Result<Vec<QueueFamilyDescriptor>, RuntimeError>;

    /// Creates an execution context on an accelerator with the requested queues
    fn create_context(&self, accelerator: Self::Handle, request: &QueueRequest) -> Result<Self::Context, RuntimeError>;
}

/// The candidate queue families of a single accelerator
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct FamilyCandidates {
    /// Lowest index of a family supporting both graphics and compute work
    ///
    /// This is tracked for diagnostics only and never selected.
    pub general: Option<u32>,

    /// Lowest index of a family supporting compute work without graphics work
    pub compute: Option<u32>,
}

impl FamilyCandidates {
    /// Scans the given queue families for candidates
    pub fn scan(families: &[QueueFamilyDescriptor]) -> Self {
        families.iter().fold(Self::default(), |candidates, family| {
            if family.is_general() {
                Self {
                    general: min_index(candidates.general, family.index),
                    ..candidates
                }
            } else if family.is_dedicated_compute() {
                Self {
                    compute: min_index(candidates.compute, family.index),
                    ..candidates
                }
            } else {
                candidates
            }
        })
    }

    /// Returns the family to select, if any
    pub fn selected(&self) -> Option<u32> {
        self.compute
    }
}

fn min_index(current: Option<u32>, index: u32) -> Option<u32> {
    Some(current.map_or(index, |current| current.min(index)))
}

/// The result of a successful selection: an accelerator and one of its queue families
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Selection<H> {
    accelerator: AcceleratorDescriptor<H>,
    queue_family_index: u32,
}

impl<H> Selection<H> {
    /// Creates a [`Selection`] if the given family belongs to the accelerator and the accelerator meets the minimum
    /// version
    pub fn new(
        accelerator: AcceleratorDescriptor<H>,
        queue_family_index: u32,
        min_api_version: ApiVersion,
    ) -> Option<Self> {
        let has_family = accelerator
            .queue_families
            .iter()
            .any(|family| family.index == queue_family_index);

        (has_family && accelerator.properties.api_version >= min_api_version).then_some(Self {
            accelerator,
            queue_family_index,
        })
    }

    /// Returns the selected accelerator
    pub fn accelerator(&self) -> &AcceleratorDescriptor<H> {
        &self.accelerator
    }

    /// Returns the index of the selected queue family
    pub fn queue_family_index(&self) -> u32 {
        self.queue_family_index
    }
}

/// A negotiated high-priority compute context
///
/// The context is released when this is dropped.
#[derive(Debug)]
pub struct ExecutionContext<H, C> {
    context: C,
    selection: Selection<H>,
    priority: GlobalPriority,
}

impl<H, C> ExecutionContext<H, C> {
    /// Returns the runtime-specific context
    pub fn context(&self) -> &C {
        &self.context
    }

    /// Returns the selection the context was created from
    pub fn selection(&self) -> &Selection<H> {
        &self.selection
    }

    /// Returns the global priority the context was granted
    pub fn priority(&self) -> GlobalPriority {
        self.priority
    }

    /// Returns the runtime-specific context, consuming this [`ExecutionContext`]
    pub fn into_context(self) -> C {
        self.context
    }
}

/// The outcome of a negotiation
#[derive(Debug)]
pub enum Outcome<H, C> {
    /// The context was created with the requested priority
    Granted(ExecutionContext<H, C>),

    /// The driver refused the requested priority because of missing privileges
    DeniedByPolicy,

    /// Negotiation failed for any other reason
    Failed(NegotiationFailure),
}

impl<H, C> Outcome<H, C> {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted(..))
    }

    pub fn is_denied_by_policy(&self) -> bool {
        matches!(self, Self::DeniedByPolicy)
    }

    /// Returns the failure, if negotiation failed
    pub fn failure(&self) -> Option<&NegotiationFailure> {
        match self {
            Self::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Negotiates a high-priority compute context with an [`AcceleratorRuntime`]
///
/// Every call into the runtime is made at most once, there are no retries.
#[derive(Debug)]
pub struct Negotiator<'a, R> {
    runtime: &'a R,
}

impl<'a, R> Negotiator<'a, R>
where
    R: AcceleratorRuntime,
{
    /// Creates a new [`Negotiator`] for the given runtime
    pub const fn new(runtime: &'a R) -> Self {
        Self { runtime }
    }

    /// Selects an accelerator and a queue family
    ///
    /// Accelerators are considered in enumeration order. Those whose API version is below `min_api_version` are
    /// skipped, as are those whose properties or queue families cannot be queried. The first remaining accelerator
    /// with a family supporting compute but not graphics work is selected, using the lowest-indexed such family.
    /// Accelerators after it are not queried.
    ///
    /// # Errors
    /// Returns [`NegotiationFailure::Enumeration`] if the accelerators cannot be enumerated and
    /// [`NegotiationFailure::NoSuitableAccelerator`] if no accelerator qualifies
    pub fn select(&self, min_api_version: ApiVersion) -> Result<Selection<R::Handle>, NegotiationFailure> {
        let handles = self
            .runtime
            .enumerate_accelerators()
            .map_err(NegotiationFailure::Enumeration)?;

        debug!(count = handles.len(), "enumerated accelerators");

        for (position, handle) in handles.into_iter().enumerate() {
            let properties = match self.runtime.properties(handle) {
                Ok(properties) => properties,
                Err(err) => {
                    debug!(position, ?handle, error = %err, "skipping accelerator: failed to query properties");
                    continue;
                }
            };

            if properties.api_version < min_api_version {
                debug!(
                    position,
                    name = %properties.name,
                    api_version = %properties.api_version,
                    min_api_version = %min_api_version,
                    "skipping accelerator: API version too low",
                );
                continue;
            }

            let queue_families = match self.runtime.queue_families(handle) {
                Ok(queue_families) => queue_families,
                Err(err) => {
                    debug!(
                        position,
                        name = %properties.name,
                        error = %err,
                        "skipping accelerator: failed to query queue families",
                    );
                    continue;
                }
            };

            let candidates = FamilyCandidates::scan(&queue_families);

            debug!(
                position,
                name = %properties.name,
                general = ?candidates.general,
                compute = ?candidates.compute,
                "scanned queue families",
            );

            let Some(queue_family_index) = candidates.selected() else {
                continue;
            };

            let accelerator = AcceleratorDescriptor {
                handle,
                properties,
                queue_families,
            };

            if let Some(selection) = Selection::new(accelerator, queue_family_index, min_api_version) {
                info!(
                    position,
                    name = %selection.accelerator().properties.name,
                    queue_family_index,
                    "selected accelerator",
                );

                return Ok(selection);
            }
        }

        Err(NegotiationFailure::NoSuitableAccelerator)
    }

    /// Requests a context with a single queue of the selected family at the given priority
    pub fn negotiate(
        &self,
        selection: Selection<R::Handle>,
        priority: GlobalPriority,
    ) -> Outcome<R::Handle, R::Context> {
        let request = QueueRequest::single(selection.queue_family_index(), priority);

        match self.runtime.create_context(selection.accelerator().handle, &request) {
            Ok(context) => {
                info!(%priority, "execution context granted");

                Outcome::Granted(ExecutionContext {
                    context,
                    selection,
                    priority,
                })
            }

            Err(err) if err.is_not_permitted() => {
                info!(%priority, "execution context denied by policy");
                Outcome::DeniedByPolicy
            }

            Err(err) => Outcome::Failed(NegotiationFailure::ContextCreation(err)),
        }
    }

    /// Selects an accelerator and queue family and negotiates a context on it
    ///
    /// See [`select`](Negotiator::select) and [`negotiate`](Negotiator::negotiate).
    pub fn select_and_negotiate(
        &self,
        min_api_version: ApiVersion,
        priority: GlobalPriority,
    ) -> Outcome<R::Handle, R::Context> {
        match self.select(min_api_version) {
            Ok(selection) => self.negotiate(selection, priority),
            Err(failure) => Outcome::Failed(failure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accelerator::QueueFlags;

    fn families(flags: &[QueueFlags]) -> Vec<QueueFamilyDescriptor> {
        flags
            .iter()
            .enumerate()
            .map(|(index, &flags)| QueueFamilyDescriptor {
                index: index as u32,
                flags,
                queue_count: 1,
            })
            .collect()
    }

    #[test]
    fn scan_empty() {
        assert_eq!(FamilyCandidates::scan(&[]), FamilyCandidates::default());
    }

    #[test]
    fn scan_tracks_lowest_indices_separately() {
        let candidates = FamilyCandidates::scan(&families(&[
            QueueFlags::TRANSFER,
            QueueFlags::GRAPHICS | QueueFlags::COMPUTE | QueueFlags::TRANSFER,
            QueueFlags::COMPUTE | QueueFlags::TRANSFER,
            QueueFlags::GRAPHICS | QueueFlags::COMPUTE,
            QueueFlags::COMPUTE,
        ]));

        assert_eq!(candidates.general, Some(1));
        assert_eq!(candidates.compute, Some(2));
        assert_eq!(candidates.selected(), Some(2));
    }

    #[test]
    fn scan_does_not_select_general_family() {
        let candidates = FamilyCandidates::scan(&families(&[QueueFlags::GRAPHICS | QueueFlags::COMPUTE]));

        assert_eq!(candidates.general, Some(0));
        assert_eq!(candidates.selected(), None);
    }

    #[test]
    fn scan_uses_reported_indices() {
        let candidates = FamilyCandidates::scan(&[
            QueueFamilyDescriptor {
                index: 5,
                flags: QueueFlags::COMPUTE,
                queue_count: 1,
            },
            QueueFamilyDescriptor {
                index: 3,
                flags: QueueFlags::COMPUTE,
                queue_count: 1,
            },
        ]);

        assert_eq!(candidates.compute, Some(3));
    }

    #[test]
    fn selection_requires_family_of_same_accelerator() {
        let accelerator = AcceleratorDescriptor {
            handle: 0,
            properties: AcceleratorProperties {
                api_version: ApiVersion::V1_2,
                ..AcceleratorProperties::default()
            },
            queue_families: families(&[QueueFlags::COMPUTE]),
        };

        assert!(Selection::new(accelerator.clone(), 0, ApiVersion::V1_2).is_some());
        assert!(Selection::new(accelerator.clone(), 1, ApiVersion::V1_2).is_none());
        assert!(Selection::new(accelerator, 0, ApiVersion::V1_3).is_none());
    }
}
