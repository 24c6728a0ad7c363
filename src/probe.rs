//! Running the probe from start to finish

use std::io::{self, Write};

use tracing::info;

use crate::accelerator::GlobalPriority;
use crate::capability::Capability;
use crate::error::{ProbeError, RuntimeError};
use crate::negotiate::{AcceleratorRuntime, ExecutionContext, Negotiator, Outcome};
use crate::privilege::{PrivilegeGate, PrivilegeSource};
use crate::version::ApiVersion;

/// Options of a [`Probe`]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ProbeOptions {
    min_api_version: ApiVersion,
    priority: GlobalPriority,
}

impl ProbeOptions {
    /// Creates [`ProbeOptions`] with the defaults: minimum API version 1.2 and [`GlobalPriority::Realtime`]
    pub const fn new() -> Self {
        Self {
            min_api_version: ApiVersion::V1_2,
            priority: GlobalPriority::Realtime,
        }
    }

    /// Sets the minimum API version an accelerator must report to be selected
    pub const fn min_api_version(self, min_api_version: ApiVersion) -> Self {
        Self {
            min_api_version,
            ..self
        }
    }

    /// Sets the global priority to request
    pub const fn priority(self, priority: GlobalPriority) -> Self {
        Self { priority, ..self }
    }
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// The final result of running a [`Probe`]
#[derive(Debug)]
pub enum ProbeReport<H, C> {
    /// The required capability is not in effect, the accelerator runtime was not touched
    NoPrivilege { required: Capability },

    /// A context with the requested priority was created
    Granted(ExecutionContext<H, C>),

    /// The driver refused the requested priority
    DeniedByPolicy { priority: GlobalPriority },

    Failed(ProbeError),
}

impl<H, C> ProbeReport<H, C> {
    /// Returns whether this report represents a hard failure
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(..))
    }

    /// Returns the process exit code for this report: `1` for failures, `0` otherwise
    pub fn exit_code(&self) -> u8 {
        u8::from(self.is_failure())
    }

    /// Writes the final message of this report
    ///
    /// Informational messages go to `out`, failures go to `err`.
    pub fn write_to<O, E>(&self, out: &mut O, err: &mut E) -> io::Result<()>
    where
        O: Write + ?Sized,
        E: Write + ?Sized,
    {
        match self {
            Self::NoPrivilege { required } => writeln!(out, "Does not have {required}."),

            Self::Granted(context) => {
                writeln!(out, "Device created with {} priority successfully!", context.priority())
            }

            Self::DeniedByPolicy { priority } => {
                writeln!(out, "No permission to create device with {priority} priority")
            }

            Self::Failed(error) => writeln!(err, "{error}"),
        }
    }
}

/// The probe: a privilege gate followed by a negotiation with the accelerator runtime
#[derive(Debug)]
pub struct Probe<S> {
    gate: PrivilegeGate<S>,
    options: ProbeOptions,
}

impl<S> Probe<S>
where
    S: PrivilegeSource,
{
    pub const fn new(gate: PrivilegeGate<S>, options: ProbeOptions) -> Self {
        Self { gate, options }
    }

    pub fn gate(&self) -> &PrivilegeGate<S> {
        &self.gate
    }

    pub fn options(&self) -> ProbeOptions {
        self.options
    }

    /// Runs the probe
    ///
    /// If the gate does not find the required privilege, this returns [`ProbeReport::NoPrivilege`] without calling
    /// `connect`. Otherwise `connect` is called once to obtain the runtime and a single negotiation is made.
    pub fn run<R, F>(&self, connect: F) -> ProbeReport<R::Handle, R::Context>
    where
        R: AcceleratorRuntime,
        F: FnOnce() -> Result<R, RuntimeError>,
    {
        if !self.gate.has_required_privilege() {
            info!(required = %self.gate.required(), "required privilege absent");

            return ProbeReport::NoPrivilege {
                required: self.gate.required(),
            };
        }

        let runtime = match connect() {
            Ok(runtime) => runtime,
            Err(err) => return ProbeReport::Failed(err.into()),
        };

        let negotiator = Negotiator::new(&runtime);

        match negotiator.select_and_negotiate(self.options.min_api_version, self.options.priority) {
            Outcome::Granted(context) => ProbeReport::Granted(context),

            Outcome::DeniedByPolicy => ProbeReport::DeniedByPolicy {
                priority: self.options.priority,
            },

            Outcome::Failed(failure) => ProbeReport::Failed(failure.into()),
        }
    }
}
