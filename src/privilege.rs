//! Checking the privileges of the current process

use std::fmt::{self, Display, Formatter};
use std::{fs, io};

use tracing::{debug, warn};

use crate::capability::{Capability, CapabilitySet};
use crate::capsys;

/// A source of privilege information about the current process
///
/// [`ProcessPrivileges`] reads the actual state from the operating system. Other implementations can be used to
/// exercise a [`PrivilegeGate`] with a fixed state.
pub trait PrivilegeSource {
    /// Returns the capability sets of the calling thread
    fn capabilities(&self) -> io::Result<CapabilitySet>;

    /// Returns whether the process runs in secure-execution mode (`AT_SECURE`), e.g. because it was started from a
    /// set-user-ID binary or a binary with file capabilities
    fn secure_execution(&self) -> io::Result<bool>;

    /// Returns the number of the highest capability known to the kernel
    fn last_capability(&self) -> io::Result<u8>;
}

impl<S> PrivilegeSource for &S
where
    S: PrivilegeSource + ?Sized,
{
    fn capabilities(&self) -> io::Result<CapabilitySet> {
        (**self).capabilities()
    }

    fn secure_execution(&self) -> io::Result<bool> {
        (**self).secure_execution()
    }

    fn last_capability(&self) -> io::Result<u8> {
        (**self).last_capability()
    }
}

/// The privileges of the current process as reported by the Linux kernel
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessPrivileges;

impl PrivilegeSource for ProcessPrivileges {
    fn capabilities(&self) -> io::Result<CapabilitySet> {
        let mut header = capsys::CapUserHeader {
            version: capsys::LINUX_CAPABILITY_VERSION_3,
            pid: 0,
        };

        let mut data = [capsys::CapUserData::default(); capsys::LINUX_CAPABILITY_U32S_3];

        // SAFETY:
        // - The pointer in the first argument is valid for reads and writes of `CapUserHeader` because it comes from a
        //   live mutable reference
        // - The pointer in the second argument is valid for writes of `[CapUserData; LINUX_CAPABILITY_U32S_3]` because
        //   it comes from a live mutable reference to an array of that type
        let result = unsafe { capsys::capget(&mut header, data.as_mut_ptr()) };

        if result == 0 {
            let set = CapabilitySet {
                effective: combine(data[0].effective, data[1].effective),
                permitted: combine(data[0].permitted, data[1].permitted),
                inheritable: combine(data[0].inheritable, data[1].inheritable),
            };

            debug!(
                target: capsys::TRACING_TARGET,
                result,
                input.version = capsys::LINUX_CAPABILITY_VERSION_3,
                output.effective = set.effective,
                output.permitted = set.permitted,
                output.inheritable = set.inheritable,
                "capget",
            );

            Ok(set)
        } else {
            let err = io::Error::last_os_error();

            debug!(
                target: capsys::TRACING_TARGET,
                result,
                error = %err,
                input.version = capsys::LINUX_CAPABILITY_VERSION_3,
                output.version = header.version,
                "capget",
            );

            Err(err)
        }
    }

    fn secure_execution(&self) -> io::Result<bool> {
        // `getauxval` does not reset `errno` on success, so it has to be cleared to tell a value of `0` apart from a
        // missing entry

        // SAFETY:
        // `__errno_location` always returns a valid pointer to the calling thread's `errno`
        unsafe { *libc::__errno_location() = 0 };

        // SAFETY:
        // Calling this function is always safe
        let value = unsafe { libc::getauxval(libc::AT_SECURE) };

        let err = io::Error::last_os_error();

        debug!(
            target: capsys::TRACING_TARGET,
            value,
            errno = ?err.raw_os_error(),
            input.entry = "AT_SECURE",
            "getauxval",
        );

        if value == 0 && err.raw_os_error() == Some(libc::ENOENT) {
            Err(err)
        } else {
            Ok(value != 0)
        }
    }

    fn last_capability(&self) -> io::Result<u8> {
        let result = fs::read_to_string(CAP_LAST_CAP_PATH);

        debug!(
            target: capsys::TRACING_TARGET,
            result = ?result.as_deref().map(str::trim),
            input.path = CAP_LAST_CAP_PATH,
            "read cap_last_cap",
        );

        result?
            .trim()
            .parse()
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
    }
}

/// Path of the file exposing the number of the highest capability known to the kernel
const CAP_LAST_CAP_PATH: &str = "/proc/sys/kernel/cap_last_cap";

fn combine(low: u32, high: u32) -> u64 {
    (u64::from(high) << 32) | u64::from(low)
}

/// The privilege state of the process at one point in time
#[derive(Debug)]
pub struct PrivilegeSnapshot {
    pub capabilities: io::Result<CapabilitySet>,
    pub secure_execution: io::Result<bool>,

    /// Number of the highest capability known to the kernel, bounding the capability text
    pub last_capability: u8,
}

/// Renders the snapshot as `Has caps: <capabilities> - AT_SECURE: <0|1>`
impl Display for PrivilegeSnapshot {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("Has caps: ")?;

        match &self.capabilities {
            Ok(capabilities) => write!(f, "{}", capabilities.to_text(self.last_capability))?,
            Err(err) => write!(f, "<unavailable: {err}>")?,
        }

        f.write_str(" - AT_SECURE: ")?;

        match &self.secure_execution {
            Ok(secure_execution) => write!(f, "{}", u8::from(*secure_execution)),
            Err(err) => write!(f, "<unavailable: {err}>"),
        }
    }
}

/// Decides whether the process holds the privilege required for realtime scheduling
#[derive(Debug)]
pub struct PrivilegeGate<S> {
    source: S,
}

impl<S> PrivilegeGate<S>
where
    S: PrivilegeSource,
{
    /// The capability that has to be in effect for requesting realtime queues
    pub const REQUIRED: Capability = Capability::SysNice;

    /// Creates a new [`PrivilegeGate`] reading from the given source
    pub const fn new(source: S) -> Self {
        Self { source }
    }

    /// Returns the capability required by this gate
    pub const fn required(&self) -> Capability {
        Self::REQUIRED
    }

    /// Returns whether the required capability is in effect
    ///
    /// A capability that is merely permitted does not count. If the capabilities cannot be queried, this returns
    /// `false`.
    pub fn has_required_privilege(&self) -> bool {
        match self.source.capabilities() {
            Ok(capabilities) => capabilities.is_effective(Self::REQUIRED),

            Err(err) => {
                warn!(error = %err, "failed to query capabilities, assuming {} is absent", Self::REQUIRED);
                false
            }
        }
    }

    /// Takes a snapshot of the full privilege state for diagnostics
    ///
    /// If the kernel does not report its highest capability, all capabilities known to this crate are considered.
    pub fn snapshot(&self) -> PrivilegeSnapshot {
        let last_capability = self.source.last_capability().unwrap_or_else(|err| {
            debug!(error = %err, "failed to query highest capability, assuming {}", Capability::LAST);
            Capability::LAST.number()
        });

        PrivilegeSnapshot {
            capabilities: self.source.capabilities(),
            secure_execution: self.source.secure_execution(),
            last_capability,
        }
    }

    /// Renders the full privilege state in human-readable form
    ///
    /// See [`PrivilegeSnapshot`] for the format.
    pub fn describe_privileges(&self) -> String {
        self.snapshot().to_string()
    }
}
