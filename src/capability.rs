//! Linux capabilities and capability sets

#![deny(unsafe_code)]

use std::fmt::{self, Display, Formatter};

use bitflags::bitflags;
use num_traits::FromPrimitive;

/// A Linux capability
///
/// The discriminant of each variant is the capability number used by the kernel.
#[derive(Clone, Copy, Debug, Eq, FromPrimitive, Hash, Ord, PartialEq, PartialOrd)]
#[repr(u8)]
pub enum Capability {
    Chown = 0,
    DacOverride = 1,
    DacReadSearch = 2,
    Fowner = 3,
    Fsetid = 4,
    Kill = 5,
    Setgid = 6,
    Setuid = 7,
    Setpcap = 8,
    LinuxImmutable = 9,
    NetBindService = 10,
    NetBroadcast = 11,
    NetAdmin = 12,
    NetRaw = 13,
    IpcLock = 14,
    IpcOwner = 15,
    SysModule = 16,
    SysRawio = 17,
    SysChroot = 18,
    SysPtrace = 19,
    SysPacct = 20,
    SysAdmin = 21,
    SysBoot = 22,

    /// Allows raising the scheduling priority of processes and setting realtime scheduling policies
    ///
    /// GPU drivers consult this capability before granting queues with a global priority above
    /// [`GlobalPriority::Medium`](crate::GlobalPriority::Medium).
    SysNice = 23,

    SysResource = 24,
    SysTime = 25,
    SysTtyConfig = 26,
    Mknod = 27,
    Lease = 28,
    AuditWrite = 29,
    AuditControl = 30,
    Setfcap = 31,
    MacOverride = 32,
    MacAdmin = 33,
    Syslog = 34,
    WakeAlarm = 35,
    BlockSuspend = 36,
    AuditRead = 37,
    Perfmon = 38,
    Bpf = 39,
    CheckpointRestore = 40,
}

impl Capability {
    /// The capability with the highest number known to this crate
    pub const LAST: Self = Self::CheckpointRestore;

    /// Returns the capability with the given number, if it is known to this crate
    pub fn from_number(number: u8) -> Option<Self> {
        Self::from_u8(number)
    }

    /// Returns the number of this capability
    pub const fn number(self) -> u8 {
        self as u8
    }

    /// Returns an iterator over all capabilities known to this crate, in ascending order of their numbers
    pub fn all() -> impl Iterator<Item = Self> {
        (0..=Self::LAST.number()).filter_map(Self::from_number)
    }

    /// Returns the canonical lowercase name of this capability, e.g. `cap_sys_nice`
    pub const fn name(self) -> &'static str {
        match self {
            Self::Chown => "cap_chown",
            Self::DacOverride => "cap_dac_override",
            Self::DacReadSearch => "cap_dac_read_search",
            Self::Fowner => "cap_fowner",
            Self::Fsetid => "cap_fsetid",
            Self::Kill => "cap_kill",
            Self::Setgid => "cap_setgid",
            Self::Setuid => "cap_setuid",
            Self::Setpcap => "cap_setpcap",
            Self::LinuxImmutable => "cap_linux_immutable",
            Self::NetBindService => "cap_net_bind_service",
            Self::NetBroadcast => "cap_net_broadcast",
            Self::NetAdmin => "cap_net_admin",
            Self::NetRaw => "cap_net_raw",
            Self::IpcLock => "cap_ipc_lock",
            Self::IpcOwner => "cap_ipc_owner",
            Self::SysModule => "cap_sys_module",
            Self::SysRawio => "cap_sys_rawio",
            Self::SysChroot => "cap_sys_chroot",
            Self::SysPtrace => "cap_sys_ptrace",
            Self::SysPacct => "cap_sys_pacct",
            Self::SysAdmin => "cap_sys_admin",
            Self::SysBoot => "cap_sys_boot",
            Self::SysNice => "cap_sys_nice",
            Self::SysResource => "cap_sys_resource",
            Self::SysTime => "cap_sys_time",
            Self::SysTtyConfig => "cap_sys_tty_config",
            Self::Mknod => "cap_mknod",
            Self::Lease => "cap_lease",
            Self::AuditWrite => "cap_audit_write",
            Self::AuditControl => "cap_audit_control",
            Self::Setfcap => "cap_setfcap",
            Self::MacOverride => "cap_mac_override",
            Self::MacAdmin => "cap_mac_admin",
            Self::Syslog => "cap_syslog",
            Self::WakeAlarm => "cap_wake_alarm",
            Self::BlockSuspend => "cap_block_suspend",
            Self::AuditRead => "cap_audit_read",
            Self::Perfmon => "cap_perfmon",
            Self::Bpf => "cap_bpf",
            Self::CheckpointRestore => "cap_checkpoint_restore",
        }
    }

    const fn mask(self) -> u64 {
        1 << self.number()
    }
}

/// Displays the conventional uppercase name, e.g. `CAP_SYS_NICE`
impl Display for Capability {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name().to_ascii_uppercase())
    }
}

bitflags! {
    /// The sets a single capability is a member of
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub struct CapabilityFlags: u8 {
        const EFFECTIVE = 1 << 0;
        const INHERITABLE = 1 << 1;
        const PERMITTED = 1 << 2;
    }
}

/// Writes the flags in `eip` order, as `cap_to_text` does
impl Display for CapabilityFlags {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (flag, letter) in [(Self::EFFECTIVE, 'e'), (Self::INHERITABLE, 'i'), (Self::PERMITTED, 'p')] {
            if self.contains(flag) {
                write!(f, "{letter}")?;
            }
        }

        Ok(())
    }
}

/// A snapshot of the capability sets of a thread
///
/// Each set is a bit mask indexed by capability number. Bits beyond [`Capability::LAST`] are preserved so that
/// capabilities introduced by newer kernels are not lost.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct CapabilitySet {
    /// Capabilities currently in effect, i.e. used for permission checks
    pub effective: u64,

    /// Capabilities the thread may make effective
    pub permitted: u64,

    /// Capabilities preserved across `execve`
    pub inheritable: u64,
}

impl CapabilitySet {
    /// Creates an empty [`CapabilitySet`]
    pub const fn empty() -> Self {
        Self {
            effective: 0,
            permitted: 0,
            inheritable: 0,
        }
    }

    /// Returns a copy of this set with the given capability added to the sets given by `flags`
    pub fn with(mut self, capability: Capability, flags: CapabilityFlags) -> Self {
        if flags.contains(CapabilityFlags::EFFECTIVE) {
            self.effective |= capability.mask();
        }

        if flags.contains(CapabilityFlags::INHERITABLE) {
            self.inheritable |= capability.mask();
        }

        if flags.contains(CapabilityFlags::PERMITTED) {
            self.permitted |= capability.mask();
        }

        self
    }

    /// Returns whether the given capability is in effect
    pub const fn is_effective(&self, capability: Capability) -> bool {
        self.effective & capability.mask() != 0
    }

    /// Returns whether the given capability is permitted, regardless of whether it is in effect
    pub const fn is_permitted(&self, capability: Capability) -> bool {
        self.permitted & capability.mask() != 0
    }

    /// Returns whether the given capability is inheritable
    pub const fn is_inheritable(&self, capability: Capability) -> bool {
        self.inheritable & capability.mask() != 0
    }

    /// Returns the sets the capability with the given number is a member of
    pub fn flags(&self, number: u8) -> CapabilityFlags {
        let Some(mask) = 1u64.checked_shl(number.into()) else {
            return CapabilityFlags::empty();
        };

        let mut flags = CapabilityFlags::empty();
        flags.set(CapabilityFlags::EFFECTIVE, self.effective & mask != 0);
        flags.set(CapabilityFlags::INHERITABLE, self.inheritable & mask != 0);
        flags.set(CapabilityFlags::PERMITTED, self.permitted & mask != 0);
        flags
    }

    /// Returns whether no capability is in any of the sets
    pub const fn is_empty(&self) -> bool {
        self.effective == 0 && self.permitted == 0 && self.inheritable == 0
    }

    /// Returns a value rendering this set in the textual form used by `cap_to_text(3)`
    ///
    /// Capabilities up to and including number `last` are considered known to the kernel (see
    /// `/proc/sys/kernel/cap_last_cap`), the base clause is chosen among them.
    pub fn to_text(&self, last: u8) -> CapabilityText {
        CapabilityText { set: *self, last }
    }
}

/// Renders the set as [`CapabilitySet::to_text`] with all capabilities known to this crate
impl Display for CapabilitySet {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.to_text(Capability::LAST.number()), f)
    }
}

/// The textual form of a [`CapabilitySet`], as produced by `cap_to_text(3)`
///
/// The most common combination of sets among the known capabilities becomes the base clause, e.g. `=ep`. Every
/// other combination gets one clause naming its capabilities together with the sets added to (`+`) or removed from
/// (`-`) the base, e.g. `=ep cap_sys_resource-ep`. If the base is empty, the leading `=` is merged into the first
/// clause, e.g. `cap_sys_nice=ep cap_net_raw+p`. Ties go to the lower combination, so an even split
/// keeps the base empty.
///
/// Capabilities beyond the known range only appear if they are in some set. Those unknown to this crate are rendered
/// by their number.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CapabilityText {
    set: CapabilitySet,
    last: u8,
}

impl Display for CapabilityText {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let last = self.last.min(MAX_NUMBER);
        let known = 0..=last;

        let mut histogram = [0usize; 8];
        for number in known.clone() {
            histogram[usize::from(self.set.flags(number).bits())] += 1;
        }

        let mut base = 7;
        for combination in (0..7).rev() {
            if histogram[combination] >= histogram[base] {
                base = combination;
            }
        }

        let base = CapabilityFlags::from_bits_truncate(base as u8);
        let mut clauses = Vec::new();

        for combination in (0..8u8).rev() {
            let flags = CapabilityFlags::from_bits_truncate(combination);
            if flags == base || histogram[usize::from(combination)] == 0 {
                continue;
            }

            let numbers = known.clone().filter(|&number| self.set.flags(number) == flags);
            clauses.push(clause(numbers, flags, base, clauses.is_empty()));
        }

        if last < MAX_NUMBER {
            for combination in (1..8u8).rev() {
                let flags = CapabilityFlags::from_bits_truncate(combination);
                let mut numbers = (last + 1..=MAX_NUMBER).filter(|&number| self.set.flags(number) == flags).peekable();

                if numbers.peek().is_some() {
                    clauses.push(clause(numbers, flags, CapabilityFlags::empty(), clauses.is_empty()));
                }
            }
        }

        if base.is_empty() && !clauses.is_empty() {
            return f.write_str(&clauses.join(" "));
        }

        write!(f, "={base}")?;
        for text in clauses {
            write!(f, " {text}")?;
        }

        Ok(())
    }
}

/// The highest capability number representable in a [`CapabilitySet`]
const MAX_NUMBER: u8 = u64::BITS as u8 - 1;

/// Renders a single clause `name[,name...]` followed by the sets added to and removed from `base`
///
/// If `base` is empty, the first clause assigns its sets with `=` instead of adding them with `+`.
fn clause(numbers: impl Iterator<Item = u8>, flags: CapabilityFlags, base: CapabilityFlags, first: bool) -> String {
    let names: Vec<String> = numbers
        .map(|number| match Capability::from_number(number) {
            Some(capability) => capability.name().to_owned(),
            None => number.to_string(),
        })
        .collect();

    let mut clause = names.join(",");

    let raised = flags.difference(base);
    if !raised.is_empty() {
        let op = if base.is_empty() && first { '=' } else { '+' };
        clause.push(op);
        clause.push_str(&raised.to_string());
    }

    let lowered = base.difference(flags);
    if !lowered.is_empty() {
        clause.push('-');
        clause.push_str(&lowered.to_string());
    }

    clause
}
