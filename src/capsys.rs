//! Raw bindings to the Linux capability system calls and the auxiliary vector
//!
//! The C library exports `capget` as a thin wrapper around the system call of the same name. The structures passed to
//! it are defined in `<linux/capability.h>`, which the `libc` crate does not expose, so they are declared here.
//!
//! See also <https://man7.org/linux/man-pages/man2/capget.2.html>

#![deny(unsafe_code)]

use std::ffi::c_int;

/// Target used for logging calls to capability functions using the `tracing` crate
pub(crate) const TRACING_TARGET: &str = "rtprobe::capsys";

/// Version 3 of the capability ABI, supporting 64-bit capability sets (Linux 2.6.26 and later)
pub(crate) const LINUX_CAPABILITY_VERSION_3: u32 = 0x2008_0522;

/// Number of [`CapUserData`] entries expected by [`capget`] for [`LINUX_CAPABILITY_VERSION_3`]
pub(crate) const LINUX_CAPABILITY_U32S_3: usize = 2;

/// Header of a `capget` request, `struct __user_cap_header_struct`
#[derive(Clone, Copy, Debug, Default)]
#[repr(C)]
pub(crate) struct CapUserHeader {
    /// ABI version, see [`LINUX_CAPABILITY_VERSION_3`]
    pub(crate) version: u32,

    /// Thread to query, `0` for the calling thread
    pub(crate) pid: c_int,
}

/// One 32-bit slice of the capability sets, `struct __user_cap_data_struct`
///
/// Entry `0` holds capabilities `0..32`, entry `1` holds capabilities `32..64`.
#[derive(Clone, Copy, Debug, Default)]
#[repr(C)]
pub(crate) struct CapUserData {
    pub(crate) effective: u32,
    pub(crate) permitted: u32,
    pub(crate) inheritable: u32,
}

extern "C" {
    /// Reads the capability sets of a thread
    ///
    /// # Arguments
    /// - [in, out] `header`: Pointer to a [`CapUserHeader`]; if `version` is not supported by the kernel, it is
    ///   overwritten with the preferred version and the call fails with `EINVAL`
    /// - [out] `data`: Pointer to an array of [`LINUX_CAPABILITY_U32S_3`] [`CapUserData`] entries
    ///
    /// # Returns
    /// `0` on success, `-1` on failure with `errno` set
    ///
    /// # Safety
    /// - `header` must be valid for reads and writes of [`CapUserHeader`]
    /// - `data` must be valid for writes of `[CapUserData; LINUX_CAPABILITY_U32S_3]`
    pub(crate) fn capget(header: *mut CapUserHeader, data: *mut CapUserData) -> c_int;
}
