//! Packed API versions as reported by accelerator runtimes

#![deny(unsafe_code)]

use std::fmt::{self, Display, Formatter};

/// A packed API version
///
/// The layout is the one used by Vulkan: the variant in the top 3 bits, followed by 7 bits of major version, 10 bits
/// of minor version and 12 bits of patch version. Versions are ordered by their packed value, so comparing against a
/// minimum version only needs a single integer comparison.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ApiVersion(u32);

impl ApiVersion {
    pub const V1_0: Self = Self::new(0, 1, 0, 0);
    pub const V1_1: Self = Self::new(0, 1, 1, 0);
    pub const V1_2: Self = Self::new(0, 1, 2, 0);
    pub const V1_3: Self = Self::new(0, 1, 3, 0);

    /// Creates an [`ApiVersion`] from its components
    ///
    /// Components exceeding their bit width are truncated.
    pub const fn new(variant: u32, major: u32, minor: u32, patch: u32) -> Self {
        Self(((variant & 0x7) << 29) | ((major & 0x7F) << 22) | ((minor & 0x3FF) << 12) | (patch & 0xFFF))
    }

    /// Creates an [`ApiVersion`] from its packed value
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the packed value of this [`ApiVersion`]
    pub const fn raw(self) -> u32 {
        self.0
    }

    pub const fn variant(self) -> u32 {
        self.0 >> 29
    }

    pub const fn major(self) -> u32 {
        (self.0 >> 22) & 0x7F
    }

    pub const fn minor(self) -> u32 {
        (self.0 >> 12) & 0x3FF
    }

    pub const fn patch(self) -> u32 {
        self.0 & 0xFFF
    }
}

impl From<u32> for ApiVersion {
    fn from(raw: u32) -> Self {
        Self::from_raw(raw)
    }
}

impl From<ApiVersion> for u32 {
    fn from(version: ApiVersion) -> Self {
        version.raw()
    }
}

impl Display for ApiVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.variant() != 0 {
            write!(f, "(variant {}) ", self.variant())?;
        }

        write!(f, "{}.{}.{}", self.major(), self.minor(), self.patch())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_like_vulkan() {
        assert_eq!(ApiVersion::V1_2.raw(), 0x0040_2000);
        assert_eq!(ApiVersion::new(0, 1, 3, 275).raw(), (1 << 22) | (3 << 12) | 275);
    }

    #[test]
    fn components() {
        let version = ApiVersion::new(0, 1, 2, 198);

        assert_eq!(version.variant(), 0);
        assert_eq!(version.major(), 1);
        assert_eq!(version.minor(), 2);
        assert_eq!(version.patch(), 198);
    }

    #[test]
    fn orders_by_packed_value() {
        assert!(ApiVersion::new(0, 1, 1, 999) < ApiVersion::V1_2);
        assert!(ApiVersion::new(0, 1, 2, 1) > ApiVersion::V1_2);
        assert!(ApiVersion::V1_3 > ApiVersion::V1_2);
    }

    #[test]
    fn converts_from_and_into_raw_value() {
        assert_eq!(ApiVersion::from(0x0040_3000), ApiVersion::V1_3);
        assert_eq!(u32::from(ApiVersion::V1_1), 0x0040_1000);
    }

    #[test]
    fn display() {
        assert_eq!(ApiVersion::new(0, 1, 3, 275).to_string(), "1.3.275");
        assert_eq!(ApiVersion::new(1, 1, 0, 0).to_string(), "(variant 1) 1.0.0");
    }
}
