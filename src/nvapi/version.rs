//! Versioned struct protocol
//!
//! Every record passed across the NVAPI boundary starts with a 32-bit version
//! word: `(revision << 16) | size_of::<Self>()`. The driver validates it and
//! rejects mismatches with `NVAPI_INCOMPATIBLE_STRUCT_VERSION`, so a record
//! must be zeroed and stamped before each call.

use std::mem;

/// Build a version word from a struct size and revision
pub const fn make_version(size: usize, revision: u32) -> u32 {
    (revision << 16) | (size as u32)
}

/// Split a version word into `(revision, size)`
pub const fn split_version(version: u32) -> (u32, u32) {
    (version >> 16, version & 0xFFFF)
}

/// A fixed-layout record with an embedded version header
///
/// # Safety
///
/// Implementors must be `#[repr(C)]`, start with a `u32` version field, and
/// be valid when every byte is zero.
pub unsafe trait VersionedStruct: Copy + Sized {
    /// Revision this crate targets for the record
    const REVISION: u32;

    fn version(&self) -> u32;

    fn set_version(&mut self, version: u32);

    /// Version word for the targeted revision
    fn expected_version() -> u32 {
        make_version(mem::size_of::<Self>(), Self::REVISION)
    }

    /// An all-zero record, version included
    fn zeroed() -> Self {
        // SAFETY: guaranteed by the trait contract
        unsafe { mem::zeroed() }
    }

    /// A zeroed record stamped with the targeted revision
    fn stamped() -> Self {
        let mut value = Self::zeroed();
        value.set_version(Self::expected_version());
        value
    }

    /// Zero everything but the existing version word
    fn restamp(&mut self) {
        let version = self.version();
        *self = Self::zeroed();
        self.set_version(version);
    }
}

/// Implement [`VersionedStruct`] for a record whose first field is `version`
macro_rules! versioned_struct {
    ($ty:ty, $revision:expr) => {
        // SAFETY: the record is repr(C), starts with `version: u32`, and only
        // holds integers and arrays of integers.
        unsafe impl $crate::nvapi::version::VersionedStruct for $ty {
            const REVISION: u32 = $revision;

            fn version(&self) -> u32 {
                self.version
            }

            fn set_version(&mut self, version: u32) {
                self.version = version;
            }
        }
    };
}

pub(crate) use versioned_struct;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nvapi::types::{ClockFrequencies, DynamicPstates, Pstates20};

    #[repr(C)]
    #[derive(Clone, Copy)]
    struct Probe {
        version: u32,
        payload: [u32; 5],
    }

    versioned_struct!(Probe, 3);

    #[test]
    fn test_make_version_layout() {
        assert_eq!(make_version(24, 3), (3 << 16) | 24);
        assert_eq!(make_version(0x1234, 1), 0x0001_1234);
        assert_eq!(split_version(make_version(0x1C8, 2)), (2, 0x1C8));
    }

    #[test]
    fn test_stamped_uses_size_and_revision() {
        let probe = Probe::stamped();
        assert_eq!(probe.version, (3 << 16) | 24);
        assert_eq!(probe.payload, [0; 5]);

        let freq = ClockFrequencies::stamped();
        assert_eq!(
            freq.version,
            make_version(mem::size_of::<ClockFrequencies>(), 2)
        );

        let pstates = DynamicPstates::stamped();
        assert_eq!(split_version(pstates.version).0, 1);
    }

    #[test]
    fn test_restamp_preserves_version() {
        let mut probe = Probe::stamped();
        probe.payload = [7; 5];
        probe.restamp();
        assert_eq!(probe.version, (3 << 16) | 24);
        assert_eq!(probe.payload, [0; 5]);
    }

    #[test]
    fn test_restamp_keeps_foreign_version() {
        // A version stamped by someone else survives untouched
        let mut pstates = Pstates20::stamped();
        pstates.version = make_version(mem::size_of::<Pstates20>(), 1);
        pstates.state_count = 4;
        pstates.restamp();
        assert_eq!(pstates.version, make_version(mem::size_of::<Pstates20>(), 1));
        assert_eq!(pstates.state_count, 0);
    }
}
