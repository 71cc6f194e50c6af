//! Generic load helpers
//!
//! Most vendor records share one call shape: re-stamp, optionally set a
//! selector, call, check the status. These helpers cover that shape once.

use crate::error::NvapiError;
use crate::nvapi::ids::FunctionId;
use crate::nvapi::status::NvStatus;
use crate::nvapi::version::VersionedStruct;

/// Map a raw status to a `Result`, logging failures
pub fn check(call: FunctionId, status: NvStatus) -> Result<(), NvapiError> {
    status.ok().map_err(|status| {
        log::debug!("{} failed: {}", call, status);
        NvapiError::Call { call, status }
    })
}

/// Re-stamp `value`, run `prepare` on it, then `invoke` the raw call
///
/// On failure the contents of `value` are unspecified.
pub fn load_with<T, P, F>(
    call: FunctionId,
    value: &mut T,
    prepare: P,
    invoke: F,
) -> Result<(), NvapiError>
where
    T: VersionedStruct,
    P: FnOnce(&mut T),
    F: FnOnce(&mut T) -> NvStatus,
{
    value.restamp();
    prepare(value);
    check(call, invoke(value))
}

/// Fetch a freshly stamped record, with a pre-call preparer
pub fn fetch_with<T, P, F>(call: FunctionId, prepare: P, invoke: F) -> Result<T, NvapiError>
where
    T: VersionedStruct,
    P: FnOnce(&mut T),
    F: FnOnce(&mut T) -> NvStatus,
{
    let mut value = T::stamped();
    load_with(call, &mut value, prepare, invoke)?;
    Ok(value)
}

/// Fetch a freshly stamped record
pub fn fetch<T, F>(call: FunctionId, invoke: F) -> Result<T, NvapiError>
where
    T: VersionedStruct,
    F: FnOnce(&mut T) -> NvStatus,
{
    fetch_with(call, |_| {}, invoke)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nvapi::types::ClockFrequencies;

    #[test]
    fn test_fetch_sees_stamped_version() {
        let freq = fetch::<ClockFrequencies, _>(FunctionId::GetAllClockFrequencies, |f| {
            assert_eq!(f.version, ClockFrequencies::expected_version());
            f.entries[0].freq = 42;
            NvStatus::OK
        })
        .unwrap();
        assert_eq!(freq.entries[0].freq, 42);
    }

    #[test]
    fn test_preparer_runs_before_call() {
        let freq: ClockFrequencies = fetch_with(
            FunctionId::GetAllClockFrequencies,
            |f: &mut ClockFrequencies| f.clock_type = 2,
            |f| {
                assert_eq!(f.clock_type, 2);
                NvStatus::OK
            },
        )
        .unwrap();
        assert_eq!(freq.clock_type, 2);
    }

    #[test]
    fn test_load_restamps_before_reuse() {
        let mut freq = ClockFrequencies::stamped();
        freq.entries[3].freq = 99;
        load_with(
            FunctionId::GetAllClockFrequencies,
            &mut freq,
            |_| {},
            |f| {
                assert_eq!(f.entries[3].freq, 0);
                assert_eq!(f.version, ClockFrequencies::expected_version());
                NvStatus::OK
            },
        )
        .unwrap();
    }

    #[test]
    fn test_failure_carries_call_and_status() {
        let result: Result<ClockFrequencies, _> =
            fetch(FunctionId::GetAllClockFrequencies, |_| NvStatus::NOT_SUPPORTED);
        assert_eq!(
            result.unwrap_err(),
            NvapiError::Call {
                call: FunctionId::GetAllClockFrequencies,
                status: NvStatus::NOT_SUPPORTED,
            }
        );
    }

    #[test]
    fn test_check() {
        assert!(check(FunctionId::GetFullName, NvStatus::OK).is_ok());
        assert!(check(FunctionId::GetFullName, NvStatus::ERROR).is_err());
    }
}
