//! Flat C interface
//!
//! Every function here reads through one process-wide [`PollingContext`],
//! created on first use from the discovered configuration. Negative indices
//! and unavailable data yield the same `-1` sentinels as the context itself.

use super::context::PollingContext;
use crate::config::ConfigFile;
use crate::domain::{GpuClocks, GpuUsage, OverclockArea, OverclockProfile, UNAVAILABLE};

use once_cell::sync::Lazy;
use std::os::raw::c_char;

/// Size of the caller-provided name and serial buffers, terminator included
pub const STRING_BUFFER_SIZE: usize = 64;

static CONTEXT: Lazy<PollingContext> = Lazy::new(|| {
    let config = ConfigFile::load_default().unwrap_or_default();
    PollingContext::from_config(&config)
});

/// The context behind the C interface
pub fn context() -> &'static PollingContext {
    &CONTEXT
}

fn gpu_index(index: i32) -> Option<usize> {
    usize::try_from(index).ok()
}

fn read<T>(index: i32, default: T, f: impl FnOnce(&PollingContext, usize) -> T) -> T {
    match gpu_index(index) {
        Some(index) => f(&CONTEXT, index),
        None => default,
    }
}

/// Copy `value` into `buffer`, truncating to fit and NUL-terminating
///
/// # Safety
///
/// `buffer` must be null or valid for writes of [`STRING_BUFFER_SIZE`] bytes.
unsafe fn copy_to_buffer(value: Option<String>, buffer: *mut c_char) -> bool {
    if buffer.is_null() {
        return false;
    }
    let Some(value) = value else {
        *buffer = 0;
        return false;
    };

    let bytes = value.as_bytes();
    let len = bytes.len().min(STRING_BUFFER_SIZE - 1);
    std::ptr::copy_nonoverlapping(bytes.as_ptr().cast::<c_char>(), buffer, len);
    *buffer.add(len) = 0;
    len > 0
}

/// Load NVAPI and enumerate GPUs; false if unavailable or no GPU is present
#[no_mangle]
pub extern "C" fn init_simple_api() -> bool {
    CONTEXT.init()
}

/// Release NVAPI; the next call loads it again
#[no_mangle]
pub extern "C" fn shutdown_simple_api() {
    CONTEXT.shutdown();
}

#[no_mangle]
pub extern "C" fn get_gpu_count() -> i32 {
    i32::try_from(CONTEXT.gpu_count()).unwrap_or(i32::MAX)
}

/// Index of the GPU with driver ID `gpu_id`, `-1` if none
#[no_mangle]
pub extern "C" fn get_index_for_gpu_id(gpu_id: u32) -> i32 {
    CONTEXT
        .index_for_gpu_id(gpu_id)
        .and_then(|index| i32::try_from(index).ok())
        .unwrap_or(-1)
}

/// Driver ID of GPU `index`, `-1` if none
#[no_mangle]
pub extern "C" fn get_gpu_id(index: i32) -> i64 {
    read(index, None, |ctx, i| ctx.gpu_id(i)).map_or(-1, i64::from)
}

#[no_mangle]
pub extern "C" fn get_clocks(index: i32) -> GpuClocks {
    read(index, GpuClocks::unavailable(), |ctx, i| ctx.clocks(i))
}

#[no_mangle]
pub extern "C" fn get_default_clocks(index: i32) -> GpuClocks {
    read(index, GpuClocks::unavailable(), |ctx, i| ctx.default_clocks(i))
}

#[no_mangle]
pub extern "C" fn get_base_clocks(index: i32) -> GpuClocks {
    read(index, GpuClocks::unavailable(), |ctx, i| ctx.base_clocks(i))
}

#[no_mangle]
pub extern "C" fn get_boost_clocks(index: i32) -> GpuClocks {
    read(index, GpuClocks::unavailable(), |ctx, i| ctx.boost_clocks(i))
}

#[no_mangle]
pub extern "C" fn get_usages(index: i32) -> GpuUsage {
    read(index, GpuUsage::unavailable(), |ctx, i| ctx.usage(i))
}

#[no_mangle]
pub extern "C" fn get_overclock_profile(index: i32) -> OverclockProfile {
    read(index, OverclockProfile::default(), |ctx, i| ctx.overclock_profile(i))
}

#[no_mangle]
pub extern "C" fn get_voltage(index: i32) -> f32 {
    read(index, UNAVAILABLE, |ctx, i| ctx.voltage(i))
}

#[no_mangle]
pub extern "C" fn get_temperature(index: i32) -> f32 {
    read(index, UNAVAILABLE, |ctx, i| ctx.temperature(i))
}

/// Copy the name of GPU `index` into `buffer`
///
/// # Safety
///
/// `buffer` must be null or valid for writes of 64 bytes.
#[no_mangle]
pub unsafe extern "C" fn get_name(index: i32, buffer: *mut c_char) -> bool {
    if buffer.is_null() {
        return false;
    }
    copy_to_buffer(read(index, None, |ctx, i| ctx.name(i)), buffer)
}

/// Copy the serial number of GPU `index` into `buffer`
///
/// # Safety
///
/// `buffer` must be null or valid for writes of 64 bytes.
#[no_mangle]
pub unsafe extern "C" fn get_serial_number(index: i32, buffer: *mut c_char) -> bool {
    if buffer.is_null() {
        return false;
    }
    copy_to_buffer(read(index, None, |ctx, i| ctx.serial_number(i)), buffer)
}

/// Set `area` (see [`OverclockArea`] discriminants) on GPU `index` to `value`
#[no_mangle]
pub extern "C" fn overclock(index: i32, area: i32, value: f32) -> bool {
    let Some(area) = OverclockArea::from_raw(area) else {
        log::debug!("Unknown overclock area {}", area);
        return false;
    };
    read(index, false, |ctx, i| ctx.overclock(i, area, value))
}
