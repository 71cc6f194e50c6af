//! Rate-limited polling context
//!
//! [`PollingContext`] owns a lazily created [`NvApi`] and the last poll time
//! of every GPU it has read. Each read goes through [`PollingContext::with_gpu`],
//! which creates the API if needed, polls the GPU when its data is older than
//! the minimum interval and then applies an accessor to the device.

use crate::api::NvApi;
use crate::config::{Config, DEFAULT_MIN_POLL_INTERVAL_MS};
use crate::domain::{
    GpuClocks, GpuUsage, OverclockArea, OverclockProfile, OverclockRequest, UNAVAILABLE,
};
use crate::error::NvapiError;
use crate::gpu::Gpu;
use crate::nvapi::lifecycle::Lifecycle;

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Creates an [`NvApi`] on demand
pub type ApiFactory = Box<dyn Fn() -> Result<NvApi, NvapiError> + Send + Sync>;

enum ApiSource {
    Library(Lifecycle),
    Custom(ApiFactory),
}

#[derive(Default)]
struct ContextState {
    api: Option<NvApi>,
    last_poll: HashMap<usize, Instant>,
}

/// Explicit context behind the flat functions
pub struct PollingContext {
    source: ApiSource,
    min_interval: Duration,
    state: Mutex<ContextState>,
}

impl PollingContext {
    /// Context over the default vendor library names
    pub fn new(min_interval: Duration) -> Self {
        Self::with_source(ApiSource::Library(Lifecycle::default()), min_interval)
    }

    /// Context using the library names and interval from `config`
    pub fn from_config(config: &Config) -> Self {
        let lifecycle = Lifecycle::with_library_names(config.library.names.clone());
        Self::with_source(ApiSource::Library(lifecycle), config.polling.min_interval())
    }

    /// Context creating its API through `factory`
    pub fn with_factory(factory: ApiFactory, min_interval: Duration) -> Self {
        Self::with_source(ApiSource::Custom(factory), min_interval)
    }

    fn with_source(source: ApiSource, min_interval: Duration) -> Self {
        Self {
            source,
            min_interval,
            state: Mutex::new(ContextState::default()),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    fn lock(&self) -> MutexGuard<'_, ContextState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn create_api(&self) -> Result<NvApi, NvapiError> {
        match &self.source {
            ApiSource::Library(lifecycle) => NvApi::from_lifecycle(lifecycle),
            ApiSource::Custom(factory) => factory(),
        }
    }

    /// The cached API, creating it first if absent
    ///
    /// A failed creation is not cached; the next call tries again.
    fn ensure_api<'a>(&self, state: &'a mut ContextState) -> Option<&'a NvApi> {
        if state.api.is_none() {
            match self.create_api() {
                Ok(api) => {
                    log::info!("NVAPI ready with {} GPU(s)", api.gpu_count());
                    state.api = Some(api);
                }
                Err(e) => {
                    log::debug!("NVAPI unavailable: {}", e);
                    return None;
                }
            }
        }
        state.api.as_ref()
    }

    /// Create the API now; false if the library or any GPU is missing
    pub fn init(&self) -> bool {
        let mut state = self.lock();
        self.ensure_api(&mut state).is_some()
    }

    pub fn is_initialized(&self) -> bool {
        self.lock().api.is_some()
    }

    /// Drop the API and every poll timestamp
    ///
    /// The next call creates everything again.
    pub fn shutdown(&self) {
        let mut state = self.lock();
        state.api = None;
        state.last_poll.clear();
        if let ApiSource::Library(lifecycle) = &self.source {
            if lifecycle.shutdown() {
                log::info!("NVAPI unloaded");
            }
        }
    }

    /// Apply `accessor` to the API, or return `default` if it cannot be created
    pub fn with_api<T>(&self, default: T, accessor: impl FnOnce(&NvApi) -> T) -> T {
        let mut state = self.lock();
        match self.ensure_api(&mut state) {
            Some(api) => accessor(api),
            None => default,
        }
    }

    /// Apply `accessor` to GPU `index`, polling it first if its data is stale
    ///
    /// Data counts as stale once strictly more than the minimum interval has
    /// passed since the last poll of that GPU.
    ///
    /// Returns `default` if there is no API or no such GPU. The poll time is
    /// recorded even when the poll fails, so a failing GPU is not hammered.
    pub fn with_gpu<T>(&self, index: usize, default: T, accessor: impl FnOnce(&Gpu) -> T) -> T {
        let mut state = self.lock();
        let Some(gpu) = self.ensure_api(&mut state).and_then(|api| api.gpu(index)) else {
            return default;
        };

        let now = Instant::now();
        if is_stale(state.last_poll.get(&index).copied(), now, self.min_interval) {
            gpu.poll();
            state.last_poll.insert(index, now);
        }

        accessor(&gpu)
    }

    /// Number of GPUs, `0` if NVAPI is unavailable
    pub fn gpu_count(&self) -> usize {
        self.with_api(0, NvApi::gpu_count)
    }

    pub fn index_for_gpu_id(&self, gpu_id: u32) -> Option<usize> {
        self.with_api(None, |api| api.index_for_gpu_id(gpu_id))
    }

    pub fn gpu_id(&self, index: usize) -> Option<u32> {
        self.with_api(None, |api| api.gpu(index).map(|gpu| gpu.gpu_id()))
    }

    pub fn clocks(&self, index: usize) -> GpuClocks {
        self.with_gpu(index, GpuClocks::unavailable(), Gpu::clocks)
    }

    pub fn default_clocks(&self, index: usize) -> GpuClocks {
        self.with_gpu(index, GpuClocks::unavailable(), Gpu::default_clocks)
    }

    pub fn base_clocks(&self, index: usize) -> GpuClocks {
        self.with_gpu(index, GpuClocks::unavailable(), Gpu::base_clocks)
    }

    pub fn boost_clocks(&self, index: usize) -> GpuClocks {
        self.with_gpu(index, GpuClocks::unavailable(), Gpu::boost_clocks)
    }

    pub fn usage(&self, index: usize) -> GpuUsage {
        self.with_gpu(index, GpuUsage::unavailable(), Gpu::usage)
    }

    pub fn overclock_profile(&self, index: usize) -> OverclockProfile {
        self.with_gpu(index, OverclockProfile::default(), Gpu::overclock_profile)
    }

    pub fn voltage(&self, index: usize) -> f32 {
        self.with_gpu(index, UNAVAILABLE, Gpu::voltage)
    }

    pub fn temperature(&self, index: usize) -> f32 {
        self.with_gpu(index, UNAVAILABLE, Gpu::temperature)
    }

    pub fn name(&self, index: usize) -> Option<String> {
        self.with_gpu(index, None, |gpu| gpu.name().ok())
    }

    pub fn serial_number(&self, index: usize) -> Option<String> {
        self.with_gpu(index, None, |gpu| gpu.serial_number().ok())
    }

    /// Apply `request` to GPU `index` as one transaction
    pub fn set_overclock(&self, index: usize, request: &OverclockRequest) -> bool {
        self.with_gpu(index, false, |gpu| match gpu.set_overclock(request) {
            Ok(()) => true,
            Err(e) => {
                log::debug!("Overclock of GPU {} failed: {}", index, e);
                false
            }
        })
    }

    /// Set a single area on GPU `index`
    pub fn overclock(&self, index: usize, area: OverclockArea, value: f32) -> bool {
        self.set_overclock(index, &OverclockRequest::new().with(area, value))
    }
}

impl Default for PollingContext {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_MIN_POLL_INTERVAL_MS))
    }
}

/// Whether a GPU last polled at `last` needs polling again at `now`
fn is_stale(last: Option<Instant>, now: Instant, min_interval: Duration) -> bool {
    last.map_or(true, |last| now.duration_since(last) > min_interval)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockNvapi;
    use crate::nvapi::status::NvStatus;
    use crate::nvapi::FunctionId;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const LONG: Duration = Duration::from_secs(3600);

    fn context(mock: &Arc<MockNvapi>, interval: Duration) -> PollingContext {
        let mock = Arc::clone(mock);
        PollingContext::with_factory(Box::new(move || NvApi::with_calls(mock.clone())), interval)
    }

    #[test]
    fn test_init_and_count() {
        let mock = Arc::new(MockNvapi::new(2));
        let ctx = context(&mock, LONG);
        assert!(!ctx.is_initialized());
        assert!(ctx.init());
        assert!(ctx.is_initialized());
        assert_eq!(ctx.gpu_count(), 2);
        assert_eq!(ctx.gpu_id(1), Some(0x101));
        assert_eq!(ctx.gpu_id(2), None);
        assert_eq!(ctx.index_for_gpu_id(0x100), Some(0));
    }

    #[test]
    fn test_zero_gpus_retried() {
        let mock = Arc::new(MockNvapi::new(0));
        let ctx = context(&mock, LONG);
        assert!(!ctx.init());
        assert_eq!(ctx.gpu_count(), 0);
        assert_eq!(ctx.clocks(0), GpuClocks::unavailable());

        mock.set_gpus(vec![crate::mock::MockGpu::new(0)]);
        assert!(ctx.init());
        assert_eq!(ctx.gpu_count(), 1);
    }

    #[test]
    fn test_reads_within_interval_poll_once() {
        let mock = Arc::new(MockNvapi::new(1));
        let ctx = context(&mock, LONG);

        assert_eq!(ctx.clocks(0).core, 1350.0);
        let _ = ctx.usage(0);
        let _ = ctx.overclock_profile(0);
        assert_eq!(mock.call_count(FunctionId::GetPstates20), 1);
    }

    #[test]
    fn test_reads_after_interval_poll_again() {
        let mock = Arc::new(MockNvapi::new(1));
        let ctx = context(&mock, Duration::from_millis(20));

        let _ = ctx.clocks(0);
        std::thread::sleep(Duration::from_millis(40));
        let _ = ctx.clocks(0);
        assert_eq!(mock.call_count(FunctionId::GetPstates20), 2);
    }

    #[test]
    fn test_zero_interval_polls_every_later_read() {
        let mock = Arc::new(MockNvapi::new(1));
        let ctx = context(&mock, Duration::ZERO);

        for _ in 0..3 {
            let _ = ctx.temperature(0);
            std::thread::sleep(Duration::from_millis(2));
        }
        assert_eq!(mock.call_count(FunctionId::GetPstates20), 3);
    }

    #[test]
    fn test_staleness_boundary() {
        let last = Instant::now();
        let interval = Duration::from_millis(250);

        assert!(is_stale(None, last, interval));
        assert!(!is_stale(Some(last), last + Duration::from_millis(100), interval));
        assert!(!is_stale(Some(last), last + interval, interval));
        assert!(is_stale(Some(last), last + interval + Duration::from_millis(1), interval));
    }

    #[test]
    fn test_interval_tracked_per_gpu() {
        let mock = Arc::new(MockNvapi::new(2));
        let ctx = context(&mock, LONG);

        let _ = ctx.clocks(0);
        let _ = ctx.clocks(1);
        let _ = ctx.clocks(0);
        assert_eq!(mock.call_count(FunctionId::GetPstates20), 2);
    }

    #[test]
    fn test_missing_gpu_returns_sentinels() {
        let mock = Arc::new(MockNvapi::new(1));
        let ctx = context(&mock, LONG);

        assert_eq!(ctx.clocks(5), GpuClocks::unavailable());
        assert_eq!(ctx.voltage(5), UNAVAILABLE);
        assert_eq!(ctx.name(5), None);
        assert!(!ctx.overclock(5, OverclockArea::Core, 50.0));
    }

    #[test]
    fn test_failed_poll_returns_sentinels() {
        let mock = Arc::new(MockNvapi::new(1));
        mock.fail_call(FunctionId::GetThermalSettings, NvStatus::ERROR);
        let ctx = context(&mock, LONG);

        assert_eq!(ctx.temperature(0), UNAVAILABLE);
        assert_eq!(ctx.usage(0), GpuUsage::unavailable());
    }

    #[test]
    fn test_overclock_through_context() {
        let mock = Arc::new(MockNvapi::new(1));
        let ctx = context(&mock, LONG);

        assert!(ctx.overclock(0, OverclockArea::Core, 100.0));
        assert_eq!(ctx.overclock_profile(0).core.current, 100.0);
    }

    #[test]
    fn test_out_of_range_overclock_sends_nothing() {
        let mock = Arc::new(MockNvapi::new(1));
        let ctx = context(&mock, LONG);

        assert!(!ctx.overclock(0, OverclockArea::Core, 5000.0));
        assert_eq!(mock.call_count(FunctionId::SetPstates20), 0);
    }

    #[test]
    fn test_name_and_serial() {
        let mock = Arc::new(MockNvapi::new(1));
        let ctx = context(&mock, LONG);

        assert_eq!(ctx.name(0).as_deref(), Some("NVIDIA GeForce Mock 0"));
        assert!(ctx.serial_number(0).unwrap().starts_with("ABCD"));
    }

    #[test]
    fn test_shutdown_recreates_api() {
        let mock = Arc::new(MockNvapi::new(1));
        let created = Arc::new(AtomicUsize::new(0));
        let ctx = {
            let mock = Arc::clone(&mock);
            let created = Arc::clone(&created);
            PollingContext::with_factory(
                Box::new(move || {
                    created.fetch_add(1, Ordering::SeqCst);
                    NvApi::with_calls(mock.clone())
                }),
                LONG,
            )
        };

        let _ = ctx.clocks(0);
        let _ = ctx.clocks(0);
        assert_eq!(created.load(Ordering::SeqCst), 1);

        ctx.shutdown();
        assert!(!ctx.is_initialized());

        let _ = ctx.clocks(0);
        assert_eq!(created.load(Ordering::SeqCst), 2);
        assert_eq!(mock.call_count(FunctionId::GetPstates20), 2);
    }

    #[test]
    fn test_concurrent_reads_poll_once() {
        let mock = Arc::new(MockNvapi::new(1));
        let ctx = Arc::new(context(&mock, LONG));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ctx = Arc::clone(&ctx);
                std::thread::spawn(move || ctx.clocks(0))
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap().core, 1350.0);
        }
        assert_eq!(mock.call_count(FunctionId::GetPstates20), 1);
    }

    #[test]
    fn test_missing_library() {
        let mut config = Config::default();
        config.library.names = vec!["no-such-nvapi.dll".to_string()];
        let ctx = PollingContext::from_config(&config);
        assert!(!ctx.init());
        assert_eq!(ctx.gpu_count(), 0);
        assert_eq!(ctx.min_interval(), Duration::from_millis(250));
    }
}
