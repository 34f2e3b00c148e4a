//! StackIO trace filter
//!
//! A diagnostics-only consumer of the filter API: it registers at a single
//! altitude, counts every lifecycle event and request it sees, logs them, and
//! forwards all I/O untouched. Useful for verifying chain wiring and for
//! watching traffic shape without perturbing it.

use stackio_filter::{
    ALTITUDE_MAX, BlockFilter, Capabilities, DeviceEnumerator, DeviceInfo, FilterDescriptor,
    FilterHandle, FilterRegistry, FilterResult, IoRequest, Outcome, SubmitChain,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Default altitude: the top of the chain, so the trace filter sees every
/// request before any other filter does
pub const DEFAULT_ALTITUDE: u8 = ALTITUDE_MAX;

const FILTER_NAME: &str = "stackio-trace";

/// Counting pass-through filter
#[derive(Debug, Default)]
pub struct TraceFilter {
    devices_added: AtomicU64,
    devices_removed: AtomicU64,
    devices_released: AtomicU64,
    requests_seen: AtomicU64,
}

impl TraceFilter {
    /// Create a trace filter with zeroed counters
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Devices this filter has seen attach
    pub fn devices_added(&self) -> u64 {
        self.devices_added.load(Ordering::Relaxed)
    }

    /// Devices this filter has seen detach
    pub fn devices_removed(&self) -> u64 {
        self.devices_removed.load(Ordering::Relaxed)
    }

    /// Devices this filter has seen released
    pub fn devices_released(&self) -> u64 {
        self.devices_released.load(Ordering::Relaxed)
    }

    /// Requests that have passed through this filter
    pub fn requests_seen(&self) -> u64 {
        self.requests_seen.load(Ordering::Relaxed)
    }

    /// Build the registration descriptor for this filter
    ///
    /// Declares all four capabilities; the submit path forwards everything.
    #[must_use]
    pub fn descriptor(this: &Arc<Self>, altitude: u8) -> Arc<FilterDescriptor> {
        Arc::new(FilterDescriptor::new(
            FILTER_NAME,
            altitude,
            Capabilities::all(),
            Arc::clone(this) as Arc<dyn BlockFilter>,
        ))
    }

    /// Register at `altitude` and replay already-attached devices
    ///
    /// The module-load sequence: probe the slot for a friendlier log line,
    /// register, then backfill attach events for devices that predate the
    /// filter so the counters cover them too. Returns the handle needed by
    /// [`uninstall`](Self::uninstall).
    pub fn install(
        this: &Arc<Self>,
        registry: &FilterRegistry,
        devices: &dyn DeviceEnumerator,
        altitude: u8,
    ) -> FilterResult<FilterHandle> {
        if let Some(owner) = registry.query(altitude) {
            warn!("altitude {altitude} already claimed by filter [{owner}]");
        }

        let descriptor = Self::descriptor(this, altitude);
        let handle = registry.register(Arc::clone(&descriptor))?;
        registry.attach_existing(&descriptor, devices);
        Ok(handle)
    }

    /// Remove the registration created by [`install`](Self::install)
    ///
    /// Counters keep their values; the filter can be installed again.
    pub fn uninstall(registry: &FilterRegistry, handle: FilterHandle) -> FilterResult<()> {
        registry.unregister(handle)
    }
}

impl BlockFilter for TraceFilter {
    fn on_device_added(&self, device: &DeviceInfo) {
        self.devices_added.fetch_add(1, Ordering::Relaxed);
        debug!("trace: add device [{}]", device.name);
    }

    fn on_device_removed(&self, device: &DeviceInfo) {
        self.devices_removed.fetch_add(1, Ordering::Relaxed);
        debug!("trace: del device [{}]", device.name);
    }

    fn on_device_released(&self, device: &DeviceInfo) {
        self.devices_released.fetch_add(1, Ordering::Relaxed);
        debug!("trace: release device [{}]", device.name);
    }

    fn on_submit(&self, request: IoRequest, chain: &SubmitChain<'_>) -> Outcome {
        self.requests_seen.fetch_add(1, Ordering::Relaxed);
        debug!(
            "trace: {:?} device [{}] offset {} length {}",
            request.kind, request.device, request.offset, request.length
        );
        chain.next(request)
    }
}
