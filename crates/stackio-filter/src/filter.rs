//! Filter capability sets and registration descriptors

use crate::device::DeviceInfo;
use crate::dispatch::SubmitChain;
use crate::request::{IoRequest, Outcome};
use bitflags::bitflags;
use std::fmt;
use std::sync::Arc;

bitflags! {
    /// The optional callback slots a filter declares
    ///
    /// A callback is invoked only when its bit is set. An absent bit is
    /// silently skipped during fan-out and dispatch, never an error.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Capabilities: u8 {
        /// Receive [`BlockFilter::on_device_added`]
        const DEVICE_ADDED = 1 << 0;
        /// Receive [`BlockFilter::on_device_removed`]
        const DEVICE_REMOVED = 1 << 1;
        /// Receive [`BlockFilter::on_device_released`]
        const DEVICE_RELEASED = 1 << 2;
        /// Intercept requests via [`BlockFilter::on_submit`]
        const SUBMIT = 1 << 3;
    }
}

impl Capabilities {
    /// All three lifecycle callbacks, without request interception
    #[must_use]
    pub const fn lifecycle() -> Self {
        Self::DEVICE_ADDED
            .union(Self::DEVICE_REMOVED)
            .union(Self::DEVICE_RELEASED)
    }
}

/// The callback surface a filter implements
///
/// Every method has a default body, so a filter only writes the callbacks it
/// declares in its [`Capabilities`]. Lifecycle callbacks return nothing: a
/// filter can observe an event but cannot veto it or stop it propagating to
/// the rest of the chain.
pub trait BlockFilter: Send + Sync {
    /// A device became visible to the block layer
    fn on_device_added(&self, _device: &DeviceInfo) {}

    /// A device is being detached
    fn on_device_removed(&self, _device: &DeviceInfo) {}

    /// The last reference to a device went away
    fn on_device_released(&self, _device: &DeviceInfo) {}

    /// Intercept a request travelling down the chain
    ///
    /// The filter owns the request from here: complete it and return an
    /// [`Outcome`], or hand it to the filters below via
    /// [`SubmitChain::next`]. Nothing continues the walk implicitly. The
    /// default body passes the request straight through.
    fn on_submit(&self, request: IoRequest, chain: &SubmitChain<'_>) -> Outcome {
        chain.next(request)
    }
}

/// Registration descriptor a filter module hands to the registry
///
/// The module keeps ownership through the `Arc`; the registry holds a clone
/// only for the lifetime of the registration.
pub struct FilterDescriptor {
    name: String,
    altitude: u8,
    capabilities: Capabilities,
    filter: Arc<dyn BlockFilter>,
}

impl FilterDescriptor {
    /// Describe a filter for registration at `altitude`
    pub fn new(
        name: impl Into<String>,
        altitude: u8,
        capabilities: Capabilities,
        filter: Arc<dyn BlockFilter>,
    ) -> Self {
        Self {
            name: name.into(),
            altitude,
            capabilities,
            filter,
        }
    }

    /// Diagnostic name of the filter
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Requested altitude (validated at registration time)
    pub fn altitude(&self) -> u8 {
        self.altitude
    }

    /// Declared callback set
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// The filter implementation
    pub fn filter(&self) -> &Arc<dyn BlockFilter> {
        &self.filter
    }
}

impl fmt::Debug for FilterDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterDescriptor")
            .field("name", &self.name)
            .field("altitude", &self.altitude)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}
