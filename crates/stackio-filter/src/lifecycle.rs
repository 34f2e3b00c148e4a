//! Device lifecycle fan-out
//!
//! Attach, detach and release events broadcast to every registered filter
//! that declares the matching capability. Fan-outs are fire-and-forget: no
//! callback returns a status, and no filter can stop an event reaching the
//! rest of the chain.
//!
//! Attach and detach walk the table bottom-up; release walks top-down, so
//! the filter that attached to a device last is the first told it is gone
//! (stack-unwind order for per-device state).

use crate::device::DeviceInfo;
use crate::filter::{Capabilities, FilterDescriptor};
use crate::registry::FilterRegistry;
use std::sync::Arc;
use tracing::debug;

enum Traversal {
    Ascending,
    Descending,
}

impl FilterRegistry {
    /// Notify filters that a device was attached
    ///
    /// Ascending altitude order: the filter closest to the device hears
    /// about it first.
    pub fn notify_device_added(&self, device: &DeviceInfo) {
        debug!("add device [{}]", device.name);
        for descriptor in self.capable(Capabilities::DEVICE_ADDED, Traversal::Ascending) {
            descriptor.filter().on_device_added(device);
        }
    }

    /// Notify filters that a device is being detached
    ///
    /// Same ascending order as [`notify_device_added`](Self::notify_device_added).
    pub fn notify_device_removed(&self, device: &DeviceInfo) {
        debug!("del device [{}]", device.name);
        for descriptor in self.capable(Capabilities::DEVICE_REMOVED, Traversal::Ascending) {
            descriptor.filter().on_device_removed(device);
        }
    }

    /// Notify filters that the last reference to a device went away
    ///
    /// Descending altitude order, the reverse of add/del.
    pub fn notify_device_released(&self, device: &DeviceInfo) {
        debug!("release device [{}]", device.name);
        for descriptor in self.capable(Capabilities::DEVICE_RELEASED, Traversal::Descending) {
            descriptor.filter().on_device_released(device);
        }
    }

    /// Snapshot the descriptors declaring `capability`, in traversal order
    ///
    /// Cloning the Arcs out under the read lock and invoking callbacks
    /// after it is dropped keeps callbacks free to re-enter the registry,
    /// at the cost of a filter unregistered mid-fan-out still seeing the
    /// event it was registered for when the snapshot was taken.
    fn capable(&self, capability: Capabilities, order: Traversal) -> Vec<Arc<FilterDescriptor>> {
        let table = self.table().read();
        let select = |reg: &crate::table::Registration| {
            reg.descriptor
                .capabilities()
                .contains(capability)
                .then(|| Arc::clone(&reg.descriptor))
        };
        match order {
            Traversal::Ascending => table.ascending().filter_map(select).collect(),
            Traversal::Descending => table.descending().filter_map(select).collect(),
        }
    }
}
