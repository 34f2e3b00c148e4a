//! Filter registration and the altitude table's lock discipline
//!
//! The registry owns the altitude table behind a single reader-writer lock.
//! Registration paths take the write half; the hot paths (lifecycle fan-out,
//! request dispatch) take the read half and never hold it across a filter
//! callback.

use crate::device::{DeviceEnumerator, DeviceQueue};
use crate::error::{FilterError, FilterResult};
use crate::filter::{Capabilities, FilterDescriptor};
use crate::table::{AltitudeTable, Registration};
use crate::{ALTITUDE_MAX, ALTITUDE_MIN};
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Proof of a successful registration
///
/// Returned by [`FilterRegistry::register`] and required by
/// [`FilterRegistry::unregister`]; it is the only path back to the slot. The
/// token is unique for the process lifetime, so a handle kept across slot
/// reuse stays distinguishable from the new occupant's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FilterHandle {
    token: u64,
}

impl FilterHandle {
    pub(crate) fn token(self) -> u64 {
        self.token
    }
}

/// Registers filters and routes lifecycle events and I/O through them
///
/// One instance per process is typical, owned by the surrounding device
/// layer and passed explicitly to whoever registers or submits. All slots
/// start empty; there is no teardown beyond dropping the instance.
pub struct FilterRegistry {
    table: RwLock<AltitudeTable>,
    next_token: AtomicU64,
    queue: Arc<dyn DeviceQueue>,
}

impl FilterRegistry {
    /// Create a registry with all slots empty
    ///
    /// `queue` is the default submission path: requests that no filter
    /// intercepts are handed to it unchanged.
    pub fn new(queue: Arc<dyn DeviceQueue>) -> Self {
        Self {
            table: RwLock::new(AltitudeTable::new()),
            next_token: AtomicU64::new(1),
            queue,
        }
    }

    pub(crate) fn table(&self) -> &RwLock<AltitudeTable> {
        &self.table
    }

    pub(crate) fn queue(&self) -> &dyn DeviceQueue {
        self.queue.as_ref()
    }

    /// Register a filter at its descriptor's altitude
    ///
    /// First registrant wins: a conflict is surfaced as
    /// [`FilterError::AltitudeOccupied`], never queued or displaced. On
    /// failure no state is left behind.
    pub fn register(&self, descriptor: Arc<FilterDescriptor>) -> FilterResult<FilterHandle> {
        let altitude = descriptor.altitude();
        debug!(
            "register filter [{}] at altitude {}",
            descriptor.name(),
            altitude
        );

        if !(ALTITUDE_MIN..=ALTITUDE_MAX).contains(&altitude) {
            return Err(FilterError::AltitudeOutOfRange(altitude));
        }

        let token = self.next_token.fetch_add(1, Ordering::Relaxed);

        let mut table = self.table.write();
        if let Some(existing) = table.get(altitude) {
            warn!(
                "altitude {} already claimed by filter [{}]",
                altitude,
                existing.descriptor.name()
            );
            return Err(FilterError::AltitudeOccupied {
                altitude,
                owner: existing.descriptor.name().to_string(),
            });
        }
        table.set(altitude, Registration { descriptor, token });

        Ok(FilterHandle { token })
    }

    /// Remove a registration by handle
    ///
    /// Fails with [`FilterError::NotRegistered`] if the handle's
    /// registration is no longer present (double-unregister, or a handle
    /// kept past forced teardown); the table is untouched in that case.
    pub fn unregister(&self, handle: FilterHandle) -> FilterResult<()> {
        let mut table = self.table.write();
        match table.remove_by_token(handle.token()) {
            Some(registration) => {
                debug!(
                    "unregister filter [{}] from altitude {}",
                    registration.descriptor.name(),
                    registration.descriptor.altitude()
                );
                Ok(())
            }
            None => Err(FilterError::NotRegistered),
        }
    }

    /// Name of the filter occupying `altitude`, or `None` if the slot is free
    ///
    /// Best-effort: the answer can be stale by the time the caller acts on
    /// it. [`register`](Self::register) re-checks the slot atomically, so
    /// this is a diagnostic and a cheap pre-flight, not a reservation.
    pub fn query(&self, altitude: u8) -> Option<String> {
        if !(ALTITUDE_MIN..=ALTITUDE_MAX).contains(&altitude) {
            return None;
        }
        self.table
            .read()
            .get(altitude)
            .map(|reg| reg.descriptor.name().to_string())
    }

    /// Replay `on_device_added` for every device that predates a registration
    ///
    /// Invokes the descriptor's callback once per device, in the
    /// enumerator's order. Skipped entirely when the filter does not declare
    /// [`Capabilities::DEVICE_ADDED`]. The table's read lock is held across
    /// the enumeration, so the replay cannot interleave with a concurrent
    /// register or unregister; callbacks must not call back into
    /// registration paths from here.
    pub fn attach_existing(
        &self,
        descriptor: &FilterDescriptor,
        devices: &dyn DeviceEnumerator,
    ) {
        if !descriptor
            .capabilities()
            .contains(Capabilities::DEVICE_ADDED)
        {
            return;
        }

        let _table = self.table.read();
        devices.for_each_device(&mut |device| {
            descriptor.filter().on_device_added(device);
        });
    }
}
