//! Altitude-indexed registration slots
//!
//! The single source of truth for which filter owns which priority. Only the
//! registry mutates it, under the write half of its lock.

use crate::filter::FilterDescriptor;
use crate::{ALTITUDE_MIN, ALTITUDE_SLOTS};
use std::sync::Arc;

/// One occupied slot: a descriptor bound to its registration token
#[derive(Clone)]
pub(crate) struct Registration {
    pub(crate) descriptor: Arc<FilterDescriptor>,
    pub(crate) token: u64,
}

/// Fixed array of registration slots, one per altitude
///
/// Invariant: slot `i` holds a filter registered at altitude
/// `i + ALTITUDE_MIN`; no two slots share a registration.
pub(crate) struct AltitudeTable {
    slots: [Option<Registration>; ALTITUDE_SLOTS],
}

impl AltitudeTable {
    /// All slots empty
    pub(crate) fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
        }
    }

    fn index(altitude: u8) -> usize {
        debug_assert!(altitude >= ALTITUDE_MIN);
        (altitude - ALTITUDE_MIN) as usize
    }

    /// Registration at `altitude`, if the slot is occupied
    pub(crate) fn get(&self, altitude: u8) -> Option<&Registration> {
        self.slots[Self::index(altitude)].as_ref()
    }

    /// Place a registration at `altitude`
    ///
    /// The caller must have checked the slot is free.
    pub(crate) fn set(&mut self, altitude: u8, registration: Registration) {
        let slot = &mut self.slots[Self::index(altitude)];
        debug_assert!(slot.is_none());
        *slot = Some(registration);
    }

    /// Remove the registration carrying `token`, scanning every slot
    ///
    /// Scan-by-identity rather than by remembered altitude, so a stale or
    /// mismatched handle cannot clear the wrong slot.
    pub(crate) fn remove_by_token(&mut self, token: u64) -> Option<Registration> {
        self.slots
            .iter_mut()
            .find(|slot| slot.as_ref().is_some_and(|reg| reg.token == token))
            .and_then(Option::take)
    }

    /// Occupied slots, lowest altitude first
    pub(crate) fn ascending(&self) -> impl Iterator<Item = &Registration> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    /// Occupied slots, highest altitude first
    pub(crate) fn descending(&self) -> impl Iterator<Item = &Registration> {
        self.slots.iter().rev().filter_map(Option::as_ref)
    }
}
