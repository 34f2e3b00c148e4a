//! Device identity and the collaborator traits supplied by the device layer
//!
//! The filter core never interprets device metadata; it passes [`DeviceInfo`]
//! through lifecycle callbacks and reads only the display name, for logging.

use crate::request::{IoRequest, Outcome};
use derive_more::{From, Into};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for an attached block device
#[derive(Clone, Copy, PartialEq, Eq, Hash, From, Into)]
pub struct DeviceId(Uuid);

impl DeviceId {
    /// Generate a new random device ID
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from existing UUID
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the underlying UUID
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for DeviceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceId({})", self.0)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Metadata describing an attached device
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    /// Device identity
    pub id: DeviceId,
    /// Kernel-style device name, e.g. `sda`
    pub name: String,
    /// Capacity in bytes
    pub capacity_bytes: u64,
}

impl DeviceInfo {
    /// Create device metadata with a fresh identity
    pub fn new(name: impl Into<String>, capacity_bytes: u64) -> Self {
        Self {
            id: DeviceId::new(),
            name: name.into(),
            capacity_bytes,
        }
    }
}

/// Enumerates the devices the device-management layer already knows about
///
/// Used by [`FilterRegistry::attach_existing`](crate::FilterRegistry::attach_existing)
/// to replay attach events for a filter that registered late.
pub trait DeviceEnumerator {
    /// Visit every known device, in the layer's enumeration order
    fn for_each_device(&self, visit: &mut dyn FnMut(&DeviceInfo));
}

/// The default submission path beneath all filters
///
/// Requests that no filter intercepts are handed here unchanged; the
/// returned [`Outcome`] is passed back to the submitter as-is.
pub trait DeviceQueue: Send + Sync {
    /// Hand a request to the underlying storage stack
    fn submit(&self, request: IoRequest) -> Outcome;
}
