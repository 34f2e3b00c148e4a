//! StackIO Filter Framework
//!
//! This crate provides layered interception for block-device I/O. Filter
//! modules register at a fixed priority (their "altitude") and are consulted,
//! in priority order, for device lifecycle events and for every request on its
//! way to the underlying device.
//!
//! # Features
//!
//! - **Altitude table**: one registration slot per priority level
//! - **Lifecycle fan-out**: attach/detach/release broadcast to all filters
//! - **Submission walk**: requests routed to the highest intercepting filter
//! - **Cooperative chaining**: an intercepting filter forwards to the
//!   filters below it, any number of levels deep
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │    I/O layer     │  submit(request)
//! └────────┬─────────┘
//!          │
//! ┌────────▼─────────┐
//! │  FilterRegistry  │  altitude 4 ─┐
//! │  - altitude table│  altitude 3  │ first filter with SUBMIT
//! │  - lifecycle     │  altitude 2  │ takes the request
//! │  - dispatch      │  altitude 1 ─┘
//! └────────┬─────────┘
//!          │ no interceptor
//! ┌────────▼─────────┐
//! │   DeviceQueue    │  (underlying storage stack)
//! └──────────────────┘
//! ```
//!
//! Higher altitudes sit closer to the request's origin, lower altitudes
//! closer to the physical device.

pub mod device;
pub mod dispatch;
pub mod error;
pub mod filter;
pub mod lifecycle;
pub mod registry;
pub mod request;

mod table;

pub use device::{DeviceEnumerator, DeviceId, DeviceInfo, DeviceQueue};
pub use dispatch::SubmitChain;
pub use error::{FilterError, FilterResult};
pub use filter::{BlockFilter, Capabilities, FilterDescriptor};
pub use registry::{FilterHandle, FilterRegistry};
pub use request::{IoKind, IoRequest, Outcome};

/// Lowest valid altitude (closest to the device)
pub const ALTITUDE_MIN: u8 = 1;

/// Highest valid altitude (closest to the request's origin)
pub const ALTITUDE_MAX: u8 = 4;

/// Number of registration slots in the altitude table
pub const ALTITUDE_SLOTS: usize = (ALTITUDE_MAX - ALTITUDE_MIN + 1) as usize;
