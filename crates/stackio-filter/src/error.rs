//! Filter registry error types

use thiserror::Error;

/// Filter registry error
#[derive(Error, Debug)]
pub enum FilterError {
    /// Altitude outside the supported range
    #[error("altitude {0} is outside the supported filter range")]
    AltitudeOutOfRange(u8),

    /// Altitude already claimed by another filter
    #[error("altitude {altitude} is already claimed by filter [{owner}]")]
    AltitudeOccupied {
        /// The contested altitude
        altitude: u8,
        /// Name of the filter holding the slot
        owner: String,
    },

    /// Handle does not match any active registration
    #[error("handle does not match any active registration")]
    NotRegistered,
}

/// Result type for filter registry operations
pub type FilterResult<T> = Result<T, FilterError>;
