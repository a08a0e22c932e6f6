//! Error types and handling for the ringflow toolkit.

use thiserror::Error;

/// Result type alias for ringflow operations.
pub type Result<T> = std::result::Result<T, RingflowError>;

/// Main error type for the ringflow toolkit.
#[derive(Error, Debug)]
pub enum RingflowError {
    /// Invalid configuration parameter (e.g. non-power-of-two capacity).
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration problem.
        message: String,
    },

    /// A bounded queue is full and the caller asked for a non-blocking send.
    #[error("queue is full")]
    Full,

    /// A bounded queue has no elements available for a non-blocking recv.
    #[error("queue is empty")]
    Empty,

    /// The queue (or one of its handles) has been closed.
    #[error("queue is closed")]
    Closed,

    /// A handle argument was null.
    #[error("null handle")]
    Null,

    /// A region arena exceeded its configured `max_regions` bound.
    #[error("region arena overflow: region {region} exceeds max_regions {max_regions}")]
    RegionOverflow {
        /// The region index that was requested.
        region: usize,
        /// The arena's configured ceiling.
        max_regions: usize,
    },

    /// A FIXED-growth flat arena is full.
    #[error("flat arena at capacity ({capacity})")]
    ArenaFull {
        /// The arena's fixed capacity.
        capacity: usize,
    },

    /// Backing storage allocation failed.
    #[error("allocation failed: {message}")]
    Memory {
        /// Description of the failed allocation.
        message: String,
    },
}

impl RingflowError {
    /// Create a new configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig { message: message.into() }
    }

    /// Create a new allocation-failure error.
    pub fn memory(message: impl Into<String>) -> Self {
        Self::Memory { message: message.into() }
    }

    /// Whether a caller might reasonably retry after backing off.
    ///
    /// `Full`/`Empty` are transient by nature; `Closed` is terminal but not a
    /// bug; configuration and overflow errors are not recoverable.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Full | Self::Empty)
    }
}
