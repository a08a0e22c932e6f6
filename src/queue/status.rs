//! ABI-level status codes for the queue family.
//!
//! These specific integer values are committed as part of a cross-language
//! ABI, so they are kept as a plain `#[repr(i32)]` enum distinct from the
//! richer [`crate::error::RingflowError`] used everywhere else in the
//! crate. Convert at the boundary with `From`.

use crate::error::RingflowError;

/// Status codes returned by the C-ABI-shaped queue entry points.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Operation succeeded.
    Ok = 0,
    /// A handle argument was null.
    ErrNull = -1,
    /// Non-blocking receive found no element available.
    ErrEmpty = -2,
    /// Non-blocking send found no free slot.
    ErrFull = -3,
    /// The queue (or this handle) is closed.
    ErrClosed = -4,
}

impl From<RingflowError> for Status {
    fn from(err: RingflowError) -> Self {
        match err {
            RingflowError::Null => Status::ErrNull,
            RingflowError::Empty => Status::ErrEmpty,
            RingflowError::Full => Status::ErrFull,
            RingflowError::Closed => Status::ErrClosed,
            _ => Status::ErrNull,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abi_values() {
        assert_eq!(Status::Ok as i32, 0);
        assert_eq!(Status::ErrNull as i32, -1);
        assert_eq!(Status::ErrEmpty as i32, -2);
        assert_eq!(Status::ErrFull as i32, -3);
        assert_eq!(Status::ErrClosed as i32, -4);
    }

    #[test]
    fn test_from_error() {
        assert_eq!(Status::from(RingflowError::Full), Status::ErrFull);
        assert_eq!(Status::from(RingflowError::Closed), Status::ErrClosed);
    }
}
