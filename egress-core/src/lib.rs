//! Core data model for the egress system.
//!
//! This crate defines the request surface (egress types, output types,
//! upload targets, session configuration) and the result record produced
//! by a completed egress session. It carries no runtime behavior of its
//! own; the session controller lives in `egress-pipeline`.

mod error;
mod request;
mod result;

pub use error::*;
pub use request::*;
pub use result::*;

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Current wall-clock time as UNIX nanoseconds.
///
/// All timestamps and durations in the result record are expressed in
/// nanoseconds since the epoch.
pub fn epoch_nanos() -> i64 {
    chrono::Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_nanos_monotonic_enough() {
        let a = epoch_nanos();
        let b = epoch_nanos();
        assert!(b >= a);
        assert!(a > 1_500_000_000_000_000_000); // after mid-2017
    }
}
