//! HLS playlist authoring for segmented egress
//!
//! The segment upload worker drives a [`PlaylistWriter`] as fragments
//! open and close, and the controller finalizes it when the session
//! ends.

mod error;
mod playlist;

pub use error::*;
pub use playlist::*;

/// Result type for playlist operations
pub type Result<T> = std::result::Result<T, PlaylistError>;
