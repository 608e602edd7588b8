// FUSE driver (gated, as mounting needs a fuse device)
#[cfg(feature = "fuse")]
pub mod fuse;

// Re-exports for consumers
#[cfg(feature = "fuse")]
pub use fuse::{RelFs, Session, SessionConfig, SessionError};
