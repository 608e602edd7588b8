#[cfg(feature = "fuse")]
pub mod mount;
pub mod version;

#[cfg(feature = "fuse")]
pub use mount::Mount;
pub use version::Version;
