mod assets;
mod releases;

pub use assets::{AssetCatalog, AssetSnapshot};
pub use releases::{ReleaseCatalog, ReleaseHandle, ReleaseSnapshot};
