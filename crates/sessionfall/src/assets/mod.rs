pub mod cache;
pub mod manifest;
pub mod registry;

pub use cache::{ImageCache, ImageLoader};
pub use manifest::ImageManifest;
pub use registry::ImageSet;
