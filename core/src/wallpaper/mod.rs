//! Mood-themed wallpaper catalog, selection and rotation.

pub mod catalog;
pub mod rotation;
pub mod selection;

pub use catalog::{Catalog, MediaType, WallpaperItem};
pub use rotation::{RotationState, SharedGate, WallpaperRotator};
pub use selection::{WallpaperSelection, DEFAULT_ROTATION_INTERVAL};
