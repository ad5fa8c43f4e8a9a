//! Image tools module.
//!
//! - `background`: color-cluster + Sobel heuristic for background removal
//! - `raster`: bounded decoding and PNG encoding
//! - `remove_background`: the `image_remove_background` tool

pub mod background;
pub mod raster;
pub mod remove_background;

pub use remove_background::{ImageRemoveBackgroundTool, RemoveBackgroundParams};
