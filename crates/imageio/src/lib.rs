//! Import and export collaborators for the editor core.
//!
//! This crate handles:
//! - Decoding raster files (PNG, JPEG, GIF, BMP) into ready-to-append layers
//! - Encoding rendered composites to PNG
//!
//! The document core performs no decoding or encoding itself; everything
//! crossing the file boundary goes through here.

pub mod export;
pub mod import;

pub use export::{export_png, write_png, ExportError};
pub use import::{ImageFormat, ImageImporter, ImportError};
