//! Composite export.
//!
//! Renders the caller's visible layers through the compositor and encodes
//! the result to PNG. The core stays agnostic to destinations; everything
//! filesystem-shaped lives here.

use compositor::{render, CompositeError, PixelBuffer};
use document::layer::Layer;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Export error.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Render(#[from] CompositeError),

    #[error("cannot write {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("PNG encoding failed: {0}")]
    Encode(String),
}

/// Encode a pixel buffer to a PNG file.
pub fn write_png(buffer: &PixelBuffer, path: &Path) -> Result<(), ExportError> {
    let file = File::create(path).map_err(|source| ExportError::WriteFailed {
        path: path.to_path_buf(),
        source,
    })?;
    let writer = BufWriter::new(file);

    let mut encoder = png::Encoder::new(writer, buffer.width, buffer.height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);

    let mut png_writer = encoder
        .write_header()
        .map_err(|err| encoding_error(path, err))?;
    png_writer
        .write_image_data(buffer.as_bytes())
        .map_err(|err| encoding_error(path, err))?;

    Ok(())
}

/// Render `layers` (already filtered to the visible set, in paint order)
/// and write the composite to `path` as PNG.
pub fn export_png<'a, I>(
    layers: I,
    target_size: (u32, u32),
    scale: f32,
    path: &Path,
) -> Result<(), ExportError>
where
    I: IntoIterator<Item = &'a Layer>,
{
    let buffer = render(layers, target_size, scale)?;
    write_png(&buffer, path)?;

    tracing::info!(
        path = %path.display(),
        width = buffer.width,
        height = buffer.height,
        "exported composite"
    );
    Ok(())
}

fn encoding_error(path: &Path, err: png::EncodingError) -> ExportError {
    match err {
        png::EncodingError::IoError(source) => ExportError::WriteFailed {
            path: path.to_path_buf(),
            source,
        },
        other => ExportError::Encode(other.to_string()),
    }
}
