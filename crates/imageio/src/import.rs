//! Raster import.
//!
//! Decodes image files into [`RasterContent`] normalized to RGBA8, and
//! wraps them into layers ready for the store. On any failure the caller
//! simply never appends a layer.

use document::layer::{Layer, RasterContent};
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;

/// Import error.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("unknown image format")]
    UnknownFormat,

    #[error("unsupported image data: {0}")]
    Unsupported(String),

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("image dimensions too large: {width}x{height} (max: {max_width}x{max_height})")]
    TooLarge {
        width: u32,
        height: u32,
        max_width: u32,
        max_height: u32,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Supported raster formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Bmp,
}

impl ImageFormat {
    /// Detect image format from magic bytes.
    pub fn detect(data: &[u8]) -> Option<Self> {
        if data.len() < 4 {
            return None;
        }

        // PNG: 89 50 4E 47
        if data.starts_with(&[0x89, b'P', b'N', b'G']) {
            return Some(ImageFormat::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(ImageFormat::Jpeg);
        }

        // GIF: GIF87a or GIF89a
        if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            return Some(ImageFormat::Gif);
        }

        // BMP: BM
        if data.starts_with(b"BM") {
            return Some(ImageFormat::Bmp);
        }

        None
    }

    /// Get file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Gif => "gif",
            ImageFormat::Bmp => "bmp",
        }
    }
}

/// Decoder for raster layer content.
#[derive(Debug)]
pub struct ImageImporter {
    max_width: u32,
    max_height: u32,
}

impl ImageImporter {
    pub fn new() -> Self {
        Self {
            max_width: 16384,
            max_height: 16384,
        }
    }

    /// Set maximum accepted dimensions.
    pub fn set_max_dimensions(&mut self, width: u32, height: u32) {
        self.max_width = width;
        self.max_height = height;
    }

    /// Decode image bytes into RGBA8 content.
    pub fn decode(&self, data: &[u8]) -> Result<RasterContent, ImportError> {
        let format = ImageFormat::detect(data).ok_or(ImportError::UnknownFormat)?;
        self.decode_with_format(data, format)
    }

    /// Decode image bytes with a known format.
    pub fn decode_with_format(
        &self,
        data: &[u8],
        format: ImageFormat,
    ) -> Result<RasterContent, ImportError> {
        match format {
            ImageFormat::Png => self.decode_png(data),
            ImageFormat::Jpeg => self.decode_jpeg(data),
            ImageFormat::Gif => self.decode_gif(data),
            ImageFormat::Bmp => self.decode_bmp(data),
        }
    }

    /// Read and decode a file into a layer named after its stem, visible
    /// and at the origin.
    pub fn import_file(&self, path: &Path) -> Result<Layer, ImportError> {
        let data = std::fs::read(path)?;
        let content = self.decode(&data)?;

        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "layer".to_string());

        tracing::info!(
            path = %path.display(),
            width = content.width(),
            height = content.height(),
            "imported layer"
        );

        Ok(Layer::raster(name, content))
    }

    fn decode_png(&self, data: &[u8]) -> Result<RasterContent, ImportError> {
        let decoder = png::Decoder::new(Cursor::new(data));
        let mut reader = decoder
            .read_info()
            .map_err(|e| ImportError::Decode(e.to_string()))?;

        let mut buf = vec![0; reader.output_buffer_size()];
        let info = reader
            .next_frame(&mut buf)
            .map_err(|e| ImportError::Decode(e.to_string()))?;

        let (width, height) = (info.width, info.height);
        self.check_dimensions(width, height)?;

        // Normalize to RGBA
        let pixels = match info.color_type {
            png::ColorType::Rgba => buf[..info.buffer_size()].to_vec(),
            png::ColorType::Rgb => {
                let rgb = &buf[..info.buffer_size()];
                let mut rgba = Vec::with_capacity((width * height * 4) as usize);
                for chunk in rgb.chunks(3) {
                    rgba.extend_from_slice(chunk);
                    rgba.push(255);
                }
                rgba
            }
            png::ColorType::GrayscaleAlpha => {
                let ga = &buf[..info.buffer_size()];
                let mut rgba = Vec::with_capacity((width * height * 4) as usize);
                for chunk in ga.chunks(2) {
                    rgba.push(chunk[0]);
                    rgba.push(chunk[0]);
                    rgba.push(chunk[0]);
                    rgba.push(chunk[1]);
                }
                rgba
            }
            png::ColorType::Grayscale => {
                let gray = &buf[..info.buffer_size()];
                let mut rgba = Vec::with_capacity((width * height * 4) as usize);
                for &g in gray {
                    rgba.push(g);
                    rgba.push(g);
                    rgba.push(g);
                    rgba.push(255);
                }
                rgba
            }
            png::ColorType::Indexed => {
                return Err(ImportError::Unsupported("indexed PNG".to_string()));
            }
        };

        Ok(RasterContent::from_pixels(width, height, pixels))
    }

    fn decode_jpeg(&self, data: &[u8]) -> Result<RasterContent, ImportError> {
        let mut decoder = jpeg_decoder::Decoder::new(Cursor::new(data));
        let decoded = decoder
            .decode()
            .map_err(|e| ImportError::Decode(e.to_string()))?;
        let info = decoder
            .info()
            .ok_or_else(|| ImportError::Decode("no JPEG info".to_string()))?;

        let (width, height) = (info.width as u32, info.height as u32);
        self.check_dimensions(width, height)?;

        let mut pixels = Vec::with_capacity((width as usize) * (height as usize) * 4);
        match info.pixel_format {
            jpeg_decoder::PixelFormat::RGB24 => {
                for chunk in decoded.chunks(3) {
                    pixels.extend_from_slice(chunk);
                    pixels.push(255);
                }
            }
            jpeg_decoder::PixelFormat::L8 => {
                for &gray in &decoded {
                    pixels.push(gray);
                    pixels.push(gray);
                    pixels.push(gray);
                    pixels.push(255);
                }
            }
            other => {
                return Err(ImportError::Unsupported(format!(
                    "JPEG pixel format {other:?}"
                )));
            }
        }

        Ok(RasterContent::from_pixels(width, height, pixels))
    }

    fn decode_gif(&self, data: &[u8]) -> Result<RasterContent, ImportError> {
        let mut options = gif::DecodeOptions::new();
        options.set_color_output(gif::ColorOutput::RGBA);

        let mut decoder = options
            .read_info(Cursor::new(data))
            .map_err(|e| ImportError::Decode(e.to_string()))?;

        // First frame only; animation is out of scope for layers.
        let frame = decoder
            .read_next_frame()
            .map_err(|e| ImportError::Decode(e.to_string()))?
            .ok_or_else(|| ImportError::Decode("no frames in GIF".to_string()))?;

        let (width, height) = (frame.width as u32, frame.height as u32);
        self.check_dimensions(width, height)?;

        Ok(RasterContent::from_pixels(
            width,
            height,
            frame.buffer.to_vec(),
        ))
    }

    fn decode_bmp(&self, data: &[u8]) -> Result<RasterContent, ImportError> {
        let img = image::load_from_memory_with_format(data, image::ImageFormat::Bmp)
            .map_err(|e| ImportError::Decode(e.to_string()))?;

        let rgba = img.to_rgba8();
        let (width, height) = (rgba.width(), rgba.height());
        self.check_dimensions(width, height)?;

        Ok(RasterContent::from_pixels(width, height, rgba.into_raw()))
    }

    fn check_dimensions(&self, width: u32, height: u32) -> Result<(), ImportError> {
        if width > self.max_width || height > self.max_height {
            return Err(ImportError::TooLarge {
                width,
                height,
                max_width: self.max_width,
                max_height: self.max_height,
            });
        }
        Ok(())
    }
}

impl Default for ImageImporter {
    fn default() -> Self {
        Self::new()
    }
}
