//! Decoded image buffers and the decoder seam.

use std::path::Path;

use image::{ImageBuffer, Luma, Rgb, Rgba};

use crate::error::VocmapError;

/// An interleaved (HWC) 8-bit image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    channels: u8,
    pixels: Vec<u8>,
}

impl Raster {
    /// Wraps a pixel buffer; `None` if its length is not `w * h * c`.
    pub fn from_raw(width: u32, height: u32, channels: u8, pixels: Vec<u8>) -> Option<Self> {
        let expected = width as usize * height as usize * channels as usize;
        (pixels.len() == expected).then_some(Self {
            width,
            height,
            channels,
            pixels,
        })
    }

    /// A zero-filled raster.
    pub fn zeros(width: u32, height: u32, channels: u8) -> Self {
        let len = width as usize * height as usize * channels as usize;
        Self {
            width,
            height,
            channels,
            pixels: vec![0; len],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// `(width, height, channels)`
    pub fn shape(&self) -> (u32, u32, u8) {
        (self.width, self.height, self.channels)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// Resamples to `width` x `height` with a triangle filter.
    pub fn resized(&self, width: u32, height: u32) -> Result<Self, VocmapError> {
        if width == 0 || height == 0 {
            return Err(VocmapError::InvalidImageDimensions { width, height });
        }
        if (width, height) == (self.width, self.height) {
            return Ok(self.clone());
        }

        let pixels = match self.channels {
            1 => resize_buffer::<Luma<u8>>(self, width, height)?,
            3 => resize_buffer::<Rgb<u8>>(self, width, height)?,
            4 => resize_buffer::<Rgba<u8>>(self, width, height)?,
            other => {
                return Err(VocmapError::UnsupportedFormat(format!(
                    "cannot resize a {other}-channel raster"
                )))
            }
        };

        Ok(Self {
            width,
            height,
            channels: self.channels,
            pixels,
        })
    }
}

impl From<image::RgbImage> for Raster {
    fn from(img: image::RgbImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            channels: 3,
            pixels: img.into_raw(),
        }
    }
}

fn resize_buffer<P>(raster: &Raster, width: u32, height: u32) -> Result<Vec<u8>, VocmapError>
where
    P: image::Pixel<Subpixel = u8> + 'static,
{
    let buffer: ImageBuffer<P, &[u8]> =
        ImageBuffer::from_raw(raster.width, raster.height, raster.pixels.as_slice()).ok_or(
            VocmapError::InvalidImageDimensions {
                width: raster.width,
                height: raster.height,
            },
        )?;
    Ok(
        image::imageops::resize(&buffer, width, height, image::imageops::FilterType::Triangle)
            .into_raw(),
    )
}

/// Turns an image file into a [`Raster`].
pub trait ImageDecoder: Send + Sync {
    fn decode(&self, path: &Path) -> Result<Raster, VocmapError>;
}

/// Decodes JPEG, PNG and BMP files from disk into RGB rasters.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileDecoder;

impl ImageDecoder for FileDecoder {
    fn decode(&self, path: &Path) -> Result<Raster, VocmapError> {
        let img = image::open(path).map_err(|source| match source {
            image::ImageError::IoError(err) if err.kind() == std::io::ErrorKind::NotFound => {
                VocmapError::MissingFile {
                    kind: "image",
                    path: path.to_path_buf(),
                }
            }
            source => VocmapError::ImageDecode {
                path: path.to_path_buf(),
                source,
            },
        })?;
        Ok(Raster::from(img.to_rgb8()))
    }
}
