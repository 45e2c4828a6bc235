//! Raster encoders used by [`Message::add_image`](crate::Message::add_image).

use crate::{Error, Result};
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use std::io::Cursor;

const JPEG_QUALITY: u8 = 90;

/// Turns a decoded image into attachment bytes.
///
/// Implement this to plug in an encoder for a format the built-in
/// [`ImageFormat`] set does not cover.
pub trait ImageEncoder {
    /// MIME type of the encoded bytes.
    fn mime_type(&self) -> &'static str;

    /// Extension appended to attachment names, without the dot.
    fn file_extension(&self) -> &'static str;

    /// Encode `image` into the bytes stored on the attachment.
    fn encode(&self, image: &DynamicImage) -> Result<Vec<u8>>;
}

/// Raster formats known to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    /// Portable Network Graphics.
    Png,
    /// Baseline JPEG, quality 90, alpha dropped.
    Jpeg,
    /// Windows bitmap.
    Bmp,
    /// Graphics Interchange Format.
    Gif,
    /// Tagged Image File Format.
    Tiff,
    /// Recognized but not encodable by this build.
    Jpeg2000,
}

impl ImageFormat {
    /// Formats that [`ImageEncoder::encode`] can produce in this build.
    pub fn supported() -> &'static [ImageFormat] {
        &[
            ImageFormat::Png,
            ImageFormat::Jpeg,
            ImageFormat::Bmp,
            ImageFormat::Gif,
            ImageFormat::Tiff,
        ]
    }

    /// Whether this build can encode the format.
    pub fn is_supported(self) -> bool {
        Self::supported().contains(&self)
    }

    fn codec(self) -> Option<image::ImageFormat> {
        match self {
            ImageFormat::Png => Some(image::ImageFormat::Png),
            ImageFormat::Jpeg => Some(image::ImageFormat::Jpeg),
            ImageFormat::Bmp => Some(image::ImageFormat::Bmp),
            ImageFormat::Gif => Some(image::ImageFormat::Gif),
            ImageFormat::Tiff => Some(image::ImageFormat::Tiff),
            ImageFormat::Jpeg2000 => None,
        }
    }
}

impl ImageEncoder for ImageFormat {
    fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Bmp => "image/bmp",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Tiff => "image/tiff",
            ImageFormat::Jpeg2000 => "image/jp2",
        }
    }

    fn file_extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Gif => "gif",
            ImageFormat::Tiff => "tiff",
            ImageFormat::Jpeg2000 => "jp2",
        }
    }

    fn encode(&self, image: &DynamicImage) -> Result<Vec<u8>> {
        let codec = self.codec().ok_or(Error::Unsupported("JPEG 2000 encoding"))?;
        let mut bytes = Vec::new();

        match codec {
            // JPEG has no alpha channel.
            image::ImageFormat::Jpeg => {
                let rgb = image.to_rgb8();
                JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY).encode_image(&rgb)?;
            }
            _ => image.write_to(&mut Cursor::new(&mut bytes), codec)?,
        }

        Ok(bytes)
    }
}
