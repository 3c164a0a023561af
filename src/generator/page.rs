//! Decoding archive entries into embeddable page images.

use std::io::Cursor;

use image::codecs::jpeg::JpegDecoder;
use image::{DynamicImage, ExtendedColorType, ImageDecoder, ImageFormat};

use crate::error::{Error, Result};

/// Pixel payload of a page, ready to be embedded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageImage {
    /// Original JPEG bytes, embedded as-is.
    Jpeg { data: Vec<u8>, grayscale: bool },
    /// Uncompressed 8-bit samples, one (gray) or three (RGB) per pixel.
    Raw { data: Vec<u8>, grayscale: bool },
}

impl PageImage {
    pub fn is_grayscale(&self) -> bool {
        match self {
            PageImage::Jpeg { grayscale, .. } | PageImage::Raw { grayscale, .. } => *grayscale,
        }
    }
}

/// A decoded page: dimensions plus the data to embed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedPage {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub image: PageImage,
}

/// Decodes `data` (the bytes of archive entry `name`) into a [`PreparedPage`].
///
/// JPEGs in gray or RGB are fully decoded once to make sure they are intact and then
/// passed through untouched. Everything else is decoded and flattened to 8-bit RGB, or
/// 8-bit gray when the source has no color.
pub fn prepare_page(name: &str, data: Vec<u8>) -> Result<PreparedPage> {
    let decode_error = |reason: String| Error::EntryDecode {
        entry: name.to_string(),
        reason,
    };

    let format = image::guess_format(&data).map_err(|e| decode_error(e.to_string()))?;

    if format == ImageFormat::Jpeg {
        let decoder =
            JpegDecoder::new(Cursor::new(&data)).map_err(|e| decode_error(e.to_string()))?;
        let grayscale = match decoder.original_color_type() {
            ExtendedColorType::L8 => Some(true),
            ExtendedColorType::Rgb8 => Some(false),
            _ => None,
        };
        let decoded =
            DynamicImage::from_decoder(decoder).map_err(|e| decode_error(e.to_string()))?;

        return Ok(match grayscale {
            Some(grayscale) => PreparedPage {
                name: name.to_string(),
                width: decoded.width(),
                height: decoded.height(),
                image: PageImage::Jpeg { data, grayscale },
            },
            // CMYK and friends cannot be passed through as DeviceRGB/DeviceGray.
            None => raw_page(name, &decoded),
        });
    }

    let decoded = image::load_from_memory_with_format(&data, format)
        .map_err(|e| decode_error(e.to_string()))?;
    Ok(raw_page(name, &decoded))
}

fn raw_page(name: &str, decoded: &DynamicImage) -> PreparedPage {
    let grayscale = !decoded.color().has_color();
    let data = if grayscale {
        decoded.to_luma8().into_raw()
    } else {
        decoded.to_rgb8().into_raw()
    };
    PreparedPage {
        name: name.to_string(),
        width: decoded.width(),
        height: decoded.height(),
        image: PageImage::Raw { data, grayscale },
    }
}
