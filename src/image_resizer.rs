use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage};
use tracing::warn;

use crate::error::{Error, Result};

/// Bicubic filter used for every resize.
pub const RESIZE_FILTER: FilterType = FilterType::CatmullRom;

/// JPEG quality of images written in resize-only mode.
pub const JPEG_QUALITY: u8 = 95;

/// Resize `image` to `width` x `height`.
///
/// With `keep_ratio` the image is first pasted, centered, onto a black square
/// whose side is the longer source edge, so the content is scaled without
/// distortion. This requires a square target.
pub fn resize(
    image: &DynamicImage,
    width: u32,
    height: u32,
    keep_ratio: bool,
) -> Result<DynamicImage> {
    if !keep_ratio {
        warn!("changing the image ratio could impact the accuracy of classification and detection");
        return Ok(image.resize_exact(width, height, RESIZE_FILTER));
    }
    check_square(width, height)?;

    let padded = pad_to_square(&image.to_rgb8());
    Ok(DynamicImage::ImageRgb8(imageops::resize(
        &padded,
        width,
        height,
        RESIZE_FILTER,
    )))
}

/// Center `image` on a black square canvas of side `max(width, height)`.
pub fn pad_to_square(image: &RgbImage) -> RgbImage {
    let (width, height) = image.dimensions();
    let side = width.max(height);
    let mut canvas = RgbImage::new(side, side);
    let x = (side - width) / 2;
    let y = (side - height) / 2;
    imageops::replace(&mut canvas, image, i64::from(x), i64::from(y));
    canvas
}

pub(crate) fn check_square(width: u32, height: u32) -> Result<()> {
    if width != height {
        return Err(Error::NonSquareTarget { width, height });
    }
    Ok(())
}

/// Resizes images to a fixed size and writes them as JPEG.
#[derive(Debug, Clone, Copy)]
pub struct ImageResizer {
    output_width: u32,
    output_height: u32,
    keep_ratio: bool,
}

impl ImageResizer {
    pub fn new(output_width: u32, output_height: u32, keep_ratio: bool) -> Result<Self> {
        if output_width == 0 || output_height == 0 {
            return Err(Error::InvalidShape(format!(
                "resize target {output_width}x{output_height} must be non-zero"
            )));
        }
        if keep_ratio {
            check_square(output_width, output_height)?;
        }
        Ok(ImageResizer {
            output_width,
            output_height,
            keep_ratio,
        })
    }

    pub fn resize(&self, img: &DynamicImage) -> Result<DynamicImage> {
        resize(img, self.output_width, self.output_height, self.keep_ratio)
    }

    /// Resize `img` and save it to `output_path` as JPEG at [`JPEG_QUALITY`].
    pub async fn rescale(&self, img: DynamicImage, output_path: &Path) -> anyhow::Result<()> {
        let resizer = *self;
        let output_path = output_path.to_path_buf();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let resized = resizer.resize(&img)?.to_rgb8();
            let file = File::create(&output_path).map_err(|source| Error::Io {
                path: output_path.clone(),
                source,
            })?;
            let encoder = JpegEncoder::new_with_quality(BufWriter::new(file), JPEG_QUALITY);
            resized
                .write_with_encoder(encoder)
                .map_err(|source| Error::Image {
                    path: output_path.clone(),
                    source,
                })
        })
        .await??;
        Ok(())
    }
}
