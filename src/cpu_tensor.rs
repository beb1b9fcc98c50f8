use std::sync::Arc;

use image::DynamicImage;
use ndarray::{Array1, Array3, Array4, Axis};

use crate::descriptor::PreprocessDescriptor;
use crate::error::{Error, Result};
use crate::image_resizer::{check_square, resize};
use crate::layout;
use crate::tensorizer_trait::Tensorizer;

/// Converts decoded images into model input tensors for one port descriptor.
#[derive(Debug, Clone)]
pub struct ImageConvert {
    descriptor: PreprocessDescriptor,
    keep_ratio: bool,
}

impl ImageConvert {
    /// Fails with [`Error::NonSquareTarget`] when `keep_ratio` is set and the
    /// descriptor's `w` and `h` differ.
    pub fn new(descriptor: PreprocessDescriptor, keep_ratio: bool) -> Result<Self> {
        if keep_ratio {
            check_square(descriptor.width(), descriptor.height())?;
        }
        Ok(ImageConvert {
            descriptor,
            keep_ratio,
        })
    }

    pub fn descriptor(&self) -> &PreprocessDescriptor {
        &self.descriptor
    }

    /// Resize, normalize, batch-expand, permute to the descriptor layout and
    /// optionally reverse the channel axis, in that order.
    pub fn to_tensor(&self, image: &DynamicImage) -> Result<Array4<f32>> {
        let d = &self.descriptor;
        let resized = resize(image, d.width(), d.height(), self.keep_ratio)?;
        let hwc = normalize(&rgb_array(&resized)?, d.mean(), d.scale());

        let target = d.layout();
        let mut tensor = hwc
            .insert_axis(Axis(0))
            .permuted_axes(target.permutation());
        if d.reverse_channel() {
            tensor.invert_axis(Axis(target.position(layout::Axis::C)));
        }
        let tensor = tensor.as_standard_layout().into_owned();

        let expected = d.tensor_shape();
        if tensor.shape() != expected {
            return Err(Error::ShapeMismatch {
                expected: expected.to_vec(),
                actual: tensor.shape().to_vec(),
            });
        }
        Ok(tensor)
    }
}

/// View an image as a `(height, width, 3)` array of 8-bit RGB values.
fn rgb_array(image: &DynamicImage) -> Result<Array3<u8>> {
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();
    Array3::from_shape_vec((height as usize, width as usize, 3), rgb.into_raw()).map_err(|_| {
        Error::ShapeMismatch {
            expected: vec![height as usize, width as usize, 3],
            actual: vec![],
        }
    })
}

/// `(pixel - mean) * scale` per channel. No clipping.
pub fn normalize(hwc: &Array3<u8>, mean: [f32; 3], scale: [f32; 3]) -> Array3<f32> {
    let mean = Array1::from(mean.to_vec());
    let scale = Array1::from(scale.to_vec());
    (hwc.mapv(f32::from) - &mean) * &scale
}

pub struct CpuTensorizer {
    conv: Arc<ImageConvert>,
}

impl CpuTensorizer {
    /// Like [`Tensorizer::tensorize_batch`], taking ownership of `image` so
    /// it moves onto the blocking pool without a copy.
    pub async fn tensorize_owned(&self, image: DynamicImage) -> anyhow::Result<Array4<f32>> {
        let conv = Arc::clone(&self.conv);
        let tensor = tokio::task::spawn_blocking(move || conv.to_tensor(&image)).await??;
        Ok(tensor)
    }
}

impl Tensorizer for CpuTensorizer {
    type BuildType = CpuTensorizer;

    async fn new(config: ImageConvert) -> anyhow::Result<Self::BuildType> {
        Ok(CpuTensorizer {
            conv: Arc::new(config),
        })
    }

    async fn tensorize(&self, image: &DynamicImage) -> anyhow::Result<Array3<f32>> {
        let batch_axis = self.conv.descriptor().layout().position(layout::Axis::N);
        let tensor = self.tensorize_batch(image).await?;
        Ok(tensor.index_axis_move(Axis(batch_axis), 0))
    }

    async fn tensorize_batch(&self, image: &DynamicImage) -> anyhow::Result<Array4<f32>> {
        self.tensorize_owned(image.clone()).await
    }
}
