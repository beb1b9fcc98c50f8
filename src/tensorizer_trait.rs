use image::DynamicImage;
use ndarray::{Array3, Array4};

use crate::cpu_tensor::ImageConvert;

pub trait Tensorizer {
    type BuildType;
    fn new(
        config: ImageConvert,
    ) -> impl std::future::Future<Output = anyhow::Result<Self::BuildType>>;
    /// Tensor without the batch axis; the remaining axes keep their layout order.
    fn tensorize(
        &self,
        image: &DynamicImage,
    ) -> impl std::future::Future<Output = anyhow::Result<Array3<f32>>>;
    /// Tensor with all four axes in layout order.
    fn tensorize_batch(
        &self,
        image: &DynamicImage,
    ) -> impl std::future::Future<Output = anyhow::Result<Array4<f32>>>;
}
