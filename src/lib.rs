//! # image2tensor
//!
//! Converts images into normalized, transposed `f32` tensors ready to feed a
//! neural network, driven by the preprocessing section of an input meta YAML
//! file (mean, scale, layout, channel order and target shape).
//!
//! ## Example
//!
//! ```no_run
//! use image2tensor::{ImageConvert, PreprocessDescriptor};
//!
//! # fn main() -> anyhow::Result<()> {
//! let descriptor = PreprocessDescriptor::from_path("inputmeta.yml")?;
//! let convert = ImageConvert::new(descriptor, true)?;
//!
//! let img = image::open("dog.jpg")?;
//! let tensor = convert.to_tensor(&img)?;
//! println!("{:?}", tensor.shape());
//! # Ok(())
//! # }
//! ```

pub use cpu_tensor::{CpuTensorizer, ImageConvert};
pub use descriptor::PreprocessDescriptor;
pub use error::{Error, Result};
pub use image_resizer::{ImageResizer, resize};
pub use layout::{Axis, Layout};
pub use tensor_file::TensorFormat;
pub use tensorizer_trait::Tensorizer;
pub mod batch;
pub mod cpu_tensor;
pub mod descriptor;
pub mod error;
pub mod image_resizer;
pub mod layout;
pub mod tensor_file;
pub mod tensorizer_trait;
