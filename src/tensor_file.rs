use std::borrow::Cow;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use ndarray::Array4;

use crate::error::{Error, Result};

pub const TENSOR_EXTENSION: &str = "tensor";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum TensorFormat {
    /// Headerless native-endian f32 values.
    #[default]
    Raw,
    Text,
}

pub fn tensor_path(output_dir: &Path, source: &Path) -> PathBuf {
    output_path(output_dir, source, TENSOR_EXTENSION)
}

pub(crate) fn output_path(output_dir: &Path, source: &Path, extension: &str) -> PathBuf {
    let mut name = source
        .file_stem()
        .unwrap_or(source.as_os_str())
        .to_os_string();
    name.push(".");
    name.push(extension);
    output_dir.join(name)
}

pub fn encode(tensor: &Array4<f32>, format: TensorFormat) -> Vec<u8> {
    let values: Cow<'_, [f32]> = match tensor.as_slice() {
        Some(values) => Cow::Borrowed(values),
        None => Cow::Owned(tensor.iter().copied().collect()),
    };
    match format {
        TensorFormat::Raw => bytemuck::cast_slice::<f32, u8>(&values).to_vec(),
        TensorFormat::Text => values
            .iter()
            .map(f32::to_string)
            .collect::<Vec<_>>()
            .join("\n")
            .into_bytes(),
    }
}

pub async fn write_tensor(path: &Path, tensor: &Array4<f32>, format: TensorFormat) -> Result<()> {
    tokio::fs::write(path, encode(tensor, format))
        .await
        .map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// Read a [`TensorFormat::Raw`] file back as a tensor of `shape`.
pub fn read_raw_tensor(path: &Path, shape: [usize; 4]) -> Result<Array4<f32>> {
    let bytes = std::fs::read(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let expected: usize = shape.iter().product();
    let value_size = std::mem::size_of::<f32>();
    if bytes.len() != expected * value_size {
        return Err(Error::ShapeMismatch {
            expected: shape.to_vec(),
            actual: vec![bytes.len() / value_size],
        });
    }
    let values: Vec<f32> = bytemuck::pod_collect_to_vec(&bytes);
    Array4::from_shape_vec(shape, values).map_err(|_| Error::ShapeMismatch {
        expected: shape.to_vec(),
        actual: vec![expected],
    })
}
