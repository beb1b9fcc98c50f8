use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::layout::{Axis, Layout};

#[derive(Debug, Deserialize)]
pub struct MetaFile {
    pub input_meta: InputMeta,
}

#[derive(Debug, Deserialize)]
pub struct InputMeta {
    #[serde(default)]
    pub databases: Vec<Database>,
}

#[derive(Debug, Deserialize)]
pub struct Database {
    #[serde(default)]
    pub ports: Vec<Port>,
}

#[derive(Debug, Deserialize)]
pub struct Port {
    pub layout: Layout,
    pub shape: Vec<usize>,
    pub preprocess: Preprocess,
}

#[derive(Debug, Deserialize)]
pub struct Preprocess {
    pub mean: ChannelValues,
    pub scale: ChannelValues,
    pub reverse_channel: bool,
}

/// `mean` and `scale` may be a bare number, a one-element list or a per-channel list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ChannelValues {
    Scalar(f32),
    List(Vec<f32>),
}

impl ChannelValues {
    fn per_channel(&self, name: &'static str) -> Result<[f32; 3]> {
        match self {
            ChannelValues::Scalar(v) => Ok([*v; 3]),
            ChannelValues::List(values) => broadcast(name, values),
        }
    }
}

fn broadcast(name: &'static str, values: &[f32]) -> Result<[f32; 3]> {
    match *values {
        [v] => Ok([v; 3]),
        [r, g, b] => Ok([r, g, b]),
        _ => Err(Error::InvalidChannelParams {
            name,
            len: values.len(),
        }),
    }
}

/// Preprocessing parameters of `input_meta.databases[0].ports[0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessDescriptor {
    mean: [f32; 3],
    scale: [f32; 3],
    layout: Layout,
    reverse_channel: bool,
    shape: [usize; 4],
    width: u32,
    height: u32,
}

impl PreprocessDescriptor {
    /// `shape` is given in `layout` order, e.g. `[1, 3, 416, 416]` for `nchw`.
    pub fn new(
        mean: &[f32],
        scale: &[f32],
        layout: Layout,
        reverse_channel: bool,
        shape: &[usize],
    ) -> Result<Self> {
        let shape: [usize; 4] = shape.try_into().map_err(|_| {
            Error::InvalidShape(format!(
                "expected 4 values aligned with layout `{layout}`, got {shape:?}"
            ))
        })?;
        let target = |axis: Axis| {
            u32::try_from(shape[layout.position(axis)])
                .ok()
                .filter(|dim| *dim > 0)
                .ok_or_else(|| {
                    Error::InvalidShape(format!(
                        "`{}` must be between 1 and {} in {shape:?}",
                        axis.letter(),
                        u32::MAX
                    ))
                })
        };
        Ok(PreprocessDescriptor {
            mean: broadcast("mean", mean)?,
            scale: broadcast("scale", scale)?,
            layout,
            reverse_channel,
            shape,
            width: target(Axis::W)?,
            height: target(Axis::H)?,
        })
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let meta: MetaFile = serde_yaml::from_str(yaml)?;
        let port = meta
            .input_meta
            .databases
            .into_iter()
            .next()
            .ok_or(Error::MissingEntry("databases[0]"))?
            .ports
            .into_iter()
            .next()
            .ok_or(Error::MissingEntry("databases[0].ports[0]"))?;
        Self::try_from(port)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    pub fn mean(&self) -> [f32; 3] {
        self.mean
    }

    pub fn scale(&self) -> [f32; 3] {
        self.scale
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn reverse_channel(&self) -> bool {
        self.reverse_channel
    }

    pub fn dim(&self, axis: Axis) -> usize {
        self.shape[self.layout.position(axis)]
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn tensor_shape(&self) -> [usize; 4] {
        self.shape
    }
}

impl TryFrom<Port> for PreprocessDescriptor {
    type Error = Error;

    fn try_from(port: Port) -> Result<Self> {
        let Preprocess {
            mean,
            scale,
            reverse_channel,
        } = port.preprocess;
        Self::new(
            &mean.per_channel("mean")?,
            &scale.per_channel("scale")?,
            port.layout,
            reverse_channel,
            &port.shape,
        )
    }
}
