//! Converts every image in a directory, one output file per image.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::DynamicImage;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::cpu_tensor::CpuTensorizer;
use crate::error::{Error, Result};
use crate::image_resizer::ImageResizer;
use crate::tensor_file::{TensorFormat, output_path, tensor_path, write_tensor};

/// Extensions picked up from the input directory, compared case-insensitively.
pub const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "bmp", "tif", "tiff"];

/// Printed once every image of a run has been converted.
pub const DONE_BANNER: &str = "==========DONE==========";

/// What to produce for each input image.
pub enum Conversion {
    /// `<stem>.tensor`
    Tensor {
        tensorizer: CpuTensorizer,
        format: TensorFormat,
    },
    /// `<stem>.jpg`
    Resize(ImageResizer),
}

impl Conversion {
    pub async fn convert(&self, source: &Path, output_dir: &Path) -> anyhow::Result<PathBuf> {
        let img = decode(source).await?;
        match self {
            Conversion::Tensor { tensorizer, format } => {
                let tensor = tensorizer.tensorize_owned(img).await?;
                let path = tensor_path(output_dir, source);
                write_tensor(&path, &tensor, *format).await?;
                info!("image tensor is saved at: {}", path.display());
                Ok(path)
            }
            Conversion::Resize(resizer) => {
                let path = output_path(output_dir, source, "jpg");
                resizer.rescale(img, &path).await?;
                info!("new resized image saved: {}", path.display());
                Ok(path)
            }
        }
    }
}

/// Decode `path` into an 8-bit RGB image.
pub async fn decode(path: &Path) -> anyhow::Result<DynamicImage> {
    let path = path.to_path_buf();
    let img = tokio::task::spawn_blocking(move || -> Result<DynamicImage> {
        let img = image::open(&path).map_err(|source| Error::Image { path, source })?;
        Ok(match img {
            DynamicImage::ImageRgb8(_) => img,
            other => DynamicImage::ImageRgb8(other.to_rgb8()),
        })
    })
    .await??;
    Ok(img)
}

#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    /// Images converted concurrently. `1` converts in directory order.
    pub jobs: usize,
    /// Skip images that fail instead of stopping the run.
    pub keep_going: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        BatchOptions {
            jobs: 1,
            keep_going: false,
        }
    }
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub converted: Vec<PathBuf>,
    /// Source image and the error it failed with.
    pub failed: Vec<(PathBuf, String)>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

pub fn check_dir(path: &Path, kind: &'static str) -> Result<()> {
    if !path.is_dir() {
        return Err(Error::InvalidPath {
            kind,
            path: absolute(path),
        });
    }
    Ok(())
}

pub fn check_file(path: &Path, kind: &'static str) -> Result<()> {
    if !path.is_file() {
        return Err(Error::InvalidPath {
            kind,
            path: absolute(path),
        });
    }
    Ok(())
}

pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

/// Image files directly inside `input_dir`, sorted by path.
pub async fn list_images(input_dir: &Path) -> Result<Vec<PathBuf>> {
    let io_err = |source| Error::Io {
        path: input_dir.to_path_buf(),
        source,
    };
    let mut entries = tokio::fs::read_dir(input_dir).await.map_err(io_err)?;
    let mut images = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
        let path = entry.path();
        let is_file = tokio::fs::metadata(&path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if is_file && is_image(&path) {
            images.push(path);
        }
    }
    images.sort();
    Ok(images)
}

/// Convert every image of `input_dir` into `output_dir`.
///
/// Without `keep_going` the first failure stops scheduling new images, waits
/// for the ones already running and is then returned. With it, failures are
/// collected into the report.
pub async fn run_batch(
    conversion: Arc<Conversion>,
    input_dir: &Path,
    output_dir: &Path,
    options: BatchOptions,
) -> anyhow::Result<BatchReport> {
    check_dir(input_dir, "input dir")?;
    check_dir(output_dir, "output dir")?;

    let images = list_images(input_dir).await?;
    if images.is_empty() {
        warn!("no images found in {}", absolute(input_dir).display());
    }

    let jobs = options.jobs.max(1);
    let mut report = BatchReport::default();
    let mut in_flight = JoinSet::new();
    for image in images {
        while in_flight.len() >= jobs {
            if let Some(done) = in_flight.join_next().await {
                let (source, result) = done?;
                if let Err(err) = record(&mut report, source, result, options.keep_going) {
                    settle(&mut in_flight).await;
                    return Err(err);
                }
            }
        }
        let conversion = Arc::clone(&conversion);
        let output_dir = output_dir.to_path_buf();
        in_flight.spawn(async move {
            info!("{}", image.display());
            let result = conversion.convert(&image, &output_dir).await;
            (image, result)
        });
    }
    while let Some(done) = in_flight.join_next().await {
        let (source, result) = done?;
        if let Err(err) = record(&mut report, source, result, options.keep_going) {
            settle(&mut in_flight).await;
            return Err(err);
        }
    }

    report.converted.sort();
    report.failed.sort();
    Ok(report)
}

/// Wait for every running conversion so none writes after the run returns.
async fn settle(in_flight: &mut JoinSet<(PathBuf, anyhow::Result<PathBuf>)>) {
    while let Some(done) = in_flight.join_next().await {
        if let Ok((source, Err(err))) = done {
            error!("image: {}. has exception: {err:#}", source.display());
        }
    }
}

fn record(
    report: &mut BatchReport,
    source: PathBuf,
    result: anyhow::Result<PathBuf>,
    keep_going: bool,
) -> anyhow::Result<()> {
    match result {
        Ok(path) => report.converted.push(path),
        Err(err) => {
            error!("image: {}. has exception: {err:#}", source.display());
            if !keep_going {
                return Err(err.context(format!("failed to convert {}", source.display())));
            }
            report.failed.push((source, format!("{err:#}")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_image() {
        for name in ["a.png", "b.JPG", "c.jpeg", "d.bmp", "e.tif", "f.TIFF"] {
            assert!(is_image(Path::new(name)), "{name}");
        }
        for name in ["a.txt", "b", "c.tensor", "d.gif"] {
            assert!(!is_image(Path::new(name)), "{name}");
        }
    }

    #[test]
    fn test_check_dir_reports_absolute_path() {
        let err = check_dir(Path::new("surely/not/here"), "input dir").unwrap_err();
        match err {
            Error::InvalidPath { kind, path } => {
                assert_eq!(kind, "input dir");
                assert!(path.is_absolute());
                assert!(path.ends_with("surely/not/here"));
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_check_file_rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check_file(dir.path(), "input meta yaml file").is_err());
        assert!(check_dir(dir.path(), "output dir").is_ok());
    }

    #[tokio::test]
    async fn test_list_images_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.png", "a.jpg", "notes.txt", "c.bmp"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.png")).unwrap();
        let names: Vec<_> = list_images(dir.path())
            .await
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.png", "c.bmp"]);
    }

    #[tokio::test]
    async fn test_decode_converts_to_rgb() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gray.png");
        image::GrayImage::from_pixel(3, 2, image::Luma([77])).save(&path).unwrap();
        let img = decode(&path).await.unwrap();
        let rgb = img.as_rgb8().unwrap();
        assert_eq!(rgb.get_pixel(2, 1).0, [77, 77, 77]);
    }
}
