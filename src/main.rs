use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use image2tensor::batch::{BatchOptions, Conversion, DONE_BANNER, check_dir, check_file, run_batch};
use image2tensor::{
    CpuTensorizer, ImageConvert, ImageResizer, PreprocessDescriptor, TensorFormat, Tensorizer,
};

/// Convert a folder of images into normalized model input tensors.
#[derive(Parser, Debug)]
#[command(name = "image2tensor")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write one `.tensor` file per image, preprocessed as the input meta describes.
    Tensor(TensorArgs),
    /// Write one resized `.jpg` per image.
    Resize(ResizeArgs),
}

#[derive(Args, Debug)]
struct TensorArgs {
    /// YAML file describing the model input preprocessing.
    #[arg(
        long = "input-meta",
        alias = "input_meta",
        default_value = "./yolov4-tiny-416-ca-head_inputmeta.yml",
        value_name = "YAML"
    )]
    input_meta: PathBuf,

    /// Encoding of the written tensors.
    #[arg(long, value_enum, default_value_t = TensorFormat::Raw)]
    format: TensorFormat,

    #[command(flatten)]
    batch: BatchArgs,
}

#[derive(Args, Debug)]
struct ResizeArgs {
    /// Resize into this width.
    #[arg(long, default_value = "416", value_name = "INT", value_parser = clap::value_parser!(u32).range(1..))]
    width: u32,

    /// Resize into this height.
    #[arg(long, default_value = "416", value_name = "INT", value_parser = clap::value_parser!(u32).range(1..))]
    height: u32,

    #[command(flatten)]
    batch: BatchArgs,
}

#[derive(Args, Debug)]
struct BatchArgs {
    /// Folder of input images.
    #[arg(
        long = "input-path",
        alias = "input_path",
        default_value = "./input_folder",
        value_name = "DIR"
    )]
    input_path: PathBuf,

    /// Folder receiving the converted files.
    #[arg(
        long = "output-path",
        alias = "output_path",
        default_value = "./output_folder",
        value_name = "DIR"
    )]
    output_path: PathBuf,

    /// Keep the image ratio by zero-padding to a square. Disabling it may impact
    /// model accuracy for classification or detection tasks.
    #[arg(
        long = "keep-ratio",
        alias = "keep_ratio",
        default_value_t = true,
        action = ArgAction::Set,
        value_name = "BOOL"
    )]
    keep_ratio: bool,

    /// Number of images converted concurrently.
    #[arg(short, long, default_value = "1", value_name = "INT")]
    jobs: usize,

    /// Skip images that fail to convert instead of stopping at the first one.
    #[arg(long)]
    keep_going: bool,
}

impl BatchArgs {
    fn options(&self) -> BatchOptions {
        BatchOptions {
            jobs: self.jobs,
            keep_going: self.keep_going,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("image2tensor={log_level}").into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    if let Err(err) = run(cli).await {
        error!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    debug!(?cli, "configuration");

    let (conversion, batch) = match cli.command {
        Command::Tensor(args) => {
            check_dir(&args.batch.input_path, "input dir")?;
            check_dir(&args.batch.output_path, "output dir")?;
            check_file(&args.input_meta, "input meta yaml file")?;

            let descriptor = PreprocessDescriptor::from_path(&args.input_meta)
                .with_context(|| format!("failed to load {}", args.input_meta.display()))?;
            debug!(?descriptor, "preprocess descriptor");
            let conv = ImageConvert::new(descriptor, args.batch.keep_ratio)?;
            let tensorizer = CpuTensorizer::new(conv).await?;
            let conversion = Conversion::Tensor {
                tensorizer,
                format: args.format,
            };
            (conversion, args.batch)
        }
        Command::Resize(args) => {
            let resizer = ImageResizer::new(args.width, args.height, args.batch.keep_ratio)?;
            (Conversion::Resize(resizer), args.batch)
        }
    };

    let report = run_batch(
        Arc::new(conversion),
        &batch.input_path,
        &batch.output_path,
        batch.options(),
    )
    .await?;

    if !report.is_success() {
        anyhow::bail!(
            "{} of {} images failed to convert",
            report.failed.len(),
            report.failed.len() + report.converted.len()
        );
    }
    info!(converted = report.converted.len(), "all images converted");
    println!("{DONE_BANNER}");
    Ok(())
}
