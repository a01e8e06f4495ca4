//! `onnx-classify` CLI - classify images with an ONNX model.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use onnx_classify::model::{OptimizationLevel, SessionOptions};
use onnx_classify::{Classifier, Config, LabelTable, ModelKind, ModelSource};

/// Classify images with ImageNet-style ONNX models.
#[derive(Parser, Debug)]
#[command(name = "onnx-classify")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify a single image.
    Classify(ClassifyArgs),

    /// Feed a constant tensor through the model and print the first raw outputs.
    Probe(ProbeArgs),
}

#[derive(Args, Debug)]
struct ClassifyArgs {
    /// Input image path.
    #[arg(value_name = "IMAGE")]
    image: PathBuf,

    /// Newline-delimited class labels, one per class index.
    #[arg(short, long, value_name = "PATH")]
    labels: Option<PathBuf>,

    /// Number of ranked predictions to print.
    #[arg(short = 'k', long, default_value = "5", value_name = "INT")]
    top_k: usize,

    /// Resize images that do not match the model input instead of failing.
    #[arg(long)]
    resize: bool,

    #[command(flatten)]
    model: ModelArgs,
}

#[derive(Args, Debug)]
struct ProbeArgs {
    /// Value every input element is set to.
    #[arg(long, default_value = "0.2", value_name = "FLOAT")]
    fill: f32,

    /// Number of output values to print.
    #[arg(long, default_value = "5", value_name = "INT")]
    count: usize,

    #[command(flatten)]
    model: ModelArgs,
}

#[derive(Args, Debug)]
struct ModelArgs {
    /// ONNX model file. ResNet50-v2 is downloaded into the cache when omitted.
    #[arg(short, long, value_name = "PATH")]
    model: Option<PathBuf>,

    /// Name of the model's image input.
    #[arg(long, default_value = "data", value_name = "NAME")]
    input_name: String,

    /// Name of the model's score output.
    #[arg(long, default_value = "resnetv24_dense0_fwd", value_name = "NAME")]
    output_name: String,

    /// Expected input width.
    #[arg(long, default_value = "224", value_name = "INT")]
    width: u32,

    /// Expected input height.
    #[arg(long, default_value = "224", value_name = "INT")]
    height: u32,

    /// ONNX Runtime intra-op threads.
    #[arg(long, default_value = "1", value_name = "INT")]
    threads: usize,

    /// Graph optimization level.
    #[arg(long, value_enum, default_value_t = OptimizationLevel::Basic)]
    optimization: OptimizationLevel,
}

impl ModelArgs {
    fn source(&self) -> ModelSource {
        self.model
            .clone()
            .map_or(ModelSource::Zoo(ModelKind::ResNet50V2), ModelSource::Path)
    }

    fn config(&self) -> Config {
        Config {
            input_name: self.input_name.clone(),
            output_name: self.output_name.clone(),
            input_width: self.width,
            input_height: self.height,
            session: SessionOptions {
                intra_threads: self.threads,
                optimization_level: self.optimization,
            },
            ..Config::default()
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("onnx_classify={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let result = match &cli.command {
        Command::Classify(args) => classify(args),
        Command::Probe(args) => probe(args),
    };

    if let Err(err) = result {
        tracing::error!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn classify(args: &ClassifyArgs) -> Result<()> {
    let config = Config {
        top_k: args.top_k,
        resize: args.resize,
        ..args.model.config()
    };

    // Read labels before touching the model so a bad path fails fast
    let labels = args
        .labels
        .as_ref()
        .map(LabelTable::load)
        .transpose()
        .context("Failed to load labels")?;

    let mut classifier = Classifier::open(config, &args.model.source())
        .context("Failed to initialize classifier")?;
    if let Some(labels) = labels {
        classifier = classifier.with_labels(labels);
    }

    let result = classifier
        .classify(&args.image)
        .with_context(|| format!("Failed to classify {}", args.image.display()))?;

    println!("Predicted Class ID: {}", result.class_id);
    if let Some(label) = &result.label {
        println!("Label: {label}");
    }
    println!("Confidence: {:.2}%", result.confidence * 100.0);

    if result.top_k.len() > 1 {
        println!("Top {}:", result.top_k.len());
        for (rank, prediction) in result.top_k.iter().enumerate() {
            println!(
                "  {:>2}. {:>5}  {:>6.2}%  {}",
                rank + 1,
                prediction.class_id,
                prediction.probability * 100.0,
                prediction.label.as_deref().unwrap_or("")
            );
        }
    }

    Ok(())
}

fn probe(args: &ProbeArgs) -> Result<()> {
    let mut classifier = Classifier::open(args.model.config(), &args.model.source())
        .context("Failed to initialize classifier")?;

    let values = classifier
        .probe(args.fill, args.count)
        .context("Failed to run probe")?;

    let rendered: Vec<String> = values.iter().map(ToString::to_string).collect();
    println!("Input:  constant {}", args.fill);
    println!("Output: [{}]", rendered.join(", "));

    Ok(())
}
