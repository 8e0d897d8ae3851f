//! Command-line front end: train, evaluate and query a digit classifier.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use log::info;

use digit_mlp::data::{parse_pixel_line, parse_record};
use digit_mlp::{
    Architecture, Dataset, FitConfig, MNIST_CLASSES, MNIST_INPUTS, Network, idx, metrics,
};

#[derive(Parser)]
#[command(name = "digit-mlp")]
#[command(version)]
#[command(about = "Train and run a from-scratch digit classifier", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a fresh network on a CSV sample set
    Train {
        /// Training CSV (`label,p1,...,pN`)
        #[arg(long, value_name = "CSV")]
        train: PathBuf,

        /// Validation CSV, evaluated after each epoch
        #[arg(long, value_name = "CSV")]
        validation: PathBuf,

        /// Hidden layer widths, comma separated
        #[arg(long, value_delimiter = ',', default_values_t = vec![8_usize, 8])]
        hidden: Vec<usize>,

        #[arg(long, default_value_t = 0.01)]
        learning_rate: f64,

        #[arg(long, default_value_t = 5)]
        epochs: usize,

        /// Seed for weight initialization; entropy when omitted
        #[arg(long)]
        seed: Option<u64>,

        #[arg(long, default_value_t = MNIST_INPUTS)]
        inputs: usize,

        #[arg(long, default_value_t = MNIST_CLASSES)]
        classes: usize,

        /// Where to write the trained model (JSON)
        #[arg(short, long, value_name = "MODEL")]
        out: Option<PathBuf>,
    },

    /// Report loss and accuracy of a saved model on a CSV sample set
    Evaluate {
        #[arg(long, value_name = "MODEL")]
        model: PathBuf,

        #[arg(long, value_name = "CSV")]
        data: PathBuf,
    },

    /// Classify raw pixel lines (`p1,...,pN`, or full records with --labeled)
    Predict {
        #[arg(long, value_name = "MODEL")]
        model: PathBuf,

        /// File with one sample per line
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Lines carry a leading label column
        #[arg(long)]
        labeled: bool,
    },

    /// Convert an IDX image/label pair to the CSV sample-set format
    Convert {
        #[arg(long, value_name = "IDX")]
        images: PathBuf,

        #[arg(long, value_name = "IDX")]
        labels: PathBuf,

        #[arg(short, long, value_name = "CSV")]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Train {
            train,
            validation,
            hidden,
            learning_rate,
            epochs,
            seed,
            inputs,
            classes,
            out,
        } => {
            let opts = TrainOpts {
                hidden,
                learning_rate,
                epochs,
                seed,
                inputs,
                classes,
            };
            run_train(&train, &validation, &opts, out.as_deref())
        }
        Commands::Evaluate { model, data } => run_evaluate(&model, &data),
        Commands::Predict {
            model,
            input,
            labeled,
        } => run_predict(&model, &input, labeled),
        Commands::Convert {
            images,
            labels,
            out,
        } => {
            let n = idx::convert_to_csv(&images, &labels, &out)
                .with_context(|| format!("converting {} to csv", images.display()))?;
            println!("wrote {n} records to {}", out.display());
            Ok(())
        }
    }
}

struct TrainOpts {
    hidden: Vec<usize>,
    learning_rate: f64,
    epochs: usize,
    seed: Option<u64>,
    inputs: usize,
    classes: usize,
}

fn run_train(train: &Path, validation: &Path, opts: &TrainOpts, out: Option<&Path>) -> Result<()> {
    let train_set = Dataset::load_csv(train, opts.inputs, opts.classes)
        .with_context(|| format!("loading training set {}", train.display()))?;
    let validation_set = Dataset::load_csv(validation, opts.inputs, opts.classes)
        .with_context(|| format!("loading validation set {}", validation.display()))?;
    info!(
        "training on {} samples, validating on {}",
        train_set.len(),
        validation_set.len()
    );

    let mut network = match opts.seed {
        Some(seed) => {
            let arch = Architecture::new(
                opts.inputs,
                opts.classes,
                opts.hidden.clone(),
                opts.learning_rate,
            )?;
            Network::new_with_seed(arch, seed)?
        }
        None => Network::new(opts.inputs, opts.classes, &opts.hidden, opts.learning_rate)?,
    };

    let report = network.fit(
        &train_set,
        &validation_set,
        FitConfig {
            epochs: opts.epochs,
        },
    )?;
    for epoch in &report.epochs {
        println!(
            "epoch {:>3}  loss {:.4}  accuracy {:.2}%",
            epoch.epoch,
            epoch.mean_loss,
            epoch.accuracy * 100.0
        );
    }

    if let Some(out) = out {
        network
            .save_json(out)
            .with_context(|| format!("saving model to {}", out.display()))?;
        info!("model written to {}", out.display());
    }
    Ok(())
}

fn run_evaluate(model: &Path, data: &Path) -> Result<()> {
    let network = load_model(model)?;
    let dataset = Dataset::load_csv(data, network.input_dim(), network.output_dim())
        .with_context(|| format!("loading {}", data.display()))?;

    let loss = metrics::mean_loss(&network, &dataset)?;
    let accuracy = metrics::accuracy(&network, &dataset)?;
    println!(
        "{} samples  loss {loss:.4}  accuracy {:.2}%",
        dataset.len(),
        accuracy * 100.0
    );
    Ok(())
}

fn run_predict(model: &Path, input: &Path, labeled: bool) -> Result<()> {
    let network = load_model(model)?;
    let text = std::fs::read_to_string(input)
        .with_context(|| format!("reading {}", input.display()))?;

    let mut seen = 0_usize;
    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let line_no = i + 1;
        let (pixels, label) = if labeled {
            let sample = parse_record(line, network.input_dim(), network.output_dim())
                .with_context(|| format!("line {line_no}"))?;
            (sample.input().as_slice().to_vec(), Some(sample.label()))
        } else {
            let pixels = parse_pixel_line(line, network.input_dim())
                .with_context(|| format!("line {line_no}"))?;
            (pixels, None)
        };

        let probs = network.predict(&pixels)?;
        let class = network.argmax(&probs)?;
        let probs_str = probs
            .iter()
            .map(|p| format!("{p:.3}"))
            .collect::<Vec<_>>()
            .join(" ");
        match label {
            Some(label) => {
                println!("line {line_no}: predicted {class}, expected {label} [{probs_str}]")
            }
            None => println!("line {line_no}: predicted {class} [{probs_str}]"),
        }
        seen += 1;
    }

    if seen == 0 {
        bail!("{} contains no samples", input.display());
    }
    Ok(())
}

fn load_model(path: &Path) -> Result<Network> {
    Network::load_json(path).with_context(|| format!("loading model {}", path.display()))
}
