//! svm-machine command line interface
//!
//! Inspect models, predict sparse data files and convert models between the
//! native text format and structured container files.

use clap::{Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use log::{error, info, warn};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;
use svm_machine::persistence::ModelFile;
use svm_machine::{Result, SVMError, SupportVector, SvmFile};

const DEFAULT_GROUP: &str = "machine";

#[derive(Parser)]
#[command(name = "svm-machine")]
#[command(about = "Support Vector Machine inference on libsvm models")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Display model information
    Info(InfoArgs),
    /// Predict the samples of a data file
    Predict(PredictArgs),
    /// Convert a model between native and container formats
    Convert(ConvertArgs),
}

#[derive(Args)]
struct ModelArgs {
    /// Model file (native text, or a `.json` container)
    #[arg(short, long)]
    model: PathBuf,

    /// Container group holding the model
    #[arg(short, long, default_value = DEFAULT_GROUP)]
    group: String,
}

#[derive(Args)]
struct InfoArgs {
    #[command(flatten)]
    model: ModelArgs,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputKind {
    /// Predicted labels only
    Labels,
    /// Labels and pairwise decision values
    Scores,
    /// Labels and per-class probabilities
    Probabilities,
}

#[derive(Args)]
struct PredictArgs {
    #[command(flatten)]
    model: ModelArgs,

    /// Input data file in libsvm format
    #[arg(long)]
    data: PathBuf,

    /// Output predictions file (prints to stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// What to print next to each label
    #[arg(short, long, value_enum, default_value = "labels")]
    kind: OutputKind,
}

#[derive(Args)]
struct ConvertArgs {
    /// Source model file
    input: PathBuf,

    /// Destination model file
    output: PathBuf,

    /// Container group to read from or write to
    #[arg(short, long, default_value = DEFAULT_GROUP)]
    group: String,

    /// Comma separated values subtracted from each input feature
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    subtract: Option<Vec<f64>>,

    /// Comma separated divisors applied to each input feature
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    divide: Option<Vec<f64>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ModelFormat {
    Native,
    Container,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let result = match cli.command {
        Commands::Info(args) => info_command(args),
        Commands::Predict(args) => predict_command(args),
        Commands::Convert(args) => convert_command(args),
    };

    if let Err(e) = result {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn detect_format(path: &Path) -> ModelFormat {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => ModelFormat::Container,
        _ => ModelFormat::Native,
    }
}

fn load_machine(path: &Path, group: &str) -> Result<SupportVector> {
    info!("Loading model from: {path:?}");
    match detect_format(path) {
        ModelFormat::Native => SupportVector::from_file(path),
        ModelFormat::Container => {
            let file = ModelFile::open(path)?;
            SupportVector::from_container(&file, group)
        }
    }
}

fn info_command(args: InfoArgs) -> Result<()> {
    let machine = load_machine(&args.model.model, &args.model.group)?;
    let model = machine.model();

    println!("=== SVM Model Summary ===");
    println!("Machine Type: {}", machine.machine_type());
    println!("Kernel Type: {}", machine.kernel_type());
    let kernel = machine.kernel_type();
    if kernel.uses_degree() {
        println!("  Degree: {}", machine.polynomial_degree());
    }
    if kernel.uses_gamma() {
        println!("  Gamma: {}", machine.gamma());
    }
    if kernel.uses_coef0() {
        println!("  Coef0: {}", machine.coefficient0());
    }
    println!("Input Size: {}", machine.input_size());
    println!("Output Size: {}", machine.output_size());
    println!("Classes: {}", machine.number_of_classes());
    if let Some(labels) = machine.labels() {
        println!("  Labels: {labels:?}");
    }
    println!("Support Vectors: {}", model.total_sv());
    if let Some(nr_sv) = model.nr_sv() {
        println!("  Per Class: {nr_sv:?}");
    }
    println!("Probability Estimates: {}", machine.supports_probability());

    if machine.input_subtraction().iter().any(|&v| v != 0.0)
        || machine.input_division().iter().any(|&v| v != 1.0)
    {
        println!("\nInput Normalization:");
        println!("  Subtract: {:?}", machine.input_subtraction());
        println!("  Divide: {:?}", machine.input_division());
    }

    Ok(())
}

fn predict_command(args: PredictArgs) -> Result<()> {
    let mut machine = load_machine(&args.model.model, &args.model.group)?;

    info!("Loading prediction data from: {:?}", args.data);
    let mut data = SvmFile::open(&args.data)?;
    if data.shape() > machine.input_size() {
        warn!(
            "Data has {} features, model uses the first {}",
            data.shape(),
            machine.input_size()
        );
    }
    let (truth, mut inputs) = data.read_all()?;
    if inputs.ncols() < machine.input_size() {
        // Trailing features absent from every sample are zero
        let mut padded = ndarray::Array2::zeros((inputs.nrows(), machine.input_size()));
        padded
            .slice_mut(ndarray::s![.., ..inputs.ncols()])
            .assign(&inputs);
        inputs = padded;
    }

    let (labels, values) = match args.kind {
        OutputKind::Labels => (machine.predict_classes(inputs.view())?, None),
        OutputKind::Scores => {
            let (labels, scores) = machine.predict_classes_and_scores(inputs.view())?;
            (labels, Some(scores))
        }
        OutputKind::Probabilities => {
            let (labels, probs) = machine.predict_classes_and_probabilities(inputs.view())?;
            (labels, Some(probs))
        }
    };

    let correct = labels
        .iter()
        .zip(truth.iter())
        .filter(|(predicted, actual)| predicted == actual)
        .count();
    if !truth.is_empty() {
        info!(
            "Accuracy: {:.2}% ({}/{})",
            100.0 * correct as f64 / truth.len() as f64,
            correct,
            truth.len()
        );
    }

    let mut writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    writeln!(writer, "# Predictions for {} samples", labels.len())?;
    let columns = match args.kind {
        OutputKind::Labels => "",
        OutputKind::Scores => " scores...",
        OutputKind::Probabilities => " probabilities...",
    };
    writeln!(writer, "# Format: sample_index predicted_label{columns}")?;

    for (i, label) in labels.iter().enumerate() {
        write!(writer, "{i} {label}")?;
        if let Some(values) = &values {
            for value in values.row(i) {
                write!(writer, " {value:.6}")?;
            }
        }
        writeln!(writer)?;
    }
    writer.flush()?;

    if let Some(path) = &args.output {
        info!("Predictions saved to: {path:?}");
    }
    Ok(())
}

fn convert_command(args: ConvertArgs) -> Result<()> {
    let mut machine = load_machine(&args.input, &args.group)?;
    if let Some(subtract) = &args.subtract {
        machine.set_input_subtraction(subtract)?;
    }
    if let Some(divide) = &args.divide {
        machine.set_input_division(divide)?;
    }

    match detect_format(&args.output) {
        ModelFormat::Native => {
            if args.subtract.is_some() || args.divide.is_some() {
                return Err(SVMError::InvalidParameter(
                    "normalization can only be stored in a .json container".to_string(),
                ));
            }
            if machine.input_subtraction().iter().any(|&v| v != 0.0)
                || machine.input_division().iter().any(|&v| v != 1.0)
            {
                warn!("Native model files do not keep input normalization; it is dropped");
            }
            machine.save(&args.output)?;
        }
        ModelFormat::Container => {
            let mut file = if args.output.exists() {
                ModelFile::open(&args.output)?
            } else {
                ModelFile::create(&args.output)?
            };
            machine.save_container(&mut file, &args.group)?;
        }
    }

    info!("Model written to: {:?}", args.output);
    Ok(())
}
