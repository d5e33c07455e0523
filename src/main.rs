// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! QubitOS model tool
//!
//! Builds a parameterized gate-set model from a YAML configuration (or a
//! dense text model file) and inspects it.
//!
//! # Usage
//!
//! ```bash
//! # Parameter layout of the default single-qubit model
//! qubit-os-model params
//!
//! # Outcome probabilities of rho0 -> Gx -> Gx -> Mdefault
//! qubit-os-model --config model.yaml probs rho0 Mdefault Gx Gx
//!
//! # Dense export, then re-read it TP-parameterized
//! qubit-os-model export --output model.txt
//! qubit-os-model --model model.txt --param tp params
//!
//! # Predicted and allocated parameters of a 3-qubit noise model
//! QUBITOS_NQNOISE_QUBITS=3 qubit-os-model count
//! QUBITOS_NQNOISE_QUBITS=3 qubit-os-model --nqnoise params
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use ndarray::{Array1, Array2};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use qubit_os_model::{
    io::{self, Parameterization},
    nqnoise::nqnoise_param_counts,
    validation::validate_tp_matrix,
    Config, Error, Model, ModelBuilder, Result, VERSION,
};

/// QubitOS parameterized model tool
#[derive(Parser)]
#[command(name = "qubit-os-model")]
#[command(author = "QubitOS Contributors")]
#[command(version = VERSION)]
#[command(about = "Build and inspect parameterized gate-set models")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Read the model from a dense text file instead of the configuration
    #[arg(short, long, global = true)]
    model: Option<PathBuf>,

    /// Parameterization for objects read with --model
    #[arg(long, global = true, value_enum, default_value_t = ParamArg::Full)]
    param: ParamArg,

    /// Use the generated n-qubit noise model from the `nqnoise` section
    #[arg(long, global = true, conflicts_with = "model")]
    nqnoise: bool,

    /// Log level (trace, debug, info, warn, error); overrides the configuration
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ParamArg {
    Full,
    Tp,
}

impl From<ParamArg> for Parameterization {
    fn from(p: ParamArg) -> Self {
        match p {
            ParamArg::Full => Parameterization::Full,
            ParamArg::Tp => Parameterization::Tp,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show the parameter allocation
    Params {
        /// Print the allocation as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one prep, POVM or operation
    Show {
        /// Object label
        label: String,
    },

    /// Write the model in the dense text format
    Export {
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Title comment
        #[arg(long)]
        title: Option<String>,
    },

    /// Outcome probabilities of a circuit
    Probs {
        /// Preparation label
        prep: String,

        /// POVM label
        povm: String,

        /// Operation labels, applied left to right
        ops: Vec<String>,
    },

    /// Predicted parameter counts of the n-qubit noise model
    Count {
        /// Print the counts as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show effective configuration
    Config,

    /// Validate configuration and model
    Validate,
}

fn main() {
    if let Err(e) = run() {
        error!(error = %e, "command failed");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;
    let level = cli.log_level.as_deref().unwrap_or(&config.logging.level);
    init_logging(level, &config.logging.format);

    match cli.command {
        Commands::Config => {
            println!("{}", serde_yaml::to_string(&config)?);
        }

        Commands::Validate => {
            config.validate()?;
            let mut model = load(&cli.model, cli.param, cli.nqnoise, &config)?;
            validate_model(&mut model)?;
            println!("Configuration and model are valid");
        }

        Commands::Params { json } => {
            let mut model = load(&cli.model, cli.param, cli.nqnoise, &config)?;
            let allocation = model.allocation()?;
            if json {
                println!("{}", serde_json::to_string_pretty(allocation.entries())?);
            } else {
                println!("{:<12} {:<10} {:<10} {:>7}  indices", "label", "collection", "kind", "params");
                for entry in allocation.entries() {
                    println!(
                        "{:<12} {:<10} {:<10} {:>7}  {}",
                        entry.label,
                        entry.collection.to_string(),
                        entry.kind,
                        entry.num_params,
                        format_indices(&entry.indices)
                    );
                }
                println!("total: {}", allocation.total());
            }
        }

        Commands::Show { label } => {
            let mut model = load(&cli.model, cli.param, cli.nqnoise, &config)?;
            show(&mut model, &label)?;
        }

        Commands::Export { output, title } => {
            let model = load(&cli.model, cli.param, cli.nqnoise, &config)?;
            match output {
                Some(path) => io::save_model(&model, &path, title.as_deref())?,
                None => print!("{}", io::write_model(&model, title.as_deref())?),
            }
        }

        Commands::Count { json } => {
            config.nqnoise.validate()?;
            let (counts, total) = nqnoise_param_counts(&config.nqnoise)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&counts)?);
            } else {
                for (label, n) in &counts {
                    println!("{:<12} {:>7}", label, n);
                }
                println!("total: {}", total);
            }
        }

        Commands::Probs { prep, povm, ops } => {
            let model = load(&cli.model, cli.param, cli.nqnoise, &config)?;
            let probs = model.probabilities(&prep, &povm, &ops)?;
            for (outcome, p) in &probs {
                println!("{}: {:.8}", outcome, p);
            }
        }
    }

    Ok(())
}

/// Initialize logging with tracing.
fn init_logging(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    if format == "json" {
        registry
            .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

fn load(
    model_file: &Option<PathBuf>,
    param: ParamArg,
    nqnoise: bool,
    config: &Config,
) -> Result<Model> {
    let model = match model_file {
        Some(path) => {
            info!(path = %path.display(), "reading model file");
            io::load_model(path, param.into())?
        }
        None if nqnoise => ModelBuilder::nqnoise(&config.nqnoise)?,
        None => ModelBuilder::new(&config.model).build()?,
    };
    debug!(
        preps = model.prep_labels().len(),
        povms = model.povm_labels().len(),
        operations = model.operation_labels().len(),
        "model loaded"
    );
    Ok(model)
}

/// Allocation must succeed and every Lindblad generator must be positive.
/// Operations that are not trace preserving only produce a warning.
fn validate_model(model: &mut Model) -> Result<()> {
    let total = model.num_params()?;
    info!(num_params = total, "parameter allocation ok");

    for (label, op) in model.operations() {
        let op = op.read();
        op.check_positivity().map_err(|e| {
            Error::InvalidOperation(format!("operation '{}': {}", label, e))
        })?;
        let dense = op.to_dense()?;
        if let Err(e) = validate_tp_matrix(label, &dense) {
            warn!(operation = %label, error = %e, "operation is not trace preserving");
        }
    }
    Ok(())
}

fn show(model: &mut Model, label: &str) -> Result<()> {
    print!("{}", describe(model, label)?);
    Ok(())
}

/// Header line and dense values of one object.
fn describe(model: &mut Model, label: &str) -> Result<String> {
    // Composites report their parameters only once bound
    model.refresh()?;
    let mut out = String::new();
    if let Ok(prep) = model.prep(label) {
        let prep = prep.read();
        out += &format!("prep {} [{}], {} params\n", label, prep.kind(), prep.num_params());
        out += &format!("{}\n", format_vector(&prep.to_dense()?));
    } else if let Ok(povm) = model.povm(label) {
        let povm = povm.read();
        out += &format!("povm {} [{}], {} params\n", label, povm.kind(), povm.num_params());
        for (effect, v) in povm.effects_dense()? {
            out += &format!("  {}: {}\n", effect, format_vector(&v));
        }
    } else {
        let op = model.operation(label)?;
        let op = op.read();
        out += &format!("operation {} [{}], {} params\n", label, op.kind(), op.num_params());
        out += &format_matrix(&op.to_dense()?);
    }
    Ok(out)
}

fn format_vector(v: &Array1<f64>) -> String {
    v.iter()
        .map(|x| format!("{:>11.6}", x))
        .collect::<Vec<_>>()
        .join(" ")
}

fn format_matrix(m: &Array2<f64>) -> String {
    m.rows()
        .into_iter()
        .map(|row| format!("{}\n", format_vector(&row.to_owned())))
        .collect()
}

/// Compress sorted runs, e.g. `0..12, 20`.
fn format_indices(indices: &[usize]) -> String {
    let mut parts = Vec::new();
    let mut i = 0;
    while i < indices.len() {
        let start = indices[i];
        let mut end = start;
        while i + 1 < indices.len() && indices[i + 1] == end + 1 {
            end += 1;
            i += 1;
        }
        parts.push(if end == start {
            start.to_string()
        } else {
            format!("{}..{}", start, end + 1)
        });
        i += 1;
    }
    parts.join(", ")
}
