use clap::Parser;
use grpcgen::config::{GenConfig, RootSpec};
use grpcgen::pipeline::{RootOutcome, generate};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "grpcgen",
    version,
    about = "Generate TypeScript gRPC clients from schema reflection roots"
)]
struct Cli {
    /// Path to grpcgen.config.json
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reflection-root JSON file; repeatable, one output dir per root
    #[arg(short = 'u', long = "root")]
    roots: Vec<PathBuf>,

    /// Base dir of the generated code
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Render 64-bit integer scalars as strings
    #[arg(long)]
    longs_as_strings: bool,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_target(false)
        .init();
}

fn build_config(cli: &Cli) -> Result<GenConfig, grpcgen::GenError> {
    let mut config = match &cli.config {
        Some(path) => GenConfig::load(path)?,
        None => GenConfig::default(),
    };
    // CLI flags win over the config file.
    config
        .roots
        .extend(cli.roots.iter().cloned().map(RootSpec::Path));
    if let Some(dir) = &cli.dir {
        config.base_dir = dir.clone();
    }
    if cli.longs_as_strings {
        config.loader_options.longs_as_strings = true;
    }
    Ok(config)
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    match generate(&config) {
        Ok(report) => {
            for root in &report.roots {
                match &root.outcome {
                    RootOutcome::Ok { files } => {
                        println!("{}: {} files", root.name, files.len());
                    }
                    RootOutcome::Error { message } => {
                        eprintln!("{}: {}", root.name, message);
                    }
                }
            }
            if report.has_errors() {
                std::process::exit(1);
            }
            println!("Generate success in {}", report.base_dir.display());
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}
