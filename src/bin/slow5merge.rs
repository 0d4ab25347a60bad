use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use slow5merge::io::glob::expand_inputs;
use slow5merge::runner::{DEFAULT_BATCH_SIZE, DEFAULT_THREADS};
use slow5merge::{Compression, Encoding, ExecMode, MergeError, OutputTarget, Runner};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Merge multiple SLOW5/BLOW5 files into a single file",
    long_about = None
)]
struct Cli {
    /// Input files, directories (searched recursively) or glob patterns
    #[arg(required = true, value_name = "INPUT")]
    inputs: Vec<String>,

    /// Output format
    #[arg(long = "to", value_name = "FORMAT", default_value_t = Encoding::Binary)]
    to: Encoding,

    /// Record compression for blow5 output [default: zlib]
    #[arg(short = 'c', long = "compress", value_name = "METHOD")]
    compress: Option<Compression>,

    /// Write the merged file here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Directory for temporary part files; must be empty or absent
    #[arg(long = "tmp-prefix", value_name = "DIR")]
    tmp_prefix: Option<PathBuf>,

    /// Keep auxiliary fields; every input must then have them
    #[arg(short = 'l', long, value_name = "BOOL", default_value_t = true, action = ArgAction::Set)]
    lossless: bool,

    /// Worker threads
    #[arg(short = 't', long, value_name = "N", default_value_t = DEFAULT_THREADS)]
    threads: usize,

    /// Divide whole files among threads instead of batches of records
    #[arg(long = "parallel-files", value_name = "BOOL", default_value_t = true, action = ArgAction::Set)]
    parallel_files: bool,

    /// Records per batch when --parallel-files is false
    #[arg(short = 'K', long = "batchsize", value_name = "N", default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Save run metrics as JSON to FILE
    #[arg(long, value_name = "FILE")]
    metrics: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (-q, -qq)
    #[arg(short = 'q', long, action = ArgAction::Count)]
    quiet: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(merge) = e.downcast_ref::<MergeError>() {
                error!(kind = merge.kind(), "merge failed");
            }
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8, quiet: u8) {
    let level = if quiet > 0 {
        match quiet {
            1 => "warn",
            _ => "error",
        }
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    // Flags win over RUST_LOG only when given.
    let filter = if verbose > 0 || quiet > 0 {
        EnvFilter::new(level)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let inputs = expand_inputs(&cli.inputs)?;
    info!(files = inputs.len(), "discovered input files");

    let runner = Runner {
        mode: if cli.parallel_files {
            ExecMode::FileSharded
        } else {
            ExecMode::Batched {
                batch_size: cli.batch_size,
            }
        },
        threads: cli.threads,
        encoding: cli.to,
        compression: cli.compress,
        lossless: cli.lossless,
        output: cli.output.map_or(OutputTarget::Stdout, OutputTarget::Path),
        temp_dir: cli.tmp_prefix,
    };

    let summary = runner.run(&inputs)?;
    if !summary.skipped.is_empty() {
        info!(
            skipped = summary.skipped.len(),
            "some inputs were skipped; see warnings above"
        );
    }

    if cli.verbose > 0 {
        summary.metrics.print();
    }
    if let Some(path) = cli.metrics {
        summary
            .metrics
            .save_to_file(&path)
            .with_context(|| format!("save metrics to {}", path.display()))?;
    }
    Ok(())
}
