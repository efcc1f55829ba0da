mod report;
mod writer;

use std::fs::{self, File};
use std::io::{stderr, BufReader};
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use hifitime::Epoch;
use rac::pipeline::Pipeline;
use rac::slask::DEFAULT_MAX_DEVIATION;
use rac::{DirSlask, Input, NoSlask, Provenance, Slask};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::writer::{Format, Options, Writer};

/// Extract housekeeping, photometer and CCD image data from RAC files.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Directory to write extracted data to. Created if it does not exist.
    ///
    /// Timeseries are written as one file per record family. CCD images are written as
    /// 16-bit binary PGM files, not PNG, named after the CCD channel and packet time.
    #[arg(short, long, value_name = "dir")]
    output: Option<PathBuf>,

    /// Print timeseries rows to stdout, prefixed with their record family.
    #[arg(long, action)]
    stdout: bool,

    /// Output format of timeseries data
    #[arg(short, long, default_value = "csv")]
    format: Format,

    /// Do not extract CCD images (PGM) or their descriptors.
    #[arg(long, action)]
    skip_images: bool,

    /// Do not extract anything but CCD images and their descriptors.
    #[arg(long, action)]
    skip_timeseries: bool,

    /// Directory to keep packet groups that are still open at the end of the input in.
    ///
    /// Running again with the files following the current ones and the same directory will
    /// complete such groups.
    #[arg(long, value_name = "dir")]
    slask: Option<PathBuf>,

    /// Maximum time in seconds between a stored packet group and the packet continuing it.
    #[arg(long, value_name = "seconds")]
    max_slask_deviation: Option<f64>,

    /// Number of threads decoding and writing images
    #[arg(long, default_value_t = 4, value_name = "n")]
    image_threads: usize,

    /// Capacity of the buffers between decode stages
    #[arg(long, default_value_t = 1000, value_name = "n")]
    buffer_size: usize,

    /// Format of the summary printed when done
    #[arg(long, default_value = "text")]
    summary: report::Format,

    /// Input RAC files, decoded in the order of the creation time of their first frame.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

fn open_inputs(paths: &[PathBuf], processing_time: Epoch) -> Result<Vec<Input>> {
    let mut inputs = Vec::with_capacity(paths.len());
    for path in paths {
        let file = File::open(path).with_context(|| format!("opening input {path:?}"))?;
        let provenance = Provenance::new(path.to_string_lossy(), processing_time);
        inputs.push(Input::new(BufReader::new(file), provenance));
    }
    Ok(inputs)
}

fn slask(cli: &Cli) -> Result<Box<dyn Slask>> {
    let Some(ref dir) = cli.slask else {
        if cli.max_slask_deviation.is_some() {
            bail!("--max-slask-deviation requires --slask");
        }
        return Ok(Box::new(NoSlask));
    };
    let max_deviation = match cli.max_slask_deviation {
        Some(secs) if secs.is_finite() && secs > 0.0 => (secs * 1e9).round() as i64,
        Some(secs) => bail!("invalid slask deviation {secs}"),
        None => DEFAULT_MAX_DEVIATION,
    };
    debug!(dir = ?dir, max_deviation, "using slask");
    Ok(Box::new(DirSlask::new(dir).with_max_deviation(max_deviation)))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(stderr)
        .with_ansi(false)
        .without_time()
        .with_env_filter(
            EnvFilter::try_from_env("RAC_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    debug!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    if cli.output.is_none() && !cli.stdout {
        bail!("nothing to do; use --output and/or --stdout");
    }
    if let Some(ref dir) = cli.output {
        fs::create_dir_all(dir).with_context(|| format!("creating output directory {dir:?}"))?;
    }

    let processing_time = Epoch::now().map_err(|err| anyhow!("reading system time: {err}"))?;
    let inputs = open_inputs(&cli.inputs, processing_time)?;
    info!("extracting {} input(s)", inputs.len());

    let mut writer = Writer::new(Options {
        output: cli.output.clone(),
        stdout: cli.stdout,
        format: cli.format.clone(),
        skip_images: cli.skip_images,
        skip_timeseries: cli.skip_timeseries,
        image_threads: cli.image_threads,
    });

    Pipeline::builder()
        .buffer_size(cli.buffer_size)
        .slask(slask(&cli)?)
        .build()
        .extract_to_sink(inputs, &mut writer)
        .context("running decode pipeline")?;

    report::print(writer.summary(), &cli.summary)?;

    let failures = writer.failures();
    if failures > 0 {
        bail!("{failures} write(s) failed");
    }
    Ok(())
}
