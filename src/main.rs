//! Command-line orchestrator: build the input signal, drive the enabled
//! backends through the harness, and report timings and deviation.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use fftbench::backend::{CpuFft, Direction, TransformBackend, WgpuFft};
use fftbench::compare::max_abs_error;
use fftbench::harness::{self, BenchOutcome, BenchReport};
use fftbench::signal;

/// Benchmark and cross-validate the CPU and accelerator DFT backends.
#[derive(Debug, Parser)]
#[command(name = "fftbench", version, about)]
struct Cli {
    /// Synthetic signal length; ignored when --file is given
    #[arg(short = 'n', long = "size", default_value_t = 1 << 20)]
    size: usize,

    /// Run the inverse transform on both backends
    #[arg(long)]
    inverse: bool,

    /// Number of timed repeats per backend; the minimum is reported
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    repeats: u32,

    /// Run only the CPU backend
    #[arg(long, conflicts_with = "gpu_only")]
    cpu_only: bool,

    /// Run only the accelerator backend
    #[arg(long)]
    gpu_only: bool,

    /// Skip the cross-backend deviation check
    #[arg(long)]
    no_check: bool,

    /// Decode a stereo 16-bit PCM file instead of generating a signal
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Emit the run summary as JSON on stdout
    #[arg(long)]
    json: bool,
}

/// Which backends this run drives. One value instead of two independent
/// booleans, so "neither" is not representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BackendSelection {
    Both,
    CpuOnly,
    GpuOnly,
}

impl BackendSelection {
    fn from_flags(cpu_only: bool, gpu_only: bool) -> Self {
        match (cpu_only, gpu_only) {
            (true, _) => Self::CpuOnly,
            (_, true) => Self::GpuOnly,
            _ => Self::Both,
        }
    }

    fn cpu(self) -> bool {
        !matches!(self, Self::GpuOnly)
    }

    fn gpu(self) -> bool {
        !matches!(self, Self::CpuOnly)
    }
}

#[derive(Debug, Serialize)]
struct RunSummary<'a> {
    runs: Vec<&'a BenchReport>,
    max_abs_error: Option<f64>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    run(Cli::parse())
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let selection = BackendSelection::from_flags(cli.cpu_only, cli.gpu_only);
    let direction = if cli.inverse {
        Direction::Inverse
    } else {
        Direction::Forward
    };

    let input = match &cli.file {
        Some(path) => {
            let decoded = signal::decode_stereo_pcm(path)
                .with_context(|| format!("decoding {}", path.display()))?;
            tracing::info!(frames = decoded.frames, path = %path.display(), "decoded stereo PCM input");
            decoded.samples
        }
        None => signal::synthetic_signal(cli.size),
    };

    println!(
        "N = {} | {} | repeats = {} | modes: {}{}",
        input.len(),
        direction.label(),
        cli.repeats,
        if selection.cpu() { "CPU " } else { "" },
        if selection.gpu() { "GPU" } else { "" },
    );

    let mut cpu_report = None;
    let mut gpu_report = None;

    // Backends run strictly sequentially, never overlapped.
    if selection.cpu() {
        cpu_report = drive(&CpuFft::new(), &input, direction, cli.repeats)?;
    }
    if selection.gpu() {
        gpu_report = drive(&WgpuFft::new(), &input, direction, cli.repeats)?;
    }

    // Compare only when both backends ran and both produced output.
    let deviation = match (&cpu_report, &gpu_report) {
        (Some(cpu), Some(gpu)) if !cli.no_check => {
            let err = max_abs_error(&cpu.output, &gpu.output);
            println!("[COMPARE] max |diff| = {err:.3e}");
            Some(err)
        }
        _ => None,
    };

    if cli.json {
        let summary = RunSummary {
            runs: cpu_report.iter().chain(gpu_report.iter()).collect(),
            max_abs_error: deviation,
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    println!("Done.");
    Ok(())
}

/// Run one backend through the harness and print its report line.
///
/// Recoverable failures are reported and yield `None`; fatal ones propagate.
fn drive(
    backend: &dyn TransformBackend,
    input: &[fftbench::Complex64],
    direction: Direction,
    repeats: u32,
) -> anyhow::Result<Option<BenchReport>> {
    match harness::run(backend, input, direction, repeats)? {
        BenchOutcome::Completed(report) => {
            println!("[{}] best time = {:.3} ms", report.backend, report.best_ms);
            Ok(Some(report))
        }
        BenchOutcome::Failed {
            backend,
            diagnostic,
        } => {
            eprintln!("[{backend}] error: {diagnostic}");
            Ok(None)
        }
    }
}
