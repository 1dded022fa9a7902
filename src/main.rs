use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use klamp::detect::{self, DetectOpt};
use klamp::index::kmer::{Stride, DEFAULT_KMER_SIZE};
use klamp::io::fasta::DEFAULT_REFERENCE_NAME;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "klamp", author, version, about = "Viral genome detection from LAMP nanopore reads", arg_required_else_help = true)]
struct Cli {
    /// FASTA file containing the viral genome
    #[arg(short, long)]
    reference: PathBuf,
    /// Record to use when the FASTA file holds several sequences
    #[arg(long = "reference-name", default_value = DEFAULT_REFERENCE_NAME)]
    reference_name: String,
    /// FASTQ file(s) containing ONT reads from LAMP amplification (.gz accepted)
    #[arg(short, long, num_args = 1.., required = true)]
    sample: Vec<PathBuf>,
    /// k-mer length after homopolymer collapsing
    #[arg(short = 'k', long = "kmer-size", default_value_t = DEFAULT_KMER_SIZE)]
    kmer_size: usize,
    /// Window stride while scoring reads: half, exhaustive, or a positive integer
    #[arg(long, default_value = "half")]
    stride: Stride,
    /// Decode Phred qualities instead of skipping them
    #[arg(long = "decode-quals")]
    decode_quals: bool,
    /// Report per-read compression ratio and hit fraction
    #[arg(short, long)]
    verbose: bool,
    #[arg(short = 't', long = "threads", default_value_t = 0)]
    threads: usize,
    /// Write a JSON summary to this path
    #[arg(long)]
    summary: Option<PathBuf>,
    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.quiet { "warn" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();

    log::info!("klamp version {}", env!("CARGO_PKG_VERSION"));

    let opt = DetectOpt {
        kmer_size: cli.kmer_size,
        stride: cli.stride,
        verbose: cli.verbose,
        decode_quals: cli.decode_quals,
        threads: cli.threads,
    };
    let summary = detect::run(&cli.reference, &cli.reference_name, &cli.sample, opt)?;

    let stdout = std::io::stdout();
    let mut out = std::io::BufWriter::new(stdout.lock());
    summary.write_text(&mut out)?;
    out.flush()?;

    if let Some(path) = &cli.summary {
        summary.save_json(path)?;
        log::info!("Summary saved to {}", path.display());
    }
    Ok(())
}
