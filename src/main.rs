use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::{debug, info};
use rayon::prelude::*;
use serde::Serialize;

use alnkit::align::DEFAULT_ALLOWED_GAP_FRAC;
use alnkit::prelude::*;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "alnkit", author, version, about = "Inspect and transform sequence alignments", arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Molecular type of the input
    #[arg(short, long, global = true, value_enum, default_value_t = MolArg::Bytes)]
    moltype: MolArg,
    /// Input files processed in parallel
    #[arg(short = 't', long = "threads", global = true, default_value_t = 1)]
    threads: usize,
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Size, raggedness and variability of each input, as JSON
    Stats {
        /// FASTA files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
    /// Consensus sequence of each alignment
    Consensus {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Most frequent symbol instead of the covering ambiguity code
        #[arg(long)]
        majority: bool,
    },
    /// Drop gapped or ambiguous columns
    Filter {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Largest tolerated fraction of gapped rows per column
        #[arg(long = "max-gap-frac", default_value_t = DEFAULT_ALLOWED_GAP_FRAC)]
        max_gap_frac: f64,
        #[arg(long = "motif-length", default_value_t = 1)]
        motif_length: usize,
        /// Also drop columns holding ambiguity codes
        #[arg(long = "no-degenerates")]
        no_degenerates: bool,
        /// With --no-degenerates, keep columns that only hold gaps
        #[arg(long = "allow-gap")]
        allow_gap: bool,
    },
    /// Remove gaps; inputs may be ragged
    Degap {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
    /// Print alignments with matches to the first row shown as '.'
    Pretty {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Columns per block
        #[arg(short, long)]
        wrap: Option<usize>,
    },
    /// Symbol counts per column (or per sequence), as JSON
    Profile {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        #[arg(long = "per-seq")]
        per_seq: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum MolArg {
    Bytes,
    Dna,
    Rna,
    Protein,
}

impl From<MolArg> for MolType {
    fn from(m: MolArg) -> Self {
        match m {
            MolArg::Bytes => MolType::Bytes,
            MolArg::Dna => MolType::Dna,
            MolArg::Rna => MolType::Rna,
            MolArg::Protein => MolType::Protein,
        }
    }
}

#[derive(Serialize)]
struct Stats<'a> {
    file: &'a str,
    moltype: MolType,
    num_seqs: usize,
    seq_len: usize,
    ragged: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    variable_positions: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gapped_columns: Option<usize>,
}

/// Work done for one input file; returns the text to print.
type Task = Box<dyn Fn(&Path) -> Result<String> + Sync>;

fn setup_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);
    let moltype = MolType::from(cli.moltype);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(cli.threads.max(1))
        .build()
        .context("failed to build thread pool")?;

    let (inputs, task): (&[PathBuf], Task) = match &cli.command {
        Commands::Stats { inputs } => (inputs.as_slice(), Box::new(move |p: &Path| run_stats(p, moltype)) as Task),
        Commands::Consensus { inputs, majority } => {
            let majority = *majority;
            (inputs.as_slice(), Box::new(move |p: &Path| run_consensus(p, moltype, majority)) as Task)
        }
        Commands::Filter { inputs, max_gap_frac, motif_length, no_degenerates, allow_gap } => {
            let opt = FilterOpt {
                max_gap_frac: *max_gap_frac,
                motif_length: *motif_length,
                no_degenerates: *no_degenerates,
                allow_gap: *allow_gap,
            };
            (inputs.as_slice(), Box::new(move |p: &Path| run_filter(p, moltype, opt)) as Task)
        }
        Commands::Degap { inputs } => (inputs.as_slice(), Box::new(move |p: &Path| run_degap(p, moltype)) as Task),
        Commands::Pretty { inputs, wrap } => {
            let wrap = *wrap;
            (inputs.as_slice(), Box::new(move |p: &Path| run_pretty(p, moltype, wrap)) as Task)
        }
        Commands::Profile { inputs, per_seq } => {
            let per_seq = *per_seq;
            (inputs.as_slice(), Box::new(move |p: &Path| run_profile(p, moltype, per_seq)) as Task)
        }
    };

    info!("processing {} file(s) on {} thread(s)", inputs.len(), pool.current_num_threads());
    let outputs: Vec<String> = pool.install(|| inputs.par_iter().map(|p| task(p)).collect::<Result<_>>())?;
    for out in outputs {
        println!("{}", out);
    }
    Ok(())
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("cannot read '{}'", path.display()))
}

fn load_collection(path: &Path, moltype: MolType) -> Result<SequenceCollection> {
    let text = read_text(path)?;
    let seqs = SeqsBuilder::new()
        .moltype(moltype)
        .collection(text)
        .with_context(|| format!("cannot load sequences from '{}'", path.display()))?;
    debug!("{}: {} sequences", path.display(), seqs.num_seqs());
    Ok(seqs)
}

fn load_alignment(path: &Path, moltype: MolType) -> Result<Alignment> {
    let text = read_text(path)?;
    SeqsBuilder::new()
        .moltype(moltype)
        .array_alignment(text)
        .with_context(|| format!("'{}' is not a valid alignment", path.display()))
}

fn run_stats(path: &Path, moltype: MolType) -> Result<String> {
    let seqs = load_collection(path, moltype)?;
    let file = path.to_str().unwrap_or_default();
    let ragged = seqs.is_ragged();
    let aln = if ragged { None } else { Some(SeqsBuilder::new().array_alignment(seqs.clone())?) };
    let stats = Stats {
        file,
        moltype: seqs.moltype(),
        num_seqs: seqs.num_seqs(),
        seq_len: seqs.seq_len(),
        ragged,
        variable_positions: aln.as_ref().map(|a| a.variable_positions().len()),
        gapped_columns: aln.as_ref().map(|a| {
            let mt = a.moltype();
            a.get_position_indices(|col| col.iter().any(|&b| mt.is_gap_or_missing(b)), false).len()
        }),
    };
    Ok(serde_json::to_string(&stats)?)
}

fn run_consensus(path: &Path, moltype: MolType, majority: bool) -> Result<String> {
    let aln = load_alignment(path, moltype)?;
    let consensus = if majority {
        aln.majority_consensus()
    } else {
        aln.iupac_consensus(None)
            .with_context(|| format!("no consensus for '{}'", path.display()))?
    };
    Ok(alnkit::io::fasta::format_records([("consensus", consensus.as_bytes())]))
}

#[derive(Clone, Copy, Debug)]
struct FilterOpt {
    max_gap_frac: f64,
    motif_length: usize,
    no_degenerates: bool,
    allow_gap: bool,
}

fn run_filter(path: &Path, moltype: MolType, opt: FilterOpt) -> Result<String> {
    let aln = load_alignment(path, moltype)?;
    let aln = if opt.no_degenerates { aln.no_degenerates(opt.motif_length, opt.allow_gap)? } else { aln };
    match aln.omit_gap_pos(opt.max_gap_frac, opt.motif_length)? {
        Some(kept) => {
            info!("{}: kept {} of {} columns", path.display(), kept.num_columns(), aln.num_columns());
            Ok(kept.to_fasta())
        }
        None => anyhow::bail!("no columns of '{}' pass the gap filter", path.display()),
    }
}

fn run_degap(path: &Path, moltype: MolType) -> Result<String> {
    Ok(load_collection(path, moltype)?.degap().to_fasta())
}

fn run_pretty(path: &Path, moltype: MolType, wrap: Option<usize>) -> Result<String> {
    let aln = load_alignment(path, moltype)?;
    Ok(aln.to_pretty(None, wrap)?)
}

fn run_profile(path: &Path, moltype: MolType, per_seq: bool) -> Result<String> {
    let aln = load_alignment(path, moltype)?;
    let profile = if per_seq { aln.get_seq_freqs() } else { aln.get_pos_freqs() };
    Ok(serde_json::to_string(&profile)?)
}
