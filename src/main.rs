use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use phylotree::tree::Tree as PhyloTree;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tree_set_consensus::consensus::{ConsensusConfig, MajorityConsensus};
use tree_set_consensus::distances::{rf_matrix, RfCache};
use tree_set_consensus::io::{read_trees, write_matrix_tsv, write_newick, ReadOptions};
use tree_set_consensus::snapshot::snapshots_from_trees;

/// Majority-rule consensus trees and Robinson-Foulds distance matrices
/// for sets of rooted trees.
#[derive(Parser, Debug)]
#[command(name = "tree-set-consensus", version, about = "Consensus trees and RF distances for tree sets")]
struct Cli {
    /// Quiet mode: only warnings and errors are logged
    #[arg(short = 'q', long = "quiet", global = true, default_value_t = false)]
    quiet: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the majority-rule consensus of all trees in the input
    Consensus(ConsensusArgs),
    /// Write the pairwise rooted RF distance matrix (TSV)
    Rf(RfArgs),
}

#[derive(Args, Debug)]
struct InputArgs {
    /// NEXUS (.trees) or Newick file, optionally gzipped
    #[arg(short = 'i', long = "input")]
    input: PathBuf,

    /// Burn-in by number of trees (drop first N trees)
    #[arg(short = 't', long = "burnin-trees", default_value_t = 0)]
    burnin_trees: usize,

    /// Burn-in by state (keep trees with STATE_ > value)
    #[arg(short = 's', long = "burnin-states", default_value_t = 0)]
    burnin_states: usize,

    /// Use TRANSLATE block to map taxon IDs to labels when available
    #[arg(long = "use-real-taxa", default_value_t = false)]
    use_real_taxa: bool,
}

#[derive(Args, Debug)]
struct ConsensusArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Output path for the consensus tree (Newick), `-` for stdout
    #[arg(short = 'o', long = "output", default_value = "-")]
    output: PathBuf,

    /// Keep bipartitions found in more than this fraction of trees
    #[arg(long = "threshold", default_value_t = 0.5)]
    threshold: f64,

    /// Seed for the fingerprint draws
    #[arg(long = "seed")]
    seed: Option<u64>,

    /// Fingerprint draws per construction before giving up
    #[arg(long = "max-trials", default_value_t = 64)]
    max_trials: usize,

    /// Constructions before giving up on validation
    #[arg(long = "max-constructions", default_value_t = 16)]
    max_constructions: usize,

    /// Leave support values off internal nodes
    #[arg(long = "no-support", default_value_t = false)]
    no_support: bool,
}

#[derive(Args, Debug)]
struct RfArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Output path for TSV distance matrix (`.gz` compresses, `-` for stdout)
    #[arg(short = 'o', long = "output")]
    output: PathBuf,
}

fn init_logging(quiet: bool, verbose: u8) {
    let level = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    match cli.command {
        Command::Consensus(args) => run_consensus(args),
        Command::Rf(args) => run_rf(args),
    }
}

fn load(input: &InputArgs) -> Result<(Vec<String>, Vec<PhyloTree>), ExitCode> {
    let t0 = Instant::now();
    let options = ReadOptions {
        burnin_trees: input.burnin_trees,
        burnin_states: input.burnin_states,
        use_real_taxa: input.use_real_taxa,
    };
    let named_trees = match read_trees(&input.input, options) {
        Ok(trees) if !trees.is_empty() => trees,
        Ok(_) => {
            error!("No trees parsed from {:?}.", input.input);
            return Err(ExitCode::from(2));
        }
        Err(e) => {
            error!("Failed to read {:?}: {e}", input.input);
            return Err(ExitCode::from(2));
        }
    };
    info!("Reading in trees {:.3}s", t0.elapsed().as_secs_f64());
    Ok(named_trees.into_iter().unzip())
}

fn run_consensus(args: ConsensusArgs) -> ExitCode {
    let (_names, trees) = match load(&args.input) {
        Ok(loaded) => loaded,
        Err(code) => return code,
    };

    let t1 = Instant::now();
    let (taxa, snaps) = match snapshots_from_trees(&trees) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to build snapshots: {e}");
            return ExitCode::from(3);
        }
    };
    info!("Read in {} taxons for {} trees {:.3}s", taxa.len(), snaps.len(), t1.elapsed().as_secs_f64());

    let config = ConsensusConfig {
        threshold: args.threshold,
        max_trials: args.max_trials,
        max_constructions: args.max_constructions,
        seed: args.seed,
        ..ConsensusConfig::default()
    };

    let t2 = Instant::now();
    let report = match MajorityConsensus::new(config).and_then(|mut c| c.build(&snaps)) {
        Ok(r) => r,
        Err(e) => {
            error!("Consensus failed: {e}");
            return ExitCode::from(3);
        }
    };
    info!(
        "Building consensus {:.3}s ({} trials, {} constructions)",
        t2.elapsed().as_secs_f64(),
        report.trials,
        report.constructions
    );

    let newick = match report.tree.to_newick(&taxa, !args.no_support) {
        Ok(n) => n,
        Err(e) => {
            error!("Failed to render consensus tree: {e}");
            return ExitCode::from(3);
        }
    };
    write_output(&args.output, || write_newick(&args.output, &[newick]))
}

fn run_rf(args: RfArgs) -> ExitCode {
    let (names, trees) = match load(&args.input) {
        Ok(loaded) => loaded,
        Err(code) => return code,
    };

    let t1 = Instant::now();
    let snaps = match snapshots_from_trees(&trees) {
        Ok((_, snaps)) => snaps,
        Err(e) => {
            error!("Failed to build snapshots: {e}");
            return ExitCode::from(3);
        }
    };
    let cache = match RfCache::new(&snaps) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to prepare trees: {e}");
            return ExitCode::from(3);
        }
    };
    info!("Creating cluster tables {:.3}s", t1.elapsed().as_secs_f64());

    let n = names.len();
    info!("Determining distances using RF for {} combinations", n * n.saturating_sub(1) / 2);
    let t2 = Instant::now();
    let matrix = match rf_matrix(&cache, None) {
        Ok(m) => m,
        Err(e) => {
            error!("Failed to compute distances: {e}");
            return ExitCode::from(3);
        }
    };
    info!("Determining distances using RF {:.3}s", t2.elapsed().as_secs_f64());

    write_output(&args.output, || write_matrix_tsv(&args.output, &names, &matrix))
}

fn write_output<F>(output: &Path, write: F) -> ExitCode
where
    F: FnOnce() -> tree_set_consensus::Result<()>,
{
    let t = Instant::now();
    if let Err(e) = write() {
        error!("Failed to write output {output:?}: {e}");
        return ExitCode::from(4);
    }
    let secs = t.elapsed().as_secs_f64();
    if output.as_os_str() == "-" {
        info!("Writing to stdout {secs:.3}s");
    } else {
        info!("Writing to output {secs:.3}s");
    }
    ExitCode::SUCCESS
}
