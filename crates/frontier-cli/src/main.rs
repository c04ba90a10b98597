//! Command-line front-end for `frontier-core`, mirroring the split between `batsat`'s
//! solver crate and its `batsat-bin` driver: this crate depends on `frontier-core`
//! plus everything needed to make it a runnable program (`clap`, `env_logger`, `ctrlc`,
//! `cpu-time`) and none of that leaks back into the core.
//!
//! Runs one of a handful of built-in demo predicates (the core never ships a concrete
//! predicate of its own — that's an external collaborator) through either learner and
//! reports the discovered frontier plus oracle call/query counts and CPU time.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use cpu_time::ProcessTime;
use log::info;

use frontier_core::{
    GainanovSat, Interrupt, KnowledgeBase, LearnOutcome, LevelLearn, Oracle, Predicate, Sense,
    SparseSet,
};

#[cfg(feature = "sat-batsat")]
use frontier_core::{BatSatBackend, SatModel};

#[derive(Parser)]
#[command(name = "frontier", about = "Learn the monotone frontier of a built-in demo predicate")]
struct Cli {
    /// Size of the ground set {0, ..., n-1}.
    #[arg(short = 'n', long)]
    n: usize,

    /// Which built-in monotone predicate to learn.
    #[arg(long, value_enum, default_value = "weight-at-most")]
    predicate: DemoPredicate,

    /// Parameter for the chosen predicate: the weight bound for `weight-at-most`, the
    /// element index for `contains`. Ignored by `cycle-independent`.
    #[arg(long, default_value_t = 1)]
    param: usize,

    /// Optional knowledge-base state file; loaded if it already exists, saved on completion
    /// and on every interrupt.
    #[arg(long)]
    state_file: Option<PathBuf>,

    #[command(subcommand)]
    learner: Learner,
}

#[derive(Subcommand)]
enum Learner {
    /// Weight-by-weight breadth-first scan (`LevelLearn`).
    Level {
        /// Levels to scan from below (0 disables). Default: the full ground set.
        #[arg(long)]
        levels_lower: Option<usize>,
        /// Levels to scan from above (0 disables). Default: the full ground set.
        #[arg(long)]
        levels_upper: Option<usize>,
    },
    /// SAT-driven unknown-hunter (`GainanovSAT`).
    Gainanov {
        #[arg(long, value_enum, default_value = "none")]
        sense: SenseArg,
        #[arg(long)]
        save_rate: Option<usize>,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        start_level: Option<usize>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum DemoPredicate {
    WeightAtMost,
    Contains,
    CycleIndependent,
}

#[derive(Clone, Copy, ValueEnum)]
enum SenseArg {
    Min,
    Max,
    None,
}

impl From<SenseArg> for Sense {
    fn from(s: SenseArg) -> Sense {
        match s {
            SenseArg::Min => Sense::Min,
            SenseArg::Max => Sense::Max,
            SenseArg::None => Sense::None,
        }
    }
}

/// Builds the chosen demo predicate as a plain closure, independent of any metadata type
/// (`M = ()` throughout this front-end — front-ends with no use for metadata just do this).
/// `n` is the ground-set size; `cycle-independent` needs it to know where the cycle wraps.
fn build_predicate(kind: DemoPredicate, param: usize, n: usize) -> impl FnMut(&SparseSet) -> bool {
    move |v: &SparseSet| match kind {
        DemoPredicate::WeightAtMost => v.weight() <= param,
        DemoPredicate::Contains => v.contains(param as u32),
        DemoPredicate::CycleIndependent => {
            let members: Vec<u32> = v.iter().collect();
            for (idx, &a) in members.iter().enumerate() {
                for &b in &members[idx + 1..] {
                    let (lo, hi) = (a.min(b), a.max(b));
                    let wraps = lo == 0 && hi == n as u32 - 1;
                    if hi - lo == 1 || wraps {
                        return false;
                    }
                }
            }
            true
        }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let mut kb: KnowledgeBase<()> = match &cli.state_file {
        Some(path) => KnowledgeBase::with_file(cli.n, path.clone())
            .unwrap_or_else(|e| panic!("failed to load state file {}: {e}", path.display())),
        None => KnowledgeBase::new(cli.n),
    };

    let predicate = build_predicate(cli.predicate, cli.param, cli.n);
    let mut oracle: Oracle<(), _> = Oracle::new(frontier_core::FnPredicate(predicate));

    let interrupt = Interrupt::new();
    {
        let interrupt = interrupt.clone();
        ctrlc::set_handler(move || {
            info!("received interrupt signal, will save and stop at the next oracle boundary");
            interrupt.set();
        })
        .expect("failed to install Ctrl-C handler");
    }

    let start = ProcessTime::now();
    let outcome = match cli.learner {
        Learner::Level { levels_lower, levels_upper } => {
            let lower = levels_lower.unwrap_or(cli.n);
            let upper = levels_upper.unwrap_or(cli.n);
            LevelLearn::new(lower, upper).learn_with_interrupt(&mut kb, &mut oracle, Some(interrupt))
        }
        Learner::Gainanov { sense, save_rate, limit, start_level } => {
            run_gainanov(&mut kb, &mut oracle, sense.into(), save_rate, limit, start_level, interrupt)
        }
    };
    let cpu = start.elapsed();

    match outcome {
        Ok(LearnOutcome::Complete) => println!("learning complete"),
        Ok(LearnOutcome::LimitReached) => println!("iteration limit reached, frontier may be partial"),
        Err(frontier_core::Error::Interrupt) => {
            println!("interrupted; state saved");
            return;
        }
        Err(e) => {
            eprintln!("learning failed: {e}");
            std::process::exit(1);
        }
    }

    println!("lowers ({}):", kb.n_lower());
    for v in kb.iter_lower() {
        println!("  {v:?}");
    }
    println!("uppers ({}):", kb.n_upper());
    for v in kb.iter_upper() {
        println!("  {v:?}");
    }
    println!(
        "oracle: {} calls, {} queries; cpu time: {:.3}s",
        oracle.n_calls(),
        oracle.n_queries(),
        cpu.as_secs_f64()
    );
}

#[cfg(feature = "sat-batsat")]
fn run_gainanov(
    kb: &mut KnowledgeBase<()>,
    oracle: &mut Oracle<(), frontier_core::FnPredicate<impl FnMut(&SparseSet) -> bool>>,
    sense: Sense,
    save_rate: Option<usize>,
    limit: Option<usize>,
    start_level: Option<usize>,
    interrupt: Interrupt,
) -> frontier_core::Result<LearnOutcome> {
    let model: SatModel<BatSatBackend> = SatModel::new("batsat");
    let mut learner = GainanovSat::new(sense, model);
    if let Some(r) = save_rate {
        learner = learner.with_save_rate(r);
    }
    if let Some(l) = limit {
        learner = learner.with_limit(l);
    }
    if let Some(s) = start_level {
        learner = learner.with_start_level(s);
    }
    learner.learn_with_interrupt(kb, oracle, Some(interrupt))
}

#[cfg(not(feature = "sat-batsat"))]
fn run_gainanov(
    _kb: &mut KnowledgeBase<()>,
    _oracle: &mut Oracle<(), frontier_core::FnPredicate<impl FnMut(&SparseSet) -> bool>>,
    _sense: Sense,
    _save_rate: Option<usize>,
    _limit: Option<usize>,
    _start_level: Option<usize>,
    _interrupt: Interrupt,
) -> frontier_core::Result<LearnOutcome> {
    eprintln!("the gainanov learner requires the \"sat-batsat\" feature");
    std::process::exit(1);
}
