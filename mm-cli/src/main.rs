//! `mm-prove` — the peripheral CLI driver (spec.md 6.5): wires the
//! tokenizer, `mm_core::ingest`'s database loader, the verifier (run as
//! part of ingest), and the search driver together, and maps the first
//! failing phase to a process exit code.
//!
//! Grounded in the teacher's CLI split (a thin `main.rs` owning `clap`
//! argument parsing and `tracing-subscriber` setup, everything else living
//! in the library crate) and `core/new_solver`'s pattern of loading a TOML
//! config with a hard default fallback.

mod tokenizer;

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use mm_core::config::SearchParams;
use mm_core::error::MmError;
use mm_core::ingest::load_database;
use mm_core::metrics::{CounterMetrics, GoalOutcome, MetricsSink};
use mm_core::proof::ProofRpn;
use mm_core::search::search_for_proof;
use mm_core::search::SearchOutcome;
use mm_core::store::AssertionFlags;

/// Ingest a Metamath-style propositional database, verify every stored
/// proof, then search for an independent MCTS proof of each non-trivial
/// propositional theorem.
#[derive(Parser, Debug)]
#[command(name = "mm-prove", version, about)]
struct Args {
    /// Path to the `.mm`-style source database.
    database: PathBuf,

    /// Optional TOML file of `SearchParams` overrides; missing fields fall
    /// back to `SearchParams::default()`.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Search only these theorem labels, in the order given, instead of
    /// every qualifying propositional theorem in the database.
    #[arg(long = "target")]
    targets: Vec<String>,

    /// Print the winning proof RPN for every PROVEN target.
    #[arg(long)]
    show_proofs: bool,
}

/// Phase ordinals of spec.md 6.5's exit-code contract, in the order named
/// there: tokenizer, verifier, parser, definition check, propositional
/// check, search.
fn exit_phase(err: &MmError) -> u8 {
    match err {
        MmError::ParseError { .. } => 3,
        MmError::UnknownSymbol { .. }
        | MmError::ScopeError { .. }
        | MmError::HypothesisError { .. }
        | MmError::DisjointViolation { .. }
        | MmError::UnificationFailure { .. }
        | MmError::StackUnderflow { .. }
        | MmError::SaveIndexOut { .. }
        | MmError::EncodingError { .. }
        | MmError::Unterminated
        | MmError::Overflow
        | MmError::Mismatch { .. }
        | MmError::ForwardReference(_) => 2,
        MmError::BadDefinition { .. } => 4,
        MmError::LogicError { .. } => 5,
        MmError::OracleLimit | MmError::SizeExceeded => 6,
    }
}

fn load_search_params(path: Option<&PathBuf>) -> SearchParams {
    let Some(path) = path else { return SearchParams::default() };
    match fs::read_to_string(path) {
        Ok(text) => match toml::from_str(&text) {
            Ok(params) => params,
            Err(err) => {
                tracing::warn!(%err, path = %path.display(), "failed to parse config, using defaults");
                SearchParams::default()
            }
        },
        Err(err) => {
            tracing::warn!(%err, path = %path.display(), "failed to read config, using defaults");
            SearchParams::default()
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let source = match fs::read_to_string(&args.database) {
        Ok(s) => s,
        Err(err) => {
            tracing::error!(%err, path = %args.database.display(), "failed to read database file");
            return ExitCode::from(1);
        }
    };

    let (tokens, jcommands) = match tokenizer::tokenize(&source) {
        Ok(t) => t,
        Err(err) => {
            tracing::error!(%err, "tokenizer failed");
            return ExitCode::from(1);
        }
    };

    let metrics = CounterMetrics::default();
    let ingested = match load_database(&tokens, &jcommands, metrics) {
        Ok(i) => i,
        Err(err) => {
            tracing::error!(%err, "ingest failed");
            return ExitCode::from(exit_phase(&err));
        }
    };
    let mut metrics = ingested.metrics;
    let db = ingested.db;
    let propctors = ingested.propctors;

    tracing::info!(
        axioms = metrics.axioms_ingested,
        theorems = metrics.theorems_ingested,
        proof_steps = metrics.proof_steps_verified,
        "database ingested and verified"
    );

    let params = load_search_params(args.config.as_ref());

    let targets: Vec<mm_core::store::AssertionId> = if args.targets.is_empty() {
        (0..db.assertions.len())
            .map(|i| mm_core::store::AssertionId(i as u32))
            .filter(|&id| {
                let a = db.get(id);
                a.proof.is_some() && a.is_propositional() && !a.flags.contains(AssertionFlags::TRIVIAL)
            })
            .collect()
    } else {
        let mut ids = Vec::new();
        for label in &args.targets {
            match db.lookup_assertion(label) {
                Some(id) => ids.push(id),
                None => {
                    tracing::error!(label, "unknown target label");
                    return ExitCode::from(2);
                }
            }
        }
        ids
    };

    let mut search_failed = false;
    for &id in &targets {
        let label = db.get(id).label.clone();
        match search_for_proof(&db, &propctors, id, &params) {
            Ok(SearchOutcome::Proved(rpn)) => {
                tracing::info!(label = %label, "PROVEN");
                metrics.record_theorem_outcome(GoalOutcome::Proven);
                if args.show_proofs {
                    println!("{}:\n{}", label, ProofRpn::new(&db, &rpn));
                }
            }
            Ok(SearchOutcome::Disproved) => {
                tracing::info!(label = %label, "DISPROVED");
                metrics.record_theorem_outcome(GoalOutcome::Disproved);
            }
            Ok(SearchOutcome::GaveUp(MmError::SizeExceeded)) => {
                tracing::warn!(label = %label, "ALMOSTWIN-with-size-exceeded / UNKNOWN-with-size-exceeded");
                metrics.record_theorem_outcome(GoalOutcome::UnknownSizeExceeded);
            }
            Ok(SearchOutcome::GaveUp(other)) => {
                tracing::warn!(label = %label, %other, "search gave up");
                metrics.record_theorem_outcome(GoalOutcome::UnknownSizeExceeded);
            }
            Err(err) => {
                tracing::error!(label = %label, %err, "search driver error");
                search_failed = true;
            }
        }
    }

    match serde_json::to_string_pretty(&metrics) {
        Ok(json) => println!("{json}"),
        Err(err) => tracing::warn!(%err, "failed to serialize run statistics"),
    }

    if search_failed {
        ExitCode::from(6)
    } else {
        ExitCode::SUCCESS
    }
}
