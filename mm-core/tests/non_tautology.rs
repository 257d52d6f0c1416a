//! End-to-end scenario 4 of spec.md §8 ("non-tautology rejection"): the
//! oracle on `|- ( p -> q )` with no hypotheses must return `false`, and the
//! search driver must never report it PROVEN — it must come back
//! `Disproved` instead of burning any tree nodes on a search.

use std::collections::HashMap;

use mm_core::config::SearchParams;
use mm_core::metrics::NoOpMetrics;
use mm_core::proofstep::{Ast, ProofStep};
use mm_core::search::{search_for_proof, SearchOutcome};
use mm_core::store::{Database, HypIndex};

fn tok(s: &str) -> Vec<String> {
    s.split_whitespace().map(str::to_string).collect()
}

/// Through the full ingest pipeline: a `$a` conclusion typed `|-` is
/// `PROPOSITIONAL` exactly like a real theorem, so the ingest-time
/// integrity check (spec.md 8's "every PROPOSITIONAL assertion must be a
/// tautology") must reject a non-tautological one with `LogicError` before
/// search is ever reached.
#[test]
fn an_unprovable_implication_is_rejected_by_the_ingest_time_integrity_check() {
    let src = tok(
        "$c ( ) -> wff |- $. \
         $v p q $. \
         wp $f wff p $. \
         wq $f wff q $. \
         wi $a wff ( p -> q ) $. \
         goal $a |- ( p -> q ) $.",
    );

    let ingested = mm_core::ingest::load_database::<NoOpMetrics>(&src, &[], NoOpMetrics);
    assert!(matches!(ingested, Err(mm_core::MmError::LogicError { .. })));
}

/// Directly against the search driver (hand-built database, bypassing
/// ingest's up-front integrity check, the same way `oracle.rs`'s and
/// `movegen.rs`'s own tests build a minimal database): `search_for_proof`
/// must recognize `|- ( p -> q )` is not a tautology and answer `Disproved`
/// without ever reporting `Proved`.
#[test]
fn search_for_proof_disproves_a_non_tautology_without_expanding_a_tree() {
    let mut db = Database::new();
    let wff = db.declare_const("wff").unwrap();
    let turnstile = db.declare_const("|-").unwrap();
    let arrow = db.declare_const("->").unwrap();
    let lp = db.declare_const("(").unwrap();
    let rp = db.declare_const(")").unwrap();
    let p = db.declare_var("p").unwrap();
    let q = db.declare_var("q").unwrap();
    db.add_floating("wp", wff, p).unwrap();
    db.add_floating("wq", wff, q).unwrap();

    let wi = db.add_axiom("wi", vec![wff, lp, p, arrow, q, rp]).unwrap();
    db.set_exp_rpn(wi, vec![ProofStep::Hyp(HypIndex(0)), ProofStep::Hyp(HypIndex(1))], Ast(vec![vec![], vec![]]));

    // ax-1 is present purely so `wi`'s pattern gets witnessed as implication
    // by the seeder (spec.md 4.F); it plays no role in the goal itself.
    let ax1_rpn = vec![
        ProofStep::Hyp(HypIndex(0)),
        ProofStep::Hyp(HypIndex(1)),
        ProofStep::Hyp(HypIndex(0)),
        ProofStep::Thm(wi),
        ProofStep::Thm(wi),
    ];
    let ax1 = db.add_axiom("ax-1", vec![wff, lp, p, arrow, lp, q, arrow, p, rp, rp]).unwrap();
    db.set_exp_rpn(ax1, ax1_rpn, Ast(vec![vec![], vec![], vec![], vec![1, 2], vec![0, 3]]));

    // goal : |- ( p -> q ), no essential hypotheses — not a tautology. Its
    // typecode `|-` is never bound by any `$f`, so `is_judgment` flags it
    // `PROPOSITIONAL` the same way a real theorem's conclusion would be.
    let goal_rpn = vec![ProofStep::Hyp(HypIndex(0)), ProofStep::Hyp(HypIndex(1)), ProofStep::Thm(wi)];
    let goal = db.add_axiom("goal", vec![turnstile, lp, p, arrow, q, rp]).unwrap();
    db.set_exp_rpn(goal, goal_rpn, Ast(vec![vec![], vec![], vec![0, 1]]));

    let propctors = mm_core::propctor::build(&db, &HashMap::new()).unwrap();
    assert!(!mm_core::oracle::is_tautology(&propctors, db.get(goal)).unwrap());

    let params = SearchParams::default();
    let outcome = search_for_proof(&db, &propctors, goal, &params).unwrap();
    assert!(matches!(outcome, SearchOutcome::Disproved), "expected Disproved, got {outcome:?}");
}
