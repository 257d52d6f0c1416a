//! End-to-end scenario 1 of spec.md §8 ("Axiom-1 round-trip"): a database
//! of just the constants/variables/floating-hypotheses an implication
//! needs, the `wi` syntax axiom, and `ax-1` itself. Ingest must succeed,
//! `wi` must be seeded as implication with the spec's own truth table, and
//! `|- ( p -> p )` must be reported valid by the oracle.

use mm_core::metrics::NoOpMetrics;

fn tok(s: &str) -> Vec<String> {
    s.split_whitespace().map(str::to_string).collect()
}

#[test]
fn axiom1_ingests_parses_and_validates() {
    let src = tok(
        "$c ( ) -> wff |- $. \
         $v p q $. \
         wp $f wff p $. \
         wq $f wff q $. \
         wi $a wff ( p -> q ) $. \
         ax-1 $a |- ( p -> ( q -> p ) ) $. \
         thm $a |- ( p -> p ) $.",
    );

    let ingested = mm_core::ingest::load_database::<NoOpMetrics>(&src, &[], NoOpMetrics).expect("ingest should succeed");

    let wi = ingested.db.lookup_assertion("wi").expect("wi must be stored");
    let ctor = ingested.propctors.get(&wi).expect("wi should be seeded as implication");
    assert_eq!(ctor.truthtable, vec![true, false, true, true]);

    // `( p -> p )`'s syntactic RPN: wp, wp, wi — length 3, as scenario 1
    // names.
    let ax1 = ingested.db.lookup_assertion("ax-1").unwrap();
    assert_eq!(ingested.db.get(ax1).exp_rpn.len(), 5);

    let thm = ingested.db.lookup_assertion("thm").expect("thm must be stored");
    assert!(mm_core::oracle::is_tautology(&ingested.propctors, ingested.db.get(thm)).unwrap());
}

#[test]
fn unknown_symbol_aborts_the_whole_ingest() {
    let src = tok("$c wff $. wp $a wff nosuchsymbol $.");
    let err = mm_core::ingest::load_database::<NoOpMetrics>(&src, &[], NoOpMetrics);
    assert!(matches!(err, Err(mm_core::MmError::UnknownSymbol { .. })));
}
