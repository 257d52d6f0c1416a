//! End-to-end scenario 5 of spec.md §8 ("compressed proof decode"): the
//! same `wp, wq, wi, ax-1` label list and `"ABCDE"` digit string spec.md
//! gives as its worked example, now run through the full ingest pipeline
//! (parse mandatory hyps, decode the compressed proof, verify it) rather
//! than `decode_compressed` alone.

use mm_core::metrics::NoOpMetrics;

fn tok(s: &str) -> Vec<String> {
    s.split_whitespace().map(str::to_string).collect()
}

#[test]
fn a_compressed_proof_decodes_and_verifies_through_ingest() {
    let src = tok(
        "$c ( ) -> wff |- $. \
         $v p q $. \
         wp $f wff p $. \
         wq $f wff q $. \
         wi $a wff ( p -> q ) $. \
         ax-1 $a |- ( p -> ( q -> p ) ) $. \
         thm $p |- ( p -> ( q -> p ) ) $= ( wi ax-1 ) ABCDE $.",
    );

    let ingested = mm_core::ingest::load_database::<NoOpMetrics>(&src, &[], NoOpMetrics).expect("compressed proof should decode and verify");

    let thm = ingested.db.lookup_assertion("thm").expect("thm must be stored");
    let proof = ingested.db.get(thm).proof.as_ref().expect("thm should carry its decoded proof");
    assert_eq!(proof.len(), 5);
}

#[test]
fn a_stray_z_in_a_compressed_proof_is_an_encoding_error() {
    let src = tok(
        "$c ( ) -> wff |- $. \
         $v p q $. \
         wp $f wff p $. \
         wq $f wff q $. \
         wi $a wff ( p -> q ) $. \
         ax-1 $a |- ( p -> ( q -> p ) ) $. \
         thm $p |- ( p -> ( q -> p ) ) $= ( wi ax-1 ) ZABCDE $.",
    );

    let err = mm_core::ingest::load_database::<NoOpMetrics>(&src, &[], NoOpMetrics);
    assert!(matches!(err, Err(mm_core::MmError::EncodingError { .. })));
}
