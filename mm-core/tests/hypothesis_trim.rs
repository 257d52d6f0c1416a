//! End-to-end scenario 6 of spec.md §8 ("hypothesis trimming"): a
//! theorem that restates one of its own two essential hypotheses and
//! ignores the other. `trim_hypotheses` must drop the unused hypothesis
//! and keep the load-bearing one, run over the real assertion the full
//! ingest pipeline builds (not a hand-built `Assertion`).

use mm_core::metrics::NoOpMetrics;
use mm_core::oracle::trim_hypotheses;

fn tok(s: &str) -> Vec<String> {
    s.split_whitespace().map(str::to_string).collect()
}

#[test]
fn an_unused_hypothesis_is_trimmed_and_the_other_is_kept() {
    let src = tok(
        "$c wff |- $. \
         $v p q $. \
         wp $f wff p $. \
         wq $f wff q $. \
         ${ \
         h1 $e |- p $. \
         h2 $e |- q $. \
         min $a |- p $. \
         $}",
    );

    let ingested = mm_core::ingest::load_database::<NoOpMetrics>(&src, &[], NoOpMetrics).expect("ingest should succeed");
    let min = ingested.db.lookup_assertion("min").expect("min must be stored");
    let a = ingested.db.get(min);

    assert!(mm_core::oracle::is_tautology(&ingested.propctors, a).unwrap());

    let kept = trim_hypotheses(&ingested.propctors, a).unwrap();
    let kept_labels: Vec<&str> = kept.iter().map(|&h| a.hyps[h.idx() as usize].label.as_str()).collect();
    assert_eq!(kept_labels, vec!["h1"]);
}
