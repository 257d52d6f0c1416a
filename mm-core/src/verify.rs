//! Component D — the proof verifier.
//!
//! Executes a flat RPN on a substitution stack, and expands a compressed
//! proof's base-20/continuation byte stream into that RPN first. Mirrors
//! `examples/original_source/src/proof/verify.cpp`'s stack discipline, but
//! expressed as an explicit `Result`-returning state machine rather than
//! `goto`-driven backtracking (spec.md 9).

use std::collections::{HashMap, HashSet};

use crate::error::{MmError, MmResult};
use crate::expr::Expression;
use crate::proofstep::{ProofStep, Rpn};
use crate::store::{Assertion, Database, Hypothesis};
use crate::symbol::SymbolId;

type Substitution = HashMap<SymbolId, Expression>;

fn substitute(expr: &[SymbolId], subst: &Substitution) -> Expression {
    let mut out = Vec::with_capacity(expr.len());
    for &sym in expr {
        match subst.get(&sym) {
            Some(replacement) => out.extend_from_slice(replacement),
            None => out.push(sym),
        }
    }
    out
}

fn normalize_pair(a: SymbolId, b: SymbolId) -> (SymbolId, SymbolId) {
    if a.0 < b.0 {
        (a, b)
    } else {
        (b, a)
    }
}

/// Execute `rpn` against `hyps` (the hypotheses of the assertion being
/// proved — `ProofStep::Hyp(i)` indexes into this list) and `db` (for
/// `ProofStep::Thm` lookups). `dv_pairs` is the ambient assertion's
/// disjoint-variable set. Returns the single proved expression.
pub fn verify(label: &str, hyps: &[Hypothesis], dv_pairs: &std::collections::BTreeSet<(SymbolId, SymbolId)>, rpn: &Rpn, db: &Database) -> MmResult<Expression> {
    let mut stack: Vec<Expression> = Vec::new();
    let mut save_stack: Vec<Expression> = Vec::new();

    for (step_idx, step) in rpn.iter().enumerate() {
        match step {
            ProofStep::Hyp(h) => {
                let hyp = hyps.get(h.idx()).ok_or(MmError::StackUnderflow { label: label.to_string(), step: step_idx })?;
                stack.push(hyp.expression.clone());
            }
            ProofStep::Save => {
                let top = stack.last().cloned().ok_or(MmError::StackUnderflow { label: label.to_string(), step: step_idx })?;
                save_stack.push(top);
            }
            ProofStep::Load(i) => {
                let entry = save_stack.get(*i).cloned().ok_or(MmError::SaveIndexOut { label: label.to_string(), index: *i })?;
                stack.push(entry);
            }
            ProofStep::Thm(aid) => {
                let a = db.get(*aid);
                let k = a.hyp_count();
                if stack.len() < k {
                    return Err(MmError::StackUnderflow { label: label.to_string(), step: step_idx });
                }
                let start = stack.len() - k;
                let args: Vec<Expression> = stack.split_off(start);

                let mut subst: Substitution = HashMap::new();
                for (i, h) in a.hyps.iter().enumerate() {
                    if let Some(var) = h.floating {
                        let entry = &args[i];
                        if entry.first() != Some(&h.typecode()) {
                            return Err(MmError::UnificationFailure {
                                label: label.to_string(),
                                step: step_idx,
                                hyp: crate::store::HypIndex(i as u32),
                                expected: vec![h.typecode()],
                                found: entry.clone(),
                            });
                        }
                        subst.insert(var, entry[1..].to_vec());
                    }
                }
                for (i, h) in a.hyps.iter().enumerate() {
                    if h.floating.is_some() {
                        continue;
                    }
                    let expected = substitute(&h.expression, &subst);
                    if expected != args[i] {
                        return Err(MmError::UnificationFailure {
                            label: label.to_string(),
                            step: step_idx,
                            hyp: crate::store::HypIndex(i as u32),
                            expected,
                            found: args[i].clone(),
                        });
                    }
                }
                check_dv(label, step_idx, a, &subst, dv_pairs, db)?;

                let concl = substitute(&a.expression, &subst);
                stack.push(concl);
            }
        }
    }

    if stack.len() != 1 {
        return Err(MmError::StackUnderflow { label: label.to_string(), step: rpn.len() });
    }
    Ok(stack.pop().unwrap())
}

fn check_dv(
    label: &str,
    step_idx: usize,
    a: &Assertion,
    subst: &Substitution,
    ambient_dv: &std::collections::BTreeSet<(SymbolId, SymbolId)>,
    db: &Database,
) -> MmResult<()> {
    for &(x, y) in &a.dv_pairs {
        let sx = subst.get(&x).cloned().unwrap_or_else(|| vec![x]);
        let sy = subst.get(&y).cloned().unwrap_or_else(|| vec![y]);
        let vars_x: HashSet<SymbolId> = sx.iter().copied().filter(|s| db.symbols.is_variable(*s)).collect();
        let vars_y: HashSet<SymbolId> = sy.iter().copied().filter(|s| db.symbols.is_variable(*s)).collect();
        for &vx in &vars_x {
            for &vy in &vars_y {
                if vx == vy {
                    return Err(MmError::DisjointViolation { a: vx, b: vy });
                }
                let pair = normalize_pair(vx, vy);
                if !ambient_dv.contains(&pair) {
                    let _ = step_idx;
                    let _ = label;
                    return Err(MmError::DisjointViolation { a: pair.0, b: pair.1 });
                }
            }
        }
    }
    Ok(())
}

/// Re-verify a stored assertion's proof against its own statement (the
/// "round trip" invariant of spec.md 8: `verifier(P, A.hypotheses) ==
/// A.expression`).
pub fn verify_assertion(db: &Database, id: crate::store::AssertionId) -> MmResult<()> {
    let a = db.get(id);
    let Some(proof) = &a.proof else { return Ok(()) }; // axioms have no proof to check
    let proved = verify(&a.label, &a.hyps, &a.dv_pairs, proof, db)?;
    if proved != a.expression {
        return Err(MmError::Mismatch { label: a.label.clone(), proved, expected: a.expression.clone() });
    }
    Ok(())
}

/// A label referenced by a compressed proof's label list: either one of the
/// proving assertion's own mandatory hypotheses, or a previously-proved
/// assertion.
#[derive(Debug, Clone, Copy)]
pub enum ProofLabel {
    Hyp(crate::store::HypIndex),
    Thm(crate::store::AssertionId),
}

/// Decode a compressed proof's byte stream (spec.md 4.D) into a flat RPN.
///
/// `labels` is `L` — mandatory hypotheses (in assertion order) followed by
/// the proof's own parenthesized label list. Each decoded number `n` maps
/// to `SAVE` (`n == 0`), `labels[n-1]` (`1 <= n <= labels.len()`), or
/// `LOAD(n - labels.len() - 1)` (`n > labels.len()`). A `Z` immediately
/// following a decoded number additionally emits a `SAVE` right after that
/// step (mirroring real Metamath's zero-free digit alphabet: `n == 0` can
/// never arise from the A-Z encoding itself, only from `Z`).
pub fn decode_compressed(labels: &[ProofLabel], bytes: &[u8]) -> MmResult<Rpn> {
    let mut rpn = Rpn::new();
    let mut acc: u64 = 0;
    let mut have_digits = false;
    let mut last_was_number = false;

    for (pos, &b) in bytes.iter().enumerate() {
        match b {
            b'A'..=b'T' => {
                let digit = (b - b'A' + 1) as u64;
                let n = acc * 20 + digit;
                acc = 0;
                have_digits = false;
                push_step(&mut rpn, labels, n, pos)?;
                last_was_number = true;
            }
            b'U'..=b'Y' => {
                let digit = (b - b'U' + 1) as u64;
                acc = acc * 5 + digit;
                have_digits = true;
                last_was_number = false;
            }
            b'Z' => {
                if !last_was_number {
                    return Err(MmError::EncodingError { pos });
                }
                rpn.push(ProofStep::Save);
                last_was_number = false;
            }
            _ => return Err(MmError::EncodingError { pos }),
        }
    }

    if have_digits {
        return Err(MmError::Unterminated);
    }
    Ok(rpn)
}

fn push_step(rpn: &mut Rpn, labels: &[ProofLabel], n: u64, pos: usize) -> MmResult<()> {
    if n == 0 {
        rpn.push(ProofStep::Save);
        return Ok(());
    }
    let n = n as usize;
    if n <= labels.len() {
        rpn.push(match labels[n - 1] {
            ProofLabel::Hyp(h) => ProofStep::Hyp(h),
            ProofLabel::Thm(a) => ProofStep::Thm(a),
        });
        return Ok(());
    }
    let load_index = n
        .checked_sub(labels.len() + 1)
        .ok_or(MmError::EncodingError { pos })?;
    rpn.push(ProofStep::Load(load_index));
    Ok(())
}

/// Bijective base-20 (with 5-ary continuation) encoding of a 1-based index,
/// the inverse of the terminal-digit half of [`decode_compressed`].
fn encode_number(mut n: u64) -> String {
    let mut digits = Vec::new();
    let term = (n - 1) % 20;
    n = (n - 1) / 20;
    digits.push(b'A' + term as u8);
    while n > 0 {
        let cont = (n - 1) % 5;
        n = (n - 1) / 5;
        digits.push(b'U' + cont as u8);
    }
    digits.reverse();
    String::from_utf8(digits).unwrap()
}

/// Re-encode a decoded step list against the same label list. Inverse of
/// [`decode_compressed`] on legal proofs (spec.md 8's round-trip property).
pub fn encode_compressed(labels: &[ProofLabel], rpn: &Rpn) -> MmResult<String> {
    let mut out = String::new();
    let mut i = 0;
    while i < rpn.len() {
        let n = match rpn[i] {
            ProofStep::Hyp(h) => labels
                .iter()
                .position(|l| matches!(l, ProofLabel::Hyp(x) if *x == h))
                .map(|p| p as u64 + 1)
                .ok_or(MmError::EncodingError { pos: i })?,
            ProofStep::Thm(a) => labels
                .iter()
                .position(|l| matches!(l, ProofLabel::Thm(x) if *x == a))
                .map(|p| p as u64 + 1)
                .ok_or(MmError::EncodingError { pos: i })?,
            ProofStep::Load(idx) => (labels.len() + 1 + idx) as u64,
            ProofStep::Save => {
                // A standalone Save not attached to a preceding step encodes
                // as the unreachable-by-letters n == 0, which has no glyph;
                // this only happens for a malformed input we were handed
                // directly (not one we decoded ourselves).
                return Err(MmError::EncodingError { pos: i });
            }
        };
        out.push_str(&encode_number(n));
        if rpn.get(i + 1) == Some(&ProofStep::Save) {
            out.push('Z');
            i += 1;
        }
        i += 1;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{AssertionId, HypIndex};

    #[test]
    fn compressed_proof_decodes_per_scenario_5() {
        // labels = [wp, wq, wi, ax-1]; digits "ABCDE"
        let labels = vec![
            ProofLabel::Hyp(HypIndex(0)),
            ProofLabel::Hyp(HypIndex(1)),
            ProofLabel::Hyp(HypIndex(2)),
            ProofLabel::Thm(AssertionId(0)),
        ];
        let rpn = decode_compressed(&labels, b"ABCDE").unwrap();
        assert_eq!(
            rpn,
            vec![
                ProofStep::Hyp(HypIndex(0)),
                ProofStep::Hyp(HypIndex(1)),
                ProofStep::Hyp(HypIndex(2)),
                ProofStep::Thm(AssertionId(0)),
                ProofStep::Load(0),
            ]
        );
        let reencoded = encode_compressed(&labels, &rpn).unwrap();
        assert_eq!(reencoded, "ABCDE");
    }

    #[test]
    fn stray_z_is_an_encoding_error() {
        let labels: Vec<ProofLabel> = vec![];
        let err = decode_compressed(&labels, b"Z");
        assert!(matches!(err, Err(MmError::EncodingError { pos: 0 })));
    }

    #[test]
    fn truncated_continuation_digit_is_unterminated() {
        let labels: Vec<ProofLabel> = vec![];
        let err = decode_compressed(&labels, b"U");
        assert!(matches!(err, Err(MmError::Unterminated)));
    }
}
