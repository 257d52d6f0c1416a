//! Component G — the validity oracle and hypothesis trimmer.
//!
//! Grounded in `examples/original_source/src/propctor.cpp`'s
//! `hypscnf`/`cnf`/`checkpropsat`: assemble one SAT atom per floating
//! hypothesis, walk every syntax-axiom application bottom-up appending its
//! `Propctor`'s CNF and biconditionally wiring its inputs to its children's
//! atoms, assert every included essential hypothesis true, assert the
//! (negated) goal, and ask the Component E solver whether the result is
//! UNSAT — UNSAT means the goal is a propositional consequence of the
//! included hypotheses.

use std::collections::HashSet;

use crate::error::{MmError, MmResult};
use crate::proofstep::{Ast, ProofStep, Rpn};
use crate::propctor::PropctorDb;
use crate::sat::{is_satisfiable, make_lit, Clause, Cnf};
use crate::store::{Assertion, AssertionId, Database, HypIndex};

fn biconditional(cnf: &mut Cnf, a: usize, b: usize) {
    cnf.push(Clause::new(vec![make_lit(a, false), make_lit(b, true)]));
    cnf.push(Clause::new(vec![make_lit(a, true), make_lit(b, false)]));
}

/// Encode one expression's RPN bottom-up, returning the SAT atom standing
/// for its truth value. `rpn`/`ast` may be an assertion's conclusion or one
/// essential hypothesis's own expression; either way every leaf is a `Hyp`
/// step indexing a *floating* hypothesis of the owning assertion, whose SAT
/// atom is `HypIndex::idx()` (floating hyps occupy the hyp-list prefix).
fn encode_expr(cnf: &mut Cnf, propctors: &PropctorDb, rpn: &Rpn, ast: &Ast, idx: usize, label: &str) -> MmResult<usize> {
    match rpn[idx] {
        ProofStep::Hyp(h) => Ok(h.idx()),
        ProofStep::Thm(a) => {
            let ctor = propctors
                .get(&a)
                .ok_or_else(|| MmError::LogicError { label: label.to_string() })?;
            let children = ast.children_of(idx);
            if children.len() != ctor.argcount {
                return Err(MmError::LogicError { label: label.to_string() });
            }
            let mut child_atoms = Vec::with_capacity(children.len());
            for &c in children {
                child_atoms.push(encode_expr(cnf, propctors, rpn, ast, c, label)?);
            }
            let offset = cnf.append_disjoint(&ctor.cnf);
            for (pos, &atom) in child_atoms.iter().enumerate() {
                biconditional(cnf, offset + pos, atom);
            }
            Ok(offset + ctor.argcount)
        }
        ProofStep::Load(_) | ProofStep::Save => Err(MmError::LogicError { label: label.to_string() }),
    }
}

/// Assemble the CNF of `a`'s negated-goal tautology check, including only
/// the essential hypotheses whose `HypIndex` is in `include`.
fn assembled_cnf(propctors: &PropctorDb, a: &Assertion, include: &HashSet<HypIndex>) -> MmResult<Cnf> {
    let floating_count = a.floating_hyps().count();
    let mut cnf = Cnf::new(floating_count);
    for (h, hyp) in a.essential_hyps() {
        if !include.contains(&h) {
            continue;
        }
        let atom = encode_expr(&mut cnf, propctors, &hyp.rpn, &hyp.ast, hyp.rpn.len() - 1, &a.label)?;
        cnf.push(Clause::unit(make_lit(atom, true)));
    }
    let concl_atom = encode_expr(&mut cnf, propctors, &a.exp_rpn, &a.exp_ast, a.exp_rpn.len() - 1, &a.label)?;
    cnf.push(Clause::unit(make_lit(concl_atom, false)));
    Ok(cnf)
}

/// Is `a`'s conclusion a propositional consequence of its full essential
/// hypothesis list? `a` must be `PROPOSITIONAL` (spec.md 4.G).
pub fn is_tautology(propctors: &PropctorDb, a: &Assertion) -> MmResult<bool> {
    let include: HashSet<HypIndex> = a.essential_hyps().map(|(h, _)| h).collect();
    let cnf = assembled_cnf(propctors, a, &include)?;
    Ok(!is_satisfiable(&cnf))
}

/// Walk every stored `PROPOSITIONAL` assertion and confirm it is a
/// tautology over its own hypotheses (the ingest driver's end-to-end
/// integrity check, spec.md 8). Syntax axioms are `PROPOSITIONAL` by
/// definition but carry no proof obligation, so they're skipped.
pub fn check_all(db: &Database, propctors: &PropctorDb) -> MmResult<()> {
    for (idx, a) in db.assertions.iter().enumerate() {
        let id = AssertionId(idx as u32);
        if !a.is_propositional() || db.syntax_axioms.contains(&id) {
            continue;
        }
        if !is_tautology(propctors, a)? {
            return Err(MmError::LogicError { label: a.label.clone() });
        }
    }
    Ok(())
}

/// Greedily drop essential hypotheses, trying the latest-added one first,
/// keeping a hypothesis only when dropping it breaks validity (spec.md
/// 4.G). Returns the minimal surviving subset found this way — greedy, not
/// globally minimum: a different removal order can find a smaller subset.
pub fn trim_hypotheses(propctors: &PropctorDb, a: &Assertion) -> MmResult<Vec<HypIndex>> {
    let mut keep: HashSet<HypIndex> = a.essential_hyps().map(|(h, _)| h).collect();
    let ordered: Vec<HypIndex> = a.essential_hyps().map(|(h, _)| h).collect();
    for &h in ordered.iter().rev() {
        keep.remove(&h);
        let cnf = assembled_cnf(propctors, a, &keep)?;
        if is_satisfiable(&cnf) {
            // Still provable only with h back in: it was load-bearing.
            keep.insert(h);
        }
    }
    let mut result: Vec<HypIndex> = keep.into_iter().collect();
    result.sort();
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::propctor::seed_from_patterns;

    fn modus_ponens_db() -> (Database, AssertionId) {
        let mut db = Database::new();
        let wff = db.declare_const("wff").unwrap();
        let arrow = db.declare_const("->").unwrap();
        let lp = db.declare_const("(").unwrap();
        let rp = db.declare_const(")").unwrap();
        let p = db.declare_var("p").unwrap();
        let q = db.declare_var("q").unwrap();
        db.add_floating("wp", wff, p).unwrap();
        db.add_floating("wq", wff, q).unwrap();

        let wi = db.add_axiom("wi", vec![wff, lp, p, arrow, q, rp]).unwrap();
        db.set_exp_rpn(wi, vec![ProofStep::Hyp(HypIndex(0)), ProofStep::Hyp(HypIndex(1))], Ast(vec![vec![], vec![]]));

        let ax1_rpn = vec![
            ProofStep::Hyp(HypIndex(0)),
            ProofStep::Hyp(HypIndex(1)),
            ProofStep::Hyp(HypIndex(0)),
            ProofStep::Thm(wi),
            ProofStep::Thm(wi),
        ];
        let ax1 = db.add_axiom("ax-1", vec![wff, lp, p, arrow, lp, q, arrow, p, rp, rp]).unwrap();
        db.set_exp_rpn(ax1, ax1_rpn, Ast(vec![vec![], vec![], vec![], vec![1, 2], vec![0, 3]]));

        // min : p, (p -> q) |- q  (modus ponens), declared as an axiom shell
        // so its hypotheses/conclusion RPN can be set directly for the test.
        db.open_block();
        db.add_essential("min.1", vec![p]).unwrap();
        db.add_essential("min.2", vec![wff, lp, p, arrow, q, rp]).unwrap();
        let min = db.add_axiom("min", vec![wff, q]).unwrap();
        db.set_hyp_rpn(min, HypIndex(2), vec![ProofStep::Hyp(HypIndex(0))], Ast(vec![vec![]]));
        db.set_hyp_rpn(
            min,
            HypIndex(3),
            vec![ProofStep::Hyp(HypIndex(0)), ProofStep::Hyp(HypIndex(1)), ProofStep::Thm(wi)],
            Ast(vec![vec![], vec![], vec![0, 1]]),
        );
        db.set_exp_rpn(min, vec![ProofStep::Hyp(HypIndex(1))], Ast(vec![vec![]]));
        db.close_block().unwrap();

        (db, min)
    }

    #[test]
    fn modus_ponens_is_a_tautology() {
        let (db, min) = modus_ponens_db();
        let propctors = seed_from_patterns(&db);
        assert!(is_tautology(&propctors, db.get(min)).unwrap());
    }

    #[test]
    fn dropping_the_antecedent_hypothesis_breaks_validity() {
        let (db, min) = modus_ponens_db();
        let propctors = seed_from_patterns(&db);
        let a = db.get(min);
        let only_second: HashSet<HypIndex> = std::iter::once(HypIndex(3)).collect();
        let cnf = assembled_cnf(&propctors, a, &only_second).unwrap();
        assert!(is_satisfiable(&cnf), "q does not follow from `p -> q` alone");
    }

    #[test]
    fn trimming_keeps_both_hypotheses_of_modus_ponens() {
        let (db, min) = modus_ponens_db();
        let propctors = seed_from_patterns(&db);
        let kept = trim_hypotheses(&propctors, db.get(min)).unwrap();
        assert_eq!(kept, vec![HypIndex(2), HypIndex(3)]);
    }
}
