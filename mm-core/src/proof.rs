//! Human-readable proof display. The full pretty-printer (labeled steps,
//! per-statement justification, hypothesis citations formatted against
//! source comments) is `spec.md` §1's external printer and stays out of
//! scope; this gives `ProofRpn` a `Display` good enough for log and test
//! output, grounded in `core/solver/src/proof.rs`'s indented `Display` for
//! `ProofNode`.

use std::fmt;

use crate::proofstep::{build_ast, ProofStep, Rpn};
use crate::store::{AssertionId, Database};

/// A borrowed view of one finished proof: the flat RPN plus enough of the
/// database to resolve each step back to a label.
pub struct ProofRpn<'a> {
    db: &'a Database,
    rpn: &'a Rpn,
}

impl<'a> ProofRpn<'a> {
    pub fn new(db: &'a Database, rpn: &'a Rpn) -> Self {
        ProofRpn { db, rpn }
    }
}

impl<'a> fmt::Display for ProofRpn<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rpn.is_empty() {
            return write!(f, "(empty proof)");
        }
        let ast = build_ast(self.rpn, |aid| self.db.get(aid).hyp_count());
        fmt_step(f, self.db, self.rpn, &ast, self.rpn.len() - 1, 0)
    }
}

fn fmt_step(f: &mut fmt::Formatter<'_>, db: &Database, rpn: &Rpn, ast: &crate::proofstep::Ast, idx: usize, indent: usize) -> fmt::Result {
    let prefix = "  ".repeat(indent);
    match rpn[idx] {
        ProofStep::Hyp(h) => writeln!(f, "{prefix}{}", h_label(db, rpn, h)),
        ProofStep::Thm(aid) => {
            writeln!(f, "{prefix}{} (step {idx})", db.get(aid).label)?;
            for &child in ast.children_of(idx) {
                fmt_step(f, db, rpn, ast, child, indent + 1)?;
            }
            Ok(())
        }
        ProofStep::Load(n) => writeln!(f, "{prefix}LOAD {n}"),
        ProofStep::Save => writeln!(f, "{prefix}SAVE"),
    }
}

/// `h` indexes the proving assertion's own hypothesis list; `ProofRpn`
/// doesn't carry which assertion that is (a finished proof's `Hyp` leaves
/// are already fully resolved by the time a caller wants to print it), so
/// we fall back to a numeric citation when no better label is available.
fn h_label(_db: &Database, _rpn: &Rpn, h: crate::store::HypIndex) -> String {
    format!("hyp[{}]", h.idx())
}

/// Render `assertion`'s own conclusion's proof RPN, if it has one on record.
pub fn display_proof<'a>(db: &'a Database, assertion: AssertionId) -> Option<ProofRpn<'a>> {
    db.get(assertion).proof.as_ref().map(|rpn| ProofRpn::new(db, rpn))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proofstep::Ast;

    #[test]
    fn a_single_theorem_step_prints_its_label_and_children() {
        let mut db = Database::new();
        let wff = db.declare_const("wff").unwrap();
        let p = db.declare_var("p").unwrap();
        db.add_floating("wp", wff, p).unwrap();
        db.open_block();
        db.add_essential("h1", vec![wff, p]).unwrap();
        let thm = db.add_axiom("thm", vec![wff, p]).unwrap();
        db.set_hyp_rpn(thm, crate::store::HypIndex(1), vec![ProofStep::Hyp(crate::store::HypIndex(0))], Ast(vec![vec![]]));
        db.set_exp_rpn(thm, vec![ProofStep::Hyp(crate::store::HypIndex(0))], Ast(vec![vec![]]));
        db.close_block().unwrap();

        let proof = vec![
            ProofStep::Hyp(crate::store::HypIndex(0)),
            ProofStep::Hyp(crate::store::HypIndex(1)),
            ProofStep::Thm(thm),
        ];
        let rendered = ProofRpn::new(&db, &proof).to_string();
        assert!(rendered.contains("thm"));
        assert!(rendered.contains("hyp[0]"));
        assert!(rendered.contains("hyp[1]"));
    }
}
