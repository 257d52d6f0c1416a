//! `ProofStep`, RPN and AST — the shared currency between the parser,
//! verifier, and search driver.
//!
//! `ProofStep` is expressed as an explicit sum type (spec.md 9: "replace
//! the discriminated union with raw tagged unions"); every site that
//! decodes one matches all four variants explicitly, there is no default
//! arm swallowing a case silently.

use crate::store::{AssertionId, HypIndex};

/// One step of a flat proof. `Hyp`/`Thm` are the only variants that appear
/// in an assertion's stored RPN; `Load`/`Save` arise only while expanding a
/// compressed proof during verification (spec.md 4.D).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProofStep {
    Hyp(HypIndex),
    Thm(AssertionId),
    Load(usize),
    Save,
}

/// A flat reverse-Polish proof.
pub type Rpn = Vec<ProofStep>;

/// For an RPN of length `n`, `ast[i]` lists the indices into the same RPN of
/// the immediate child roots of the step whose root is at `i`.
///
/// Invariant (spec.md 3 / 8): for every `Thm` step at `i`, `ast[i].len()`
/// equals the hypothesis count of the referenced assertion, and every
/// child index is `< i`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Ast(pub Vec<Vec<usize>>);

impl Ast {
    pub fn children_of(&self, i: usize) -> &[usize] {
        self.0.get(i).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Build the AST for an RPN by replaying the stack-depth arithmetic of the
/// verifier: each `Hyp` step pushes a leaf; each `Thm` step with `k`
/// hypotheses pops `k` stack entries (remembering which step produced each)
/// and pushes a new node whose children are exactly those `k` roots.
///
/// `hyp_count_of` returns the hypothesis count of the assertion referenced
/// by a `Thm` step; it is supplied by the caller so this module does not
/// need a `&Database` reference.
pub fn build_ast(rpn: &Rpn, hyp_count_of: impl Fn(AssertionId) -> usize) -> Ast {
    let mut stack: Vec<usize> = Vec::new();
    let mut ast = vec![Vec::new(); rpn.len()];
    for (i, step) in rpn.iter().enumerate() {
        match step {
            ProofStep::Hyp(_) => stack.push(i),
            ProofStep::Thm(a) => {
                let k = hyp_count_of(*a);
                let start = stack.len().saturating_sub(k);
                let children: Vec<usize> = stack.split_off(start);
                ast[i] = children;
                stack.push(i);
            }
            ProofStep::Load(_) | ProofStep::Save => stack.push(i),
        }
    }
    Ast(ast)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ast_roundtrips_rpn_child_order() {
        // ax-mp(ax-1(), ax-1()) : a 2-ary Thm whose children are two Hyp
        // leaves, matching RPN emission order.
        let rpn = vec![
            ProofStep::Hyp(HypIndex(0)),
            ProofStep::Hyp(HypIndex(1)),
            ProofStep::Thm(AssertionId(0)),
        ];
        let ast = build_ast(&rpn, |_| 2);
        assert_eq!(ast.children_of(2), &[0, 1]);
        assert!(ast.children_of(0).is_empty());
    }
}
