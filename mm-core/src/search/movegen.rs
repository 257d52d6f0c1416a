//! Component J — move generation: matching a stored assertion's conclusion
//! pattern against a concrete goal, instantiating any floating variable the
//! match leaves free, and stitching a finished subproof back together.
//! Grounded in `examples/original_source/src/search/movegen.cpp` (bound
//! substitution moves) and `movegen2.cpp` (free-variable moves), adapted to
//! this engine's flat `Rpn`/`Ast` representation.
//!
//! A stored assertion's `Hyp` step indexes *its own* mandatory-hypothesis
//! list, never a global table (spec.md 3). That means a ground subtree
//! copied out of a goal during unification is automatically valid RPN
//! relative to whatever assertion the goal itself is ultimately grounded
//! in — no re-indexing is needed, which is what makes `extract_subtree` /
//! `substitute_pattern` below correct without carrying extra context.
//!
//! Free-variable instantiation here draws from a pool of subterms already
//! visible in the goal, rather than the teacher's general bottom-up syntax
//! generator (`examples/original_source/src/search/gen.cpp`): enough to
//! find real propositional proofs (an antecedent can always be borrowed
//! from context) without a full grammar enumerator.

use std::collections::{HashMap, HashSet};

use crate::proofstep::{Ast, ProofStep, Rpn};
use crate::store::{AssertionId, Assertion, Database, HypIndex};

use super::environ::Environment;
use super::goal::Goal;

/// A substitution: binds a theorem's floating hypothesis to the ground
/// subtree it must equal.
pub type Bindings = HashMap<HypIndex, (Rpn, Ast)>;

#[derive(Debug, Clone)]
pub enum ProofMove {
    /// Apply `theorem` under `bindings`; the opponent then picks one of its
    /// essential hypotheses to challenge (spec.md 9's two-player framing).
    Thm { theorem: AssertionId, bindings: Bindings },
    /// No applicable theorem found this stage; give up this branch.
    Defer,
}

/// Collect the postorder traversal order of the subtree rooted at `root`.
fn postorder(ast: &Ast, root: usize, out: &mut Vec<usize>) {
    for &c in ast.children_of(root) {
        postorder(ast, c, out);
    }
    out.push(root);
}

/// Copy the subtree of `rpn`/`ast` rooted at `root` into a fresh,
/// self-contained `(Rpn, Ast)` with indices renumbered from 0.
pub fn extract_subtree(rpn: &Rpn, ast: &Ast, root: usize) -> (Rpn, Ast) {
    let mut order = Vec::new();
    postorder(ast, root, &mut order);
    let remap: HashMap<usize, usize> = order.iter().enumerate().map(|(new, &old)| (old, new)).collect();
    let new_rpn: Rpn = order.iter().map(|&old| rpn[old]).collect();
    let new_ast = Ast(order.iter().map(|&old| ast.children_of(old).iter().map(|c| remap[c]).collect()).collect());
    (new_rpn, new_ast)
}

/// Match `thm`'s pattern (rooted at `thm_idx`) against the concrete `goal`
/// subtree rooted at `goal_idx`, recording each floating hypothesis'
/// binding. Pure syntactic first-order matching: this fragment has no
/// binders, so there is nothing beyond literal structural equality plus
/// variable capture to worry about.
pub fn unify(thm_rpn: &Rpn, thm_ast: &Ast, thm_idx: usize, goal_rpn: &Rpn, goal_ast: &Ast, goal_idx: usize, bindings: &mut Bindings) -> bool {
    match thm_rpn[thm_idx] {
        ProofStep::Hyp(h) => {
            let sub = extract_subtree(goal_rpn, goal_ast, goal_idx);
            match bindings.get(&h) {
                None => {
                    bindings.insert(h, sub);
                    true
                }
                Some(existing) => existing.0 == sub.0,
            }
        }
        ProofStep::Thm(a) => {
            if goal_rpn[goal_idx] != ProofStep::Thm(a) {
                return false;
            }
            let tc = thm_ast.children_of(thm_idx);
            let gc = goal_ast.children_of(goal_idx);
            tc.len() == gc.len() && tc.iter().zip(gc).all(|(&t, &g)| unify(thm_rpn, thm_ast, t, goal_rpn, goal_ast, g, bindings))
        }
        ProofStep::Load(_) | ProofStep::Save => false,
    }
}

fn substitute(rpn: &Rpn, ast: &Ast, idx: usize, bindings: &Bindings, out_rpn: &mut Rpn, out_ast: &mut Vec<Vec<usize>>) -> usize {
    match rpn[idx] {
        ProofStep::Hyp(h) => {
            let (brpn, bast) = &bindings[&h];
            let offset = out_rpn.len();
            for (i, step) in brpn.iter().enumerate() {
                out_rpn.push(*step);
                out_ast.push(bast.children_of(i).iter().map(|c| c + offset).collect());
            }
            offset + brpn.len() - 1
        }
        ProofStep::Thm(a) => {
            let children: Vec<usize> = ast.children_of(idx).iter().map(|&c| substitute(rpn, ast, c, bindings, out_rpn, out_ast)).collect();
            out_rpn.push(ProofStep::Thm(a));
            out_ast.push(children);
            out_rpn.len() - 1
        }
        ProofStep::Load(_) | ProofStep::Save => unreachable!("stored patterns never contain Load/Save"),
    }
}

/// Materialize `pattern` (an assertion's conclusion, or one of its
/// hypotheses) under `bindings`.
pub fn instantiate(pattern_rpn: &Rpn, pattern_ast: &Ast, bindings: &Bindings) -> (Rpn, Ast) {
    let mut out_rpn = Vec::new();
    let mut out_ast = Vec::new();
    substitute(pattern_rpn, pattern_ast, pattern_rpn.len() - 1, bindings, &mut out_rpn, &mut out_ast);
    (out_rpn, Ast(out_ast))
}

/// The subgoal required to discharge `theorem`'s essential hypothesis `h`
/// once its floating variables are bound.
pub fn hyp_subgoal(db: &Database, theorem: AssertionId, h: HypIndex, bindings: &Bindings) -> Goal {
    let hyp = &db.get(theorem).hyps[h.idx()];
    let (rpn, ast) = instantiate(&hyp.rpn, &hyp.ast, bindings);
    Goal::new(rpn, ast, hyp.typecode())
}

fn root_hyps_used(rpn: &Rpn) -> HashSet<HypIndex> {
    rpn.iter().filter_map(|s| if let ProofStep::Hyp(h) = s { Some(*h) } else { None }).collect()
}

/// Does `bindings` respect `a`'s disjoint-variable requirements? A pair
/// `(x, y)` is satisfied when the ground subtrees bound to `x` and `y`
/// share no root hypothesis in common.
fn respects_dv(a: &Assertion, bindings: &Bindings) -> bool {
    for &(x, y) in &a.dv_pairs {
        let hx = a.floating_hyps().find(|(_, h)| h.floating == Some(x)).map(|(h, _)| h);
        let hy = a.floating_hyps().find(|(_, h)| h.floating == Some(y)).map(|(h, _)| h);
        if let (Some(hx), Some(hy)) = (hx, hy) {
            if let (Some((rx, _)), Some((ry, _))) = (bindings.get(&hx), bindings.get(&hy)) {
                if !root_hyps_used(rx).is_disjoint(&root_hyps_used(ry)) {
                    return false;
                }
            }
        }
    }
    true
}

/// Every distinct subtree of `goal`, used as the candidate pool for a
/// theorem's goal-unmatched floating variables (see the module doc).
fn subterm_pool(goal: &Goal) -> Vec<(Rpn, Ast)> {
    (0..goal.rpn.len()).map(|i| extract_subtree(&goal.rpn, &goal.ast, i)).collect()
}

/// Size (in ground RPN steps) of the largest subgoal `theorem` would leave
/// for the opponent to challenge under `bindings` — the figure
/// `crate::search::problem::refocus`'s rank cap (`env.maxsize`) bounds.
fn largest_subgoal_size(db: &Database, theorem: AssertionId, bindings: &Bindings) -> usize {
    db.get(theorem)
        .essential_hyps()
        .map(|(h, _)| hyp_subgoal(db, theorem, h, bindings).size())
        .max()
        .unwrap_or(0)
}

/// Enumerate every legal `Thm` move proving `goal` in `env`: for each
/// on-topic propositional assertion whose conclusion unifies with `goal`,
/// bind its still-free floating variables from the subterm pool (capped at
/// `numberlimit` choices, every free variable sharing one choice per move,
/// per the module doc's simplification), keep only DV-respecting bindings,
/// and (once `crate::search::problem::refocus` has tightened `env.maxsize`)
/// drop any move whose resulting essential-hypothesis subgoals would exceed
/// that syntactic-rank cap.
pub fn generate_moves(db: &Database, env: &Environment, goal: &Goal, numberlimit: usize) -> Vec<ProofMove> {
    let pool = subterm_pool(goal);
    let maxsize = env.maxsize.get();
    let mut moves = Vec::new();

    for idx in 0..db.assertions.len() {
        let aid = AssertionId(idx as u32);
        if !env.ontopic(aid) {
            continue;
        }
        let a = db.get(aid);
        if !a.is_propositional() || a.exptypecode() != goal.typecode {
            continue;
        }
        let mut bindings = Bindings::new();
        if !unify(&a.exp_rpn, &a.exp_ast, a.exp_rpn.len() - 1, &goal.rpn, &goal.ast, goal.root(), &mut bindings) {
            continue;
        }

        let unbound: Vec<HypIndex> = a.floating_hyps().map(|(h, _)| h).filter(|h| !bindings.contains_key(h)).collect();
        if unbound.is_empty() {
            if respects_dv(a, &bindings) && largest_subgoal_size(db, aid, &bindings) <= maxsize {
                moves.push(ProofMove::Thm { theorem: aid, bindings });
            }
            continue;
        }
        for candidate in pool.iter().take(numberlimit.max(1)) {
            let mut filled = bindings.clone();
            for &h in &unbound {
                filled.insert(h, candidate.clone());
            }
            if respects_dv(a, &filled) && largest_subgoal_size(db, aid, &filled) <= maxsize {
                moves.push(ProofMove::Thm { theorem: aid, bindings: filled });
            }
        }
    }
    moves
}

/// Stitch the RPN proof of one `Thm` move: each mandatory hypothesis's
/// subproof, in order (a floating hyp's "subproof" is just its bound
/// ground subtree; an essential hyp's subproof is whatever the opponent's
/// challenge on that hypothesis eventually proved), followed by the `Thm`
/// step itself.
pub fn stitch_proof(db: &Database, theorem: AssertionId, bindings: &Bindings, essential_proofs: &HashMap<HypIndex, Rpn>) -> Rpn {
    let a = db.get(theorem);
    let mut proof = Vec::new();
    for (i, hyp) in a.hyps.iter().enumerate() {
        let h = HypIndex(i as u32);
        if hyp.is_floating() {
            proof.extend(bindings[&h].0.iter().copied());
        } else {
            proof.extend(essential_proofs[&h].iter().copied());
        }
    }
    proof.push(ProofStep::Thm(theorem));
    proof
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Database;
    use std::collections::BTreeSet;

    fn axiom1_db() -> (Database, AssertionId, AssertionId) {
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
        (db, wi, ax1)
    }

    #[test]
    fn ax1_unifies_with_its_own_conclusion_and_rebinds_both_vars() {
        let (db, _wi, ax1) = axiom1_db();
        let a = db.get(ax1);
        let goal = Goal::new(a.exp_rpn.clone(), a.exp_ast.clone(), a.exptypecode());
        let mut bindings = Bindings::new();
        assert!(unify(&a.exp_rpn, &a.exp_ast, a.exp_rpn.len() - 1, &goal.rpn, &goal.ast, goal.root(), &mut bindings));
        assert_eq!(bindings.len(), 2);
        let (rebuilt, _) = instantiate(&a.exp_rpn, &a.exp_ast, &bindings);
        assert_eq!(rebuilt, a.exp_rpn);
    }

    #[test]
    fn generate_moves_finds_ax1_for_its_own_shape_with_no_free_variables_left() {
        let (db, _wi, ax1) = axiom1_db();
        let a = db.get(ax1);
        let goal = Goal::new(a.exp_rpn.clone(), a.exp_ast.clone(), a.exptypecode());
        // `env`'s own assertion must be numbered after `ax1` for the
        // forward-reference rule to let `ax1` itself be on-topic.
        let env = Environment {
            id: super::super::environ::EnvironId(0),
            assertion: AssertionId(ax1.0 + 1),
            included: BTreeSet::new(),
            maxsize: std::cell::Cell::new(1000),
            staged: false,
        };
        let moves = generate_moves(&db, &env, &goal, 8);
        assert!(moves.iter().any(|m| matches!(m, ProofMove::Thm { theorem, .. } if *theorem == ax1)));
    }
}
