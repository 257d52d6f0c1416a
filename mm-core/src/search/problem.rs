//! Component I — the search driver (`Problem` in spec.md 4.I): root
//! construction from a target theorem, the two-player `Game` state that
//! drives `crate::mcts`, loop detection, and proof extraction from a sure
//! tree. Grounded in `examples/original_source/src/search/problem.cpp` and
//! `game.cpp`.
//!
//! The teacher's `Problem` owns a `goals: (RPN, typecode) -> (env -> goal
//! data)` memo shared across every environment introduced by hypothesis
//! trimming, so a goal proven once in a weaker context is never
//! re-searched in a stronger one. This engine runs one environment per
//! search (the trimmed root context; see [`crate::oracle::trim_hypotheses`])
//! rather than a growing lattice of sub-contexts, so that cross-environment
//! memo collapses to nothing and is not reproduced here — each distinct
//! goal is still only ever represented by one tree node path, since the MCTS
//! arena itself never revisits an expanded node.

use std::collections::HashMap;
use std::rc::Rc;

use crate::config::SearchParams;
use crate::error::{MmError, MmResult};
use crate::mcts::{self, Eval, Game, NodeId, Tree};
use crate::oracle;
use crate::propctor::PropctorDb;
use crate::proofstep::{ProofStep, Rpn};
use crate::store::{AssertionId, Database, HypIndex};

use super::environ::{Environment, Environments};
use super::goal::Goal;
use super::movegen::{self, Bindings, ProofMove};

/// What one theorem search ended up deciding (spec.md 7 "Propagation":
/// `OracleLimit`/`SizeExceeded` never escape as a hard `Err`, they ride
/// along inside this instead).
#[derive(Debug, Clone)]
pub enum SearchOutcome {
    Proved(Rpn),
    Disproved,
    GaveUp(MmError),
}

/// A move in the two-player game: our move applies a theorem under a
/// substitution, their move picks which of that theorem's essential
/// hypotheses to contest next (spec.md 9's two-player framing of 4.I).
#[derive(Debug, Clone)]
pub enum Move {
    Apply(AssertionId, Bindings),
    Challenge(HypIndex),
}

/// A persistent (cheaply-shared) ancestor trail, used for the loop-detection
/// rule of spec.md 4.I ("a goal must not appear as the goal of an
/// ancestor"). Simplified relative to the teacher's full hypothesis-set
/// saturation check: we only catch a goal recurring verbatim, not a union of
/// sibling hypothesis goals collectively re-deriving an ancestor.
enum Trail {
    Nil,
    Cons(Goal, Rc<Trail>),
}

impl Trail {
    fn contains(&self, g: &Goal) -> bool {
        match self {
            Trail::Nil => false,
            Trail::Cons(h, rest) => h == g || rest.contains(g),
        }
    }
}

fn push_trail(trail: &Rc<Trail>, g: Goal) -> Rc<Trail> {
    Rc::new(Trail::Cons(g, Rc::clone(trail)))
}

/// `goal` is already known true because it is one of `env`'s assumed
/// essential hypotheses — the base case spec.md 4.I step 2 records as a
/// trivial one-step proof `[HYP(i)]` before search ever starts.
fn matching_hyp(db: &Database, env: &Environment, goal: &Goal) -> Option<HypIndex> {
    env.included.iter().copied().find(|&h| {
        let hyp = &db.get(env.assertion).hyps[h.idx()];
        !hyp.is_floating() && hyp.rpn == goal.rpn
    })
}

/// The game state `crate::mcts::Tree` steers: a goal to prove (our turn) or
/// a pending theorem application awaiting a hypothesis challenge (their
/// turn). Borrows everything it needs from the owning [`search_for_proof`]
/// call rather than owning copies, since one search never outlives the
/// `Database`/`PropctorDb`/`Environment`/`SearchParams` it was built from.
#[derive(Clone)]
pub struct Prop<'a> {
    db: &'a Database,
    propctors: &'a PropctorDb,
    env: &'a Environment,
    params: &'a SearchParams,
    goal: Goal,
    our_turn: bool,
    /// Set once `our_turn` flips to `false`: which theorem we applied and
    /// under what substitution.
    pending: Option<(AssertionId, Bindings)>,
    /// Set on an our-turn node produced by a `Challenge`: which essential
    /// hypothesis of the parent's pending theorem this subgoal discharges.
    /// Read back by [`extract_proof`] to assemble `stitch_proof`'s map.
    resolved_hyp: Option<HypIndex>,
    ancestors: Rc<Trail>,
}

impl<'a> Prop<'a> {
    fn root(db: &'a Database, propctors: &'a PropctorDb, env: &'a Environment, params: &'a SearchParams, goal: Goal) -> Self {
        Prop { db, propctors, env, params, goal, our_turn: true, pending: None, resolved_hyp: None, ancestors: Rc::new(Trail::Nil) }
    }

    fn our_moves(&self) -> Vec<Move> {
        if matching_hyp(self.db, self.env, &self.goal).is_some() {
            return Vec::new();
        }
        if self.ancestors.contains(&self.goal) {
            return Vec::new();
        }
        movegen::generate_moves(self.db, self.env, &self.goal, self.params.numberlimit)
            .into_iter()
            .filter_map(|m| match m {
                ProofMove::Thm { theorem, bindings } => Some(Move::Apply(theorem, bindings)),
                ProofMove::Defer => None,
            })
            .collect()
    }

    fn their_moves(&self) -> Vec<Move> {
        let (theorem, _) = self.pending.as_ref().expect("their-turn node always carries a pending move");
        self.db.get(*theorem).essential_hyps().map(|(h, _)| Move::Challenge(h)).collect()
    }
}

impl<'a> Game for Prop<'a> {
    type Move = Move;

    fn our_turn(&self) -> bool {
        self.our_turn
    }

    fn moves(&self, _stage: u32) -> Vec<Move> {
        if self.our_turn {
            self.our_moves()
        } else {
            self.their_moves()
        }
    }

    fn legal(&self, _mv: &Move) -> bool {
        // `our_moves`/`their_moves` already filter on DV-respecting
        // bindings and on-topic, type-matching candidates (movegen.rs); by
        // the time a Move reaches here it is always legal.
        true
    }

    fn play(&self, mv: Move) -> Self {
        match mv {
            Move::Apply(theorem, bindings) => Prop {
                db: self.db,
                propctors: self.propctors,
                env: self.env,
                params: self.params,
                goal: self.goal.clone(),
                our_turn: false,
                pending: Some((theorem, bindings)),
                resolved_hyp: None,
                ancestors: Rc::clone(&self.ancestors),
            },
            Move::Challenge(h) => {
                let (theorem, bindings) = self.pending.as_ref().expect("their-turn node always carries a pending move");
                let subgoal = movegen::hyp_subgoal(self.db, *theorem, h, bindings);
                Prop {
                    db: self.db,
                    propctors: self.propctors,
                    env: self.env,
                    params: self.params,
                    goal: subgoal,
                    our_turn: true,
                    pending: None,
                    resolved_hyp: Some(h),
                    ancestors: push_trail(&self.ancestors, self.goal.clone()),
                }
            }
        }
    }

    fn eval_leaf(&self) -> Eval {
        if self.our_turn {
            if matching_hyp(self.db, self.env, &self.goal).is_some() {
                mcts::win()
            } else if self.ancestors.contains(&self.goal) {
                log::debug!("loop detected re-deriving an ancestor goal, pruning as a loss");
                mcts::loss()
            } else if self.our_moves().is_empty() {
                mcts::loss()
            } else {
                Eval { value: 0.0, sure: false }
            }
        } else {
            let (theorem, _) = self.pending.as_ref().expect("their-turn node always carries a pending move");
            if self.db.get(*theorem).essential_hyps().next().is_none() {
                mcts::win()
            } else {
                Eval { value: 0.0, sure: false }
            }
        }
    }
}

/// Walk a sure, won tree from `node` down, reassembling the RPN proof
/// `stitch_proof` describes: recurse into whichever of our children won,
/// and for a their-turn node, require (and recurse into) every essential
/// hypothesis challenge, since minimax only calls that node a win once
/// every child is.
fn extract_proof<'a>(tree: &Tree<Prop<'a>>, node: NodeId) -> Option<Rpn> {
    let game = tree.game(node);
    if game.our_turn {
        if tree.children(node).is_empty() {
            let h = matching_hyp(game.db, game.env, &game.goal)?;
            return Some(vec![ProofStep::Hyp(h)]);
        }
        tree.children(node).iter().find(|&&c| tree.eval(c).is_win()).and_then(|&c| extract_proof(tree, c))
    } else {
        let (theorem, bindings) = game.pending.clone()?;
        let mut essential_proofs = HashMap::new();
        for &c in tree.children(node) {
            let h = tree.game(c).resolved_hyp?;
            let proof = extract_proof(tree, c)?;
            essential_proofs.insert(h, proof);
        }
        Some(movegen::stitch_proof(game.db, theorem, &bindings, &essential_proofs))
    }
}

/// Whether `eval` is at least as good as ALMOSTWIN, win included — the
/// threshold `examples/original_source/src/search/ProbImpl/refocus.cpp`'s
/// `prune`/`addranks` branch on (`value(p) < ALMOSTWIN`).
fn at_least_almost_won(eval: Eval) -> bool {
    eval.value >= 1.0 - 10.0 * mcts::EPS
}

/// Ported from `refocus.cpp`'s `prune`/`addranks`: walk every leaf of the
/// tree, demoting any that fell below ALMOSTWIN to a firm
/// [`mcts::almost_loss`] (so selection steers away from it), and folding
/// the goal size of every leaf still at or above ALMOSTWIN into the running
/// max-rank accumulator — this engine's stand-in for the teacher's
/// `SyntaxDAG`-ranks vector, since goal RPN length is the one syntactic
/// rank this move generator actually tracks (see `movegen.rs`'s module
/// doc).
fn prune_for_refocus<'a>(tree: &mut Tree<Prop<'a>>) -> usize {
    let mut maxrank = 0usize;
    let mut demoted = Vec::new();
    for i in 0..tree.len() {
        let id = NodeId(i);
        if !tree.children(id).is_empty() {
            continue;
        }
        let eval = tree.eval(id);
        if at_least_almost_won(eval) {
            maxrank = maxrank.max(tree.game(id).goal.size());
        } else {
            tree.force_eval(id, mcts::almost_loss());
            demoted.push(id);
        }
    }
    // `backprop` recomputes its starting node from scratch via `eval_leaf`,
    // which would immediately undo the forced demotion on the leaf itself;
    // start from each demoted leaf's parent instead, so only ancestors are
    // re-minimaxed.
    for id in demoted {
        if let Some(parent) = tree.parent(id) {
            tree.backprop(parent);
        }
    }
    maxrank
}

/// spec.md 4.I's rank-based prune-then-refocus pass, ported from
/// `refocus.cpp`: once the root is ALMOSTWIN, prune every sub-tree whose
/// leaves can no longer reach ALMOSTWIN, tighten the environment's
/// syntactic-rank cap to the largest rank still witnessed among the
/// leaves that remain, and resume search — `crate::search::movegen`
/// consults that tightened cap to stop proposing moves whose subgoals
/// have grown past it, which is how the narrower rank limit actually
/// takes effect on further play. The teacher's second `focus` pass
/// (re-opening leaves whose own rank exceeds the just-computed limit) has
/// nothing to do here: since the limit is this pass's own maximum over the
/// surviving leaves, none of them can exceed it by construction — a
/// consequence of collapsing the teacher's per-type rank vector down to a
/// single scalar.
fn refocus<'a>(tree: &mut Tree<Prop<'a>>, max_size: usize) {
    if tree.is_sure_root() || !tree.eval(tree.root()).is_almost_win() {
        return;
    }
    let maxrank = prune_for_refocus(tree);
    let env = tree.game(tree.root()).env;
    log::debug!("root is ALMOSTWIN, refocusing onto sub-goals of rank <= {maxrank}");
    env.maxsize.set(maxrank);
    tree.play(tree.len().saturating_add(max_size));
}

/// Root construction + search for a proof of `target`'s own conclusion
/// (spec.md 4.I steps 1-4): ask the validity oracle first (no point
/// spending tree nodes on a non-tautology), trim unused essential
/// hypotheses, then drive the two-player MCTS to a sure verdict.
pub fn search_for_proof(db: &Database, propctors: &PropctorDb, target: AssertionId, params: &SearchParams) -> MmResult<SearchOutcome> {
    let a = db.get(target);
    log::info!("searching for a proof of `{}`", a.label);

    if !oracle::is_tautology(propctors, a)? {
        log::info!("`{}` is not a tautology, search disproved", a.label);
        return Ok(SearchOutcome::Disproved);
    }

    let trimmed = oracle::trim_hypotheses(propctors, a)?.into_iter().collect();
    let mut envs = Environments::new();
    let env_id = envs.push(target, trimmed, usize::MAX, params.staged_generation);
    let env = envs.get(env_id);

    let goal = Goal::new(a.exp_rpn.clone(), a.exp_ast.clone(), a.exptypecode());
    let root = Prop::root(db, propctors, env, params, goal);
    let mut tree = Tree::new(root, params.exploration);
    tree.play(params.tree_size_cap);
    refocus(&mut tree, params.tree_size_cap);

    if !tree.is_sure_root() {
        log::info!("`{}` gave up: tree reached {} nodes without a sure verdict", a.label, tree.len());
        return Ok(SearchOutcome::GaveUp(MmError::SizeExceeded));
    }
    if tree.eval(tree.root()).is_loss() {
        log::info!("`{}` proved unreachable by search ({} nodes)", a.label, tree.len());
        return Ok(SearchOutcome::Disproved);
    }

    match extract_proof(&tree, tree.root()) {
        Some(rpn) => {
            // spec.md 6.4 / 8 scenario 2: a proof the search driver reports
            // must re-verify against the target's own statement through
            // Component D before it is ever handed back as PROVEN — the
            // two-player win condition (unification + no remaining essential
            // hypotheses) is necessary but not a substitute for the real
            // stack-discipline check.
            match crate::verify::verify(&a.label, &a.hyps, &a.dv_pairs, &rpn, db) {
                Ok(proved) if proved == a.expression => {
                    log::info!("`{}` proved in {} nodes", a.label, tree.len());
                    Ok(SearchOutcome::Proved(rpn))
                }
                Ok(proved) => {
                    log::warn!("`{}` search proof re-verified to a different statement", a.label);
                    Ok(SearchOutcome::GaveUp(MmError::Mismatch { label: a.label.clone(), proved, expected: a.expression.clone() }))
                }
                Err(err) => {
                    log::warn!("`{}` search proof failed re-verification: {err}", a.label);
                    Ok(SearchOutcome::GaveUp(err))
                }
            }
        }
        None => {
            log::warn!("`{}` tree was sure and won but proof extraction failed", a.label);
            Ok(SearchOutcome::GaveUp(MmError::OracleLimit))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proofstep::Ast;
    use crate::store::Database;

    #[test]
    fn a_goal_matching_an_assumed_hypothesis_is_an_immediate_win() {
        let mut db = Database::new();
        let wff = db.declare_const("wff").unwrap();
        let p = db.declare_var("p").unwrap();
        db.add_floating("wp", wff, p).unwrap();

        db.open_block();
        db.add_essential("h1", vec![wff, p]).unwrap();
        let thm1 = db.add_axiom("thm1", vec![wff, p]).unwrap();
        // h1 (HypIndex 1, after the floating wp at 0) asserts "p" itself;
        // the conclusion is also bare "p" — goal and hypothesis coincide.
        db.set_hyp_rpn(thm1, HypIndex(1), vec![ProofStep::Hyp(HypIndex(0))], Ast(vec![vec![]]));
        db.set_exp_rpn(thm1, vec![ProofStep::Hyp(HypIndex(0))], Ast(vec![vec![]]));
        db.close_block().unwrap();

        let a = db.get(thm1);
        let mut envs = Environments::new();
        let env_id = envs.push(thm1, a.essential_hyps().map(|(h, _)| h).collect(), usize::MAX, false);
        let env = envs.get(env_id);
        let propctors = PropctorDb::new();
        let params = SearchParams::default();
        let goal = Goal::new(a.exp_rpn.clone(), a.exp_ast.clone(), a.exptypecode());
        let root = Prop::root(&db, &propctors, env, &params, goal);
        assert!(root.eval_leaf().is_win());
    }

    /// `wi`/`ax-1` as in `movegen.rs`'s tests, plus a later theorem `thm2`
    /// stating the exact same shape as `ax-1` — the search must find the
    /// one-step proof "apply ax-1" and stitch it into a valid RPN proof.
    fn ax1_and_restatement() -> (Database, AssertionId, AssertionId) {
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
        db.set_exp_rpn(ax1, ax1_rpn.clone(), Ast(vec![vec![], vec![], vec![], vec![1, 2], vec![0, 3]]));

        // thm2: no essential hypotheses of its own, same floating vars, and
        // a conclusion pattern identical to ax-1's — provable in one move.
        let thm2 = db.add_axiom("thm2", vec![wff, lp, p, arrow, lp, q, arrow, p, rp, rp]).unwrap();
        db.set_exp_rpn(thm2, ax1_rpn, Ast(vec![vec![], vec![], vec![], vec![1, 2], vec![0, 3]]));

        (db, ax1, thm2)
    }

    #[test]
    fn restating_ax1s_own_shape_is_found_and_extracted_as_a_valid_rpn_proof() {
        let (db, ax1, thm2) = ax1_and_restatement();
        let propctors = crate::propctor::build(&db, &HashMap::new()).unwrap();
        let params = SearchParams::default();
        let outcome = search_for_proof(&db, &propctors, thm2, &params).unwrap();
        match outcome {
            SearchOutcome::Proved(rpn) => {
                assert_eq!(*rpn.last().unwrap(), ProofStep::Thm(ax1));
                assert!(rpn.iter().all(|s| matches!(s, ProofStep::Hyp(_) | ProofStep::Thm(_))));
            }
            other => panic!("expected a proof, got {other:?}"),
        }
    }
}
