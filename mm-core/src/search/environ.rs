//! Component I — environments: hypothesis-subset proof contexts, grounded
//! in `examples/original_source/src/search/environ.h`. Each environment
//! anchors the search to one assertion's hypothesis set (or a trimmed
//! subset of it, once `crate::oracle::trim_hypotheses` finds some are
//! unused — spec.md 4.G/I).
//!
//! The teacher's `environ.h` additionally caches a sub/super-context
//! implication lattice (`psubEnvs`/`psupEnvs`) so a goal proven in one
//! context can be reused in every weaker context without re-searching.
//! This engine covers only the propositional fragment, where that lattice
//! collapses to plain hypothesis-set inclusion; [`Environment::implies`]
//! below computes it directly rather than caching a precomputed graph.

use std::cell::Cell;
use std::collections::BTreeSet;

use crate::store::{AssertionId, HypIndex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnvironId(pub usize);

/// A context: the assertion under search plus which of its essential
/// hypotheses are assumed available.
///
/// `maxsize` is spec.md 3's "maximal syntactic-rank information used by the
/// re-focus pass": a cap (in goal RPN length) that `crate::search::movegen`
/// consults when proposing a theorem application's subgoals. It starts
/// unbounded (`usize::MAX`) and is tightened in place by
/// `crate::search::problem::refocus` once the root goes ALMOSTWIN — a
/// `Cell` because every node of the search tree holds a shared `&Environment`
/// into the same context, so refocus can only narrow it through interior
/// mutability, not a `&mut` borrow.
#[derive(Debug, Clone)]
pub struct Environment {
    pub id: EnvironId,
    pub assertion: AssertionId,
    pub included: BTreeSet<HypIndex>,
    pub maxsize: Cell<usize>,
    pub staged: bool,
}

impl Environment {
    /// Only assertions numbered strictly before the one under search are
    /// legal moves — the same forward-reference rule `Database::finalize`
    /// enforces for stored proofs (spec.md 3).
    pub fn ontopic(&self, candidate: AssertionId) -> bool {
        candidate.idx() < self.assertion.idx()
    }

    /// `self`'s hypothesis assumptions are a superset of `other`'s: a goal
    /// proven true in `other` is therefore also true in `self`.
    pub fn implies(&self, other: &Environment) -> bool {
        self.assertion == other.assertion && other.included.is_subset(&self.included)
    }
}

/// Owns every [`Environment`] created over the course of one search
/// (the root context plus any trimmed sub-contexts).
#[derive(Default)]
pub struct Environments {
    envs: Vec<Environment>,
}

impl Environments {
    pub fn new() -> Self {
        Environments::default()
    }

    pub fn push(&mut self, assertion: AssertionId, included: BTreeSet<HypIndex>, maxsize: usize, staged: bool) -> EnvironId {
        let id = EnvironId(self.envs.len());
        self.envs.push(Environment { id, assertion, included, maxsize: Cell::new(maxsize), staged });
        id
    }

    pub fn get(&self, id: EnvironId) -> &Environment {
        &self.envs[id.0]
    }
}
