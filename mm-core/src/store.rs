//! Component B — the assertion/hypothesis store.
//!
//! The `Database` is the immutable-after-ingest fact base: every
//! hypothesis, disjoint-variable constraint, and RPN+AST of every stored
//! statement. Everything downstream (parser, verifier, SAT oracle, search
//! driver) borrows it by shared reference; nothing downstream ever mutates
//! it (spec.md 3 "Ownership summary").
//!
//! This module also plays the part of spec.md 6.2's "database reader": the
//! scope-stack bookkeeping (`$c`/`$v`/`$d`/`$f`/`$e`/`${`/`$}`) that an
//! external tokenizer/driver calls into, in the order statements appear in
//! the source. The tokenizer itself (turning bytes into these calls) is out
//! of scope (spec.md 1/6.1); what's in scope is the primitives it drives.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::dag::Dag;
use crate::error::{MmError, MmResult};
use crate::expr::Expression;
use crate::proofstep::{Ast, Rpn};
use crate::symbol::{SymbolId, SymbolTable};

/// Position of a hypothesis within *its owning assertion's* mandatory
/// hypothesis list (floating hypotheses first, essential in source order).
/// `ProofStep::Hyp` indexes into this list, never into a global table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HypIndex(pub u32);

impl HypIndex {
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

/// Dense, creation-order id of an [`Assertion`]. Doubles as the
/// 1-based "number" from spec.md 3 once you add 1 (`number()` below).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct AssertionId(pub u32);

impl AssertionId {
    pub fn idx(self) -> usize {
        self.0 as usize
    }

    pub fn number(self) -> u32 {
        self.0 + 1
    }
}

/// Assertion type bitmask (spec.md 3). The teacher's dependency set has no
/// `bitflags` crate; a `u8` mask with named constants covers the six flags
/// spec.md names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AssertionFlags(pub u8);

impl AssertionFlags {
    pub const AXIOM: AssertionFlags = AssertionFlags(1 << 0);
    pub const TRIVIAL: AssertionFlags = AssertionFlags(1 << 1);
    pub const DUPLICATE: AssertionFlags = AssertionFlags(1 << 2);
    pub const NOUSE: AssertionFlags = AssertionFlags(1 << 3);
    pub const NONEWPROOF: AssertionFlags = AssertionFlags(1 << 4);
    pub const PROPOSITIONAL: AssertionFlags = AssertionFlags(1 << 5);

    pub const fn empty() -> Self {
        AssertionFlags(0)
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }
}

impl std::ops::BitOr for AssertionFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        AssertionFlags(self.0 | rhs.0)
    }
}

/// A hypothesis: *floating* (`expression == [typecode, variable]`) or
/// *essential* (an arbitrary expression).
#[derive(Debug, Clone)]
pub struct Hypothesis {
    pub label: String,
    pub expression: Expression,
    /// `Some(variable)` for a floating hypothesis, `None` for essential.
    pub floating: Option<SymbolId>,
    pub rpn: Rpn,
    pub ast: Ast,
}

impl Hypothesis {
    pub fn is_floating(&self) -> bool {
        self.floating.is_some()
    }

    pub fn typecode(&self) -> SymbolId {
        self.expression[0]
    }
}

/// Per-variable usage bit-vector: for each mandatory hypothesis index (and
/// one extra slot for the conclusion, at the end) whether the variable
/// appears there (spec.md 3).
#[derive(Debug, Clone, Default)]
pub struct VarUsage(pub HashMap<SymbolId, Vec<bool>>);

impl VarUsage {
    pub fn appears_in(&self, var: SymbolId, slot: usize) -> bool {
        self.0.get(&var).and_then(|v| v.get(slot)).copied().unwrap_or(false)
    }
}

/// An immutable axiom or theorem.
#[derive(Debug, Clone)]
pub struct Assertion {
    pub label: String,
    pub number: u32,
    pub expression: Expression,
    /// Mandatory hypotheses: floating first (grouped by the type code of
    /// their variable), essential in source order (spec.md 4.B).
    pub hyps: Vec<Hypothesis>,
    /// Symmetric-closure-free set of unordered disjoint-variable pairs,
    /// normalized `(a, b)` with `a < b`.
    pub dv_pairs: BTreeSet<(SymbolId, SymbolId)>,
    pub usage: VarUsage,
    pub exp_rpn: Rpn,
    pub exp_ast: Ast,
    pub flags: AssertionFlags,
    /// `None` for axioms; `Some(proof)` for theorems once verified.
    pub proof: Option<Rpn>,
}

impl Assertion {
    pub fn hyp_count(&self) -> usize {
        self.hyps.len()
    }

    pub fn essential_hyps(&self) -> impl Iterator<Item = (HypIndex, &Hypothesis)> {
        self.hyps
            .iter()
            .enumerate()
            .filter(|(_, h)| !h.is_floating())
            .map(|(i, h)| (HypIndex(i as u32), h))
    }

    pub fn floating_hyps(&self) -> impl Iterator<Item = (HypIndex, &Hypothesis)> {
        self.hyps
            .iter()
            .enumerate()
            .filter(|(_, h)| h.is_floating())
            .map(|(i, h)| (HypIndex(i as u32), h))
    }

    pub fn exptypecode(&self) -> SymbolId {
        self.expression[0]
    }

    pub fn is_propositional(&self) -> bool {
        self.flags.contains(AssertionFlags::PROPOSITIONAL)
    }

    /// Variables bound by a floating hypothesis of this assertion, in
    /// mandatory-hypothesis order.
    pub fn var_order(&self) -> Vec<SymbolId> {
        self.floating_hyps().filter_map(|(_, h)| h.floating).collect()
    }
}

/// One frame of the active `${ ... $}` scope stack.
#[derive(Default)]
struct Frame {
    consts_declared: usize,
    floating_mark: usize,
    essential_mark: usize,
    dv_mark: usize,
}

/// The assertion store + scope-stack ingest driver.
#[derive(Default)]
pub struct Database {
    pub symbols: SymbolTable,
    pub assertions: Vec<Assertion>,
    pub labels: HashMap<String, Label>,
    /// Every syntax axiom (primitive-typecode conclusion, no essential
    /// hyps), in creation order — the grammar the parser (4.C) matches
    /// against.
    pub syntax_axioms: Vec<AssertionId>,
    /// Type codes known to be "primitive" (declared as the typecode of at
    /// least one `$f`).
    pub typecodes: HashSet<SymbolId>,
    /// The distinguished propositional type code, `wff`, once seen.
    pub wff_typecode: Option<SymbolId>,
    /// Dependency DAG: edge `theorem -> referenced assertion`, used to
    /// check the "only previously numbered assertions" invariant and for
    /// topological / reachability queries (spec.md 8).
    pub dag: Dag<AssertionId>,

    active_floating: Vec<(String, SymbolId, SymbolId)>, // (label, var, typecode)
    active_essential: Vec<(String, Expression)>,
    active_dv: Vec<BTreeSet<SymbolId>>,
    frames: Vec<Frame>,
}

#[derive(Debug, Clone, Copy)]
pub enum Label {
    Floating,
    Essential,
    Assertion(AssertionId),
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_block(&mut self) {
        self.frames.push(Frame {
            consts_declared: 0,
            floating_mark: self.active_floating.len(),
            essential_mark: self.active_essential.len(),
            dv_mark: self.active_dv.len(),
        });
    }

    pub fn close_block(&mut self) -> MmResult<()> {
        let frame = self
            .frames
            .pop()
            .ok_or_else(|| MmError::ScopeError { what: "$} without matching ${".into() })?;
        self.active_floating.truncate(frame.floating_mark);
        self.active_essential.truncate(frame.essential_mark);
        self.active_dv.truncate(frame.dv_mark);
        Ok(())
    }

    pub fn declare_const(&mut self, name: &str) -> MmResult<SymbolId> {
        if !self.frames.is_empty() {
            return Err(MmError::ScopeError { what: format!("$c `{name}` inside inner block") });
        }
        if self.symbols.lookup(name).is_some() {
            return Err(MmError::ScopeError { what: format!("redeclaration of `{name}`") });
        }
        Ok(self.symbols.intern_const(name))
    }

    pub fn declare_var(&mut self, name: &str) -> MmResult<SymbolId> {
        if self.symbols.lookup(name).is_some() {
            return Err(MmError::ScopeError { what: format!("redeclaration of `{name}`") });
        }
        // Real typecode gets attached at the first $f; record a placeholder
        // constant-less id now so later $f calls can bind it.
        Ok(self.symbols.intern_var(name, SymbolId::CONST))
    }

    pub fn add_disjoint(&mut self, vars: &[SymbolId]) -> MmResult<()> {
        if vars.len() < 2 {
            return Ok(());
        }
        self.active_dv.push(vars.iter().copied().collect());
        Ok(())
    }

    pub fn add_floating(&mut self, label: &str, typecode: SymbolId, var: SymbolId) -> MmResult<()> {
        if !self.typecodes_ok(typecode) {
            return Err(MmError::HypothesisError { kind: format!("`{label}`: type not a declared constant") });
        }
        if !self.symbols.is_variable(var) {
            return Err(MmError::HypothesisError { kind: format!("`{label}`: not a variable") });
        }
        if self.active_floating.iter().any(|(_, v, _)| *v == var) {
            return Err(MmError::HypothesisError { kind: format!("`{label}`: duplicate floating hyp for variable") });
        }
        if self.labels.contains_key(label) {
            return Err(MmError::ScopeError { what: format!("relabel of `{label}`") });
        }
        self.typecodes.insert(typecode);
        if self.symbols.name(typecode) == "wff" {
            self.wff_typecode = Some(typecode);
        }
        self.symbols.set_floating_typecode(var, typecode);
        self.labels.insert(label.to_string(), Label::Floating);
        self.active_floating.push((label.to_string(), var, typecode));
        Ok(())
    }

    pub fn add_essential(&mut self, label: &str, expression: Expression) -> MmResult<()> {
        if self.labels.contains_key(label) {
            return Err(MmError::ScopeError { what: format!("relabel of `{label}`") });
        }
        self.labels.insert(label.to_string(), Label::Essential);
        self.active_essential.push((label.to_string(), expression));
        Ok(())
    }

    fn typecodes_ok(&self, typecode: SymbolId) -> bool {
        !self.symbols.is_variable(typecode) && typecode != SymbolId::CONST
    }

    /// The mandatory-hypothesis list a statement with this conclusion would
    /// get if finalized right now. Exposed so the ingest driver can resolve
    /// a proof's label list (which may reference a mandatory hypothesis by
    /// label) before the assertion itself is finalized (spec.md 4.D).
    pub fn preview_mandatory_hyps(&self, expression: &Expression) -> Vec<Hypothesis> {
        self.mandatory_hyps(expression)
    }

    /// Collect the mandatory hypothesis frame for a new assertion (spec.md
    /// 4.B(i)): floating hyps whose variable is used by the conclusion or
    /// by an active essential hyp, then every active essential hyp.
    fn mandatory_hyps(&self, expression: &Expression) -> Vec<Hypothesis> {
        let mut used_vars: HashSet<SymbolId> = HashSet::new();
        for &s in expression {
            if self.symbols.is_variable(s) {
                used_vars.insert(s);
            }
        }
        for (_, exp) in &self.active_essential {
            for &s in exp {
                if self.symbols.is_variable(s) {
                    used_vars.insert(s);
                }
            }
        }

        let mut floats: Vec<(String, SymbolId, SymbolId)> = self
            .active_floating
            .iter()
            .filter(|(_, v, _)| used_vars.contains(v))
            .cloned()
            .collect();
        // Stable sort by type-code order of the variable (spec.md 3).
        floats.sort_by_key(|(_, _, tc)| tc.0);

        let mut hyps: Vec<Hypothesis> = floats
            .into_iter()
            .map(|(label, var, tc)| Hypothesis {
                label,
                expression: vec![tc, var],
                floating: Some(var),
                rpn: Vec::new(),
                ast: Ast::default(),
            })
            .collect();

        for (label, exp) in &self.active_essential {
            hyps.push(Hypothesis {
                label: label.clone(),
                expression: exp.clone(),
                floating: None,
                rpn: Vec::new(),
                ast: Ast::default(),
            });
        }

        hyps
    }

    /// Mandatory disjoint-variable pairs (spec.md 4.B(iii)): the
    /// intersection of each active DV clique with the variables actually in
    /// use, pairwise.
    fn mandatory_dv(&self, hyps: &[Hypothesis], expression: &Expression) -> BTreeSet<(SymbolId, SymbolId)> {
        let mut used_vars: HashSet<SymbolId> = HashSet::new();
        for h in hyps {
            if let Some(v) = h.floating {
                used_vars.insert(v);
            }
            for &s in &h.expression {
                if self.symbols.is_variable(s) {
                    used_vars.insert(s);
                }
            }
        }
        for &s in expression {
            if self.symbols.is_variable(s) {
                used_vars.insert(s);
            }
        }

        let mut pairs = BTreeSet::new();
        for clique in &self.active_dv {
            let restricted: Vec<SymbolId> = clique.iter().copied().filter(|v| used_vars.contains(v)).collect();
            for i in 0..restricted.len() {
                for j in (i + 1)..restricted.len() {
                    let x = restricted[i];
                    let y = restricted[j];
                    let pair = if x.0 < y.0 { (x, y) } else { (y, x) };
                    pairs.insert(pair);
                }
            }
        }
        pairs
    }

    fn var_usage(&self, hyps: &[Hypothesis], expression: &Expression) -> VarUsage {
        let slots = hyps.len() + 1;
        let mut map: HashMap<SymbolId, Vec<bool>> = HashMap::new();
        for (i, h) in hyps.iter().enumerate() {
            let vars: HashSet<SymbolId> = if let Some(v) = h.floating {
                std::iter::once(v).collect()
            } else {
                h.expression.iter().copied().filter(|s| self.symbols.is_variable(*s)).collect()
            };
            for v in vars {
                map.entry(v).or_insert_with(|| vec![false; slots])[i] = true;
            }
        }
        for &s in expression {
            if self.symbols.is_variable(s) {
                map.entry(s).or_insert_with(|| vec![false; slots])[slots - 1] = true;
            }
        }
        VarUsage(map)
    }

    /// Finalize a `$a` axiom. Returns its fresh, monotonically increasing id.
    pub fn add_axiom(&mut self, label: &str, expression: Expression) -> MmResult<AssertionId> {
        self.finalize(label, expression, AssertionFlags::AXIOM, None)
    }

    /// Finalize a `$p` theorem with its (already-expanded) proof RPN. The
    /// proof is *not* re-verified here — that is `verify::verify_assertion`'s
    /// job, called by the ingest driver right after this returns, so that a
    /// bad proof surfaces as a verifier error rather than a store error.
    pub fn add_theorem(&mut self, label: &str, expression: Expression, proof: Rpn) -> MmResult<AssertionId> {
        self.finalize(label, expression, AssertionFlags::empty(), Some(proof))
    }

    fn finalize(
        &mut self,
        label: &str,
        expression: Expression,
        mut flags: AssertionFlags,
        proof: Option<Rpn>,
    ) -> MmResult<AssertionId> {
        if self.labels.contains_key(label) {
            return Err(MmError::ScopeError { what: format!("relabel of `{label}`") });
        }
        let hyps = self.mandatory_hyps(&expression);
        let dv_pairs = self.mandatory_dv(&hyps, &expression);
        let usage = self.var_usage(&hyps, &expression);

        if hyps.is_empty() && proof.is_none() {
            flags.insert(AssertionFlags::TRIVIAL);
        }
        // PROPOSITIONAL covers two shapes (spec.md 4.F/8): a syntax-axiom
        // connective (conclusion typed `wff`, every hyp floating), or a
        // provable judgment (conclusion typed e.g. `|-`, a type never bound
        // by any `$f`) — the oracle's tautology check (spec.md 8) runs over
        // every assertion of the second shape.
        let is_connective = Some(expression[0]) == self.wff_typecode && hyps.iter().all(|h| h.is_floating());
        let is_judgment = !self.typecodes.contains(&expression[0]);
        if is_connective || is_judgment {
            flags.insert(AssertionFlags::PROPOSITIONAL);
        }

        let id = AssertionId(self.assertions.len() as u32);
        let number = id.number();

        for step in proof.iter().flatten() {
            if let crate::proofstep::ProofStep::Thm(referenced) = step {
                if referenced.0 >= id.0 {
                    return Err(MmError::ForwardReference(*referenced));
                }
                self.dag.add_edge(id, *referenced);
            }
        }
        self.dag.add_node(id);

        let assertion = Assertion {
            label: label.to_string(),
            number,
            expression,
            hyps,
            dv_pairs,
            usage,
            exp_rpn: Vec::new(),
            exp_ast: Ast::default(),
            flags,
            proof,
        };

        let is_syntax_axiom = proof.is_none()
            && assertion.essential_hyps().next().is_none()
            && self.typecodes.contains(&assertion.exptypecode());
        self.assertions.push(assertion);
        if is_syntax_axiom {
            self.syntax_axioms.push(id);
        }
        self.labels.insert(label.to_string(), Label::Assertion(id));
        Ok(id)
    }

    pub fn get(&self, id: AssertionId) -> &Assertion {
        &self.assertions[id.idx()]
    }

    pub fn lookup_assertion(&self, label: &str) -> Option<AssertionId> {
        match self.labels.get(label) {
            Some(Label::Assertion(id)) => Some(*id),
            _ => None,
        }
    }

    pub fn set_exp_rpn(&mut self, id: AssertionId, rpn: Rpn, ast: Ast) {
        let a = &mut self.assertions[id.idx()];
        a.exp_rpn = rpn;
        a.exp_ast = ast;
    }

    pub fn set_hyp_rpn(&mut self, id: AssertionId, hyp: HypIndex, rpn: Rpn, ast: Ast) {
        let h = &mut self.assertions[id.idx()].hyps[hyp.idx()];
        h.rpn = rpn;
        h.ast = ast;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Database, SymbolId, SymbolId, SymbolId, SymbolId) {
        let mut db = Database::new();
        let wff = db.declare_const("wff").unwrap();
        let arrow = db.declare_const("->").unwrap();
        let lparen = db.declare_const("(").unwrap();
        let rparen = db.declare_const(")").unwrap();
        let p = db.declare_var("p").unwrap();
        db.add_floating("wp", wff, p).unwrap();
        (db, wff, arrow, lparen, rparen)
    }

    #[test]
    fn mandatory_hyps_drop_unused_floats() {
        let (mut db, wff, _arrow, _lp, _rp) = setup();
        let q = db.declare_var("q").unwrap();
        db.add_floating("wq", wff, q).unwrap();
        // Conclusion only mentions `p`; `wq` must not be mandatory.
        let p = db.symbols.lookup("p").unwrap();
        let id = db.add_axiom("ax-test", vec![wff, p]).unwrap();
        assert_eq!(db.get(id).hyp_count(), 1);
    }

    #[test]
    fn forward_reference_is_rejected() {
        let (mut db, wff, _a, _l, _r) = setup();
        let p = db.symbols.lookup("p").unwrap();
        let future = AssertionId(5);
        let err = db.add_theorem(
            "bad",
            vec![wff, p],
            vec![crate::proofstep::ProofStep::Thm(future)],
        );
        assert!(matches!(err, Err(MmError::ForwardReference(_))));
    }

    #[test]
    fn numbering_is_monotonic() {
        let (mut db, wff, _a, _l, _r) = setup();
        let p = db.symbols.lookup("p").unwrap();
        let a = db.add_axiom("ax-a", vec![wff, p]).unwrap();
        let b = db.add_axiom("ax-b", vec![wff, p]).unwrap();
        assert!(db.get(a).number < db.get(b).number);
    }
}
