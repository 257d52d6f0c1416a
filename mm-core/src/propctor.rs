//! Component F — the propositional-constructor database.
//!
//! Every propositional syntax axiom (spec.md 4.F: conclusion and every
//! hypothesis typed `wff`, every hypothesis floating) gets a truth table and
//! a CNF. Seeding is grounded in
//! `examples/original_source/src/relation.cpp`'s fixed justification
//! patterns (reflexivity/symmetry/transitivity of an equivalence, the
//! axiom-1 shape of implication, idempotence shapes of negation, projection
//! shapes of binary/ternary and/or); definition-driven discovery is
//! grounded in `examples/original_source/src/propctor.cpp`'s
//! `adddef`/`calcbool`/`propskeleton`.

use std::collections::HashMap;

use crate::error::{MmError, MmResult};
use crate::proofstep::{Ast, ProofStep, Rpn};
use crate::sat::{cnf_from_truth_table, Cnf};
use crate::store::{AssertionId, Database, HypIndex};

/// Truth table + CNF of one propositional syntax axiom.
#[derive(Debug, Clone)]
pub struct Propctor {
    pub assertion: AssertionId,
    pub truthtable: Vec<bool>,
    pub cnf: Cnf,
    pub argcount: usize,
}

impl Propctor {
    fn new(assertion: AssertionId, truthtable: Vec<bool>) -> Self {
        let argcount = truthtable.len().trailing_zeros() as usize;
        let cnf = cnf_from_truth_table(&truthtable);
        Propctor { assertion, truthtable, cnf, argcount }
    }

    /// spec.md 4.F's per-`Propctor` invariant: `truthtable(cnf)` (which
    /// itself probes `cnf ∪ {output atom positive}`, spec.md 8) must round-trip
    /// back to the table this `Propctor` was built from.
    pub fn check(&self) -> bool {
        self.truthtable.len() == 1usize << self.argcount
            && self.cnf.atom_count == self.argcount + 1
            && crate::sat::truth_table(&self.cnf, self.argcount) == self.truthtable
    }
}

/// Map: propositional syntax axiom -> its constructor data.
pub type PropctorDb = HashMap<AssertionId, Propctor>;

/// Explicit `$j`/`$t` "ctor definitions" overrides (spec.md 9's Open
/// Question: a definition must never override a seeded connective except
/// through this map).
pub type CtorOverrides = HashMap<AssertionId, Vec<bool>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotVal {
    Var(HypIndex),
    Ctor(AssertionId),
}

// Bit flags, one per justification pattern (examples/original_source
// relation.h's `Reltype`).
const REFLEXIVITY: u32 = 1 << 0;
const SYMMETRY: u32 = 1 << 1;
const TRANSITIVITY: u32 = 1 << 2;
const AX1: u32 = 1 << 3;
const ID1: u32 = 1 << 4;
const ID2: u32 = 1 << 5;
const ANL: u32 = 1 << 6;
const ANR: u32 = 1 << 7;
const ORL: u32 = 1 << 8;
const ORR: u32 = 1 << 9;
const AN1: u32 = 1 << 10;
const AN2: u32 = 1 << 11;
const AN3: u32 = 1 << 12;
const OR1: u32 = 1 << 13;
const OR2: u32 = 1 << 14;
const OR3: u32 = 1 << 15;

const EQUIVALENCE: u32 = REFLEXIVITY | SYMMETRY | TRANSITIVITY;
const ID12: u32 = ID1 | ID2;
const AND: u32 = ANL | ANR;
const OR: u32 = ORL | ORR;
const A3AN: u32 = AN1 | AN2 | AN3;
const O3OR: u32 = OR1 | OR2 | OR3;

/// One pattern: a list of "lines" (one per essential hypothesis, in source
/// order, then the conclusion). `0` in a line matches the candidate
/// connective's `Thm` step; a positive `n` matches the `n`-th pattern
/// variable, consistently across every occurrence.
type Pattern = &'static [&'static [i32]];

const PATTERNS: &[(u32, Pattern)] = &[
    (REFLEXIVITY, &[&[1, 1, 0]]),
    (SYMMETRY, &[&[1, 2, 0], &[2, 1, 0]]),
    (TRANSITIVITY, &[&[1, 2, 0], &[2, 3, 0], &[1, 3, 0]]),
    (AX1, &[&[1, 2, 1, 0, 0]]),
    (ID1, &[&[1], &[1, 0]]),
    (ID2, &[&[1], &[1, 0, 0]]),
    (ANL, &[&[1, 2, 0], &[1]]),
    (ANR, &[&[1, 2, 0], &[2]]),
    (ORL, &[&[1], &[1, 2, 0]]),
    (ORR, &[&[2], &[1, 2, 0]]),
    (AN1, &[&[1, 2, 3, 0], &[1]]),
    (AN2, &[&[1, 2, 3, 0], &[2]]),
    (AN3, &[&[1, 2, 3, 0], &[3]]),
    (OR1, &[&[1], &[1, 2, 3, 0]]),
    (OR2, &[&[2], &[1, 2, 3, 0]]),
    (OR3, &[&[3], &[1, 2, 3, 0]]),
];

fn match_line(rpn: &Rpn, pattern_line: &[i32], subst: &mut HashMap<i32, SlotVal>) -> bool {
    if rpn.len() != pattern_line.len() {
        return false;
    }
    for (step, &slot) in rpn.iter().zip(pattern_line) {
        let val = match (step, slot) {
            (ProofStep::Hyp(h), s) if s != 0 => SlotVal::Var(*h),
            (ProofStep::Thm(a), 0) => SlotVal::Ctor(*a),
            _ => return false,
        };
        match subst.get(&slot) {
            None => {
                if subst.values().any(|&v| v == val) {
                    return false; // this step already bound to a different slot
                }
                subst.insert(slot, val);
            }
            Some(&existing) if existing != val => return false,
            Some(_) => {}
        }
    }
    true
}

/// If `a`'s essential hypotheses + conclusion match `pattern`, return the
/// connective bound to slot 0.
fn match_pattern(a: &crate::store::Assertion, pattern: Pattern) -> Option<AssertionId> {
    let hyp_lines = &pattern[..pattern.len() - 1];
    let concl_line = pattern[pattern.len() - 1];
    let essentials: Vec<&Rpn> = a.essential_hyps().map(|(_, h)| &h.rpn).collect();
    if essentials.len() != hyp_lines.len() {
        return None;
    }
    let mut subst: HashMap<i32, SlotVal> = HashMap::new();
    for (rpn, line) in essentials.iter().zip(hyp_lines) {
        if !match_line(rpn, line, &mut subst) {
            return None;
        }
    }
    if !match_line(&a.exp_rpn, concl_line, &mut subst) {
        return None;
    }
    match subst.get(&0) {
        Some(&SlotVal::Ctor(a)) => Some(a),
        _ => None,
    }
}

fn table_for(mask: u32, argc: usize) -> Option<Vec<bool>> {
    match (mask, argc) {
        (EQUIVALENCE, 2) => Some(vec![true, false, false, true]),
        (m, 2) if m & AX1 != 0 => Some(vec![true, false, true, true]),
        (ID12, 1) => Some(vec![true, false]),
        (AND, 2) => Some(vec![false, false, false, true]),
        (OR, 2) => Some(vec![false, true, true, true]),
        (A3AN, 3) => Some((0..8).map(|i| i == 7).collect()),
        (O3OR, 3) => Some((0..8).map(|i| i != 0).collect()),
        _ => None,
    }
}

/// Seed `Propctor`s for every syntax axiom whose justification witnesses
/// (found among all stored assertions) accumulate to one of the known
/// relation-type bitmasks (spec.md 4.F).
pub fn seed_from_patterns(db: &Database) -> PropctorDb {
    let mut witnessed: HashMap<AssertionId, u32> = HashMap::new();
    for a in &db.assertions {
        for &(bit, pattern) in PATTERNS {
            if let Some(connective) = match_pattern(a, pattern) {
                *witnessed.entry(connective).or_insert(0) |= bit;
                break; // an assertion witnesses at most one pattern
            }
        }
    }

    let mut out = PropctorDb::new();
    for (connective, mask) in witnessed {
        let argc = db.get(connective).hyp_count();
        if let Some(table) = table_for(mask, argc) {
            let propctor = Propctor::new(connective, table);
            if propctor.check() {
                out.insert(connective, propctor);
            } else {
                log::warn!("seeded propctor for {:?} failed its own round-trip check", connective);
            }
        }
    }
    out
}

/// Apply the explicit `$j`/`$t` ctor-definitions map: these may override a
/// seeded connective (and only these may), per spec.md 9's Open Question.
pub fn apply_overrides(db: &Database, map: &mut PropctorDb, overrides: &CtorOverrides) {
    for (&connective, table) in overrides {
        let _ = db.get(connective); // panics with a clear message if stale
        let propctor = Propctor::new(connective, table.clone());
        map.insert(connective, propctor);
    }
}

/// A propositional skeleton: propositional connective applications over
/// leaves, where a leaf is either one of the definition's own bound
/// variables or a pseudo-variable standing in for an unrecognized
/// (non-propositional) subterm.
enum Skel {
    Var(usize),
    Apply(AssertionId, Vec<Skel>),
}

fn skeletonize(propctors: &PropctorDb, rpn: &Rpn, ast: &Ast, idx: usize, own_argc: usize, defining: AssertionId, pseudo_count: &mut usize) -> Option<Skel> {
    match rpn[idx] {
        ProofStep::Hyp(h) => Some(Skel::Var(h.idx())),
        ProofStep::Thm(a) => {
            if a == defining {
                return None; // circular definition
            }
            if let Some(ctor) = propctors.get(&a) {
                let children = ast.children_of(idx);
                if children.len() != ctor.argcount {
                    return None;
                }
                let mut kids = Vec::with_capacity(children.len());
                for &c in children {
                    kids.push(skeletonize(propctors, rpn, ast, c, own_argc, defining, pseudo_count)?);
                }
                Some(Skel::Apply(a, kids))
            } else {
                let idx_pseudo = own_argc + *pseudo_count;
                *pseudo_count += 1;
                Some(Skel::Var(idx_pseudo))
            }
        }
        ProofStep::Load(_) | ProofStep::Save => None,
    }
}

fn eval_skel(skel: &Skel, bits: &[bool], propctors: &PropctorDb) -> bool {
    match skel {
        Skel::Var(i) => bits[*i],
        Skel::Apply(a, kids) => {
            let ctor = &propctors[a];
            let mut idx = 0usize;
            for (pos, k) in kids.iter().enumerate() {
                if eval_skel(k, bits, propctors) {
                    idx |= 1 << pos;
                }
            }
            ctor.truthtable[idx]
        }
    }
}

fn is_periodic(table: &[bool], period: usize) -> bool {
    table.iter().enumerate().all(|(i, &v)| v == table[i % period])
}

/// Try to learn one definition's propositional connective. `label` must
/// start with `df-`; the assertion must have no essential hypotheses, its
/// conclusion's root must be the seeded equivalence connective applied to
/// `(lhs, rhs)`, `lhs` must apply a not-yet-known candidate connective to
/// exactly the assertion's own bound variables in hyp order, and `rhs`'s
/// propositional skeleton must evaluate to a table independent of any
/// pseudo-variables it introduces.
fn try_learn_definition(db: &Database, propctors: &PropctorDb, id: AssertionId) -> MmResult<Option<(AssertionId, Vec<bool>)>> {
    let a = db.get(id);
    if !a.label.starts_with("df-") {
        return Ok(None);
    }
    if a.essential_hyps().next().is_some() {
        return Err(MmError::BadDefinition { kind: "definition has essential hypotheses".into(), label: a.label.clone() });
    }
    let Some(&root_idx) = (0..a.exp_rpn.len()).last() else {
        return Err(MmError::BadDefinition { kind: "empty conclusion".into(), label: a.label.clone() });
    };
    let ProofStep::Thm(equiv_id) = a.exp_rpn[root_idx] else {
        return Err(MmError::BadDefinition { kind: "root is not an equivalence".into(), label: a.label.clone() });
    };
    let equiv_ctor = propctors.get(&equiv_id).filter(|c| c.argcount == 2 && c.truthtable == [true, false, false, true]);
    if equiv_ctor.is_none() {
        return Err(MmError::BadDefinition { kind: "root is not a known equivalence".into(), label: a.label.clone() });
    }
    let children = a.exp_ast.children_of(root_idx);
    if children.len() != 2 {
        return Err(MmError::BadDefinition { kind: "equivalence is not binary".into(), label: a.label.clone() });
    }
    let (lhs_idx, rhs_idx) = (children[0], children[1]);
    let ProofStep::Thm(connective) = a.exp_rpn[lhs_idx] else {
        return Err(MmError::BadDefinition { kind: "LHS is not a syntax-constructor application".into(), label: a.label.clone() });
    };
    if propctors.contains_key(&connective) {
        return Ok(None); // already known; never overridden by a definition
    }
    let own_argc = a.var_order().len();
    let lhs_children = a.exp_ast.children_of(lhs_idx);
    if lhs_children.len() != own_argc {
        return Err(MmError::BadDefinition { kind: "LHS argument count mismatches the definition's bound variables".into(), label: a.label.clone() });
    }
    for (expected, &child) in lhs_children.iter().enumerate() {
        if a.exp_rpn[child] != ProofStep::Hyp(HypIndex(expected as u32)) {
            return Err(MmError::BadDefinition { kind: "LHS variable not bound on the definition's own hypothesis list (dummy-variable rule)".into(), label: a.label.clone() });
        }
    }

    let mut pseudo_count = 0usize;
    let Some(skel) = skeletonize(propctors, &a.exp_rpn, &a.exp_ast, rhs_idx, own_argc, connective, &mut pseudo_count) else {
        return Err(MmError::BadDefinition { kind: "RHS is circular or uses an unrecognized connective".into(), label: a.label.clone() });
    };

    let total_bits = own_argc + pseudo_count;
    if total_bits > usize::BITS as usize {
        return Err(MmError::BadDefinition { kind: "too many variables for a truth table".into(), label: a.label.clone() });
    }
    let mut table = Vec::with_capacity(1 << total_bits);
    for assignment in 0..(1usize << total_bits) {
        let bits: Vec<bool> = (0..total_bits).map(|b| (assignment >> b) & 1 == 1).collect();
        table.push(eval_skel(&skel, &bits, propctors));
    }
    if !is_periodic(&table, 1 << own_argc) {
        return Err(MmError::BadDefinition { kind: "truth table depends on a dummy variable (not propositional)".into(), label: a.label.clone() });
    }
    table.truncate(1 << own_argc);
    Ok(Some((connective, table)))
}

/// Walk every `df-` assertion in creation order, adding a `Propctor` for
/// each that admits one, without ever overwriting an entry already present
/// (seeded, or supplied via [`apply_overrides`]).
pub fn learn_from_definitions(db: &Database, map: &mut PropctorDb) -> MmResult<usize> {
    let mut added = 0;
    for id in (0..db.assertions.len()).map(|i| AssertionId(i as u32)) {
        if let Some((connective, table)) = try_learn_definition(db, map, id)? {
            if !map.contains_key(&connective) {
                let propctor = Propctor::new(connective, table);
                if propctor.check() {
                    map.insert(connective, propctor);
                    added += 1;
                }
            }
        }
    }
    Ok(added)
}

/// Build the full propositional-constructor database: seed from relation
/// patterns first, apply explicit ctor overrides, then walk definitions
/// (spec.md 9's Open Question on ordering).
pub fn build(db: &Database, overrides: &CtorOverrides) -> MmResult<PropctorDb> {
    let mut map = seed_from_patterns(db);
    apply_overrides(db, &mut map, overrides);
    learn_from_definitions(db, &mut map)?;
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Database;

    fn axiom1_db() -> (Database, AssertionId) {
        let mut db = Database::new();
        let wff = db.declare_const("wff").unwrap();
        let arrow = db.declare_const("->").unwrap();
        let lparen = db.declare_const("(").unwrap();
        let rparen = db.declare_const(")").unwrap();
        let p = db.declare_var("p").unwrap();
        let q = db.declare_var("q").unwrap();
        db.add_floating("wp", wff, p).unwrap();
        db.add_floating("wq", wff, q).unwrap();

        let wi = db.add_axiom("wi", vec![wff, lparen, p, arrow, q, rparen]).unwrap();
        db.set_exp_rpn(wi, vec![ProofStep::Hyp(HypIndex(0)), ProofStep::Hyp(HypIndex(1))], Ast(vec![vec![], vec![]]));

        // ax-1 : |- ( p -> ( q -> p ) ), i.e. wi(p, wi(q, p))
        let ax1_rpn = vec![
            ProofStep::Hyp(HypIndex(0)), // p
            ProofStep::Hyp(HypIndex(1)), // q
            ProofStep::Hyp(HypIndex(0)), // p
            ProofStep::Thm(wi),          // wi(q, p)
            ProofStep::Thm(wi),          // wi(p, wi(q,p))
        ];
        let ax1 = db.add_axiom("ax-1", vec![wff, lparen, p, arrow, lparen, q, arrow, p, rparen, rparen]).unwrap();
        db.set_exp_rpn(
            ax1,
            ax1_rpn,
            Ast(vec![vec![], vec![], vec![], vec![1, 2], vec![0, 3]]),
        );
        (db, wi)
    }

    #[test]
    fn ax1_shape_seeds_implication_with_spec_example_table() {
        let (db, wi) = axiom1_db();
        let propctors = seed_from_patterns(&db);
        let ctor = propctors.get(&wi).expect("wi should be seeded as implication");
        assert_eq!(ctor.truthtable, vec![true, false, true, true]);
        assert!(ctor.check());
    }
}
