//! Component C — the syntactic parser (RPN recovery).
//!
//! Recovers an RPN proof that a flat expression has a given type code, by
//! memoized recursive descent over the database's syntax axioms. Grounded
//! in `examples/original_source/src/parse/parse.cpp`'s `(type, position)`
//! memo table, re-expressed with an explicit cache keyed by the same pair
//! instead of a mutable map living on the database itself.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};

use crate::error::{MmError, MmResult};
use crate::expr::Expression;
use crate::proofstep::{build_ast, ProofStep, Rpn};
use crate::store::{AssertionId, Database, HypIndex, Hypothesis};
use crate::symbol::SymbolId;

type Memo = RefCell<HashMap<(SymbolId, usize), HashMap<usize, Vec<Rpn>>>>;

/// One parse attempt against a fixed token stream. Holds the memo table so
/// repeated (typecode, position) queries made while matching sibling
/// variables in a pattern are O(1) after the first.
///
/// `outer_hyps` is the mandatory-hypothesis list of the assertion whose own
/// expression is being parsed (not any nested syntax axiom's): a bare
/// variable token in the stream is a base-case match against that
/// variable's own floating hyp, terminating the otherwise-infinite
/// recursion into syntax-axiom patterns (spec.md 4.C).
pub struct Parser<'a> {
    db: &'a Database,
    tokens: &'a [SymbolId],
    ambient_dv: &'a BTreeSet<(SymbolId, SymbolId)>,
    outer_hyps: &'a [Hypothesis],
    hyp_of_var: HashMap<SymbolId, HypIndex>,
    memo: Memo,
}

impl<'a> Parser<'a> {
    pub fn new(db: &'a Database, tokens: &'a [SymbolId], ambient_dv: &'a BTreeSet<(SymbolId, SymbolId)>, outer_hyps: &'a [Hypothesis]) -> Self {
        let hyp_of_var = outer_hyps
            .iter()
            .enumerate()
            .filter_map(|(i, h)| h.floating.map(|v| (v, HypIndex(i as u32))))
            .collect();
        Self { db, tokens, ambient_dv, outer_hyps, hyp_of_var, memo: RefCell::new(HashMap::new()) }
    }

    /// Parse `self.tokens[0..]` in full as `typecode`, returning one RPN
    /// whose root proves the whole expression. Unambiguous grammars yield a
    /// unique full-length match; ties are broken by syntax-axiom creation
    /// order.
    pub fn parse(&self, typecode: SymbolId) -> MmResult<Rpn> {
        let matches = self.parse_at(typecode, 0);
        matches
            .get(&self.tokens.len())
            .and_then(|rpns| rpns.first())
            .cloned()
            .ok_or(MmError::ParseError { what: format!("no parse of type {typecode:?}"), pos: 0 })
    }

    /// All (end-position -> candidate RPNs) matches of `typecode` starting
    /// at `start`, memoized.
    fn parse_at(&self, typecode: SymbolId, start: usize) -> HashMap<usize, Vec<Rpn>> {
        if let Some(hit) = self.memo.borrow().get(&(typecode, start)) {
            return hit.clone();
        }
        // Insert an empty placeholder before recursing so a syntax axiom
        // whose own pattern is directly left-recursive terminates instead of
        // looping forever (it simply finds no match through this empty seed).
        self.memo.borrow_mut().insert((typecode, start), HashMap::new());

        let mut results: HashMap<usize, Vec<Rpn>> = HashMap::new();

        // Base case: a bare variable token of the right type is a complete,
        // one-token parse in its own right — the leaf of every derivation,
        // without which no expression containing a variable would ever
        // parse (every syntax axiom's pattern bottoms out here).
        if let Some(&sym) = self.tokens.get(start) {
            if let Some(&h) = self.hyp_of_var.get(&sym) {
                if self.db.symbols.floating_of(sym).map(|f| f.typecode) == Some(typecode) {
                    results.entry(start + 1).or_default().push(vec![ProofStep::Hyp(h)]);
                }
            }
        }

        for &aid in &self.db.syntax_axioms {
            let a = self.db.get(aid);
            if a.exptypecode() != typecode {
                continue;
            }
            for (end, rpn) in self.try_match(aid, start) {
                results.entry(end).or_default().push(rpn);
            }
        }
        self.memo.borrow_mut().insert((typecode, start), results.clone());
        results
    }

    /// Attempt to match syntax axiom `aid`'s pattern against the token
    /// stream starting at `start`. Returns every accepted end-position with
    /// its RPN (interleaving constant-token matches with recursive
    /// sub-parses of each pattern variable).
    fn try_match(&self, aid: AssertionId, start: usize) -> Vec<(usize, Rpn)> {
        let a = self.db.get(aid);
        let pattern = &a.expression[1..]; // skip the pattern's own typecode

        // children[i] = the Rpn proving the i-th mandatory hyp, once bound.
        let mut frontier: Vec<(usize, Vec<Rpn>)> = vec![(start, Vec::new())];

        for &sym in pattern {
            let mut next = Vec::new();
            for (pos, children) in frontier {
                if self.db.symbols.is_variable(sym) {
                    let hyp_idx = a
                        .floating_hyps()
                        .position(|(_, h)| h.floating == Some(sym))
                        .expect("pattern variable must have a floating hyp");
                    let hyp_typecode = a.hyps[hyp_idx].typecode();
                    for (end, sub_rpns) in self.parse_at(hyp_typecode, pos) {
                        for sub in sub_rpns {
                            let mut c = children.clone();
                            c.push(sub);
                            next.push((end, c));
                        }
                    }
                } else if self.tokens.get(pos) == Some(&sym) {
                    next.push((pos + 1, children));
                }
            }
            frontier = next;
        }

        let mut out = Vec::new();
        'outer: for (end, children) in frontier {
            if !self.dv_ok(a.dv_pairs.iter(), &a.var_order(), &children) {
                continue 'outer;
            }
            let mut rpn = Rpn::new();
            for child in children {
                rpn.extend(child);
            }
            // A syntax axiom has only floating hyps, in the same order as
            // the pattern's variables; HYP(i) indexes into *this* axiom's
            // hyp list, so the sub-parses above are already full RPNs, not
            // single Hyp steps — splice them in, then close with the axiom.
            rpn.push(ProofStep::Thm(aid));
            out.push((end, rpn));
        }
        out
    }

    /// Re-check the matched axiom's DV constraints against the ambient
    /// assertion's DV set: for each declared pair of pattern variables, every
    /// variable actually used by the corresponding matched sub-expressions
    /// must appear together in `ambient_dv`.
    fn dv_ok(&self, dv_pairs: impl Iterator<Item = &'a (SymbolId, SymbolId)>, var_order: &[SymbolId], children: &[Rpn]) -> bool {
        for (x, y) in dv_pairs {
            let ix = var_order.iter().position(|v| v == x);
            let iy = var_order.iter().position(|v| v == y);
            let (Some(ix), Some(iy)) = (ix, iy) else { continue };
            let vars_x = self.vars_in(&children[ix]);
            let vars_y = self.vars_in(&children[iy]);
            for &vx in &vars_x {
                for &vy in &vars_y {
                    if vx == vy {
                        return false;
                    }
                    let pair = if vx.0 < vy.0 { (vx, vy) } else { (vy, vx) };
                    if !self.ambient_dv.contains(&pair) {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Variables of the *outer* assertion actually used by a matched
    /// sub-rpn: every leaf is either a direct `Hyp` (the base case above,
    /// resolved against `self.outer_hyps`) or a nullary `Thm` (a
    /// zero-argument syntax axiom, which binds no outer variable).
    fn vars_in(&self, rpn: &Rpn) -> BTreeSet<SymbolId> {
        let mut out = BTreeSet::new();
        let ast = build_ast(rpn, |aid| self.db.get(aid).hyp_count());
        for (i, step) in rpn.iter().enumerate() {
            if !ast.children_of(i).is_empty() {
                continue;
            }
            match step {
                ProofStep::Hyp(h) => {
                    if let Some(v) = self.outer_hyps.get(h.idx()).and_then(|hyp| hyp.floating) {
                        out.insert(v);
                    }
                }
                ProofStep::Thm(aid) => {
                    if let Some(v) = self.db.get(*aid).var_order().first() {
                        out.insert(*v);
                    }
                }
                ProofStep::Load(_) | ProofStep::Save => {}
            }
        }
        out
    }
}

/// Parse a flat expression's content as `wff` (spec.md 4.C's outer entry
/// point). Every propositional expression this crate handles is either
/// already `wff`-typed (a syntax axiom's own conclusion) or `|-`-typed (a
/// provable judgment, whose body is always a wff and whose typecode itself
/// has no grammar productions) — so the content after the leading typecode
/// token is always parsed against `db.wff_typecode`, never against
/// `expr`'s own first token.
///
/// `outer_hyps` is the mandatory hypothesis list of the assertion `expr`
/// belongs to (its own conclusion, or one of its own essential hyps) — the
/// frame bare-variable leaves resolve against.
pub fn parse_expression(db: &Database, expr: &Expression, outer_hyps: &[Hypothesis], ambient_dv: &BTreeSet<(SymbolId, SymbolId)>) -> MmResult<Rpn> {
    if expr.is_empty() {
        return Err(MmError::ParseError { what: "empty expression".into(), pos: 0 });
    }
    let typecode = db.wff_typecode.ok_or_else(|| MmError::ParseError { what: "no `wff` type code declared yet".into(), pos: 0 })?;
    let tokens = &expr[1..];
    let parser = Parser::new(db, tokens, ambient_dv, outer_hyps);
    parser.parse(typecode)
}

/// Build the AST for an assertion's own proof, used once a theorem's proof
/// is accepted so downstream move matching (4.I) has `(exp_rpn, exp_ast)`
/// available without re-deriving it every search.
pub fn exp_ast_for(db: &Database, rpn: &Rpn) -> crate::proofstep::Ast {
    build_ast(rpn, |aid| db.get(aid).hyp_count())
}
