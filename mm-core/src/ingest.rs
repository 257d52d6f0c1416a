//! The database reader (spec.md 6.2): drives `crate::store::Database`'s
//! primitives from a flat token stream, in the order statements appear.
//! Grounded in `examples/original_source/src/readdata.cpp`'s
//! `Imp::read`/`readf`/`reade`/`reada`/`readp` state machine, re-expressed
//! without its `Readretval`/`std::cerr` sentinel-and-print discipline
//! (spec.md 9: no exception-style returns mixed with sentinel values,
//! logging never goes to stdout directly).
//!
//! The tokenizer that turns source bytes into whitespace-separated tokens
//! is an external collaborator (spec.md 1/6.1); this module's input is
//! already that flat token list. Compressed-proof decoding and
//! per-assertion verification (Components D) are invoked from here, right
//! after each `$p` statement closes, exactly as spec.md 8's invariant
//! requires ("For every stored assertion A with proof P: verifier(P, ...)
//! returns A.expression").

use std::collections::HashMap;

use crate::error::{MmError, MmResult};
use crate::expr::Expression;
use crate::metrics::MetricsSink;
use crate::parser;
use crate::proofstep::{ProofStep, Rpn};
use crate::propctor::{self, CtorOverrides, PropctorDb};
use crate::store::{AssertionId, Database, HypIndex};
use crate::symbol::SymbolId;
use crate::verify::{self, decode_compressed, ProofLabel};

/// One `$j`/`$t` structured command, already lifted from a comment by the
/// (external) comment scanner: `name` is the command word, `words` the
/// rest of its whitespace-separated, quote-aware argument list (spec.md
/// 6.1).
#[derive(Debug, Clone)]
pub struct JCommand {
    pub name: String,
    pub words: Vec<String>,
}

/// Everything the ingest driver produces: the fact base, the propositional
/// connective database built over it, and the metrics sink it reported
/// into (spec.md 6.4's "statistics" output, folded into one return value
/// rather than threaded as an out-parameter).
pub struct Ingested<M> {
    pub db: Database,
    pub propctors: PropctorDb,
    pub metrics: M,
}

/// A thin cursor over the token slice; `next`/`peek` are the only
/// operations the reader needs (spec.md 9: no shared mutable token queue
/// reached into from multiple call sites).
struct Tokens<'a> {
    toks: &'a [String],
    pos: usize,
}

impl<'a> Tokens<'a> {
    fn new(toks: &'a [String]) -> Self {
        Tokens { toks, pos: 0 }
    }

    fn peek(&self) -> Option<&'a str> {
        self.toks.get(self.pos).map(String::as_str)
    }

    fn next(&mut self) -> MmResult<&'a str> {
        let t = self.toks.get(self.pos).ok_or(MmError::ParseError { what: "unexpected end of input".into(), pos: self.pos })?;
        self.pos += 1;
        Ok(t.as_str())
    }

    fn pos(&self) -> usize {
        self.pos
    }

    /// Collect tokens up to (and consuming) `terminator`.
    fn until(&mut self, terminator: &str) -> MmResult<Vec<String>> {
        let mut out = Vec::new();
        loop {
            let t = self.next()?;
            if t == terminator {
                return Ok(out);
            }
            out.push(t.to_string());
        }
    }
}

/// Resolve one math-symbol token to its interned id, requiring it to
/// already be an active constant or variable (spec.md 6.2: unknown-symbol
/// reuse is rejected with a specific error).
fn resolve_symbol(db: &Database, tok: &str) -> MmResult<SymbolId> {
    db.symbols.lookup(tok).ok_or_else(|| MmError::UnknownSymbol { name: tok.to_string() })
}

fn resolve_expression(db: &Database, toks: &[String]) -> MmResult<Expression> {
    toks.iter().map(|t| resolve_symbol(db, t)).collect()
}

/// Resolve one proof-label token against a preview of the statement's own
/// mandatory hypotheses first, then against previously-proved assertions —
/// the same precedence `readdata.cpp`'s `getlabels`/`getproofstep` give
/// `m_scopes.gethyp` over `m_database.getassertion`.
fn resolve_proof_label(db: &Database, mandatory: &[crate::store::Hypothesis], label: &str) -> MmResult<ProofLabel> {
    if let Some(i) = mandatory.iter().position(|h| h.label == label) {
        return Ok(ProofLabel::Hyp(HypIndex(i as u32)));
    }
    db.lookup_assertion(label).map(ProofLabel::Thm).ok_or_else(|| MmError::UnknownSymbol { name: label.to_string() })
}

/// Build the RPN for a regular (uncompressed) proof: one label per step,
/// directly resolved — no `Save`/`Load` arise this way (spec.md 4.D).
fn regular_proof_rpn(db: &Database, mandatory: &[crate::store::Hypothesis], labels: &[String]) -> MmResult<Rpn> {
    labels
        .iter()
        .map(|l| resolve_proof_label(db, mandatory, l).map(|pl| match pl {
            ProofLabel::Hyp(h) => ProofStep::Hyp(h),
            ProofLabel::Thm(a) => ProofStep::Thm(a),
        }))
        .collect()
}

/// Decode the compressed form: a parenthesized label list followed by a
/// base-20 letter stream, both already split into whitespace-separated
/// tokens by the external tokenizer; the letter-stream tokens are
/// concatenated before decoding since the compressed alphabet carries no
/// internal whitespace of its own (spec.md 4.D).
fn compressed_proof_rpn(db: &Database, mandatory: &[crate::store::Hypothesis], paren_labels: &[String], letter_toks: &[String]) -> MmResult<Rpn> {
    let mut labels: Vec<ProofLabel> = mandatory.iter().enumerate().map(|(i, _)| ProofLabel::Hyp(HypIndex(i as u32))).collect();
    for l in paren_labels {
        labels.push(resolve_proof_label(db, mandatory, l)?);
    }
    let joined: String = letter_toks.concat();
    decode_compressed(&labels, joined.as_bytes())
}

/// Drives `db` from `tokens` in source order. Returns once the whole
/// stream has been consumed (or the first fatal ingest/verification error,
/// per spec.md 7's "Propagation": ingest and verifier errors abort the
/// whole run).
fn ingest_into<M: MetricsSink>(db: &mut Database, tokens: &[String], metrics: &mut M) -> MmResult<()> {
    let mut cur = Tokens::new(tokens);
    let mut depth: usize = 0;

    while let Some(tok) = cur.peek() {
        match tok {
            "${" => {
                cur.next()?;
                db.open_block();
                depth += 1;
            }
            "$}" => {
                cur.next()?;
                db.close_block()?;
                depth -= 1;
            }
            "$c" => {
                cur.next()?;
                for name in cur.until("$.")? {
                    db.declare_const(&name)?;
                }
            }
            "$v" => {
                cur.next()?;
                for name in cur.until("$.")? {
                    db.declare_var(&name)?;
                }
            }
            "$d" => {
                cur.next()?;
                let names = cur.until("$.")?;
                let vars: Vec<SymbolId> = names.iter().map(|n| resolve_symbol(db, n)).collect::<MmResult<_>>()?;
                db.add_disjoint(&vars)?;
            }
            "$." | "$=" | "$(" | "$)" => {
                return Err(MmError::ParseError { what: format!("unexpected terminator `{tok}`"), pos: cur.pos() });
            }
            _ => {
                // A bare token here is a label about to introduce $f/$e/$a/$p.
                let label = cur.next()?.to_string();
                let keyword = cur.next()?;
                match keyword {
                    "$f" => read_floating(db, &mut cur, &label)?,
                    "$e" => read_essential(db, &mut cur, &label)?,
                    "$a" => read_axiom(db, &mut cur, &label, metrics)?,
                    "$p" => read_theorem(db, &mut cur, &label, metrics)?,
                    other => return Err(MmError::ParseError { what: format!("label `{label}` not followed by a statement keyword (found `{other}`)"), pos: cur.pos() }),
                }
            }
        }
    }

    if depth != 0 {
        return Err(MmError::ScopeError { what: "unterminated ${ block at end of input".into() });
    }
    Ok(())
}

fn read_floating(db: &mut Database, cur: &mut Tokens, label: &str) -> MmResult<()> {
    let typecode_tok = cur.next()?.to_string();
    let var_tok = cur.next()?.to_string();
    let term = cur.next()?;
    if term != "$." {
        return Err(MmError::ParseError { what: format!("`$f` statement `{label}` expects exactly one type and one variable"), pos: cur.pos() });
    }
    let typecode = resolve_symbol(db, &typecode_tok)?;
    let var = resolve_symbol(db, &var_tok)?;
    db.add_floating(label, typecode, var)
}

fn read_essential(db: &mut Database, cur: &mut Tokens, label: &str) -> MmResult<()> {
    let toks = cur.until("$.")?;
    let expression = resolve_expression(db, &toks)?;
    db.add_essential(label, expression)
}

/// Compute and store (exp_rpn, exp_ast) for an assertion's own conclusion,
/// and for each of its essential hypotheses — the syntactic derivations
/// Component F and the oracle (Component G) walk (spec.md 4.C/4.F/4.G).
fn attach_syntax(db: &mut Database, id: AssertionId) -> MmResult<()> {
    let a = db.get(id);
    let expr_rpn = parser::parse_expression(db, &a.expression, &a.hyps, &a.dv_pairs)?;
    let expr_ast = parser::exp_ast_for(db, &expr_rpn);
    let essential_ids: Vec<(HypIndex, Expression)> = a.essential_hyps().map(|(h, hyp)| (h, hyp.expression.clone())).collect();
    db.set_exp_rpn(id, expr_rpn, expr_ast);

    for (h, expr) in essential_ids {
        let a = db.get(id);
        let rpn = parser::parse_expression(db, &expr, &a.hyps, &a.dv_pairs)?;
        let ast = parser::exp_ast_for(db, &rpn);
        db.set_hyp_rpn(id, h, rpn, ast);
    }
    Ok(())
}

fn read_axiom<M: MetricsSink>(db: &mut Database, cur: &mut Tokens, label: &str, metrics: &mut M) -> MmResult<()> {
    let toks = cur.until("$.")?;
    let expression = resolve_expression(db, &toks)?;
    let id = db.add_axiom(label, expression)?;
    attach_syntax(db, id)?;
    metrics.record_assertion_ingested(true);
    Ok(())
}

fn read_theorem<M: MetricsSink>(db: &mut Database, cur: &mut Tokens, label: &str, metrics: &mut M) -> MmResult<()> {
    let toks_expr = {
        // Read up to `$=`, the proof/expression separator (not `$.`).
        let mut out = Vec::new();
        loop {
            let t = cur.next()?;
            if t == "$=" {
                break;
            }
            out.push(t.to_string());
        }
        out
    };
    let expression = resolve_expression(db, &toks_expr)?;
    let mandatory = db.preview_mandatory_hyps(&expression);

    let proof = if cur.peek() == Some("(") {
        cur.next()?;
        let paren_labels = cur.until(")")?;
        let letter_toks = cur.until("$.")?;
        compressed_proof_rpn(db, &mandatory, &paren_labels, &letter_toks)?
    } else {
        let labels = cur.until("$.")?;
        regular_proof_rpn(db, &mandatory, &labels)?
    };

    let id = db.add_theorem(label, expression, proof)?;
    verify::verify_assertion(db, id)?;
    metrics.record_proof_verified(db.get(id).proof.as_ref().map_or(0, |p| p.len()));
    attach_syntax(db, id)?;
    metrics.record_assertion_ingested(false);
    Ok(())
}

/// Full ingest: drive the database reader over `tokens`, then build the
/// propositional-constructor database (seed from patterns, apply `$j`
/// ctor overrides, walk definitions — spec.md 4.F/9), then check every
/// `PROPOSITIONAL` assertion is in fact a tautology (spec.md 8's
/// `LogicError` integrity invariant). All of this is fatal-on-error:
/// ingest/verification failures abort the whole load (spec.md 7).
pub fn load_database<M: MetricsSink>(tokens: &[String], jcommands: &[JCommand], mut metrics: M) -> MmResult<Ingested<M>> {
    let mut db = Database::new();
    ingest_into(&mut db, tokens, &mut metrics)?;

    let overrides = ctor_overrides_from(&db, jcommands)?;
    let propctors = propctor::build(&db, &overrides)?;
    crate::oracle::check_all(&db, &propctors)?;

    Ok(Ingested { db, propctors, metrics })
}

/// The one `$j`/`$t` consumer spec.md 9's Open Question names: a
/// `ctor-definitions` command binding a syntax axiom's label to an
/// explicit truth table, so a later `df-` definition is never allowed to
/// silently override a seeded connective except through this map.
///
/// Command shape: `ctor-definitions <label> <bit>...` where each `<bit>`
/// is `0`/`1` and there are `2^argc` of them for the named syntax axiom.
fn ctor_overrides_from(db: &Database, jcommands: &[JCommand]) -> MmResult<CtorOverrides> {
    let mut out = HashMap::new();
    for cmd in jcommands {
        if cmd.name != "ctor-definitions" {
            continue;
        }
        let [label, bits @ ..] = cmd.words.as_slice() else {
            return Err(MmError::BadDefinition { kind: "ctor-definitions command has no label".into(), label: String::new() });
        };
        let id = db
            .lookup_assertion(label)
            .ok_or_else(|| MmError::BadDefinition { kind: "ctor-definitions references an unknown assertion".into(), label: label.clone() })?;
        let table: Vec<bool> = bits
            .iter()
            .map(|b| match b.as_str() {
                "0" => Ok(false),
                "1" => Ok(true),
                _ => Err(MmError::BadDefinition { kind: format!("ctor-definitions bit `{b}` is neither 0 nor 1"), label: label.clone() }),
            })
            .collect::<MmResult<_>>()?;
        if !table.len().is_power_of_two() {
            return Err(MmError::BadDefinition { kind: "ctor-definitions truth table length is not a power of two".into(), label: label.clone() });
        }
        out.insert(id, table);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::NoOpMetrics;

    fn tok(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    /// spec.md 8's scenario 1: axiom-1 round trip.
    #[test]
    fn axiom1_database_ingests_and_registers_implication() {
        let src = tok(
            "$c ( ) -> wff $. \
             $v p q $. \
             wp $f wff p $. \
             wq $f wff q $. \
             wi $a wff ( p -> q ) $. \
             ax-1 $a |- ( p -> ( q -> p ) ) $.",
        );
        // `|-` wasn't declared as a constant above; declare it too.
        let mut src2 = tok("$c |- $.");
        src2.extend(src);
        let result = load_database::<NoOpMetrics>(&src2, &[], NoOpMetrics);
        assert!(result.is_ok(), "{:?}", result.err());
        let ingested = result.unwrap();
        let wi = ingested.db.lookup_assertion("wi").unwrap();
        let propctor = ingested.propctors.get(&wi).expect("wi should be seeded as implication");
        assert_eq!(propctor.truthtable, vec![true, false, true, true]);
    }

    #[test]
    fn unknown_symbol_in_expression_is_rejected() {
        let src = tok("$c wff $. wp $a wff bogus $.");
        let err = load_database::<NoOpMetrics>(&src, &[], NoOpMetrics);
        assert!(matches!(err, Err(MmError::UnknownSymbol { .. })));
    }

    #[test]
    fn unbalanced_block_is_a_scope_error() {
        let src = tok("${ $c wff $.");
        let err = load_database::<NoOpMetrics>(&src, &[], NoOpMetrics);
        assert!(matches!(err, Err(MmError::ScopeError { .. })));
    }
}
