//! The error taxonomy of the whole engine.
//!
//! Every failure mode named in the design is its own variant; none of them
//! are conflated with an `Internal(String)` catch-all the way an exploratory
//! prototype might. Ingest and verification errors are meant to be fatal to
//! the whole run; search errors (`OracleLimit`, `SizeExceeded`) are
//! per-theorem and are carried inside [`crate::search::SearchOutcome`]
//! instead of being returned as a hard `Err` from the driver loop.

use thiserror::Error;

use crate::store::{AssertionId, HypIndex};
use crate::symbol::SymbolId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MmError {
    #[error("parse error at token {pos}: {what}")]
    ParseError { what: String, pos: usize },

    #[error("unknown symbol `{name}`")]
    UnknownSymbol { name: String },

    #[error("scope error: {what}")]
    ScopeError { what: String },

    #[error("hypothesis error: {kind}")]
    HypothesisError { kind: String },

    #[error("disjoint-variable violation between {a:?} and {b:?}")]
    DisjointViolation { a: SymbolId, b: SymbolId },

    #[error("unification failure in {label} at step {step}, hyp {hyp}: expected {expected:?}, found {found:?}")]
    UnificationFailure {
        label: String,
        step: usize,
        hyp: HypIndex,
        expected: Vec<SymbolId>,
        found: Vec<SymbolId>,
    },

    #[error("stack underflow verifying {label} at step {step}")]
    StackUnderflow { label: String, step: usize },

    #[error("save index {index} out of range verifying {label}")]
    SaveIndexOut { label: String, index: usize },

    #[error("compressed-proof encoding error at byte {pos}")]
    EncodingError { pos: usize },

    #[error("compressed-proof stream ended mid-number")]
    Unterminated,

    #[error("arithmetic overflow")]
    Overflow,

    #[error("bad definition `{label}`: {kind}")]
    BadDefinition { kind: String, label: String },

    #[error("assertion `{label}` is flagged PROPOSITIONAL but is not a tautology")]
    LogicError { label: String },

    #[error("term generator exhausted its resource cap")]
    OracleLimit,

    #[error("search tree reached its size limit before becoming sure")]
    SizeExceeded,

    #[error("mismatch verifying {label}: proved {proved:?}, expected {expected:?}")]
    Mismatch {
        label: String,
        proved: Vec<SymbolId>,
        expected: Vec<SymbolId>,
    },

    #[error("assertion {0:?} referenced before it was created")]
    ForwardReference(AssertionId),
}

pub type MmResult<T> = Result<T, MmError>;
