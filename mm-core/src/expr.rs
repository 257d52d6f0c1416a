//! Expressions: an ordered sequence of symbols whose first element is
//! always a type code (spec.md 3).

use crate::symbol::SymbolId;

pub type Expression = Vec<SymbolId>;

pub fn typecode(expr: &[SymbolId]) -> Option<SymbolId> {
    expr.first().copied()
}
