//! Component A — symbol/expression model.
//!
//! Tokens are interned into dense integer ids the moment they are declared.
//! `SymbolId(0)` is reserved and denotes "this is a constant, not a
//! variable" (spec.md 4.A: "id = 0 denotes a constant; id > 0 denotes a
//! variable"). Every variable additionally carries a reference to the
//! floating hypothesis that introduced it, recorded once at declaration and
//! never mutated afterwards — never a back-pointer living on the symbol
//! itself (spec.md 9's design note on cyclic pointer graphs), but a separate
//! table keyed by the variable's id.

use std::collections::HashMap;
use std::fmt;

use crate::store::HypIndex;

/// Dense id of an interned token. `0` is reserved for constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct SymbolId(pub u32);

impl SymbolId {
    pub const CONST: SymbolId = SymbolId(0);

    pub fn is_variable(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a variable's floating hypothesis (`typecode`, variable symbol) is
/// recorded at declaration. Keyed separately from the interned token table
/// so the graph of references stays acyclic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FloatingRef {
    pub typecode: SymbolId,
    /// Index of the floating hypothesis inside the assertion currently being
    /// built, filled in once the enclosing statement is closed (`store.rs`).
    pub hyp: Option<HypIndex>,
}

/// Global string pool + symbol table owned by the [`crate::store::Database`].
///
/// Every downstream component passes around `SymbolId`s (small, `Copy`
/// handles) rather than `&str` slices into owning strings (spec.md 9: no
/// `strview`-into-owning-string aliasing).
#[derive(Debug, Default)]
pub struct SymbolTable {
    names: Vec<String>,
    by_name: HashMap<String, SymbolId>,
    /// `None` for constants; `Some(floating)` for variables.
    floating: Vec<Option<FloatingRef>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        let mut t = Self::default();
        // Reserve id 0 as a sentinel "no symbol" slot so real ids start at 1
        // and SymbolId(0) can double as "is this a variable?" == false.
        t.names.push(String::new());
        t.floating.push(None);
        t
    }

    pub fn name(&self, id: SymbolId) -> &str {
        &self.names[id.0 as usize]
    }

    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        self.by_name.get(name).copied()
    }

    /// Intern a constant. Re-declaring an existing name is the caller's
    /// responsibility to reject (spec.md 6.2: "reject reuse of
    /// constant/variable/label tokens").
    pub fn intern_const(&mut self, name: &str) -> SymbolId {
        self.intern(name, None)
    }

    /// Intern a variable together with its floating-hypothesis typecode.
    /// The `hyp` index is filled in later via [`SymbolTable::bind_hyp`] once
    /// the floating hypothesis itself has been assigned a slot.
    pub fn intern_var(&mut self, name: &str, typecode: SymbolId) -> SymbolId {
        self.intern(name, Some(FloatingRef { typecode, hyp: None }))
    }

    fn intern(&mut self, name: &str, floating: Option<FloatingRef>) -> SymbolId {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        let id = SymbolId(self.names.len() as u32);
        self.names.push(name.to_string());
        self.floating.push(floating);
        self.by_name.insert(name.to_string(), id);
        id
    }

    pub fn is_variable(&self, id: SymbolId) -> bool {
        self.floating.get(id.0 as usize).map_or(false, |f| f.is_some())
    }

    pub fn floating_of(&self, id: SymbolId) -> Option<FloatingRef> {
        self.floating.get(id.0 as usize).copied().flatten()
    }

    pub fn bind_hyp(&mut self, id: SymbolId, hyp: HypIndex) {
        if let Some(Some(f)) = self.floating.get_mut(id.0 as usize) {
            f.hyp = Some(hyp);
        }
    }

    /// Fill in the real type code once the variable's `$f` statement is
    /// seen (`declare_var` interns with a placeholder since the typecode
    /// isn't known until then).
    pub fn set_floating_typecode(&mut self, id: SymbolId, typecode: SymbolId) {
        if let Some(Some(f)) = self.floating.get_mut(id.0 as usize) {
            f.typecode = typecode;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_stable_and_reuses_ids() {
        let mut t = SymbolTable::new();
        let p = t.intern_const("(");
        let q = t.intern_const("(");
        assert_eq!(p, q);
        assert_eq!(t.name(p), "(");
    }

    #[test]
    fn variables_carry_their_floating_typecode() {
        let mut t = SymbolTable::new();
        let wff = t.intern_const("wff");
        let p = t.intern_var("p", wff);
        assert!(t.is_variable(p));
        assert_eq!(t.floating_of(p).unwrap().typecode, wff);
        assert!(!t.is_variable(wff));
    }
}
