//! CNF clause/formula types.

use super::model::Literal;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub literals: Vec<Literal>,
}

impl Clause {
    pub fn new(literals: Vec<Literal>) -> Self {
        Self { literals }
    }

    pub fn unit(lit: Literal) -> Self {
        Self { literals: vec![lit] }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Cnf {
    pub atom_count: usize,
    pub clauses: Vec<Clause>,
}

impl Cnf {
    pub fn new(atom_count: usize) -> Self {
        Self { atom_count, clauses: Vec::new() }
    }

    /// Allocate a fresh auxiliary atom, growing `atom_count`.
    pub fn fresh_atom(&mut self) -> usize {
        let id = self.atom_count;
        self.atom_count += 1;
        id
    }

    pub fn push(&mut self, clause: Clause) {
        self.clauses.push(clause);
    }

    /// Append `other`'s clauses, remapping its atoms past `self`'s current
    /// atom count so the two formulas share no atoms (used when assembling
    /// the ambient-hypothesis CNF, 4.G).
    pub fn append_disjoint(&mut self, other: &Cnf) -> usize {
        let offset = self.atom_count;
        self.atom_count += other.atom_count;
        for clause in &other.clauses {
            let remapped = clause
                .literals
                .iter()
                .map(|&lit| super::model::make_lit(super::model::atom_of(lit) + offset, super::model::sense_of(lit)))
                .collect();
            self.clauses.push(Clause::new(remapped));
        }
        offset
    }
}
