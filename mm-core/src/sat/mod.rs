//! Component E — the CNF / SAT core (spec.md 4.E): a tri-state `Model`,
//! `Cnf` clause storage, a backtracking DPLL `solve`, and the truth-table
//! <-> CNF conversions that the propositional-connective database
//! (`crate::propctor`) and validity oracle (`crate::oracle`) build on.

pub mod cnf;
pub mod model;
pub mod solver;
pub mod truth_table;

pub use cnf::{Clause, Cnf};
pub use model::{atom_of, make_lit, sense_of, ClauseStatus, Literal, Model, TriState};
pub use solver::{is_satisfiable, solve};
pub use truth_table::{cnf_from_truth_table, truth_table};
