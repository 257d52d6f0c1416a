//! Backtracking DPLL, grounded in
//! `examples/original_source/src/satsolve/SAT.h`'s `decide`/`backtrack`
//! loop: pick the lowest-index undecided atom, try FALSE then TRUE, and
//! backtrack chronologically on conflict.

use super::cnf::Cnf;
use super::model::{ClauseStatus, Model, TriState};

/// `Some(model)` if `cnf` is satisfiable (with a satisfying total
/// assignment), `None` if UNSAT. Exactly one of the two — no timeouts, per
/// spec.md 4.E's contract.
pub fn solve(cnf: &Cnf) -> Option<Model> {
    let mut model = Model::new(cnf.atom_count);
    if search(cnf, &mut model, 0) {
        Some(model)
    } else {
        None
    }
}

pub fn is_satisfiable(cnf: &Cnf) -> bool {
    solve(cnf).is_some()
}

fn okay_so_far(cnf: &Cnf, model: &Model) -> bool {
    cnf.clauses.iter().all(|c| model.clause_status(c) != ClauseStatus::Contradictory)
}

fn search(cnf: &Cnf, model: &mut Model, atom: usize) -> bool {
    if atom >= cnf.atom_count {
        return okay_so_far(cnf, model);
    }
    for candidate in [TriState::False, TriState::True] {
        model.set(atom, candidate);
        if okay_so_far(cnf, model) && search(cnf, model, atom + 1) {
            return true;
        }
    }
    model.set(atom, TriState::Undecided);
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sat::cnf::Clause;
    use crate::sat::model::make_lit;

    #[test]
    fn contradiction_is_unsat() {
        let mut cnf = Cnf::new(1);
        cnf.push(Clause::unit(make_lit(0, true)));
        cnf.push(Clause::unit(make_lit(0, false)));
        assert!(solve(&cnf).is_none());
    }

    #[test]
    fn satisfiable_formula_finds_a_model() {
        let mut cnf = Cnf::new(2);
        cnf.push(Clause::new(vec![make_lit(0, true), make_lit(1, true)]));
        cnf.push(Clause::unit(make_lit(0, false)));
        let model = solve(&cnf).unwrap();
        assert_eq!(model.get(0), TriState::False);
        assert_eq!(model.get(1), TriState::True);
    }
}
