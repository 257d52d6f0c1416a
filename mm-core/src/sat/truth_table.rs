//! Truth-table <-> CNF conversion, grounded in
//! `examples/original_source/src/cnf.cpp`'s Quine-McCluskey-style clause
//! minimization.

use super::cnf::{Clause, Cnf};
use super::model::make_lit;
use super::solver::solve;

/// Build the truth table of the connective whose `k` input atoms and whose
/// reserved output atom (index `k`) are encoded in `cnf` (spec.md 4.F/8): for
/// each of the `2^k` input assignments, force those input atoms AND the
/// output atom positive, and ask whether `cnf` is still satisfiable — i.e.
/// `truthtable(cnf ∪ {output atom positive})`, not merely `cnf`'s
/// satisfiability under the inputs alone. Leaving the output atom free (as a
/// plain existential projection would) is wrong here: `cnf_from_truth_table`
/// only ever constrains the output via a clause that the matching input row
/// reduces to a unit clause on that atom, so with the output free the
/// formula is trivially satisfiable for every row regardless of the table's
/// actual value there.
pub fn truth_table(cnf: &Cnf, k: usize) -> Vec<bool> {
    let k = k.min(cnf.atom_count);
    let mut table = Vec::with_capacity(1 << k);
    for assignment in 0..(1usize << k) {
        let mut extended = cnf.clauses.clone();
        for bit in 0..k {
            let value = (assignment >> bit) & 1 == 1;
            extended.push(Clause::unit(make_lit(bit, value)));
        }
        extended.push(Clause::unit(make_lit(k, true)));
        let probe = Cnf { atom_count: cnf.atom_count, clauses: extended };
        table.push(solve(&probe).is_some());
    }
    table
}

/// All subsets of `mask`, including the empty subset, via the standard
/// submask-enumeration trick.
fn subsets_of(mask: usize) -> impl Iterator<Item = usize> {
    let mut sub = mask;
    let mut done = false;
    std::iter::from_fn(move || {
        if done {
            return None;
        }
        let out = sub;
        if sub == 0 {
            done = true;
        } else {
            sub = (sub - 1) & mask;
        }
        Some(out)
    })
}

/// Whether every row reachable from `start` by flipping any subset of
/// `mask`'s bits has the same output value as `start` itself.
fn class_is_constant(table: &[bool], start: usize, mask: usize) -> bool {
    let base = start & !mask;
    let value = table[base];
    subsets_of(mask).all(|sub| table[base | sub] == value)
}

/// Build a CNF over `argc + 1` atoms (atom `argc` is the reserved output
/// atom) whose models agree with `table` on the first `argc` atoms. Grows
/// one "prime" don't-care mask per uncovered row via the greedy bit-growth
/// BFS of spec.md 4.E, emitting one clause per maximal mask.
pub fn cnf_from_truth_table(table: &[bool]) -> Cnf {
    assert!(table.len().is_power_of_two(), "truth table length must be a power of two");
    let argc = table.len().trailing_zeros() as usize;
    let output_atom = argc;
    let mut covered = vec![false; table.len()];
    let mut clauses = Vec::new();

    for start in 0..table.len() {
        if covered[start] {
            continue;
        }
        let mut mask = 0usize;
        for bit in 0..argc {
            let candidate = mask | (1 << bit);
            if class_is_constant(table, start, candidate) {
                mask = candidate;
            }
        }
        let class_value = table[start];
        let base = start & !mask;
        for sub in subsets_of(mask) {
            covered[base | sub] = true;
        }

        let mut literals = Vec::new();
        for bit in 0..argc {
            if mask & (1 << bit) == 0 {
                let fixed_value = (start >> bit) & 1 == 1;
                literals.push(make_lit(bit, !fixed_value));
            }
        }
        literals.push(make_lit(output_atom, class_value));
        clauses.push(Clause::new(literals));
    }

    Cnf { atom_count: argc + 1, clauses }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_xor() {
        // p XOR q, as a function of 2 inputs.
        let table = vec![false, true, true, false];
        let cnf = cnf_from_truth_table(&table);
        assert_eq!(cnf.atom_count, 3);
        let rebuilt = truth_table(&cnf, 2);
        assert_eq!(rebuilt, table);
    }

    #[test]
    fn round_trips_constant_function() {
        let table = vec![true, true, true, true];
        let cnf = cnf_from_truth_table(&table);
        let rebuilt = truth_table(&cnf, 2);
        assert_eq!(rebuilt, table);
    }

    #[test]
    fn round_trips_implication() {
        // p -> q : rows (p,q) = (F,F)=T (F,T)=T (T,F)=F (T,T)=T, bit0=p, bit1=q
        let table = vec![true, true, false, true];
        let cnf = cnf_from_truth_table(&table);
        let rebuilt = truth_table(&cnf, 2);
        assert_eq!(rebuilt, table);
    }
}
