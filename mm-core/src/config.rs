//! Runtime-tunable search parameters (SPEC_FULL.md 1.3's ambient
//! configuration layer). `mm-core` stays I/O-free (spec.md 3's ownership
//! summary); `mm-cli` owns reading a `toml` file and falling back to
//! [`SearchParams::default`] when none is given.

use serde::{Deserialize, Serialize};

/// Knobs for [`crate::search`]'s MCTS-driven proof search (spec.md 4.H/I,
/// and 9's Open Questions on staging and exploration constants).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    /// UCB exploration constants, indexed `[our_turn as usize]` (spec.md
    /// 4.H).
    pub exploration: [f64; 2],
    /// Hard cap on the number of tree nodes a single proof search may
    /// allocate before giving up with `MmError::SizeExceeded`.
    pub tree_size_cap: usize,
    /// Staged move generation (bound moves first, free-variable moves once
    /// a node's UCB crosses a threshold) vs. generating every move at
    /// once. Off by default (spec.md 9's Open Question).
    pub staged_generation: bool,
    /// Hard cap on moves considered per node; also bounds the free-variable
    /// candidate pool size in `crate::search::movegen`.
    pub max_moves: usize,
    /// Upper bound on the subterm pool consulted when a theorem has a
    /// floating variable left unbound by matching the goal
    /// (`crate::search::movegen::generate_moves`).
    pub numberlimit: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        SearchParams {
            exploration: [0.25, 0.25],
            tree_size_cap: 200_000,
            staged_generation: false,
            max_moves: 64,
            numberlimit: 16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_toml() {
        let params = SearchParams::default();
        let text = toml::to_string(&params).unwrap();
        let back: SearchParams = toml::from_str(&text).unwrap();
        assert_eq!(params, back);
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let params: SearchParams = toml::from_str("max_moves = 10").unwrap();
        assert_eq!(params.max_moves, 10);
        assert_eq!(params.tree_size_cap, SearchParams::default().tree_size_cap);
    }
}
