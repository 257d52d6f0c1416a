//! Components I/J — the MCTS-driven proof search: environments, goals,
//! move generation, and the `Problem` driver that ties them to
//! `crate::mcts::Tree` (spec.md 4.I/4.J).

pub mod environ;
pub mod goal;
pub mod movegen;
pub mod problem;

pub use environ::{EnvironId, Environment, Environments};
pub use goal::{Goal, GoalStatus};
pub use problem::{search_for_proof, SearchOutcome};
