pub mod arc_consistency;
pub mod backtracking_search;
pub mod error;
pub mod puzzle;
pub mod solver;
pub mod types;
pub mod word_list;

pub use backtracking_search::Assignment;
pub use error::Error;
pub use puzzle::{Crossing, Direction, Puzzle, Variable};
pub use solver::{NoSolution, Solution, Solver, SolverOptions, Statistics};

/// The expected maximum length for a single slot. Longer slots still work, they just spill to the
/// heap.
pub const MAX_SLOT_LENGTH: usize = 21;
