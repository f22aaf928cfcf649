//! The constraint solver that ties the consistency passes and the search together.

use bit_set::BitSet;
use instant::{Duration, Instant};
use log::{debug, info};

use crate::backtracking_search::Assignment;
use crate::error::Error;
use crate::puzzle::{Puzzle, Variable};
use crate::types::{VariableId, WordId};

/// Knobs controlling which pruning and ordering techniques the solver applies. None of them affect
/// correctness, only how much of the search space gets visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolverOptions {
    /// Run a global AC-3 pass after node consistency, before any search.
    pub initial_arc_consistency: bool,

    /// After each tentative assignment, drop the chosen word from the other open slots and
    /// re-establish arc consistency around the assigned slot.
    pub maintain_arc_consistency: bool,

    /// Try each slot's candidates in least-constraining-value order rather than vocabulary order.
    pub least_constraining_value: bool,
}

impl Default for SolverOptions {
    fn default() -> Self {
        SolverOptions {
            initial_arc_consistency: true,
            maintain_arc_consistency: true,
            least_constraining_value: true,
        }
    }
}

/// A struct tracking statistics about the solving process.
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    pub states: u64,
    pub backtracks: u64,
    pub revisions: u64,
    pub duration: Duration,
}

/// A struct representing the results of a successful solve.
#[derive(Debug)]
pub struct Solution {
    pub assignment: Assignment,
    pub statistics: Statistics,
}

/// The ways a solve can come up empty. Neither is an error: the input was valid, it just has no
/// fill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoSolution {
    /// Some variable was left without candidates before search began.
    EmptyDomain(Variable),

    /// Every branch of the search was explored without finding a complete assignment.
    Exhausted,
}

/// Owns the per-variable domains for a single puzzle. Domains start out as the full vocabulary
/// and are narrowed by `solve`.
#[derive(Debug)]
pub struct Solver<'a> {
    pub(crate) puzzle: &'a Puzzle,
    pub(crate) options: SolverOptions,
    pub(crate) domains: Vec<BitSet>,
    pub(crate) statistics: Statistics,
}

impl<'a> Solver<'a> {
    #[must_use]
    pub fn new(puzzle: &'a Puzzle, options: SolverOptions) -> Solver<'a> {
        let word_count = puzzle.words().len();

        Solver {
            puzzle,
            options,
            domains: puzzle
                .variables()
                .iter()
                .map(|_| (0..word_count).collect())
                .collect(),
            statistics: Statistics::default(),
        }
    }

    #[must_use]
    pub fn puzzle(&self) -> &'a Puzzle {
        self.puzzle
    }

    #[must_use]
    pub fn options(&self) -> SolverOptions {
        self.options
    }

    #[must_use]
    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    /// The current candidates for the given variable.
    #[must_use]
    pub fn domain(&self, variable_id: VariableId) -> &BitSet {
        &self.domains[variable_id]
    }

    /// The current candidates for the given variable, as strings.
    #[must_use]
    pub fn domain_words(&self, variable_id: VariableId) -> Vec<&'a str> {
        let puzzle = self.puzzle;
        self.domains[variable_id]
            .iter()
            .map(|word_id: WordId| puzzle.word(word_id).string.as_str())
            .collect()
    }

    /// Enforce node and arc consistency, then search for a complete assignment.
    pub fn solve(&mut self) -> Result<Solution, NoSolution> {
        let start = Instant::now();
        self.statistics = Statistics::default();

        info!(
            "Solving {} variables against {} words",
            self.puzzle.variables().len(),
            self.puzzle.words().len()
        );

        self.enforce_node_consistency();

        if let Some(variable_id) = self.domains.iter().position(BitSet::is_empty) {
            let variable = *self.puzzle.variable(variable_id);
            debug!("No words fit {variable}");
            return Err(NoSolution::EmptyDomain(variable));
        }

        if self.options.initial_arc_consistency {
            if let Err(Error::EmptyDomainDuringPropagation { variable }) = self.ac3(None) {
                debug!("Arc consistency emptied {variable}");
                return Err(NoSolution::EmptyDomain(variable));
            }
        }

        let result = self.backtrack(Assignment::for_puzzle(self.puzzle));
        self.statistics.duration = start.elapsed();

        info!("{:?}", self.statistics);

        match result {
            Some(assignment) => Ok(Solution {
                assignment,
                statistics: self.statistics.clone(),
            }),
            None => {
                debug!("Search space exhausted");
                Err(NoSolution::Exhausted)
            }
        }
    }
}
