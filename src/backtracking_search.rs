//! Depth-first backtracking search over partial assignments, using MRV/degree to pick the next
//! slot and least-constraining-value to order its candidates.

use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::fmt::{self, Debug, Formatter};

use bit_set::BitSet;
use log::trace;

use crate::puzzle::Puzzle;
use crate::solver::Solver;
use crate::types::{VariableId, WordId};

/// A mapping from some subset of a puzzle's variables to the words chosen for them.
#[derive(Clone, Default)]
pub struct Assignment {
    words: Vec<Option<WordId>>,
    assigned_count: usize,
}

impl Debug for Assignment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl PartialEq for Assignment {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}

impl Eq for Assignment {}

impl Assignment {
    /// An empty assignment sized for the given puzzle.
    #[must_use]
    pub fn for_puzzle(puzzle: &Puzzle) -> Assignment {
        Assignment {
            words: vec![None; puzzle.variables().len()],
            assigned_count: 0,
        }
    }

    #[must_use]
    pub fn get(&self, variable_id: VariableId) -> Option<WordId> {
        self.words.get(variable_id).copied().flatten()
    }

    #[must_use]
    pub fn is_assigned(&self, variable_id: VariableId) -> bool {
        self.get(variable_id).is_some()
    }

    /// Assign a word to a variable, replacing whatever it held before.
    pub fn assign(&mut self, variable_id: VariableId, word_id: WordId) {
        if variable_id >= self.words.len() {
            self.words.resize(variable_id + 1, None);
        }
        if self.words[variable_id].replace(word_id).is_none() {
            self.assigned_count += 1;
        }
    }

    pub fn unassign(&mut self, variable_id: VariableId) -> Option<WordId> {
        let previous = self.words.get_mut(variable_id).and_then(Option::take);
        if previous.is_some() {
            self.assigned_count -= 1;
        }
        previous
    }

    /// Number of assigned variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.assigned_count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assigned_count == 0
    }

    /// Iterate over `(variable, word)` pairs in variable order.
    pub fn iter(&self) -> impl Iterator<Item = (VariableId, WordId)> + '_ {
        self.words
            .iter()
            .enumerate()
            .filter_map(|(variable_id, word_id)| word_id.map(|word_id| (variable_id, word_id)))
    }
}

/// One level of the search: the variable being filled, its candidates in the order we'll try
/// them, and the domains as they stood before any of those candidates was tried.
struct SearchFrame {
    variable_id: VariableId,
    candidates: Vec<WordId>,
    next_candidate: usize,
    saved_domains: Vec<BitSet>,
}

impl Solver<'_> {
    /// Is every variable in the puzzle assigned?
    #[must_use]
    pub fn assignment_complete(&self, assignment: &Assignment) -> bool {
        assignment.len() == self.puzzle.variables().len()
    }

    /// Check a (possibly partial) assignment: every word fits its slot, no word is used twice, and
    /// crossing slots agree on their shared letter.
    #[must_use]
    pub fn consistent(&self, assignment: &Assignment) -> bool {
        let puzzle = self.puzzle;
        let mut used: HashSet<WordId> = HashSet::with_capacity(assignment.len());

        for (variable_id, word_id) in assignment.iter() {
            let word = puzzle.word(word_id);

            if word.len() != puzzle.variable(variable_id).length || !used.insert(word_id) {
                return false;
            }

            for &neighbor_id in puzzle.neighbors(variable_id) {
                let (Some(neighbor_word_id), Some((cell, neighbor_cell))) = (
                    assignment.get(neighbor_id),
                    puzzle.overlap(variable_id, neighbor_id),
                ) else {
                    continue;
                };

                if word.glyphs.get(cell) != puzzle.word(neighbor_word_id).glyphs.get(neighbor_cell)
                {
                    return false;
                }
            }
        }

        true
    }

    /// Pick the unassigned variable with the fewest remaining candidates, preferring the one that
    /// crosses the most other slots and then the first in canonical order.
    #[must_use]
    pub fn select_unassigned_variable(&self, assignment: &Assignment) -> Option<VariableId> {
        (0..self.puzzle.variables().len())
            .filter(|&variable_id| !assignment.is_assigned(variable_id))
            .min_by_key(|&variable_id| {
                (
                    self.domains[variable_id].len(),
                    Reverse(self.puzzle.neighbors(variable_id).len()),
                )
            })
    }

    /// The candidates for `variable_id`, least constraining first: each is scored by how many
    /// candidates it would rule out across the crossing slots. Words already used elsewhere in the
    /// assignment are skipped since they can never be consistent.
    #[must_use]
    pub fn order_domain_values(
        &self,
        variable_id: VariableId,
        assignment: &Assignment,
    ) -> Vec<WordId> {
        let puzzle = self.puzzle;
        let used: HashSet<WordId> = assignment.iter().map(|(_, word_id)| word_id).collect();

        let mut values: Vec<WordId> = self.domains[variable_id]
            .iter()
            .filter(|word_id| !used.contains(word_id))
            .collect();

        if !self.options.least_constraining_value {
            return values;
        }

        // For each crossing slot: our cell index, its candidate count, and how many of its
        // candidates place each glyph in the shared cell.
        let crossing_glyph_counts: Vec<(usize, usize, HashMap<char, usize>)> = puzzle
            .neighbors(variable_id)
            .iter()
            .filter_map(|&neighbor_id| {
                let (cell, neighbor_cell) = puzzle.overlap(variable_id, neighbor_id)?;
                let neighbor_domain = &self.domains[neighbor_id];

                let mut glyph_counts: HashMap<char, usize> = HashMap::new();
                for word_id in neighbor_domain {
                    if let Some(&glyph) = puzzle.word(word_id).glyphs.get(neighbor_cell) {
                        *glyph_counts.entry(glyph).or_insert(0) += 1;
                    }
                }

                Some((cell, neighbor_domain.len(), glyph_counts))
            })
            .collect();

        values.sort_by_cached_key(|&word_id| {
            let word = puzzle.word(word_id);

            crossing_glyph_counts
                .iter()
                .map(|(cell, total, glyph_counts)| {
                    let compatible = word
                        .glyphs
                        .get(*cell)
                        .and_then(|glyph| glyph_counts.get(glyph))
                        .copied()
                        .unwrap_or(0);
                    total - compatible
                })
                .sum::<usize>()
        });

        values
    }

    /// Extend the given assignment to a complete, consistent one, or return `None` if none exists
    /// (including when the given assignment is already inconsistent). The first complete
    /// assignment found wins.
    ///
    /// Each level of the search snapshots the domains before trying its candidates and restores
    /// that snapshot before every attempt and when giving up, so pruning done on a dead branch
    /// never leaks into its siblings. The solver's domains are the same on return as on entry.
    pub fn backtrack(&mut self, mut assignment: Assignment) -> Option<Assignment> {
        let puzzle = self.puzzle;
        let mut stack: Vec<SearchFrame> = vec![];

        // Every assignment made below is checked, so only the starting one needs it here.
        if !self.consistent(&assignment) {
            return None;
        }

        'search: loop {
            if self.assignment_complete(&assignment) {
                self.restore_root_domains(stack);
                return Some(assignment);
            }

            // An incomplete assignment with nothing left to assign names slots this puzzle
            // doesn't have.
            let Some(variable_id) = self.select_unassigned_variable(&assignment) else {
                self.restore_root_domains(stack);
                return None;
            };

            stack.push(SearchFrame {
                variable_id,
                candidates: self.order_domain_values(variable_id, &assignment),
                next_candidate: 0,
                saved_domains: self.domains.clone(),
            });
            self.statistics.states += 1;

            // Find the next candidate that holds up, unwinding exhausted frames as we go.
            loop {
                let frame = stack.last_mut()?;
                assignment.unassign(frame.variable_id);
                self.domains.clone_from(&frame.saved_domains);

                let Some(&word_id) = frame.candidates.get(frame.next_candidate) else {
                    trace!("Backtracking from {}", puzzle.variable(frame.variable_id));
                    stack.pop();
                    self.statistics.backtracks += 1;
                    continue;
                };
                frame.next_candidate += 1;
                let variable_id = frame.variable_id;

                assignment.assign(variable_id, word_id);
                if self.consistent(&assignment) && self.infer(variable_id, word_id, &assignment) {
                    trace!(
                        "Assigned {} to {}",
                        puzzle.word(word_id).string,
                        puzzle.variable(variable_id)
                    );
                    continue 'search;
                }
            }
        }
    }

    fn restore_root_domains(&mut self, stack: Vec<SearchFrame>) {
        if let Some(root) = stack.into_iter().next() {
            self.domains = root.saved_domains;
        }
    }

    /// Propagate `variable_id = word_id` into the open slots: narrow the slot's own domain to the
    /// word, take the word away from every unassigned slot, and re-establish arc consistency
    /// around everything that changed. Returns false if any domain was wiped out.
    fn infer(&mut self, variable_id: VariableId, word_id: WordId, assignment: &Assignment) -> bool {
        if !self.options.maintain_arc_consistency {
            return true;
        }

        let puzzle = self.puzzle;

        let domain = &mut self.domains[variable_id];
        domain.clear();
        domain.insert(word_id);

        let mut arcs: Vec<(VariableId, VariableId)> = puzzle
            .neighbors(variable_id)
            .iter()
            .map(|&neighbor_id| (neighbor_id, variable_id))
            .collect();

        for other_id in 0..puzzle.variables().len() {
            if other_id == variable_id || assignment.is_assigned(other_id) {
                continue;
            }

            if self.domains[other_id].remove(word_id) {
                if self.domains[other_id].is_empty() {
                    return false;
                }
                arcs.extend(
                    puzzle
                        .neighbors(other_id)
                        .iter()
                        .map(|&neighbor_id| (neighbor_id, other_id)),
                );
            }
        }

        self.ac3(Some(&arcs)).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::puzzle::Direction::{Across, Down};
    use crate::word_list::parse_word_list;
    use crate::{SolverOptions, Variable};

    const STRUCTURE: &str = include_str!("../data/structure1.txt");
    const WORDS: &str = include_str!("../data/words1.txt");

    fn crossing_pair() -> Puzzle {
        Puzzle::from_variables(
            vec![Variable::new(0, 0, Across, 3), Variable::new(0, 1, Down, 3)],
            ["cat", "car", "art", "tar"],
        )
        .unwrap()
    }

    fn domains_snapshot(solver: &Solver) -> Vec<Vec<WordId>> {
        (0..solver.puzzle().variables().len())
            .map(|variable_id| solver.domain(variable_id).iter().collect())
            .collect()
    }

    #[test]
    fn test_assignment_bookkeeping() {
        let mut assignment = Assignment::default();
        assert!(assignment.is_empty());

        assignment.assign(2, 7);
        assignment.assign(0, 3);
        assignment.assign(2, 8);
        assert_eq!(assignment.len(), 2);
        assert_eq!(assignment.iter().collect::<Vec<_>>(), vec![(0, 3), (2, 8)]);

        assert_eq!(assignment.unassign(2), Some(8));
        assert_eq!(assignment.unassign(2), None);
        assert_eq!(assignment.unassign(10), None);
        assert_eq!(assignment.len(), 1);
        assert!(!assignment.is_assigned(2));
    }

    #[test]
    fn test_consistency_checks() {
        let puzzle = crossing_pair();
        let solver = Solver::new(&puzzle, SolverOptions::default());
        let word = |s: &str| puzzle.word_id(s).unwrap();

        let mut assignment = Assignment::for_puzzle(&puzzle);
        assert!(solver.consistent(&assignment), "empty assignment");
        assert!(!solver.assignment_complete(&assignment));

        assignment.assign(0, word("car"));
        assignment.assign(1, word("art"));
        assert!(solver.consistent(&assignment));
        assert!(solver.assignment_complete(&assignment));

        assignment.assign(1, word("tar"));
        assert!(!solver.consistent(&assignment), "crossing letters differ");

        let puzzle = Puzzle::from_template("___\n###\n___", ["cat", "dog"]).unwrap();
        let solver = Solver::new(&puzzle, SolverOptions::default());
        let mut assignment = Assignment::for_puzzle(&puzzle);
        assignment.assign(0, puzzle.word_id("cat").unwrap());
        assignment.assign(1, puzzle.word_id("cat").unwrap());
        assert!(!solver.consistent(&assignment), "duplicate words");
        assignment.assign(1, puzzle.word_id("dog").unwrap());
        assert!(solver.consistent(&assignment));

        let puzzle = Puzzle::from_template("___", ["cat", "oxen"]).unwrap();
        let solver = Solver::new(&puzzle, SolverOptions::default());
        let mut assignment = Assignment::for_puzzle(&puzzle);
        assignment.assign(0, puzzle.word_id("oxen").unwrap());
        assert!(!solver.consistent(&assignment), "wrong length");
    }

    #[test]
    fn test_select_unassigned_variable() {
        let puzzle =
            Puzzle::from_template("___\n_#_\n_#_", ["abc", "cab", "bca", "aaa"]).unwrap();
        let mut solver = Solver::new(&puzzle, SolverOptions::default());
        solver.enforce_node_consistency();

        // Equal domains, so the across entry wins on degree.
        let mut assignment = Assignment::for_puzzle(&puzzle);
        assert_eq!(solver.select_unassigned_variable(&assignment), Some(0));

        // Equal domains and degrees, so canonical order decides.
        assignment.assign(0, 0);
        assert_eq!(solver.select_unassigned_variable(&assignment), Some(1));

        // Smallest domain beats everything else.
        solver.domains[2].remove(0);
        assert_eq!(solver.select_unassigned_variable(&assignment), Some(2));

        assignment.assign(1, 1);
        assignment.assign(2, 2);
        assert_eq!(solver.select_unassigned_variable(&assignment), None);
    }

    #[test]
    fn test_order_domain_values() {
        let puzzle = crossing_pair();
        let mut solver = Solver::new(&puzzle, SolverOptions::default());
        solver.enforce_node_consistency();
        let words = |ids: Vec<WordId>| -> Vec<String> {
            ids.into_iter().map(|id| puzzle.word(id).string.clone()).collect()
        };

        let mut assignment = Assignment::for_puzzle(&puzzle);
        assert_eq!(
            words(solver.order_domain_values(0, &assignment)),
            vec!["car", "cat", "tar", "art"]
        );

        assignment.assign(1, puzzle.word_id("car").unwrap());
        assert_eq!(
            words(solver.order_domain_values(0, &assignment)),
            vec!["cat", "tar", "art"]
        );

        let mut solver = Solver::new(
            &puzzle,
            SolverOptions {
                least_constraining_value: false,
                ..SolverOptions::default()
            },
        );
        solver.enforce_node_consistency();
        assert_eq!(
            words(solver.order_domain_values(0, &Assignment::for_puzzle(&puzzle))),
            vec!["art", "car", "cat", "tar"]
        );
    }

    #[test]
    fn test_backtrack_restores_domains() {
        let puzzle = Puzzle::from_template(STRUCTURE, parse_word_list(WORDS)).unwrap();
        let mut solver = Solver::new(&puzzle, SolverOptions::default());
        solver.enforce_node_consistency();
        solver.ac3(None).unwrap();
        let before = domains_snapshot(&solver);

        let assignment = solver
            .backtrack(Assignment::for_puzzle(&puzzle))
            .expect("Failed to find a fill");

        assert!(solver.assignment_complete(&assignment));
        assert!(solver.consistent(&assignment));
        assert_eq!(domains_snapshot(&solver), before);
    }

    #[test]
    fn test_failed_backtrack_restores_domains() {
        let puzzle = Puzzle::from_template("___\n###\n___\n###\n___", ["cat", "dog"]).unwrap();
        let mut solver = Solver::new(&puzzle, SolverOptions::default());
        solver.enforce_node_consistency();
        let before = domains_snapshot(&solver);

        assert_eq!(solver.backtrack(Assignment::for_puzzle(&puzzle)), None);
        assert_eq!(domains_snapshot(&solver), before);
        assert!(solver.statistics().backtracks > 0);
    }

    #[test]
    fn test_backtrack_rejects_inconsistent_start() {
        let puzzle = crossing_pair();
        let mut solver = Solver::new(&puzzle, SolverOptions::default());
        solver.enforce_node_consistency();
        let before = domains_snapshot(&solver);

        let mut assignment = Assignment::for_puzzle(&puzzle);
        assignment.assign(0, puzzle.word_id("car").unwrap());
        assignment.assign(1, puzzle.word_id("tar").unwrap());
        assert!(solver.assignment_complete(&assignment));
        assert_eq!(solver.backtrack(assignment.clone()), None);

        assignment.unassign(1);
        assignment.assign(0, puzzle.word_id("art").unwrap());
        assignment.assign(1, puzzle.word_id("art").unwrap());
        assert_eq!(solver.backtrack(assignment), None, "word used twice");

        assert_eq!(domains_snapshot(&solver), before);
        assert_eq!(solver.statistics().states, 0);
    }

    #[test]
    fn test_dead_branch_pruning_does_not_leak_into_siblings() {
        // The across slot tries "abc" first; nothing starts with "b", so every down candidate
        // fails under it. The same down candidates must still be available once the across
        // slot moves on to "acd", where "cab" fits.
        let puzzle = Puzzle::from_variables(
            vec![Variable::new(0, 0, Across, 3), Variable::new(0, 1, Down, 3)],
            ["abc", "acd", "cab"],
        )
        .unwrap();

        for maintain_arc_consistency in [false, true] {
            let options = SolverOptions {
                initial_arc_consistency: false,
                maintain_arc_consistency,
                least_constraining_value: false,
            };
            let mut solver = Solver::new(&puzzle, options);
            solver.enforce_node_consistency();
            let before = domains_snapshot(&solver);

            let assignment = solver
                .backtrack(Assignment::for_puzzle(&puzzle))
                .expect("Failed to find a fill");

            assert_eq!(assignment.get(0), puzzle.word_id("acd"));
            assert_eq!(assignment.get(1), puzzle.word_id("cab"));
            if !maintain_arc_consistency {
                assert!(solver.statistics().backtracks > 0);
            }
            assert_eq!(domains_snapshot(&solver), before);
        }
    }

    #[test]
    fn test_backtrack_extends_partial_assignment() {
        let puzzle = crossing_pair();
        let mut solver = Solver::new(&puzzle, SolverOptions::default());
        solver.enforce_node_consistency();

        let mut assignment = Assignment::for_puzzle(&puzzle);
        assignment.assign(0, puzzle.word_id("tar").unwrap());

        let result = solver.backtrack(assignment).expect("Failed to find a fill");

        assert_eq!(result.get(0), puzzle.word_id("tar"));
        assert_eq!(result.get(1), puzzle.word_id("art"));
    }
}
