//! Node and arc consistency passes over a solver's domains. Both only ever remove candidates.

use std::collections::{HashMap, HashSet, VecDeque};

use bit_set::BitSet;
use log::debug;

use crate::error::Error;
use crate::solver::Solver;
use crate::types::{VariableId, WordId};

/// `Err` carries the variable whose domain was wiped out.
pub type ArcConsistencyResult = Result<(), Error>;

/// Data structure used in `ac3` to track which arcs we need to revisit. An arc that's already
/// waiting in the queue isn't added a second time.
#[derive(Debug)]
struct ArcQueue {
    queue: VecDeque<(VariableId, VariableId)>,
    queued: BitSet,
    variable_count: usize,
}

impl ArcQueue {
    fn new(variable_count: usize) -> ArcQueue {
        ArcQueue {
            queue: VecDeque::new(),
            queued: BitSet::with_capacity(variable_count * variable_count),
            variable_count,
        }
    }

    fn enqueue(&mut self, x: VariableId, y: VariableId) {
        if self.queued.insert(x * self.variable_count + y) {
            self.queue.push_back((x, y));
        }
    }

    fn pop_front(&mut self) -> Option<(VariableId, VariableId)> {
        let (x, y) = self.queue.pop_front()?;
        self.queued.remove(x * self.variable_count + y);
        Some((x, y))
    }
}

impl Solver<'_> {
    /// Remove every candidate whose length doesn't match its variable's length.
    pub fn enforce_node_consistency(&mut self) {
        let puzzle = self.puzzle;

        let mut words_by_length: HashMap<usize, BitSet> = HashMap::new();
        for (word_id, word) in puzzle.words().iter().enumerate() {
            words_by_length.entry(word.len()).or_default().insert(word_id);
        }

        let no_words = BitSet::new();
        for (variable, domain) in puzzle.variables().iter().zip(&mut self.domains) {
            domain.intersect_with(words_by_length.get(&variable.length).unwrap_or(&no_words));
        }

        debug!(
            "Node consistency left {} candidates across {} variables",
            self.domains.iter().map(BitSet::len).sum::<usize>(),
            self.domains.len()
        );
    }

    /// Make `x` arc consistent with `y`: drop each candidate for `x` that no candidate for `y`
    /// agrees with at their shared cell. Slots that don't cross impose no constraint on each
    /// other, so nothing is ever removed for them. Returns whether `x`'s domain changed.
    pub fn revise(&mut self, x: VariableId, y: VariableId) -> bool {
        let Some((x_cell, y_cell)) = self.puzzle.overlap(x, y) else {
            return false;
        };
        let puzzle = self.puzzle;
        self.statistics.revisions += 1;

        let supported_glyphs: HashSet<char> = self.domains[y]
            .iter()
            .filter_map(|word_id| puzzle.word(word_id).glyphs.get(y_cell).copied())
            .collect();

        let unsupported: Vec<WordId> = self.domains[x]
            .iter()
            .filter(|&word_id| {
                puzzle
                    .word(word_id)
                    .glyphs
                    .get(x_cell)
                    .map_or(true, |glyph| !supported_glyphs.contains(glyph))
            })
            .collect();

        for &word_id in &unsupported {
            self.domains[x].remove(word_id);
        }

        !unsupported.is_empty()
    }

    /// AC-3. Starts from the given arcs, or from every ordered pair of crossing variables if none
    /// are given; pairs that don't cross can never be revised so they're left out. Fails as soon
    /// as any domain is emptied.
    pub fn ac3(&mut self, arcs: Option<&[(VariableId, VariableId)]>) -> ArcConsistencyResult {
        let puzzle = self.puzzle;
        let variable_count = puzzle.variables().len();
        let mut queue = ArcQueue::new(variable_count);

        match arcs {
            Some(arcs) => {
                for &(x, y) in arcs {
                    if x != y {
                        queue.enqueue(x, y);
                    }
                }
            }
            None => {
                for x in 0..variable_count {
                    for &y in puzzle.neighbors(x) {
                        queue.enqueue(x, y);
                    }
                }
            }
        }

        while let Some((x, y)) = queue.pop_front() {
            if !self.revise(x, y) {
                continue;
            }

            if self.domains[x].is_empty() {
                return Err(Error::EmptyDomainDuringPropagation {
                    variable: *puzzle.variable(x),
                });
            }

            // `x` lost candidates, so anything crossing it (besides `y`, which can't be affected)
            // needs another look.
            for &z in puzzle.neighbors(x) {
                if z != y {
                    queue.enqueue(z, x);
                }
            }
        }

        Ok(())
    }
}
