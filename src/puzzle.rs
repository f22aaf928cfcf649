//! This module describes the static side of a crossword: which cells are fillable, the slots
//! (variables) those cells form, where slots cross each other, and the vocabulary available for
//! filling them. Nothing here changes once a `Puzzle` is built.

use std::collections::HashMap;
use std::fmt::{self, Debug, Display, Formatter};
use std::str::FromStr;

use smallvec::SmallVec;

use crate::backtracking_search::Assignment;
use crate::error::Error;
use crate::types::{GridCoord, VariableId, WordId};
use crate::word_list::{build_words, Word};
use crate::MAX_SLOT_LENGTH;

/// The direction that a slot is facing.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum Direction {
    Across,
    Down,
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "across" => Ok(Direction::Across),
            "down" => Ok(Direction::Down),
            other => Err(Error::MalformedStructure(format!(
                "Unknown direction '{other}'"
            ))),
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Across => write!(f, "across"),
            Direction::Down => write!(f, "down"),
        }
    }
}

/// A single word slot in the grid. The derived ordering (row, then column, then direction, then
/// length) is the canonical order in which variables are enumerated.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Variable {
    pub row: usize,
    pub col: usize,
    pub direction: Direction,
    pub length: usize,
}

impl Variable {
    #[must_use]
    pub fn new(row: usize, col: usize, direction: Direction, length: usize) -> Variable {
        Variable {
            row,
            col,
            direction,
            length,
        }
    }

    /// The coords of the cell at the given index within this slot.
    #[must_use]
    pub fn cell(&self, cell_idx: usize) -> GridCoord {
        match self.direction {
            Direction::Across => (self.row, self.col + cell_idx),
            Direction::Down => (self.row + cell_idx, self.col),
        }
    }

    /// Generate the coords for each cell of this slot.
    pub fn cell_coords(&self) -> impl Iterator<Item = GridCoord> {
        let variable = *self;
        (0..self.length).map(move |cell_idx| variable.cell(cell_idx))
    }

    /// The index of the given cell within this slot, if the slot covers it.
    #[must_use]
    pub fn cell_index(&self, (row, col): GridCoord) -> Option<usize> {
        let (fixed, start, moving) = match self.direction {
            Direction::Across => (self.row == row, self.col, col),
            Direction::Down => (self.col == col, self.row, row),
        };

        if fixed && moving >= start && moving < start + self.length {
            Some(moving - start)
        } else {
            None
        }
    }
}

impl Display for Variable {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}) {} : {}",
            self.row, self.col, self.direction, self.length
        )
    }
}

/// A struct representing a crossing between one slot and another, referencing the other slot's id
/// and the location of the intersection within the other slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crossing {
    pub other_variable_id: VariableId,
    pub other_cell: usize,
}

type Crossings = SmallVec<[Option<Crossing>; MAX_SLOT_LENGTH]>;

/// The grid geometry and vocabulary for a crossword, read-only once constructed.
pub struct Puzzle {
    height: usize,
    width: usize,
    structure: Vec<Vec<bool>>,
    variables: Vec<Variable>,
    crossings: Vec<Crossings>,
    neighbors: Vec<SmallVec<[VariableId; MAX_SLOT_LENGTH]>>,
    words: Vec<Word>,
}

impl Debug for Puzzle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Puzzle")
            .field("height", &self.height)
            .field("width", &self.width)
            .field("variables", &self.variables)
            .field("words", &format!("({} entries)", self.words.len()))
            .finish()
    }
}

impl Puzzle {
    /// Build a puzzle from a rectangular grid where `true` marks a fillable cell. Variables are
    /// the runs of two or more fillable cells in each row (across) and column (down).
    pub fn new<I, S>(structure: Vec<Vec<bool>>, words: I) -> Result<Puzzle, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let width = structure.first().map_or(0, Vec::len);
        if structure.is_empty() || width == 0 {
            return Err(Error::MalformedStructure(
                "Grid must have at least one row and one column".into(),
            ));
        }
        if let Some(row) = structure.iter().position(|row| row.len() != width) {
            return Err(Error::MalformedStructure(format!(
                "Row {row} has {} cells, expected {width}",
                structure[row].len()
            )));
        }

        let variables = derive_variables(&structure);
        Puzzle::build(structure, variables, words)
    }

    /// Build a puzzle from a structure template, with `_` or `.` representing fillable cells and
    /// anything else (including spaces) representing blocks. Blank lines before the first row and
    /// after the last are skipped, but a blank line between rows is a fully blocked row. Every
    /// character keeps its column, and short rows are treated as blocked past their end.
    pub fn from_template<I, S>(template: &str, words: I) -> Result<Puzzle, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let lines: Vec<&str> = template.lines().collect();
        let first = lines.iter().position(|line| !line.trim().is_empty());
        let last = lines.iter().rposition(|line| !line.trim().is_empty());
        let rows: &[&str] = match (first, last) {
            (Some(first), Some(last)) => &lines[first..=last],
            _ => &[],
        };

        let cells: Vec<Vec<bool>> = rows
            .iter()
            .map(|line| line.chars().map(|c| c == '_' || c == '.').collect())
            .collect();
        let width = cells.iter().map(Vec::len).max().unwrap_or(0);

        let structure: Vec<Vec<bool>> = cells
            .into_iter()
            .map(|mut row| {
                row.resize(width, false);
                row
            })
            .collect();

        Puzzle::new(structure, words)
    }

    /// Build a puzzle from an explicit list of slots. The grid spans the slots' bounding box and
    /// any cell not covered by a slot is blocked.
    pub fn from_variables<I, S>(variables: Vec<Variable>, words: I) -> Result<Puzzle, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if variables.is_empty() {
            return Err(Error::MalformedStructure(
                "At least one variable is required".into(),
            ));
        }
        check_variable_lengths(&variables)?;

        let (height, width) = variables.iter().fold((0, 0), |(height, width), variable| {
            let (last_row, last_col) = variable.cell(variable.length - 1);
            (height.max(last_row + 1), width.max(last_col + 1))
        });

        let mut structure = vec![vec![false; width]; height];
        for variable in &variables {
            for (row, col) in variable.cell_coords() {
                structure[row][col] = true;
            }
        }

        Puzzle::build(structure, variables, words)
    }

    fn build<I, S>(
        structure: Vec<Vec<bool>>,
        mut variables: Vec<Variable>,
        words: I,
    ) -> Result<Puzzle, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        check_variable_lengths(&variables)?;

        variables.sort();
        if let Some(pair) = variables.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(Error::MalformedStructure(format!(
                "Variable {} appears more than once",
                pair[0]
            )));
        }

        let height = structure.len();
        let width = structure.first().map_or(0, Vec::len);

        // Build a map from cell location to the slots covering it, which we can then use to
        // calculate crossings.
        let mut cells: HashMap<GridCoord, SmallVec<[(VariableId, usize); 2]>> = HashMap::new();
        for (variable_id, variable) in variables.iter().enumerate() {
            for (cell_idx, (row, col)) in variable.cell_coords().enumerate() {
                if row >= height || col >= width || !structure[row][col] {
                    return Err(Error::MalformedStructure(format!(
                        "Variable {variable} covers a cell outside the fillable grid"
                    )));
                }

                let entries = cells.entry((row, col)).or_default();
                entries.push((variable_id, cell_idx));
                if entries.len() > 2 {
                    return Err(Error::MalformedStructure(format!(
                        "More than two variables cross at ({row}, {col})"
                    )));
                }
            }
        }

        let mut crossings: Vec<Crossings> = Vec::with_capacity(variables.len());
        let mut neighbors: Vec<SmallVec<[VariableId; MAX_SLOT_LENGTH]>> =
            Vec::with_capacity(variables.len());

        for (variable_id, variable) in variables.iter().enumerate() {
            let variable_crossings: Crossings = variable
                .cell_coords()
                .map(|loc| {
                    cells[&loc]
                        .iter()
                        .find(|&&(other, _)| other != variable_id)
                        .map(|&(other_variable_id, other_cell)| Crossing {
                            other_variable_id,
                            other_cell,
                        })
                })
                .collect();

            let mut variable_neighbors: SmallVec<[VariableId; MAX_SLOT_LENGTH]> = variable_crossings
                .iter()
                .flatten()
                .map(|crossing| crossing.other_variable_id)
                .collect();
            variable_neighbors.sort_unstable();
            if variable_neighbors.windows(2).any(|pair| pair[0] == pair[1]) {
                return Err(Error::MalformedStructure(format!(
                    "Variable {variable} shares more than one cell with another variable"
                )));
            }

            crossings.push(variable_crossings);
            neighbors.push(variable_neighbors);
        }

        Ok(Puzzle {
            height,
            width,
            structure,
            variables,
            crossings,
            neighbors,
            words: build_words(words),
        })
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn is_fillable(&self, row: usize, col: usize) -> bool {
        self.structure
            .get(row)
            .and_then(|cells| cells.get(col))
            .copied()
            .unwrap_or(false)
    }

    /// All slots, in canonical order; a slot's position here is its `VariableId`.
    #[must_use]
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    #[must_use]
    pub fn variable(&self, variable_id: VariableId) -> &Variable {
        &self.variables[variable_id]
    }

    #[must_use]
    pub fn variable_id(&self, variable: &Variable) -> Option<VariableId> {
        self.variables.binary_search(variable).ok()
    }

    /// The crossing (if any) at each cell of the given slot.
    #[must_use]
    pub fn crossings(&self, variable_id: VariableId) -> &[Option<Crossing>] {
        &self.crossings[variable_id]
    }

    /// Ids of every slot sharing a cell with the given one, ascending.
    #[must_use]
    pub fn neighbors(&self, variable_id: VariableId) -> &[VariableId] {
        &self.neighbors[variable_id]
    }

    /// If `a` and `b` share a cell, return `(ia, ib)` such that cell `ia` of `a` is cell `ib` of
    /// `b`.
    #[must_use]
    pub fn overlap(&self, a: VariableId, b: VariableId) -> Option<(usize, usize)> {
        if a == b {
            return None;
        }

        self.crossings[a]
            .iter()
            .enumerate()
            .find_map(|(cell_idx, crossing)| match crossing {
                Some(crossing) if crossing.other_variable_id == b => {
                    Some((cell_idx, crossing.other_cell))
                }
                _ => None,
            })
    }

    #[must_use]
    pub fn words(&self) -> &[Word] {
        &self.words
    }

    #[must_use]
    pub fn word(&self, word_id: WordId) -> &Word {
        &self.words[word_id]
    }

    #[must_use]
    pub fn word_id(&self, word: &str) -> Option<WordId> {
        self.words
            .binary_search_by(|candidate| candidate.string.as_str().cmp(word))
            .ok()
    }

    /// The letter the given assignment places at `(row, col)`, if any.
    #[must_use]
    pub fn placement_at(&self, assignment: &Assignment, row: usize, col: usize) -> Option<char> {
        assignment.iter().find_map(|(variable_id, word_id)| {
            self.variables[variable_id]
                .cell_index((row, col))
                .and_then(|cell_idx| self.words[word_id].glyphs.get(cell_idx).copied())
        })
    }

    /// A `height` x `width` array of the letters placed by the given assignment.
    #[must_use]
    pub fn letter_grid(&self, assignment: &Assignment) -> Vec<Vec<Option<char>>> {
        let mut letters = vec![vec![None; self.width]; self.height];

        for (variable_id, word_id) in assignment.iter() {
            let variable = &self.variables[variable_id];
            for ((row, col), &glyph) in variable.cell_coords().zip(&self.words[word_id].glyphs) {
                letters[row][col] = Some(glyph);
            }
        }

        letters
    }

    /// Turn the given assignment into a rendered string, with blocks drawn as `█` and unfilled
    /// cells left blank.
    #[must_use]
    pub fn render_grid(&self, assignment: &Assignment) -> String {
        let letters = self.letter_grid(assignment);

        (0..self.height)
            .map(|row| {
                (0..self.width)
                    .map(|col| {
                        if self.structure[row][col] {
                            letters[row][col].unwrap_or(' ')
                        } else {
                            '█'
                        }
                    })
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn check_variable_lengths(variables: &[Variable]) -> Result<(), Error> {
    match variables.iter().find(|variable| variable.length < 2) {
        Some(variable) => Err(Error::MalformedStructure(format!(
            "Variable {variable} is shorter than two cells"
        ))),
        None => Ok(()),
    }
}

/// Scan a rectangular grid for runs of at least two fillable cells.
fn derive_variables(structure: &[Vec<bool>]) -> Vec<Variable> {
    let height = structure.len();
    let width = structure.first().map_or(0, Vec::len);
    let mut variables = vec![];

    for row in 0..height {
        for col in 0..width {
            if !structure[row][col] {
                continue;
            }

            if col == 0 || !structure[row][col - 1] {
                let length = (col..width).take_while(|&c| structure[row][c]).count();
                if length > 1 {
                    variables.push(Variable::new(row, col, Direction::Across, length));
                }
            }

            if row == 0 || !structure[row - 1][col] {
                let length = (row..height).take_while(|&r| structure[r][col]).count();
                if length > 1 {
                    variables.push(Variable::new(row, col, Direction::Down, length));
                }
            }
        }
    }

    variables
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Direction::{Across, Down};

    const STRUCTURE: &str = include_str!("../data/structure1.txt");
    const WORDS: &str = include_str!("../data/words1.txt");

    fn load_puzzle() -> Puzzle {
        Puzzle::from_template(STRUCTURE, crate::word_list::parse_word_list(WORDS))
            .expect("Failed to build puzzle")
    }

    #[test]
    fn test_variables_are_derived_in_canonical_order() {
        let puzzle = load_puzzle();

        assert_eq!(
            puzzle.variables(),
            &[
                Variable::new(0, 0, Across, 4),
                Variable::new(0, 0, Down, 4),
                Variable::new(0, 2, Down, 4),
                Variable::new(2, 0, Across, 4),
            ]
        );
        assert_eq!(puzzle.height(), 4);
        assert_eq!(puzzle.width(), 4);
    }

    #[test]
    fn test_overlaps_are_symmetric() {
        let puzzle = load_puzzle();

        // 0 = top across, 2 = right down
        assert_eq!(puzzle.overlap(0, 2), Some((2, 0)));
        assert_eq!(puzzle.overlap(2, 0), Some((0, 2)));
        assert_eq!(puzzle.overlap(0, 3), None, "parallel entries don't cross");
        assert_eq!(puzzle.overlap(1, 1), None);

        for a in 0..puzzle.variables().len() {
            for b in 0..puzzle.variables().len() {
                assert_eq!(
                    puzzle.overlap(a, b).map(|(x, y)| (y, x)),
                    puzzle.overlap(b, a)
                );
            }
        }
    }

    #[test]
    fn test_neighbors() {
        let puzzle = load_puzzle();

        assert_eq!(puzzle.neighbors(0), &[1, 2]);
        assert_eq!(puzzle.neighbors(1), &[0, 3]);
        assert_eq!(puzzle.neighbors(3), &[1, 2]);
    }

    #[test]
    fn test_single_row_grid() {
        let puzzle = Puzzle::from_template("___", ["cat", "dog", "ox"]).unwrap();

        assert_eq!(puzzle.variables(), &[Variable::new(0, 0, Across, 3)]);
        assert!(puzzle.neighbors(0).is_empty());
        assert_eq!(puzzle.words().len(), 3);
    }

    #[test]
    fn test_short_template_rows_are_padded() {
        let puzzle = Puzzle::from_template("___\n_\n_#_\n", ["abc"]).unwrap();

        assert_eq!(puzzle.width(), 3);
        assert!(!puzzle.is_fillable(1, 2));
        assert_eq!(
            puzzle.variables(),
            &[Variable::new(0, 0, Across, 3), Variable::new(0, 0, Down, 3)]
        );
    }

    #[test]
    fn test_template_blank_rows_and_leading_blocks() {
        // A blank line between rows is a blocked row, so the two cells don't form a slot.
        let puzzle = Puzzle::from_template("\n_\n\n_\n\n", ["ab"]).unwrap();
        assert_eq!(puzzle.height(), 3);
        assert!(!puzzle.is_fillable(1, 0));
        assert!(puzzle.variables().is_empty());

        let puzzle = Puzzle::from_template("__\n\n__", ["ab", "cd"]).unwrap();
        assert_eq!(
            puzzle.variables(),
            &[Variable::new(0, 0, Across, 2), Variable::new(2, 0, Across, 2)]
        );

        // Spaces are blocks and keep their column.
        let puzzle = Puzzle::from_template(" __\n", ["ab"]).unwrap();
        assert_eq!(puzzle.width(), 3);
        assert!(!puzzle.is_fillable(0, 0));
        assert_eq!(puzzle.variables(), &[Variable::new(0, 1, Across, 2)]);

        let puzzle = Puzzle::from_template("___\n _ \n___", ["abc"]).unwrap();
        assert_eq!(
            puzzle.variables(),
            &[
                Variable::new(0, 0, Across, 3),
                Variable::new(0, 1, Down, 3),
                Variable::new(2, 0, Across, 3),
            ]
        );
    }

    #[test]
    fn test_from_variables_computes_overlap() {
        let across = Variable::new(0, 0, Across, 3);
        let down = Variable::new(0, 1, Down, 3);
        let puzzle =
            Puzzle::from_variables(vec![down, across], ["cat", "car", "art", "tar"]).unwrap();

        let across_id = puzzle.variable_id(&across).unwrap();
        let down_id = puzzle.variable_id(&down).unwrap();
        assert_eq!(puzzle.overlap(across_id, down_id), Some((1, 0)));
        assert_eq!(puzzle.height(), 3);
        assert_eq!(puzzle.width(), 3);
        assert!(!puzzle.is_fillable(2, 0));
    }

    #[test]
    fn test_malformed_structures_are_rejected() {
        assert!(matches!(
            Puzzle::new(vec![vec![true, true], vec![true]], ["ab"]),
            Err(Error::MalformedStructure(_))
        ));
        assert!(matches!(
            Puzzle::new(vec![], ["ab"]),
            Err(Error::MalformedStructure(_))
        ));
        assert!(matches!(
            Puzzle::from_variables(vec![Variable::new(0, 0, Across, 1)], ["a"]),
            Err(Error::MalformedStructure(_))
        ));
        assert!(matches!(
            Puzzle::from_variables(
                vec![Variable::new(0, 0, Across, 3), Variable::new(0, 0, Across, 3)],
                ["abc"]
            ),
            Err(Error::MalformedStructure(_))
        ));
        assert!(matches!(
            Puzzle::from_variables(
                vec![Variable::new(0, 0, Across, 3), Variable::new(0, 1, Across, 3)],
                ["abc"]
            ),
            Err(Error::MalformedStructure(_))
        ));
        assert!(matches!(
            "diagonal".parse::<Direction>(),
            Err(Error::MalformedStructure(_))
        ));
        assert_eq!(" Down ".parse::<Direction>(), Ok(Down));
    }

    #[test]
    fn test_placement_and_rendering() {
        let puzzle = load_puzzle();
        let mut assignment = Assignment::for_puzzle(&puzzle);
        assignment.assign(0, puzzle.word_id("CARE").unwrap());
        assignment.assign(1, puzzle.word_id("CARD").unwrap());

        assert_eq!(puzzle.placement_at(&assignment, 0, 3), Some('E'));
        assert_eq!(puzzle.placement_at(&assignment, 3, 0), Some('D'));
        assert_eq!(puzzle.placement_at(&assignment, 2, 2), None);
        assert_eq!(puzzle.placement_at(&assignment, 9, 9), None);

        let rendered = puzzle.render_grid(&assignment);
        println!("{}", rendered);
        assert_eq!(rendered, "CARE\nA█ █\nR   \nD█ █");
    }
}
