use clap::Parser;
use crossword_csp::word_list::parse_word_list;
use crossword_csp::{Puzzle, Solver, SolverOptions};
use std::fmt::{Debug, Formatter};
use std::fs;

/// generate: fill a crossword structure with words from a word list
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the structure file, with _ representing fillable squares and anything else a block
    structure: String,

    /// Path to the word list, one word per line
    words: String,

    /// Optional path to write the filled grid to
    output: Option<String>,

    /// Skip the arc consistency pass before searching
    #[arg(long)]
    no_ac3: bool,

    /// Don't propagate each tentative choice into the remaining slots
    #[arg(long)]
    no_inference: bool,

    /// Try candidates in word list order instead of least-constraining-value order
    #[arg(long)]
    no_lcv: bool,
}

struct Error(String);

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0) // Print error unquoted
    }
}

fn read_file(path: &str) -> Result<String, Error> {
    fs::read_to_string(path).map_err(|err| Error(format!("Couldn't read file '{path}': {err}")))
}

fn main() -> Result<(), Error> {
    env_logger::init();
    let args = Args::parse();

    let structure = read_file(&args.structure)?;
    let words = parse_word_list(&read_file(&args.words)?);

    let puzzle = Puzzle::from_template(&structure, words).map_err(|err| Error(err.to_string()))?;

    let options = SolverOptions {
        initial_arc_consistency: !args.no_ac3,
        maintain_arc_consistency: !args.no_inference,
        least_constraining_value: !args.no_lcv,
    };
    let mut solver = Solver::new(&puzzle, options);

    let solution = match solver.solve() {
        Ok(solution) => solution,
        Err(no_solution) => {
            log::info!("{no_solution:?}");
            println!("No solution.");
            return Ok(());
        }
    };

    let display_grid = puzzle.render_grid(&solution.assignment);

    println!("{:?}", solution.statistics);
    println!("{}", display_grid);

    if let Some(output) = &args.output {
        fs::write(output, &display_grid)
            .map_err(|err| Error(format!("Couldn't write file '{output}': {err}")))?;
    }

    Ok(())
}
