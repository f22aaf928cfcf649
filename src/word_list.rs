//! Vocabulary handling: turning raw word-file contents into a de-duplicated, ordered word list.

use std::collections::BTreeSet;

use smallvec::SmallVec;

use crate::MAX_SLOT_LENGTH;

/// A struct representing a word that can be chosen for a given slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    pub string: String,
    pub glyphs: SmallVec<[char; MAX_SLOT_LENGTH]>,
}

impl Word {
    pub fn new(string: String) -> Word {
        let glyphs = string.chars().collect();
        Word { string, glyphs }
    }

    /// Number of glyphs (not bytes) in the word.
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }
}

/// Collapse duplicates and sort, so that `WordId`s are stable for a given vocabulary regardless of
/// the order it was supplied in.
pub fn build_words<I, S>(words: I) -> Vec<Word>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    words
        .into_iter()
        .map(Into::into)
        .collect::<BTreeSet<String>>()
        .into_iter()
        .map(Word::new)
        .collect()
}

/// Parse the contents of a word file: one word per line, surrounding whitespace ignored, blank
/// lines skipped. Words are upper-cased to match the letters expected in a rendered grid.
pub fn parse_word_list(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_uppercase)
        .collect()
}
