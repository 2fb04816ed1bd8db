use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const GRID_SIZE: usize = 12;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum WordSearchError {
    #[error("the grid must be 12x12 letters")]
    BadGrid,

    #[error("word {0} is neither horizontal nor vertical")]
    NotStraight(String),

    #[error("word {0} does not match the grid letters at its coordinates")]
    Misplaced(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
}

impl Cell {
    #[must_use]
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HiddenWord {
    pub word: String,
    /// Clue shown next to the word once found.
    pub concept: String,
    pub start: Cell,
    pub end: Cell,
}

impl HiddenWord {
    /// Cells from `start` to `end`, inclusive.
    #[must_use]
    pub fn cells(&self) -> Vec<Cell> {
        if self.start.row == self.end.row {
            let (a, b) = ordered(self.start.col, self.end.col);
            (a..=b).map(|col| Cell::new(self.start.row, col)).collect()
        } else {
            let (a, b) = ordered(self.start.row, self.end.row);
            (a..=b).map(|row| Cell::new(row, self.start.col)).collect()
        }
    }
}

fn ordered(a: usize, b: usize) -> (usize, usize) {
    if a <= b { (a, b) } else { (b, a) }
}

/// A 12x12 letter puzzle played by dragging across cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordSearch {
    grid: Vec<Vec<char>>,
    words: Vec<HiddenWord>,
    found: Vec<bool>,
    selection: Vec<Cell>,
    selecting: bool,
}

impl WordSearch {
    /// # Errors
    ///
    /// Returns a `WordSearchError` when the grid has the wrong shape or a word
    /// is not spelled by the letters between its coordinates.
    pub fn new(rows: &[&str], words: Vec<HiddenWord>) -> Result<Self, WordSearchError> {
        let grid: Vec<Vec<char>> = rows.iter().map(|r| r.chars().collect()).collect();
        if grid.len() != GRID_SIZE || grid.iter().any(|r| r.len() != GRID_SIZE) {
            return Err(WordSearchError::BadGrid);
        }
        for w in &words {
            if w.start.row != w.end.row && w.start.col != w.end.col {
                return Err(WordSearchError::NotStraight(w.word.clone()));
            }
            let spelled: Option<String> = w
                .cells()
                .iter()
                .map(|c| grid.get(c.row).and_then(|r| r.get(c.col)).copied())
                .collect();
            if spelled.as_deref() != Some(w.word.as_str()) {
                return Err(WordSearchError::Misplaced(w.word.clone()));
            }
        }
        let found = vec![false; words.len()];
        Ok(Self {
            grid,
            words,
            found,
            selection: Vec::new(),
            selecting: false,
        })
    }

    /// The built-in Python vocabulary puzzle.
    ///
    /// # Errors
    ///
    /// Never fails in practice; the data is validated like any other puzzle.
    pub fn python_basics() -> Result<Self, WordSearchError> {
        const ROWS: [&str; GRID_SIZE] = [
            "FUNCTIONJPZM",
            "VARIABLEVYQW",
            "GWJHQGXQWTMI",
            "MWLISTXWGHMN",
            "EQHWXVVHQOHP",
            "LHMQXQGZKNMU",
            "SZGWHKGVZWHT",
            "EHIFVXJWGYWH",
            "QHXBVGMJBHBJ",
            "KXZYXDICTWHK",
            "GFORBJYBKHWW",
            "GMZJZBPRINTM",
        ];
        let word = |word: &str, concept: &str, start: (usize, usize), end: (usize, usize)| {
            HiddenWord {
                word: word.to_owned(),
                concept: concept.to_owned(),
                start: Cell::new(start.0, start.1),
                end: Cell::new(end.0, end.1),
            }
        };
        Self::new(
            &ROWS,
            vec![
                word("FUNCTION", "Reusable block of code", (0, 0), (0, 7)),
                word("VARIABLE", "A named box that stores data", (1, 0), (1, 7)),
                word("LIST", "Ordered, mutable collection", (3, 2), (3, 5)),
                word("IF", "Decision structure", (7, 2), (7, 3)),
                word("ELSE", "Alternative path of an if", (4, 0), (7, 0)),
                word("PYTHON", "The programming language", (0, 9), (5, 9)),
                word("FOR", "Loop over a sequence", (10, 1), (10, 3)),
                word("INPUT", "Captures data from the user", (2, 11), (6, 11)),
                word("PRINT", "Shows data on screen", (11, 6), (11, 10)),
                word("DICT", "Key-value collection", (9, 5), (9, 8)),
            ],
        )
    }

    #[must_use]
    pub fn letter(&self, cell: Cell) -> Option<char> {
        self.grid.get(cell.row).and_then(|r| r.get(cell.col)).copied()
    }

    #[must_use]
    pub fn words(&self) -> &[HiddenWord] {
        &self.words
    }

    #[must_use]
    pub fn is_found(&self, index: usize) -> bool {
        self.found.get(index).copied().unwrap_or(false)
    }

    #[must_use]
    pub fn found_count(&self) -> usize {
        self.found.iter().filter(|f| **f).count()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.found.iter().all(|f| *f)
    }

    #[must_use]
    pub fn selection(&self) -> &[Cell] {
        &self.selection
    }

    pub fn begin_selection(&mut self, cell: Cell) {
        self.selection.clear();
        self.selecting = true;
        self.extend_selection(cell);
    }

    /// Adds a cell to an active drag. Cells outside the grid or already
    /// selected are ignored.
    pub fn extend_selection(&mut self, cell: Cell) {
        if !self.selecting || self.letter(cell).is_none() || self.selection.contains(&cell) {
            return;
        }
        self.selection.push(cell);
    }

    /// Ends the drag and returns the index of the word it discovered, if any.
    pub fn finish_selection(&mut self) -> Option<usize> {
        if !self.selecting {
            return None;
        }
        self.selecting = false;
        let selected: String = std::mem::take(&mut self.selection)
            .into_iter()
            .filter_map(|c| self.letter(c))
            .collect();
        let reversed: String = selected.chars().rev().collect();

        let index = self.words.iter().enumerate().position(|(i, w)| {
            !self.found[i] && (w.word == selected || w.word == reversed)
        })?;
        self.found[index] = true;
        Some(index)
    }

    /// Marks the first undiscovered word found and returns it with its cells.
    pub fn reveal_next(&mut self) -> Option<(usize, Vec<Cell>)> {
        let index = self.found.iter().position(|f| !f)?;
        self.found[index] = true;
        Some((index, self.words[index].cells()))
    }

    pub fn reset(&mut self) {
        self.found.iter_mut().for_each(|f| *f = false);
        self.selection.clear();
        self.selecting = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drag(puzzle: &mut WordSearch, cells: &[Cell]) -> Option<usize> {
        let (first, rest) = cells.split_first().unwrap();
        puzzle.begin_selection(*first);
        for c in rest {
            puzzle.extend_selection(*c);
        }
        puzzle.finish_selection()
    }

    #[test]
    fn built_in_puzzle_is_valid() {
        let puzzle = WordSearch::python_basics().unwrap();
        assert_eq!(puzzle.words().len(), 10);
        assert!(!puzzle.is_complete());
    }

    #[test]
    fn forward_and_reverse_selection_both_match() {
        let mut puzzle = WordSearch::python_basics().unwrap();
        let python = puzzle.words()[5].cells();
        let mut backwards = python.clone();
        backwards.reverse();

        assert_eq!(drag(&mut puzzle, &backwards), Some(5));
        assert!(puzzle.is_found(5));
        assert_eq!(drag(&mut puzzle, &python), None);

        let mut fresh = WordSearch::python_basics().unwrap();
        assert_eq!(drag(&mut fresh, &python), Some(5));
    }

    #[test]
    fn repeated_cells_are_not_added_twice() {
        let mut puzzle = WordSearch::python_basics().unwrap();
        puzzle.begin_selection(Cell::new(10, 1));
        puzzle.extend_selection(Cell::new(10, 2));
        puzzle.extend_selection(Cell::new(10, 2));
        puzzle.extend_selection(Cell::new(10, 3));
        puzzle.extend_selection(Cell::new(40, 3));
        assert_eq!(puzzle.selection().len(), 3);
        assert_eq!(puzzle.finish_selection(), Some(6));
    }

    #[test]
    fn non_words_do_not_match() {
        let mut puzzle = WordSearch::python_basics().unwrap();
        assert_eq!(drag(&mut puzzle, &[Cell::new(2, 0), Cell::new(2, 1)]), None);
        assert_eq!(puzzle.found_count(), 0);
        assert_eq!(puzzle.finish_selection(), None);
    }

    #[test]
    fn reveal_walks_through_every_word() {
        let mut puzzle = WordSearch::python_basics().unwrap();
        let function = puzzle.words()[0].cells();
        drag(&mut puzzle, &function);
        let (index, cells) = puzzle.reveal_next().unwrap();
        assert_eq!(index, 1);
        assert_eq!(cells.len(), "VARIABLE".len());
        while puzzle.reveal_next().is_some() {}
        assert!(puzzle.is_complete());
    }

    #[test]
    fn rejects_misplaced_words() {
        let rows = ["ABCDEFGHIJKL"; GRID_SIZE];
        let err = WordSearch::new(
            &rows,
            vec![HiddenWord {
                word: "ABD".into(),
                concept: String::new(),
                start: Cell::new(0, 0),
                end: Cell::new(0, 2),
            }],
        )
        .unwrap_err();
        assert_eq!(err, WordSearchError::Misplaced("ABD".into()));

        let diagonal = WordSearch::new(
            &rows,
            vec![HiddenWord {
                word: "AB".into(),
                concept: String::new(),
                start: Cell::new(0, 0),
                end: Cell::new(1, 1),
            }],
        );
        assert!(matches!(diagonal, Err(WordSearchError::NotStraight(_))));
    }
}
