use std::collections::{BTreeSet, HashMap};
use std::fmt::{self, Debug, Display, Formatter};
use std::fs;
use std::path::Path;

use log::debug;
use smallvec::SmallVec;

use crate::error::ParseError;

/// The expected maximum length for a single slot.
pub const MAX_SLOT_LENGTH: usize = 21;

/// An identifier for a given word, based on its index in the Crossword's `words` field.
pub type WordId = usize;

/// Zero-indexed (row, column) coords for a cell in the grid, where row 0 is the top row.
pub type GridCoord = (usize, usize);

/// Direction that a slot is facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    Across,
    Down,
}

impl Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Across => write!(f, "across"),
            Direction::Down => write!(f, "down"),
        }
    }
}

/// A maximal run of fillable cells that needs a word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variable {
    pub i: usize,
    pub j: usize,
    pub direction: Direction,
    pub length: usize,
}

impl Variable {
    pub fn new(i: usize, j: usize, direction: Direction, length: usize) -> Variable {
        Variable { i, j, direction, length }
    }

    /// Generate the coords for each cell of this variable.
    pub fn cells(&self) -> impl Iterator<Item = GridCoord> + '_ {
        (0..self.length).map(move |k| match self.direction {
            Direction::Across => (self.i, self.j + k),
            Direction::Down => (self.i + k, self.j),
        })
    }
}

impl Display for Variable {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}) {} : {}", self.i, self.j, self.direction, self.length)
    }
}

/// A word from the pool, with its characters split out so overlap indices address chars.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    pub string: String,
    pub glyphs: SmallVec<[char; MAX_SLOT_LENGTH]>,
}

impl Word {
    fn new(string: String) -> Word {
        let glyphs = string.chars().collect();
        Word { string, glyphs }
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }
}

/// The static description of a puzzle: grid geometry, slots, crossings and the word pool.
pub struct Crossword {
    width: usize,
    height: usize,
    structure: Vec<Vec<bool>>,
    variables: Vec<Variable>,
    words: Vec<Word>,
    overlaps: HashMap<(Variable, Variable), (usize, usize)>,
    neighbors: HashMap<Variable, SmallVec<[Variable; MAX_SLOT_LENGTH]>>,
}

impl Debug for Crossword {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Crossword")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("variables", &self.variables)
            .field("words", &(["(", &self.words.len().to_string(), " entries)"].join("")))
            .finish()
    }
}

impl Crossword {
    /// Build a crossword from a fillable-cell grid and a word pool. Rows shorter than the widest
    /// row are padded with blocks; duplicate and empty words are dropped.
    pub fn new<I, S>(structure: Vec<Vec<bool>>, words: I) -> Crossword
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let height = structure.len();
        let width = structure.iter().map(|row| row.len()).max().unwrap_or(0);
        let structure: Vec<Vec<bool>> = structure
            .into_iter()
            .map(|mut row| {
                row.resize(width, false);
                row
            })
            .collect();

        let words: BTreeSet<String> = words
            .into_iter()
            .map(Into::into)
            .filter(|word| !word.is_empty())
            .collect();
        let words: Vec<Word> = words.into_iter().map(Word::new).collect();

        let variables = find_variables(&structure);

        // Map each cell to the (variable, cell index) pairs running through it, then every cell
        // shared by two variables is a crossing.
        let mut cell_by_loc: HashMap<GridCoord, SmallVec<[(Variable, usize); 2]>> = HashMap::new();
        for &variable in &variables {
            for (cell_idx, loc) in variable.cells().enumerate() {
                cell_by_loc.entry(loc).or_default().push((variable, cell_idx));
            }
        }

        let mut overlaps = HashMap::new();
        let mut neighbors: HashMap<Variable, SmallVec<[Variable; MAX_SLOT_LENGTH]>> =
            variables.iter().map(|&v| (v, SmallVec::new())).collect();

        for entries in cell_by_loc.values() {
            for &(first, first_idx) in entries {
                for &(second, second_idx) in entries {
                    if first == second {
                        continue;
                    }
                    overlaps.insert((first, second), (first_idx, second_idx));
                    if let Some(list) = neighbors.get_mut(&first) {
                        list.push(second);
                    }
                }
            }
        }
        for list in neighbors.values_mut() {
            list.sort();
            list.dedup();
        }

        debug!(
            "built {}x{} crossword with {} variables, {} crossings and {} words",
            width,
            height,
            variables.len(),
            overlaps.len() / 2,
            words.len()
        );

        Crossword { width, height, structure, variables, words, overlaps, neighbors }
    }

    /// Build a crossword from a template string, with `_` representing fillable cells and any
    /// other character representing a block. Blank lines and the indentation shared by every
    /// row are ignored so templates can be indented; any further leading spaces are blocks.
    pub fn from_template<I, S>(template: &str, words: I) -> Crossword
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let lines: Vec<&str> = template.lines().filter(|line| !line.trim().is_empty()).collect();
        let indent = lines
            .iter()
            .map(|line| line.chars().take_while(|c| c.is_whitespace()).count())
            .min()
            .unwrap_or(0);

        let structure = lines
            .iter()
            .map(|line| line.chars().skip(indent).map(|c| c == '_').collect())
            .collect();

        Crossword::new(structure, words)
    }

    /// Read a structure file and a word-list file from disk.
    pub fn load(
        structure_path: impl AsRef<Path>,
        words_path: impl AsRef<Path>,
    ) -> Result<Crossword, ParseError> {
        let structure = parse_structure(&read_file(structure_path.as_ref())?)?;
        let words = parse_word_list(&read_file(words_path.as_ref())?);

        Ok(Crossword::new(structure, words))
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn structure(&self) -> &[Vec<bool>] {
        &self.structure
    }

    /// Is the cell at the given row and column fillable? Out-of-range cells are not.
    pub fn is_fillable(&self, row: usize, col: usize) -> bool {
        self.structure.get(row).and_then(|r| r.get(col)).copied().unwrap_or(false)
    }

    /// All variables, in row-major order of their starting cell.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// The word pool, sorted and deduplicated. A `WordId` indexes into this slice.
    pub fn words(&self) -> &[Word] {
        &self.words
    }

    /// The shared cell between `x` and `y` as (index into x's word, index into y's word), or
    /// `None` if they don't cross.
    pub fn overlap(&self, x: &Variable, y: &Variable) -> Option<(usize, usize)> {
        self.overlaps.get(&(*x, *y)).copied()
    }

    /// Every ordered pair of crossing variables with its overlap.
    pub fn overlaps(&self) -> &HashMap<(Variable, Variable), (usize, usize)> {
        &self.overlaps
    }

    /// The variables crossing `variable`.
    pub fn neighbors(&self, variable: &Variable) -> &[Variable] {
        self.neighbors.get(variable).map(|list| list.as_slice()).unwrap_or(&[])
    }
}

/// Find every maximal run of at least two fillable cells, across then down, sorted.
fn find_variables(structure: &[Vec<bool>]) -> Vec<Variable> {
    let height = structure.len();
    let width = structure.first().map(|row| row.len()).unwrap_or(0);
    let mut variables = vec![];

    for i in 0..height {
        for j in 0..width {
            if !structure[i][j] {
                continue;
            }

            if j == 0 || !structure[i][j - 1] {
                let length = (j..width).take_while(|&col| structure[i][col]).count();
                if length > 1 {
                    variables.push(Variable::new(i, j, Direction::Across, length));
                }
            }

            if i == 0 || !structure[i - 1][j] {
                let length = (i..height).take_while(|&row| structure[row][j]).count();
                if length > 1 {
                    variables.push(Variable::new(i, j, Direction::Down, length));
                }
            }
        }
    }

    variables.sort();
    variables
}

fn read_file(path: &Path) -> Result<String, ParseError> {
    fs::read_to_string(path).map_err(|source| ParseError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse a structure file: one grid row per line, `_` marks a fillable cell and anything else a
/// block. Lines shorter than the longest line are padded with blocks.
pub fn parse_structure(contents: &str) -> Result<Vec<Vec<bool>>, ParseError> {
    let lines: Vec<&str> = contents.lines().collect();
    if lines.is_empty() {
        return Err(ParseError::EmptyStructure);
    }

    let width = lines.iter().map(|line| line.chars().count()).max().unwrap_or(0);

    Ok(lines
        .iter()
        .map(|line| {
            let mut row: Vec<bool> = line.chars().map(|c| c == '_').collect();
            row.resize(width, false);
            row
        })
        .collect())
}

/// Parse a word list: one word per line, upper-cased, blank lines skipped.
pub fn parse_word_list(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_uppercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::{parse_structure, parse_word_list, Crossword, Direction, Variable};
    use crate::error::ParseError;
    use crate::Direction::{Across, Down};

    /// #___#
    /// _##_#
    /// _____
    /// _##_#
    fn sample_crossword() -> Crossword {
        Crossword::from_template(
            "
            #___#
            _##_#
            _____
            _##_#
            ",
            ["ONE", "TWO", "THREE", "FOUR"],
        )
    }

    #[test]
    fn test_variables_are_maximal_runs() {
        let crossword = sample_crossword();

        assert_eq!(crossword.width(), 5);
        assert_eq!(crossword.height(), 4);
        assert_eq!(
            crossword.variables(),
            &[
                Variable::new(0, 1, Across, 3),
                Variable::new(0, 3, Down, 4),
                Variable::new(1, 0, Down, 3),
                Variable::new(2, 0, Across, 5),
            ]
        );
    }

    #[test]
    fn test_overlaps_are_mirrored() {
        let crossword = sample_crossword();
        let top = Variable::new(0, 1, Across, 3);
        let right = Variable::new(0, 3, Down, 4);
        let left = Variable::new(1, 0, Down, 3);
        let middle = Variable::new(2, 0, Across, 5);

        assert_eq!(crossword.overlap(&top, &right), Some((2, 0)));
        assert_eq!(crossword.overlap(&right, &top), Some((0, 2)));
        assert_eq!(crossword.overlap(&middle, &left), Some((0, 1)));
        assert_eq!(crossword.overlap(&left, &middle), Some((1, 0)));
        assert_eq!(crossword.overlap(&middle, &right), Some((3, 2)));
        assert_eq!(crossword.overlap(&top, &left), None);
        assert_eq!(crossword.overlap(&top, &middle), None);
        assert_eq!(crossword.overlaps().len(), 6);
    }

    #[test]
    fn test_neighbors() {
        let crossword = sample_crossword();
        let top = Variable::new(0, 1, Across, 3);
        let right = Variable::new(0, 3, Down, 4);
        let middle = Variable::new(2, 0, Across, 5);

        assert_eq!(crossword.neighbors(&top), &[right]);
        assert_eq!(crossword.neighbors(&right), &[top, middle]);
        assert!(crossword.neighbors(&Variable::new(9, 9, Across, 2)).is_empty());
    }

    #[test]
    fn test_template_keeps_leading_blocks() {
        let crossword = Crossword::from_template(
            "
            ___
             __
            ",
            ["ABC", "BC"],
        );

        assert_eq!(crossword.structure()[1], vec![false, true, true]);
        assert_eq!(
            crossword.variables(),
            &[
                Variable::new(0, 0, Across, 3),
                Variable::new(0, 1, Down, 2),
                Variable::new(0, 2, Down, 2),
                Variable::new(1, 1, Across, 2),
            ]
        );
    }

    #[test]
    fn test_single_cells_are_not_variables() {
        let crossword = Crossword::from_template(
            "
            _#_
            ###
            _#_
            ",
            ["A"],
        );

        assert!(crossword.variables().is_empty());
    }

    #[test]
    fn test_words_are_deduplicated_and_split_into_chars() {
        let crossword = Crossword::new(vec![vec![true, true]], ["ÉTÉ", "AB", "AB", ""]);
        let words: Vec<&str> = crossword.words().iter().map(|w| w.string.as_str()).collect();

        assert_eq!(words, vec!["AB", "ÉTÉ"]);
        assert_eq!(crossword.words()[1].len(), 3);
    }

    #[test]
    fn test_ragged_structure_is_padded() {
        let crossword = Crossword::new(vec![vec![true, true, true], vec![true]], ["ABC"]);

        assert_eq!(crossword.width(), 3);
        assert_eq!(crossword.structure()[1], vec![true, false, false]);
        assert!(!crossword.is_fillable(1, 2));
        assert!(!crossword.is_fillable(5, 5));
    }

    #[test]
    fn test_variable_cells_and_display() {
        let down = Variable::new(1, 2, Direction::Down, 3);
        let cells: Vec<_> = down.cells().collect();

        assert_eq!(cells, vec![(1, 2), (2, 2), (3, 2)]);
        assert_eq!(down.to_string(), "(1, 2) down : 3");
    }

    #[test]
    fn test_parse_structure() {
        let structure = parse_structure("#___#\n#_##_\n").unwrap();

        assert_eq!(
            structure,
            vec![
                vec![false, true, true, true, false],
                vec![false, true, false, false, true],
            ]
        );
        assert!(matches!(parse_structure(""), Err(ParseError::EmptyStructure)));
    }

    #[test]
    fn test_parse_word_list() {
        assert_eq!(
            parse_word_list("apple\n\n  Banana \nCHERRY\n"),
            vec!["APPLE", "BANANA", "CHERRY"]
        );
    }

    #[test]
    fn test_load_from_files() {
        let temp_dir = TempDir::new().unwrap();
        let structure_path = temp_dir.path().join("structure.txt");
        let words_path = temp_dir.path().join("words.txt");
        fs::write(&structure_path, "____\n#__#\n").unwrap();
        fs::write(&words_path, "tree\nfrog\n").unwrap();

        let crossword = Crossword::load(&structure_path, &words_path).unwrap();

        assert_eq!(crossword.height(), 2);
        assert_eq!(crossword.variables().len(), 4);
        assert_eq!(crossword.words()[0].string, "FROG");
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing.txt");

        let err = Crossword::load(&missing, &missing).unwrap_err();

        assert!(matches!(err, ParseError::Read { .. }));
        assert!(err.to_string().contains("missing.txt"));
    }
}
