use std::cmp::Reverse;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt::{Debug, Formatter};

use bit_set::BitSet;
use instant::{Duration, Instant};
use log::{debug, info, trace};
use thiserror::Error;

use crate::crossword::{Crossword, Variable, Word, WordId};

/// A mapping from variables to the words chosen for them.
pub type Assignment = HashMap<Variable, String>;

/// Settings for a fill operation.
#[derive(Debug, Clone, Default)]
pub struct FillOptions {
    /// Give up once the search has been running this long. `None` searches exhaustively.
    pub deadline: Option<Duration>,
}

/// A struct tracking statistics about the filling process.
#[derive(Debug, Clone)]
pub struct Statistics {
    pub states: u64,
    pub backtracks: u64,
    pub revisions: u64,
    pub duration: Duration,
}

impl Statistics {
    fn new() -> Statistics {
        Statistics {
            states: 0,
            backtracks: 0,
            revisions: 0,
            duration: Duration::from_millis(0),
        }
    }
}

/// A struct representing the results of a fill operation.
#[derive(Debug)]
pub struct FillSuccess {
    pub statistics: Statistics,
    pub assignment: Assignment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FillFailure {
    #[error("no consistent fill exists for this grid")]
    NoSolution,

    #[error("search exceeded its deadline of {0:?}")]
    DeadlineExceeded(Duration),
}

/// Glyph counts at one crossing cell of a neighbor, used to rank candidate words.
struct CrossingTally {
    /// Index of the shared cell in the word being ranked.
    cell: usize,
    remaining: usize,
    glyph_counts: HashMap<char, usize>,
}

impl CrossingTally {
    fn eliminations(&self, word: &Word) -> usize {
        let kept = word
            .glyphs
            .get(self.cell)
            .and_then(|glyph| self.glyph_counts.get(glyph))
            .copied()
            .unwrap_or(0);
        self.remaining - kept
    }
}

/// The live state of a single fill: one domain of word ids per variable, narrowed by node and
/// arc consistency before the search starts.
pub struct Solver<'a> {
    crossword: &'a Crossword,
    domains: HashMap<Variable, BitSet>,
    options: FillOptions,
    statistics: Statistics,
    start: Instant,
}

impl Debug for Solver<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let domain_sizes: Vec<(Variable, usize)> = self
            .crossword
            .variables()
            .iter()
            .map(|&v| (v, self.domain_len(&v)))
            .collect();

        f.debug_struct("Solver")
            .field("domain_sizes", &domain_sizes)
            .field("options", &self.options)
            .field("statistics", &self.statistics)
            .finish()
    }
}

impl<'a> Solver<'a> {
    /// Start a solver where every variable may take any word in the pool.
    pub fn new(crossword: &'a Crossword) -> Solver<'a> {
        Solver::with_options(crossword, FillOptions::default())
    }

    pub fn with_options(crossword: &'a Crossword, options: FillOptions) -> Solver<'a> {
        let all_words: BitSet = (0..crossword.words().len()).collect();
        let domains = crossword
            .variables()
            .iter()
            .map(|&variable| (variable, all_words.clone()))
            .collect();

        Solver {
            crossword,
            domains,
            options,
            statistics: Statistics::new(),
            start: Instant::now(),
        }
    }

    /// The words still available for `variable`, in pool order.
    pub fn domain(&self, variable: &Variable) -> Vec<&'a str> {
        let crossword: &'a Crossword = self.crossword;
        let words = crossword.words();
        self.domains
            .get(variable)
            .map(|domain| domain.iter().map(|id| words[id].string.as_str()).collect())
            .unwrap_or_default()
    }

    pub fn domain_len(&self, variable: &Variable) -> usize {
        self.domains.get(variable).map(BitSet::len).unwrap_or(0)
    }

    fn word(&self, word_id: WordId) -> &'a Word {
        let crossword: &'a Crossword = self.crossword;
        &crossword.words()[word_id]
    }

    /// Enforce node consistency, then arc consistency, then search for a complete assignment.
    pub fn solve(&mut self) -> Result<FillSuccess, FillFailure> {
        self.start = Instant::now();

        self.enforce_node_consistency();

        if !self.ac3(None) {
            debug!("arc consistency emptied a domain, skipping search");
            self.statistics.duration = self.start.elapsed();
            return Err(FillFailure::NoSolution);
        }

        let result = self.backtrack(Assignment::new());
        self.statistics.duration = self.start.elapsed();

        match &result {
            Ok(_) => info!("found a fill: {:?}", self.statistics),
            Err(failure) => info!("{}: {:?}", failure, self.statistics),
        }

        result.map(|assignment| FillSuccess {
            statistics: self.statistics.clone(),
            assignment,
        })
    }

    /// Remove every word whose length doesn't match its variable's length.
    pub fn enforce_node_consistency(&mut self) {
        let crossword: &'a Crossword = self.crossword;
        let words = crossword.words();

        for (variable, domain) in self.domains.iter_mut() {
            let wrong_length: Vec<WordId> =
                domain.iter().filter(|&id| words[id].len() != variable.length).collect();
            for id in wrong_length {
                domain.remove(id);
            }
        }
    }

    /// Make `x` arc consistent with `y` by removing every word of `x` that no word of `y` agrees
    /// with at their shared cell. Returns whether anything was removed.
    pub fn revise(&mut self, x: &Variable, y: &Variable) -> bool {
        let Some((x_cell, y_cell)) = self.crossword.overlap(x, y) else {
            return false;
        };
        let crossword: &'a Crossword = self.crossword;
        let words = crossword.words();

        let supported_glyphs: HashSet<char> = match self.domains.get(y) {
            Some(domain) => domain
                .iter()
                .filter_map(|id| words[id].glyphs.get(y_cell).copied())
                .collect(),
            None => HashSet::new(),
        };

        let Some(domain) = self.domains.get_mut(x) else {
            return false;
        };

        // A word too short to reach the shared cell can't be supported either.
        let unsupported: Vec<WordId> = domain
            .iter()
            .filter(|&id| {
                words[id]
                    .glyphs
                    .get(x_cell)
                    .map_or(true, |glyph| !supported_glyphs.contains(glyph))
            })
            .collect();

        for &id in &unsupported {
            domain.remove(id);
        }

        if !unsupported.is_empty() {
            self.statistics.revisions += 1;
            trace!("revised {} against {}: removed {} words", x, y, unsupported.len());
        }

        !unsupported.is_empty()
    }

    /// Enforce arc consistency with the AC-3 algorithm, starting from `arcs` or, if `None`, from
    /// every arc in the problem. Returns false if some domain ends up empty.
    pub fn ac3(&mut self, arcs: Option<Vec<(Variable, Variable)>>) -> bool {
        let crossword = self.crossword;

        let mut queue: VecDeque<(Variable, Variable)> = match arcs {
            Some(arcs) => arcs.into(),
            None => crossword
                .variables()
                .iter()
                .flat_map(|&x| crossword.neighbors(&x).iter().map(move |&y| (x, y)))
                .collect(),
        };

        while let Some((x, y)) = queue.pop_front() {
            if !self.revise(&x, &y) {
                continue;
            }

            if self.domain_len(&x) == 0 {
                debug!("domain of {} is empty", x);
                return false;
            }

            // Shrinking x may leave x's other neighbors without support.
            for &z in crossword.neighbors(&x) {
                if z != y {
                    queue.push_back((z, x));
                }
            }
        }

        true
    }

    /// Does `assignment` give a word to every variable?
    pub fn assignment_complete(&self, assignment: &Assignment) -> bool {
        self.crossword.variables().iter().all(|variable| assignment.contains_key(variable))
    }

    /// Do the words in `assignment` fit: all distinct, of the right lengths, and agreeing at
    /// every crossing?
    pub fn consistent(&self, assignment: &Assignment) -> bool {
        let mut used_words: HashSet<&str> = HashSet::with_capacity(assignment.len());

        for (variable, word) in assignment {
            if !used_words.insert(word.as_str()) {
                return false;
            }

            if word.chars().count() != variable.length {
                return false;
            }

            for neighbor in self.crossword.neighbors(variable) {
                let Some(neighbor_word) = assignment.get(neighbor) else {
                    continue;
                };
                let Some((i, j)) = self.crossword.overlap(variable, neighbor) else {
                    continue;
                };
                if word.chars().nth(i) != neighbor_word.chars().nth(j) {
                    return false;
                }
            }
        }

        true
    }

    /// Pick the unassigned variable with the fewest remaining words, breaking ties by the
    /// number of neighbors (most first).
    pub fn select_unassigned_variable(&self, assignment: &Assignment) -> Option<Variable> {
        self.crossword
            .variables()
            .iter()
            .filter(|variable| !assignment.contains_key(*variable))
            .min_by_key(|variable| {
                (self.domain_len(variable), Reverse(self.crossword.neighbors(variable).len()))
            })
            .copied()
    }

    /// For each unassigned neighbor of `var`, count how often each glyph sits at the cell it
    /// shares with `var` among the neighbor's remaining words.
    fn crossing_tallies(&self, var: &Variable, assignment: &Assignment) -> Vec<CrossingTally> {
        let mut tallies = vec![];

        for neighbor in self.crossword.neighbors(var) {
            if assignment.contains_key(neighbor) {
                continue;
            }
            let (Some((cell, other_cell)), Some(domain)) =
                (self.crossword.overlap(var, neighbor), self.domains.get(neighbor))
            else {
                continue;
            };

            let mut tally = CrossingTally { cell, remaining: 0, glyph_counts: HashMap::new() };
            for other in domain.iter() {
                tally.remaining += 1;
                if let Some(&glyph) = self.word(other).glyphs.get(other_cell) {
                    *tally.glyph_counts.entry(glyph).or_insert(0) += 1;
                }
            }
            tallies.push(tally);
        }

        tallies
    }

    /// The words of `var`'s domain, least constraining first: a word's cost is the number of
    /// words it would rule out across `var`'s unassigned neighbors.
    pub fn order_domain_values(&self, var: &Variable, assignment: &Assignment) -> Vec<&'a str> {
        let mut word_ids: Vec<WordId> = match self.domains.get(var) {
            Some(domain) => domain.iter().collect(),
            None => return vec![],
        };
        let tallies = self.crossing_tallies(var, assignment);

        word_ids.sort_by_cached_key(|&word_id| {
            let word = self.word(word_id);
            tallies.iter().map(|tally| tally.eliminations(word)).sum::<usize>()
        });

        word_ids.into_iter().map(|id| self.word(id).string.as_str()).collect()
    }

    fn check_deadline(&self) -> Result<(), FillFailure> {
        match self.options.deadline {
            Some(deadline) if self.start.elapsed() > deadline => {
                Err(FillFailure::DeadlineExceeded(deadline))
            }
            _ => Ok(()),
        }
    }

    /// Extend `assignment` depth-first until it's complete. Each candidate is tried on its own
    /// copy of the assignment, so a failed branch leaves nothing to undo.
    pub fn backtrack(&mut self, assignment: Assignment) -> Result<Assignment, FillFailure> {
        if self.assignment_complete(&assignment) {
            return Ok(assignment);
        }
        self.check_deadline()?;
        self.statistics.states += 1;

        let Some(variable) = self.select_unassigned_variable(&assignment) else {
            return Ok(assignment);
        };

        for word in self.order_domain_values(&variable, &assignment) {
            let mut trial = assignment.clone();
            trial.insert(variable, word.to_string());

            if !self.consistent(&trial) {
                continue;
            }

            trace!("trying {} for {}", word, variable);

            match self.backtrack(trial) {
                Ok(result) => return Ok(result),
                Err(FillFailure::NoSolution) => self.statistics.backtracks += 1,
                Err(failure) => return Err(failure),
            }
        }

        Err(FillFailure::NoSolution)
    }
}

/// Search for a valid fill for the given crossword.
pub fn find_fill(crossword: &Crossword) -> Result<FillSuccess, FillFailure> {
    find_fill_with_options(crossword, FillOptions::default())
}

pub fn find_fill_with_options(
    crossword: &Crossword,
    options: FillOptions,
) -> Result<FillSuccess, FillFailure> {
    Solver::with_options(crossword, options).solve()
}
