//! Fill crossword grids by treating each slot as a CSP variable: node and arc consistency prune
//! the word pool, then backtracking search with MRV/degree and least-constraining-value ordering
//! finds a complete fill.

pub mod crossword;
pub mod error;
pub mod render;
pub mod solver;

pub use crossword::{
    parse_structure, parse_word_list, Crossword, Direction, GridCoord, Variable, Word, WordId,
    MAX_SLOT_LENGTH,
};
pub use error::{ParseError, RenderError};
pub use render::{draw_grid, is_image_path, letter_grid, load_font, render_grid, save_image};
pub use solver::{
    find_fill, find_fill_with_options, Assignment, FillFailure, FillOptions, FillSuccess, Solver,
    Statistics,
};
