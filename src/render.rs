use std::fs;
use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::{ImageBuffer, Rgb, RgbImage};
use imageproc::{
    drawing::{draw_filled_rect_mut, draw_text_mut, text_size},
    rect::Rect,
};
use log::debug;

use crate::crossword::Crossword;
use crate::error::RenderError;
use crate::solver::Assignment;

/// Character drawn for cells that can't hold a letter.
pub const BLOCK: char = '█';

/// Side of one grid cell in an image, in pixels.
pub const CELL_SIZE: u32 = 100;

/// Black border left around each fillable cell.
pub const CELL_BORDER: u32 = 2;

pub const FONT_SIZE: f32 = 80.0;

const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Lay the assigned words onto a height x width grid of letters. Cells no word covers are `None`.
pub fn letter_grid(crossword: &Crossword, assignment: &Assignment) -> Vec<Vec<Option<char>>> {
    let mut letters = vec![vec![None; crossword.width()]; crossword.height()];

    for (variable, word) in assignment {
        for ((row, col), glyph) in variable.cells().zip(word.chars()) {
            if let Some(cell) = letters.get_mut(row).and_then(|r| r.get_mut(col)) {
                *cell = Some(glyph);
            }
        }
    }

    letters
}

/// Turn the given crossword and assignment into a rendered string, one line per row.
pub fn render_grid(crossword: &Crossword, assignment: &Assignment) -> String {
    let letters = letter_grid(crossword, assignment);

    letters
        .iter()
        .enumerate()
        .map(|(row, line)| {
            line.iter()
                .enumerate()
                .map(|(col, &letter)| {
                    if crossword.is_fillable(row, col) {
                        letter.unwrap_or(' ')
                    } else {
                        BLOCK
                    }
                })
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Does `path` name an image format `save_image` can write?
pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg"))
        .unwrap_or(false)
}

/// Load a TrueType/OpenType font for drawing letters.
pub fn load_font(path: impl AsRef<Path>) -> Result<FontVec, RenderError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| RenderError::ReadFont {
        path: path.to_path_buf(),
        source,
    })?;

    FontVec::try_from_vec(bytes).map_err(|source| RenderError::InvalidFont {
        path: path.to_path_buf(),
        source,
    })
}

/// Draw the grid: white cells on a black background, with each letter centered in its cell.
/// Without a font only the cells are drawn.
pub fn draw_grid(
    crossword: &Crossword,
    assignment: &Assignment,
    font: Option<&FontVec>,
) -> RgbImage {
    let interior = CELL_SIZE - 2 * CELL_BORDER;
    let scale = PxScale::from(FONT_SIZE);
    let letters = letter_grid(crossword, assignment);

    let mut image = ImageBuffer::from_pixel(
        crossword.width() as u32 * CELL_SIZE,
        crossword.height() as u32 * CELL_SIZE,
        BLACK,
    );

    for (row, line) in letters.iter().enumerate() {
        for (col, letter) in line.iter().enumerate() {
            if !crossword.is_fillable(row, col) {
                continue;
            }

            let x = col as u32 * CELL_SIZE + CELL_BORDER;
            let y = row as u32 * CELL_SIZE + CELL_BORDER;
            let rect = Rect::at(x as i32, y as i32).of_size(interior, interior);
            draw_filled_rect_mut(&mut image, rect, WHITE);

            if let (Some(letter), Some(font)) = (letter, font) {
                let text = letter.to_string();
                let (w, h) = text_size(scale, font, &text);
                let text_x = x as i32 + (interior as i32 - w as i32) / 2;
                let text_y = y as i32 + (interior as i32 - h as i32) / 2;
                draw_text_mut(&mut image, BLACK, text_x, text_y, scale, font, &text);
            }
        }
    }

    image
}

/// Save the grid as an image; the format follows the file extension.
pub fn save_image(
    crossword: &Crossword,
    assignment: &Assignment,
    path: impl AsRef<Path>,
    font: Option<&FontVec>,
) -> Result<(), RenderError> {
    let path = path.as_ref();
    draw_grid(crossword, assignment, font).save(path)?;
    debug!("saved {}x{} grid image to {}", crossword.width(), crossword.height(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use image::Rgb;
    use tempfile::TempDir;

    use super::{
        draw_grid, is_image_path, letter_grid, load_font, render_grid, save_image, CELL_SIZE,
    };
    use crate::crossword::{Crossword, Variable};
    use crate::error::RenderError;
    use crate::find_fill;
    use crate::solver::Assignment;
    use crate::Direction::{Across, Down};

    #[test]
    fn test_render_partial_assignment() {
        let crossword = Crossword::from_template(
            "
            ___
            _##
            _##
            ",
            ["CAT", "COW"],
        );
        let mut assignment = Assignment::new();
        assignment.insert(Variable::new(0, 0, Across, 3), "CAT".to_string());

        assert_eq!(render_grid(&crossword, &assignment), "CAT\n ██\n ██");

        let letters = letter_grid(&crossword, &assignment);
        assert_eq!(letters[0], vec![Some('C'), Some('A'), Some('T')]);
        assert_eq!(letters[1], vec![None, None, None]);
    }

    #[test]
    fn test_render_fill() {
        let crossword = Crossword::from_template(
            "
            ___
            ##_
            ##_
            ",
            ["cat", "tan", "dog"],
        );

        let result = find_fill(&crossword).expect("Failed to find a fill");

        assert_eq!(render_grid(&crossword, &result.assignment), "cat\n██a\n██n");
    }

    #[test]
    fn test_render_down_word() {
        let crossword = Crossword::from_template("_#\n_#", ["HI"]);
        let mut assignment = Assignment::new();
        assignment.insert(Variable::new(0, 0, Down, 2), "HI".to_string());

        assert_eq!(render_grid(&crossword, &assignment), "H█\nI█");
    }

    #[test]
    fn test_save_image_has_one_cell_per_square() {
        let crossword = Crossword::from_template(
            "
            ___
            ##_
            ##_
            ",
            ["cat", "tan", "dog"],
        );
        let result = find_fill(&crossword).expect("Failed to find a fill");
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("fill.png");

        save_image(&crossword, &result.assignment, &path, None).unwrap();

        let image = image::open(&path).unwrap().to_rgb8();
        assert_eq!(image.width(), 3 * CELL_SIZE);
        assert_eq!(image.height(), 3 * CELL_SIZE);
        // Fillable cell, block cell, and the border around a fillable cell.
        assert_eq!(*image.get_pixel(50, 50), Rgb([255, 255, 255]));
        assert_eq!(*image.get_pixel(50, 150), Rgb([0, 0, 0]));
        assert_eq!(*image.get_pixel(0, 0), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_draw_grid_size_for_wide_grid() {
        let crossword = Crossword::from_template("____#", ["ABCD"]);

        let image = draw_grid(&crossword, &Assignment::new(), None);

        assert_eq!(image.dimensions(), (5 * CELL_SIZE, CELL_SIZE));
        assert_eq!(*image.get_pixel(450, 50), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_is_image_path() {
        assert!(is_image_path(Path::new("out.png")));
        assert!(is_image_path(Path::new("out.JPG")));
        assert!(!is_image_path(Path::new("out.txt")));
        assert!(!is_image_path(Path::new("out")));
    }

    #[test]
    fn test_load_font_errors() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing.ttf");
        assert!(matches!(load_font(&missing), Err(RenderError::ReadFont { .. })));

        let garbage = temp_dir.path().join("garbage.ttf");
        fs::write(&garbage, b"not a font").unwrap();
        assert!(matches!(load_font(&garbage), Err(RenderError::InvalidFont { .. })));
    }

    #[test]
    fn test_render_empty_grid() {
        let crossword = Crossword::new(vec![], Vec::<String>::new());

        assert_eq!(render_grid(&crossword, &Assignment::new()), "");
    }
}
