use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while turning structure and word-list input into a `Crossword`.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("structure contains no rows")]
    EmptyStructure,
}

/// Errors raised while drawing a fill to an image file.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to read font {}: {source}", path.display())]
    ReadFont {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not a usable font: {source}", path.display())]
    InvalidFont {
        path: PathBuf,
        #[source]
        source: ab_glyph::InvalidFont,
    },

    #[error(transparent)]
    Image(#[from] image::ImageError),
}
