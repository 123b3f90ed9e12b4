use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use crossfill::{
    find_fill_with_options, is_image_path, load_font, render_grid, save_image, Crossword,
    FillFailure, FillOptions,
};
use instant::Duration;
use log::{error, info, warn};

/// Fill a crossword structure with words from a word list.
#[derive(Debug, Parser)]
#[command(name = "crossfill", version)]
struct Args {
    /// Structure file: one row per line, `_` for a fillable cell.
    structure: PathBuf,

    /// Word list: one word per line.
    words: PathBuf,

    /// Also save the fill here: an image for .png/.jpg/.jpeg, otherwise the text grid.
    output: Option<PathBuf>,

    /// Font used to draw letters into an image OUTPUT.
    #[arg(long, value_name = "FILE")]
    font: Option<PathBuf>,

    /// Give up after this many seconds.
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<u64>,
}

fn main() -> Result<()> {
    // Defaults to RUST_LOG if set, otherwise INFO
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();

    let args = Args::parse();

    let crossword = Crossword::load(&args.structure, &args.words)
        .context("Failed to load crossword input")?;
    info!(
        "Loaded {}x{} grid with {} slots and {} words",
        crossword.width(),
        crossword.height(),
        crossword.variables().len(),
        crossword.words().len()
    );

    let options = FillOptions {
        deadline: args.timeout.map(Duration::from_secs),
    };

    match find_fill_with_options(&crossword, options) {
        Ok(result) => {
            info!("{:?}", result.statistics);
            let display_grid = render_grid(&crossword, &result.assignment);
            println!("{}", display_grid);

            match &args.output {
                Some(output) if is_image_path(output) => {
                    let font = args.font.as_ref().map(|path| load_font(path)).transpose()?;
                    if font.is_none() {
                        warn!("No --font given, the image will have empty cells");
                    }
                    save_image(&crossword, &result.assignment, output, font.as_ref())
                        .with_context(|| format!("Unable to write {}", output.display()))?;
                    info!("Written image to {}", output.display());
                }
                Some(output) => {
                    fs::write(output, display_grid)
                        .with_context(|| format!("Unable to write {}", output.display()))?;
                    info!("Written fill to {}", output.display());
                }
                None => {}
            }
        }
        Err(FillFailure::NoSolution) => println!("No solution."),
        Err(failure) => {
            error!("{failure}");
            std::process::exit(1);
        }
    }

    Ok(())
}
