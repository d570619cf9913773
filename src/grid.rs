use crate::fetch;
use crate::frame::BgrFrame;
use crate::options::{RenderMode, RenderOptions};
use crate::render;
use crate::term;
use anyhow::{bail, Context, Result};
use std::io::{self, Write};

/// Downloads and renders N stills into a C-column character grid. A URL
/// that fails to download or decode leaves its cell blank instead of
/// aborting the whole grid.
pub fn render_grid_urls(urls: &[String], cols: usize, options: &RenderOptions) -> Result<()> {
    if urls.is_empty() || cols == 0 {
        bail!("grid rendering needs at least one URL and one column");
    }

    let cols = cols.min(urls.len());
    let rows = urls.len().div_ceil(cols);
    let (term_w, term_h) = term::cell_size();
    let cell_width = (term_w as usize / cols).max(1);
    let cell_height = (term_h as usize / rows).max(1);

    // Grid cells interleave text lines, so the SIXEL mode falls back to
    // half-block rendering here.
    let mut cell_options = options.clone();
    if cell_options.mode == RenderMode::Sixel {
        cell_options.mode = RenderMode::HalfBlock;
    }

    let mut renderings = Vec::with_capacity(urls.len());
    for url in urls {
        match cell_lines(url, cell_width, cell_height, &cell_options) {
            Ok(lines) => renderings.push(lines),
            Err(err) => {
                eprintln!("Warning: skipping grid cell {url}: {err:#}");
                renderings.push(Vec::new());
            }
        }
    }

    let composed = compose_rows(&renderings, cols, cell_width, cell_height);
    let mut stdout = io::stdout().lock();
    for line in &composed {
        writeln!(stdout, "{line}")?;
    }
    stdout.flush()?;
    Ok(())
}

fn cell_lines(
    url: &str,
    cell_width: usize,
    cell_height: usize,
    options: &RenderOptions,
) -> Result<Vec<String>> {
    let bytes = fetch::download_bytes(url)?;
    let img = image::load_from_memory(&bytes)
        .with_context(|| format!("failed to decode image from {url}"))?;
    let frame = BgrFrame::from_dynamic_image(&img)?;
    let lines = render::render_to_lines(&frame, options, (cell_width as u32, cell_height as u32))?;
    Ok(lines)
}

/// Row-interleaves pre-rendered line lists: output line `r * cell_height + i`
/// concatenates line `i` of every rendering in grid row `r`, padding short
/// renderings with spaces of the cell width.
#[must_use]
pub fn compose_rows(
    renderings: &[Vec<String>],
    cols: usize,
    cell_width: usize,
    cell_height: usize,
) -> Vec<String> {
    if renderings.is_empty() || cols == 0 || cell_height == 0 {
        return Vec::new();
    }

    let rows = renderings.len().div_ceil(cols);
    let blank = " ".repeat(cell_width);
    let mut out = Vec::with_capacity(rows * cell_height);

    for row in 0..rows {
        for line_idx in 0..cell_height {
            let mut line = String::new();
            for col in 0..cols {
                let cell = row * cols + col;
                if cell >= renderings.len() {
                    break;
                }
                match renderings[cell].get(line_idx) {
                    Some(rendered) => line.push_str(rendered),
                    None => line.push_str(&blank),
                }
            }
            out.push(line);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::compose_rows;

    fn cell(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn rows_are_interleaved_line_by_line() {
        let renderings = vec![cell(&["A1", "A2"]), cell(&["B1", "B2"])];
        let composed = compose_rows(&renderings, 2, 2, 2);
        assert_eq!(composed, vec!["A1B1", "A2B2"]);
    }

    #[test]
    fn short_cells_are_padded_with_spaces() {
        let renderings = vec![cell(&["A1", "A2"]), cell(&["B1"])];
        let composed = compose_rows(&renderings, 2, 2, 2);
        assert_eq!(composed, vec!["A1B1", "A2  "]);
    }

    #[test]
    fn later_grid_rows_use_their_own_renderings() {
        let renderings = vec![cell(&["A"]), cell(&["B"]), cell(&["C"])];
        let composed = compose_rows(&renderings, 2, 1, 1);
        assert_eq!(composed, vec!["AB", "C"]);
    }

    #[test]
    fn empty_input_composes_to_nothing() {
        assert!(compose_rows(&[], 3, 4, 4).is_empty());
    }
}
