mod audio;
mod cli;
mod decode;
mod error;
mod fetch;
mod frame;
mod grid;
mod options;
mod pipeline;
mod render;
mod sixel;
mod sizer;
mod term;
mod viewer;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::Cli;
use std::io::{self, BufRead, Write};
use std::path::Path;

fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.has_job() {
        run_jobs(&cli)
    } else {
        run_menu(&cli)
    }
}

fn run_jobs(cli: &Cli) -> Result<()> {
    let options = cli.to_options();

    if let Some(url) = &cli.image {
        viewer::render_still_url(url, &options)
            .with_context(|| format!("failed to render image {url}"))?;
    }
    if let Some(url) = &cli.gif {
        viewer::render_animated_url(url, &options)
            .with_context(|| format!("failed to render GIF {url}"))?;
    }
    if let Some(url) = &cli.video {
        viewer::render_video_url(url, &options)
            .with_context(|| format!("failed to play video {url}"))?;
    }
    if let Some(path) = &cli.local_video {
        viewer::render_video_file(path, &options)
            .with_context(|| format!("failed to play video file {}", path.display()))?;
    }
    if !cli.grid.is_empty() {
        grid::render_grid_urls(&cli.grid, cli.grid_cols, &options)
            .context("failed to render image grid")?;
    }
    Ok(())
}

fn run_menu(cli: &Cli) -> Result<()> {
    let options = cli.to_options();

    println!("sakura terminal media player");
    println!("1. Image\n2. GIF\n3. Video (URL)\n4. Video (file)");
    let choice = prompt("Choose option (1-4): ")?;

    match choice.as_str() {
        "1" => {
            let url = prompt("Enter image URL: ")?;
            viewer::render_still_url(&url, &options)
        }
        "2" => {
            let url = prompt("Enter GIF URL: ")?;
            viewer::render_animated_url(&url, &options)
        }
        "3" => {
            let url = prompt("Enter video URL: ")?;
            viewer::render_video_url(&url, &options)
        }
        "4" => {
            let path = prompt("Enter video file path: ")?;
            viewer::render_video_file(Path::new(&path), &options)
        }
        _ => {
            println!("Invalid choice, rendering an image instead.");
            let url = prompt("Enter image URL: ")?;
            viewer::render_still_url(&url, &options)
        }
    }
}

fn prompt(message: &str) -> Result<String> {
    print!("{message}");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed reading from stdin")?;
    let trimmed = line.trim();
    if trimmed.is_empty() {
        bail!("no input provided");
    }
    Ok(trimmed.to_owned())
}
