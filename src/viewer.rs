use crate::decode::{FrameSource, VideoSource};
use crate::error::RenderError;
use crate::fetch;
use crate::frame::BgrFrame;
use crate::options::{RenderMode, RenderOptions};
use crate::pipeline;
use crate::render;
use crate::sixel;
use crate::sizer;
use crate::term;
use anyhow::{Context, Result};
use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Downloads a still image and renders it with the configured mode.
pub fn render_still_url(url: &str, options: &RenderOptions) -> Result<()> {
    let bytes = fetch::download_bytes(url)?;
    let img = image::load_from_memory(&bytes)
        .with_context(|| format!("failed to decode image from {url}"))?;
    let frame = BgrFrame::from_dynamic_image(&img)?;
    render_still_frame(&frame, options)
}

/// Renders an already-decoded frame to stdout.
pub fn render_still_frame(frame: &BgrFrame, options: &RenderOptions) -> Result<()> {
    if options.mode == RenderMode::Sixel {
        let requested =
            sizer::resolve_requested((options.width, options.height), term::pixel_size());
        let plan = sizer::still_plan((frame.width(), frame.height()), requested, options);
        let resized = frame.resize(plan.width, plan.height, plan.filter)?;
        let payload = sixel::encode_frame(&resized, options, Some((plan.width, plan.height)));
        if payload.is_empty() {
            return Err(RenderError::EncodeFailed.into());
        }
        let mut stdout = io::stdout().lock();
        stdout.write_all(&payload)?;
        stdout.flush()?;
        return Ok(());
    }

    let requested = sizer::resolve_requested((options.width, options.height), term::cell_size());
    let lines = render::render_to_lines(frame, options, requested)?;
    let mut stdout = io::stdout().lock();
    for line in &lines {
        writeln!(stdout, "{line}")?;
    }
    stdout.flush()?;
    Ok(())
}

/// Downloads an animated image and plays it through the video pipeline,
/// without an audio side-channel.
pub fn render_animated_url(url: &str, options: &RenderOptions) -> Result<()> {
    let media = fetch::download_to_temp(url)?;
    play_file(media.path(), options, false)
}

/// Downloads a remote video to a private temp file and plays it with audio.
/// The temp file is unlinked whatever the outcome.
pub fn render_video_url(url: &str, options: &RenderOptions) -> Result<()> {
    let media = fetch::download_to_temp(url)?;
    play_file(media.path(), options, true)
}

/// Plays a local video file with audio.
pub fn render_video_file(path: &Path, options: &RenderOptions) -> Result<()> {
    play_file(path, options, true)
}

fn play_file(path: &Path, options: &RenderOptions, with_audio: bool) -> Result<()> {
    let source =
        VideoSource::open(path).with_context(|| format!("failed to open {}", path.display()))?;

    eprintln!(
        "Playing {}: {:.1} fps, {} frames",
        path.display(),
        source.fps(),
        source
            .frame_count()
            .map_or_else(|| "unknown".to_owned(), |n| n.to_string())
    );

    let mut resolved = options.clone();
    let probe = match resolved.mode {
        RenderMode::Sixel => term::pixel_size(),
        _ => term::cell_size(),
    };
    (resolved.width, resolved.height) =
        sizer::resolve_requested((resolved.width, resolved.height), probe);

    let cancel = Arc::new(AtomicBool::new(false));
    let audio_path = with_audio.then_some(path);
    let mut guard = term::CursorGuard::armed();
    let outcome = {
        let mut stdout = io::stdout().lock();
        pipeline::run(source, &resolved, &mut stdout, audio_path, cancel)
    };
    guard.restore();

    outcome
        .map(|_| ())
        .with_context(|| format!("playback of {} failed", path.display()))
}
