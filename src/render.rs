use crate::error::RenderError;
use crate::frame::BgrFrame;
use crate::options::{CharStyle, DitherMode, RenderMode, RenderOptions};
use crate::sizer;
use std::fmt::Write as _;

pub const ASCII_SIMPLE: &str = " .:-=+*#%@";
pub const ASCII_DETAILED: &str =
    " .'`^\",:;Il!i><~+_-?][}{1)(|\\/tfjrxnuvczXYUJCLQ0OZmwqpdbkhao*#MW&8%B@$";
pub const ASCII_BLOCKS: &str = " \u{2591}\u{2592}\u{2593}\u{2588}";

#[must_use]
pub fn char_ramp(style: CharStyle) -> &'static str {
    match style {
        CharStyle::Simple => ASCII_SIMPLE,
        CharStyle::Detailed => ASCII_DETAILED,
        CharStyle::Blocks => ASCII_BLOCKS,
    }
}

/// Preprocesses (contrast/brightness, aspect, resize) and formats a frame
/// with the configured still renderer. `requested` must already be
/// probe-resolved. SIXEL is not a line-oriented renderer and yields an
/// empty list.
pub fn render_to_lines(
    frame: &BgrFrame,
    options: &RenderOptions,
    requested: (u32, u32),
) -> Result<Vec<String>, RenderError> {
    let adjusted;
    let input = if options.wants_adjustment() {
        adjusted = frame.adjusted(options.contrast, options.brightness);
        &adjusted
    } else {
        frame
    };

    let plan = sizer::still_plan((input.width(), input.height()), requested, options);
    let resized = input.resize(plan.width, plan.height, plan.filter)?;

    Ok(match options.mode {
        RenderMode::HalfBlock => half_block_lines(&resized),
        RenderMode::AsciiColor => ascii_color_lines(&resized),
        RenderMode::AsciiGray => ascii_gray_lines(&resized, options.style, options.dither),
        RenderMode::Sixel => Vec::new(),
    })
}

/// One text row per two pixel rows: bottom pixel as background, top pixel
/// as foreground on an upper-half-block. The top row is duplicated when the
/// bottom one runs past the frame.
#[must_use]
pub fn half_block_lines(frame: &BgrFrame) -> Vec<String> {
    let rows = frame.height().div_ceil(2);
    let mut lines = Vec::with_capacity(rows as usize);
    for k in 0..rows {
        let mut line = String::with_capacity(frame.width() as usize * 40);
        for x in 0..frame.width() {
            let top = frame.pixel(x, 2 * k);
            let bottom = if 2 * k + 1 < frame.height() {
                frame.pixel(x, 2 * k + 1)
            } else {
                top
            };
            let _ = write!(
                line,
                "\x1b[48;2;{};{};{}m\x1b[38;2;{};{};{}m\u{2580}\x1b[0m",
                bottom[2], bottom[1], bottom[0], top[2], top[1], top[0]
            );
        }
        lines.push(line);
    }
    lines
}

/// Half-block lines flattened into one write-ready payload.
#[must_use]
pub fn half_block_payload(frame: &BgrFrame) -> Vec<u8> {
    let lines = half_block_lines(frame);
    let mut payload = Vec::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
    for line in &lines {
        payload.extend_from_slice(line.as_bytes());
        payload.push(b'\n');
    }
    payload
}

/// One colored space per pixel.
#[must_use]
pub fn ascii_color_lines(frame: &BgrFrame) -> Vec<String> {
    let mut lines = Vec::with_capacity(frame.height() as usize);
    for y in 0..frame.height() {
        let mut line = String::with_capacity(frame.width() as usize * 24);
        for x in 0..frame.width() {
            let [b, g, r] = frame.pixel(x, y);
            let _ = write!(line, "\x1b[48;2;{r};{g};{b}m \x1b[0m");
        }
        lines.push(line);
    }
    lines
}

/// Grayscale intensity mapped onto a character ramp, optionally with
/// Floyd-Steinberg error diffusion.
#[must_use]
pub fn ascii_gray_lines(frame: &BgrFrame, style: CharStyle, dither: DitherMode) -> Vec<String> {
    let ramp: Vec<char> = char_ramp(style).chars().collect();
    let gray = frame.to_gray();
    let width = frame.width() as usize;
    let height = frame.height() as usize;

    match dither {
        DitherMode::None => {
            let mut lines = Vec::with_capacity(height);
            for y in 0..height {
                let mut line = String::with_capacity(width);
                for x in 0..width {
                    let intensity = gray[y * width + x] as usize;
                    let idx = intensity * (ramp.len() - 1) / 255;
                    line.push(ramp[idx]);
                }
                lines.push(line);
            }
            lines
        }
        DitherMode::FloydSteinberg => floyd_steinberg_lines(&gray, width, height, &ramp),
    }
}

/// Error diffusion with the 7/16, 3/16, 5/16, 1/16 kernel, left to right,
/// top to bottom, indices clamped at the frame edges.
fn floyd_steinberg_lines(gray: &[u8], width: usize, height: usize, ramp: &[char]) -> Vec<String> {
    let levels = ramp.len().saturating_sub(1).max(1);
    let mut error = vec![0.0_f32; width * height];
    let mut lines = Vec::with_capacity(height);

    for y in 0..height {
        let mut line = String::with_capacity(width);
        for x in 0..width {
            let i = y * width + x;
            let old = (f32::from(gray[i]) / 255.0 + error[i]).clamp(0.0, 1.0);
            let level = ((old * levels as f32).round() as usize).min(levels);
            let chosen = level as f32 / levels as f32;
            let residual = old - chosen;

            if x + 1 < width {
                error[i + 1] += residual * 7.0 / 16.0;
            }
            if y + 1 < height {
                if x > 0 {
                    error[i + width - 1] += residual * 3.0 / 16.0;
                }
                error[i + width] += residual * 5.0 / 16.0;
                if x + 1 < width {
                    error[i + width + 1] += residual * 1.0 / 16.0;
                }
            }
            line.push(ramp[level]);
        }
        lines.push(line);
    }
    lines
}
