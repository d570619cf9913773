use crate::frame::BgrFrame;
use crate::options::{DitherMode, RenderOptions, SixelQuality, MAX_PALETTE};
use icy_sixel::{sixel_encode, EncodeOptions};

/// Encodes one BGR frame to a SIXEL payload. The encoder resources live for
/// exactly this call. Any failure, or an empty input, yields an empty
/// payload; callers treat that as a dropped frame and stdout is never
/// touched from here.
#[must_use]
pub fn encode_frame(
    frame: &BgrFrame,
    options: &RenderOptions,
    output_dims: Option<(u32, u32)>,
) -> Vec<u8> {
    encode(
        frame,
        options.clamped_palette(),
        options.sixel_quality,
        options.dither,
        output_dims,
    )
}

#[must_use]
pub fn encode(
    frame: &BgrFrame,
    palette_size: u16,
    quality: SixelQuality,
    dither: DitherMode,
    output_dims: Option<(u32, u32)>,
) -> Vec<u8> {
    if frame.is_empty() {
        return Vec::new();
    }

    let width = frame.width() as usize;
    let height = frame.height() as usize;
    let mut rgba = rgb_to_rgba(&frame.to_rgb());

    // The encoder quantizes against its full palette; a smaller request is
    // honoured by reducing the color resolution of the buffer first.
    let palette = palette_size.clamp(1, MAX_PALETTE);
    if palette < MAX_PALETTE {
        let diffuse = dither == DitherMode::FloydSteinberg || quality == SixelQuality::High;
        reduce_palette(&mut rgba, width, height, channel_levels(palette), diffuse);
    }

    let mut payload = match sixel_encode(&rgba, width, height, &EncodeOptions::default()) {
        Ok(text) if !text.is_empty() => text.into_bytes(),
        _ => return Vec::new(),
    };

    if let Some((out_w, out_h)) = output_dims {
        insert_raster_attributes(&mut payload, out_w, out_h);
    }
    payload
}

fn rgb_to_rgba(rgb: &[u8]) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(rgb.len() / 3 * 4);
    for pixel in rgb.chunks_exact(3) {
        rgba.extend_from_slice(pixel);
        rgba.push(255);
    }
    rgba
}

/// Levels per channel whose cube stays within the requested palette,
/// never below two.
fn channel_levels(palette_size: u16) -> u8 {
    let mut levels = 2_u8;
    while u32::from(levels + 1).pow(3) <= u32::from(palette_size) {
        levels += 1;
    }
    levels
}

/// Snaps every color channel to `levels` evenly spaced values, optionally
/// diffusing the residual with the 7/16, 3/16, 5/16, 1/16 kernel. Alpha is
/// left untouched.
fn reduce_palette(rgba: &mut [u8], width: usize, height: usize, levels: u8, diffuse: bool) {
    if width == 0 || height == 0 || levels < 2 {
        return;
    }
    let step = 255.0 / f32::from(levels - 1);

    if !diffuse {
        for pixel in rgba.chunks_exact_mut(4) {
            for channel in &mut pixel[..3] {
                *channel = snap(f32::from(*channel), step);
            }
        }
        return;
    }

    let mut error = vec![[0.0_f32; 3]; width * height];
    for y in 0..height {
        for x in 0..width {
            let i = y * width + x;
            let base = i * 4;
            for c in 0..3 {
                let old = (f32::from(rgba[base + c]) + error[i][c]).clamp(0.0, 255.0);
                let snapped = snap(old, step);
                let residual = old - f32::from(snapped);
                rgba[base + c] = snapped;

                if x + 1 < width {
                    error[i + 1][c] += residual * 7.0 / 16.0;
                }
                if y + 1 < height {
                    if x > 0 {
                        error[i + width - 1][c] += residual * 3.0 / 16.0;
                    }
                    error[i + width][c] += residual * 5.0 / 16.0;
                    if x + 1 < width {
                        error[i + width + 1][c] += residual * 1.0 / 16.0;
                    }
                }
            }
        }
    }
}

fn snap(value: f32, step: f32) -> u8 {
    ((value / step).round() * step).clamp(0.0, 255.0).round() as u8
}

/// Splices the raster-attributes header `"1;1;W;H` in front of the first
/// palette marker when the encoder did not emit one, so fixed-size
/// terminals scale the image.
fn insert_raster_attributes(payload: &mut Vec<u8>, width: u32, height: u32) {
    if width == 0 || height == 0 {
        return;
    }
    let Some(pos) = payload.iter().position(|&b| b == b'#') else {
        return;
    };
    if payload[..pos].contains(&b'"') {
        return;
    }
    let attrs = format!("\"1;1;{width};{height}");
    payload.splice(pos..pos, attrs.into_bytes());
}
