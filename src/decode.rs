use crate::error::RenderError;
use crate::frame::BgrFrame;
use ffmpeg_next as ffmpeg;
use ffmpeg_next::software::scaling::{context::Context as ScalingContext, flag::Flags};
use ffmpeg_next::util::format::Pixel;
use std::path::Path;

/// A stream of decoded BGR frames. The playback engine only ever consumes
/// this surface, so tests can drive it with synthetic sources.
pub trait FrameSource: Send {
    /// Source frame rate; 0 when the container does not report one.
    fn fps(&self) -> f64;
    /// Native frame dimensions.
    fn dimensions(&self) -> (u32, u32);
    /// Total frame count when the container knows it.
    fn frame_count(&self) -> Option<u64>;
    /// Next frame in decode order; `None` at end of stream.
    fn read_frame(&mut self) -> Result<Option<BgrFrame>, RenderError>;
}

/// ffmpeg-backed media source for video files and GIFs.
pub struct VideoSource {
    input: ffmpeg::format::context::Input,
    decoder: ffmpeg::decoder::Video,
    scaler: Option<ScalingContext>,
    stream_index: usize,
    fps: f64,
    frames: Option<u64>,
    eof_sent: bool,
}

impl VideoSource {
    pub fn open(path: &Path) -> Result<Self, RenderError> {
        ffmpeg::init().map_err(|e| RenderError::OpenFailed(format!("{}: {e}", path.display())))?;

        let input = ffmpeg::format::input(&path)
            .map_err(|e| RenderError::OpenFailed(format!("{}: {e}", path.display())))?;

        let stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| {
                RenderError::OpenFailed(format!("{}: no video stream", path.display()))
            })?;
        let stream_index = stream.index();
        let rate = stream.avg_frame_rate();
        let fps = fps_from(rate.numerator(), rate.denominator());
        let frames = u64::try_from(stream.frames()).ok().filter(|&n| n > 0);

        let codec_ctx = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
            .map_err(|e| RenderError::DecodeFailed(e.to_string()))?;
        let decoder = codec_ctx
            .decoder()
            .video()
            .map_err(|e| RenderError::DecodeFailed(e.to_string()))?;
        if decoder.width() == 0 || decoder.height() == 0 {
            return Err(RenderError::OpenFailed(format!(
                "{}: stream reports no dimensions",
                path.display()
            )));
        }

        Ok(Self {
            input,
            decoder,
            scaler: None,
            stream_index,
            fps,
            frames,
            eof_sent: false,
        })
    }

    fn convert(&mut self, decoded: &ffmpeg::util::frame::Video) -> Result<BgrFrame, RenderError> {
        let scaler = match &mut self.scaler {
            Some(scaler) => scaler,
            None => {
                let scaler = ScalingContext::get(
                    decoded.format(),
                    decoded.width(),
                    decoded.height(),
                    Pixel::BGR24,
                    decoded.width(),
                    decoded.height(),
                    Flags::BILINEAR,
                )
                .map_err(|e| RenderError::DecodeFailed(e.to_string()))?;
                self.scaler.insert(scaler)
            }
        };

        let mut bgr = ffmpeg::util::frame::Video::empty();
        scaler
            .run(decoded, &mut bgr)
            .map_err(|e| RenderError::DecodeFailed(e.to_string()))?;

        let width = bgr.width();
        let height = bgr.height();
        let stride = bgr.stride(0);
        let plane = bgr.data(0);
        let row_bytes = width as usize * 3;
        let mut data = Vec::with_capacity(row_bytes * height as usize);
        for y in 0..height as usize {
            let start = y * stride;
            data.extend_from_slice(&plane[start..start + row_bytes]);
        }
        BgrFrame::from_bgr(width, height, data)
    }
}

impl FrameSource for VideoSource {
    fn fps(&self) -> f64 {
        self.fps
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.decoder.width(), self.decoder.height())
    }

    fn frame_count(&self) -> Option<u64> {
        self.frames
    }

    fn read_frame(&mut self) -> Result<Option<BgrFrame>, RenderError> {
        let mut decoded = ffmpeg::util::frame::Video::empty();
        loop {
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                return self.convert(&decoded).map(Some);
            }
            if self.eof_sent {
                return Ok(None);
            }
            match self.input.packets().next() {
                Some((stream, packet)) => {
                    if stream.index() != self.stream_index {
                        continue;
                    }
                    // A corrupt packet is skipped; later packets may recover.
                    let _ = self.decoder.send_packet(&packet);
                }
                None => {
                    let _ = self.decoder.send_eof();
                    self.eof_sent = true;
                }
            }
        }
    }
}

fn fps_from(numerator: i32, denominator: i32) -> f64 {
    if numerator <= 0 || denominator <= 0 {
        return 0.0;
    }
    f64::from(numerator) / f64::from(denominator)
}

#[cfg(test)]
mod tests {
    use super::fps_from;

    #[test]
    fn fps_handles_degenerate_rationals() {
        assert_eq!(fps_from(30, 1), 30.0);
        assert_eq!(fps_from(30000, 1001), 30000.0 / 1001.0);
        assert_eq!(fps_from(0, 0), 0.0);
        assert_eq!(fps_from(-1, 1), 0.0);
        assert_eq!(fps_from(10, 0), 0.0);
    }
}
