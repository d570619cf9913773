use crate::options::{CharStyle, DitherMode, FitMode, RenderMode, RenderOptions, SixelQuality};
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "sakura",
    version,
    about = "Terminal media renderer: SIXEL, true-color half-block and ASCII stills plus real-time video playback"
)]
pub struct Cli {
    /// Render a still image from a URL.
    #[arg(short = 'i', long = "image", value_name = "URL")]
    pub image: Option<String>,

    /// Play an animated image (GIF) from a URL.
    #[arg(short = 'g', long = "gif", value_name = "URL")]
    pub gif: Option<String>,

    /// Download a video from a URL and play it with audio.
    #[arg(short = 'v', long = "video", value_name = "URL")]
    pub video: Option<String>,

    /// Play a local video file with audio.
    #[arg(short = 'l', long = "local-video", value_name = "PATH")]
    pub local_video: Option<PathBuf>,

    /// Render a grid of stills from URLs. Repeat the flag or pass a
    /// comma-separated list.
    #[arg(long = "grid", value_name = "URL", num_args = 1.., value_delimiter = ',')]
    pub grid: Vec<String>,

    /// Number of grid columns.
    #[arg(long, default_value_t = 2)]
    pub grid_cols: usize,

    /// Target width in pixels (SIXEL) or cells (text modes); 0 fits the terminal.
    #[arg(long, default_value_t = 0)]
    pub width: u32,

    /// Target height in pixels (SIXEL) or cells (text modes); 0 fits the terminal.
    #[arg(long, default_value_t = 0)]
    pub height: u32,

    /// Frame renderer.
    #[arg(long, value_enum, default_value_t = RenderMode::Sixel)]
    pub mode: RenderMode,

    /// Character ramp for grayscale ASCII output.
    #[arg(long, value_enum, default_value_t = CharStyle::Simple)]
    pub style: CharStyle,

    /// Quantization dithering.
    #[arg(long, value_enum, default_value_t = DitherMode::FloydSteinberg)]
    pub dither: DitherMode,

    /// SIXEL palette size, clamped to 1..=256.
    #[arg(long, default_value_t = 256)]
    pub palette_size: u16,

    /// SIXEL encode quality.
    #[arg(long, value_enum, default_value_t = SixelQuality::Low)]
    pub sixel_quality: SixelQuality,

    /// How video frames fill the terminal box.
    #[arg(long, value_enum, default_value_t = FitMode::Cover)]
    pub fit: FitMode,

    /// Playback frame-rate cap; 0 follows the source rate.
    #[arg(long, default_value_t = 0.0)]
    pub target_fps: f64,

    /// Use the fast nearest-neighbour filter for video pre-scaling.
    #[arg(long, default_value_t = false)]
    pub fast_resize: bool,

    /// In-flight frames per pipeline queue.
    #[arg(long, default_value_t = 48)]
    pub queue_size: usize,

    /// Encoded frames buffered before playback starts.
    #[arg(long, default_value_t = 12)]
    pub prebuffer: usize,

    /// Cell aspect correction applied to pixel-accurate modes.
    #[arg(long, default_value_t = 1.0)]
    pub terminal_aspect_ratio: f64,

    /// Contrast multiplier; 1.0 leaves the source untouched.
    #[arg(long, default_value_t = 1.0)]
    pub contrast: f64,

    /// Brightness offset added per channel.
    #[arg(long, default_value_t = 0.0)]
    pub brightness: f64,
}

impl Cli {
    #[must_use]
    pub fn to_options(&self) -> RenderOptions {
        RenderOptions {
            width: self.width,
            height: self.height,
            mode: self.mode,
            style: self.style,
            dither: self.dither,
            palette_size: self.palette_size,
            sixel_quality: self.sixel_quality,
            fit: self.fit,
            target_fps: self.target_fps.max(0.0),
            fast_resize: self.fast_resize,
            queue_size: self.queue_size,
            prebuffer_frames: self.prebuffer,
            terminal_aspect_ratio: self.terminal_aspect_ratio,
            contrast: self.contrast,
            brightness: self.brightness,
            ..RenderOptions::default()
        }
    }

    /// True when any non-interactive job was requested.
    #[must_use]
    pub fn has_job(&self) -> bool {
        self.image.is_some()
            || self.gif.is_some()
            || self.video.is_some()
            || self.local_video.is_some()
            || !self.grid.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use crate::options::RenderMode;
    use clap::Parser;

    #[test]
    fn short_flags_match_the_documented_surface() {
        let cli = Cli::parse_from(["sakura", "-i", "http://example.com/a.png"]);
        assert_eq!(cli.image.as_deref(), Some("http://example.com/a.png"));
        assert!(cli.has_job());

        let cli = Cli::parse_from(["sakura", "-l", "/tmp/clip.mp4"]);
        assert!(cli.local_video.is_some());

        let cli = Cli::parse_from(["sakura", "-v", "http://example.com/v.mp4"]);
        assert!(cli.video.is_some());

        let cli = Cli::parse_from(["sakura", "-g", "http://example.com/a.gif"]);
        assert!(cli.gif.is_some());
    }

    #[test]
    fn no_arguments_means_interactive_mode() {
        let cli = Cli::parse_from(["sakura"]);
        assert!(!cli.has_job());
    }

    #[test]
    fn tuning_flags_flow_into_render_options() {
        let cli = Cli::parse_from([
            "sakura",
            "-l",
            "/tmp/clip.mp4",
            "--mode",
            "half-block",
            "--palette-size",
            "128",
            "--target-fps",
            "15",
            "--queue-size",
            "8",
            "--prebuffer",
            "2",
            "--fast-resize",
        ]);
        let options = cli.to_options();
        assert_eq!(options.mode, RenderMode::HalfBlock);
        assert_eq!(options.palette_size, 128);
        assert_eq!(options.target_fps, 15.0);
        assert_eq!(options.queue_size, 8);
        assert_eq!(options.prebuffer_frames, 2);
        assert!(options.fast_resize);
    }

    #[test]
    fn fast_resize_defaults_off() {
        let cli = Cli::parse_from(["sakura", "-l", "/tmp/clip.mp4"]);
        assert!(!cli.to_options().fast_resize);
    }

    #[test]
    fn grid_urls_accept_comma_separated_lists() {
        let cli = Cli::parse_from(["sakura", "--grid", "http://a/1.png,http://a/2.png"]);
        assert_eq!(cli.grid.len(), 2);
        assert!(cli.has_job());
    }
}
