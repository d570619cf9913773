use clap::ValueEnum;

pub const MIN_PALETTE: u16 = 1;
pub const MAX_PALETTE: u16 = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RenderMode {
    /// Two vertical pixels per cell via true-color fg/bg.
    HalfBlock,
    /// One colored space per pixel.
    AsciiColor,
    /// Character ramp over grayscale intensity.
    AsciiGray,
    /// SIXEL graphics payload.
    Sixel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CharStyle {
    Simple,
    Detailed,
    Blocks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DitherMode {
    None,
    FloydSteinberg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FitMode {
    Stretch,
    Cover,
    Contain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SixelQuality {
    Low,
    High,
}

/// Per-job render configuration. Built once by the caller and treated as
/// immutable for the duration of the job.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Target width; 0 derives from the terminal probe.
    pub width: u32,
    /// Target height; 0 derives from the terminal probe.
    pub height: u32,
    pub mode: RenderMode,
    pub style: CharStyle,
    pub dither: DitherMode,
    pub palette_size: u16,
    pub sixel_quality: SixelQuality,
    pub aspect_ratio: bool,
    /// Cell aspect correction applied to pixel-accurate modes.
    pub terminal_aspect_ratio: f64,
    pub contrast: f64,
    pub brightness: f64,
    pub fit: FitMode,
    pub queue_size: usize,
    pub prebuffer_frames: usize,
    pub static_palette: bool,
    pub fast_resize: bool,
    /// 0 follows the source rate; otherwise downsample to this.
    pub target_fps: f64,
    pub adaptive_palette: bool,
    pub min_palette_size: u16,
    pub max_palette_size: u16,
    pub adaptive_scale: bool,
    pub min_scale_factor: f64,
    pub max_scale_factor: f64,
    pub scale_step: f64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            mode: RenderMode::HalfBlock,
            style: CharStyle::Simple,
            dither: DitherMode::None,
            palette_size: 256,
            sixel_quality: SixelQuality::Low,
            aspect_ratio: true,
            terminal_aspect_ratio: 1.0,
            contrast: 1.0,
            brightness: 0.0,
            fit: FitMode::Cover,
            queue_size: 16,
            prebuffer_frames: 4,
            static_palette: true,
            fast_resize: false,
            target_fps: 0.0,
            adaptive_palette: false,
            min_palette_size: 64,
            max_palette_size: 256,
            adaptive_scale: false,
            min_scale_factor: 0.80,
            max_scale_factor: 1.00,
            scale_step: 0.05,
        }
    }
}

impl RenderOptions {
    #[must_use]
    pub fn clamped_palette(&self) -> u16 {
        self.palette_size.clamp(MIN_PALETTE, MAX_PALETTE)
    }

    #[must_use]
    pub fn queue_capacity(&self) -> usize {
        self.queue_size.max(1)
    }

    /// Encoded frames accumulated before the writer starts emitting. Capped
    /// at the queue capacity so the gate can always be satisfied.
    #[must_use]
    pub fn prebuffer_target(&self) -> usize {
        self.prebuffer_frames.max(16).min(self.queue_capacity())
    }

    #[must_use]
    pub fn wants_adjustment(&self) -> bool {
        self.contrast != 1.0 || self.brightness != 0.0
    }
}
