use crate::frame::ResizeFilter;
use crate::options::{FitMode, RenderMode, RenderOptions};

/// Source fps above which video frames switch to nearest-neighbour scaling.
const FAST_SCALE_FPS: f64 = 20.0;

/// Target pixel dimensions plus the interpolation to reach them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizePlan {
    pub width: u32,
    pub height: u32,
    pub filter: ResizeFilter,
}

/// Replaces zero components of a requested size with probed terminal values.
#[must_use]
pub fn resolve_requested(requested: (u32, u32), probe: (u32, u32)) -> (u32, u32) {
    let width = if requested.0 == 0 { probe.0 } else { requested.0 };
    let height = if requested.1 == 0 { probe.1 } else { requested.1 };
    (width, height)
}

/// Target size for a still render. `requested` must already be
/// probe-resolved; the result carries the doubled pixel height for
/// half-block output.
#[must_use]
pub fn still_plan(source: (u32, u32), requested: (u32, u32), options: &RenderOptions) -> SizePlan {
    let (mut width, mut height) = requested;
    if options.aspect_ratio {
        let aspect = corrected_aspect(source, options);
        (width, height) = contain(aspect, width, height);
    }
    SizePlan {
        width: width.max(1),
        height: mode_height(height.max(1), options.mode),
        filter: ResizeFilter::Area,
    }
}

/// Target size for video frames: aspect-preserving fit into `bound`
/// followed by the configured fit mode.
#[must_use]
pub fn video_plan(
    source: (u32, u32),
    bound: (u32, u32),
    source_fps: f64,
    options: &RenderOptions,
) -> SizePlan {
    let (bound_w, bound_h) = (bound.0.max(1), bound.1.max(1));
    let (width, height) = if options.aspect_ratio {
        let aspect = corrected_aspect(source, options);
        match options.fit {
            FitMode::Stretch => (bound_w, bound_h),
            FitMode::Contain => contain(aspect, bound_w, bound_h),
            FitMode::Cover => cover(aspect, bound_w, bound_h),
        }
    } else {
        (bound_w, bound_h)
    };

    let filter = if options.fit == FitMode::Contain {
        ResizeFilter::Area
    } else if options.fast_resize || source_fps > FAST_SCALE_FPS {
        ResizeFilter::Nearest
    } else {
        ResizeFilter::Cubic
    };

    SizePlan {
        width: width.max(1),
        height: mode_height(height.max(1), options.mode),
        filter,
    }
}

/// Source aspect divided by the cell correction for pixel-accurate modes.
fn corrected_aspect(source: (u32, u32), options: &RenderOptions) -> f64 {
    let mut aspect = f64::from(source.0.max(1)) / f64::from(source.1.max(1));
    if matches!(
        options.mode,
        RenderMode::HalfBlock | RenderMode::AsciiColor | RenderMode::Sixel
    ) && options.terminal_aspect_ratio > 0.0
    {
        aspect /= options.terminal_aspect_ratio;
    }
    aspect
}

/// Shrinks the larger dimension so the aspect fits inside the box.
fn contain(aspect: f64, bound_w: u32, bound_h: u32) -> (u32, u32) {
    if aspect > f64::from(bound_w) / f64::from(bound_h) {
        (bound_w, ((f64::from(bound_w) / aspect) as u32).max(1))
    } else {
        (((f64::from(bound_h) * aspect) as u32).max(1), bound_h)
    }
}

/// Grows the smaller dimension so the aspect fills the box; the overflow on
/// the other axis is cropped by the resize downstream.
fn cover(aspect: f64, bound_w: u32, bound_h: u32) -> (u32, u32) {
    if aspect > f64::from(bound_w) / f64::from(bound_h) {
        (((f64::from(bound_h) * aspect) as u32).max(1), bound_h)
    } else {
        (bound_w, ((f64::from(bound_w) / aspect) as u32).max(1))
    }
}

/// One text row carries two pixel rows in half-block output.
const fn mode_height(height: u32, mode: RenderMode) -> u32 {
    match mode {
        RenderMode::HalfBlock => height * 2,
        _ => height,
    }
}

#[cfg(test)]
mod tests {
    use super::{resolve_requested, still_plan, video_plan};
    use crate::frame::ResizeFilter;
    use crate::options::{FitMode, RenderMode, RenderOptions};

    fn options(mode: RenderMode) -> RenderOptions {
        RenderOptions {
            mode,
            ..RenderOptions::default()
        }
    }

    #[test]
    fn zero_components_take_probe_values() {
        assert_eq!(resolve_requested((0, 0), (80, 24)), (80, 24));
        assert_eq!(resolve_requested((100, 0), (80, 24)), (100, 24));
        assert_eq!(resolve_requested((100, 50), (80, 24)), (100, 50));
    }

    #[test]
    fn still_plan_preserves_source_aspect_within_tolerance() {
        let opts = options(RenderMode::AsciiGray);
        let plan = still_plan((1920, 1080), (80, 24), &opts);
        assert_eq!((plan.width, plan.height), (42, 24));

        let out_aspect = f64::from(plan.width) / f64::from(plan.height);
        let src_aspect = 1920.0 / 1080.0;
        assert!((out_aspect - src_aspect).abs() <= 1.0 / f64::from(plan.height.min(plan.width)));
    }

    #[test]
    fn half_block_doubles_the_pixel_height() {
        let opts = options(RenderMode::HalfBlock);
        let plan = still_plan((100, 100), (10, 10), &opts);
        assert_eq!((plan.width, plan.height), (10, 20));
        assert_eq!(plan.filter, ResizeFilter::Area);
    }

    #[test]
    fn terminal_aspect_correction_applies_to_pixel_modes_only() {
        let mut sixel = options(RenderMode::Sixel);
        sixel.terminal_aspect_ratio = 2.0;
        let plan = still_plan((100, 100), (40, 40), &sixel);
        // Corrected aspect 0.5: width shrinks to half the height.
        assert_eq!((plan.width, plan.height), (20, 40));

        let mut gray = options(RenderMode::AsciiGray);
        gray.terminal_aspect_ratio = 2.0;
        let plan = still_plan((100, 100), (40, 40), &gray);
        assert_eq!((plan.width, plan.height), (40, 40));
    }

    #[test]
    fn stretch_keeps_the_requested_box() {
        let mut opts = options(RenderMode::Sixel);
        opts.fit = FitMode::Stretch;
        let plan = video_plan((1280, 720), (640, 480), 30.0, &opts);
        assert_eq!((plan.width, plan.height), (640, 480));
    }

    #[test]
    fn contain_shrinks_inside_the_box() {
        let mut opts = options(RenderMode::Sixel);
        opts.fit = FitMode::Contain;
        let plan = video_plan((1280, 720), (640, 480), 30.0, &opts);
        assert_eq!((plan.width, plan.height), (640, 360));
        assert_eq!(plan.filter, ResizeFilter::Area);
    }

    #[test]
    fn cover_fills_the_box_and_overflows_one_axis() {
        let mut opts = options(RenderMode::Sixel);
        opts.fit = FitMode::Cover;
        let plan = video_plan((1280, 720), (640, 480), 30.0, &opts);
        assert_eq!((plan.width, plan.height), (853, 480));
        assert!(plan.width >= 640 && plan.height >= 480);
    }

    #[test]
    fn video_filter_follows_speed_hints() {
        let mut opts = options(RenderMode::Sixel);
        opts.fit = FitMode::Cover;

        let slow = video_plan((640, 480), (640, 480), 15.0, &opts);
        assert_eq!(slow.filter, ResizeFilter::Cubic);

        let high_fps = video_plan((640, 480), (640, 480), 30.0, &opts);
        assert_eq!(high_fps.filter, ResizeFilter::Nearest);

        opts.fast_resize = true;
        let fast = video_plan((640, 480), (640, 480), 15.0, &opts);
        assert_eq!(fast.filter, ResizeFilter::Nearest);
    }

    #[test]
    fn degenerate_boxes_stay_at_least_one_pixel() {
        let opts = options(RenderMode::AsciiGray);
        let plan = still_plan((4000, 10), (2, 2), &opts);
        assert!(plan.width >= 1 && plan.height >= 1);
    }
}
