use crate::audio::AudioPlayer;
use crate::decode::FrameSource;
use crate::error::RenderError;
use crate::frame::BgrFrame;
use crate::options::{RenderMode, RenderOptions};
use crate::render;
use crate::sixel;
use crate::sizer::{self, SizePlan};
use crate::term;
use parking_lot::{Condvar, Mutex};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

/// Writer drops queued frames older than this many frame slots.
const WRITER_STALE_THRESHOLD: u64 = 2;
/// Stale frames are still emitted once the queue shrinks to this tail.
const WRITER_DROP_TAIL: usize = 2;
/// Reader skips source frames once it trails the schedule by this much.
const READER_BEHIND_THRESHOLD: u64 = 2;
/// Reader-side skips stay below this share of all reads.
const READER_MAX_DROP_RATIO: f64 = 0.30;
/// Bounded writer wait during queue underruns.
const UNDERRUN_WAIT: Duration = Duration::from_millis(50);
/// Final stretch of each frame deadline is spun, not slept.
const SPIN_WINDOW: Duration = Duration::from_micros(500);
/// Grace between the last frame and killing the audio process.
const AUDIO_KILL_GRACE: Duration = Duration::from_millis(50);
/// Containers that report no frame rate play at this rate.
const FALLBACK_SOURCE_FPS: f64 = 30.0;
const PREBUFFER_POLL: Duration = Duration::from_millis(2);
const ADAPT_WINDOW: Duration = Duration::from_secs(1);
const ADAPT_DROP_THRESHOLD: f64 = 0.10;
const ADAPT_CLEAN_WINDOWS: u32 = 3;
const ADAPT_PALETTE_STEP: u32 = 32;

/// Frame accounting reported when a playback job finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackStats {
    pub read: u64,
    pub rendered: u64,
    pub dropped: u64,
}

impl PlaybackStats {
    #[must_use]
    pub fn summary(&self) -> String {
        let denominator = (self.rendered + self.dropped).max(1);
        format!(
            "Playback: read={} rendered={} dropped={} ({:.1}%)",
            self.read,
            self.rendered,
            self.dropped,
            100.0 * self.dropped as f64 / denominator as f64
        )
    }
}

#[derive(Default)]
struct SharedStats {
    read: AtomicU64,
    rendered: AtomicU64,
    dropped: AtomicU64,
}

impl SharedStats {
    fn snapshot(&self) -> PlaybackStats {
        PlaybackStats {
            read: self.read.load(Ordering::Relaxed),
            rendered: self.rendered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

struct RawFrame {
    index: u64,
    frame: BgrFrame,
}

struct EncodedFrame {
    index: u64,
    width: u32,
    height: u32,
    payload: Vec<u8>,
}

enum PopResult<T> {
    Item(T, usize),
    TimedOut,
    Drained,
    Stopped,
}

struct QueueState<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Bounded FIFO guarded by one mutex and a not-empty/not-full condvar pair.
/// Every wait predicate also observes the shared stop flag so blocked
/// producers and consumers wake and exit on shutdown.
struct BoundedQueue<T> {
    state: Mutex<QueueState<T>>,
    capacity: usize,
    not_empty: Condvar,
    not_full: Condvar,
    stop: Arc<AtomicBool>,
}

impl<T> BoundedQueue<T> {
    fn new(capacity: usize, stop: Arc<AtomicBool>) -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            capacity: capacity.max(1),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            stop,
        }
    }

    /// Blocking push; false once the queue is closed or stopping.
    fn push(&self, item: T) -> bool {
        let mut state = self.state.lock();
        while state.items.len() >= self.capacity {
            if self.stop.load(Ordering::Acquire) || state.closed {
                return false;
            }
            self.not_full.wait(&mut state);
        }
        if self.stop.load(Ordering::Acquire) || state.closed {
            return false;
        }
        state.items.push_back(item);
        self.not_empty.notify_one();
        true
    }

    /// Blocking pop; `None` once drained-and-closed or stopping.
    fn pop(&self) -> Option<T> {
        let mut state = self.state.lock();
        loop {
            if self.stop.load(Ordering::Acquire) {
                return None;
            }
            if let Some(item) = state.items.pop_front() {
                self.not_full.notify_one();
                return Some(item);
            }
            if state.closed {
                return None;
            }
            self.not_empty.wait(&mut state);
        }
    }

    /// Writer-side pop with a bounded wait; reports the remaining length so
    /// the caller can apply the stale-drop tail rule.
    fn pop_timeout(&self, timeout: Duration) -> PopResult<T> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        loop {
            if self.stop.load(Ordering::Acquire) {
                return PopResult::Stopped;
            }
            if let Some(item) = state.items.pop_front() {
                let remaining = state.items.len();
                self.not_full.notify_one();
                return PopResult::Item(item, remaining);
            }
            if state.closed {
                return PopResult::Drained;
            }
            if self.not_empty.wait_until(&mut state, deadline).timed_out() {
                return PopResult::TimedOut;
            }
        }
    }

    fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    fn clear(&self) {
        let mut state = self.state.lock();
        state.items.clear();
        self.not_full.notify_all();
    }

    /// Wakes every waiter after the stop flag has been raised.
    fn interrupt(&self) {
        let _state = self.state.lock();
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }
}

struct ReorderState {
    pending: BTreeMap<u64, EncodedFrame>,
    skipped: BTreeSet<u64>,
    next_index: u64,
}

/// Restores source order after parallel encoding. Whichever thread holds
/// the lock flushes the contiguous prefix into the output queue; dropped
/// indices are recorded so the prefix can advance past them.
struct ReorderBuffer {
    state: Mutex<ReorderState>,
}

impl ReorderBuffer {
    fn new() -> Self {
        Self {
            state: Mutex::new(ReorderState {
                pending: BTreeMap::new(),
                skipped: BTreeSet::new(),
                next_index: 0,
            }),
        }
    }

    /// Records an encoded frame (or a deliberate gap) and flushes every
    /// contiguous index into `out`. Returns false once the job is stopping.
    fn publish(
        &self,
        index: u64,
        frame: Option<EncodedFrame>,
        out: &BoundedQueue<EncodedFrame>,
    ) -> bool {
        let mut state = self.state.lock();
        match frame {
            Some(frame) => {
                state.pending.insert(index, frame);
            }
            None => {
                state.skipped.insert(index);
            }
        }
        loop {
            let next = state.next_index;
            if let Some(ready) = state.pending.remove(&next) {
                if !out.push(ready) {
                    return false;
                }
                state.next_index += 1;
            } else if state.skipped.remove(&next) {
                state.next_index += 1;
            } else {
                return true;
            }
        }
    }

    fn clear(&self) {
        let mut state = self.state.lock();
        state.pending.clear();
        state.skipped.clear();
    }
}

/// Palette and scale knobs shared with the reader and encoders as plain
/// atomics; only newly read frames observe a change.
struct AdaptiveControls {
    palette: AtomicU32,
    scale_milli: AtomicU32,
}

impl AdaptiveControls {
    fn new(options: &RenderOptions) -> Self {
        Self {
            palette: AtomicU32::new(u32::from(options.clamped_palette())),
            scale_milli: AtomicU32::new(scale_to_milli(options.max_scale_factor.max(0.01))),
        }
    }

    fn palette(&self) -> u16 {
        self.palette.load(Ordering::Relaxed) as u16
    }

    fn scale(&self) -> f64 {
        f64::from(self.scale_milli.load(Ordering::Relaxed)) / 1000.0
    }

    fn degrade(&self, options: &RenderOptions) {
        if options.adaptive_palette && !options.static_palette {
            let floor = u32::from(options.min_palette_size.max(1));
            let current = self.palette.load(Ordering::Relaxed);
            self.palette
                .store(current.saturating_sub(ADAPT_PALETTE_STEP).max(floor), Ordering::Relaxed);
        }
        if options.adaptive_scale {
            let floor = scale_to_milli(options.min_scale_factor.max(0.01));
            let step = scale_to_milli(options.scale_step.max(0.0));
            let current = self.scale_milli.load(Ordering::Relaxed);
            self.scale_milli
                .store(current.saturating_sub(step).max(floor), Ordering::Relaxed);
        }
    }

    fn restore(&self, options: &RenderOptions) {
        if options.adaptive_palette && !options.static_palette {
            let ceiling = u32::from(options.max_palette_size.clamp(1, 256));
            let current = self.palette.load(Ordering::Relaxed);
            self.palette
                .store((current + ADAPT_PALETTE_STEP).min(ceiling), Ordering::Relaxed);
        }
        if options.adaptive_scale {
            let ceiling = scale_to_milli(options.max_scale_factor.max(0.01));
            let step = scale_to_milli(options.scale_step.max(0.0));
            let current = self.scale_milli.load(Ordering::Relaxed);
            self.scale_milli.store((current + step).min(ceiling), Ordering::Relaxed);
        }
    }
}

fn scale_to_milli(scale: f64) -> u32 {
    (scale * 1000.0).round().max(1.0) as u32
}

/// Sliding one-second window over the writer's drop ratio driving the
/// optional adaptive tuning.
struct AdaptWindow {
    started: Instant,
    emitted: u64,
    dropped: u64,
    clean_streak: u32,
    enabled: bool,
}

impl AdaptWindow {
    fn new(now: Instant, options: &RenderOptions) -> Self {
        Self {
            started: now,
            emitted: 0,
            dropped: 0,
            clean_streak: 0,
            enabled: options.adaptive_scale || (options.adaptive_palette && !options.static_palette),
        }
    }

    fn emitted_one(&mut self) {
        self.emitted += 1;
    }

    fn dropped_one(&mut self) {
        self.dropped += 1;
    }

    fn tick(&mut self, now: Instant, controls: &AdaptiveControls, options: &RenderOptions) {
        if !self.enabled || now.duration_since(self.started) < ADAPT_WINDOW {
            return;
        }
        let total = self.emitted + self.dropped;
        if total > 0 {
            let ratio = self.dropped as f64 / total as f64;
            if ratio > ADAPT_DROP_THRESHOLD {
                self.clean_streak = 0;
                controls.degrade(options);
            } else if self.dropped == 0 {
                self.clean_streak += 1;
                if self.clean_streak >= ADAPT_CLEAN_WINDOWS {
                    controls.restore(options);
                    self.clean_streak = 0;
                }
            } else {
                self.clean_streak = 0;
            }
        }
        self.started = now;
        self.emitted = 0;
        self.dropped = 0;
    }
}

/// Runs a playback job to completion: reader thread, encoder workers,
/// ordered writer on the calling thread, audio side-channel. `options`
/// width/height must already be probe-resolved by the caller. The cancel
/// flag is the cooperative stop; raising it ends the job from outside.
pub fn run<S, W>(
    source: S,
    options: &RenderOptions,
    out: &mut W,
    audio_path: Option<&Path>,
    cancel: Arc<AtomicBool>,
) -> Result<PlaybackStats, RenderError>
where
    S: FrameSource + 'static,
    W: Write,
{
    let source_fps = if source.fps() > 0.0 {
        source.fps()
    } else {
        FALLBACK_SOURCE_FPS
    };
    let render_fps = if options.target_fps > 0.0 {
        options.target_fps.min(source_fps)
    } else {
        source_fps
    };
    let frame_duration = Duration::from_secs_f64(1.0 / render_fps);
    let plan = sizer::video_plan(
        source.dimensions(),
        (options.width.max(1), options.height.max(1)),
        source_fps,
        options,
    );

    let stop = cancel;
    let stats = Arc::new(SharedStats::default());
    let raw_queue = Arc::new(BoundedQueue::new(options.queue_capacity(), stop.clone()));
    let encoded_queue = Arc::new(BoundedQueue::new(options.queue_capacity(), stop.clone()));
    let reorder = Arc::new(ReorderBuffer::new());
    let controls = Arc::new(AdaptiveControls::new(options));
    let start_gate: Arc<OnceLock<Instant>> = Arc::new(OnceLock::new());
    let shared_options = Arc::new(options.clone());

    // The screen clear is the first thing the job ever writes.
    out.write_all(term::CLEAR_SCREEN)?;
    out.write_all(term::HIDE_CURSOR)?;
    out.flush()?;

    let mut audio = match audio_path {
        Some(path) => AudioPlayer::spawn(path),
        None => AudioPlayer::disabled(),
    };

    let reader_handle = spawn_reader(
        source,
        plan,
        frame_duration,
        render_fps / source_fps,
        raw_queue.clone(),
        encoded_queue.clone(),
        reorder.clone(),
        stats.clone(),
        controls.clone(),
        start_gate.clone(),
        stop.clone(),
    );

    let worker_count = encoder_worker_count();
    let active_workers = Arc::new(AtomicUsize::new(worker_count));
    let mut worker_handles = Vec::with_capacity(worker_count);
    for _ in 0..worker_count {
        worker_handles.push(spawn_encoder(
            shared_options.clone(),
            raw_queue.clone(),
            encoded_queue.clone(),
            reorder.clone(),
            stats.clone(),
            controls.clone(),
            active_workers.clone(),
        ));
    }

    let prebuffer = options.prebuffer_target();
    let mut cancelled = false;
    loop {
        if stop.load(Ordering::Acquire) {
            cancelled = true;
            break;
        }
        if encoded_queue.len() >= prebuffer || encoded_queue.is_closed() {
            break;
        }
        thread::sleep(PREBUFFER_POLL);
    }

    let write_result = if cancelled {
        Err(RenderError::CancelRequested)
    } else {
        write_loop(
            out,
            frame_duration,
            &encoded_queue,
            &stats,
            &controls,
            options,
            &start_gate,
        )
    };

    // Shutdown: raise stop, wake everyone, drain, join in order, then kill
    // the audio process after a short grace so the last frame settles.
    stop.store(true, Ordering::Release);
    raw_queue.close();
    encoded_queue.close();
    raw_queue.interrupt();
    encoded_queue.interrupt();
    raw_queue.clear();
    encoded_queue.clear();
    reorder.clear();

    let _ = reader_handle.join();
    for handle in worker_handles {
        let _ = handle.join();
    }

    if audio.is_running() {
        thread::sleep(AUDIO_KILL_GRACE);
    }
    audio.shutdown();

    let _ = out.write_all(term::SHOW_CURSOR);
    let _ = out.write_all(term::RESET_COLORS);
    let snapshot = stats.snapshot();
    let _ = writeln!(out, "\n{}", snapshot.summary());
    let _ = out.flush();

    write_result.map(|()| snapshot)
}

fn encoder_worker_count() -> usize {
    thread::available_parallelism()
        .map(|n| n.get() / 2)
        .unwrap_or(1)
        .max(1)
}

#[allow(clippy::too_many_arguments)]
fn spawn_reader<S: FrameSource + 'static>(
    mut source: S,
    plan: SizePlan,
    frame_duration: Duration,
    keep_ratio: f64,
    raw_queue: Arc<BoundedQueue<RawFrame>>,
    encoded_queue: Arc<BoundedQueue<EncodedFrame>>,
    reorder: Arc<ReorderBuffer>,
    stats: Arc<SharedStats>,
    controls: Arc<AdaptiveControls>,
    start_gate: Arc<OnceLock<Instant>>,
    stop: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut accumulator = 0.0_f64;
        let mut next_index = 0_u64;
        let mut reads = 0_u64;
        let mut skips = 0_u64;

        loop {
            if stop.load(Ordering::Acquire) {
                break;
            }
            match source.read_frame() {
                Ok(Some(frame)) => {
                    reads += 1;
                    stats.read.fetch_add(1, Ordering::Relaxed);

                    accumulator += keep_ratio;
                    if accumulator < 1.0 {
                        continue;
                    }
                    accumulator -= 1.0;

                    let index = next_index;
                    next_index += 1;

                    if let Some(start) = start_gate.get() {
                        let behind = schedule_index(*start, frame_duration);
                        if behind > index + READER_BEHIND_THRESHOLD
                            && (skips as f64) < READER_MAX_DROP_RATIO * reads as f64
                        {
                            skips += 1;
                            stats.dropped.fetch_add(1, Ordering::Relaxed);
                            if !reorder.publish(index, None, &encoded_queue) {
                                break;
                            }
                            continue;
                        }
                    }

                    let scale = controls.scale();
                    let width = ((f64::from(plan.width) * scale) as u32).max(1);
                    let height = ((f64::from(plan.height) * scale) as u32).max(1);
                    match frame.resize(width, height, plan.filter) {
                        Ok(resized) => {
                            if !raw_queue.push(RawFrame {
                                index,
                                frame: resized,
                            }) {
                                break;
                            }
                        }
                        Err(_) => {
                            stats.dropped.fetch_add(1, Ordering::Relaxed);
                            if !reorder.publish(index, None, &encoded_queue) {
                                break;
                            }
                        }
                    }
                }
                // EOF and mid-stream decode failures both drain the job.
                Ok(None) | Err(_) => break,
            }
        }
        raw_queue.close();
    })
}

fn spawn_encoder(
    options: Arc<RenderOptions>,
    raw_queue: Arc<BoundedQueue<RawFrame>>,
    encoded_queue: Arc<BoundedQueue<EncodedFrame>>,
    reorder: Arc<ReorderBuffer>,
    stats: Arc<SharedStats>,
    controls: Arc<AdaptiveControls>,
    active_workers: Arc<AtomicUsize>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        while let Some(RawFrame { index, frame }) = raw_queue.pop() {
            let payload = encode_payload(&frame, &options, controls.palette());
            let publishable = if payload.is_empty() {
                stats.dropped.fetch_add(1, Ordering::Relaxed);
                None
            } else {
                Some(EncodedFrame {
                    index,
                    width: frame.width(),
                    height: frame.height(),
                    payload,
                })
            };
            if !reorder.publish(index, publishable, &encoded_queue) {
                break;
            }
        }
        if active_workers.fetch_sub(1, Ordering::AcqRel) == 1 {
            encoded_queue.close();
        }
    })
}

fn encode_payload(frame: &BgrFrame, options: &RenderOptions, palette: u16) -> Vec<u8> {
    match options.mode {
        RenderMode::Sixel => sixel::encode(
            frame,
            palette,
            options.sixel_quality,
            options.dither,
            Some((frame.width(), frame.height())),
        ),
        RenderMode::HalfBlock => render::half_block_payload(frame),
        RenderMode::AsciiColor => join_lines(&render::ascii_color_lines(frame)),
        RenderMode::AsciiGray => {
            join_lines(&render::ascii_gray_lines(frame, options.style, options.dither))
        }
    }
}

fn join_lines(lines: &[String]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
    for line in lines {
        payload.extend_from_slice(line.as_bytes());
        payload.push(b'\n');
    }
    payload
}

fn write_loop<W: Write>(
    out: &mut W,
    frame_duration: Duration,
    encoded_queue: &BoundedQueue<EncodedFrame>,
    stats: &SharedStats,
    controls: &AdaptiveControls,
    options: &RenderOptions,
    start_gate: &OnceLock<Instant>,
) -> Result<(), RenderError> {
    let start = Instant::now();
    let _ = start_gate.set(start);
    let mut previous_dims: Option<(u32, u32)> = None;
    let mut window = AdaptWindow::new(start, options);

    loop {
        match encoded_queue.pop_timeout(UNDERRUN_WAIT) {
            PopResult::Item(frame, remaining) => {
                let target = schedule_index(start, frame_duration);
                if frame.index + WRITER_STALE_THRESHOLD < target && remaining > WRITER_DROP_TAIL {
                    stats.dropped.fetch_add(1, Ordering::Relaxed);
                    window.dropped_one();
                    window.tick(Instant::now(), controls, options);
                    continue;
                }

                write_frame(out, &frame, previous_dims)?;
                stats.rendered.fetch_add(1, Ordering::Relaxed);
                window.emitted_one();
                previous_dims = Some((frame.width, frame.height));

                let deadline = start + frame_duration.mul_f64((frame.index + 1) as f64);
                sleep_until(deadline);
                window.tick(Instant::now(), controls, options);
            }
            PopResult::TimedOut => continue,
            PopResult::Drained => return Ok(()),
            PopResult::Stopped => return Err(RenderError::CancelRequested),
        }
    }
}

/// Emits one frame atomically: optional screen clear when the frame shrank,
/// cursor home, payload, flush.
fn write_frame<W: Write>(
    out: &mut W,
    frame: &EncodedFrame,
    previous_dims: Option<(u32, u32)>,
) -> io::Result<()> {
    if let Some((prev_w, prev_h)) = previous_dims {
        if frame.width < prev_w || frame.height < prev_h {
            out.write_all(term::CLEAR_SCREEN)?;
        }
    }
    out.write_all(term::CURSOR_HOME)?;
    out.write_all(&frame.payload)?;
    out.flush()
}

/// Frame slot the wall clock has reached since `start`.
fn schedule_index(start: Instant, frame_duration: Duration) -> u64 {
    (start.elapsed().as_secs_f64() / frame_duration.as_secs_f64()) as u64
}

/// Sleeps toward the deadline, spinning the final stretch for precision.
fn sleep_until(deadline: Instant) {
    loop {
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        let remaining = deadline - now;
        if remaining > SPIN_WINDOW {
            thread::sleep(remaining - SPIN_WINDOW);
        } else {
            std::hint::spin_loop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        run, write_frame, BoundedQueue, EncodedFrame, PlaybackStats, PopResult, ReorderBuffer,
    };
    use crate::decode::FrameSource;
    use crate::error::RenderError;
    use crate::frame::BgrFrame;
    use crate::options::{FitMode, RenderMode, RenderOptions};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    struct StubSource {
        total: u32,
        produced: u32,
        fps: f64,
        width: u32,
        height: u32,
    }

    impl StubSource {
        fn new(total: u32, fps: f64, width: u32, height: u32) -> Self {
            Self {
                total,
                produced: 0,
                fps,
                width,
                height,
            }
        }
    }

    impl FrameSource for StubSource {
        fn fps(&self) -> f64 {
            self.fps
        }

        fn dimensions(&self) -> (u32, u32) {
            (self.width, self.height)
        }

        fn frame_count(&self) -> Option<u64> {
            Some(u64::from(self.total))
        }

        fn read_frame(&mut self) -> Result<Option<BgrFrame>, RenderError> {
            if self.produced >= self.total {
                return Ok(None);
            }
            let shade = (self.produced % 250) as u8;
            self.produced += 1;
            if self.width == 0 || self.height == 0 {
                return Ok(Some(BgrFrame::solid(0, 0, [0, 0, 0])));
            }
            Ok(Some(BgrFrame::solid(self.width, self.height, [shade, shade, shade])))
        }
    }

    fn video_options(width: u32, height: u32) -> RenderOptions {
        RenderOptions {
            width,
            height,
            mode: RenderMode::HalfBlock,
            aspect_ratio: false,
            fit: FitMode::Stretch,
            queue_size: 16,
            prebuffer_frames: 4,
            ..RenderOptions::default()
        }
    }

    fn fresh_cancel() -> Arc<AtomicBool> {
        Arc::new(AtomicBool::new(false))
    }

    #[test]
    fn bounded_queue_pops_in_fifo_order_and_drains_on_close() {
        let queue = BoundedQueue::new(4, fresh_cancel());
        assert!(queue.push(1));
        assert!(queue.push(2));
        queue.close();
        assert!(!queue.push(3));
        assert_eq!(queue.pop(), Some(1));
        assert_eq!(queue.pop(), Some(2));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn bounded_queue_honours_the_stop_flag() {
        let stop = fresh_cancel();
        let queue: BoundedQueue<u32> = BoundedQueue::new(2, stop.clone());
        assert!(queue.push(7));
        stop.store(true, Ordering::Release);
        assert_eq!(queue.pop(), None);
        assert!(!queue.push(8));
        assert!(matches!(
            queue.pop_timeout(Duration::from_millis(5)),
            PopResult::Stopped
        ));
    }

    #[test]
    fn bounded_queue_pop_times_out_while_producers_are_alive() {
        let queue: BoundedQueue<u32> = BoundedQueue::new(2, fresh_cancel());
        let begun = Instant::now();
        assert!(matches!(
            queue.pop_timeout(Duration::from_millis(20)),
            PopResult::TimedOut
        ));
        assert!(begun.elapsed() >= Duration::from_millis(15));
    }

    fn encoded(index: u64) -> EncodedFrame {
        EncodedFrame {
            index,
            width: 4,
            height: 4,
            payload: vec![index as u8],
        }
    }

    #[test]
    fn reorder_buffer_restores_source_order_across_gaps() {
        let out = BoundedQueue::new(16, fresh_cancel());
        let reorder = ReorderBuffer::new();

        assert!(reorder.publish(2, Some(encoded(2)), &out));
        assert!(reorder.publish(0, Some(encoded(0)), &out));
        assert_eq!(out.len(), 1);
        assert!(reorder.publish(1, Some(encoded(1)), &out));
        assert_eq!(out.len(), 3);
        assert!(reorder.publish(3, None, &out));
        assert!(reorder.publish(4, Some(encoded(4)), &out));

        let mut indices = Vec::new();
        out.close();
        while let Some(frame) = out.pop() {
            indices.push(frame.index);
        }
        assert_eq!(indices, vec![0, 1, 2, 4]);
    }

    #[test]
    fn playback_emits_every_frame_of_a_short_clip_in_order() {
        let source = StubSource::new(12, 60.0, 8, 4);
        let options = video_options(8, 4);
        let mut sink = Vec::new();

        let stats = run(source, &options, &mut sink, None, fresh_cancel()).unwrap();

        assert_eq!(stats.read, 12);
        assert_eq!(stats.rendered + stats.dropped, 12);
        assert!(stats.rendered >= 10, "excessive drops: {stats:?}");

        let text = String::from_utf8_lossy(&sink);
        assert!(text.starts_with("\x1b[2J\x1b[?25l"), "missing startup clear");
        assert_eq!(text.matches("\x1b[H").count(), stats.rendered as usize);
        assert!(text.contains("\x1b[?25h"), "cursor not restored");
        assert!(text.contains("read=12"), "missing stats line");
    }

    #[test]
    fn target_fps_downsamples_the_source_rate() {
        let mut options = video_options(8, 4);
        options.target_fps = 50.0;
        let source = StubSource::new(40, 100.0, 8, 4);
        let mut sink = Vec::new();

        let stats = run(source, &options, &mut sink, None, fresh_cancel()).unwrap();

        assert_eq!(stats.read, 40);
        assert_eq!(stats.rendered + stats.dropped, 20);
        assert!(stats.rendered >= 15, "unexpected drop level: {stats:?}");
    }

    #[test]
    fn accounting_never_exceeds_reads() {
        let source = StubSource::new(25, 200.0, 6, 6);
        let options = video_options(6, 6);
        let mut sink = Vec::new();

        let stats = run(source, &options, &mut sink, None, fresh_cancel()).unwrap();
        assert!(stats.rendered + stats.dropped <= stats.read);
        assert!(stats.read <= 25);
    }

    #[test]
    fn unresizable_frames_are_counted_as_drops() {
        let source = StubSource::new(6, 60.0, 0, 0);
        let options = video_options(8, 4);
        let mut sink = Vec::new();

        let stats = run(source, &options, &mut sink, None, fresh_cancel()).unwrap();
        assert_eq!(stats.read, 6);
        assert_eq!(stats.rendered, 0);
        assert_eq!(stats.dropped, 6);
    }

    #[test]
    fn cancellation_stops_playback_and_restores_the_cursor() {
        let source = StubSource::new(u32::MAX, 10.0, 8, 4);
        let options = video_options(8, 4);
        let cancel = fresh_cancel();
        let canceller = cancel.clone();
        let setter = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(120));
            canceller.store(true, Ordering::Release);
        });

        let mut sink = Vec::new();
        let result = run(source, &options, &mut sink, None, cancel);
        setter.join().unwrap();

        assert!(matches!(result, Err(RenderError::CancelRequested)));
        let text = String::from_utf8_lossy(&sink);
        assert!(text.contains("\x1b[?25h"), "cursor not restored on cancel");
    }

    #[test]
    fn pacing_spends_roughly_one_frame_interval_per_frame() {
        let source = StubSource::new(10, 20.0, 8, 4);
        let options = video_options(8, 4);
        let mut sink = Vec::new();

        let begun = Instant::now();
        let stats = run(source, &options, &mut sink, None, fresh_cancel()).unwrap();
        let elapsed = begun.elapsed();

        assert_eq!(stats.rendered + stats.dropped, 10);
        assert!(stats.rendered >= 8, "excessive drops: {stats:?}");
        // Ten frames at 20 fps: about half a second, generously bounded.
        assert!(elapsed >= Duration::from_millis(350), "ran too fast: {elapsed:?}");
        assert!(elapsed <= Duration::from_secs(3), "ran too slow: {elapsed:?}");
    }

    #[test]
    fn shrinking_frames_force_a_screen_clear_first() {
        let mut sink = Vec::new();
        let big = EncodedFrame {
            index: 0,
            width: 40,
            height: 40,
            payload: b"AAAA".to_vec(),
        };
        let small = EncodedFrame {
            index: 1,
            width: 20,
            height: 20,
            payload: b"BB".to_vec(),
        };

        write_frame(&mut sink, &big, None).unwrap();
        let first_len = sink.len();
        write_frame(&mut sink, &small, Some((40, 40))).unwrap();

        let second = &sink[first_len..];
        assert!(second.starts_with(b"\x1b[2J\x1b[H"), "missing clear before shrink");

        let first = &sink[..first_len];
        assert!(first.starts_with(b"\x1b[H"), "unexpected clear on first frame");
    }

    #[test]
    fn stats_summary_reports_all_counters() {
        let stats = PlaybackStats {
            read: 100,
            rendered: 90,
            dropped: 10,
        };
        let line = stats.summary();
        assert!(line.contains("read=100"));
        assert!(line.contains("rendered=90"));
        assert!(line.contains("dropped=10"));
        assert!(line.contains("10.0%"));
    }
}
