use std::time::{Duration, Instant};

/// Frame time in milliseconds at 60 fps; `rate` is relative to this.
pub const REFERENCE_FRAME_MS: f64 = 1000.0 / 60.0;
const SAMPLE_PERIOD: Duration = Duration::from_secs(1);

/// Counts frames and samples the frame rate once a second.
///
/// The sampled frame time is capped at the 60 fps reference. Above 60 fps,
/// movement scaled by [`FrameTimer::rate`] shrinks per frame so its speed per
/// second stays the same; below 60 fps it simply slows down.
#[derive(Debug, Clone)]
pub struct FrameTimer {
  sample_start:  Instant,
  frames:        u32,
  frame_time_ms: f64,
}

impl FrameTimer {
  pub fn new(now: Instant) -> Self {
    Self {
      sample_start: now,
      frames: 0,
      frame_time_ms: REFERENCE_FRAME_MS,
    }
  }

  /// Counts one frame. Returns the measured frames per second whenever a
  /// full sample period has passed.
  pub fn tick(&mut self, now: Instant) -> Option<u32> {
    self.frames += 1;
    let elapsed = now.duration_since(self.sample_start);
    if elapsed < SAMPLE_PERIOD {
      return None;
    }

    let fps = (f64::from(self.frames) / elapsed.as_secs_f64()).max(1.0) as u32;
    self.frame_time_ms = 1000.0 / f64::from(fps.max(60));
    self.sample_start = now;
    self.frames = 0;
    Some(fps)
  }

  pub fn frame_time_ms(&self) -> f64 {
    self.frame_time_ms
  }

  /// Movement scale for this frame: 1 at 60 fps or slower.
  pub fn rate(&self) -> f64 {
    self.frame_time_ms / REFERENCE_FRAME_MS
  }
}
