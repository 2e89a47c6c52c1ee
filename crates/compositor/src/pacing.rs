//! Frame pacing: rate limiting, frame-skip decisions and rolling FPS.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Lowest frame rate the limiter accepts.
pub const MIN_FRAME_RATE: u32 = 10;

/// How far the schedule may fall behind before it is rebased on the current
/// time instead of trying to catch up.
const MAX_DRIFT: Duration = Duration::from_secs(1);

/// Abstraction over where the limiter reads time from and how it waits.
pub trait Clock {
    fn now(&self) -> Instant;
    /// Blocks the calling thread for `duration`.
    fn sleep(&self, duration: Duration);
}

/// Clock backed by `Instant::now` and `thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Clock that only moves when told to. Sleeping advances it by the requested
/// duration, so a limiter driven by it never actually blocks.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<Instant>>,
    slept: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Rc::new(Cell::new(Instant::now())),
            slept: Rc::new(Cell::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, duration: Duration) {
        self.now.set(self.now.get() + duration);
    }

    /// Total time spent in [`Clock::sleep`].
    pub fn slept(&self) -> Duration {
        self.slept.get()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        self.slept.set(self.slept.get() + duration);
        self.advance(duration);
    }
}

struct RingBuffer {
    samples: Vec<Duration>,
    capacity: usize,
    index: usize,
}

impl RingBuffer {
    fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: Vec::with_capacity(capacity),
            capacity,
            index: 0,
        }
    }

    fn push(&mut self, sample: Duration) {
        if self.samples.len() < self.capacity {
            self.samples.push(sample);
        } else {
            self.samples[self.index] = sample;
        }
        self.index = (self.index + 1) % self.capacity;
    }

    fn average(&self) -> Duration {
        if self.samples.is_empty() {
            return Duration::ZERO;
        }
        let sum: Duration = self.samples.iter().sum();
        sum / self.samples.len() as u32
    }

    fn clear(&mut self) {
        self.samples.clear();
        self.index = 0;
    }
}

/// Keeps frames on an ideal schedule of one tick every `1 / rate` seconds.
pub struct FrameLimiter {
    clock: Box<dyn Clock>,
    rate: u32,
    interval: Duration,
    next_deadline: Instant,
    last_frame: Option<Instant>,
    frame_times: RingBuffer,
}

impl FrameLimiter {
    pub fn new(rate: u32, clock: Box<dyn Clock>) -> Self {
        let rate = rate.max(MIN_FRAME_RATE);
        let interval = interval_for(rate);
        let next_deadline = clock.now() + interval;
        Self {
            clock,
            rate,
            interval,
            next_deadline,
            last_frame: None,
            frame_times: RingBuffer::new(rate as usize),
        }
    }

    pub fn frame_rate(&self) -> u32 {
        self.rate
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Changes the target rate, clamped to [`MIN_FRAME_RATE`]. Setting the
    /// current rate again changes nothing.
    pub fn set_frame_rate(&mut self, rate: u32) -> u32 {
        let rate = rate.max(MIN_FRAME_RATE);
        if rate == self.rate {
            return rate;
        }
        self.rate = rate;
        self.interval = interval_for(rate);
        self.frame_times = RingBuffer::new(rate as usize);
        self.last_frame = None;
        self.next_deadline = self.clock.now() + self.interval;
        tracing::debug!(rate, "frame rate changed");
        rate
    }

    /// Time the upcoming frame is late by, zero when on schedule.
    pub fn drift(&self) -> Duration {
        self.clock.now().saturating_duration_since(self.next_deadline)
    }

    /// True when the schedule has fallen more than one frame behind.
    pub fn require_frame_skip(&self) -> bool {
        self.drift() > self.interval
    }

    /// Waits out the rest of the current frame, then records its duration.
    ///
    /// Never sleeps longer than one interval. When the schedule is more than
    /// a second behind it is rebased instead of bursting to catch up.
    pub fn delay(&mut self) {
        let now = self.clock.now();
        if let Some(wait) = self.next_deadline.checked_duration_since(now) {
            let wait = wait.min(self.interval);
            if !wait.is_zero() {
                tracing::trace!(wait_us = wait.as_micros() as u64, "pacing: sleeping");
                self.clock.sleep(wait);
            }
        }

        let after = self.clock.now();
        self.next_deadline += self.interval;
        if after.saturating_duration_since(self.next_deadline) > MAX_DRIFT {
            tracing::trace!("pacing: schedule rebased after falling behind");
            self.next_deadline = after + self.interval;
        }

        if let Some(last) = self.last_frame {
            self.frame_times.push(after.saturating_duration_since(last));
        }
        self.last_frame = Some(after);
    }

    /// Rolling average over roughly the last second of frames.
    pub fn average_fps(&self) -> f32 {
        let average = self.frame_times.average();
        if average.is_zero() {
            0.0
        } else {
            (1.0 / average.as_secs_f64()) as f32
        }
    }

    /// Drops accumulated drift and timing samples. The rate is kept.
    pub fn reset(&mut self) {
        self.next_deadline = self.clock.now() + self.interval;
        self.last_frame = None;
        self.frame_times.clear();
    }
}

fn interval_for(rate: u32) -> Duration {
    Duration::from_nanos(1_000_000_000 / rate.max(1) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(rate: u32) -> (FrameLimiter, ManualClock) {
        let clock = ManualClock::new();
        (FrameLimiter::new(rate, Box::new(clock.clone())), clock)
    }

    #[test]
    fn rate_is_clamped_and_idempotent() {
        let (mut limiter, _) = limiter(3);
        assert_eq!(limiter.frame_rate(), MIN_FRAME_RATE);
        assert_eq!(limiter.set_frame_rate(60), 60);
        assert_eq!(limiter.set_frame_rate(60), 60);
        assert_eq!(limiter.set_frame_rate(0), MIN_FRAME_RATE);
    }

    #[test]
    fn delay_sleeps_remaining_part_of_frame() {
        let (mut limiter, clock) = limiter(50);
        clock.advance(Duration::from_millis(5));
        limiter.delay();
        assert_eq!(clock.slept(), Duration::from_millis(15));
    }

    #[test]
    fn late_frames_do_not_sleep_and_request_skip() {
        let (mut limiter, clock) = limiter(50);
        clock.advance(Duration::from_millis(70));
        assert!(limiter.require_frame_skip());
        limiter.delay();
        assert_eq!(clock.slept(), Duration::ZERO);
    }

    #[test]
    fn far_behind_schedule_is_rebased() {
        let (mut limiter, clock) = limiter(50);
        clock.advance(Duration::from_secs(5));
        limiter.delay();
        assert!(!limiter.require_frame_skip());
        limiter.delay();
        assert_eq!(clock.slept(), Duration::from_millis(20));
    }

    #[test]
    fn average_fps_tracks_steady_rate() {
        let (mut limiter, _) = limiter(50);
        for _ in 0..10 {
            limiter.delay();
        }
        assert!((limiter.average_fps() - 50.0).abs() < 0.01);
        limiter.reset();
        assert_eq!(limiter.average_fps(), 0.0);
        assert_eq!(limiter.frame_rate(), 50);
    }
}
