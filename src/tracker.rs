//! Stroke tracker: turns pen samples into ink segments.
//!
//! Two states. `Idle` has no cursor; the first DOWN sample seeds the cursor
//! without drawing. `Stroking` appends one segment per further DOWN sample.
//! Any UP sample (or an explicit `lift`) drops back to `Idle` and forgets the
//! cursor, so a new stroke never bridges a gap.
//!
//! Samples carry no timestamps: a late or dropped frame is just the next
//! sample. Smoothing or debouncing would slot in between the classifier and
//! `StrokeTracker::feed` as a transform over `Sample`s; none is applied here.

use log::debug;

use crate::types::{Landmark, Paint, PenState, Point, StrokeSegment};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackerState {
    Idle,
    Stroking,
}

/// One input to the tracker, already in canvas pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Sample {
    Up,
    Down(Point),
}

impl Sample {
    pub fn from_pen(pen: PenState, at: Point) -> Self {
        match pen {
            PenState::Up => Sample::Up,
            PenState::Down => Sample::Down(at),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct StrokeTracker {
    last_point: Option<Point>,
}

impl StrokeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TrackerState {
        if self.last_point.is_some() { TrackerState::Stroking } else { TrackerState::Idle }
    }

    pub fn last_point(&self) -> Option<Point> {
        self.last_point
    }

    /// Advance the state machine by one sample. Returns the segment to commit,
    /// if any.
    pub fn feed(&mut self, sample: Sample, paint: Paint) -> Option<StrokeSegment> {
        match sample {
            Sample::Up => {
                self.lift();
                None
            }
            Sample::Down(at) => {
                let segment = self.last_point.map(|from| StrokeSegment { from, to: at, paint });
                if segment.is_none() {
                    debug!("stroke start at ({:.1}, {:.1})", at.x, at.y);
                }
                self.last_point = Some(at);
                segment
            }
        }
    }

    /// Force `Idle` without drawing anything.
    pub fn lift(&mut self) {
        if let Some(at) = self.last_point.take() {
            debug!("stroke end at ({:.1}, {:.1})", at.x, at.y);
        }
    }
}

/// Normalized camera coordinates -> canvas pixels.
/// Gesture input is mirrored horizontally so a front camera behaves like a mirror.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CanvasMapping {
    pub width: f32,
    pub height: f32,
    pub mirror: bool,
}

impl CanvasMapping {
    pub fn mirrored(width: usize, height: usize) -> Self {
        Self { width: width as f32, height: height as f32, mirror: true }
    }

    pub fn to_canvas(&self, lm: Landmark) -> Point {
        let nx = if self.mirror { 1.0 - lm.x } else { lm.x };
        Point::new(nx * self.width, lm.y * self.height)
    }

    /// Inverse of `to_canvas`, used by the simulated hand.
    pub fn to_normalized(&self, p: Point) -> Landmark {
        let nx = p.x / self.width;
        Landmark::new(if self.mirror { 1.0 - nx } else { nx }, p.y / self.height)
    }
}

/// Raw press/move/release events from the mouse or a touch surface, already
/// in canvas pixels (no mirroring, no normalization).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerEvent {
    Press(Point),
    Move(Point),
    Release,
    /// Pointer left the canvas; treated as a release.
    Leave,
}

/// The pointer channel: same state machine, event driven. A move only draws
/// while a press is in progress.
#[derive(Clone, Debug, Default)]
pub struct PointerTracker {
    inner: StrokeTracker,
}

impl PointerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TrackerState {
        self.inner.state()
    }

    pub fn handle(&mut self, event: PointerEvent, paint: Paint) -> Option<StrokeSegment> {
        match event {
            PointerEvent::Press(at) => {
                // a press always starts fresh, even if a release was missed
                self.inner.lift();
                self.inner.feed(Sample::Down(at), paint)
            }
            PointerEvent::Move(at) => match self.inner.state() {
                TrackerState::Stroking => self.inner.feed(Sample::Down(at), paint),
                TrackerState::Idle => None,
            },
            PointerEvent::Release | PointerEvent::Leave => self.inner.feed(Sample::Up, paint),
        }
    }

    pub fn lift(&mut self) {
        self.inner.lift();
    }
}
