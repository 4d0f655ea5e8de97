//! `DrawingSession`: everything that used to be loose per-frame state.
//!
//! The session owns the input mode, one tracker per channel and the active
//! paint. It never touches pixels itself. Each call returns the render
//! commands for that step, and the caller applies them to the ink and
//! overlay surfaces. That keeps the whole gesture pipeline testable without
//! a camera or a window.

use std::fmt::{self, Display};

use log::{info, trace};

use crate::config::Config;
use crate::gesture::classify;
use crate::ink::InkSurface;
use crate::landmarks::FrameObservation;
use crate::overlay::OverlaySurface;
use crate::source::SourceFrame;
use crate::tracker::{CanvasMapping, PointerEvent, PointerTracker, Sample, StrokeTracker};
use crate::types::{InputMode, Paint, PenState, Point, Rgb, StrokeSegment};

/// What the status indicator shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    /// The landmark source is gone (no camera, detector died, replay ended).
    NoCamera,
    /// Tracking works but there is no hand in the frame.
    ShowHand,
    Ready,
    Drawing,
    /// Pointer mode is active; gesture frames are ignored.
    Pointer,
}

impl Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Status::NoCamera => "NO CAMERA",
            Status::ShowHand => "SHOW HAND",
            Status::Ready => "READY",
            Status::Drawing => "DRAWING",
            Status::Pointer => "POINTER",
        })
    }
}

/// One side effect requested by the session.
#[derive(Clone, Debug, PartialEq)]
pub enum RenderCommand {
    AppendSegment(StrokeSegment),
    ClearInk,
    ClearOverlay,
    /// Landmarks already mapped to canvas pixels, in topology order.
    DrawSkeleton(Vec<Point>),
    DrawCursor { at: Point, pen: PenState, color: Rgb },
}

impl RenderCommand {
    /// Apply to the surfaces. Overlay commands are dropped when there is no
    /// overlay (headless runs).
    pub fn apply(&self, ink: &mut InkSurface, overlay: Option<&mut OverlaySurface>) {
        match self {
            RenderCommand::AppendSegment(segment) => ink.append_segment(segment),
            RenderCommand::ClearInk => ink.clear(),
            RenderCommand::ClearOverlay => {
                if let Some(o) = overlay { o.clear() }
            }
            RenderCommand::DrawSkeleton(joints) => {
                if let Some(o) = overlay { o.draw_skeleton(joints) }
            }
            RenderCommand::DrawCursor { at, pen, color } => {
                if let Some(o) = overlay { o.draw_cursor(*at, *pen, *color) }
            }
        }
    }
}

/// Apply a batch; returns how many segments were committed.
pub fn apply_all(commands: &[RenderCommand], ink: &mut InkSurface, mut overlay: Option<&mut OverlaySurface>) -> usize {
    let mut committed = 0;
    for command in commands {
        if matches!(command, RenderCommand::AppendSegment(_)) {
            committed += 1;
        }
        command.apply(ink, overlay.as_deref_mut());
    }
    committed
}

pub struct DrawingSession {
    mode: InputMode,
    gesture: StrokeTracker,
    pointer: PointerTracker,
    paint: Paint,
    pinch_threshold: f32,
    mapping: CanvasMapping,
    status: Status,
}

impl DrawingSession {
    pub fn new(config: &Config) -> Self {
        Self {
            mode: config.mode,
            gesture: StrokeTracker::new(),
            pointer: PointerTracker::new(),
            paint: Paint { color: config.stroke_color, width: config.stroke_width },
            pinch_threshold: config.pinch_threshold,
            mapping: CanvasMapping::mirrored(config.canvas_width, config.canvas_height),
            status: match config.mode {
                InputMode::Gesture => Status::ShowHand,
                InputMode::Pointer => Status::Pointer,
            },
        }
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn paint(&self) -> Paint {
        self.paint
    }

    pub fn mapping(&self) -> CanvasMapping {
        self.mapping
    }

    pub fn gesture_tracker(&self) -> &StrokeTracker {
        &self.gesture
    }

    pub fn pointer_tracker(&self) -> &PointerTracker {
        &self.pointer
    }

    /// New segments use the new color; ink already laid down is untouched.
    pub fn set_color(&mut self, color: Rgb) {
        self.paint.color = color;
    }

    pub fn set_width(&mut self, width: f32) {
        if width > 0.0 {
            self.paint.width = width;
        }
    }

    /// Only the mapping changes; a stroke in progress keeps its cursor.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.mapping = CanvasMapping::mirrored(width, height);
    }

    /// Switch channels. The outgoing channel's stroke is ended without a
    /// closing segment; the ink is left alone.
    pub fn set_mode(&mut self, mode: InputMode) {
        if mode == self.mode {
            return;
        }
        match self.mode {
            InputMode::Gesture => self.gesture.lift(),
            InputMode::Pointer => self.pointer.lift(),
        }
        self.mode = mode;
        self.status = match mode {
            InputMode::Gesture => Status::ShowHand,
            InputMode::Pointer => Status::Pointer,
        };
        info!("Input mode: {mode}");
    }

    pub fn clear(&mut self) -> Vec<RenderCommand> {
        vec![RenderCommand::ClearInk]
    }

    /// One landmark frame. Always starts by clearing the overlay.
    pub fn on_frame(&mut self, frame: SourceFrame) -> Vec<RenderCommand> {
        let mut commands = vec![RenderCommand::ClearOverlay];

        let observation = match frame {
            SourceFrame::Unavailable => {
                self.gesture.lift();
                self.status = Status::NoCamera;
                return commands;
            }
            SourceFrame::Tracking(observation) => observation,
        };

        let hand = match (&observation, self.mode) {
            (FrameObservation::NoHand, _) => {
                self.gesture.lift();
                self.status = match self.mode {
                    InputMode::Gesture => Status::ShowHand,
                    InputMode::Pointer => Status::Pointer,
                };
                return commands;
            }
            (FrameObservation::OneHand(_), InputMode::Pointer) => {
                self.status = Status::Pointer;
                return commands;
            }
            (FrameObservation::OneHand(hand), InputMode::Gesture) => hand,
        };

        let pen = classify(&observation, self.pinch_threshold);
        let tip = self.mapping.to_canvas(hand.index_tip());
        trace!("frame: pen {pen:?} at ({:.1}, {:.1})", tip.x, tip.y);

        let joints = hand.landmarks().iter().map(|&lm| self.mapping.to_canvas(lm)).collect();
        commands.push(RenderCommand::DrawSkeleton(joints));
        commands.push(RenderCommand::DrawCursor { at: tip, pen, color: self.paint.color });

        if let Some(segment) = self.gesture.feed(Sample::from_pen(pen, tip), self.paint) {
            commands.push(RenderCommand::AppendSegment(segment));
        }

        self.status = match pen {
            PenState::Down => Status::Drawing,
            PenState::Up => Status::Ready,
        };
        commands
    }

    /// One pointer event. Ignored unless pointer mode is active.
    pub fn on_pointer(&mut self, event: PointerEvent) -> Vec<RenderCommand> {
        if self.mode != InputMode::Pointer {
            return Vec::new();
        }
        self.pointer
            .handle(event, self.paint)
            .map(RenderCommand::AppendSegment)
            .into_iter()
            .collect()
    }
}
