// The per-frame overlay: hand skeleton + fingertip indicator.
// Visual: redrawn from scratch every frame, nothing carries over.
// It never writes into the ink.

use crate::draw::{draw_ring, fill_capsule, fill_disc};
use crate::error::Error;
use crate::gamma::{blend_layer, GammaLut};
use crate::landmarks::HAND_CONNECTIONS;
use crate::types::{FrameBuffer, PenState, Point, Rgb};

const BONE_COLOR: Rgb = Rgb::CYAN;
const BONE_OPACITY: f32 = 0.4;
const BONE_WIDTH: f32 = 2.0;
const JOINT_COLOR: Rgb = Rgb::VIOLET;
const JOINT_OPACITY: f32 = 0.6;
const JOINT_RADIUS: f32 = 3.0;

// cursor: soft dot + thin ring while hovering; a solid disc while drawing
const CURSOR_DOT_RADIUS: f32 = 8.0;
const CURSOR_RING_RADIUS: f32 = 14.0;
const CURSOR_DOWN_RADIUS: f32 = 12.0;

pub struct OverlaySurface {
    layer: FrameBuffer,
}

impl OverlaySurface {
    pub fn new(width: usize, height: usize) -> Self {
        Self { layer: FrameBuffer::transparent(width, height) }
    }

    pub fn layer(&self) -> &FrameBuffer {
        &self.layer
    }

    pub fn is_clear(&self) -> bool {
        self.layer.pixels.iter().all(|&p| p == 0)
    }

    pub fn clear(&mut self) {
        self.layer.pixels.fill(0);
    }

    /// Overlay content does not survive a resize.
    pub fn resize(&mut self, width: usize, height: usize) {
        if width != self.layer.width || height != self.layer.height {
            self.layer = FrameBuffer::transparent(width, height);
        }
    }

    /// Bones then joints. `joints[i]` is landmark `i` already mapped to canvas
    /// pixels; bones touching a missing landmark are skipped.
    pub fn draw_skeleton(&mut self, joints: &[Point]) {
        let bone = BONE_COLOR.with_opacity(BONE_OPACITY);
        for &(a, b) in HAND_CONNECTIONS.iter() {
            if let (Some(&pa), Some(&pb)) = (joints.get(a), joints.get(b)) {
                fill_capsule(&mut self.layer, pa, pb, BONE_WIDTH * 0.5, bone);
            }
        }

        let joint = JOINT_COLOR.with_opacity(JOINT_OPACITY);
        for &p in joints {
            fill_disc(&mut self.layer, p, JOINT_RADIUS, joint);
        }
    }

    /// Fingertip indicator; heavier when the pen is down.
    pub fn draw_cursor(&mut self, at: Point, pen: PenState, color: Rgb) {
        fill_disc(&mut self.layer, at, CURSOR_DOT_RADIUS, color.with_opacity(0.35));
        draw_ring(&mut self.layer, at, CURSOR_RING_RADIUS, 1.5, color.with_opacity(0.5));
        if pen == PenState::Down {
            fill_disc(&mut self.layer, at, CURSOR_DOWN_RADIUS, color.with_opacity(0.6));
        }
    }

    pub fn composite_onto(&self, screen: &mut FrameBuffer, lut: &GammaLut) -> Result<(), Error> {
        blend_layer(screen, &self.layer, lut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_painted(o: &OverlaySurface) -> usize {
        o.layer().pixels.iter().filter(|&&p| p != 0).count()
    }

    #[test]
    fn down_cursor_is_heavier_than_up() {
        let mut up = OverlaySurface::new(64, 64);
        up.draw_cursor(Point::new(32.0, 32.0), PenState::Up, Rgb::CYAN);
        let mut down = OverlaySurface::new(64, 64);
        down.draw_cursor(Point::new(32.0, 32.0), PenState::Down, Rgb::CYAN);

        assert!(count_painted(&down) > count_painted(&up));
        let center_alpha = |o: &OverlaySurface| o.layer().get(32, 32).unwrap() >> 24;
        assert!(center_alpha(&down) > center_alpha(&up));
    }

    #[test]
    fn redraw_is_idempotent() {
        let joints: Vec<Point> = (0..21).map(|i| Point::new(10.0 + i as f32 * 2.0, 40.0)).collect();
        let mut o = OverlaySurface::new(80, 80);
        o.draw_skeleton(&joints);
        o.draw_cursor(joints[8], PenState::Up, Rgb::WHITE);
        let first = o.layer().clone();

        o.clear();
        assert!(o.is_clear());
        o.draw_skeleton(&joints);
        o.draw_cursor(joints[8], PenState::Up, Rgb::WHITE);
        assert_eq!(o.layer(), &first);
    }

    #[test]
    fn partial_skeleton_draws_what_it_has() {
        let joints: Vec<Point> = (0..9).map(|i| Point::new(5.0 + i as f32 * 4.0, 20.0)).collect();
        let mut o = OverlaySurface::new(60, 40);
        o.draw_skeleton(&joints);
        assert!(!o.is_clear());
    }
}
