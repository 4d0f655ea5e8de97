//! The persistent ink layer.
//!
//! Only two things mutate it: appending a segment and clearing. It survives
//! pen lifts, tracking loss and mode switches, and can be written out as a PNG.

use std::path::Path;

use image::{Rgba, RgbaImage};
use log::info;

use crate::draw::fill_capsule;
use crate::error::Error;
use crate::gamma::{blend_layer, GammaLut};
use crate::types::{FrameBuffer, StrokeSegment};

pub struct InkSurface {
    layer: FrameBuffer, // 0xAARRGGBB, alpha 0 = no ink
}

impl InkSurface {
    pub fn new(width: usize, height: usize) -> Self {
        Self { layer: FrameBuffer::transparent(width, height) }
    }

    pub fn width(&self) -> usize {
        self.layer.width
    }

    pub fn height(&self) -> usize {
        self.layer.height
    }

    pub fn layer(&self) -> &FrameBuffer {
        &self.layer
    }

    pub fn is_empty(&self) -> bool {
        self.layer.pixels.iter().all(|&p| p >> 24 == 0)
    }

    /// Rasterize one segment with round caps.
    pub fn append_segment(&mut self, segment: &StrokeSegment) {
        let color = segment.paint.color.with_alpha(0xFF);
        fill_capsule(&mut self.layer, segment.from, segment.to, segment.paint.width * 0.5, color);
    }

    /// Wipe all ink. Clearing an empty surface changes nothing.
    pub fn clear(&mut self) {
        self.layer.pixels.fill(0);
    }

    /// Change the canvas size, keeping existing ink anchored top-left.
    /// Ink that falls outside the new bounds is dropped.
    pub fn resize(&mut self, width: usize, height: usize) {
        if width == self.layer.width && height == self.layer.height {
            return;
        }
        let mut next = FrameBuffer::transparent(width, height);
        let copy_w = width.min(self.layer.width);
        for y in 0..height.min(self.layer.height) {
            let src = y * self.layer.width;
            let dst = y * width;
            next.pixels[dst..dst + copy_w].copy_from_slice(&self.layer.pixels[src..src + copy_w]);
        }
        self.layer = next;
    }

    /// Draw the ink over the screen.
    pub fn composite_onto(&self, screen: &mut FrameBuffer, lut: &GammaLut) -> Result<(), Error> {
        blend_layer(screen, &self.layer, lut)
    }

    /// RGBA copy of the ink; unpainted pixels stay transparent.
    pub fn to_image(&self) -> RgbaImage {
        RgbaImage::from_fn(self.layer.width as u32, self.layer.height as u32, |x, y| {
            let p = self.layer.pixels[y as usize * self.layer.width + x as usize];
            Rgba([(p >> 16) as u8, (p >> 8) as u8, p as u8, (p >> 24) as u8])
        })
    }

    /// Save the ink as a PNG snapshot.
    pub fn save_png(&self, path: &Path) -> Result<(), Error> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        self.to_image().save_with_format(path, image::ImageFormat::Png)?;
        info!("Saved drawing to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Paint, Point, Rgb};

    fn seg(x0: f32, y0: f32, x1: f32, y1: f32) -> StrokeSegment {
        StrokeSegment {
            from: Point::new(x0, y0),
            to: Point::new(x1, y1),
            paint: Paint { color: Rgb::PINK, width: 4.0 },
        }
    }

    #[test]
    fn starts_empty_and_segment_paints() {
        let mut ink = InkSurface::new(64, 48);
        assert!(ink.is_empty());
        ink.append_segment(&seg(10.0, 10.0, 30.0, 10.0));
        assert!(!ink.is_empty());
        assert_eq!(ink.layer().get(20, 10), Some(Rgb::PINK.with_alpha(0xFF)));
        assert_eq!(ink.layer().get(20, 30), Some(0));
    }

    #[test]
    fn clear_is_idempotent() {
        let mut ink = InkSurface::new(32, 32);
        ink.append_segment(&seg(0.0, 0.0, 31.0, 31.0));
        ink.clear();
        assert!(ink.is_empty());
        let snapshot = ink.layer().clone();
        ink.clear();
        assert_eq!(ink.layer(), &snapshot);
        assert!(ink.is_empty());
    }

    #[test]
    fn resize_keeps_top_left_ink() {
        let mut ink = InkSurface::new(20, 20);
        ink.append_segment(&seg(2.0, 2.0, 4.0, 2.0));
        ink.append_segment(&seg(18.0, 18.0, 18.0, 18.0));
        ink.resize(10, 30);
        assert_eq!((ink.width(), ink.height()), (10, 30));
        assert_ne!(ink.layer().get(3, 2), Some(0));
        // the far corner was cut off
        assert!(ink.layer().pixels.iter().skip(10 * 10).all(|&p| p == 0));
    }

    #[test]
    fn composite_covers_screen_only_where_inked() {
        let mut ink = InkSurface::new(16, 16);
        ink.append_segment(&seg(8.0, 8.0, 8.0, 8.0));
        let mut screen = FrameBuffer::filled(16, 16, 0x00_11_11_11);
        ink.composite_onto(&mut screen, &GammaLut::new()).unwrap();
        assert_eq!(screen.get(8, 8), Some(Rgb::PINK.0));
        assert_eq!(screen.get(0, 0), Some(0x00_11_11_11));
    }

    #[test]
    fn png_snapshot_round_trips_alpha() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("drawing.png");

        let mut ink = InkSurface::new(24, 12);
        ink.append_segment(&seg(4.0, 6.0, 20.0, 6.0));
        ink.save_png(&path).unwrap();

        let img = image::open(&path).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (24, 12));
        assert_eq!(img.get_pixel(12, 6), &Rgba([0xFF, 0x40, 0x81, 0xFF]));
        assert_eq!(img.get_pixel(0, 0)[3], 0);
    }
}
