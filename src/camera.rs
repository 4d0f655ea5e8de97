// Opens the default camera and hands out RGB frames.
// The same frame feeds the detector (raw, unmirrored) and the preview
// (mirrored, scaled to the canvas) so the hand lines up with the cursor.

use crate::error::Error;
use crate::types::FrameBuffer;

use nokhwa::{
    Camera,
    pixel_format::RgbFormat,
    utils::{
        CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
    },
};

use image::RgbImage;

// A small wrapper around nokhwa::Camera so our main loop stays clean.
pub struct CameraCapture {
    cam: Camera,
    width: u32,
    height: u32,
}

impl CameraCapture {
    /// Try to open camera `index` near the requested resolution.
    pub fn new(index: u32, width: u32, height: u32) -> Result<Self, Error> {
        let idx = CameraIndex::Index(index);

        let fmt = CameraFormat::new(
            Resolution::new(width, height),
            FrameFormat::YUYV, // uncompressed; cheap to convert to RGB
            30,                // target FPS
        );

        // Ask for RGB frames, closest to our request.
        let req = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(fmt));

        let mut cam = Camera::new(idx, req)
            .map_err(|e| Error::CameraInit(format!("Create camera: {e}")))?;

        cam.open_stream()
            .map_err(|e| Error::CameraInit(format!("Open stream: {e}")))?;

        // The actual stream might choose a slightly different resolution.
        let actual = cam.resolution();

        Ok(Self {
            cam,
            width: actual.width(),
            height: actual.height(),
        })
    }

    /// Grab one decoded frame (blocks until the camera delivers).
    pub fn next_frame(&mut self) -> Result<RgbImage, Error> {
        let frame = self
            .cam
            .frame()
            .map_err(|e| Error::CameraFrame(format!("Fetch frame: {e}")))?;

        frame
            .decode_image::<RgbFormat>()
            .map_err(|e| Error::CameraFrame(format!("Decode RGB: {e}")))
    }

    /// Report the actual resolution the camera is delivering.
    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl Drop for CameraCapture {
    fn drop(&mut self) {
        let _ = self.cam.stop_stream();
    }
}

/// Scale (nearest) and mirror a camera frame into the screen buffer.
/// Visual: the preview behaves like a mirror, matching the ink mapping.
pub fn blit_mirrored(frame: &RgbImage, screen: &mut FrameBuffer) {
    let (fw, fh) = frame.dimensions();
    if fw == 0 || fh == 0 {
        return;
    }
    for y in 0..screen.height {
        let sy = (y as u64 * fh as u64 / screen.height as u64) as u32;
        for x in 0..screen.width {
            let sx = (x as u64 * fw as u64 / screen.width as u64) as u32;
            let px = frame.get_pixel(fw - 1 - sx, sy);
            let (r, g, b) = (px[0] as u32, px[1] as u32, px[2] as u32);
            screen.pixels[y * screen.width + x] = (r << 16) | (g << 8) | b;
        }
    }
}
