// What you SEE:
// • The live camera (mirrored) is the background; ink sits on top; the hand
//   skeleton and fingertip ring sit on top of that.
// • AIR DRAW: pinch thumb + index to draw. With the simulated hand the index
//   tip follows the mouse and holding Space pinches.
// • SCRIBBLE: hold the left mouse button to draw.
// • G / P switch mode, 1-6 pick a color, [ ] change the size.
// • C clears the ink, S saves a PNG, ESC quits.
//
// `--headless --replay FILE --out PNG` skips the window and renders a
// recorded landmark stream straight to a PNG.

mod camera;
mod config;
mod draw;
mod error;
mod gamma;
mod gesture;
mod ink;
mod landmarks;
mod overlay;
mod session;
mod source;
mod tracker;
mod types;

use std::time::{Duration, Instant};

use log::{debug, info, warn, LevelFilter};
use minifb::Key;

use camera::{blit_mirrored, CameraCapture};
use config::{step_stroke_size, Config};
use draw::{draw_crosshair, draw_text_5x7, fill_rect, Drawer};
use error::Error;
use gamma::GammaLut;
use ink::InkSurface;
use overlay::OverlaySurface;
use session::{apply_all, DrawingSession, Status};
use source::{open_feed, SourceFrame, SourceInput};
use tracker::PointerEvent;
use types::{FrameBuffer, InputMode, Point, Rgb};

const VERSION: &str = env!("CARGO_PKG_VERSION");

const BACKGROUND: u32 = 0x00_12_14_1C; // visual: dark slate when there is no camera
const HUD_TEXT: u32 = 0x00_FF_FF_FF;
const HUD_HINT: u32 = 0x00_9A_A0_B4;

fn main() -> Result<(), Error> {
    init_logging();
    info!("air-ink v{VERSION}");

    let config = Config::from_args(std::env::args().skip(1))?;
    info!(
        "Canvas {}x{}, pinch threshold {}, source: {}",
        config.canvas_width, config.canvas_height, config.pinch_threshold, config.source
    );

    if config.headless {
        run_headless(&config)
    } else {
        run_window(&config)
    }
}

fn init_logging() {
    env_logger::Builder::from_default_env()
        .filter_module("nokhwa", LevelFilter::Warn)
        .init();
}

/// Feed a replay file through the session and write the ink to a PNG.
fn run_headless(config: &Config) -> Result<(), Error> {
    let mut feed = open_feed(config);
    if !feed.is_live() {
        return Err(Error::Replay(format!("could not start {}", config.source)));
    }

    let mut session = DrawingSession::new(config);
    let mut ink = InkSurface::new(config.canvas_width, config.canvas_height);
    let (mut frames, mut committed) = (0usize, 0usize);

    while feed.is_live() {
        let input = SourceInput { camera: None, pointer: None, pinch: false, mapping: session.mapping() };
        let frame = feed.next_frame(&input);
        if matches!(frame, SourceFrame::Tracking(_)) {
            frames += 1;
        }
        committed += apply_all(&session.on_frame(frame), &mut ink, None);
    }

    info!("Replayed {frames} frames, committed {committed} segments");
    ink.save_png(&config.snapshot_path())
}

fn run_window(config: &Config) -> Result<(), Error> {
    let (mut width, mut height) = (config.canvas_width, config.canvas_height);

    /* --- Camera (optional) ---
       Visual: live mirrored feed behind the ink, or a flat dark background. */
    let mut cam = match config.camera_index {
        Some(index) => match CameraCapture::new(index, width as u32, height as u32) {
            Ok(cam) => {
                let (cw, ch) = cam.resolution();
                info!("Camera {index} streaming at {cw}x{ch}");
                Some(cam)
            }
            Err(err) => {
                warn!("{err}; running without camera");
                None
            }
        },
        None => None,
    };

    /* --- Landmark source ---
       A detector without a camera has nothing to look at: status shows NO CAMERA. */
    let mut feed = open_feed(config);
    if feed.needs_camera() && cam.is_none() {
        feed.stop("no camera");
    }

    let mut drawer = Drawer::new("Air Ink", width, height)?;
    let mut session = DrawingSession::new(config);
    let mut ink = InkSurface::new(width, height);
    let mut overlay = OverlaySurface::new(width, height);
    let mut screen = FrameBuffer::filled(width, height, BACKGROUND);
    let lut = GammaLut::new();
    let save_path = config.snapshot_path();
    let mut pointer = PointerPoller::default();

    let mut last_fps_time = Instant::now();
    let mut frames_this_second: u32 = 0;
    let mut hud_fps_text = String::from("FPS: 0.0");

    /* ------------------------------ Main loop ------------------------------ */
    while drawer.is_open() && !drawer.key_down(Key::Escape) {
        let now = Instant::now();

        /* 1) Canvas follows the window size; ink is kept, overlay is not. */
        let (w, h) = drawer.size();
        if (w, h) != (width, height) && w > 0 && h > 0 {
            (width, height) = (w, h);
            ink.resize(width, height);
            overlay.resize(width, height);
            session.resize(width, height);
            screen = FrameBuffer::filled(width, height, BACKGROUND);
            info!("Canvas resized to {width}x{height}");
        }

        /* 2) Camera frame. Losing the camera stops any source that needs it. */
        let live = match cam.as_mut().map(CameraCapture::next_frame) {
            Some(Ok(frame)) => Some(frame),
            Some(Err(err)) => {
                warn!("{err}; camera stopped");
                cam = None;
                if feed.needs_camera() {
                    feed.stop("camera stopped");
                }
                None
            }
            None => None,
        };

        /* 3) Keyboard controls */
        if drawer.pressed_once(Key::G) { session.set_mode(InputMode::Gesture); }
        if drawer.pressed_once(Key::P) { session.set_mode(InputMode::Pointer); }
        if let Some(i) = drawer.swatch_pressed() {
            session.set_color(Rgb::PALETTE[i]);
            debug!("color {}", Rgb::PALETTE[i]);
        }
        if drawer.pressed_once(Key::LeftBracket) {
            session.set_width(step_stroke_size(session.paint().width, false));
        }
        if drawer.pressed_once(Key::RightBracket) {
            session.set_width(step_stroke_size(session.paint().width, true));
        }
        if drawer.pressed_once(Key::C) {
            apply_all(&session.clear(), &mut ink, None);
            info!("Canvas cleared");
        }
        if drawer.pressed_once(Key::S) {
            if let Err(err) = ink.save_png(&save_path) {
                warn!("Save failed: {err}");
            }
        }

        /* 4) Pointer channel (the session drops these outside SCRIBBLE) */
        let mouse = drawer.mouse_pos();
        for event in pointer.poll(mouse, drawer.left_mouse_down()) {
            apply_all(&session.on_pointer(event), &mut ink, None);
        }

        /* 5) Gesture channel: one landmark frame per loop iteration */
        let input = SourceInput {
            camera: live.as_ref(),
            pointer: mouse,
            pinch: drawer.key_down(Key::Space),
            mapping: session.mapping(),
        };
        let frame = feed.next_frame(&input);
        apply_all(&session.on_frame(frame), &mut ink, Some(&mut overlay));

        /* 6) Compose: camera, ink, overlay, HUD */
        match &live {
            Some(frame) => blit_mirrored(frame, &mut screen),
            None => screen.pixels.fill(BACKGROUND),
        }
        ink.composite_onto(&mut screen, &lut)?;
        overlay.composite_onto(&mut screen, &lut)?;

        if session.mode() == InputMode::Pointer {
            if let Some(p) = mouse {
                draw_crosshair(&mut screen, p.x as i32, p.y as i32, 10, session.paint().color.0);
            }
        }
        draw_hud(&mut screen, &session, &hud_fps_text);

        drawer.present(&screen)?;

        /* 7) FPS counter (debug log + HUD once per second) */
        frames_this_second += 1;
        if now.duration_since(last_fps_time) >= Duration::from_secs(1) {
            let secs = now.duration_since(last_fps_time).as_secs_f32();
            let fps = frames_this_second as f32 / secs;
            debug!("FPS: {fps:.1}");
            hud_fps_text = format!("FPS: {fps:.1}");
            frames_this_second = 0;
            last_fps_time = now;
        }
    }

    Ok(())
}

/// Status line, color swatch and key hints.
fn draw_hud(screen: &mut FrameBuffer, session: &DrawingSession, fps: &str) {
    let status_color = match session.status() {
        Status::Ready => 0x00_00_E6_76,
        Status::Drawing => Rgb::CYAN.0,
        Status::NoCamera => 0x00_FF_AB_40,
        Status::ShowHand | Status::Pointer => HUD_TEXT,
    };
    let status = session.status().to_string();
    draw_text_5x7(screen, 8, 8, &status, status_color);

    let paint = session.paint();
    let x = 8 + 6 * status.len() as i32;
    let rest = format!(" | {} | {}PX | {}", session.mode(), paint.width, fps);
    draw_text_5x7(screen, x, 8, &rest, HUD_TEXT);
    fill_rect(screen, x + 6 * rest.len() as i32 + 6, 7, 9, 9, paint.color.0);

    let hint = match session.mode() {
        InputMode::Gesture => "PINCH OR SPACE: DRAW  P: SCRIBBLE  1-6 [ ]  C: CLEAR  S: SAVE",
        InputMode::Pointer => "LMB: DRAW  G: AIR DRAW  1-6 [ ]  C: CLEAR  S: SAVE",
    };
    draw_text_5x7(screen, 8, screen.height as i32 - 14, hint, HUD_HINT);
}

/// Turns polled mouse state into press/move/release events.
#[derive(Default)]
struct PointerPoller {
    was_down: bool,
    last: Option<Point>,
}

impl PointerPoller {
    fn poll(&mut self, pos: Option<Point>, down: bool) -> Vec<PointerEvent> {
        let mut events = Vec::new();
        match pos {
            None => {
                if self.was_down {
                    events.push(PointerEvent::Leave);
                }
                self.was_down = false;
            }
            Some(p) => {
                match (self.was_down, down) {
                    (false, true) => events.push(PointerEvent::Press(p)),
                    (true, true) if self.last != Some(p) => events.push(PointerEvent::Move(p)),
                    (true, false) => events.push(PointerEvent::Release),
                    _ => {}
                }
                self.was_down = down;
            }
        }
        self.last = pos;
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poller_emits_edges_and_moves() {
        let mut p = PointerPoller::default();
        let a = Point::new(1.0, 1.0);
        let b = Point::new(2.0, 1.0);

        assert!(p.poll(Some(a), false).is_empty());
        assert_eq!(p.poll(Some(a), true), vec![PointerEvent::Press(a)]);
        assert!(p.poll(Some(a), true).is_empty()); // no movement, no event
        assert_eq!(p.poll(Some(b), true), vec![PointerEvent::Move(b)]);
        assert_eq!(p.poll(Some(b), false), vec![PointerEvent::Release]);
        assert!(p.poll(Some(a), false).is_empty());
    }

    #[test]
    fn poller_leaving_window_ends_press() {
        let mut p = PointerPoller::default();
        let a = Point::new(5.0, 5.0);
        p.poll(Some(a), true);
        assert_eq!(p.poll(None, true), vec![PointerEvent::Leave]);
        assert!(p.poll(None, true).is_empty());
        // coming back with the button still held starts a new stroke
        assert_eq!(p.poll(Some(a), true), vec![PointerEvent::Press(a)]);
    }

    #[test]
    fn headless_replay_writes_png() {
        use std::io::Write as _;

        let dir = tempfile::tempdir().unwrap();
        let replay = dir.path().join("frames.jsonl");
        let out = dir.path().join("out.png");

        // index tip sweeps right while pinched; thumb 0.01 below it
        let mut file = std::fs::File::create(&replay).unwrap();
        for i in 0..5 {
            let tip_x = 0.8 - i as f32 * 0.05;
            let lms: Vec<String> = (0..21)
                .map(|j| match j {
                    4 => format!(r#"{{"x":{tip_x},"y":0.51}}"#),
                    8 => format!(r#"{{"x":{tip_x},"y":0.5}}"#),
                    _ => r#"{"x":0.5,"y":0.9}"#.to_string(),
                })
                .collect();
            writeln!(file, r#"{{"hands":[{{"landmarks":[{}]}}]}}"#, lms.join(",")).unwrap();
        }
        drop(file);

        let config = Config::from_args(
            ["--headless", "--replay", replay.to_str().unwrap(), "--out", out.to_str().unwrap(), "--size", "200x100"]
                .map(String::from),
        )
        .unwrap();
        run_headless(&config).unwrap();

        let img = image::open(&out).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (200, 100));
        // (1 - 0.8) * 200 = 40 .. (1 - 0.6) * 200 = 80 along y = 50
        assert_eq!(img.get_pixel(50, 50)[3], 0xFF);
        assert_eq!(img.get_pixel(10, 10)[3], 0);
    }
}
