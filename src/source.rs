//! Landmark sources: where per-frame hand keypoints come from.
//!
//! The core only ever sees [`SourceFrame`]s. A source that fails or runs out
//! is stopped for good and reports `Unavailable` from then on, which the
//! session treats as "no hand, forever". Nothing here is fatal.
//!
//! Three sources ship:
//! * [`SimulatedHand`]: a synthetic hand under the mouse, Space pinches.
//! * [`ReplaySource`]: JSON lines recorded from a detector.
//! * [`DetectorProcess`]: an external hand-landmark program fed with camera
//!   frames over stdin, answering with one JSON line per frame.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use image::RgbImage;
use log::{debug, info, warn};
use serde::Deserialize;

use crate::config::{Config, SourceKind};
use crate::error::Error;
use crate::landmarks::{FrameObservation, LANDMARK_COUNT, THUMB_IP, THUMB_TIP};
use crate::tracker::CanvasMapping;
use crate::types::{Landmark, Point};

/// What the session receives each frame.
#[derive(Clone, Debug, PartialEq)]
pub enum SourceFrame {
    Tracking(FrameObservation),
    /// The source is gone (camera lost, detector died, replay finished).
    Unavailable,
}

/// Everything a source may look at for the current frame.
pub struct SourceInput<'a> {
    pub camera: Option<&'a RgbImage>,
    /// Mouse position in canvas pixels, `None` when outside the window.
    pub pointer: Option<Point>,
    /// Simulated pinch (Space held).
    pub pinch: bool,
    pub mapping: CanvasMapping,
}

pub trait LandmarkSource {
    fn name(&self) -> &'static str;

    fn needs_camera(&self) -> bool {
        false
    }

    /// `Ok(None)` means the source has ended.
    fn poll(&mut self, input: &SourceInput<'_>) -> Result<Option<FrameObservation>, Error>;
}

/// Wraps a source and enforces "stopped means stopped".
pub struct LandmarkFeed {
    source: Option<Box<dyn LandmarkSource>>,
}

impl LandmarkFeed {
    pub fn new(source: Box<dyn LandmarkSource>) -> Self {
        info!("Landmark source: {}", source.name());
        Self { source: Some(source) }
    }

    pub fn stopped() -> Self {
        Self { source: None }
    }

    pub fn is_live(&self) -> bool {
        self.source.is_some()
    }

    pub fn needs_camera(&self) -> bool {
        self.source.as_ref().is_some_and(|s| s.needs_camera())
    }

    pub fn stop(&mut self, reason: &str) {
        if let Some(source) = self.source.take() {
            warn!("Landmark source {} stopped: {reason}", source.name());
        }
    }

    pub fn next_frame(&mut self, input: &SourceInput<'_>) -> SourceFrame {
        let Some(source) = self.source.as_mut() else {
            return SourceFrame::Unavailable;
        };
        match source.poll(input) {
            Ok(Some(observation)) => SourceFrame::Tracking(observation),
            Ok(None) => {
                self.stop("end of input");
                SourceFrame::Unavailable
            }
            Err(err) => {
                self.stop(&err.to_string());
                SourceFrame::Unavailable
            }
        }
    }
}

/// Build the feed the config asks for. Failing to start yields a stopped feed.
pub fn open_feed(config: &Config) -> LandmarkFeed {
    let source: Result<Box<dyn LandmarkSource>, Error> = match &config.source {
        SourceKind::Simulated => Ok(Box::new(SimulatedHand)),
        SourceKind::Replay(path) => {
            ReplaySource::open(path, config.min_detection_confidence).map(|s| Box::new(s) as Box<dyn LandmarkSource>)
        }
        SourceKind::Detector(cmd) => {
            DetectorProcess::spawn(cmd, config).map(|s| Box::new(s) as Box<dyn LandmarkSource>)
        }
    };

    match source {
        Ok(source) => LandmarkFeed::new(source),
        Err(err) => {
            warn!("Could not start landmark source ({}): {err}", config.source);
            LandmarkFeed::stopped()
        }
    }
}

/* ---------- detector JSON schema (shared by replay files and the detector process) ---------- */

#[derive(Deserialize, Debug)]
struct DetectionJson {
    #[serde(default)]
    hands: Vec<HandJson>,
    #[serde(default)]
    error: Option<String>,
}

/// A hand is either a bare landmark list or a landmark list with a score.
/// Bare hands count as fully confident.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum HandJson {
    Bare(Vec<Landmark>),
    Scored {
        #[serde(default = "full_score")]
        score: f32,
        landmarks: Vec<Landmark>,
    },
}

impl HandJson {
    fn score(&self) -> f32 {
        match self {
            HandJson::Bare(_) => full_score(),
            HandJson::Scored { score, .. } => *score,
        }
    }

    fn into_landmarks(self) -> Vec<Landmark> {
        match self {
            HandJson::Bare(landmarks) | HandJson::Scored { landmarks, .. } => landmarks,
        }
    }
}

fn full_score() -> f32 {
    1.0
}

/// Parse one detection line. Hands under `min_confidence` are dropped here,
/// so the core never sees a confidence value. A reported detector error is a
/// frame without a hand.
pub fn parse_detection(line: &str, min_confidence: f32) -> Result<FrameObservation, serde_json::Error> {
    let result: DetectionJson = serde_json::from_str(line)?;
    if let Some(error) = result.error {
        warn!("Detector reported: {error}");
        return Ok(FrameObservation::NoHand);
    }
    Ok(FrameObservation::from_hands(
        result
            .hands
            .into_iter()
            .filter(|h| h.score() >= min_confidence)
            .map(HandJson::into_landmarks),
    ))
}

/// Malformed lines cost one frame, not the session.
fn observation_or_no_hand(line: &str, min_confidence: f32, origin: &str) -> FrameObservation {
    if line.trim().is_empty() {
        return FrameObservation::NoHand;
    }
    parse_detection(line, min_confidence).unwrap_or_else(|err| {
        warn!("{origin}: dropping malformed frame: {err}");
        FrameObservation::NoHand
    })
}

/* ---------- simulated hand ---------- */

// Resting hand, relative to the index tip, in normalized camera space.
// Index 4 (thumb tip) is filled in per frame.
const SIM_HAND: [(f32, f32); LANDMARK_COUNT] = [
    (0.020, 0.300),  // wrist
    (0.070, 0.270), (0.110, 0.220), (0.130, 0.170), (0.000, 0.000), // thumb
    (0.030, 0.130), (0.020, 0.080), (0.010, 0.040), (0.000, 0.000), // index
    (0.000, 0.130), (-0.010, 0.070), (-0.015, 0.030), (-0.020, -0.010), // middle
    (-0.030, 0.140), (-0.040, 0.090), (-0.045, 0.055), (-0.050, 0.020), // ring
    (-0.055, 0.160), (-0.065, 0.120), (-0.070, 0.095), (-0.075, 0.070), // pinky
];
const SIM_THUMB_OPEN: (f32, f32) = (0.120, 0.080);
const SIM_THUMB_PINCHED: (f32, f32) = (0.010, 0.010);

/// Stand-in for a detector: the index tip follows the mouse.
pub struct SimulatedHand;

impl SimulatedHand {
    fn landmarks(tip: Landmark, pinch: bool) -> Vec<Landmark> {
        let mut out: Vec<Landmark> = SIM_HAND
            .iter()
            .map(|&(dx, dy)| Landmark::new(tip.x + dx, tip.y + dy))
            .collect();
        let (tx, ty) = if pinch { SIM_THUMB_PINCHED } else { SIM_THUMB_OPEN };
        out[THUMB_TIP] = Landmark::new(tip.x + tx, tip.y + ty);
        if pinch {
            // curl the thumb joint toward the tip so the skeleton looks pinched
            out[THUMB_IP] = Landmark::new(tip.x + 0.07, tip.y + 0.09);
        }
        out
    }
}

impl LandmarkSource for SimulatedHand {
    fn name(&self) -> &'static str {
        "simulated hand"
    }

    fn poll(&mut self, input: &SourceInput<'_>) -> Result<Option<FrameObservation>, Error> {
        let observation = match input.pointer {
            Some(p) => {
                let tip = input.mapping.to_normalized(p);
                FrameObservation::from_hands([Self::landmarks(tip, input.pinch)])
            }
            None => FrameObservation::NoHand,
        };
        Ok(Some(observation))
    }
}

/* ---------- replay ---------- */

/// Detection JSON, one line per frame. End of input ends the source.
/// Undecodable bytes only spoil their own line.
pub struct ReplaySource<R: BufRead> {
    reader: R,
    buf: Vec<u8>,
    line_no: usize,
    min_confidence: f32,
}

impl ReplaySource<BufReader<File>> {
    pub fn open(path: &Path, min_confidence: f32) -> Result<Self, Error> {
        let file = File::open(path).map_err(|e| Error::Replay(format!("{}: {e}", path.display())))?;
        Ok(Self::from_reader(BufReader::new(file), min_confidence))
    }
}

impl<R: BufRead> ReplaySource<R> {
    pub fn from_reader(reader: R, min_confidence: f32) -> Self {
        Self { reader, buf: Vec::new(), line_no: 0, min_confidence }
    }
}

impl<R: BufRead> LandmarkSource for ReplaySource<R> {
    fn name(&self) -> &'static str {
        "replay"
    }

    fn poll(&mut self, _input: &SourceInput<'_>) -> Result<Option<FrameObservation>, Error> {
        self.buf.clear();
        if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
            debug!("replay finished after {} frames", self.line_no);
            return Ok(None);
        }
        self.line_no += 1;
        let line = String::from_utf8_lossy(&self.buf);
        let origin = format!("replay line {}", self.line_no);
        Ok(Some(observation_or_no_hand(&line, self.min_confidence, &origin)))
    }
}

/* ---------- external detector process ---------- */

/// Hand-landmark program running as a child process.
///
/// Protocol: the child prints `READY` once. For each frame it reads
/// `width`, `height`, `channels` (little-endian u32) followed by the raw RGB
/// bytes, and answers with one detection JSON line.
pub struct DetectorProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    min_confidence: f32,
}

impl DetectorProcess {
    pub fn spawn(command: &str, config: &Config) -> Result<Self, Error> {
        let mut parts = command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| Error::Detector("empty detector command".into()))?;

        info!("Starting hand detector `{command}`...");
        let mut child = Command::new(program)
            .args(parts)
            .env("AIR_INK_MODEL_COMPLEXITY", config.model_complexity.to_string())
            .env("AIR_INK_MIN_CONFIDENCE", config.min_detection_confidence.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| Error::Detector(format!("spawn `{program}`: {e}")))?;

        let stdin = child.stdin.take().ok_or_else(|| Error::Detector("no stdin pipe".into()))?;
        let stdout = child.stdout.take().ok_or_else(|| Error::Detector("no stdout pipe".into()))?;
        let mut stdout = BufReader::new(stdout);

        let mut ready = String::new();
        let handshake = match stdout.read_line(&mut ready) {
            Ok(_) if ready.trim() == "READY" => Ok(()),
            Ok(_) => Err(Error::Detector(format!("expected READY, got {:?}", ready.trim()))),
            Err(e) => Err(Error::Detector(format!("reading handshake: {e}"))),
        };
        if let Err(err) = handshake {
            let _ = child.kill();
            let _ = child.wait();
            return Err(err);
        }
        info!("Hand detector ready");

        Ok(Self { child, stdin, stdout, min_confidence: config.min_detection_confidence })
    }
}

impl LandmarkSource for DetectorProcess {
    fn name(&self) -> &'static str {
        "detector process"
    }

    fn needs_camera(&self) -> bool {
        true
    }

    fn poll(&mut self, input: &SourceInput<'_>) -> Result<Option<FrameObservation>, Error> {
        let frame = input
            .camera
            .ok_or_else(|| Error::Detector("no camera frame to analyze".into()))?;

        let (w, h) = frame.dimensions();
        self.stdin.write_all(&w.to_le_bytes())?;
        self.stdin.write_all(&h.to_le_bytes())?;
        self.stdin.write_all(&3u32.to_le_bytes())?;
        self.stdin.write_all(frame.as_raw())?;
        self.stdin.flush()?;

        let mut response = String::new();
        if self.stdout.read_line(&mut response)? == 0 {
            return Err(Error::Detector("detector exited".into()));
        }
        Ok(Some(observation_or_no_hand(&response, self.min_confidence, "detector")))
    }
}

impl Drop for DetectorProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::{classify, DEFAULT_PINCH_THRESHOLD};
    use crate::types::PenState;
    use std::io::Cursor;

    fn input(pointer: Option<Point>, pinch: bool) -> SourceInput<'static> {
        SourceInput { camera: None, pointer, pinch, mapping: CanvasMapping::mirrored(640, 480) }
    }

    fn hand_json(tip_x: f32, score: f32) -> String {
        let lms: Vec<String> = (0..LANDMARK_COUNT)
            .map(|i| format!(r#"{{"x":{},"y":0.5,"z":0.0}}"#, if i == 8 { tip_x } else { 0.1 }))
            .collect();
        format!(r#"{{"score":{score},"landmarks":[{}]}}"#, lms.join(","))
    }

    #[test]
    fn parses_detector_schema() {
        let line = format!(r#"{{"hands":[{}]}}"#, hand_json(0.3, 0.9));
        let obs = parse_detection(&line, 0.4).unwrap();
        assert_eq!(obs.hand().unwrap().index_tip(), Landmark::new(0.3, 0.5));
    }

    #[test]
    fn parses_bare_landmark_lists() {
        let lms: Vec<String> = (0..LANDMARK_COUNT)
            .map(|i| format!(r#"{{"x":{},"y":0.5,"z":0.0}}"#, if i == 8 { 0.3 } else { 0.1 }))
            .collect();
        let line = format!(r#"{{"hands":[[{}]]}}"#, lms.join(","));
        let obs = parse_detection(&line, 0.4).unwrap();
        assert_eq!(obs.hand().unwrap().index_tip(), Landmark::new(0.3, 0.5));
    }

    #[test]
    fn bare_and_scored_hands_mix() {
        let bare: Vec<String> = (0..LANDMARK_COUNT).map(|_| r#"{"x":0.6,"y":0.6}"#.to_string()).collect();
        let line = format!(r#"{{"hands":[{},[{}]]}}"#, hand_json(0.2, 0.1), bare.join(","));
        let obs = parse_detection(&line, 0.4).unwrap();
        assert_eq!(obs.hand().unwrap().index_tip().x, 0.6);
    }

    #[test]
    fn empty_hands_and_errors_are_no_hand() {
        assert_eq!(parse_detection(r#"{"hands":[]}"#, 0.4).unwrap(), FrameObservation::NoHand);
        assert_eq!(parse_detection(r#"{}"#, 0.4).unwrap(), FrameObservation::NoHand);
        assert_eq!(
            parse_detection(r#"{"hands":[],"error":"model failed"}"#, 0.4).unwrap(),
            FrameObservation::NoHand
        );
    }

    #[test]
    fn low_confidence_hands_are_dropped() {
        let line = format!(r#"{{"hands":[{},{}]}}"#, hand_json(0.2, 0.1), hand_json(0.7, 0.8));
        let obs = parse_detection(&line, 0.4).unwrap();
        assert_eq!(obs.hand().unwrap().index_tip().x, 0.7);
    }

    #[test]
    fn short_landmark_list_is_no_hand() {
        let line = r#"{"hands":[{"landmarks":[{"x":0.1,"y":0.1},{"x":0.2,"y":0.2}]}]}"#;
        assert_eq!(parse_detection(line, 0.4).unwrap(), FrameObservation::NoHand);
    }

    #[test]
    fn replay_yields_frames_then_ends() {
        let text = format!(
            "{{\"hands\":[{}]}}\nnot json\n\n{{\"hands\":[]}}\n",
            hand_json(0.5, 1.0)
        );
        let mut replay = ReplaySource::from_reader(Cursor::new(text), 0.4);
        let inp = input(None, false);

        assert!(replay.poll(&inp).unwrap().unwrap().hand().is_some());
        assert_eq!(replay.poll(&inp).unwrap(), Some(FrameObservation::NoHand)); // malformed
        assert_eq!(replay.poll(&inp).unwrap(), Some(FrameObservation::NoHand)); // blank
        assert_eq!(replay.poll(&inp).unwrap(), Some(FrameObservation::NoHand));
        assert_eq!(replay.poll(&inp).unwrap(), None);
    }

    #[test]
    fn invalid_utf8_line_costs_one_frame() {
        let good = format!("{{\"hands\":[{}]}}\n", hand_json(0.5, 1.0));
        let mut bytes = good.clone().into_bytes();
        bytes.extend_from_slice(b"\xff\xfe garbage\n");
        bytes.extend_from_slice(good.as_bytes());

        let mut feed = LandmarkFeed::new(Box::new(ReplaySource::from_reader(Cursor::new(bytes), 0.4)));
        let inp = input(None, false);

        assert!(matches!(feed.next_frame(&inp), SourceFrame::Tracking(FrameObservation::OneHand(_))));
        assert_eq!(feed.next_frame(&inp), SourceFrame::Tracking(FrameObservation::NoHand));
        assert!(matches!(feed.next_frame(&inp), SourceFrame::Tracking(FrameObservation::OneHand(_))));
        assert_eq!(feed.next_frame(&inp), SourceFrame::Unavailable);
    }

    #[test]
    fn last_line_without_newline_is_read() {
        let text = format!("{{\"hands\":[{}]}}", hand_json(0.5, 1.0));
        let mut replay = ReplaySource::from_reader(Cursor::new(text), 0.4);
        let inp = input(None, false);
        assert!(replay.poll(&inp).unwrap().unwrap().hand().is_some());
        assert_eq!(replay.poll(&inp).unwrap(), None);
    }

    #[test]
    fn feed_stays_unavailable_after_end() {
        let replay = ReplaySource::from_reader(Cursor::new(format!("{{\"hands\":[{}]}}\n", hand_json(0.5, 1.0))), 0.4);
        let mut feed = LandmarkFeed::new(Box::new(replay));
        let inp = input(None, false);

        assert!(matches!(feed.next_frame(&inp), SourceFrame::Tracking(_)));
        assert_eq!(feed.next_frame(&inp), SourceFrame::Unavailable);
        assert!(!feed.is_live());
        assert_eq!(feed.next_frame(&inp), SourceFrame::Unavailable);
    }

    #[test]
    fn explicit_stop() {
        let mut feed = LandmarkFeed::new(Box::new(SimulatedHand));
        assert!(feed.is_live());
        feed.stop("camera revoked");
        assert_eq!(feed.next_frame(&input(Some(Point::new(1.0, 1.0)), true)), SourceFrame::Unavailable);
    }

    #[test]
    fn replay_open_missing_file_fails() {
        let err = ReplaySource::open(Path::new("/definitely/not/here.jsonl"), 0.4);
        assert!(matches!(err, Err(Error::Replay(_))));
    }

    #[test]
    fn simulated_hand_tracks_pointer() {
        let mut sim = SimulatedHand;
        let inp = input(Some(Point::new(200.0, 150.0)), false);
        let obs = sim.poll(&inp).unwrap().unwrap();
        let tip = inp.mapping.to_canvas(obs.hand().unwrap().index_tip());
        assert!((tip.x - 200.0).abs() < 1e-2 && (tip.y - 150.0).abs() < 1e-2);
        assert_eq!(classify(&obs, DEFAULT_PINCH_THRESHOLD), PenState::Up);
    }

    #[test]
    fn simulated_pinch_is_pen_down() {
        let mut sim = SimulatedHand;
        let obs = sim.poll(&input(Some(Point::new(320.0, 240.0)), true)).unwrap().unwrap();
        assert_eq!(classify(&obs, DEFAULT_PINCH_THRESHOLD), PenState::Down);
    }

    #[test]
    fn simulated_hand_leaves_with_the_mouse() {
        let mut sim = SimulatedHand;
        assert_eq!(sim.poll(&input(None, true)).unwrap(), Some(FrameObservation::NoHand));
    }

    #[test]
    fn missing_detector_program_fails_to_spawn() {
        let err = DetectorProcess::spawn("/no/such/air-ink-detector", &Config::default());
        assert!(matches!(err, Err(Error::Detector(_))));
        assert!(matches!(DetectorProcess::spawn("   ", &Config::default()), Err(Error::Detector(_))));
    }

    #[cfg(unix)]
    #[test]
    fn detector_without_ready_handshake_is_rejected() {
        let err = DetectorProcess::spawn("echo hello", &Config::default());
        assert!(matches!(err, Err(Error::Detector(msg)) if msg.contains("expected READY")));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn unreadable_handshake_is_a_detector_error() {
        // printf emits a lone 0xff byte, which read_line rejects as invalid UTF-8
        let err = DetectorProcess::spawn(r"printf \xff\n", &Config::default());
        assert!(matches!(err, Err(Error::Detector(msg)) if msg.contains("handshake")));
    }
}
