use std::fmt::Display;
use std::path::PathBuf;

use directories::UserDirs;

use crate::error::Error;
use crate::gesture::DEFAULT_PINCH_THRESHOLD;
use crate::types::{InputMode, Rgb};

/// Stroke widths stepped through with `[` and `]`.
pub const STROKE_SIZES: [f32; 5] = [2.0, 4.0, 8.0, 12.0, 16.0];

pub const SNAPSHOT_FILE_NAME: &str = "air-ink-drawing.png";

#[derive(Debug, Clone)]
pub struct Config {
    /// Pinch distance (normalized camera space) below which the pen is down.
    pub pinch_threshold: f32,
    /// Ink color for new segments.
    pub stroke_color: Rgb,
    /// Ink width in pixels for new segments.
    pub stroke_width: f32,
    /// Forwarded to the external detector (0 = lite model, 1 = full).
    pub model_complexity: u8,
    /// Hands reported below this score are dropped before they reach the core.
    pub min_detection_confidence: f32,

    pub canvas_width: usize,
    pub canvas_height: usize,

    /// Camera device index; `None` runs without a camera.
    pub camera_index: Option<u32>,

    pub source: SourceKind,
    /// Input mode active at startup.
    pub mode: InputMode,

    /// Replay straight into a PNG without opening a window.
    pub headless: bool,
    /// Snapshot path; defaults to `save_dir()/air-ink-drawing.png`.
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    /// Mouse-positioned synthetic hand, Space pinches.
    Simulated,
    /// Landmark frames read from a JSON-lines file.
    Replay(PathBuf),
    /// External hand-landmark program fed with camera frames.
    Detector(String),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pinch_threshold: DEFAULT_PINCH_THRESHOLD,
            stroke_color: Rgb::CYAN,
            stroke_width: 4.0,
            model_complexity: 0,
            min_detection_confidence: 0.4,
            canvas_width: 640,
            canvas_height: 480,
            camera_index: Some(0),
            source: SourceKind::Simulated,
            mode: InputMode::Gesture,
            headless: false,
            output: None,
        }
    }
}

impl Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Simulated => f.write_str("simulated hand (mouse + Space)"),
            SourceKind::Replay(path) => write!(f, "replay {}", path.display()),
            SourceKind::Detector(cmd) => write!(f, "detector `{cmd}`"),
        }
    }
}

impl Config {
    /// Build a config from command-line arguments (without the program name).
    pub fn from_args<I>(args: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = String>,
    {
        let mut config = Config::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            let mut value = |name: &str| {
                args.next().ok_or_else(|| Error::Config(format!("{name} needs a value")))
            };

            match arg.as_str() {
                "--threshold" => config.pinch_threshold = parse_num(&value("--threshold")?, "--threshold")?,
                "--color" => config.stroke_color = value("--color")?.parse()?,
                "--width" => config.stroke_width = parse_num(&value("--width")?, "--width")?,
                "--size" => {
                    let (w, h) = parse_size(&value("--size")?)?;
                    config.canvas_width = w;
                    config.canvas_height = h;
                }
                "--camera" => config.camera_index = Some(parse_num(&value("--camera")?, "--camera")?),
                "--no-camera" => config.camera_index = None,
                "--replay" => config.source = SourceKind::Replay(PathBuf::from(value("--replay")?)),
                "--detector" => config.source = SourceKind::Detector(value("--detector")?),
                "--model-complexity" => {
                    config.model_complexity = parse_num(&value("--model-complexity")?, "--model-complexity")?
                }
                "--min-confidence" => {
                    config.min_detection_confidence = parse_num(&value("--min-confidence")?, "--min-confidence")?
                }
                "--pointer" => config.mode = InputMode::Pointer,
                "--headless" => config.headless = true,
                "--out" => config.output = Some(PathBuf::from(value("--out")?)),
                other => return Err(Error::Config(format!("unknown argument {other:?}"))),
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), Error> {
        if !(self.pinch_threshold > 0.0) {
            return Err(Error::Config("--threshold must be positive".into()));
        }
        if !(self.stroke_width > 0.0) {
            return Err(Error::Config("--width must be positive".into()));
        }
        if self.canvas_width == 0 || self.canvas_height == 0 {
            return Err(Error::Config("--size must be non-zero".into()));
        }
        if self.headless && !matches!(self.source, SourceKind::Replay(_)) {
            return Err(Error::Config("--headless needs --replay FILE".into()));
        }
        Ok(())
    }

    /// Where the snapshot is written.
    pub fn snapshot_path(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| save_dir().join(SNAPSHOT_FILE_NAME))
    }
}

fn parse_num<T: std::str::FromStr>(s: &str, name: &str) -> Result<T, Error> {
    s.trim()
        .parse()
        .map_err(|_| Error::Config(format!("{name}: cannot parse {s:?}")))
}

fn parse_size(s: &str) -> Result<(usize, usize), Error> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| Error::Config(format!("--size must look like 640x480, got {s:?}")))?;
    Ok((parse_num(w, "--size")?, parse_num(h, "--size")?))
}

/// Next preset stroke size above (`up`) or below the current one; stays put
/// at either end.
pub fn step_stroke_size(current: f32, up: bool) -> f32 {
    let next = if up {
        STROKE_SIZES.iter().copied().find(|&s| s > current)
    } else {
        STROKE_SIZES.iter().rev().copied().find(|&s| s < current)
    };
    next.unwrap_or(current)
}

/// Pictures folder, overridable with `AIR_INK_SAVE_DIR`.
pub fn save_dir() -> PathBuf {
    if let Some(override_path) = std::env::var_os("AIR_INK_SAVE_DIR") {
        return PathBuf::from(override_path);
    }

    let Some(dirs) = UserDirs::new() else {
        return std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    };

    match dirs.picture_dir() {
        Some(dir) => dir.to_owned(),
        None => dirs.home_dir().to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defaults() {
        let c = Config::from_args(Vec::new()).unwrap();
        assert_eq!(c.pinch_threshold, 0.05);
        assert_eq!(c.stroke_color, Rgb::CYAN);
        assert_eq!(c.stroke_width, 4.0);
        assert_eq!((c.canvas_width, c.canvas_height), (640, 480));
        assert_eq!(c.source, SourceKind::Simulated);
        assert_eq!(c.mode, InputMode::Gesture);
    }

    #[test]
    fn parses_flags() {
        let c = Config::from_args(args(&[
            "--threshold", "0.08", "--color", "#ff4081", "--width", "8", "--size", "800x600",
            "--no-camera", "--pointer", "--model-complexity", "1",
        ]))
        .unwrap();
        assert_eq!(c.pinch_threshold, 0.08);
        assert_eq!(c.stroke_color, Rgb::PINK);
        assert_eq!(c.stroke_width, 8.0);
        assert_eq!((c.canvas_width, c.canvas_height), (800, 600));
        assert_eq!(c.camera_index, None);
        assert_eq!(c.mode, InputMode::Pointer);
        assert_eq!(c.model_complexity, 1);
    }

    #[test]
    fn headless_requires_replay() {
        assert!(matches!(Config::from_args(args(&["--headless"])), Err(Error::Config(_))));
        let c = Config::from_args(args(&["--headless", "--replay", "frames.jsonl", "--out", "x.png"])).unwrap();
        assert_eq!(c.source, SourceKind::Replay(PathBuf::from("frames.jsonl")));
        assert_eq!(c.snapshot_path(), PathBuf::from("x.png"));
    }

    #[test]
    fn stroke_size_steps() {
        assert_eq!(step_stroke_size(4.0, true), 8.0);
        assert_eq!(step_stroke_size(4.0, false), 2.0);
        assert_eq!(step_stroke_size(16.0, true), 16.0);
        assert_eq!(step_stroke_size(2.0, false), 2.0);
        // off-preset widths snap to the neighbouring preset
        assert_eq!(step_stroke_size(5.0, true), 8.0);
        assert_eq!(step_stroke_size(5.0, false), 4.0);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(Config::from_args(args(&["--threshold", "abc"])).is_err());
        assert!(Config::from_args(args(&["--threshold", "0"])).is_err());
        assert!(Config::from_args(args(&["--size", "640"])).is_err());
        assert!(Config::from_args(args(&["--color"])).is_err());
        assert!(Config::from_args(args(&["--bogus"])).is_err());
    }
}
