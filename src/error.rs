// Crate error type. Every variant states *where* things went wrong.
// Tracking faults never reach here as fatal errors: a failing landmark source
// is logged and stopped instead (see source.rs).
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Window init error: {0}")]
    WindowInit(String), // Creating the window failed

    #[error("Window update error: {0}")]
    WindowUpdate(String), // Updating the window buffer failed

    #[error("Camera init error: {0}")]
    CameraInit(String), // Opening/starting the camera failed

    #[error("Camera frame error: {0}")]
    CameraFrame(String), // Grabbing/decoding a frame failed

    #[error("Detector error: {0}")]
    Detector(String), // The external landmark process misbehaved

    #[error("Replay error: {0}")]
    Replay(String), // A replay file could not be read

    #[error("Export error: {0}")]
    Export(#[from] image::ImageError), // Writing the PNG snapshot failed

    #[error("Config error: {0}")]
    Config(String), // Bad command-line value

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
