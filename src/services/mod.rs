//! Service layer
//!
//! I/O, output encoding and progress reporting, kept out of the session and
//! compositor logic.

pub mod format;
pub mod io;
pub mod progress;

pub use format::{Artifact, OutputFormatHandler};
pub use io::ImageIOService;
pub use progress::{
    ConsoleProgressReporter, NoOpProgressReporter, ProcessingStage, ProgressReporter,
    ProgressTracker, ProgressUpdate,
};
