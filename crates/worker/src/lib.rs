//! Asynchronous workers of the preview pipeline: frame generation,
//! liveness checks, and the polling loop that feeds them.

pub mod extractor;
pub mod generate;
pub mod liveness;
pub mod runner;

pub use extractor::{FfmpegExtractor, FrameExtractor};
pub use generate::GenerateWorker;
pub use liveness::LivenessWorker;
