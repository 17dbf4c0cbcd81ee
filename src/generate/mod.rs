pub mod beam;
pub mod hypothesis;
pub mod options;

pub use beam::{BeamSearch, StepScorer};
pub use hypothesis::Hypothesis;
pub use options::{DecodeParams, GenerateOptions};
