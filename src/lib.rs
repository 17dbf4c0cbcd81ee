pub mod config;
pub mod criterion;
pub mod data;
pub mod error;
pub mod generate;
pub mod loss;
pub mod math;
pub mod model;
pub mod optim;
pub mod score;

// Convenience re-exports
pub use config::DualConfig;
pub use criterion::{aggregate_logging_outputs, AggregatedLog, Direction, DualLoss, DualRewardCriterion, LoggingOutput};
pub use data::{collate, Batch, Dictionary, Sample, Token};
pub use error::{CriterionError, Result};
pub use generate::{GenerateOptions, Hypothesis};
pub use loss::WeightedCrossEntropy;
pub use model::{LexicalTranslator, ModelMode, Optimizer, TrainableTranslator, WeightedCriterion};
pub use optim::Sgd;
pub use score::{BleuScorer, ConstantLmScorer, LmScorer};
