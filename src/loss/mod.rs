pub mod cross_entropy;
pub mod weighted_cross_entropy;

pub use cross_entropy::CrossEntropyLoss;
pub use weighted_cross_entropy::WeightedCrossEntropy;
