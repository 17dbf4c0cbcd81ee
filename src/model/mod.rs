pub mod lexical;
pub mod translator;

pub use lexical::{LexicalGradients, LexicalTranslator};
pub use translator::{CriterionOutput, LogRecord, ModelMode, Optimizer, TrainableTranslator, WeightedCriterion};
