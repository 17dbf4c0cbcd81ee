pub mod aggregate;
pub mod dual_reward;
pub mod translate;

pub use aggregate::{aggregate_logging_outputs, AggregatedLog, LoggingOutput};
pub use dual_reward::{total_reward, Direction, DualLoss, DualRewardCriterion};
pub use translate::{translate, Translation};
