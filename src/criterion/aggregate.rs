use std::collections::BTreeMap;
use std::f64::consts::LN_2;

use serde::{Deserialize, Serialize};

use crate::error::{CriterionError, Result};
use crate::model::translator::LogRecord;

/// Logging record of one worker: either a plain criterion record or one
/// record per sub-task, e.g. `{"primal": .., "dual": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LoggingOutput {
    Flat(LogRecord),
    Nested(BTreeMap<String, LogRecord>),
}

impl LoggingOutput {
    pub fn dual(primal: LogRecord, dual: LogRecord) -> LoggingOutput {
        let mut nested = BTreeMap::new();
        nested.insert("primal".to_string(), primal);
        nested.insert("dual".to_string(), dual);
        LoggingOutput::Nested(nested)
    }

    /// Value of `key`; nested records are summed, missing keys count as 0.
    pub fn get(&self, key: &str) -> f64 {
        match self {
            LoggingOutput::Flat(record) => record.get(key).copied().unwrap_or(0.0),
            LoggingOutput::Nested(records) => records
                .values()
                .map(|record| record.get(key).copied().unwrap_or(0.0))
                .sum(),
        }
    }
}

/// Totals across workers, with loss reported in bits per normalizer unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedLog {
    /// `loss / sample_size / ln 2`.
    pub loss: f64,
    pub ntokens: f64,
    pub nsentences: f64,
    pub sample_size: f64,
    /// `loss / ntokens / ln 2`; only when `sample_size != ntokens`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nll_loss: Option<f64>,
}

/// Merges the logging records of data-parallel workers.
///
/// # Errors
/// `ZeroSampleSize` when the summed sample size is zero, and `ZeroTokens`
/// when `nll_loss` would divide by zero tokens.
pub fn aggregate_logging_outputs(logging_outputs: &[LoggingOutput]) -> Result<AggregatedLog> {
    let sum = |key: &str| logging_outputs.iter().map(|log| log.get(key)).sum::<f64>();

    let loss_sum = sum("loss");
    let ntokens = sum("ntokens");
    let nsentences = sum("nsentences");
    let sample_size = sum("sample_size");

    if sample_size == 0.0 {
        return Err(CriterionError::ZeroSampleSize);
    }

    let nll_loss = if sample_size != ntokens {
        if ntokens == 0.0 {
            return Err(CriterionError::ZeroTokens);
        }
        Some(loss_sum / ntokens / LN_2)
    } else {
        None
    };

    Ok(AggregatedLog {
        loss: loss_sum / sample_size / LN_2,
        ntokens,
        nsentences,
        sample_size,
        nll_loss,
    })
}
