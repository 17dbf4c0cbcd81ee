use serde::{Deserialize, Serialize};

use crate::error::{CriterionError, Result};

/// Options read by the dual-reward criterion.
///
/// Fields:
/// - `reward_alpha`         — blend between LM confidence (alpha) and round-trip
///                            BLEU (1 - alpha); also the backward samples' weight
///                            is `1 - alpha`
/// - `append_eos_to_source` — when false, eos is stripped from pseudo-targets
///                            before they become backward-model sources
/// - `beam`                 — beam width for both decoding passes
/// - `max_len_a`, `max_len_b` — decode length limit `a * src_len + b`
/// - `use_char_source`      — encoders consume character indices as well
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DualConfig {
    pub reward_alpha: f64,
    pub append_eos_to_source: bool,
    pub beam: usize,
    pub max_len_a: f64,
    pub max_len_b: f64,
    pub use_char_source: bool,
}

impl Default for DualConfig {
    fn default() -> Self {
        DualConfig {
            reward_alpha: 0.5,
            append_eos_to_source: false,
            beam: 5,
            max_len_a: 0.0,
            max_len_b: 200.0,
            use_char_source: false,
        }
    }
}

impl DualConfig {
    pub fn remove_eos_at_src(&self) -> bool {
        !self.append_eos_to_source
    }

    /// `round(max_len_a * src_len + max_len_b)`, never negative.
    pub fn max_len(&self, src_len: usize) -> usize {
        (self.max_len_a * src_len as f64 + self.max_len_b).round().max(0.0) as usize
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.reward_alpha) {
            return Err(CriterionError::InvalidConfig(format!(
                "reward_alpha must be in [0, 1], got {}",
                self.reward_alpha
            )));
        }
        if self.beam == 0 {
            return Err(CriterionError::InvalidConfig("beam must be at least 1".to_string()));
        }
        for (name, value) in [("max_len_a", self.max_len_a), ("max_len_b", self.max_len_b)] {
            if !value.is_finite() || value < 0.0 {
                return Err(CriterionError::InvalidConfig(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Serializes the config to a pretty-printed JSON file.
    pub fn save_json(&self, path: &str) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Loads and validates a config; missing fields take their defaults.
    pub fn load_json(path: &str) -> Result<DualConfig> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let config: DualConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = DualConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.remove_eos_at_src());
        assert_eq!(config.max_len(37), 200);
    }

    #[test]
    fn test_max_len_rounds() {
        let config = DualConfig { max_len_a: 1.5, max_len_b: 0.0, ..DualConfig::default() };
        assert_eq!(config.max_len(3), 5);
        assert_eq!(config.max_len(2), 3);
        let config = DualConfig { max_len_a: 1.2, max_len_b: 2.0, ..DualConfig::default() };
        assert_eq!(config.max_len(4), 7);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad_alpha = DualConfig { reward_alpha: 1.5, ..DualConfig::default() };
        assert!(matches!(bad_alpha.validate(), Err(CriterionError::InvalidConfig(_))));

        let bad_beam = DualConfig { beam: 0, ..DualConfig::default() };
        assert!(bad_beam.validate().is_err());

        let bad_len = DualConfig { max_len_b: f64::NAN, ..DualConfig::default() };
        assert!(bad_len.validate().is_err());
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let config: DualConfig = serde_json::from_str(r#"{"reward_alpha": 0.2, "beam": 3}"#).unwrap();
        assert_eq!(config.reward_alpha, 0.2);
        assert_eq!(config.beam, 3);
        assert_eq!(config.max_len_b, 200.0);
    }

    #[test]
    fn test_json_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dual.json");
        let path = path.to_str().unwrap();

        let config = DualConfig { append_eos_to_source: true, ..DualConfig::default() };
        config.save_json(path).unwrap();
        assert_eq!(DualConfig::load_json(path).unwrap(), config);
    }
}
