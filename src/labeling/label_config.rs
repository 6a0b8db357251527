//! Label configuration: the mapping from free-form labels to dataset ids.
//!
//! Configurations are saved as human-readable YAML so datasets can pin the
//! exact label set they were generated with.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LabelConfigLoadError {
    #[error("Failed to read label config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse label config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[derive(Error, Debug)]
pub enum LabelConfigSaveError {
    #[error("Failed to serialize label config: {0}")]
    Serialize(#[from] serde_yaml::Error),
    #[error("Failed to write label config file: {0}")]
    Io(#[from] std::io::Error),
}

/// A single configured label: a free-form label string mapped to a
/// dataset-ready numeric id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEntry {
    pub id: u32,
    pub label: String,
}

/// An ordered list of [`LabelEntry`] values.
///
/// Matching respects the order of an object's labels, not the order of the
/// config: the first of the object's labels that has a configured entry
/// determines the match.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabelConfig {
    pub entries: Vec<LabelEntry>,
}

impl LabelConfig {
    pub fn new(entries: Vec<LabelEntry>) -> Self {
        Self { entries }
    }

    /// Finds the configured entry for an object's ordered label list.
    ///
    /// Returns the matched entry together with its index in this config, or
    /// `None` when no label has a configured entry.
    pub fn try_match(&self, labels: &[String]) -> Option<(&LabelEntry, usize)> {
        for label in labels {
            if let Some(index) = self.entries.iter().position(|entry| entry.label == *label) {
                return Some((&self.entries[index], index));
            }
        }
        None
    }

    /// Loads a label config from a YAML file.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, LabelConfigLoadError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&contents)?)
    }

    /// Saves this label config as YAML.
    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<(), LabelConfigSaveError> {
        let contents = serde_yaml::to_string(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> LabelConfig {
        LabelConfig::new(vec![
            LabelEntry {
                id: 1,
                label: "crate".into(),
            },
            LabelEntry {
                id: 2,
                label: "barrel".into(),
            },
        ])
    }

    #[test]
    fn first_object_label_with_entry_wins() {
        let config = config();
        let labels = vec!["unknown".to_string(), "barrel".to_string(), "crate".to_string()];
        let (entry, index) = config.try_match(&labels).unwrap();
        assert_eq!(entry.label, "barrel");
        assert_eq!(index, 1);
    }

    #[test]
    fn no_match_returns_none() {
        let config = config();
        assert!(config.try_match(&["pallet".to_string()]).is_none());
    }

    #[test]
    fn yaml_round_trip() {
        let config = config();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: LabelConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.entries, config.entries);
    }
}
