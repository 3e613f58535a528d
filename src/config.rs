//! Predictor configuration, loadable from TOML.
//!
//! ```toml
//! decision_threshold = 0.4
//! symmetry_filter = true
//! rules = { families = ["CYP", "UGT"] }
//! cutoff = { mode = "exclude", cutoff = 0.3 }
//!
//! [[neighborhood]]
//! sources = ["charge", "polarizability"]
//! max_depth = 2
//! combination = "mean"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::{CutoffMode, DedupMode};
use crate::neighborhood::{default_groups, DescriptorGroup};
use crate::rules::RuleSelector;
use crate::scorer::DEFAULT_AD_NEIGHBORS;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("malformed configuration: {0}")]
    Toml(String),
    #[error("invalid {field}: {message}")]
    Invalid { field: &'static str, message: String },
    #[error("cannot read {path}: {message}")]
    Io { path: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PredictorConfig {
    /// Overrides the model's own decision threshold.
    pub decision_threshold: Option<f64>,
    /// Neighborhood descriptor groups, each with its own depth.
    pub neighborhood: Vec<DescriptorGroup>,
    pub cutoff: CutoffMode,
    pub rules: RuleSelector,
    /// Collapse mappings onto symmetry-equivalent atoms.
    pub symmetry_filter: bool,
    pub dedup: DedupMode,
    /// Worker threads; 0 uses the available parallelism.
    pub threads: usize,
    pub max_heavy_atoms: usize,
    /// Nearest references averaged into the applicability-domain confidence.
    pub ad_neighbors: usize,
    /// Value of a neighborhood feature an atom did not observe.
    pub missing_feature_default: f64,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            decision_threshold: None,
            neighborhood: default_groups(),
            cutoff: CutoffMode::Disabled,
            rules: RuleSelector::default(),
            symmetry_filter: true,
            dedup: DedupMode::default(),
            threads: 0,
            max_heavy_atoms: 100,
            ad_neighbors: DEFAULT_AD_NEIGHBORS,
            missing_feature_default: 0.0,
        }
    }
}

fn probability(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            message: format!("{value} is outside [0, 1]"),
        })
    }
}

impl PredictorConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(|e| ConfigError::Toml(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string(self).map_err(|e| ConfigError::Toml(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(t) = self.decision_threshold {
            probability("decision_threshold", t)?;
        }
        match self.cutoff {
            CutoffMode::Disabled => {}
            CutoffMode::Exclude { cutoff } | CutoffMode::ZeroScore { cutoff } => probability("cutoff", cutoff)?,
        }
        if self.max_heavy_atoms == 0 {
            return Err(ConfigError::Invalid {
                field: "max_heavy_atoms",
                message: "must be at least 1".into(),
            });
        }
        if self.ad_neighbors == 0 {
            return Err(ConfigError::Invalid {
                field: "ad_neighbors",
                message: "must be at least 1".into(),
            });
        }
        if let Some(group) = self.neighborhood.iter().find(|g| g.sources.is_empty()) {
            return Err(ConfigError::Invalid {
                field: "neighborhood",
                message: format!("group with depth {} names no sources", group.max_depth),
            });
        }
        if !self.missing_feature_default.is_finite() {
            return Err(ConfigError::Invalid {
                field: "missing_feature_default",
                message: "must be finite".into(),
            });
        }
        Ok(())
    }
}
