use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::ScoringError;

/// Model input: field name to value. Fields the model asks for but the
/// vector lacks read as 0.0.
pub type FeatureVector = BTreeMap<String, f64>;

/// Class distribution over {is site, is not site}.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassProbabilities {
    pub site: f64,
    pub not_site: f64,
}

impl ClassProbabilities {
    pub fn from_site(site: f64) -> Self {
        Self {
            site,
            not_site: 1.0 - site,
        }
    }
}

/// A pre-trained site-of-metabolism classifier. Loaded once and shared
/// read-only between workers, so evaluation takes `&self`.
pub trait ProbabilityModel: Send + Sync {
    fn evaluate(&self, features: &FeatureVector) -> Result<ClassProbabilities, ScoringError>;

    /// Decision threshold the model was trained with.
    fn default_threshold(&self) -> f64 {
        0.5
    }
}

/// Node of a decision tree, stored in a flat arena with the root at 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeNode {
    /// Goes `left` when `field <= threshold`, else `right`.
    Split {
        field: String,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Site probability at this leaf.
    Leaf { site: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    fn validate(&self, tree: usize) -> Result<(), ScoringError> {
        if self.nodes.is_empty() {
            return Err(ScoringError::InvalidModel(format!("tree {tree} has no nodes")));
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match *node {
                // Children after their parent rules out cycles.
                TreeNode::Split { left, right, .. } => {
                    for child in [left, right] {
                        if child <= i || child >= self.nodes.len() {
                            return Err(ScoringError::InvalidModel(format!(
                                "tree {tree} node {i} has child {child} out of order"
                            )));
                        }
                    }
                }
                TreeNode::Leaf { site } => {
                    if !(0.0..=1.0).contains(&site) {
                        return Err(ScoringError::InvalidModel(format!(
                            "tree {tree} leaf {i} has probability {site}"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn predict(&self, features: &FeatureVector) -> f64 {
        let mut i = 0;
        loop {
            match &self.nodes[i] {
                TreeNode::Leaf { site } => return *site,
                TreeNode::Split {
                    field,
                    threshold,
                    left,
                    right,
                } => {
                    let value = features.get(field).copied().unwrap_or(0.0);
                    i = if value <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

/// Averaged ensemble of decision trees, the serialized form of a random
/// forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsemble {
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    pub trees: Vec<DecisionTree>,
}

fn default_threshold() -> f64 {
    0.5
}

impl TreeEnsemble {
    pub fn new(trees: Vec<DecisionTree>, threshold: f64) -> Result<Self, ScoringError> {
        let model = Self { threshold, trees };
        model.validate()?;
        Ok(model)
    }

    pub fn from_json(json: &str) -> Result<Self, ScoringError> {
        let model: Self = serde_json::from_str(json).map_err(|e| ScoringError::InvalidModel(e.to_string()))?;
        model.validate()?;
        Ok(model)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ScoringError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ScoringError::io(path, e))?;
        Self::from_json(&json)
    }

    fn validate(&self) -> Result<(), ScoringError> {
        if self.trees.is_empty() {
            return Err(ScoringError::InvalidModel("ensemble has no trees".into()));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(ScoringError::InvalidModel(format!("threshold {} outside [0, 1]", self.threshold)));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(i)?;
        }
        Ok(())
    }

    /// Field names the trees split on.
    pub fn fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = self
            .trees
            .iter()
            .flat_map(|t| &t.nodes)
            .filter_map(|n| match n {
                TreeNode::Split { field, .. } => Some(field.as_str()),
                TreeNode::Leaf { .. } => None,
            })
            .collect();
        fields.sort_unstable();
        fields.dedup();
        fields
    }
}

impl ProbabilityModel for TreeEnsemble {
    fn evaluate(&self, features: &FeatureVector) -> Result<ClassProbabilities, ScoringError> {
        let total: f64 = self.trees.iter().map(|t| t.predict(features)).sum();
        let site = total / self.trees.len() as f64;
        if !site.is_finite() {
            return Err(ScoringError::Evaluation(format!("non-finite probability {site}")));
        }
        Ok(ClassProbabilities::from_site(site))
    }

    fn default_threshold(&self) -> f64 {
        self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STUMPS: &str = r#"{
        "threshold": 0.4,
        "trees": [
            {"nodes": [
                {"kind": "split", "field": "hydrogens", "threshold": 0.5, "left": 1, "right": 2},
                {"kind": "leaf", "site": 0.1},
                {"kind": "leaf", "site": 0.7}
            ]},
            {"nodes": [
                {"kind": "split", "field": "atom_type_C.3", "threshold": 0.5, "left": 1, "right": 2},
                {"kind": "leaf", "site": 0.3},
                {"kind": "leaf", "site": 0.9}
            ]}
        ]
    }"#;

    fn features(pairs: &[(&str, f64)]) -> FeatureVector {
        pairs.iter().map(|&(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn averages_tree_votes() {
        let model = TreeEnsemble::from_json(STUMPS).unwrap();
        let p = model.evaluate(&features(&[("hydrogens", 3.0), ("atom_type_C.3", 1.0)])).unwrap();
        assert!((p.site - 0.8).abs() < 1e-12);
        assert!((p.not_site - 0.2).abs() < 1e-12);
        assert_eq!(model.default_threshold(), 0.4);
    }

    #[test]
    fn missing_fields_read_as_zero() {
        let model = TreeEnsemble::from_json(STUMPS).unwrap();
        let p = model.evaluate(&FeatureVector::new()).unwrap();
        assert!((p.site - 0.2).abs() < 1e-12);
    }

    #[test]
    fn lists_split_fields() {
        let model = TreeEnsemble::from_json(STUMPS).unwrap();
        assert_eq!(model.fields(), ["atom_type_C.3", "hydrogens"]);
    }

    #[test]
    fn threshold_defaults_to_one_half() {
        let model = TreeEnsemble::from_json(r#"{"trees": [{"nodes": [{"kind": "leaf", "site": 1.0}]}]}"#).unwrap();
        assert_eq!(model.default_threshold(), 0.5);
    }

    #[test]
    fn rejects_malformed_models() {
        let cyclic = r#"{"trees": [{"nodes": [
            {"kind": "split", "field": "x", "threshold": 0.0, "left": 0, "right": 1},
            {"kind": "leaf", "site": 0.5}
        ]}]}"#;
        assert!(matches!(TreeEnsemble::from_json(cyclic), Err(ScoringError::InvalidModel(_))));
        let bad_leaf = r#"{"trees": [{"nodes": [{"kind": "leaf", "site": 1.5}]}]}"#;
        assert!(matches!(TreeEnsemble::from_json(bad_leaf), Err(ScoringError::InvalidModel(_))));
        assert!(matches!(TreeEnsemble::from_json(r#"{"trees": []}"#), Err(ScoringError::InvalidModel(_))));
        assert!(matches!(TreeEnsemble::from_json("not json"), Err(ScoringError::InvalidModel(_))));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = TreeEnsemble::from_path("/nonexistent/model.json").unwrap_err();
        assert!(matches!(err, ScoringError::Io { .. }));
    }
}
