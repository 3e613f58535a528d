//! Site-of-metabolism scoring.
//!
//! [`SomScorer`] turns each heavy atom's descriptors and neighborhood
//! features into a [`FeatureVector`], evaluates the shared
//! [`ProbabilityModel`] on it and, when a reference set is loaded, attaches
//! an applicability-domain confidence.

mod domain;
mod encode;
mod error;
mod model;

use std::collections::HashMap;
use std::sync::Arc;

use petgraph::graph::NodeIndex;
use tracing::{debug, warn};

use crate::atom::{Atom, SomPrediction};
use crate::bond::Bond;
use crate::mol::Mol;

pub use domain::{
    confidence, tanimoto_similarity, BruteForceIndex, Fingerprint, FingerprintField, FingerprintSchema,
    ReferenceIndex,
};
pub use encode::{FeatureEncoder, ATOM_TYPE_PREFIX};
pub use error::ScoringError;
pub use model::{ClassProbabilities, DecisionTree, FeatureVector, ProbabilityModel, TreeEnsemble, TreeNode};

/// Number of nearest references averaged into the confidence.
pub const DEFAULT_AD_NEIGHBORS: usize = 3;

#[derive(Clone)]
pub struct SomScorer {
    model: Arc<dyn ProbabilityModel>,
    reference: Option<Arc<dyn ReferenceIndex>>,
    encoder: FeatureEncoder,
    threshold: f64,
    ad_neighbors: usize,
}

impl SomScorer {
    /// Scorer using the model's own decision threshold and no reference set.
    pub fn new(model: Arc<dyn ProbabilityModel>) -> Self {
        let threshold = model.default_threshold();
        Self {
            model,
            reference: None,
            encoder: FeatureEncoder::new(),
            threshold,
            ad_neighbors: DEFAULT_AD_NEIGHBORS,
        }
    }

    pub fn with_reference_index(mut self, index: Arc<dyn ReferenceIndex>) -> Self {
        self.reference = Some(index);
        self
    }

    /// Overrides the decision threshold; `None` restores the model default.
    pub fn with_threshold(mut self, threshold: Option<f64>) -> Self {
        self.threshold = threshold.unwrap_or_else(|| self.model.default_threshold());
        self
    }

    pub fn with_ad_neighbors(mut self, k: usize) -> Self {
        self.ad_neighbors = k;
        self
    }

    pub fn with_encoder(mut self, encoder: FeatureEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Prediction for one annotated atom. Only a model failure is an error.
    pub fn score_atom(&self, atom: &Atom) -> Result<SomPrediction, ScoringError> {
        let features = self.encoder.encode(atom);
        let probability = self.model.evaluate(&features)?.site;
        Ok(SomPrediction {
            probability,
            ad_score: self.ad_score(atom),
            is_site: probability >= self.threshold,
        })
    }

    fn ad_score(&self, atom: &Atom) -> Option<f64> {
        let index = self.reference.as_ref()?;
        let fingerprint = index.schema().encode(atom);
        match index.k_nearest(&fingerprint, self.ad_neighbors) {
            Ok(distances) => confidence(&distances),
            Err(err) => {
                warn!(error = %err, "nearest-neighbor search failed, confidence omitted");
                None
            }
        }
    }

    /// Scores every heavy atom. Atoms sharing an equivalence class get the
    /// prediction of the class's lowest-index atom; atoms without a class
    /// are scored individually.
    pub fn score(&self, mol: &mut Mol<Atom, Bond>) -> Result<(), ScoringError> {
        let atoms: Vec<NodeIndex> = mol.heavy_atoms().collect();
        let mut by_class: HashMap<u32, SomPrediction> = HashMap::new();
        let mut evaluated = 0usize;
        for idx in atoms.iter().copied() {
            let class = mol.atom(idx).equivalence_class;
            let prediction = match class.and_then(|c| by_class.get(&c)) {
                Some(&cached) => cached,
                None => {
                    let fresh = self.score_atom(mol.atom(idx))?;
                    evaluated += 1;
                    if let Some(c) = class {
                        by_class.insert(c, fresh);
                    }
                    fresh
                }
            };
            mol.atom_mut(idx).som = Some(prediction);
        }
        debug!(atoms = atoms.len(), evaluated, "scored atoms");
        Ok(())
    }
}

impl std::fmt::Debug for SomScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SomScorer")
            .field("threshold", &self.threshold)
            .field("ad_neighbors", &self.ad_neighbors)
            .field("reference", &self.reference.is_some())
            .finish_non_exhaustive()
    }
}
