//! Per-molecule orchestration and batch execution.
//!
//! A [`Predictor`] is built once from a configuration, a scoring model and a
//! rule catalog. Those shared parts are immutable and reached through `Arc`s,
//! so any number of molecules can run through them at once. Each molecule is
//! processed sequentially by one worker:
//!
//! 1. structural checks (non-empty, connected, supported elements, size);
//! 2. kekulization, aromaticity, atom typing and base descriptors;
//! 3. symmetry classes and neighborhood aggregation;
//! 4. SoM scoring;
//! 5. metabolite generation, deduplication and ranking.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use petgraph::graph::NodeIndex;
use rayon::prelude::*;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::aromaticity::perceive_aromaticity;
use crate::atom::Atom;
use crate::atom_type::{assign_atom_types, AtomType};
use crate::bond::Bond;
use crate::canonical::{assign_equivalence_classes, to_canonical_smiles};
use crate::config::{ConfigError, PredictorConfig};
use crate::descriptors::assign_descriptors;
use crate::element::Element;
use crate::engine::{CandidateSet, RankedCandidate, TransformationEngine};
use crate::error::{ErrorKind, PredictionError};
use crate::graph_ops::num_components;
use crate::kekulize::kekulize;
use crate::mol::Mol;
use crate::neighborhood::NeighborhoodAggregator;
use crate::rules::RuleCatalog;
use crate::scorer::{ProbabilityModel, ReferenceIndex, SomScorer};
use crate::smiles::from_smiles;

/// Elements the scoring model was trained on.
const SUPPORTED_ELEMENTS: [Element; 10] = [
    Element::H,
    Element::C,
    Element::N,
    Element::O,
    Element::F,
    Element::P,
    Element::S,
    Element::Cl,
    Element::Br,
    Element::I,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputMolecule {
    pub id: String,
    pub smiles: String,
}

impl InputMolecule {
    pub fn new(id: impl Into<String>, smiles: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            smiles: smiles.into(),
        }
    }
}

/// Per-atom view of the SoM prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AtomSite {
    pub atom: usize,
    pub element: &'static str,
    pub atom_type: Option<AtomType>,
    pub probability: f64,
    pub ad_score: Option<f64>,
    pub is_site: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    pub id: String,
    pub canonical_id: String,
    /// The parent with every annotation the pipeline attached.
    #[serde(skip)]
    pub mol: Mol<Atom, Bond>,
    /// Heavy atoms in index order.
    pub atoms: Vec<AtomSite>,
    pub candidates: CandidateSet,
    pub ranked: Vec<RankedCandidate>,
}

impl Prediction {
    /// Atoms predicted to be sites of metabolism.
    pub fn site_atoms(&self) -> Vec<usize> {
        self.atoms.iter().filter(|a| a.is_site).map(|a| a.atom).collect()
    }
}

/// Outcome for one input. Failures never abort a batch.
#[derive(Debug, Clone)]
pub struct MoleculeResult {
    pub id: String,
    pub outcome: Result<Prediction, PredictionError>,
}

impl MoleculeResult {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn prediction(&self) -> Option<&Prediction> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&PredictionError> {
        self.outcome.as_ref().err()
    }
}

#[derive(Serialize)]
struct ErrorRecord {
    kind: ErrorKind,
    message: String,
}

impl Serialize for MoleculeResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("MoleculeResult", 2)?;
        s.serialize_field("id", &self.id)?;
        match &self.outcome {
            Ok(prediction) => s.serialize_field("prediction", prediction)?,
            Err(err) => s.serialize_field(
                "error",
                &ErrorRecord {
                    kind: err.kind(),
                    message: err.to_string(),
                },
            )?,
        }
        s.end()
    }
}

/// Failure to set up a [`Predictor`].
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("cannot start worker pool: {0}")]
    ThreadPool(String),
}

pub struct Predictor {
    config: PredictorConfig,
    scorer: SomScorer,
    rules: Arc<RuleCatalog>,
    aggregator: NeighborhoodAggregator,
    engine: TransformationEngine,
    pool: rayon::ThreadPool,
}

impl Predictor {
    /// Builds a predictor over the rules of `catalog` the configuration
    /// selects.
    pub fn new(
        config: PredictorConfig,
        model: Arc<dyn ProbabilityModel>,
        catalog: Arc<RuleCatalog>,
    ) -> Result<Self, SetupError> {
        config.validate()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .thread_name(|i| format!("somcrab-{i}"))
            .build()
            .map_err(|e| SetupError::ThreadPool(e.to_string()))?;
        let rules = Arc::new(catalog.select(&config.rules));
        let scorer = SomScorer::new(model)
            .with_threshold(config.decision_threshold)
            .with_ad_neighbors(config.ad_neighbors);
        let aggregator =
            NeighborhoodAggregator::new(config.neighborhood.clone()).with_missing_default(config.missing_feature_default);
        let engine = TransformationEngine::new()
            .with_cutoff(config.cutoff)
            .with_symmetry_filter(config.symmetry_filter)
            .with_dedup(config.dedup);
        info!(
            rules = rules.len(),
            threads = pool.current_num_threads(),
            threshold = scorer.threshold(),
            "predictor ready"
        );
        Ok(Self {
            config,
            scorer,
            rules,
            aggregator,
            engine,
            pool,
        })
    }

    /// Attaches an applicability-domain reference set.
    pub fn with_reference_index(mut self, index: Arc<dyn ReferenceIndex>) -> Self {
        self.scorer = self.scorer.with_reference_index(index);
        self
    }

    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    /// The selected rules.
    pub fn rules(&self) -> &RuleCatalog {
        &self.rules
    }

    pub fn scorer(&self) -> &SomScorer {
        &self.scorer
    }

    pub fn predict(&self, input: &InputMolecule) -> MoleculeResult {
        self.guarded(&input.id, || {
            let mol = from_smiles(&input.smiles)?;
            self.run(&input.id, mol)
        })
    }

    /// Runs the pipeline on a molecule that is already built.
    pub fn predict_mol(&self, id: &str, mol: Mol<Atom, Bond>) -> MoleculeResult {
        self.guarded(id, || self.run(id, mol))
    }

    /// One result per input, in input order, computed on the worker pool.
    pub fn predict_batch(&self, inputs: &[InputMolecule]) -> Vec<MoleculeResult> {
        let results: Vec<MoleculeResult> = self
            .pool
            .install(|| inputs.par_iter().map(|input| self.predict(input)).collect());
        let failed = results.iter().filter(|r| !r.is_ok()).count();
        info!(molecules = results.len(), failed, "batch finished");
        results
    }

    fn guarded<F>(&self, id: &str, f: F) -> MoleculeResult
    where
        F: FnOnce() -> Result<Prediction, PredictionError>,
    {
        let outcome = match catch_unwind(AssertUnwindSafe(f)) {
            Ok(outcome) => outcome,
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(PredictionError::Internal(message))
            }
        };
        if let Err(err) = &outcome {
            warn!(molecule = id, kind = ?err.kind(), error = %err, "prediction failed");
        }
        MoleculeResult {
            id: id.to_string(),
            outcome,
        }
    }

    fn check_structure(&self, mol: &Mol<Atom, Bond>) -> Result<(), PredictionError> {
        let heavy_atoms = mol.heavy_atom_count();
        if heavy_atoms == 0 {
            return Err(PredictionError::Empty);
        }
        let components = num_components(mol);
        if components > 1 {
            return Err(PredictionError::Disconnected(components));
        }
        if let Some(idx) = mol
            .atoms()
            .find(|&i| mol.atom(i).element().is_none_or(|e| !SUPPORTED_ELEMENTS.contains(&e)))
        {
            return Err(PredictionError::UnsupportedElement {
                atom: idx.index(),
                symbol: mol.atom(idx).symbol().to_string(),
            });
        }
        if heavy_atoms > self.config.max_heavy_atoms {
            return Err(PredictionError::TooLarge {
                heavy_atoms,
                limit: self.config.max_heavy_atoms,
            });
        }
        Ok(())
    }

    fn run(&self, id: &str, mut mol: Mol<Atom, Bond>) -> Result<Prediction, PredictionError> {
        self.check_structure(&mol)?;
        mol.clear_annotations();
        kekulize(&mut mol)?;
        perceive_aromaticity(&mut mol);
        assign_atom_types(&mut mol)?;
        assign_descriptors(&mut mol);
        assign_equivalence_classes(&mut mol);
        let signatures = self.aggregator.aggregate(&mut mol);
        self.scorer.score(&mut mol)?;
        debug!(molecule = id, signatures = signatures.len(), "annotated atoms");

        let candidates = self.engine.transform(&mol, id, self.rules.rules())?;
        let ranked = candidates.ranked();
        let atoms = atom_sites(&mol);
        info!(
            molecule = id,
            sites = atoms.iter().filter(|a| a.is_site).count(),
            candidates = candidates.len(),
            "predicted"
        );
        Ok(Prediction {
            id: id.to_string(),
            canonical_id: to_canonical_smiles(&mol),
            mol,
            atoms,
            candidates,
            ranked,
        })
    }
}

fn atom_sites(mol: &Mol<Atom, Bond>) -> Vec<AtomSite> {
    mol.heavy_atoms()
        .map(|i: NodeIndex| {
            let atom = mol.atom(i);
            AtomSite {
                atom: i.index(),
                element: atom.symbol(),
                atom_type: atom.atom_type,
                probability: atom.som_probability(),
                ad_score: atom.som.and_then(|s| s.ad_score),
                is_site: atom.som.is_some_and(|s| s.is_site),
            }
        })
        .collect()
}

impl std::fmt::Debug for Predictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Predictor")
            .field("config", &self.config)
            .field("scorer", &self.scorer)
            .field("rules", &self.rules.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorer::{ClassProbabilities, FeatureVector, ScoringError};

    /// Probability grows with the hydrogen count; panics on iodine.
    struct TestModel;

    impl ProbabilityModel for TestModel {
        fn evaluate(&self, features: &FeatureVector) -> Result<ClassProbabilities, ScoringError> {
            if features.contains_key("atom_type_I") {
                panic!("iodine is not welcome here");
            }
            let h = features.get("hydrogens").copied().unwrap_or(0.0);
            Ok(ClassProbabilities::from_site(h / 4.0))
        }
    }

    fn predictor(config: PredictorConfig) -> Predictor {
        Predictor::new(config, Arc::new(TestModel), Arc::new(RuleCatalog::builtin().unwrap())).unwrap()
    }

    #[test]
    fn structural_errors() {
        let p = predictor(PredictorConfig {
            max_heavy_atoms: 5,
            ..PredictorConfig::default()
        });
        let err = |smiles: &str| p.predict(&InputMolecule::new("m", smiles)).outcome.unwrap_err();
        assert_eq!(err("CC.O"), PredictionError::Disconnected(2));
        assert_eq!(err("CCCCCCC"), PredictionError::TooLarge { heavy_atoms: 7, limit: 5 });
        assert!(matches!(err("C[Si](C)(C)C"), PredictionError::UnsupportedElement { atom: 1, .. }));
        assert!(matches!(err("C1CC"), PredictionError::InvalidSmiles(_)));
        assert_eq!(p.predict_mol("empty", Mol::new()).outcome.unwrap_err(), PredictionError::Empty);
    }

    #[test]
    fn panics_become_internal_errors() {
        let p = predictor(PredictorConfig::default());
        let result = p.predict(&InputMolecule::new("iodo", "CI"));
        let err = result.error().unwrap();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(err.to_string().contains("iodine"));
    }

    #[test]
    fn annotates_and_ranks() {
        let p = predictor(PredictorConfig::default());
        let result = p.predict(&InputMolecule::new("toluene", "Cc1ccccc1"));
        let prediction = result.prediction().unwrap();
        assert_eq!(prediction.atoms.len(), 7);
        assert_eq!(prediction.site_atoms(), [0]);
        assert!(!prediction.ranked.is_empty());
        assert_eq!(prediction.ranked[0].rank, 1);
        assert!(prediction.ranked.windows(2).all(|w| w[0].candidate.score >= w[1].candidate.score));
        assert!(prediction.mol.atoms().all(|i| prediction.mol.atom(i).atom_type.is_some()));
    }

    #[test]
    fn batch_keeps_input_order() {
        let p = predictor(PredictorConfig {
            threads: 2,
            ..PredictorConfig::default()
        });
        let inputs = vec![
            InputMolecule::new("a", "CCO"),
            InputMolecule::new("b", "not smiles"),
            InputMolecule::new("c", "CI"),
            InputMolecule::new("d", "c1ccccc1O"),
        ];
        let results = p.predict_batch(&inputs);
        assert_eq!(results.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), ["a", "b", "c", "d"]);
        assert!(results[0].is_ok());
        assert_eq!(results[1].error().unwrap().kind(), ErrorKind::Structural);
        assert_eq!(results[2].error().unwrap().kind(), ErrorKind::Internal);
        assert!(results[3].is_ok());
    }

    #[test]
    fn results_serialize() {
        let p = predictor(PredictorConfig::default());
        let ok = serde_json::to_value(p.predict(&InputMolecule::new("ethanol", "CCO"))).unwrap();
        assert_eq!(ok["id"], "ethanol");
        assert!(ok["prediction"]["ranked"].is_array());
        let failed = serde_json::to_value(p.predict(&InputMolecule::new("bad", "CC.O"))).unwrap();
        assert_eq!(failed["error"]["kind"], "structural");
    }
}
