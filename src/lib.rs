//! Site-of-metabolism prediction and rule-based metabolite generation.
//!
//! Molecules are petgraph graphs of typed [`Atom`]s and [`Bond`]s. The
//! [`Predictor`] annotates each heavy atom with descriptors, neighborhood
//! features and a site-of-metabolism probability, then applies a catalog of
//! reaction-SMARTS rules at the likely sites and returns ranked candidate
//! metabolites.
//!
//! ```no_run
//! use std::sync::Arc;
//! use somcrab::{InputMolecule, Predictor, PredictorConfig, RuleCatalog, TreeEnsemble};
//!
//! let model = TreeEnsemble::from_path("model.json").unwrap();
//! let catalog = RuleCatalog::builtin().unwrap();
//! let predictor = Predictor::new(PredictorConfig::default(), Arc::new(model), Arc::new(catalog)).unwrap();
//! let result = predictor.predict(&InputMolecule::new("paracetamol", "CC(=O)Nc1ccc(O)cc1"));
//! for ranked in &result.prediction().unwrap().ranked {
//!     println!("{} {} {:.3}", ranked.rank, ranked.candidate.smiles, ranked.candidate.score);
//! }
//! ```

pub mod aromaticity;
pub mod atom;
pub mod atom_type;
pub mod bond;
pub mod canonical;
pub mod config;
pub mod descriptors;
pub mod element;
pub mod engine;
pub mod error;
pub mod graph_ops;
pub mod kekulize;
pub mod mol;
pub mod neighborhood;
pub mod pipeline;
pub mod reaction;
pub mod rings;
pub mod rules;
pub mod scorer;
pub mod smarts;
pub mod smiles;
pub mod substruct;
pub mod valence;

pub use atom::{Atom, AtomDescriptors, Hybridization, SomPrediction};
pub use atom_type::{AtomType, AtomTypingError};
pub use bond::{Bond, BondOrder};
pub use canonical::to_canonical_smiles;
pub use config::{ConfigError, PredictorConfig};
pub use element::Element;
pub use engine::{Candidate, CandidateSet, CutoffMode, DedupMode, RankedCandidate, TransformationEngine};
pub use error::{ErrorKind, PredictionError};
pub use kekulize::{kekulize, KekulizeError};
pub use mol::Mol;
pub use neighborhood::{Combination, DescriptorGroup, NeighborhoodAggregator};
pub use pipeline::{InputMolecule, MoleculeResult, Prediction, Predictor, SetupError};
pub use reaction::{from_reaction_smarts, Reaction, ReactionError};
pub use rules::{CatalogError, Phase, Rule, RuleCatalog, RuleSelector};
pub use scorer::{BruteForceIndex, ProbabilityModel, ReferenceIndex, ScoringError, SomScorer, TreeEnsemble};
pub use smarts::{from_smarts, SmartsError};
pub use smiles::{from_smiles, parse_smiles, to_smiles, SmilesError};

#[cfg(test)]
mod tests;
