use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::rules::Phase;

/// A candidate metabolite produced by one rule at one mapping.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    /// Canonical SMILES, the deduplication key.
    pub canonical_id: String,
    /// SMILES in the product's own atom order.
    pub smiles: String,
    pub parent_id: String,
    pub rule: String,
    pub phase: Phase,
    pub family: String,
    /// `priority × max SoM probability` of the mapped heavy atoms.
    pub score: f64,
    /// Whether the mapping reached the SoM cutoff. Always true when no
    /// cutoff is configured.
    pub passed_cutoff: bool,
    /// Parent atom indices the rule matched, ascending.
    pub mapped_atoms: Vec<usize>,
}

/// What to do when a candidate's structure is already in the set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupMode {
    /// Keep whichever scored strictly higher; ties keep the earlier one.
    #[default]
    ReplaceIfHigher,
    /// Keep the first candidate seen for each structure.
    KeepFirst,
}

/// Candidates keyed by canonical identifier.
///
/// Iteration follows the order in which each structure was first inserted;
/// a replacement takes over its predecessor's slot.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CandidateSet {
    mode: DedupMode,
    candidates: Vec<Candidate>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl CandidateSet {
    pub fn new(mode: DedupMode) -> Self {
        Self {
            mode,
            candidates: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn mode(&self) -> DedupMode {
        self.mode
    }

    /// Offers a candidate. Returns whether it was stored.
    pub fn insert(&mut self, candidate: Candidate) -> bool {
        match self.index.get(&candidate.canonical_id) {
            None => {
                self.index.insert(candidate.canonical_id.clone(), self.candidates.len());
                self.candidates.push(candidate);
                true
            }
            Some(&slot) => match self.mode {
                DedupMode::KeepFirst => false,
                DedupMode::ReplaceIfHigher => {
                    if candidate.score > self.candidates[slot].score {
                        self.candidates[slot] = candidate;
                        true
                    } else {
                        false
                    }
                }
            },
        }
    }

    pub fn get(&self, canonical_id: &str) -> Option<&Candidate> {
        self.index.get(canonical_id).map(|&i| &self.candidates[i])
    }

    pub fn contains(&self, canonical_id: &str) -> bool {
        self.index.contains_key(canonical_id)
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter()
    }

    /// Candidates by descending score, ties in insertion order, ranked from 1.
    pub fn ranked(&self) -> Vec<RankedCandidate> {
        let mut sorted: Vec<&Candidate> = self.candidates.iter().collect();
        sorted.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        sorted
            .into_iter()
            .enumerate()
            .map(|(i, c)| RankedCandidate {
                rank: i + 1,
                candidate: c.clone(),
            })
            .collect()
    }
}

impl Extend<Candidate> for CandidateSet {
    fn extend<T: IntoIterator<Item = Candidate>>(&mut self, iter: T) {
        for candidate in iter {
            self.insert(candidate);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCandidate {
    pub rank: usize,
    #[serde(flatten)]
    pub candidate: Candidate,
}
