//! Applicability domain: how closely an atom's environment resembles the
//! training set.
//!
//! Atoms are re-encoded into a fixed-width binary fingerprint and compared
//! against a reference set by Tanimoto distance. The confidence is one minus
//! the mean distance to the nearest references.

use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::atom::Atom;

use super::error::ScoringError;

/// A fixed-width bit vector.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    bits: Vec<u64>,
    nbits: usize,
}

impl Fingerprint {
    pub fn new(nbits: usize) -> Self {
        Self {
            bits: vec![0u64; nbits.div_ceil(64)],
            nbits,
        }
    }

    /// Fingerprint with the listed positions set; positions past the width
    /// are an error.
    pub fn from_positions(nbits: usize, positions: &[usize]) -> Result<Self, ScoringError> {
        let mut fp = Self::new(nbits);
        for &pos in positions {
            if pos >= nbits {
                return Err(ScoringError::InvalidReference(format!("bit {pos} outside width {nbits}")));
            }
            fp.set_bit(pos);
        }
        Ok(fp)
    }

    pub fn set_bit(&mut self, pos: usize) {
        self.bits[pos / 64] |= 1u64 << (pos % 64);
    }

    pub fn get_bit(&self, pos: usize) -> bool {
        pos < self.nbits && (self.bits[pos / 64] >> (pos % 64)) & 1 == 1
    }

    pub fn count_ones(&self) -> u32 {
        self.bits.iter().map(|w| w.count_ones()).sum()
    }

    pub fn nbits(&self) -> usize {
        self.nbits
    }

    /// Set positions in ascending order.
    pub fn positions(&self) -> Vec<usize> {
        (0..self.nbits).filter(|&i| self.get_bit(i)).collect()
    }
}

/// Tanimoto similarity. Two empty fingerprints are identical.
pub fn tanimoto_similarity(a: &Fingerprint, b: &Fingerprint) -> f64 {
    let mut and_count = 0u32;
    let mut or_count = 0u32;
    for (x, y) in a.bits.iter().zip(&b.bits) {
        and_count += (x & y).count_ones();
        or_count += (x | y).count_ones();
    }
    if or_count == 0 {
        return 1.0;
    }
    and_count as f64 / or_count as f64
}

/// One block of fingerprint bits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FingerprintField {
    /// Integer-valued attribute expanded into `bits` unary-threshold bits:
    /// bit `i` is set when the value exceeds `i`. A missing value is 0.
    Count { name: String, bits: usize },
    /// The atom's own type: one bit per listed category plus a final
    /// indicator bit set when the atom's category is not among them.
    OwnCategory { categories: Vec<String> },
}

impl FingerprintField {
    fn width(&self) -> usize {
        match self {
            FingerprintField::Count { bits, .. } => *bits,
            FingerprintField::OwnCategory { categories } => categories.len() + 1,
        }
    }
}

/// Layout of the applicability-domain fingerprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FingerprintSchema {
    pub fields: Vec<FingerprintField>,
}

impl FingerprintSchema {
    pub fn nbits(&self) -> usize {
        self.fields.iter().map(FingerprintField::width).sum()
    }

    pub fn encode(&self, atom: &Atom) -> Fingerprint {
        let mut fp = Fingerprint::new(self.nbits());
        let mut offset = 0;
        for field in &self.fields {
            match field {
                FingerprintField::Count { name, bits } => {
                    let value = atom.numeric_attribute(name).unwrap_or(0.0).max(0.0).round() as usize;
                    for i in 0..value.min(*bits) {
                        fp.set_bit(offset + i);
                    }
                }
                FingerprintField::OwnCategory { categories } => {
                    let own = atom.atom_type.map(|t| t.as_str());
                    let slot = own.and_then(|label| categories.iter().position(|c| c == label));
                    fp.set_bit(offset + slot.unwrap_or(categories.len()));
                }
            }
            offset += field.width();
        }
        fp
    }
}

/// Nearest-neighbor search over reference fingerprints.
pub trait ReferenceIndex: Send + Sync {
    fn schema(&self) -> &FingerprintSchema;

    /// Distances (1 − similarity) to the `k` nearest references, ascending.
    fn k_nearest(&self, query: &Fingerprint, k: usize) -> Result<Vec<f64>, ScoringError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct ReferenceFile {
    schema: FingerprintSchema,
    /// Set bit positions of each reference fingerprint.
    fingerprints: Vec<Vec<usize>>,
}

/// Exhaustive Tanimoto search over the whole reference set.
#[derive(Debug, Clone)]
pub struct BruteForceIndex {
    schema: FingerprintSchema,
    references: Vec<Fingerprint>,
}

impl BruteForceIndex {
    pub fn new(schema: FingerprintSchema, references: Vec<Fingerprint>) -> Result<Self, ScoringError> {
        let expected = schema.nbits();
        if let Some(bad) = references.iter().find(|f| f.nbits() != expected) {
            return Err(ScoringError::FingerprintWidth {
                expected,
                got: bad.nbits(),
            });
        }
        Ok(Self { schema, references })
    }

    /// Reads `{"schema": {...}, "fingerprints": [[set bit positions], ...]}`.
    pub fn from_json(json: &str) -> Result<Self, ScoringError> {
        let file: ReferenceFile =
            serde_json::from_str(json).map_err(|e| ScoringError::InvalidReference(e.to_string()))?;
        let nbits = file.schema.nbits();
        let references = file
            .fingerprints
            .iter()
            .map(|positions| Fingerprint::from_positions(nbits, positions))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(file.schema, references)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ScoringError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ScoringError::io(path, e))?;
        Self::from_json(&json)
    }

    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }
}

impl ReferenceIndex for BruteForceIndex {
    fn schema(&self) -> &FingerprintSchema {
        &self.schema
    }

    fn k_nearest(&self, query: &Fingerprint, k: usize) -> Result<Vec<f64>, ScoringError> {
        if self.references.is_empty() {
            return Err(ScoringError::EmptyIndex);
        }
        let expected = self.schema.nbits();
        if query.nbits() != expected {
            return Err(ScoringError::FingerprintWidth {
                expected,
                got: query.nbits(),
            });
        }
        let mut distances: Vec<f64> = self
            .references
            .par_iter()
            .map(|r| 1.0 - tanimoto_similarity(query, r))
            .collect();
        distances.sort_by(f64::total_cmp);
        distances.truncate(k);
        Ok(distances)
    }
}

/// Confidence from neighbor distances: `1 − mean`, clamped to [0, 1].
pub fn confidence(distances: &[f64]) -> Option<f64> {
    if distances.is_empty() {
        return None;
    }
    let mean = distances.iter().sum::<f64>() / distances.len() as f64;
    Some((1.0 - mean).clamp(0.0, 1.0))
}
