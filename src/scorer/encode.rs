use crate::atom::{Atom, AtomDescriptors};

use super::model::FeatureVector;

/// Prefix of the one-hot atom type fields, e.g. `atom_type_C.ar`.
pub const ATOM_TYPE_PREFIX: &str = "atom_type_";

/// Builds the model's input vector for one atom.
///
/// Base descriptors appear under their attribute names, the atom's type as
/// a single `atom_type_<label> = 1` field (other categories are absent and
/// so read as 0), and every composite neighborhood feature under its
/// signature key.
#[derive(Debug, Clone)]
pub struct FeatureEncoder {
    base: Vec<&'static str>,
}

impl FeatureEncoder {
    pub fn new() -> Self {
        Self {
            base: AtomDescriptors::NAMES.to_vec(),
        }
    }

    /// Restricts the base descriptors to `names`. Unknown names are ignored.
    pub fn with_base_descriptors(names: &[&str]) -> Self {
        Self {
            base: AtomDescriptors::NAMES
                .iter()
                .copied()
                .filter(|n| names.contains(n))
                .collect(),
        }
    }

    pub fn encode(&self, atom: &Atom) -> FeatureVector {
        let mut out = FeatureVector::new();
        for &name in &self.base {
            if let Some(v) = atom.descriptors.get(name) {
                out.insert(name.to_string(), v);
            }
        }
        if let Some(ty) = atom.atom_type {
            out.insert(format!("{ATOM_TYPE_PREFIX}{ty}"), 1.0);
        }
        out.extend(atom.features.iter().map(|(k, &v)| (k.clone(), v)));
        out
    }
}

impl Default for FeatureEncoder {
    fn default() -> Self {
        Self::new()
    }
}
