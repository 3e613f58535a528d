use std::collections::BTreeMap;

use serde::Serialize;

use crate::atom_type::AtomType;
use crate::element::Element;

/// Hybridization state derived from bond orders and neighbor count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Hybridization {
    #[default]
    S,
    SP,
    SP2,
    SP3,
    SP3D,
    SP3D2,
}

impl Hybridization {
    /// Ordinal used when the state has to enter a numeric feature vector.
    pub fn ordinal(self) -> u8 {
        match self {
            Hybridization::S => 0,
            Hybridization::SP => 1,
            Hybridization::SP2 => 2,
            Hybridization::SP3 => 3,
            Hybridization::SP3D => 4,
            Hybridization::SP3D2 => 5,
        }
    }
}

/// Base per-atom chemical descriptors.
///
/// These are the upstream annotations the neighborhood aggregator and the
/// scorer consume. Each field has a stable attribute name, listed in
/// [`AtomDescriptors::NAMES`], which is also the model's input field name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AtomDescriptors {
    /// Number of heavy-atom neighbors.
    pub degree: u8,
    pub hybridization: Hybridization,
    /// Distance-attenuated sum of atomic polarizabilities (Å³).
    pub polarizability: f64,
    /// Gasteiger–Marsili partial charge.
    pub charge: f64,
    /// Orbital (sigma) electronegativity at the equilibrated charge.
    pub electronegativity: f64,
    /// Bond-order sum plus implicit hydrogens.
    pub valence: u8,
    pub bond_order_sum: u8,
    pub hydrogens: u8,
    /// Largest topological distance from this atom to any other atom.
    pub max_top_dist: u32,
    /// Largest topological distance in the whole molecule.
    pub longest_max_top_dist: u32,
}

impl AtomDescriptors {
    pub const NAMES: [&'static str; 10] = [
        "degree",
        "hybridization",
        "polarizability",
        "charge",
        "electronegativity",
        "valence",
        "bond_order_sum",
        "hydrogens",
        "max_top_dist",
        "longest_max_top_dist",
    ];

    pub fn get(&self, name: &str) -> Option<f64> {
        let value = match name {
            "degree" => self.degree as f64,
            "hybridization" => self.hybridization.ordinal() as f64,
            "polarizability" => self.polarizability,
            "charge" => self.charge,
            "electronegativity" => self.electronegativity,
            "valence" => self.valence as f64,
            "bond_order_sum" => self.bond_order_sum as f64,
            "hydrogens" => self.hydrogens as f64,
            "max_top_dist" => self.max_top_dist as f64,
            "longest_max_top_dist" => self.longest_max_top_dist as f64,
            _ => return None,
        };
        Some(value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        Self::NAMES
            .iter()
            .filter_map(move |&name| self.get(name).map(|v| (name, v)))
    }
}

/// Site-of-metabolism prediction attached to an atom by the scorer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SomPrediction {
    /// Probability of the "is site" class.
    pub probability: f64,
    /// Applicability-domain confidence; `None` when no reference set is loaded
    /// or the neighbor search failed.
    pub ad_score: Option<f64>,
    /// `probability >= decision threshold`.
    pub is_site: bool,
}

/// Atom of a molecular graph.
///
/// The structural fields (`atomic_num` through `is_aromatic`) are what a
/// structural formula shows. The remaining fields are annotations filled in
/// by the pipeline passes; a freshly parsed atom carries none of them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Atom {
    /// Atomic number (1 = H, 6 = C, 7 = N, …).
    pub atomic_num: u8,
    /// Formal charge in elementary charge units.
    pub formal_charge: i8,
    /// Number of implicit (suppressed) hydrogens.
    pub hydrogen_count: u8,
    /// Set by aromaticity perception.
    pub is_aromatic: bool,
    /// Sybyl-style atom type, set by [`crate::atom_type::assign_atom_types`].
    pub atom_type: Option<AtomType>,
    pub descriptors: AtomDescriptors,
    /// Composite neighborhood features keyed by signature string.
    pub features: BTreeMap<String, f64>,
    /// Topological equivalence class from the symmetry classifier.
    pub equivalence_class: Option<u32>,
    pub som: Option<SomPrediction>,
}

impl Atom {
    pub fn new(atomic_num: u8) -> Self {
        Self {
            atomic_num,
            ..Self::default()
        }
    }

    pub fn element(&self) -> Option<Element> {
        Element::from_atomic_num(self.atomic_num)
    }

    pub fn is_hydrogen(&self) -> bool {
        self.atomic_num == 1
    }

    pub fn symbol(&self) -> &'static str {
        self.element().map_or("*", Element::symbol)
    }

    /// Numeric value of a named attribute: base descriptors first, then
    /// composite features, then the structural fields.
    pub fn numeric_attribute(&self, name: &str) -> Option<f64> {
        if let Some(v) = self.descriptors.get(name) {
            return Some(v);
        }
        if let Some(&v) = self.features.get(name) {
            return Some(v);
        }
        match name {
            "atomic_num" => Some(self.atomic_num as f64),
            "formal_charge" => Some(self.formal_charge as f64),
            "aromatic" => Some(if self.is_aromatic { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Clears everything the pipeline attached, keeping the structure.
    pub fn clear_annotations(&mut self) {
        self.atom_type = None;
        self.descriptors = AtomDescriptors::default();
        self.features.clear();
        self.equivalence_class = None;
        self.som = None;
    }

    /// SoM probability, or 0 for atoms the scorer has not seen.
    pub fn som_probability(&self) -> f64 {
        self.som.map_or(0.0, |s| s.probability)
    }
}
