//! Neighborhood descriptor aggregation.
//!
//! For every heavy atom the aggregator walks outward breadth-first and
//! records, for each atom first reached at depth `d >= 1`, the value of each
//! requested source attribute. Observations are grouped by
//! `(source, neighbor class, depth)` and combined per origin atom into one
//! composite feature, stored in [`Atom::features`] under the signature's
//! string key. The neighbor class is the neighbor's Sybyl atom type.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use petgraph::graph::NodeIndex;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::atom::Atom;
use crate::atom_type::AtomType;
use crate::bond::Bond;
use crate::graph_ops::bfs_shells;
use crate::mol::Mol;

/// How the observations sharing one signature are folded into a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Combination {
    /// Arithmetic mean of the observed numeric values.
    Mean,
    /// Number of neighbors of the class at that depth.
    Count,
}

/// Source attributes aggregated together up to one depth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptorGroup {
    pub sources: Vec<String>,
    pub max_depth: usize,
    pub combination: Combination,
}

impl DescriptorGroup {
    pub fn new(sources: &[&str], max_depth: usize, combination: Combination) -> Self {
        Self {
            sources: sources.iter().map(|s| s.to_string()).collect(),
            max_depth,
            combination,
        }
    }
}

/// The groups used when no configuration overrides them: every base
/// descriptor averaged over two shells plus atom-type counts over three.
pub fn default_groups() -> Vec<DescriptorGroup> {
    vec![
        DescriptorGroup::new(
            &["charge", "electronegativity", "polarizability", "degree", "hydrogens"],
            2,
            Combination::Mean,
        ),
        DescriptorGroup::new(&["count"], 3, Combination::Count),
    ]
}

/// One neighbor seen from one origin at one depth.
#[derive(Debug, Clone, PartialEq)]
pub struct NeighborObservation<'a> {
    pub origin: NodeIndex,
    pub neighbor: NodeIndex,
    pub depth: usize,
    pub source: &'a str,
    /// `None` when the neighbor has no numeric value for the source.
    pub value: Option<f64>,
}

/// Composite feature identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Signature<'a> {
    pub source: &'a str,
    pub class: &'static str,
    pub depth: usize,
}

impl fmt::Display for Signature<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.source, self.class, self.depth)
    }
}

/// Class a neighbor is grouped under: its atom type, or the bare element
/// symbol for atoms that were never typed.
pub fn neighbor_class(atom: &Atom) -> &'static str {
    atom.atom_type.map_or_else(|| atom.symbol(), AtomType::as_str)
}

/// Observations of `sources` around `origin` out to `max_depth`. Depth 0,
/// the origin itself, is never observed.
pub fn observe<'s>(
    mol: &Mol<Atom, Bond>,
    origin: NodeIndex,
    max_depth: usize,
    sources: &'s [String],
) -> Vec<NeighborObservation<'s>> {
    let shells = bfs_shells(mol, origin, max_depth);
    let mut out = Vec::new();
    for (depth, shell) in shells.iter().enumerate().skip(1) {
        for &neighbor in shell {
            for source in sources {
                out.push(NeighborObservation {
                    origin,
                    neighbor,
                    depth,
                    source,
                    value: mol.atom(neighbor).numeric_attribute(source),
                });
            }
        }
    }
    out
}

#[derive(Default)]
struct Accumulator {
    sum: f64,
    count: usize,
}

/// Computes composite neighborhood features over a set of descriptor groups.
#[derive(Debug, Clone)]
pub struct NeighborhoodAggregator {
    groups: Vec<DescriptorGroup>,
    missing_default: f64,
}

impl NeighborhoodAggregator {
    pub fn new(groups: Vec<DescriptorGroup>) -> Self {
        Self {
            groups,
            missing_default: 0.0,
        }
    }

    /// Value given to a signature an atom did not observe.
    pub fn with_missing_default(mut self, value: f64) -> Self {
        self.missing_default = value;
        self
    }

    pub fn groups(&self) -> &[DescriptorGroup] {
        &self.groups
    }

    /// Composite features of one origin atom, before imputation.
    pub fn features_of(&self, mol: &Mol<Atom, Bond>, origin: NodeIndex) -> BTreeMap<String, f64> {
        let mut acc: BTreeMap<Signature, Accumulator> = BTreeMap::new();
        for group in &self.groups {
            for obs in observe(mol, origin, group.max_depth, &group.sources) {
                let sig = Signature {
                    source: obs.source,
                    class: neighbor_class(mol.atom(obs.neighbor)),
                    depth: obs.depth,
                };
                match group.combination {
                    Combination::Mean => {
                        if let Some(v) = obs.value {
                            let entry = acc.entry(sig).or_default();
                            entry.sum += v;
                            entry.count += 1;
                        }
                    }
                    Combination::Count => {
                        let entry = acc.entry(sig).or_default();
                        entry.sum += 1.0;
                        entry.count = 1;
                    }
                }
            }
        }
        acc.into_iter()
            .map(|(sig, a)| (sig.to_string(), a.sum / a.count as f64))
            .collect()
    }

    /// Annotates every heavy atom with its composite features and imputes
    /// missing signatures so that all heavy atoms share one key set, which is
    /// returned. Origins are processed in parallel; the result does not
    /// depend on scheduling.
    pub fn aggregate(&self, mol: &mut Mol<Atom, Bond>) -> BTreeSet<String> {
        let origins: Vec<NodeIndex> = mol.heavy_atoms().collect();
        let per_atom: Vec<BTreeMap<String, f64>> = {
            let mol = &*mol;
            origins.par_iter().map(|&origin| self.features_of(mol, origin)).collect()
        };

        let signatures: BTreeSet<String> = per_atom.iter().flat_map(|f| f.keys().cloned()).collect();
        for (&origin, mut features) in origins.iter().zip(per_atom) {
            for sig in &signatures {
                features.entry(sig.clone()).or_insert(self.missing_default);
            }
            mol.atom_mut(origin).features = features;
        }
        debug!(atoms = origins.len(), signatures = signatures.len(), "aggregated neighborhood features");
        signatures
    }
}

impl Default for NeighborhoodAggregator {
    fn default() -> Self {
        Self::new(default_groups())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom_type::assign_atom_types;
    use crate::descriptors::assign_descriptors;
    use crate::smiles::from_smiles;

    fn prepared(smiles: &str) -> Mol<Atom, Bond> {
        let mut mol = from_smiles(smiles).unwrap();
        assign_atom_types(&mut mol).unwrap();
        assign_descriptors(&mut mol);
        mol
    }

    fn n(i: usize) -> NodeIndex {
        NodeIndex::new(i)
    }

    #[test]
    fn signature_key_format() {
        let sig = Signature {
            source: "charge",
            class: "C.3",
            depth: 2,
        };
        assert_eq!(sig.to_string(), "charge_C.3_2");
    }

    #[test]
    fn observe_skips_the_origin() {
        let mol = prepared("CCO");
        let sources = vec!["charge".to_string()];
        let obs = observe(&mol, n(0), 2, &sources);
        assert_eq!(obs.len(), 2);
        assert!(obs.iter().all(|o| o.neighbor != n(0)));
        assert_eq!((obs[0].neighbor, obs[0].depth), (n(1), 1));
        assert_eq!((obs[1].neighbor, obs[1].depth), (n(2), 2));
        assert_eq!(obs[1].value, Some(mol.atom(n(2)).descriptors.charge));
        assert!(observe(&mol, n(0), 0, &sources).is_empty());
    }

    #[test]
    fn depth_zero_produces_no_features() {
        let mut mol = prepared("CC(=O)Nc1ccccc1");
        let agg = NeighborhoodAggregator::new(vec![DescriptorGroup::new(&["charge"], 0, Combination::Mean)]);
        assert!(agg.aggregate(&mut mol).is_empty());
        assert!(mol.atoms().all(|i| mol.atom(i).features.is_empty()));
    }

    #[test]
    fn signature_set_grows_with_depth() {
        let mut previous = BTreeSet::new();
        for depth in 0..6 {
            let mut mol = prepared("CC(=O)Nc1ccc(O)cc1");
            let agg = NeighborhoodAggregator::new(vec![DescriptorGroup::new(&["charge"], depth, Combination::Mean)]);
            let sigs = agg.aggregate(&mut mol);
            assert!(previous.is_subset(&sigs), "depth {depth}");
            if depth > 0 {
                assert!(sigs.len() > previous.len(), "depth {depth} inside the diameter adds signatures");
            }
            previous = sigs;
        }
    }

    #[test]
    fn mean_and_count_values() {
        let mut mol = prepared("CC(C)O");
        let agg = NeighborhoodAggregator::new(vec![
            DescriptorGroup::new(&["hydrogens"], 1, Combination::Mean),
            DescriptorGroup::new(&["count"], 2, Combination::Count),
        ]);
        agg.aggregate(&mut mol);
        let central = &mol.atom(n(1)).features;
        assert_eq!(central["hydrogens_C.3_1"], 3.0);
        assert_eq!(central["hydrogens_O.3_1"], 1.0);
        assert_eq!(central["count_C.3_1"], 2.0);
        assert_eq!(central["count_O.3_1"], 1.0);

        let methyl = &mol.atom(n(0)).features;
        assert_eq!(methyl["count_C.3_1"], 1.0);
        assert_eq!(methyl["count_C.3_2"], 1.0);
        assert_eq!(methyl["count_O.3_2"], 1.0);
    }

    #[test]
    fn every_heavy_atom_gets_the_same_keys() {
        let mut mol = prepared("OCc1ccncc1");
        let agg = NeighborhoodAggregator::default().with_missing_default(-1.0);
        let sigs = agg.aggregate(&mut mol);
        for i in mol.heavy_atoms() {
            let keys: BTreeSet<String> = mol.atom(i).features.keys().cloned().collect();
            assert_eq!(keys, sigs);
        }
        // The hydroxyl oxygen has no aromatic nitrogen two bonds away.
        assert_eq!(mol.atom(n(0)).features["count_N.ar_2"], -1.0);
    }

    #[test]
    fn aggregation_is_deterministic() {
        let run = || {
            let mut mol = prepared("CC(C)Cc1ccc(cc1)C(C)C(=O)O");
            NeighborhoodAggregator::default().aggregate(&mut mol);
            mol.atoms().map(|i| mol.atom(i).features.clone()).collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }
}
