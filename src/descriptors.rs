//! Base per-atom descriptors.
//!
//! These are the upstream annotations the neighborhood aggregator and the
//! scorer read: topology counts, hybridization, Gasteiger–Marsili partial
//! charges with the matching sigma electronegativity, a distance-attenuated
//! polarizability, and two topological-distance terms.

use petgraph::graph::NodeIndex;

use crate::atom::{Atom, AtomDescriptors, Hybridization};
use crate::bond::Bond;
use crate::element::Element;
use crate::graph_ops::distance_matrix;
use crate::mol::Mol;
use crate::valence::{bond_order_sum, hybridization, total_valence};

const GASTEIGER_ITERATIONS: i32 = 6;

/// Coefficients of the orbital electronegativity polynomial
/// χ = a + b·q + c·q².
#[derive(Debug, Clone, Copy)]
struct ElectroParams {
    a: f64,
    b: f64,
    c: f64,
}

impl ElectroParams {
    fn chi(self, q: f64) -> f64 {
        self.a + self.b * q + self.c * q * q
    }

    /// Electronegativity of the cation, the normalizer for charge flowing
    /// away from this atom.
    fn cation_chi(self) -> f64 {
        self.a + self.b + self.c
    }
}

/// Gasteiger & Marsili (1980) parameters by element and hybridization.
fn electro_params(elem: Element, hyb: Hybridization) -> ElectroParams {
    let (a, b, c) = match (elem, hyb) {
        (Element::H, _) => (7.17, 6.24, -0.56),
        (Element::C, Hybridization::SP) => (10.39, 9.45, 0.73),
        (Element::C, Hybridization::SP2) => (8.79, 9.32, 1.51),
        (Element::C, _) => (7.98, 9.18, 1.88),
        (Element::N, Hybridization::SP) => (15.68, 11.70, -0.27),
        (Element::N, Hybridization::SP2) => (12.87, 11.15, 0.85),
        (Element::N, _) => (11.54, 10.82, 1.36),
        (Element::O, Hybridization::SP2) => (17.07, 13.79, 0.47),
        (Element::O, _) => (14.18, 12.92, 1.39),
        (Element::F, _) => (14.66, 13.85, 2.31),
        (Element::Cl, _) => (11.00, 9.69, 1.35),
        (Element::Br, _) => (10.08, 8.47, 1.16),
        (Element::I, _) => (9.90, 7.96, 0.96),
        (Element::S, Hybridization::SP2) => (10.88, 9.49, 1.33),
        (Element::S, _) => (10.14, 9.13, 1.38),
        (Element::P, _) => (8.90, 8.24, 0.96),
        (Element::Si, _) => (7.30, 6.56, 0.66),
        (Element::B, _) => (5.98, 6.82, 1.61),
        (Element::Se, _) => (10.00, 8.80, 1.20),
    };
    ElectroParams { a, b, c }
}

/// Partial charge and equilibrated sigma electronegativity of one atom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartialCharge {
    pub charge: f64,
    pub electronegativity: f64,
}

/// Gasteiger–Marsili partial equalization of orbital electronegativity.
///
/// Implicit hydrogens take part as virtual neighbors so that C–H polarity
/// is accounted for; all hydrogens on one atom share one charge. Formal
/// charges seed the iteration.
pub fn gasteiger_charges(mol: &Mol<Atom, Bond>) -> Vec<PartialCharge> {
    let n = mol.atom_count();
    let h_params = electro_params(Element::H, Hybridization::S);
    let params: Vec<ElectroParams> = mol
        .atoms()
        .map(|i| {
            let elem = mol.atom(i).element().unwrap_or(Element::C);
            electro_params(elem, hybridization(mol, i))
        })
        .collect();
    let h_counts: Vec<f64> = mol.atoms().map(|i| mol.atom(i).hydrogen_count as f64).collect();

    let mut charges: Vec<f64> = mol.atoms().map(|i| mol.atom(i).formal_charge as f64).collect();
    let mut h_charges = vec![0.0f64; n];

    // Charge moves from the less to the more electronegative partner,
    // normalized by the donor's cation electronegativity.
    let transfer = |pi: ElectroParams, qi: f64, pj: ElectroParams, qj: f64| -> f64 {
        let (chi_i, chi_j) = (pi.chi(qi), pj.chi(qj));
        let donor = if chi_j > chi_i { pi } else { pj };
        let scale = donor.cation_chi();
        if scale.abs() < 1e-12 {
            0.0
        } else {
            (chi_j - chi_i) / scale
        }
    };

    for iteration in 0..GASTEIGER_ITERATIONS {
        let damping = 0.5f64.powi(iteration + 1);
        let mut delta = vec![0.0f64; n];
        let mut h_delta = vec![0.0f64; n];

        for e in mol.bonds() {
            let Some((a, b)) = mol.bond_endpoints(e) else {
                continue;
            };
            let (i, j) = (a.index(), b.index());
            let dq = damping * transfer(params[i], charges[i], params[j], charges[j]);
            delta[i] += dq;
            delta[j] -= dq;
        }
        for i in 0..n {
            if h_counts[i] == 0.0 {
                continue;
            }
            let dq = damping * transfer(h_params, h_charges[i], params[i], charges[i]);
            h_delta[i] += dq;
            delta[i] -= dq * h_counts[i];
        }

        for i in 0..n {
            charges[i] += delta[i];
            h_charges[i] += h_delta[i];
        }
    }

    (0..n)
        .map(|i| PartialCharge {
            charge: charges[i],
            electronegativity: params[i].chi(charges[i]),
        })
        .collect()
}

/// Polarizability of every atom in the component, each term halved per bond
/// of separation. Implicit hydrogens sit one bond beyond their carrier.
fn effective_polarizability(mol: &Mol<Atom, Bond>, dist: &[Vec<usize>], idx: NodeIndex) -> f64 {
    let alpha_h = Element::H.polarizability();
    mol.atoms()
        .filter(|j| dist[idx.index()][j.index()] != usize::MAX)
        .map(|j| {
            let atom = mol.atom(j);
            let d = dist[idx.index()][j.index()] as i32;
            let alpha = atom.element().map_or(0.0, Element::polarizability);
            alpha * 0.5f64.powi(d) + atom.hydrogen_count as f64 * alpha_h * 0.5f64.powi(d + 1)
        })
        .sum()
}

/// Computes [`AtomDescriptors`] for every atom and stores them on the atoms.
/// Expects implicit hydrogens assigned and aromaticity perceived.
pub fn assign_descriptors(mol: &mut Mol<Atom, Bond>) {
    let dist = distance_matrix(mol);
    let charges = gasteiger_charges(mol);
    let eccentricity: Vec<u32> = dist
        .iter()
        .map(|row| row.iter().filter(|&&d| d != usize::MAX).max().copied().unwrap_or(0) as u32)
        .collect();
    let diameter = eccentricity.iter().copied().max().unwrap_or(0);

    let descriptors: Vec<AtomDescriptors> = mol
        .atoms()
        .map(|i| AtomDescriptors {
            degree: mol.heavy_degree(i) as u8,
            hybridization: hybridization(mol, i),
            polarizability: effective_polarizability(mol, &dist, i),
            charge: charges[i.index()].charge,
            electronegativity: charges[i.index()].electronegativity,
            valence: total_valence(mol, i),
            bond_order_sum: bond_order_sum(mol, i),
            hydrogens: mol.total_h_count(i),
            max_top_dist: eccentricity[i.index()],
            longest_max_top_dist: diameter,
        })
        .collect();

    for (i, d) in descriptors.into_iter().enumerate() {
        mol.atom_mut(NodeIndex::new(i)).descriptors = d;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smiles::from_smiles;

    fn n(i: usize) -> NodeIndex {
        NodeIndex::new(i)
    }

    #[test]
    fn neutral_molecules_keep_small_heavy_atom_charge() {
        for smiles in ["CCO", "CC(=O)O", "c1ccccc1N", "CS(=O)(=O)C"] {
            let mol = from_smiles(smiles).unwrap();
            let charges = gasteiger_charges(&mol);
            let heavy: f64 = charges.iter().map(|c| c.charge).sum();
            assert!(heavy.abs() < 1.0, "{smiles}: {heavy}");
        }
    }

    #[test]
    fn heteroatoms_pull_charge() {
        let mol = from_smiles("CCO").unwrap();
        let charges = gasteiger_charges(&mol);
        assert!(charges[2].charge < 0.0);
        assert!(charges[1].charge > charges[0].charge, "carbinol carbon is more positive");

        let mol = from_smiles("CC(=O)O").unwrap();
        let charges = gasteiger_charges(&mol);
        assert!(charges[2].charge < 0.0);
        assert!(charges[3].charge < 0.0);
        assert!(charges[1].charge > 0.0);
    }

    #[test]
    fn formal_charges_seed_the_result() {
        let mol = from_smiles("CC(=O)[O-]").unwrap();
        let charges = gasteiger_charges(&mol);
        assert!(charges[3].charge < -0.5);
        let total: f64 = charges.iter().map(|c| c.charge).sum();
        assert!(total < -0.5);
    }

    #[test]
    fn electronegativity_tracks_element() {
        let mol = from_smiles("CF").unwrap();
        let charges = gasteiger_charges(&mol);
        assert!(charges[1].electronegativity > charges[0].electronegativity);
    }

    #[test]
    fn distance_terms() {
        let mut mol = from_smiles("CCCO").unwrap();
        assign_descriptors(&mut mol);
        let d = |i: usize| mol.atom(n(i)).descriptors.clone();
        assert_eq!(d(0).max_top_dist, 3);
        assert_eq!(d(1).max_top_dist, 2);
        assert!((0..4).all(|i| d(i).longest_max_top_dist == 3));
    }

    #[test]
    fn valence_terms() {
        let mut mol = from_smiles("CC=O").unwrap();
        assign_descriptors(&mut mol);
        let carbonyl = &mol.atom(n(1)).descriptors;
        assert_eq!(carbonyl.degree, 2);
        assert_eq!(carbonyl.bond_order_sum, 3);
        assert_eq!(carbonyl.hydrogens, 1);
        assert_eq!(carbonyl.valence, 4);
        assert_eq!(carbonyl.hybridization, Hybridization::SP2);
        assert_eq!(mol.atom(n(0)).descriptors.hybridization, Hybridization::SP3);
    }

    #[test]
    fn polarizability_grows_with_size() {
        let mut small = from_smiles("CO").unwrap();
        let mut large = from_smiles("CCCCCO").unwrap();
        assign_descriptors(&mut small);
        assign_descriptors(&mut large);
        let last = large.atom_count() - 1;
        assert!(large.atom(n(last)).descriptors.polarizability > small.atom(n(1)).descriptors.polarizability);
    }
}
