use petgraph::graph::NodeIndex;

use crate::atom::{Atom, Hybridization};
use crate::bond::{Bond, BondOrder};
use crate::element::Element;
use crate::mol::Mol;

/// Sum of bond orders over the explicit bonds of `idx`. Unresolved aromatic
/// bonds count as 1.
pub fn bond_order_sum(mol: &Mol<Atom, Bond>, idx: NodeIndex) -> u8 {
    mol.bonds_of(idx)
        .map(|e| mol.bond(e).order.valence_contribution())
        .sum()
}

/// Bond-order sum plus implicit hydrogens.
pub fn total_valence(mol: &Mol<Atom, Bond>, idx: NodeIndex) -> u8 {
    bond_order_sum(mol, idx) + mol.atom(idx).hydrogen_count
}

fn has_unresolved_aromatic_bond(mol: &Mol<Atom, Bond>, idx: NodeIndex) -> bool {
    mol.bonds_of(idx)
        .any(|e| mol.bond(e).order == BondOrder::Aromatic)
}

/// Valence states of `elem` shifted by formal charge. Group 13/14 elements
/// lose a bond for either sign of charge; everything else follows the
/// isoelectronic neighbor (N+ behaves like C, O- like F).
fn charged_valences(elem: Element, charge: i8) -> impl Iterator<Item = u8> {
    let shrink = matches!(elem, Element::B | Element::C | Element::Si);
    elem.default_valences().iter().filter_map(move |&v| {
        let adjusted = if shrink {
            v as i16 - (charge as i16).abs()
        } else {
            v as i16 + charge as i16
        };
        (adjusted >= 0).then_some(adjusted as u8)
    })
}

/// Implicit hydrogen count for an atom with the given explicit bonding.
///
/// Returns `None` when no valence state of the element can hold the bonds
/// already present, which is the over-valent case.
pub fn implicit_hydrogens(elem: Element, bond_sum: u8, charge: i8, aromatic_unresolved: bool) -> Option<u8> {
    let target = charged_valences(elem, charge).find(|&v| v >= bond_sum)?;
    let mut h = target - bond_sum;
    if aromatic_unresolved && h > 0 {
        h -= 1;
    }
    Some(h)
}

/// Recomputes implicit hydrogens for the given atoms from their current
/// bonds. Over-valent atoms end up with zero hydrogens; atom typing reports
/// them later.
pub fn assign_implicit_hydrogens(mol: &mut Mol<Atom, Bond>, atoms: &[NodeIndex]) {
    for &idx in atoms {
        let atom = mol.atom(idx);
        let Some(elem) = atom.element() else {
            mol.atom_mut(idx).hydrogen_count = 0;
            continue;
        };
        if elem == Element::H {
            mol.atom_mut(idx).hydrogen_count = 0;
            continue;
        }
        let aromatic_unresolved = atom.is_aromatic && has_unresolved_aromatic_bond(mol, idx);
        let h = implicit_hydrogens(
            elem,
            bond_order_sum(mol, idx),
            atom.formal_charge,
            aromatic_unresolved,
        )
        .unwrap_or(0);
        mol.atom_mut(idx).hydrogen_count = h;
    }
}

/// True when the atom's bonding fits one of its allowed valence states.
pub fn is_valence_allowed(mol: &Mol<Atom, Bond>, idx: NodeIndex) -> bool {
    let atom = mol.atom(idx);
    let Some(elem) = atom.element() else {
        return false;
    };
    let v = total_valence(mol, idx);
    charged_valences(elem, atom.formal_charge).any(|allowed| allowed == v)
}

/// Hybridization from steric number: sigma bonds plus implied unsaturation.
/// Aromatic atoms are always sp2.
pub fn hybridization(mol: &Mol<Atom, Bond>, idx: NodeIndex) -> Hybridization {
    let atom = mol.atom(idx);
    if atom.is_aromatic {
        return Hybridization::SP2;
    }
    let sigma = mol.degree(idx) as u8 + atom.hydrogen_count;
    let mut doubles = 0u8;
    let mut triples = 0u8;
    for e in mol.bonds_of(idx) {
        match mol.bond(e).order {
            BondOrder::Double => doubles += 1,
            BondOrder::Triple => triples += 1,
            BondOrder::Single | BondOrder::Aromatic => {}
        }
    }
    if triples > 0 || doubles >= 2 {
        return if sigma <= 2 { Hybridization::SP } else { Hybridization::SP2 };
    }
    if doubles == 1 {
        return Hybridization::SP2;
    }
    match sigma {
        0 | 1 => Hybridization::S,
        2..=4 => Hybridization::SP3,
        5 => Hybridization::SP3D,
        _ => Hybridization::SP3D2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smiles::from_smiles;

    #[test]
    fn hydrogens_follow_default_valence() {
        assert_eq!(implicit_hydrogens(Element::C, 1, 0, false), Some(3));
        assert_eq!(implicit_hydrogens(Element::N, 2, 0, false), Some(1));
        assert_eq!(implicit_hydrogens(Element::S, 3, 0, false), Some(1));
        assert_eq!(implicit_hydrogens(Element::O, 1, -1, false), Some(0));
        assert_eq!(implicit_hydrogens(Element::N, 1, 1, false), Some(3));
        assert_eq!(implicit_hydrogens(Element::C, 2, 1, false), Some(1));
        assert_eq!(implicit_hydrogens(Element::C, 2, 0, true), Some(1));
    }

    #[test]
    fn over_valent_carbon_has_no_state() {
        assert_eq!(implicit_hydrogens(Element::C, 5, 0, false), None);
    }

    #[test]
    fn hybridization_states() {
        let mol = from_smiles("C=CC#N").unwrap();
        assert_eq!(hybridization(&mol, NodeIndex::new(0)), Hybridization::SP2);
        assert_eq!(hybridization(&mol, NodeIndex::new(2)), Hybridization::SP);
        let ethane = from_smiles("CC").unwrap();
        assert_eq!(hybridization(&ethane, NodeIndex::new(0)), Hybridization::SP3);
        let allene = from_smiles("C=C=C").unwrap();
        assert_eq!(hybridization(&allene, NodeIndex::new(1)), Hybridization::SP);
        let benzene = from_smiles("c1ccccc1").unwrap();
        assert_eq!(hybridization(&benzene, NodeIndex::new(0)), Hybridization::SP2);
    }

    #[test]
    fn valence_check() {
        let mol = from_smiles("CS(=O)(=O)C").unwrap();
        assert!(mol.atoms().all(|i| is_valence_allowed(&mol, i)));
    }
}
