//! Sybyl-style atom typing.
//!
//! The label is both a model input (one-hot `atom_type_<label>` fields) and
//! the neighbor class of the neighborhood aggregator. An atom that cannot be
//! typed, typically an over-valent carbon left behind by a transformation,
//! makes [`assign_atom_types`] fail.

use std::fmt;

use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::atom::{Atom, Hybridization};
use crate::bond::{Bond, BondOrder};
use crate::element::Element;
use crate::mol::Mol;
use crate::valence::{hybridization, is_valence_allowed};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AtomType {
    #[serde(rename = "C.3")]
    C3,
    #[serde(rename = "C.2")]
    C2,
    #[serde(rename = "C.1")]
    C1,
    #[serde(rename = "C.ar")]
    CAr,
    #[serde(rename = "C.cat")]
    CCat,
    #[serde(rename = "N.3")]
    N3,
    #[serde(rename = "N.2")]
    N2,
    #[serde(rename = "N.1")]
    N1,
    #[serde(rename = "N.ar")]
    NAr,
    #[serde(rename = "N.am")]
    NAm,
    #[serde(rename = "N.pl3")]
    NPl3,
    #[serde(rename = "N.4")]
    N4,
    #[serde(rename = "O.3")]
    O3,
    #[serde(rename = "O.2")]
    O2,
    #[serde(rename = "O.co2")]
    OCo2,
    #[serde(rename = "S.3")]
    S3,
    #[serde(rename = "S.2")]
    S2,
    #[serde(rename = "S.O")]
    SO,
    #[serde(rename = "S.O2")]
    SO2,
    #[serde(rename = "P.3")]
    P3,
    F,
    Cl,
    Br,
    I,
    H,
    B,
    Si,
    Se,
}

impl AtomType {
    pub fn as_str(self) -> &'static str {
        match self {
            AtomType::C3 => "C.3",
            AtomType::C2 => "C.2",
            AtomType::C1 => "C.1",
            AtomType::CAr => "C.ar",
            AtomType::CCat => "C.cat",
            AtomType::N3 => "N.3",
            AtomType::N2 => "N.2",
            AtomType::N1 => "N.1",
            AtomType::NAr => "N.ar",
            AtomType::NAm => "N.am",
            AtomType::NPl3 => "N.pl3",
            AtomType::N4 => "N.4",
            AtomType::O3 => "O.3",
            AtomType::O2 => "O.2",
            AtomType::OCo2 => "O.co2",
            AtomType::S3 => "S.3",
            AtomType::S2 => "S.2",
            AtomType::SO => "S.O",
            AtomType::SO2 => "S.O2",
            AtomType::P3 => "P.3",
            AtomType::F => "F",
            AtomType::Cl => "Cl",
            AtomType::Br => "Br",
            AtomType::I => "I",
            AtomType::H => "H",
            AtomType::B => "B",
            AtomType::Si => "Si",
            AtomType::Se => "Se",
        }
    }
}

impl fmt::Display for AtomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no valid atom type for {symbol} atom {}", .atom.index())]
pub struct AtomTypingError {
    pub atom: NodeIndex,
    pub symbol: &'static str,
}

/// Types every atom and stores the label on it. Fails on the first heavy
/// atom that has no type; labels already written stay in place.
pub fn assign_atom_types(mol: &mut Mol<Atom, Bond>) -> Result<(), AtomTypingError> {
    let atoms: Vec<NodeIndex> = mol.atoms().collect();
    for idx in atoms {
        let ty = atom_type(mol, idx);
        mol.atom_mut(idx).atom_type = ty;
        if ty.is_none() {
            return Err(AtomTypingError {
                atom: idx,
                symbol: mol.atom(idx).symbol(),
            });
        }
    }
    Ok(())
}

/// Type of a single atom, or `None` when its bonding fits no valence state.
/// Expects a kekulized molecule with aromaticity perceived.
pub fn atom_type(mol: &Mol<Atom, Bond>, idx: NodeIndex) -> Option<AtomType> {
    let atom = mol.atom(idx);
    let elem = atom.element()?;
    if elem != Element::H && !is_valence_allowed(mol, idx) {
        return None;
    }
    let ty = match elem {
        Element::H => AtomType::H,
        Element::C => carbon_type(mol, idx),
        Element::N => nitrogen_type(mol, idx),
        Element::O => oxygen_type(mol, idx),
        Element::S => sulfur_type(mol, idx),
        Element::P => AtomType::P3,
        Element::F => AtomType::F,
        Element::Cl => AtomType::Cl,
        Element::Br => AtomType::Br,
        Element::I => AtomType::I,
        Element::B => AtomType::B,
        Element::Si => AtomType::Si,
        Element::Se => AtomType::Se,
    };
    Some(ty)
}

fn count_bonds(mol: &Mol<Atom, Bond>, idx: NodeIndex, order: BondOrder) -> usize {
    mol.bonds_of(idx)
        .filter(|&e| mol.bond(e).order == order)
        .count()
}

fn carbon_type(mol: &Mol<Atom, Bond>, idx: NodeIndex) -> AtomType {
    let atom = mol.atom(idx);
    if atom.is_aromatic {
        return AtomType::CAr;
    }
    if atom.formal_charge > 0 || is_guanidinium_carbon(mol, idx) {
        return AtomType::CCat;
    }
    match hybridization(mol, idx) {
        Hybridization::SP => AtomType::C1,
        Hybridization::SP2 => AtomType::C2,
        _ => AtomType::C3,
    }
}

/// Central carbon of a protonated amidine or guanidine: three nitrogens, one
/// of them carrying the positive charge on a double bond.
fn is_guanidinium_carbon(mol: &Mol<Atom, Bond>, idx: NodeIndex) -> bool {
    let nitrogens: Vec<NodeIndex> = mol
        .neighbors(idx)
        .filter(|&nb| mol.atom(nb).atomic_num == 7)
        .collect();
    nitrogens.len() == 3
        && nitrogens.iter().any(|&n| {
            mol.atom(n).formal_charge == 1
                && mol
                    .bond_between(idx, n)
                    .is_some_and(|e| mol.bond(e).order == BondOrder::Double)
        })
}

fn nitrogen_type(mol: &Mol<Atom, Bond>, idx: NodeIndex) -> AtomType {
    let atom = mol.atom(idx);
    if atom.is_aromatic {
        return AtomType::NAr;
    }
    let sigma = mol.degree(idx) + atom.hydrogen_count as usize;
    let doubles = count_bonds(mol, idx, BondOrder::Double);
    if count_bonds(mol, idx, BondOrder::Triple) > 0 || doubles >= 2 {
        return AtomType::N1;
    }
    if atom.formal_charge > 0 && doubles == 0 && sigma == 4 {
        return AtomType::N4;
    }
    if doubles == 1 {
        // Nitro and N-oxide nitrogens are planar with three partners.
        return if sigma == 3 { AtomType::NPl3 } else { AtomType::N2 };
    }
    if is_amide_nitrogen(mol, idx) {
        return AtomType::NAm;
    }
    if mol.neighbors(idx).any(|nb| is_conjugating(mol, nb)) {
        return AtomType::NPl3;
    }
    AtomType::N3
}

/// Single-bonded to a carbonyl or thiocarbonyl carbon.
fn is_amide_nitrogen(mol: &Mol<Atom, Bond>, idx: NodeIndex) -> bool {
    mol.neighbors(idx).any(|c| {
        mol.atom(c).atomic_num == 6
            && mol.bonds_of(c).any(|e| {
                let bond = mol.bond(e);
                bond.order == BondOrder::Double
                    && mol.bond_endpoints(e).is_some_and(|(a, b)| {
                        let other = if a == c { b } else { a };
                        matches!(mol.atom(other).atomic_num, 8 | 16)
                    })
            })
    })
}

fn is_conjugating(mol: &Mol<Atom, Bond>, idx: NodeIndex) -> bool {
    mol.atom(idx).is_aromatic || count_bonds(mol, idx, BondOrder::Double) > 0
}

fn oxygen_type(mol: &Mol<Atom, Bond>, idx: NodeIndex) -> AtomType {
    if is_carboxylate_oxygen(mol, idx) {
        return AtomType::OCo2;
    }
    if count_bonds(mol, idx, BondOrder::Double) > 0 {
        AtomType::O2
    } else {
        AtomType::O3
    }
}

/// Terminal, hydrogen-free oxygen on a carbon or phosphorus that carries at
/// least two such oxygens (carboxylate, phosphate).
fn is_carboxylate_oxygen(mol: &Mol<Atom, Bond>, idx: NodeIndex) -> bool {
    let is_terminal_o = |o: NodeIndex| {
        let atom = mol.atom(o);
        atom.atomic_num == 8 && atom.hydrogen_count == 0 && mol.degree(o) == 1
    };
    if !is_terminal_o(idx) {
        return false;
    }
    let Some(center) = mol.neighbors(idx).next() else {
        return false;
    };
    if !matches!(mol.atom(center).atomic_num, 6 | 15) {
        return false;
    }
    let terminal: Vec<NodeIndex> = mol.neighbors(center).filter(|&o| is_terminal_o(o)).collect();
    terminal.len() >= 2
        && terminal.iter().any(|&o| mol.atom(o).formal_charge < 0)
}

fn sulfur_type(mol: &Mol<Atom, Bond>, idx: NodeIndex) -> AtomType {
    let oxo = mol
        .bonds_of(idx)
        .filter(|&e| {
            mol.bond(e).order == BondOrder::Double
                && mol.bond_endpoints(e).is_some_and(|(a, b)| {
                    let other = if a == idx { b } else { a };
                    mol.atom(other).atomic_num == 8
                })
        })
        .count();
    match oxo {
        0 if count_bonds(mol, idx, BondOrder::Double) > 0 => AtomType::S2,
        0 => AtomType::S3,
        1 => AtomType::SO,
        _ => AtomType::SO2,
    }
}
