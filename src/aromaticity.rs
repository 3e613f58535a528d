use std::collections::BTreeSet;

use petgraph::graph::NodeIndex;

use crate::atom::Atom;
use crate::bond::{Bond, BondOrder};
use crate::mol::Mol;
use crate::rings::RingInfo;

const SP2_CAPABLE: [u8; 7] = [
    5,  // B
    6,  // C
    7,  // N
    8,  // O
    15, // P
    16, // S
    34, // Se
];

/// Clears and re-derives every atom and bond aromaticity flag from the
/// current Kekulé structure.
///
/// A ring is aromatic when every member can contribute π electrons and the
/// total satisfies Hückel's 4n + 2 rule. Fused pairs of rings sharing a bond
/// are tested as one system as well, which catches azulene-like cases where
/// neither ring qualifies alone.
pub fn perceive_aromaticity(mol: &mut Mol<Atom, Bond>) {
    let flags = find_aromatic_systems(mol);
    let atoms: Vec<NodeIndex> = mol.atoms().collect();
    for idx in atoms {
        mol.atom_mut(idx).is_aromatic = flags.atoms[idx.index()];
    }
    let bonds: Vec<_> = mol.bonds().collect();
    for e in bonds {
        let aromatic = mol
            .bond_endpoints(e)
            .is_some_and(|(a, b)| flags.bonds.contains(&key(a, b)));
        mol.bond_mut(e).is_aromatic = aromatic;
    }
}

struct AromaticFlags {
    atoms: Vec<bool>,
    bonds: BTreeSet<(NodeIndex, NodeIndex)>,
}

fn key(a: NodeIndex, b: NodeIndex) -> (NodeIndex, NodeIndex) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

fn ring_bonds(ring: &[NodeIndex]) -> Vec<(NodeIndex, NodeIndex)> {
    (0..ring.len())
        .map(|i| key(ring[i], ring[(i + 1) % ring.len()]))
        .collect()
}

fn find_aromatic_systems(mol: &Mol<Atom, Bond>) -> AromaticFlags {
    let info = RingInfo::sssr(mol);
    let mut flags = AromaticFlags {
        atoms: vec![false; mol.atom_count()],
        bonds: BTreeSet::new(),
    };
    let rings = info.rings();
    let mut aromatic_ring = vec![false; rings.len()];

    for (i, ring) in rings.iter().enumerate() {
        if is_aromatic_system(mol, &info, ring) {
            aromatic_ring[i] = true;
            mark(&mut flags, ring, &ring_bonds(ring));
        }
    }

    for i in 0..rings.len() {
        for j in (i + 1)..rings.len() {
            if aromatic_ring[i] && aromatic_ring[j] {
                continue;
            }
            let bonds_i = ring_bonds(&rings[i]);
            let bonds_j = ring_bonds(&rings[j]);
            let shared = bonds_i.iter().filter(|b| bonds_j.contains(b)).count();
            if shared != 1 {
                continue;
            }
            let atoms: BTreeSet<NodeIndex> = rings[i].iter().chain(&rings[j]).copied().collect();
            let atoms: Vec<NodeIndex> = atoms.into_iter().collect();
            if is_aromatic_system(mol, &info, &atoms) {
                let mut bonds = bonds_i;
                bonds.extend(bonds_j);
                mark(&mut flags, &atoms, &bonds);
            }
        }
    }
    flags
}

fn mark(flags: &mut AromaticFlags, atoms: &[NodeIndex], bonds: &[(NodeIndex, NodeIndex)]) {
    for a in atoms {
        flags.atoms[a.index()] = true;
    }
    flags.bonds.extend(bonds.iter().copied());
}

fn is_aromatic_system(mol: &Mol<Atom, Bond>, info: &RingInfo, atoms: &[NodeIndex]) -> bool {
    if atoms.len() < 3 {
        return false;
    }
    let mut total = 0u32;
    for &idx in atoms {
        if !SP2_CAPABLE.contains(&mol.atom(idx).atomic_num) {
            return false;
        }
        match pi_electrons(mol, info, idx) {
            Some(e) => total += e,
            None => return false,
        }
    }
    total >= 2 && (total - 2) % 4 == 0
}

/// π electrons an atom donates to a ring system, or `None` when it breaks
/// conjugation.
fn pi_electrons(mol: &Mol<Atom, Bond>, info: &RingInfo, idx: NodeIndex) -> Option<u32> {
    let atom = mol.atom(idx);
    let mut ring_double = false;
    let mut exo_double: Option<u8> = None;
    for e in mol.bonds_of(idx) {
        let Some((a, b)) = mol.bond_endpoints(e) else {
            continue;
        };
        let other = if a == idx { b } else { a };
        match mol.bond(e).order {
            BondOrder::Triple => return None,
            BondOrder::Double if info.is_ring_bond(idx, other) => ring_double = true,
            BondOrder::Double => exo_double = Some(mol.atom(other).atomic_num),
            BondOrder::Single | BondOrder::Aromatic => {}
        }
    }
    if ring_double {
        return Some(1);
    }
    if let Some(partner) = exo_double {
        // C=O, C=N and C=S pull their electron out of the ring.
        return matches!(partner, 7 | 8 | 16).then_some(0);
    }

    let sigma = mol.degree(idx) as u8 + atom.hydrogen_count;
    match (atom.atomic_num, atom.formal_charge) {
        (6, -1) => Some(2),
        (6, 1) | (5, 0) => Some(0),
        (7, 0) | (15, 0) if sigma <= 3 => Some(2),
        (8, 0) | (16, 0) | (34, 0) if sigma == 2 => Some(2),
        _ => None,
    }
}
