//! Kekulization replaces unresolved aromatic bond orders with alternating
//! single and double bonds.
//!
//! Bonds with [`BondOrder::Aromatic`] come from lowercase SMILES atoms or from
//! product templates that write aromatic bonds. Every atom touching such a
//! bond that still has a free valence needs exactly one double bond; finding
//! that assignment is a maximum matching on the aromatic subgraph, solved
//! here with augmenting paths.

use petgraph::graph::{EdgeIndex, NodeIndex};
use thiserror::Error;

use crate::atom::Atom;
use crate::bond::{Bond, BondOrder};
use crate::mol::Mol;
use crate::valence::bond_order_sum;

/// No Kekulé structure exists for the aromatic system.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KekulizeError {
    /// These atoms could not be given a double bond.
    #[error("cannot kekulize aromatic system: unmatched atoms {}", format_atoms(.0))]
    Unkekulizable(Vec<NodeIndex>),
}

fn format_atoms(atoms: &[NodeIndex]) -> String {
    let parts: Vec<String> = atoms.iter().map(|a| a.index().to_string()).collect();
    format!("[{}]", parts.join(", "))
}

/// Resolves every [`BondOrder::Aromatic`] bond in place. Bonds that are
/// already concrete are left untouched, so the call is idempotent.
pub fn kekulize(mol: &mut Mol<Atom, Bond>) -> Result<(), KekulizeError> {
    let n = mol.atom_count();
    let aromatic_edges: Vec<EdgeIndex> = mol
        .bonds()
        .filter(|&e| mol.bond(e).order == BondOrder::Aromatic)
        .collect();
    if aromatic_edges.is_empty() {
        return Ok(());
    }

    let mut adjacency: Vec<Vec<(NodeIndex, EdgeIndex)>> = vec![Vec::new(); n];
    for &e in &aromatic_edges {
        if let Some((a, b)) = mol.bond_endpoints(e) {
            adjacency[a.index()].push((b, e));
            adjacency[b.index()].push((a, e));
        }
    }

    let needs_double: Vec<bool> = (0..n)
        .map(|i| !adjacency[i].is_empty() && needs_double_bond(mol, NodeIndex::new(i)))
        .collect();

    let mut matched: Vec<Option<EdgeIndex>> = vec![None; n];

    // Greedy pass first; augmenting paths fix what it gets wrong.
    for i in 0..n {
        if !needs_double[i] || matched[i].is_some() {
            continue;
        }
        let free = adjacency[i]
            .iter()
            .find(|(w, _)| needs_double[w.index()] && matched[w.index()].is_none())
            .copied();
        if let Some((w, e)) = free {
            matched[i] = Some(e);
            matched[w.index()] = Some(e);
        }
    }

    for i in 0..n {
        if needs_double[i] && matched[i].is_none() {
            let mut visited = vec![false; n];
            augment(mol, &adjacency, &needs_double, &mut matched, NodeIndex::new(i), &mut visited);
        }
    }

    let unmatched: Vec<NodeIndex> = (0..n)
        .filter(|&i| needs_double[i] && matched[i].is_none())
        .map(NodeIndex::new)
        .collect();
    if !unmatched.is_empty() {
        return Err(KekulizeError::Unkekulizable(unmatched));
    }

    for e in aromatic_edges {
        let is_double = mol
            .bond_endpoints(e)
            .is_some_and(|(a, _)| matched[a.index()] == Some(e));
        mol.bond_mut(e).order = if is_double {
            BondOrder::Double
        } else {
            BondOrder::Single
        };
    }
    Ok(())
}

/// An aromatic atom needs a double bond when its lowest fitting valence
/// state leaves exactly one electron unused after its sigma bonds, its
/// hydrogens and any exocyclic double bonds.
fn needs_double_bond(mol: &Mol<Atom, Bond>, idx: NodeIndex) -> bool {
    let atom = mol.atom(idx);
    let Some(elem) = atom.element() else {
        return false;
    };
    let used = bond_order_sum(mol, idx) + atom.hydrogen_count;
    let charge = atom.formal_charge as i16;
    let shrink = matches!(elem.atomic_num(), 5 | 6 | 14);
    let target = elem.default_valences().iter().find_map(|&v| {
        let adjusted = if shrink { v as i16 - charge.abs() } else { v as i16 + charge };
        (adjusted >= used as i16).then_some(adjusted)
    });
    match target {
        Some(t) => t - used as i16 == 1,
        None => false,
    }
}

/// Depth-first search for an alternating path from the unmatched atom
/// `start`; flips the path when one is found.
fn augment(
    mol: &Mol<Atom, Bond>,
    adjacency: &[Vec<(NodeIndex, EdgeIndex)>],
    needs_double: &[bool],
    matched: &mut [Option<EdgeIndex>],
    start: NodeIndex,
    visited: &mut [bool],
) -> bool {
    visited[start.index()] = true;
    for &(w, e) in &adjacency[start.index()] {
        if !needs_double[w.index()] || visited[w.index()] {
            continue;
        }
        visited[w.index()] = true;
        match matched[w.index()] {
            None => {
                matched[start.index()] = Some(e);
                matched[w.index()] = Some(e);
                return true;
            }
            Some(we) => {
                let Some((a, b)) = mol.bond_endpoints(we) else {
                    continue;
                };
                let partner = if a == w { b } else { a };
                if visited[partner.index()] {
                    continue;
                }
                matched[partner.index()] = None;
                matched[w.index()] = None;
                if augment(mol, adjacency, needs_double, matched, partner, visited) {
                    matched[start.index()] = Some(e);
                    matched[w.index()] = Some(e);
                    return true;
                }
                matched[partner.index()] = Some(we);
                matched[w.index()] = Some(we);
            }
        }
    }
    false
}
