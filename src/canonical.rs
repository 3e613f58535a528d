//! Canonical atom ranking.
//!
//! Ranks start from hashed per-atom invariants and are refined Morgan-style
//! with neighbor ranks until the partition stops splitting. Atoms still tied
//! at that point are topologically equivalent, which is what the symmetry
//! classes expose. For canonical SMILES the remaining ties are broken by
//! promoting one candidate at a time and keeping the promotion whose
//! invariant trace is smallest, so the result does not depend on input atom
//! order.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use petgraph::graph::NodeIndex;

use crate::atom::Atom;
use crate::bond::{Bond, BondOrder};
use crate::mol::Mol;
use crate::smiles::write_smiles;

struct Fnv1aHasher(u64);

impl Fnv1aHasher {
    fn new() -> Self {
        Self(0xcbf29ce484222325)
    }
}

impl Hasher for Fnv1aHasher {
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(0x100000001b3);
        }
    }
}

#[derive(Clone, PartialEq, Eq, Hash)]
struct AtomInvariant {
    atomic_num: u8,
    degree: u8,
    hydrogen_count: u8,
    formal_charge: i8,
    is_aromatic: bool,
    singles: u8,
    doubles: u8,
    triples: u8,
    aromatic_bonds: u8,
}

fn atom_invariant(mol: &Mol<Atom, Bond>, idx: NodeIndex) -> AtomInvariant {
    let atom = mol.atom(idx);
    let mut inv = AtomInvariant {
        atomic_num: atom.atomic_num,
        degree: mol.degree(idx) as u8,
        hydrogen_count: atom.hydrogen_count,
        formal_charge: atom.formal_charge,
        is_aromatic: atom.is_aromatic,
        singles: 0,
        doubles: 0,
        triples: 0,
        aromatic_bonds: 0,
    };
    // Aromatic bonds are counted as such so that every Kekulé form of a
    // ring gets the same invariants.
    for e in mol.bonds_of(idx) {
        let bond = mol.bond(e);
        if bond.is_aromatic {
            inv.aromatic_bonds += 1;
            continue;
        }
        match bond.order {
            BondOrder::Single => inv.singles += 1,
            BondOrder::Double => inv.doubles += 1,
            BondOrder::Triple => inv.triples += 1,
            BondOrder::Aromatic => inv.aromatic_bonds += 1,
        }
    }
    inv
}

fn hash_of<T: Hash>(value: &T) -> u64 {
    let mut h = Fnv1aHasher::new();
    value.hash(&mut h);
    h.finish()
}

/// Rank of each value: the position of its first occurrence in sorted
/// order, so equal values share a rank.
fn ranks_from_values(values: &[u64]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..values.len()).collect();
    indices.sort_by_key(|&i| values[i]);
    let mut ranks = vec![0usize; values.len()];
    for pos in 1..indices.len() {
        let (prev, cur) = (indices[pos - 1], indices[pos]);
        ranks[cur] = if values[cur] == values[prev] {
            ranks[prev]
        } else {
            pos
        };
    }
    ranks
}

fn count_distinct(ranks: &[usize]) -> usize {
    let mut sorted = ranks.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    sorted.len()
}

fn morgan_refine(mol: &Mol<Atom, Bond>, ranks: &mut Vec<usize>) {
    let mut distinct = count_distinct(ranks);
    loop {
        let values: Vec<u64> = mol
            .atoms()
            .map(|atom| {
                let mut neighbor_ranks: Vec<usize> =
                    mol.neighbors(atom).map(|nb| ranks[nb.index()]).collect();
                neighbor_ranks.sort_unstable();
                hash_of(&(ranks[atom.index()], neighbor_ranks))
            })
            .collect();
        let refined = ranks_from_values(&values);
        let refined_distinct = count_distinct(&refined);
        if refined_distinct <= distinct {
            return;
        }
        *ranks = refined;
        distinct = refined_distinct;
    }
}

fn refined_ranks(mol: &Mol<Atom, Bond>, invariants: &[AtomInvariant]) -> Vec<usize> {
    let values: Vec<u64> = invariants.iter().map(hash_of).collect();
    let mut ranks = ranks_from_values(&values);
    morgan_refine(mol, &mut ranks);
    ranks
}

/// Topological equivalence classes: atoms with equal ids cannot be told
/// apart by the graph. Ids are dense, start at 0 and do not depend on atom
/// order.
pub fn symmetry_classes(mol: &Mol<Atom, Bond>) -> Vec<u32> {
    let invariants: Vec<AtomInvariant> = mol.atoms().map(|a| atom_invariant(mol, a)).collect();
    let ranks = refined_ranks(mol, &invariants);
    let mut distinct = ranks.clone();
    distinct.sort_unstable();
    distinct.dedup();
    let dense: HashMap<usize, u32> = distinct
        .into_iter()
        .enumerate()
        .map(|(i, r)| (r, i as u32))
        .collect();
    ranks.iter().map(|r| dense[r]).collect()
}

/// Writes [`symmetry_classes`] onto the atoms' `equivalence_class`.
pub fn assign_equivalence_classes(mol: &mut Mol<Atom, Bond>) {
    let classes = symmetry_classes(mol);
    let atoms: Vec<NodeIndex> = mol.atoms().collect();
    for idx in atoms {
        mol.atom_mut(idx).equivalence_class = Some(classes[idx.index()]);
    }
}

/// Total canonical order: `ranks[i]` is atom `i`'s position, a permutation
/// of `0..atom_count()`.
pub fn canonical_ranks(mol: &Mol<Atom, Bond>) -> Vec<usize> {
    let n = mol.atom_count();
    if n == 0 {
        return Vec::new();
    }
    let invariants: Vec<AtomInvariant> = mol.atoms().map(|a| atom_invariant(mol, a)).collect();
    let mut ranks = refined_ranks(mol, &invariants);
    if count_distinct(&ranks) < n {
        break_ties(mol, &mut ranks, &invariants);
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by_key(|&i| ranks[i]);
    let mut total = vec![0usize; n];
    for (position, &atom) in order.iter().enumerate() {
        total[atom] = position;
    }
    total
}

fn break_ties(mol: &Mol<Atom, Bond>, ranks: &mut Vec<usize>, invariants: &[AtomInvariant]) {
    let n = ranks.len();
    while count_distinct(ranks) < n {
        let Some(tied_rank) = lowest_tied_rank(ranks) else {
            return;
        };
        let max_rank = ranks.iter().copied().max().unwrap_or(0);

        let mut best: Option<(Vec<u64>, Vec<usize>)> = None;
        for candidate in (0..n).filter(|&i| ranks[i] == tied_rank) {
            let mut trial = ranks.clone();
            trial[candidate] = max_rank + 1;
            morgan_refine(mol, &mut trial);
            let trace = invariant_trace(mol, &trial, invariants);
            if best.as_ref().is_none_or(|(t, _)| trace < *t) {
                best = Some((trace, trial));
            }
        }
        match best {
            Some((_, trial)) => *ranks = trial,
            None => return,
        }
    }
}

fn lowest_tied_rank(ranks: &[usize]) -> Option<usize> {
    let mut counts: HashMap<usize, usize> = HashMap::new();
    for &r in ranks {
        *counts.entry(r).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .filter(|&(_, count)| count > 1)
        .map(|(rank, _)| rank)
        .min()
}

/// Atom invariants plus neighbor ranks, listed in rank order.
fn invariant_trace(mol: &Mol<Atom, Bond>, ranks: &[usize], invariants: &[AtomInvariant]) -> Vec<u64> {
    let mut order: Vec<usize> = (0..ranks.len()).collect();
    order.sort_by_key(|&i| ranks[i]);
    order
        .into_iter()
        .map(|i| {
            let mut neighbor_ranks: Vec<usize> = mol
                .neighbors(NodeIndex::new(i))
                .map(|nb| ranks[nb.index()])
                .collect();
            neighbor_ranks.sort_unstable();
            hash_of(&(&invariants[i], neighbor_ranks))
        })
        .collect()
}

/// Canonical SMILES, the structure identifier used for deduplication: two
/// molecules get the same string exactly when they have the same
/// constitution, charges and aromaticity, whatever their atom order or
/// Kekulé form.
pub fn to_canonical_smiles(mol: &Mol<Atom, Bond>) -> String {
    write_smiles(mol, &canonical_ranks(mol))
}
