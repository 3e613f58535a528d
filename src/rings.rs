use std::collections::{HashSet, VecDeque};

use petgraph::graph::NodeIndex;

use crate::graph_ops::num_components;
use crate::mol::Mol;

/// Smallest set of smallest rings plus per-atom and per-bond lookups.
///
/// Rings are found with Horton's candidate construction (for every bond
/// `u–v` and every atom `w`, the cycle `w…u–v…w` made of two shortest
/// paths) followed by greedy selection of linearly independent cycles over
/// GF(2), shortest first.
#[derive(Debug, Clone, Default)]
pub struct RingInfo {
    rings: Vec<Vec<NodeIndex>>,
    ring_bonds: HashSet<(NodeIndex, NodeIndex)>,
}

impl RingInfo {
    pub fn sssr<A, B>(mol: &Mol<A, B>) -> Self {
        let cyclomatic = (mol.bond_count() + num_components(mol)).saturating_sub(mol.atom_count());
        if cyclomatic == 0 {
            return Self::default();
        }

        let mut rings = Vec::with_capacity(cyclomatic);
        let mut basis: Vec<Vec<u64>> = Vec::with_capacity(cyclomatic);
        for ring in horton_candidates(mol) {
            if rings.len() == cyclomatic {
                break;
            }
            let bits = edge_bits(mol, &ring);
            if add_if_independent(&mut basis, bits) {
                rings.push(ring);
            }
        }

        let mut ring_bonds = HashSet::new();
        for ring in &rings {
            for i in 0..ring.len() {
                ring_bonds.insert(bond_key(ring[i], ring[(i + 1) % ring.len()]));
            }
        }
        Self { rings, ring_bonds }
    }

    pub fn num_rings(&self) -> usize {
        self.rings.len()
    }

    pub fn rings(&self) -> &[Vec<NodeIndex>] {
        &self.rings
    }

    pub fn is_ring_atom(&self, atom: NodeIndex) -> bool {
        self.rings.iter().any(|ring| ring.contains(&atom))
    }

    pub fn is_ring_bond(&self, a: NodeIndex, b: NodeIndex) -> bool {
        self.ring_bonds.contains(&bond_key(a, b))
    }

    pub fn smallest_ring_size(&self, atom: NodeIndex) -> Option<usize> {
        self.rings
            .iter()
            .filter(|ring| ring.contains(&atom))
            .map(Vec::len)
            .min()
    }

    pub fn atom_ring_count(&self, atom: NodeIndex) -> usize {
        self.rings.iter().filter(|ring| ring.contains(&atom)).count()
    }
}

fn bond_key(a: NodeIndex, b: NodeIndex) -> (NodeIndex, NodeIndex) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

fn horton_candidates<A, B>(mol: &Mol<A, B>) -> Vec<Vec<NodeIndex>> {
    let n = mol.atom_count();
    let parents: Vec<Vec<Option<NodeIndex>>> =
        (0..n).map(|i| bfs_parents(mol, NodeIndex::new(i))).collect();

    let mut candidates = Vec::new();
    for edge in mol.bonds() {
        let Some((u, v)) = mol.bond_endpoints(edge) else {
            continue;
        };
        for w in mol.atoms() {
            let (Some(path_u), Some(path_v)) = (
                path_from(&parents[w.index()], w, u),
                path_from(&parents[w.index()], w, v),
            ) else {
                continue;
            };
            if path_u.len() + path_v.len() < 4 {
                continue;
            }
            if path_u[1..].iter().any(|x| path_v[1..].contains(x)) {
                continue;
            }
            let mut ring = path_u;
            ring.extend(path_v[1..].iter().rev());
            candidates.push(normalize(ring));
        }
    }
    candidates.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
    candidates.dedup();
    candidates
}

fn bfs_parents<A, B>(mol: &Mol<A, B>, src: NodeIndex) -> Vec<Option<NodeIndex>> {
    let mut parent = vec![None; mol.atom_count()];
    let mut seen = vec![false; mol.atom_count()];
    seen[src.index()] = true;
    let mut queue = VecDeque::from([src]);
    while let Some(cur) = queue.pop_front() {
        let mut neighbors: Vec<NodeIndex> = mol.neighbors(cur).collect();
        neighbors.sort();
        for nb in neighbors {
            if !seen[nb.index()] {
                seen[nb.index()] = true;
                parent[nb.index()] = Some(cur);
                queue.push_back(nb);
            }
        }
    }
    parent
}

fn path_from(parent: &[Option<NodeIndex>], src: NodeIndex, dst: NodeIndex) -> Option<Vec<NodeIndex>> {
    let mut path = vec![dst];
    let mut cur = dst;
    while cur != src {
        cur = parent[cur.index()]?;
        path.push(cur);
    }
    path.reverse();
    Some(path)
}

/// Rotates a ring to start at its smallest atom and picks the direction
/// with the smaller second atom, so equal rings compare equal.
fn normalize(mut ring: Vec<NodeIndex>) -> Vec<NodeIndex> {
    let Some(min_pos) = ring.iter().enumerate().min_by_key(|(_, n)| **n).map(|(i, _)| i) else {
        return ring;
    };
    ring.rotate_left(min_pos);
    if ring.len() > 2 && ring[ring.len() - 1] < ring[1] {
        ring[1..].reverse();
    }
    ring
}

fn edge_bits<A, B>(mol: &Mol<A, B>, ring: &[NodeIndex]) -> Vec<u64> {
    let mut bits = vec![0u64; mol.bond_count().div_ceil(64)];
    for i in 0..ring.len() {
        if let Some(edge) = mol.bond_between(ring[i], ring[(i + 1) % ring.len()]) {
            bits[edge.index() / 64] |= 1u64 << (edge.index() % 64);
        }
    }
    bits
}

fn leading_bit(bits: &[u64]) -> Option<usize> {
    bits.iter()
        .enumerate()
        .find(|(_, w)| **w != 0)
        .map(|(i, w)| i * 64 + w.trailing_zeros() as usize)
}

/// Gaussian elimination over GF(2); keeps `basis` in echelon form.
fn add_if_independent(basis: &mut Vec<Vec<u64>>, mut bits: Vec<u64>) -> bool {
    for row in basis.iter() {
        if let Some(p) = leading_bit(row) {
            if bits[p / 64] & (1u64 << (p % 64)) != 0 {
                for (w, r) in bits.iter_mut().zip(row) {
                    *w ^= r;
                }
            }
        }
    }
    if leading_bit(&bits).is_none() {
        return false;
    }
    basis.push(bits);
    basis.sort_by_key(|row| leading_bit(row));
    true
}
