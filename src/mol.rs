use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;

use crate::atom::Atom;
use crate::bond::Bond;

/// Molecular graph with atom payload `A` and bond payload `B`.
///
/// Molecules use `Mol<Atom, Bond>`; SMARTS patterns reuse the same container
/// as `Mol<AtomExpr, BondExpr>`. Node indices are dense `0..atom_count()`
/// because atoms are never removed in place: removal goes through
/// [`Mol::induced`], which builds a new graph.
pub struct Mol<A, B> {
    graph: UnGraph<A, B>,
}

impl<A, B> Mol<A, B> {
    pub fn new() -> Self {
        Self {
            graph: UnGraph::default(),
        }
    }

    pub fn graph(&self) -> &UnGraph<A, B> {
        &self.graph
    }

    pub fn atom(&self, idx: NodeIndex) -> &A {
        &self.graph[idx]
    }

    pub fn atom_mut(&mut self, idx: NodeIndex) -> &mut A {
        &mut self.graph[idx]
    }

    pub fn bond(&self, idx: EdgeIndex) -> &B {
        &self.graph[idx]
    }

    pub fn bond_mut(&mut self, idx: EdgeIndex) -> &mut B {
        &mut self.graph[idx]
    }

    pub fn add_atom(&mut self, atom: A) -> NodeIndex {
        self.graph.add_node(atom)
    }

    pub fn add_bond(&mut self, a: NodeIndex, b: NodeIndex, bond: B) -> EdgeIndex {
        self.graph.add_edge(a, b, bond)
    }

    /// Removes a bond. Edge indices of other bonds may shift; node indices
    /// are unaffected.
    pub fn remove_bond(&mut self, idx: EdgeIndex) -> Option<B> {
        self.graph.remove_edge(idx)
    }

    pub fn atom_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn bond_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn neighbors(&self, idx: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors(idx)
    }

    pub fn degree(&self, idx: NodeIndex) -> usize {
        self.graph.neighbors(idx).count()
    }

    pub fn bonds_of(&self, idx: NodeIndex) -> impl Iterator<Item = EdgeIndex> + '_ {
        self.graph.edges(idx).map(|e| e.id())
    }

    pub fn atoms(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    pub fn bonds(&self) -> impl Iterator<Item = EdgeIndex> + '_ {
        self.graph.edge_indices()
    }

    pub fn bond_between(&self, a: NodeIndex, b: NodeIndex) -> Option<EdgeIndex> {
        self.graph.find_edge(a, b)
    }

    pub fn bond_endpoints(&self, idx: EdgeIndex) -> Option<(NodeIndex, NodeIndex)> {
        self.graph.edge_endpoints(idx)
    }
}

impl<A: Clone, B: Clone> Mol<A, B> {
    /// Copy of the subgraph spanned by `keep`, renumbered in the given order.
    pub fn induced(&self, keep: &[NodeIndex]) -> Mol<A, B> {
        let mut out = Mol::new();
        let mut remap = vec![None; self.atom_count()];
        for &idx in keep {
            remap[idx.index()] = Some(out.add_atom(self.atom(idx).clone()));
        }
        for edge in self.bonds() {
            let Some((a, b)) = self.bond_endpoints(edge) else {
                continue;
            };
            if let (Some(na), Some(nb)) = (remap[a.index()], remap[b.index()]) {
                out.add_bond(na, nb, self.bond(edge).clone());
            }
        }
        out
    }
}

impl Mol<Atom, Bond> {
    pub fn heavy_atoms(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.atoms().filter(|&i| !self.atom(i).is_hydrogen())
    }

    pub fn heavy_atom_count(&self) -> usize {
        self.heavy_atoms().count()
    }

    /// Heavy-atom neighbors of `idx`.
    pub fn heavy_degree(&self, idx: NodeIndex) -> usize {
        self.neighbors(idx)
            .filter(|&nb| !self.atom(nb).is_hydrogen())
            .count()
    }

    /// Explicit hydrogen nodes bonded to `idx`.
    pub fn explicit_h_count(&self, idx: NodeIndex) -> u8 {
        self.neighbors(idx)
            .filter(|&nb| self.atom(nb).is_hydrogen())
            .count() as u8
    }

    /// Implicit plus explicit hydrogens on `idx`.
    pub fn total_h_count(&self, idx: NodeIndex) -> u8 {
        self.atom(idx).hydrogen_count + self.explicit_h_count(idx)
    }

    /// Resets all pipeline annotations on every atom.
    pub fn clear_annotations(&mut self) {
        let indices: Vec<NodeIndex> = self.atoms().collect();
        for idx in indices {
            self.atom_mut(idx).clear_annotations();
        }
    }
}

impl<A: Clone, B: Clone> Clone for Mol<A, B> {
    fn clone(&self) -> Self {
        Self {
            graph: self.graph.clone(),
        }
    }
}

impl<A, B> Default for Mol<A, B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: PartialEq, B: PartialEq> PartialEq for Mol<A, B> {
    fn eq(&self, other: &Self) -> bool {
        if self.atom_count() != other.atom_count() || self.bond_count() != other.bond_count() {
            return false;
        }
        if self.atoms().any(|idx| self.atom(idx) != other.atom(idx)) {
            return false;
        }
        self.bonds().all(|idx| {
            self.bond(idx) == other.bond(idx)
                && self.bond_endpoints(idx) == other.bond_endpoints(idx)
        })
    }
}

impl<A: std::fmt::Debug, B: std::fmt::Debug> std::fmt::Debug for Mol<A, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mol")
            .field("atom_count", &self.atom_count())
            .field("bond_count", &self.bond_count())
            .finish()
    }
}
