use petgraph::graph::{EdgeIndex, NodeIndex};

use crate::mol::Mol;

/// One located occurrence of a query: `(query atom, target atom)` pairs in
/// query atom order.
pub type Mapping = Vec<(NodeIndex, NodeIndex)>;

/// All injective mappings of `query` into `target`.
///
/// `atom_match(target_atom, query_atom)` and
/// `bond_match(target_bond, query_bond)` receive indices rather than
/// payloads so that callers can consult per-molecule context (ring
/// membership, hydrogen counts) while matching. Every returned mapping is
/// distinct as a set of (query atom, target atom) pairs.
pub fn find_mappings<A1, B1, A2, B2>(
    target: &Mol<A1, B1>,
    query: &Mol<A2, B2>,
    atom_match: impl Fn(NodeIndex, NodeIndex) -> bool,
    bond_match: impl Fn(EdgeIndex, EdgeIndex) -> bool,
) -> Vec<Mapping> {
    Vf2::new(target, query, atom_match, bond_match).find_all()
}

/// True when at least one mapping exists.
pub fn has_mapping<A1, B1, A2, B2>(
    target: &Mol<A1, B1>,
    query: &Mol<A2, B2>,
    atom_match: impl Fn(NodeIndex, NodeIndex) -> bool,
    bond_match: impl Fn(EdgeIndex, EdgeIndex) -> bool,
) -> bool {
    Vf2::new(target, query, atom_match, bond_match)
        .find_first()
        .is_some()
}

struct Vf2<'a, A1, B1, A2, B2, FA, FB> {
    target: &'a Mol<A1, B1>,
    query: &'a Mol<A2, B2>,
    atom_match: FA,
    bond_match: FB,
    /// Query atoms in breadth-first order, so every atom after the first of
    /// its component has an already-mapped neighbor.
    query_order: Vec<NodeIndex>,
    /// For each position in `query_order`, an earlier-mapped neighbor.
    anchors: Vec<Option<NodeIndex>>,
    query_map: Vec<Option<NodeIndex>>,
    target_used: Vec<bool>,
}

impl<'a, A1, B1, A2, B2, FA, FB> Vf2<'a, A1, B1, A2, B2, FA, FB>
where
    FA: Fn(NodeIndex, NodeIndex) -> bool,
    FB: Fn(EdgeIndex, EdgeIndex) -> bool,
{
    fn new(target: &'a Mol<A1, B1>, query: &'a Mol<A2, B2>, atom_match: FA, bond_match: FB) -> Self {
        let (query_order, anchors) = connected_order(query);
        Self {
            target,
            query,
            atom_match,
            bond_match,
            query_order,
            anchors,
            query_map: vec![None; query.atom_count()],
            target_used: vec![false; target.atom_count()],
        }
    }

    fn find_first(&mut self) -> Option<Mapping> {
        let mut results = Vec::new();
        self.recurse(0, &mut results, true);
        results.into_iter().next()
    }

    fn find_all(&mut self) -> Vec<Mapping> {
        let mut results = Vec::new();
        self.recurse(0, &mut results, false);
        results
    }

    fn recurse(&mut self, depth: usize, results: &mut Vec<Mapping>, first_only: bool) {
        if depth == self.query_order.len() {
            let mapping = self
                .query_map
                .iter()
                .enumerate()
                .filter_map(|(q, t)| t.map(|t| (NodeIndex::new(q), t)))
                .collect();
            results.push(mapping);
            return;
        }

        let query_node = self.query_order[depth];
        let candidates: Vec<NodeIndex> = match self.anchors[depth].and_then(|a| self.query_map[a.index()]) {
            Some(anchor_target) => self.target.neighbors(anchor_target).collect(),
            None => self.target.atoms().collect(),
        };

        for target_node in candidates {
            if self.target_used[target_node.index()] || !self.is_feasible(query_node, target_node) {
                continue;
            }

            self.query_map[query_node.index()] = Some(target_node);
            self.target_used[target_node.index()] = true;

            self.recurse(depth + 1, results, first_only);

            self.query_map[query_node.index()] = None;
            self.target_used[target_node.index()] = false;

            if first_only && !results.is_empty() {
                return;
            }
        }
    }

    fn is_feasible(&self, query_node: NodeIndex, target_node: NodeIndex) -> bool {
        if self.target.degree(target_node) < self.query.degree(query_node) {
            return false;
        }
        if !(self.atom_match)(target_node, query_node) {
            return false;
        }

        for q_edge in self.query.bonds_of(query_node) {
            let Some((a, b)) = self.query.bond_endpoints(q_edge) else {
                continue;
            };
            let q_neighbor = if a == query_node { b } else { a };
            let Some(t_mapped) = self.query_map[q_neighbor.index()] else {
                continue;
            };
            match self.target.bond_between(target_node, t_mapped) {
                Some(t_edge) if (self.bond_match)(t_edge, q_edge) => {}
                _ => return false,
            }
        }

        true
    }
}

/// Breadth-first visiting order over every component of `query`, each
/// component rooted at its highest-degree atom, plus the neighbor through
/// which each atom was reached.
fn connected_order<A, B>(query: &Mol<A, B>) -> (Vec<NodeIndex>, Vec<Option<NodeIndex>>) {
    let n = query.atom_count();
    let mut seen = vec![false; n];
    let mut order = Vec::with_capacity(n);
    let mut anchors = Vec::with_capacity(n);

    let mut roots: Vec<NodeIndex> = query.atoms().collect();
    roots.sort_by_key(|&a| std::cmp::Reverse(query.degree(a)));

    for root in roots {
        if seen[root.index()] {
            continue;
        }
        seen[root.index()] = true;
        let start = order.len();
        order.push(root);
        anchors.push(None);
        let mut head = start;
        while head < order.len() {
            let current = order[head];
            head += 1;
            for nb in query.neighbors(current) {
                if !seen[nb.index()] {
                    seen[nb.index()] = true;
                    order.push(nb);
                    anchors.push(Some(current));
                }
            }
        }
    }
    (order, anchors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::Atom;
    use crate::bond::Bond;
    use crate::smiles::from_smiles;

    fn mol(smiles: &str) -> Mol<Atom, Bond> {
        from_smiles(smiles).unwrap_or_else(|e| panic!("bad SMILES {smiles:?}: {e}"))
    }

    /// Element plus Kekulé order; enough to exercise the matcher without SMARTS.
    fn plain_mappings(target: &Mol<Atom, Bond>, query: &Mol<Atom, Bond>) -> Vec<Mapping> {
        find_mappings(
            target,
            query,
            |t, q| target.atom(t).atomic_num == query.atom(q).atomic_num,
            |t, q| {
                let (tb, qb) = (target.bond(t), query.bond(q));
                (tb.is_aromatic && qb.is_aromatic) || tb.order == qb.order
            },
        )
    }

    #[test]
    fn propane_contains_ethane_four_ways() {
        assert_eq!(plain_mappings(&mol("CCC"), &mol("CC")).len(), 4);
    }

    #[test]
    fn cyclohexane_edges() {
        let target = mol("C1CCCCC1");
        let matches = plain_mappings(&target, &mol("CC"));
        assert_eq!(matches.len(), 12);
        for m in &matches {
            assert!(target.bond_between(m[0].1, m[1].1).is_some());
        }
    }

    #[test]
    fn benzene_automorphisms_are_distinct() {
        let benzene = mol("c1ccccc1");
        let matches = plain_mappings(&benzene, &benzene);
        assert_eq!(matches.len(), 12);
        for (i, a) in matches.iter().enumerate() {
            for b in matches.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn bond_orders_must_agree() {
        assert!(plain_mappings(&mol("CC"), &mol("C=C")).is_empty());
        assert!(plain_mappings(&mol("C=C"), &mol("CC")).is_empty());
        assert_eq!(plain_mappings(&mol("C#N"), &mol("C#N")).len(), 1);
    }

    #[test]
    fn mapping_is_in_query_order() {
        let target = mol("OCC");
        let query = mol("CO");
        let matches = plain_mappings(&target, &query);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0], vec![(NodeIndex::new(0), NodeIndex::new(1)), (NodeIndex::new(1), NodeIndex::new(0))]);
    }

    #[test]
    fn disconnected_query_components() {
        let target = mol("CCO.O");
        let query = mol("O.O");
        assert_eq!(plain_mappings(&target, &query).len(), 2);
    }

    #[test]
    fn empty_and_oversized_queries() {
        let target = mol("CCO");
        let empty = Mol::<Atom, Bond>::new();
        let all = plain_mappings(&target, &empty);
        assert_eq!(all.len(), 1);
        assert!(all[0].is_empty());
        assert!(plain_mappings(&mol("C"), &mol("CCCCCC")).is_empty());
        assert!(plain_mappings(&empty, &mol("C")).is_empty());
    }

    #[test]
    fn has_mapping_stops_early() {
        let target = mol("c1ccc2ccccc2c1");
        let query = mol("c1ccccc1");
        assert!(has_mapping(&target, &query, |_, _| true, |_, _| true));
        let cyclohexane = mol("C1CCCCC1");
        assert!(!has_mapping(&cyclohexane, &query, |_, _| true, |t, _| cyclohexane.bond(t).is_aromatic));
    }
}
