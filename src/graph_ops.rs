use std::collections::VecDeque;

use petgraph::graph::NodeIndex;

use crate::mol::Mol;

/// All-pairs topological distances (bond counts). Unreachable pairs hold
/// `usize::MAX`.
pub fn distance_matrix<A, B>(mol: &Mol<A, B>) -> Vec<Vec<usize>> {
    let n = mol.atom_count();
    let mut dist = vec![vec![usize::MAX; n]; n];
    for start in mol.atoms() {
        let si = start.index();
        dist[si][si] = 0;
        let mut queue = VecDeque::new();
        queue.push_back(start);
        while let Some(current) = queue.pop_front() {
            let d = dist[si][current.index()];
            for neighbor in mol.neighbors(current) {
                if dist[si][neighbor.index()] == usize::MAX {
                    dist[si][neighbor.index()] = d + 1;
                    queue.push_back(neighbor);
                }
            }
        }
    }
    dist
}

/// Breadth-first shells around `origin`: `shells[d]` holds the atoms first
/// reached at depth `d`, so `shells[0] == [origin]`. Stops after `max_depth`
/// or when the component is exhausted, whichever comes first.
pub fn bfs_shells<A, B>(mol: &Mol<A, B>, origin: NodeIndex, max_depth: usize) -> Vec<Vec<NodeIndex>> {
    let mut seen = vec![false; mol.atom_count()];
    seen[origin.index()] = true;
    let mut shells = vec![vec![origin]];
    while shells.len() <= max_depth {
        let mut next = Vec::new();
        for &atom in &shells[shells.len() - 1] {
            for neighbor in mol.neighbors(atom) {
                if !seen[neighbor.index()] {
                    seen[neighbor.index()] = true;
                    next.push(neighbor);
                }
            }
        }
        if next.is_empty() {
            break;
        }
        next.sort();
        shells.push(next);
    }
    shells
}

pub fn connected_components<A, B>(mol: &Mol<A, B>) -> Vec<Vec<NodeIndex>> {
    let n = mol.atom_count();
    let mut visited = vec![false; n];
    let mut components = Vec::new();
    for node in mol.atoms() {
        if visited[node.index()] {
            continue;
        }
        let mut component = Vec::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if visited[current.index()] {
                continue;
            }
            visited[current.index()] = true;
            component.push(current);
            for neighbor in mol.neighbors(current) {
                if !visited[neighbor.index()] {
                    stack.push(neighbor);
                }
            }
        }
        component.sort();
        components.push(component);
    }
    components
}

pub fn num_components<A, B>(mol: &Mol<A, B>) -> usize {
    connected_components(mol).len()
}

/// Splits a molecule into one independent graph per connected component.
pub fn get_fragments<A: Clone, B: Clone>(mol: &Mol<A, B>) -> Vec<Mol<A, B>> {
    connected_components(mol)
        .iter()
        .map(|component| mol.induced(component))
        .collect()
}
