use std::collections::HashMap;

use petgraph::graph::{EdgeIndex, NodeIndex};

use crate::atom::Atom;
use crate::bond::{Bond, BondOrder};
use crate::mol::Mol;
use crate::valence::implicit_hydrogens;

/// Writes SMILES in the molecule's own atom order.
pub fn to_smiles(mol: &Mol<Atom, Bond>) -> String {
    let order: Vec<usize> = (0..mol.atom_count()).collect();
    write_smiles(mol, &order)
}

/// Writes SMILES visiting atoms by ascending `ranks`: each component starts
/// at its lowest-ranked atom and branches are taken lowest rank first.
/// Aromatic atoms are lowercase and aromatic bonds are left implicit.
pub(crate) fn write_smiles(mol: &Mol<Atom, Bond>, ranks: &[usize]) -> String {
    let n = mol.atom_count();
    let mut plan = Plan {
        visited: vec![false; n],
        used: vec![false; mol.bond_count()],
        children: vec![Vec::new(); n],
        closures: vec![Vec::new(); n],
    };

    let mut by_rank: Vec<NodeIndex> = mol.atoms().collect();
    by_rank.sort_by_key(|a| ranks[a.index()]);
    let mut roots = Vec::new();
    for atom in by_rank {
        if !plan.visited[atom.index()] {
            roots.push(atom);
            plan.visit(mol, ranks, atom, None);
        }
    }

    let mut out = String::new();
    let mut digits = RingDigits::default();
    for (i, root) in roots.into_iter().enumerate() {
        if i > 0 {
            out.push('.');
        }
        plan.emit(mol, root, &mut digits, &mut out);
    }
    out
}

/// Spanning tree plus ring-closure bonds, computed before any text is
/// written so ring-opening digits can be placed on the earlier atom.
struct Plan {
    visited: Vec<bool>,
    used: Vec<bool>,
    children: Vec<Vec<(NodeIndex, EdgeIndex)>>,
    closures: Vec<Vec<EdgeIndex>>,
}

impl Plan {
    fn visit(&mut self, mol: &Mol<Atom, Bond>, ranks: &[usize], atom: NodeIndex, via: Option<EdgeIndex>) {
        self.visited[atom.index()] = true;
        let mut neighbors: Vec<(NodeIndex, EdgeIndex)> = mol
            .bonds_of(atom)
            .filter_map(|e| {
                let (a, b) = mol.bond_endpoints(e)?;
                Some((if a == atom { b } else { a }, e))
            })
            .collect();
        neighbors.sort_by_key(|(nb, _)| ranks[nb.index()]);

        for (nb, e) in neighbors {
            if Some(e) == via || self.used[e.index()] {
                continue;
            }
            self.used[e.index()] = true;
            if self.visited[nb.index()] {
                self.closures[nb.index()].push(e);
                self.closures[atom.index()].push(e);
            } else {
                self.children[atom.index()].push((nb, e));
                self.visit(mol, ranks, nb, Some(e));
            }
        }
    }

    fn emit(&self, mol: &Mol<Atom, Bond>, atom: NodeIndex, digits: &mut RingDigits, out: &mut String) {
        write_atom(mol, atom, out);
        for &e in &self.closures[atom.index()] {
            match digits.open.remove(&e) {
                Some(d) => {
                    write_digit(d, out);
                    digits.in_use[d] = false;
                }
                None => {
                    let d = digits.allocate();
                    digits.open.insert(e, d);
                    out.push_str(bond_symbol(mol, e));
                    write_digit(d, out);
                }
            }
        }
        let children = &self.children[atom.index()];
        for (i, &(child, e)) in children.iter().enumerate() {
            let branch = i + 1 < children.len();
            if branch {
                out.push('(');
            }
            out.push_str(bond_symbol(mol, e));
            self.emit(mol, child, digits, out);
            if branch {
                out.push(')');
            }
        }
    }
}

struct RingDigits {
    open: HashMap<EdgeIndex, usize>,
    in_use: Vec<bool>,
}

impl Default for RingDigits {
    fn default() -> Self {
        Self {
            open: HashMap::new(),
            in_use: vec![false; 100],
        }
    }
}

impl RingDigits {
    fn allocate(&mut self) -> usize {
        let d = (1..self.in_use.len())
            .find(|&d| !self.in_use[d])
            .unwrap_or(self.in_use.len());
        if d == self.in_use.len() {
            self.in_use.push(false);
        }
        self.in_use[d] = true;
        d
    }
}

fn write_digit(d: usize, out: &mut String) {
    if d < 10 {
        out.push_str(&d.to_string());
    } else {
        out.push('%');
        out.push_str(&d.to_string());
    }
}

fn bond_symbol(mol: &Mol<Atom, Bond>, e: EdgeIndex) -> &'static str {
    let bond = mol.bond(e);
    if bond.is_aromatic {
        return "";
    }
    match bond.order {
        BondOrder::Single => {
            let both_aromatic = mol
                .bond_endpoints(e)
                .is_some_and(|(a, b)| mol.atom(a).is_aromatic && mol.atom(b).is_aromatic);
            if both_aromatic {
                "-"
            } else {
                ""
            }
        }
        BondOrder::Double => "=",
        BondOrder::Triple => "#",
        BondOrder::Aromatic => "",
    }
}

/// Hydrogen count a reader would infer for the atom as written without
/// brackets.
fn implied_hydrogens(mol: &Mol<Atom, Bond>, idx: NodeIndex) -> Option<u8> {
    let atom = mol.atom(idx);
    let elem = atom.element()?;
    let mut sum = 0u8;
    let mut aromatic_bond = false;
    for e in mol.bonds_of(idx) {
        let bond = mol.bond(e);
        if bond.is_aromatic || bond.order == BondOrder::Aromatic {
            aromatic_bond = true;
            sum += 1;
        } else {
            sum += bond.order.valence_contribution();
        }
    }
    implicit_hydrogens(elem, sum, 0, atom.is_aromatic && aromatic_bond)
}

fn write_atom(mol: &Mol<Atom, Bond>, idx: NodeIndex, out: &mut String) {
    let atom = mol.atom(idx);
    let Some(elem) = atom.element() else {
        out.push_str(&format!("[#{}]", atom.atomic_num));
        return;
    };
    let symbol = if atom.is_aromatic {
        elem.symbol().to_ascii_lowercase()
    } else {
        elem.symbol().to_string()
    };
    let bare = elem.is_organic_subset()
        && atom.formal_charge == 0
        && implied_hydrogens(mol, idx) == Some(atom.hydrogen_count);
    if bare {
        out.push_str(&symbol);
        return;
    }
    out.push('[');
    out.push_str(&symbol);
    match atom.hydrogen_count {
        0 => {}
        1 => out.push('H'),
        h => out.push_str(&format!("H{h}")),
    }
    match atom.formal_charge {
        0 => {}
        1 => out.push('+'),
        -1 => out.push('-'),
        c if c > 0 => out.push_str(&format!("+{c}")),
        c => out.push_str(&format!("-{}", -c)),
    }
    out.push(']');
}
