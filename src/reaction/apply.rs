use std::collections::{BTreeSet, HashMap};

use petgraph::graph::NodeIndex;

use crate::aromaticity::perceive_aromaticity;
use crate::atom::Atom;
use crate::atom_type::atom_type;
use crate::bond::{Bond, BondOrder};
use crate::kekulize::kekulize;
use crate::mol::Mol;
use crate::smarts::{AtomExpr, BondExpr};
use crate::substruct::Mapping;
use crate::valence::assign_implicit_hydrogens;

use super::error::ReactionError;
use super::Reaction;

impl Reaction {
    /// Rewrites a copy of `mol` at one mapping of the reactant template.
    ///
    /// Mapped atoms keep their identity and substituents; reactant atoms
    /// whose map class is missing from the product are deleted, product atoms
    /// without a reactant counterpart are created. Bonds present in both
    /// templates with the same expression keep the molecule's own order.
    /// Afterwards implicit hydrogens are recomputed on every touched atom,
    /// the result is kekulized, aromaticity is perceived from scratch and
    /// every atom is re-typed, in that order. Atoms left without a valid
    /// type keep `atom_type == None` for the caller to inspect.
    ///
    /// The returned molecule may hold several fragments.
    pub fn apply(&self, mol: &Mol<Atom, Bond>, mapping: &Mapping) -> Result<Mol<Atom, Bond>, ReactionError> {
        if mapping.len() != self.reactant.atom_count() {
            return Err(ReactionError::MappingMismatch {
                expected: self.reactant.atom_count(),
                got: mapping.len(),
            });
        }

        let mut out = mol.clone();
        out.clear_annotations();

        let by_class = self.reactant_classes(mapping);
        let mut touched: BTreeSet<NodeIndex> = BTreeSet::new();
        let mut delete = vec![false; out.atom_count()];

        let product_classes: BTreeSet<u16> = self
            .product
            .atoms()
            .filter_map(|p| self.product.atom(p).map_class())
            .collect();
        for &(q, t) in mapping {
            let keep = self
                .reactant
                .atom(q)
                .map_class()
                .is_some_and(|m| product_classes.contains(&m));
            if !keep {
                delete[t.index()] = true;
            }
        }

        // Product atoms: reuse mapped ones, create the rest.
        let mut placed: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        for p in self.product.atoms() {
            let expr = self.product.atom(p);
            let existing = expr.map_class().and_then(|m| by_class.get(&m).copied());
            let idx = match existing {
                Some(t) => {
                    update_atom(out.atom_mut(t), expr);
                    t
                }
                None => {
                    let atom = new_atom(expr).ok_or(ReactionError::UnspecifiedProductAtom { index: p.index() })?;
                    delete.push(false);
                    out.add_atom(atom)
                }
            };
            touched.insert(idx);
            placed.insert(p, idx);
        }

        // Reactant bonds between carried atoms that the product drops.
        for edge in self.reactant.bonds() {
            let Some((a, b)) = self.reactant.bond_endpoints(edge) else {
                continue;
            };
            let (Some(ma), Some(mb)) = (self.reactant.atom(a).map_class(), self.reactant.atom(b).map_class()) else {
                continue;
            };
            if self.product_bond(ma, mb).is_some() {
                continue;
            }
            let (Some(&ta), Some(&tb)) = (by_class.get(&ma), by_class.get(&mb)) else {
                continue;
            };
            if let Some(e) = out.bond_between(ta, tb) {
                out.remove_bond(e);
                touched.extend([ta, tb]);
            }
        }

        // Product bonds: set orders, add new ones.
        for edge in self.product.bonds() {
            let Some((a, b)) = self.product.bond_endpoints(edge) else {
                continue;
            };
            let (pa, pb) = (placed[&a], placed[&b]);
            let expr = self.product.bond(edge);
            let unchanged = match (self.product.atom(a).map_class(), self.product.atom(b).map_class()) {
                (Some(ma), Some(mb)) => self.reactant_bond(ma, mb).is_some_and(|r| r == expr),
                _ => false,
            };
            match out.bond_between(pa, pb) {
                Some(_) if unchanged => {}
                Some(e) => {
                    if let Some(order) = expr.order() {
                        *out.bond_mut(e) = Bond::new(order);
                    }
                }
                None => {
                    out.add_bond(pa, pb, Bond::new(expr.order().unwrap_or(BondOrder::Single)));
                }
            }
        }

        // Survivors bonded to deleted atoms lose a bond and gain hydrogens.
        for t in out.atoms() {
            if delete[t.index()] {
                touched.extend(out.neighbors(t).filter(|nb| !delete[nb.index()]));
            }
        }

        let keep: Vec<NodeIndex> = out.atoms().filter(|t| !delete[t.index()]).collect();
        let mut position = vec![None; out.atom_count()];
        for (i, &t) in keep.iter().enumerate() {
            position[t.index()] = Some(NodeIndex::new(i));
        }
        let mut product = out.induced(&keep);
        let touched: Vec<NodeIndex> = touched.iter().filter_map(|t| position[t.index()]).collect();

        assign_implicit_hydrogens(&mut product, &touched);
        kekulize(&mut product)?;
        perceive_aromaticity(&mut product);
        let atoms: Vec<NodeIndex> = product.atoms().collect();
        for idx in atoms {
            let ty = atom_type(&product, idx);
            product.atom_mut(idx).atom_type = ty;
        }
        Ok(product)
    }

    fn reactant_classes(&self, mapping: &Mapping) -> HashMap<u16, NodeIndex> {
        mapping
            .iter()
            .filter_map(|&(q, t)| self.reactant.atom(q).map_class().map(|m| (m, t)))
            .collect()
    }

    fn reactant_bond(&self, a: u16, b: u16) -> Option<&BondExpr> {
        template_bond(&self.reactant, a, b)
    }

    fn product_bond(&self, a: u16, b: u16) -> Option<&BondExpr> {
        template_bond(&self.product, a, b)
    }
}

fn template_bond(template: &Mol<AtomExpr, BondExpr>, a: u16, b: u16) -> Option<&BondExpr> {
    let find = |m: u16| template.atoms().find(|&i| template.atom(i).map_class() == Some(m));
    let edge = template.bond_between(find(a)?, find(b)?)?;
    Some(template.bond(edge))
}

/// Applies whatever the product expression pins down to a carried atom.
fn update_atom(atom: &mut Atom, expr: &AtomExpr) {
    if let Some((atomic_num, aromatic)) = expr.element() {
        if atomic_num != atom.atomic_num {
            atom.atomic_num = atomic_num;
            atom.is_aromatic = aromatic.unwrap_or(false);
        }
    }
    if let Some(charge) = expr.charge() {
        atom.formal_charge = charge;
    }
}

fn new_atom(expr: &AtomExpr) -> Option<Atom> {
    let (atomic_num, aromatic) = expr.element()?;
    let mut atom = Atom::new(atomic_num);
    atom.is_aromatic = aromatic.unwrap_or(false);
    atom.formal_charge = expr.charge().unwrap_or(0);
    Some(atom)
}
