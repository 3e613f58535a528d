use petgraph::graph::{EdgeIndex, NodeIndex};

use crate::atom::Atom;
use crate::bond::{Bond, BondOrder};
use crate::mol::Mol;
use crate::rings::RingInfo;

/// AST node for a SMARTS atom query expression.
#[derive(Debug, Clone, PartialEq)]
pub enum AtomExpr {
    /// Wildcard `*`.
    True,
    /// Element test. `aromatic` is `None` for `#n`, `Some(true)` for
    /// lowercase symbols and `Some(false)` for uppercase ones.
    Element {
        atomic_num: u8,
        aromatic: Option<bool>,
    },
    Aromatic,
    Aliphatic,
    /// Explicit connections (`D`).
    Degree(u8),
    /// Explicit connections plus implicit hydrogens (`X`).
    Connectivity(u8),
    /// Implicit plus explicit hydrogens (`H`).
    TotalHCount(u8),
    /// Bond-order sum plus implicit hydrogens (`v`).
    Valence(u8),
    /// `R` without a count.
    InRing,
    /// Number of SSSR rings containing the atom (`R n`).
    RingMembership(u8),
    /// Size of the smallest ring containing the atom (`r n`).
    SmallestRingSize(u8),
    /// Ring bonds on the atom (`x n`).
    RingBondCount(u8),
    Charge(i8),
    /// Reaction map class (`:n`); always matches.
    MapClass(u16),
    And(Vec<AtomExpr>),
    Or(Vec<AtomExpr>),
    Not(Box<AtomExpr>),
}

/// AST node for a SMARTS bond query expression. An unwritten bond is
/// [`BondExpr::SingleOrAromatic`].
#[derive(Debug, Clone, PartialEq)]
pub enum BondExpr {
    /// `~`
    True,
    Single,
    Double,
    Triple,
    Aromatic,
    /// `@`
    Ring,
    SingleOrAromatic,
    And(Vec<BondExpr>),
    Or(Vec<BondExpr>),
    Not(Box<BondExpr>),
}

/// Target molecule plus the ring perception SMARTS primitives need.
pub struct MatchContext<'a> {
    pub mol: &'a Mol<Atom, Bond>,
    pub ring_info: RingInfo,
}

impl<'a> MatchContext<'a> {
    pub fn new(mol: &'a Mol<Atom, Bond>) -> Self {
        Self {
            mol,
            ring_info: RingInfo::sssr(mol),
        }
    }

    fn ring_bond_count(&self, idx: NodeIndex) -> u8 {
        self.mol
            .neighbors(idx)
            .filter(|&nb| self.ring_info.is_ring_bond(idx, nb))
            .count() as u8
    }
}

impl AtomExpr {
    pub fn matches(&self, ctx: &MatchContext, idx: NodeIndex) -> bool {
        let mol = ctx.mol;
        let atom = mol.atom(idx);
        match self {
            AtomExpr::True | AtomExpr::MapClass(_) => true,
            AtomExpr::Element {
                atomic_num,
                aromatic,
            } => atom.atomic_num == *atomic_num && aromatic.is_none_or(|a| atom.is_aromatic == a),
            AtomExpr::Aromatic => atom.is_aromatic,
            AtomExpr::Aliphatic => !atom.is_aromatic,
            AtomExpr::Degree(d) => mol.degree(idx) as u8 == *d,
            AtomExpr::Connectivity(x) => mol.degree(idx) as u8 + atom.hydrogen_count == *x,
            AtomExpr::TotalHCount(h) => mol.total_h_count(idx) == *h,
            AtomExpr::Valence(v) => crate::valence::total_valence(mol, idx) == *v,
            AtomExpr::InRing => ctx.ring_info.is_ring_atom(idx),
            AtomExpr::RingMembership(n) => ctx.ring_info.atom_ring_count(idx) as u8 == *n,
            AtomExpr::SmallestRingSize(r) => {
                ctx.ring_info.smallest_ring_size(idx).unwrap_or(0) as u8 == *r
            }
            AtomExpr::RingBondCount(x) => ctx.ring_bond_count(idx) == *x,
            AtomExpr::Charge(c) => atom.formal_charge == *c,
            AtomExpr::And(exprs) => exprs.iter().all(|e| e.matches(ctx, idx)),
            AtomExpr::Or(exprs) => exprs.iter().any(|e| e.matches(ctx, idx)),
            AtomExpr::Not(expr) => !expr.matches(ctx, idx),
        }
    }

    /// The map class carried anywhere in a conjunction.
    pub fn map_class(&self) -> Option<u16> {
        match self {
            AtomExpr::MapClass(m) => Some(*m),
            AtomExpr::And(exprs) => exprs.iter().find_map(AtomExpr::map_class),
            _ => None,
        }
    }

    /// Element and aromaticity a product template atom asks for, if it pins
    /// them down.
    pub fn element(&self) -> Option<(u8, Option<bool>)> {
        match self {
            AtomExpr::Element {
                atomic_num,
                aromatic,
            } => Some((*atomic_num, *aromatic)),
            AtomExpr::And(exprs) => exprs.iter().find_map(AtomExpr::element),
            _ => None,
        }
    }

    /// Formal charge a product template atom asks for.
    pub fn charge(&self) -> Option<i8> {
        match self {
            AtomExpr::Charge(c) => Some(*c),
            AtomExpr::And(exprs) => exprs.iter().find_map(AtomExpr::charge),
            _ => None,
        }
    }

    /// Hydrogen count a product template atom asks for.
    pub fn hydrogen_count(&self) -> Option<u8> {
        match self {
            AtomExpr::TotalHCount(h) => Some(*h),
            AtomExpr::And(exprs) => exprs.iter().find_map(AtomExpr::hydrogen_count),
            _ => None,
        }
    }
}

impl BondExpr {
    pub fn matches(&self, ctx: &MatchContext, edge: EdgeIndex) -> bool {
        let bond = ctx.mol.bond(edge);
        match self {
            BondExpr::True => true,
            BondExpr::Single => bond.order == BondOrder::Single && !bond.is_aromatic,
            BondExpr::Double => bond.order == BondOrder::Double && !bond.is_aromatic,
            BondExpr::Triple => bond.order == BondOrder::Triple,
            BondExpr::Aromatic => bond.is_aromatic,
            BondExpr::Ring => ctx
                .mol
                .bond_endpoints(edge)
                .is_some_and(|(a, b)| ctx.ring_info.is_ring_bond(a, b)),
            BondExpr::SingleOrAromatic => bond.is_aromatic || bond.order == BondOrder::Single,
            BondExpr::And(exprs) => exprs.iter().all(|e| e.matches(ctx, edge)),
            BondExpr::Or(exprs) => exprs.iter().any(|e| e.matches(ctx, edge)),
            BondExpr::Not(expr) => !expr.matches(ctx, edge),
        }
    }

    /// Concrete order a product template bond asks for. The implicit
    /// single-or-aromatic bond becomes single.
    pub fn order(&self) -> Option<BondOrder> {
        match self {
            BondExpr::Single | BondExpr::SingleOrAromatic => Some(BondOrder::Single),
            BondExpr::Double => Some(BondOrder::Double),
            BondExpr::Triple => Some(BondOrder::Triple),
            BondExpr::Aromatic => Some(BondOrder::Aromatic),
            BondExpr::And(exprs) => exprs.iter().find_map(BondExpr::order),
            _ => None,
        }
    }
}
