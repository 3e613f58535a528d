#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BondOrder {
    #[default]
    Single,
    Double,
    Triple,
    /// Unresolved aromatic order. Only present between parsing (or product
    /// assembly) and kekulization.
    Aromatic,
}

impl BondOrder {
    /// Contribution to an atom's bond-order sum. An unresolved aromatic bond
    /// counts as 1; the missing half is accounted for by the atom's
    /// aromatic flag during hydrogen assignment.
    pub fn valence_contribution(self) -> u8 {
        match self {
            BondOrder::Single | BondOrder::Aromatic => 1,
            BondOrder::Double => 2,
            BondOrder::Triple => 3,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bond {
    pub order: BondOrder,
    /// Bond lies in an aromatic ring. Set by aromaticity perception; the
    /// Kekulé `order` is kept alongside.
    pub is_aromatic: bool,
}

impl Bond {
    pub fn new(order: BondOrder) -> Self {
        Self {
            order,
            is_aromatic: order == BondOrder::Aromatic,
        }
    }
}
