use std::collections::BTreeMap;

use petgraph::graph::NodeIndex;

use crate::atom::Atom;
use crate::bond::{Bond, BondOrder};
use crate::element::Element;
use crate::mol::Mol;
use crate::smiles::error::SmilesError;
use crate::valence::{bond_order_sum, implicit_hydrogens};

/// Largest hydrogen count or charge magnitude accepted in a bracket atom.
const MAX_BRACKET_COUNT: u32 = 8;

struct OpenRing {
    atom: NodeIndex,
    bond: Option<BondOrder>,
}

struct BracketAtom {
    element: Element,
    aromatic: bool,
    hydrogens: u8,
    charge: i8,
}

/// Single-pass reader that builds the graph as it scans.
///
/// Bonds between two aromatic atoms without an explicit symbol get
/// [`BondOrder::Aromatic`]; implicit hydrogens are assigned once the whole
/// graph is known, since ring closures can add bonds to earlier atoms.
pub(crate) struct Parser<'a> {
    chars: Vec<char>,
    pos: usize,
    source: &'a str,
    mol: Mol<Atom, Bond>,
    bracket_h: Vec<Option<u8>>,
    prev: Option<NodeIndex>,
    branches: Vec<(Option<NodeIndex>, usize)>,
    pending: Option<(BondOrder, usize)>,
    rings: BTreeMap<u16, OpenRing>,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            source,
            mol: Mol::new(),
            bracket_h: Vec::new(),
            prev: None,
            branches: Vec::new(),
            pending: None,
            rings: BTreeMap::new(),
        }
    }

    pub(crate) fn parse(mut self) -> Result<Mol<Atom, Bond>, SmilesError> {
        if self.source.trim().is_empty() {
            return Err(SmilesError::EmptyInput);
        }
        while let Some(&ch) = self.chars.get(self.pos) {
            match ch {
                ' ' | '\t' | '\r' | '\n' => self.pos += 1,
                '[' => {
                    let start = self.pos;
                    let bracket = self.bracket_atom()?;
                    let mut atom = Atom::new(bracket.element.atomic_num());
                    atom.is_aromatic = bracket.aromatic;
                    atom.formal_charge = bracket.charge;
                    self.push_atom(atom, Some(bracket.hydrogens), start)?;
                }
                '(' => {
                    if self.prev.is_none() || self.pending.is_some() {
                        return Err(SmilesError::UnexpectedChar { pos: self.pos, ch });
                    }
                    self.branches.push((self.prev, self.pos));
                    self.pos += 1;
                }
                ')' => {
                    if let Some((_, pos)) = self.pending {
                        return Err(SmilesError::DanglingBond { pos });
                    }
                    let Some((atom, _)) = self.branches.pop() else {
                        return Err(SmilesError::UnmatchedParen { pos: self.pos });
                    };
                    self.prev = atom;
                    self.pos += 1;
                }
                '.' => {
                    if let Some((_, pos)) = self.pending {
                        return Err(SmilesError::DanglingBond { pos });
                    }
                    self.prev = None;
                    self.pos += 1;
                }
                '-' | '/' | '\\' => self.bond(BondOrder::Single)?,
                '=' => self.bond(BondOrder::Double)?,
                '#' => self.bond(BondOrder::Triple)?,
                ':' => self.bond(BondOrder::Aromatic)?,
                '0'..='9' => {
                    let digit = ch.to_digit(10).unwrap_or_default() as u16;
                    self.pos += 1;
                    self.ring_bond(digit, self.pos - 1)?;
                }
                '%' => {
                    let start = self.pos;
                    let digits: String = self.chars.iter().skip(self.pos + 1).take(2).collect();
                    if digits.len() != 2 || !digits.chars().all(|c| c.is_ascii_digit()) {
                        return Err(SmilesError::UnexpectedChar { pos: start, ch });
                    }
                    self.pos += 3;
                    let digit = digits.parse::<u16>().map_err(|_| SmilesError::UnexpectedChar { pos: start, ch })?;
                    self.ring_bond(digit, start)?;
                }
                _ => {
                    let start = self.pos;
                    let (element, aromatic) = self.organic_atom()?;
                    let mut atom = Atom::new(element.atomic_num());
                    atom.is_aromatic = aromatic;
                    self.push_atom(atom, None, start)?;
                }
            }
        }

        if let Some((_, pos)) = self.pending {
            return Err(SmilesError::DanglingBond { pos });
        }
        if let Some((_, pos)) = self.branches.first() {
            return Err(SmilesError::UnmatchedParen { pos: *pos });
        }
        if let Some(&digit) = self.rings.keys().next() {
            return Err(SmilesError::UnclosedRing { digit });
        }
        if self.mol.atom_count() == 0 {
            return Err(SmilesError::EmptyInput);
        }
        self.assign_hydrogens();
        Ok(self.mol)
    }

    fn default_order(&self, a: NodeIndex, b: NodeIndex) -> BondOrder {
        if self.mol.atom(a).is_aromatic && self.mol.atom(b).is_aromatic {
            BondOrder::Aromatic
        } else {
            BondOrder::Single
        }
    }

    fn push_atom(&mut self, atom: Atom, bracket_h: Option<u8>, pos: usize) -> Result<(), SmilesError> {
        let idx = self.mol.add_atom(atom);
        self.bracket_h.push(bracket_h);
        if let Some(prev) = self.prev {
            let order = match self.pending.take() {
                Some((order, _)) => order,
                None => self.default_order(prev, idx),
            };
            self.mol.add_bond(prev, idx, Bond::new(order));
        } else if self.pending.is_some() {
            return Err(SmilesError::UnexpectedChar {
                pos,
                ch: self.chars[pos],
            });
        }
        self.prev = Some(idx);
        Ok(())
    }

    fn bond(&mut self, order: BondOrder) -> Result<(), SmilesError> {
        if self.prev.is_none() || self.pending.is_some() {
            return Err(SmilesError::UnexpectedChar {
                pos: self.pos,
                ch: self.chars[self.pos],
            });
        }
        self.pending = Some((order, self.pos));
        self.pos += 1;
        Ok(())
    }

    fn ring_bond(&mut self, digit: u16, pos: usize) -> Result<(), SmilesError> {
        let Some(current) = self.prev else {
            return Err(SmilesError::UnexpectedChar {
                pos,
                ch: self.chars[pos],
            });
        };
        let here = self.pending.take().map(|(order, _)| order);
        let Some(open) = self.rings.remove(&digit) else {
            self.rings.insert(digit, OpenRing { atom: current, bond: here });
            return Ok(());
        };
        if open.atom == current || self.mol.bond_between(open.atom, current).is_some() {
            return Err(SmilesError::RingBondConflict { digit });
        }
        let order = match (open.bond, here) {
            (Some(a), Some(b)) if a != b => return Err(SmilesError::RingBondConflict { digit }),
            (Some(a), _) | (None, Some(a)) => a,
            (None, None) => self.default_order(open.atom, current),
        };
        self.mol.add_bond(open.atom, current, Bond::new(order));
        Ok(())
    }

    fn organic_atom(&mut self) -> Result<(Element, bool), SmilesError> {
        let ch = self.chars[self.pos];
        let next = self.chars.get(self.pos + 1).copied();
        let (symbol, len, aromatic) = match (ch, next) {
            ('C', Some('l')) => ("Cl".to_string(), 2, false),
            ('B', Some('r')) => ("Br".to_string(), 2, false),
            ('B' | 'C' | 'N' | 'O' | 'P' | 'S' | 'F' | 'I', _) => (ch.to_string(), 1, false),
            ('b' | 'c' | 'n' | 'o' | 'p' | 's', _) => (ch.to_ascii_uppercase().to_string(), 1, true),
            _ => return Err(SmilesError::UnexpectedChar { pos: self.pos, ch }),
        };
        let element = Element::from_symbol(&symbol)
            .ok_or(SmilesError::UnexpectedChar { pos: self.pos, ch })?;
        self.pos += len;
        Ok((element, aromatic))
    }

    fn bracket_atom(&mut self) -> Result<BracketAtom, SmilesError> {
        let open = self.pos;
        self.pos += 1;
        self.skip_digits();

        let symbol_pos = self.pos;
        let Some(&first) = self.chars.get(self.pos) else {
            return Err(SmilesError::UnclosedBracket { pos: open });
        };
        let (symbol, aromatic) = if first.is_ascii_uppercase() {
            let mut symbol = first.to_string();
            self.pos += 1;
            if let Some(&c) = self.chars.get(self.pos) {
                if c.is_ascii_lowercase() {
                    symbol.push(c);
                    self.pos += 1;
                }
            }
            (symbol, false)
        } else if first.is_ascii_lowercase() {
            let two: String = self.chars.iter().skip(self.pos).take(2).collect();
            if two == "se" || two == "as" {
                self.pos += 2;
                (capitalize(&two), true)
            } else {
                self.pos += 1;
                (first.to_ascii_uppercase().to_string(), true)
            }
        } else if first == '*' {
            return Err(SmilesError::UnsupportedElement {
                pos: symbol_pos,
                symbol: "*".into(),
            });
        } else {
            return Err(SmilesError::UnexpectedChar { pos: symbol_pos, ch: first });
        };
        let element = Element::from_symbol(&symbol).ok_or_else(|| SmilesError::UnsupportedElement {
            pos: symbol_pos,
            symbol: symbol.clone(),
        })?;
        if aromatic && !element.is_aromatic_capable() {
            return Err(SmilesError::UnexpectedChar { pos: symbol_pos, ch: first });
        }

        // Stereo is not represented; chirality marks are read and dropped.
        while self.peek() == Some('@') {
            self.pos += 1;
        }
        if let Some(class) = self.chars.get(self.pos..self.pos + 2) {
            let class: String = class.iter().collect();
            if matches!(class.as_str(), "TH" | "AL" | "SP" | "TB" | "OH") {
                self.pos += 2;
                self.skip_digits();
            }
        }

        let mut hydrogens = 0;
        if self.peek() == Some('H') {
            self.pos += 1;
            let at = self.pos;
            let count = if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.read_number()
            } else {
                Some(1)
            };
            hydrogens = match count {
                Some(n) if n <= MAX_BRACKET_COUNT => n as u8,
                _ => return Err(SmilesError::OutOfRange { pos: at, field: "hydrogen count" }),
            };
        }

        let mut charge: i8 = 0;
        if let Some(sign @ ('+' | '-')) = self.peek() {
            let unit: i8 = if sign == '+' { 1 } else { -1 };
            self.pos += 1;
            let at = self.pos;
            let magnitude = if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.read_number()
            } else {
                let mut n: u32 = 1;
                while self.peek() == Some(sign) {
                    n = n.saturating_add(1);
                    self.pos += 1;
                }
                Some(n)
            };
            charge = match magnitude {
                Some(n) if n <= MAX_BRACKET_COUNT => unit * n as i8,
                _ => return Err(SmilesError::OutOfRange { pos: at, field: "charge" }),
            };
        }

        if self.peek() == Some(':') {
            self.pos += 1;
            self.skip_digits();
        }

        match self.peek() {
            Some(']') => {
                self.pos += 1;
                Ok(BracketAtom {
                    element,
                    aromatic,
                    hydrogens,
                    charge,
                })
            }
            Some(ch) => Err(SmilesError::UnexpectedChar { pos: self.pos, ch }),
            None => Err(SmilesError::UnclosedBracket { pos: open }),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_digits(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
    }

    fn read_number(&mut self) -> Option<u32> {
        let start = self.pos;
        self.skip_digits();
        let digits: String = self.chars[start..self.pos].iter().collect();
        digits.parse().ok()
    }

    fn assign_hydrogens(&mut self) {
        let atoms: Vec<NodeIndex> = self.mol.atoms().collect();
        for idx in atoms {
            let h = match self.bracket_h[idx.index()] {
                Some(h) => h,
                None => {
                    let atom = self.mol.atom(idx);
                    let unresolved = atom.is_aromatic
                        && self
                            .mol
                            .bonds_of(idx)
                            .any(|e| self.mol.bond(e).order == BondOrder::Aromatic);
                    atom.element()
                        .and_then(|elem| {
                            implicit_hydrogens(elem, bond_order_sum(&self.mol, idx), 0, unresolved)
                        })
                        .unwrap_or(0)
                }
            };
            self.mol.atom_mut(idx).hydrogen_count = h;
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}
