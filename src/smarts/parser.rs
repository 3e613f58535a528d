use std::collections::BTreeMap;

use petgraph::graph::NodeIndex;

use crate::element::Element;
use crate::mol::Mol;

use super::error::SmartsError;
use super::query::{AtomExpr, BondExpr};

const BOND_CHARS: [char; 12] = ['-', '=', '#', ':', '~', '@', '!', '&', ',', ';', '/', '\\'];

pub(crate) fn parse(s: &str) -> Result<Mol<AtomExpr, BondExpr>, SmartsError> {
    if s.trim().is_empty() {
        return Err(SmartsError::EmptyInput);
    }
    let mut parser = Parser {
        chars: s.chars().collect(),
        pos: 0,
        mol: Mol::new(),
        prev: None,
        branches: Vec::new(),
        pending: None,
        rings: BTreeMap::new(),
    };
    parser.run()?;
    Ok(parser.mol)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    mol: Mol<AtomExpr, BondExpr>,
    prev: Option<NodeIndex>,
    branches: Vec<(Option<NodeIndex>, usize)>,
    pending: Option<BondExpr>,
    rings: BTreeMap<u16, (NodeIndex, Option<BondExpr>)>,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn unexpected(&self) -> SmartsError {
        match self.peek() {
            Some(ch) => SmartsError::UnexpectedChar { pos: self.pos, ch },
            None => SmartsError::UnexpectedEnd,
        }
    }

    fn run(&mut self) -> Result<(), SmartsError> {
        while let Some(ch) = self.peek() {
            match ch {
                ' ' | '\t' => self.pos += 1,
                '[' => {
                    let expr = self.bracket()?;
                    self.push_atom(expr);
                }
                '(' => {
                    if self.prev.is_none() {
                        return Err(self.unexpected());
                    }
                    self.branches.push((self.prev, self.pos));
                    self.pos += 1;
                }
                ')' => {
                    let Some((atom, _)) = self.branches.pop() else {
                        return Err(SmartsError::UnmatchedParen { pos: self.pos });
                    };
                    self.prev = atom;
                    self.pos += 1;
                }
                '.' => {
                    self.prev = None;
                    self.pos += 1;
                }
                c if BOND_CHARS.contains(&c) => {
                    if self.prev.is_none() || self.pending.is_some() {
                        return Err(self.unexpected());
                    }
                    let start = self.pos;
                    while self.peek().is_some_and(|c| BOND_CHARS.contains(&c)) {
                        self.pos += 1;
                    }
                    let text: Vec<char> = self.chars[start..self.pos].to_vec();
                    self.pending = Some(parse_bond_expr(&text, start)?);
                }
                '0'..='9' => {
                    let digit = ch.to_digit(10).unwrap_or_default() as u16;
                    self.pos += 1;
                    self.ring_bond(digit)?;
                }
                '%' => {
                    let start = self.pos;
                    self.pos += 1;
                    let digit = self.number().ok_or(SmartsError::UnexpectedChar { pos: start, ch })?;
                    self.ring_bond(digit as u16)?;
                }
                _ => {
                    let expr = self.organic_atom()?;
                    self.push_atom(expr);
                }
            }
        }
        if let Some((_, pos)) = self.branches.first() {
            return Err(SmartsError::UnmatchedParen { pos: *pos });
        }
        if let Some(&digit) = self.rings.keys().next() {
            return Err(SmartsError::UnclosedRing { digit });
        }
        if self.pending.is_some() {
            return Err(SmartsError::UnexpectedEnd);
        }
        if self.mol.atom_count() == 0 {
            return Err(SmartsError::EmptyInput);
        }
        Ok(())
    }

    fn push_atom(&mut self, expr: AtomExpr) {
        let idx = self.mol.add_atom(expr);
        if let Some(prev) = self.prev {
            let bond = self.pending.take().unwrap_or(BondExpr::SingleOrAromatic);
            self.mol.add_bond(prev, idx, bond);
        }
        self.prev = Some(idx);
    }

    fn ring_bond(&mut self, digit: u16) -> Result<(), SmartsError> {
        let Some(current) = self.prev else {
            return Err(SmartsError::UnclosedRing { digit });
        };
        let here = self.pending.take();
        match self.rings.remove(&digit) {
            None => {
                self.rings.insert(digit, (current, here));
            }
            Some((open, bond)) => {
                let bond = here.or(bond).unwrap_or(BondExpr::SingleOrAromatic);
                self.mol.add_bond(open, current, bond);
            }
        }
        Ok(())
    }

    fn organic_atom(&mut self) -> Result<AtomExpr, SmartsError> {
        let ch = self.peek().ok_or(SmartsError::UnexpectedEnd)?;
        let expr = match ch {
            '*' => AtomExpr::True,
            'a' => AtomExpr::Aromatic,
            'A' => AtomExpr::Aliphatic,
            _ => return self.element_symbol().ok_or_else(|| self.unexpected()),
        };
        self.pos += 1;
        Ok(expr)
    }

    /// Reads an element symbol; uppercase is aliphatic, lowercase aromatic.
    fn element_symbol(&mut self) -> Option<AtomExpr> {
        let ch = self.peek()?;
        let next = self.chars.get(self.pos + 1).copied();
        let (symbol, len) = match (ch, next) {
            ('C', Some('l')) => ("Cl".to_string(), 2),
            ('B', Some('r')) => ("Br".to_string(), 2),
            ('S', Some('e')) => ("Se".to_string(), 2),
            ('S', Some('i')) => ("Si".to_string(), 2),
            ('s', Some('e')) => ("Se".to_string(), 2),
            ('B' | 'C' | 'N' | 'O' | 'P' | 'S' | 'F' | 'I', _) => (ch.to_string(), 1),
            ('b' | 'c' | 'n' | 'o' | 'p' | 's', _) => (ch.to_ascii_uppercase().to_string(), 1),
            _ => return None,
        };
        let element = Element::from_symbol(&symbol)?;
        self.pos += len;
        Some(AtomExpr::Element {
            atomic_num: element.atomic_num(),
            aromatic: Some(ch.is_ascii_lowercase()),
        })
    }

    fn number(&mut self) -> Option<u32> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        let digits: String = self.chars[start..self.pos].iter().collect();
        digits.parse().ok()
    }

    fn bracket(&mut self) -> Result<AtomExpr, SmartsError> {
        let open = self.pos;
        self.pos += 1;
        let expr = self.low_and().map_err(|e| match e {
            SmartsError::UnexpectedEnd => SmartsError::UnclosedBracket { pos: open },
            other => other,
        })?;
        match self.peek() {
            Some(']') => {
                self.pos += 1;
                Ok(expr)
            }
            Some(_) => Err(self.unexpected()),
            None => Err(SmartsError::UnclosedBracket { pos: open }),
        }
    }

    fn low_and(&mut self) -> Result<AtomExpr, SmartsError> {
        let mut parts = vec![self.or()?];
        while self.peek() == Some(';') {
            self.pos += 1;
            parts.push(self.or()?);
        }
        Ok(combine(parts, AtomExpr::And))
    }

    fn or(&mut self) -> Result<AtomExpr, SmartsError> {
        let mut parts = vec![self.high_and()?];
        while self.peek() == Some(',') {
            self.pos += 1;
            parts.push(self.high_and()?);
        }
        Ok(combine(parts, AtomExpr::Or))
    }

    fn high_and(&mut self) -> Result<AtomExpr, SmartsError> {
        let mut parts = vec![self.unary()?];
        loop {
            match self.peek() {
                Some('&') => {
                    self.pos += 1;
                    parts.push(self.unary()?);
                }
                Some(']' | ',' | ';') | None => break,
                Some(_) => parts.push(self.unary()?),
            }
        }
        Ok(combine(parts, AtomExpr::And))
    }

    fn unary(&mut self) -> Result<AtomExpr, SmartsError> {
        if self.peek() == Some('!') {
            self.pos += 1;
            return Ok(AtomExpr::Not(Box::new(self.unary()?)));
        }
        self.primitive()
    }

    fn count_or(&mut self, default: u32) -> u8 {
        self.number().unwrap_or(default).min(u8::MAX as u32) as u8
    }

    fn primitive(&mut self) -> Result<AtomExpr, SmartsError> {
        let ch = self.peek().ok_or(SmartsError::UnexpectedEnd)?;
        let start = self.pos;
        let expr = match ch {
            '$' => return Err(SmartsError::RecursiveUnsupported { pos: start }),
            '*' | 'a' | 'A' => return self.organic_atom(),
            '#' => {
                self.pos += 1;
                let n = self.number().ok_or(SmartsError::InvalidAtomicNum { pos: start })?;
                let atomic_num = u8::try_from(n).map_err(|_| SmartsError::InvalidAtomicNum { pos: start })?;
                AtomExpr::Element {
                    atomic_num,
                    aromatic: None,
                }
            }
            'H' => {
                self.pos += 1;
                AtomExpr::TotalHCount(self.count_or(1))
            }
            'D' => {
                self.pos += 1;
                AtomExpr::Degree(self.count_or(1))
            }
            'X' => {
                self.pos += 1;
                AtomExpr::Connectivity(self.count_or(1))
            }
            'v' => {
                self.pos += 1;
                AtomExpr::Valence(self.count_or(1))
            }
            'R' => {
                self.pos += 1;
                match self.number() {
                    Some(n) => AtomExpr::RingMembership(n as u8),
                    None => AtomExpr::InRing,
                }
            }
            'r' => {
                self.pos += 1;
                match self.number() {
                    Some(n) => AtomExpr::SmallestRingSize(n as u8),
                    None => AtomExpr::InRing,
                }
            }
            'x' => {
                self.pos += 1;
                match self.number() {
                    Some(n) => AtomExpr::RingBondCount(n as u8),
                    None => AtomExpr::Not(Box::new(AtomExpr::RingBondCount(0))),
                }
            }
            '+' | '-' => {
                let unit: i8 = if ch == '+' { 1 } else { -1 };
                self.pos += 1;
                let charge = match self.number() {
                    Some(n) => unit * n.min(8) as i8,
                    None => {
                        let mut charge = unit;
                        while self.peek() == Some(ch) {
                            charge += unit;
                            self.pos += 1;
                        }
                        charge
                    }
                };
                AtomExpr::Charge(charge)
            }
            ':' => {
                self.pos += 1;
                let n = self.number().ok_or_else(|| self.unexpected())?;
                AtomExpr::MapClass(n as u16)
            }
            _ => return self.element_symbol().ok_or_else(|| self.unexpected()),
        };
        Ok(expr)
    }
}

fn combine<T>(mut parts: Vec<T>, wrap: fn(Vec<T>) -> T) -> T {
    if parts.len() == 1 {
        parts.remove(0)
    } else {
        wrap(parts)
    }
}

/// Bond expressions use the same precedence as atoms: `!`, implicit and
/// `&`, then `,`, then `;`.
fn parse_bond_expr(text: &[char], offset: usize) -> Result<BondExpr, SmartsError> {
    let low: Vec<BondExpr> = text
        .split(|&c| c == ';')
        .map(|part| {
            let ors: Vec<BondExpr> = part
                .split(|&c| c == ',')
                .map(|part| {
                    let ands: Vec<BondExpr> = part
                        .split(|&c| c == '&')
                        .map(|seq| bond_sequence(seq, offset))
                        .collect::<Result<_, _>>()?;
                    Ok(combine(ands, BondExpr::And))
                })
                .collect::<Result<_, SmartsError>>()?;
            Ok(combine(ors, BondExpr::Or))
        })
        .collect::<Result<_, SmartsError>>()?;
    Ok(combine(low, BondExpr::And))
}

fn bond_sequence(seq: &[char], offset: usize) -> Result<BondExpr, SmartsError> {
    let mut parts = Vec::new();
    let mut negate = false;
    for &c in seq {
        let primitive = match c {
            '!' => {
                negate = !negate;
                continue;
            }
            '-' | '/' | '\\' => BondExpr::Single,
            '=' => BondExpr::Double,
            '#' => BondExpr::Triple,
            ':' => BondExpr::Aromatic,
            '~' => BondExpr::True,
            '@' => BondExpr::Ring,
            _ => return Err(SmartsError::UnexpectedChar { pos: offset, ch: c }),
        };
        parts.push(if negate {
            BondExpr::Not(Box::new(primitive))
        } else {
            primitive
        });
        negate = false;
    }
    if negate || parts.is_empty() {
        return Err(SmartsError::UnexpectedEnd);
    }
    Ok(combine(parts, BondExpr::And))
}
