/// Elements accepted by the prediction pipeline.
///
/// Anything outside this table is treated as an atypical element: the SMILES
/// reader rejects it and the pipeline reports a structural error for the
/// molecule. The set covers what drug-like small molecules are built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Element {
    H = 1,
    B = 5,
    C = 6,
    N = 7,
    O = 8,
    F = 9,
    Si = 14,
    P = 15,
    S = 16,
    Cl = 17,
    Se = 34,
    Br = 35,
    I = 53,
}

const ALL: [Element; 13] = [
    Element::H,
    Element::B,
    Element::C,
    Element::N,
    Element::O,
    Element::F,
    Element::Si,
    Element::P,
    Element::S,
    Element::Cl,
    Element::Se,
    Element::Br,
    Element::I,
];

impl Element {
    pub fn from_atomic_num(n: u8) -> Option<Element> {
        ALL.iter().copied().find(|e| *e as u8 == n)
    }

    pub fn from_symbol(s: &str) -> Option<Element> {
        ALL.iter().copied().find(|e| e.symbol() == s)
    }

    pub fn atomic_num(self) -> u8 {
        self as u8
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Element::H => "H",
            Element::B => "B",
            Element::C => "C",
            Element::N => "N",
            Element::O => "O",
            Element::F => "F",
            Element::Si => "Si",
            Element::P => "P",
            Element::S => "S",
            Element::Cl => "Cl",
            Element::Se => "Se",
            Element::Br => "Br",
            Element::I => "I",
        }
    }

    /// Valence states tried in ascending order when assigning implicit hydrogens.
    pub fn default_valences(self) -> &'static [u8] {
        match self {
            Element::H => &[1],
            Element::B => &[3],
            Element::C | Element::Si => &[4],
            Element::N | Element::P => &[3, 5],
            Element::O => &[2],
            Element::F | Element::Cl | Element::Br => &[1],
            Element::S | Element::Se => &[2, 4, 6],
            Element::I => &[1, 3, 5, 7],
        }
    }

    /// Pauling electronegativity.
    pub fn electronegativity(self) -> f64 {
        match self {
            Element::H => 2.20,
            Element::B => 2.04,
            Element::C => 2.55,
            Element::N => 3.04,
            Element::O => 3.44,
            Element::F => 3.98,
            Element::Si => 1.90,
            Element::P => 2.19,
            Element::S => 2.58,
            Element::Cl => 3.16,
            Element::Se => 2.55,
            Element::Br => 2.96,
            Element::I => 2.66,
        }
    }

    /// Static atomic polarizability in Å³.
    pub fn polarizability(self) -> f64 {
        match self {
            Element::H => 0.667,
            Element::B => 3.03,
            Element::C => 1.76,
            Element::N => 1.10,
            Element::O => 0.802,
            Element::F => 0.557,
            Element::Si => 5.38,
            Element::P => 3.63,
            Element::S => 2.90,
            Element::Cl => 2.18,
            Element::Se => 3.77,
            Element::Br => 3.05,
            Element::I => 5.35,
        }
    }

    /// Atoms written without brackets in SMILES when their valence allows it.
    pub fn is_organic_subset(self) -> bool {
        matches!(
            self,
            Element::B
                | Element::C
                | Element::N
                | Element::O
                | Element::P
                | Element::S
                | Element::F
                | Element::Cl
                | Element::Br
                | Element::I
        )
    }

    /// Elements that may take part in an aromatic ring.
    pub fn is_aromatic_capable(self) -> bool {
        matches!(
            self,
            Element::B | Element::C | Element::N | Element::O | Element::P | Element::S | Element::Se
        )
    }
}
