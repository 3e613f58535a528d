pub mod error;
mod parser;
mod writer;

use crate::aromaticity::perceive_aromaticity;
use crate::atom::Atom;
use crate::bond::Bond;
use crate::kekulize::kekulize;
use crate::mol::Mol;
pub use error::SmilesError;
pub(crate) use writer::write_smiles;
pub use writer::to_smiles;

/// Reads SMILES into a graph without resolving aromaticity: bonds between
/// lowercase atoms keep [`crate::bond::BondOrder::Aromatic`].
pub fn parse_smiles(s: &str) -> Result<Mol<Atom, Bond>, SmilesError> {
    parser::Parser::new(s).parse()
}

/// Reads SMILES, kekulizes it and re-perceives aromaticity.
pub fn from_smiles(s: &str) -> Result<Mol<Atom, Bond>, SmilesError> {
    let mut mol = parse_smiles(s)?;
    kekulize(&mut mol)?;
    perceive_aromaticity(&mut mol);
    Ok(mol)
}
