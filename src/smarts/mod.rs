mod error;
mod parser;
pub mod query;

pub use error::SmartsError;
pub use query::{AtomExpr, BondExpr, MatchContext};

use crate::atom::Atom;
use crate::bond::Bond;
use crate::mol::Mol;
use crate::substruct::{find_mappings, has_mapping, Mapping};

pub fn from_smarts(s: &str) -> Result<Mol<AtomExpr, BondExpr>, SmartsError> {
    parser::parse(s)
}

pub fn has_smarts_match(target: &Mol<Atom, Bond>, query: &Mol<AtomExpr, BondExpr>) -> bool {
    let ctx = MatchContext::new(target);
    has_mapping(
        target,
        query,
        |t, q| query.atom(q).matches(&ctx, t),
        |t, q| query.bond(q).matches(&ctx, t),
    )
}

/// Every mapping of `query` onto `target`, ring perception done once.
pub fn find_smarts_mappings(target: &Mol<Atom, Bond>, query: &Mol<AtomExpr, BondExpr>) -> Vec<Mapping> {
    let ctx = MatchContext::new(target);
    find_smarts_mappings_in(&ctx, query)
}

/// As [`find_smarts_mappings`] with a caller-held context, for matching many
/// patterns against one molecule.
pub fn find_smarts_mappings_in(ctx: &MatchContext, query: &Mol<AtomExpr, BondExpr>) -> Vec<Mapping> {
    find_mappings(
        ctx.mol,
        query,
        |t, q| query.atom(q).matches(ctx, t),
        |t, q| query.bond(q).matches(ctx, t),
    )
}
