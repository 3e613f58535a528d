use std::collections::HashSet;

use crate::mol::Mol;
use crate::smarts::{from_smarts, AtomExpr, BondExpr};

use super::error::ReactionError;
use super::Reaction;

/// Parses `reactant>>product`. Either side may hold several dot-separated
/// components; each side becomes one (possibly disconnected) template.
pub fn parse_reaction_smarts(s: &str) -> Result<Reaction, ReactionError> {
    let (reactant_text, product_text) = split_reaction(s.trim())?;

    if reactant_text.trim().is_empty() {
        return Err(ReactionError::EmptyReactants);
    }
    if product_text.trim().is_empty() {
        return Err(ReactionError::EmptyProducts);
    }

    let reactant = parse_section(reactant_text, "reactant")?;
    let product = parse_section(product_text, "product")?;
    Ok(Reaction { reactant, product })
}

fn split_reaction(s: &str) -> Result<(&str, &str), ReactionError> {
    let gt_positions = find_gt_positions(s);
    match gt_positions.as_slice() {
        [] | [_] => Err(ReactionError::MissingSeparator),
        [a, b] if a + 1 == *b => Ok((&s[..*a], &s[*b + 1..])),
        [_, _] => Err(ReactionError::MissingSeparator),
        _ => Err(ReactionError::TooManySeparators),
    }
}

/// Byte offsets of every `>` outside brackets and branches.
fn find_gt_positions(s: &str) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut bracket_depth = 0u32;
    let mut paren_depth = 0u32;

    for (i, ch) in s.char_indices() {
        match ch {
            '[' => bracket_depth += 1,
            ']' => bracket_depth = bracket_depth.saturating_sub(1),
            '(' => paren_depth += 1,
            ')' => paren_depth = paren_depth.saturating_sub(1),
            '>' if bracket_depth == 0 && paren_depth == 0 => positions.push(i),
            _ => {}
        }
    }

    positions
}

fn parse_section(text: &str, section: &'static str) -> Result<Mol<AtomExpr, BondExpr>, ReactionError> {
    let template = from_smarts(text.trim()).map_err(|source| ReactionError::InvalidTemplate { section, source })?;
    let mut seen = HashSet::new();
    for idx in template.atoms() {
        if let Some(map_class) = template.atom(idx).map_class() {
            if !seen.insert(map_class) {
                return Err(ReactionError::DuplicateMapClass { section, map_class });
            }
        }
    }
    Ok(template)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smarts::SmartsError;

    #[test]
    fn splits_on_double_gt() {
        assert_eq!(split_reaction("[C:1]>>[C:1]O").unwrap(), ("[C:1]", "[C:1]O"));
        assert_eq!(split_reaction("C>>").unwrap(), ("C", ""));
    }

    #[test]
    fn separator_errors() {
        assert_eq!(split_reaction("CC").unwrap_err(), ReactionError::MissingSeparator);
        assert_eq!(split_reaction("C>C").unwrap_err(), ReactionError::MissingSeparator);
        assert_eq!(split_reaction("C>O>N").unwrap_err(), ReactionError::MissingSeparator);
        assert_eq!(split_reaction("C>>O>>N").unwrap_err(), ReactionError::TooManySeparators);
    }

    #[test]
    fn sections_must_be_present() {
        assert_eq!(parse_reaction_smarts(">>[C:1]").unwrap_err(), ReactionError::EmptyReactants);
        assert_eq!(parse_reaction_smarts("[C:1]>>").unwrap_err(), ReactionError::EmptyProducts);
    }

    #[test]
    fn template_errors_name_their_section() {
        let err = parse_reaction_smarts("[C:1]Q>>[C:1]O").unwrap_err();
        assert!(matches!(
            err,
            ReactionError::InvalidTemplate {
                section: "reactant",
                source: SmartsError::UnexpectedChar { ch: 'Q', .. }
            }
        ));
        let err = parse_reaction_smarts("[C:1]>>[C:1]Q").unwrap_err();
        assert!(matches!(err, ReactionError::InvalidTemplate { section: "product", .. }));
    }

    #[test]
    fn duplicate_map_classes_are_rejected() {
        let err = parse_reaction_smarts("[C:1][C:1]>>[C:1]").unwrap_err();
        assert_eq!(
            err,
            ReactionError::DuplicateMapClass {
                section: "reactant",
                map_class: 1
            }
        );
    }

    #[test]
    fn dotted_sections_become_one_template() {
        let rxn = parse_reaction_smarts("[N:1][CH3:2]>>[N:1].[C:2]=O").unwrap();
        assert_eq!(rxn.reactant_template().atom_count(), 2);
        assert_eq!(rxn.product_template().atom_count(), 3);
        assert_eq!(rxn.product_template().bond_count(), 1);
    }
}
