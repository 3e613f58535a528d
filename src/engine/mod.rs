//! Rule-driven metabolite generation.
//!
//! For every rule the engine matches the reactant template against a
//! prepared copy of the parent, gates each mapping on the parent's SoM
//! probabilities, applies the reaction and turns each valid product fragment
//! into a scored [`Candidate`].

mod candidate;

use std::collections::HashSet;

use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::aromaticity::perceive_aromaticity;
use crate::atom::Atom;
use crate::bond::Bond;
use crate::canonical::to_canonical_smiles;
use crate::element::Element;
use crate::graph_ops::get_fragments;
use crate::kekulize::{kekulize, KekulizeError};
use crate::mol::Mol;
use crate::rules::Rule;
use crate::smarts::MatchContext;
use crate::smiles::to_smiles;
use crate::substruct::Mapping;

pub use candidate::{Candidate, CandidateSet, DedupMode, RankedCandidate};

/// How the SoM cutoff gates mappings.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CutoffMode {
    /// Every mapping is accepted.
    #[default]
    Disabled,
    /// Mappings without a heavy atom at or above `cutoff` are dropped.
    Exclude { cutoff: f64 },
    /// Mappings are always accepted; those below `cutoff` are tagged as
    /// failed and scored 0.
    ZeroScore { cutoff: f64 },
}

impl CutoffMode {
    fn cutoff(self) -> Option<f64> {
        match self {
            CutoffMode::Disabled => None,
            CutoffMode::Exclude { cutoff } | CutoffMode::ZeroScore { cutoff } => Some(cutoff),
        }
    }
}

/// Identity of a mapped atom for symmetry collapsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ClassKey {
    Class(u32),
    /// Atom without an equivalence class; only equal to itself.
    Atom(usize),
}

fn class_signature(mol: &Mol<Atom, Bond>, mapping: &Mapping) -> Vec<ClassKey> {
    mapping
        .iter()
        .map(|&(_, t)| match mol.atom(t).equivalence_class {
            Some(c) => ClassKey::Class(c),
            None => ClassKey::Atom(t.index()),
        })
        .collect()
}

/// Highest SoM probability among the mapping's heavy atoms.
fn max_probability(mol: &Mol<Atom, Bond>, mapping: &Mapping) -> f64 {
    mapping
        .iter()
        .map(|&(_, t)| mol.atom(t))
        .filter(|a| !a.is_hydrogen())
        .map(Atom::som_probability)
        .fold(0.0, f64::max)
}

/// First carbon left without an atom type by the rewrite.
fn untyped_carbon(mol: &Mol<Atom, Bond>) -> Option<NodeIndex> {
    mol.atoms().find(|&i| {
        let atom = mol.atom(i);
        atom.element() == Some(Element::C) && atom.atom_type.is_none()
    })
}

#[derive(Debug, Clone, Default)]
pub struct TransformationEngine {
    cutoff: CutoffMode,
    symmetry_filter: bool,
    dedup: DedupMode,
}

impl TransformationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cutoff(mut self, cutoff: CutoffMode) -> Self {
        self.cutoff = cutoff;
        self
    }

    pub fn with_symmetry_filter(mut self, enabled: bool) -> Self {
        self.symmetry_filter = enabled;
        self
    }

    pub fn with_dedup(mut self, dedup: DedupMode) -> Self {
        self.dedup = dedup;
        self
    }

    /// Runs `rules` in order against `mol`, which should carry SoM
    /// predictions and, for the symmetry filter, equivalence classes.
    ///
    /// Only preparing the parent can fail; problems with single mappings
    /// are logged and skipped.
    pub fn transform(
        &self,
        mol: &Mol<Atom, Bond>,
        parent_id: &str,
        rules: &[Rule],
    ) -> Result<CandidateSet, KekulizeError> {
        let mut prepared = mol.clone();
        kekulize(&mut prepared)?;
        perceive_aromaticity(&mut prepared);
        let parent_canonical = to_canonical_smiles(&prepared);
        let ctx = MatchContext::new(&prepared);

        let mut out = CandidateSet::new(self.dedup);
        for rule in rules {
            self.apply_rule(&ctx, parent_id, &parent_canonical, rule, &mut out);
        }
        debug!(
            molecule = parent_id,
            rules = rules.len(),
            candidates = out.len(),
            "generated metabolites"
        );
        Ok(out)
    }

    fn apply_rule(
        &self,
        ctx: &MatchContext,
        parent_id: &str,
        parent_canonical: &str,
        rule: &Rule,
        out: &mut CandidateSet,
    ) {
        let mol = ctx.mol;
        let mut mappings = rule.reaction().mappings(ctx);
        if mappings.is_empty() {
            return;
        }
        if self.symmetry_filter {
            let before = mappings.len();
            let mut seen = HashSet::new();
            mappings.retain(|m| seen.insert(class_signature(mol, m)));
            debug!(
                molecule = parent_id,
                rule = %rule.name,
                before,
                after = mappings.len(),
                "collapsed symmetric mappings"
            );
        }

        for mapping in &mappings {
            let mapped: Vec<usize> = {
                let mut atoms: Vec<usize> = mapping.iter().map(|&(_, t)| t.index()).collect();
                atoms.sort_unstable();
                atoms
            };
            let probability = max_probability(mol, mapping);
            let passed_cutoff = self.cutoff.cutoff().is_none_or(|c| probability >= c);
            if !passed_cutoff && matches!(self.cutoff, CutoffMode::Exclude { .. }) {
                debug!(
                    molecule = parent_id,
                    rule = %rule.name,
                    mapping = ?mapped,
                    probability,
                    "below cutoff"
                );
                continue;
            }

            let product = match rule.reaction().apply(mol, mapping) {
                Ok(product) => product,
                Err(err) => {
                    warn!(
                        molecule = parent_id,
                        rule = %rule.name,
                        mapping = ?mapped,
                        error = %err,
                        "rule application failed"
                    );
                    continue;
                }
            };
            let score = if passed_cutoff {
                rule.priority * probability
            } else {
                0.0
            };
            for fragment in get_fragments(&product) {
                let canonical_id = to_canonical_smiles(&fragment);
                if canonical_id == parent_canonical {
                    continue;
                }
                if let Some(atom) = untyped_carbon(&fragment) {
                    debug!(
                        molecule = parent_id,
                        rule = %rule.name,
                        mapping = ?mapped,
                        fragment = %canonical_id,
                        atom = atom.index(),
                        "rejected fragment with untyped carbon"
                    );
                    continue;
                }
                out.insert(Candidate {
                    smiles: to_smiles(&fragment),
                    canonical_id,
                    parent_id: parent_id.to_string(),
                    rule: rule.name.clone(),
                    phase: rule.phase,
                    family: rule.family.clone(),
                    score,
                    passed_cutoff,
                    mapped_atoms: mapped.clone(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::SomPrediction;
    use crate::atom_type::assign_atom_types;
    use crate::canonical::assign_equivalence_classes;
    use crate::rules::Phase;
    use crate::smiles::from_smiles;

    fn annotated(smiles: &str, probabilities: &[f64]) -> Mol<Atom, Bond> {
        let mut mol = from_smiles(smiles).unwrap();
        assign_atom_types(&mut mol).unwrap();
        assign_equivalence_classes(&mut mol);
        for (i, &p) in probabilities.iter().enumerate() {
            mol.atom_mut(NodeIndex::new(i)).som = Some(SomPrediction {
                probability: p,
                ad_score: None,
                is_site: p >= 0.5,
            });
        }
        mol
    }

    fn rule(name: &str, pattern: &str, priority: f64) -> Rule {
        Rule::new(name, pattern, priority, Phase::Phase1, "CYP").unwrap()
    }

    fn canonical(smiles: &str) -> String {
        to_canonical_smiles(&from_smiles(smiles).unwrap())
    }

    #[test]
    fn score_is_priority_times_max_probability() {
        let mol = annotated("CCO", &[0.4, 0.9, 0.1]);
        let rules = [rule("hydroxylation", "[CX4;!H0:1]>>[C:1][OH]", 0.5)];
        let set = TransformationEngine::new().transform(&mol, "ethanol", &rules).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.get(&canonical("OCCO")).unwrap().score, 0.2);
        let gem = set.get(&canonical("CC(O)O")).unwrap();
        assert_eq!(gem.score, 0.45);
        assert_eq!(gem.mapped_atoms, [1]);
        assert_eq!(gem.parent_id, "ethanol");
        assert!(gem.passed_cutoff);
    }

    #[test]
    fn exclude_drops_and_zero_score_keeps() {
        let mol = annotated("CCO", &[0.4, 0.9, 0.1]);
        let rules = [rule("hydroxylation", "[CX4;!H0:1]>>[C:1][OH]", 1.0)];

        let excluded = TransformationEngine::new()
            .with_cutoff(CutoffMode::Exclude { cutoff: 0.5 })
            .transform(&mol, "m", &rules)
            .unwrap();
        assert_eq!(excluded.len(), 1);
        assert!(excluded.contains(&canonical("CC(O)O")));

        let zeroed = TransformationEngine::new()
            .with_cutoff(CutoffMode::ZeroScore { cutoff: 0.5 })
            .transform(&mol, "m", &rules)
            .unwrap();
        assert_eq!(zeroed.len(), 2);
        let failed = zeroed.get(&canonical("OCCO")).unwrap();
        assert!(!failed.passed_cutoff);
        assert_eq!(failed.score, 0.0);
    }

    #[test]
    fn products_equal_to_parent_are_dropped() {
        let mol = annotated("CC(=O)OC", &[0.5; 5]);
        // Swaps nothing: the product template equals the reactant template.
        let rules = [rule("noop", "[C:1]=[O:2]>>[C:1]=[O:2]", 1.0)];
        let set = TransformationEngine::new().transform(&mol, "m", &rules).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn fragments_are_separate_candidates() {
        let mol = annotated("COc1ccccc1", &[0.8, 0.2, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1]);
        let rules = [rule("o_dealkylation", "[OX2;H0:1]-!@[CX4;!H0:2]>>[O:1].[C:2]=O", 1.0)];
        let set = TransformationEngine::new().transform(&mol, "anisole", &rules).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.contains(&canonical("Oc1ccccc1")));
        assert!(set.contains(&canonical("C=O")));
        assert!(set.iter().all(|c| c.score == 0.8));
    }

    #[test]
    fn invalid_fragment_does_not_discard_its_siblings() {
        let mol = annotated("CC(C)(C)OC", &[0.8; 6]);
        let rules = [rule("split", "[CX4;H0:1]-[O:2]>>[C:1](O)O.[O:2]", 1.0)];
        let set = TransformationEngine::new().transform(&mol, "mtbe", &rules).unwrap();
        assert_eq!(set.len(), 1);
        let methanol = set.get(&canonical("CO")).unwrap();
        assert_eq!(methanol.score, 0.8);
        assert_eq!(methanol.mapped_atoms, [1, 4]);
    }

    #[test]
    fn symmetry_filter_collapses_equivalent_mappings() {
        let mol = annotated("c1ccccc1", &[0.3; 6]);
        let rules = [rule("aromatic_hydroxylation", "[cH:1]>>[c:1][OH]", 1.0)];
        let engine = TransformationEngine::new();
        let mut seen = 0;
        let ctx = MatchContext::new(&mol);
        let mappings = rules[0].reaction().mappings(&ctx);
        assert_eq!(mappings.len(), 6);
        let mut signatures = HashSet::new();
        for m in &mappings {
            if signatures.insert(class_signature(&mol, m)) {
                seen += 1;
            }
        }
        assert_eq!(seen, 1);
        // Both settings reach the same single structure.
        let filtered = engine.clone().with_symmetry_filter(true).transform(&mol, "m", &rules).unwrap();
        let unfiltered = engine.transform(&mol, "m", &rules).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(unfiltered.len(), 1);
        assert_eq!(filtered.ranked(), unfiltered.ranked());
    }

    #[test]
    fn untyped_carbon_rejects_the_product() {
        let mol = annotated("CC(C)(C)C", &[0.5; 5]);
        let rules = [rule("bad", "[CX4;H0:1]>>[C:1]O", 1.0)];
        let set = TransformationEngine::new().transform(&mol, "m", &rules).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn unannotated_atoms_score_zero() {
        let mol = annotated("CC", &[]);
        let rules = [rule("hydroxylation", "[CX4;!H0:1]>>[C:1][OH]", 1.0)];
        let set = TransformationEngine::new().transform(&mol, "m", &rules).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.iter().next().unwrap().score, 0.0);
    }
}
