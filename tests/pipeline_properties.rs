use std::collections::BTreeMap;
use std::sync::Arc;

use somcrab::scorer::{ClassProbabilities, FeatureVector};
use somcrab::{
    CandidateSet, Combination, CutoffMode, DedupMode, DescriptorGroup, InputMolecule, Phase, Prediction,
    PredictorConfig, Predictor, ProbabilityModel, Rule, RuleCatalog, ScoringError,
};

/// Fixed site probability per atom type.
struct TypeModel(BTreeMap<&'static str, f64>);

impl TypeModel {
    fn new(pairs: &[(&'static str, f64)]) -> Self {
        Self(pairs.iter().copied().collect())
    }
}

impl ProbabilityModel for TypeModel {
    fn evaluate(&self, features: &FeatureVector) -> Result<ClassProbabilities, ScoringError> {
        let site = self
            .0
            .iter()
            .find(|(ty, _)| features.contains_key(&format!("atom_type_{ty}")))
            .map_or(0.0, |(_, &p)| p);
        Ok(ClassProbabilities::from_site(site))
    }
}

/// Probability follows the hydrogen count, so every molecule gets a spread.
struct HydrogenModel;

impl ProbabilityModel for HydrogenModel {
    fn evaluate(&self, features: &FeatureVector) -> Result<ClassProbabilities, ScoringError> {
        let h = features.get("hydrogens").copied().unwrap_or(0.0);
        let charge = features.get("charge").copied().unwrap_or(0.0);
        Ok(ClassProbabilities::from_site((0.2 * h + charge.abs()).min(1.0)))
    }
}

const DRUGS: &[&str] = &[
    "CC(=O)Nc1ccc(O)cc1",
    "CC(C)Cc1ccc(cc1)C(C)C(=O)O",
    "COc1ccc2[nH]cc(CCN(C)C)c2c1",
    "CCOC(=O)c1ccc(N)cc1",
    "CSc1ccc(O)c(O)c1",
    "CN(C)CCC=C1c2ccccc2CCc2ccccc12",
];

fn rule(name: &str, pattern: &str, priority: f64) -> Rule {
    Rule::new(name, pattern, priority, Phase::Phase1, "CYP").unwrap()
}

fn predictor_with(config: PredictorConfig, model: impl ProbabilityModel + 'static, rules: Vec<Rule>) -> Predictor {
    let catalog = RuleCatalog::new(rules).unwrap();
    Predictor::new(config, Arc::new(model), Arc::new(catalog)).unwrap()
}

fn builtin_predictor(config: PredictorConfig) -> Predictor {
    Predictor::new(config, Arc::new(HydrogenModel), Arc::new(RuleCatalog::builtin().unwrap())).unwrap()
}

fn predict(p: &Predictor, smiles: &str) -> Prediction {
    p.predict(&InputMolecule::new("m", smiles)).outcome.unwrap()
}

fn scores(set: &CandidateSet) -> BTreeMap<String, f64> {
    set.iter().map(|c| (c.canonical_id.clone(), c.score)).collect()
}

#[test]
fn priority_is_weight_times_probability() {
    let p = predictor_with(
        PredictorConfig::default(),
        TypeModel::new(&[("C.3", 0.9), ("S.3", 0.95)]),
        vec![
            rule("hydroxylation", "[CX4;!H0:1]>>[C:1][OH]", 1.0),
            rule("s_oxidation", "[SX2;H0:1]>>[S:1]=O", 0.2),
        ],
    );
    let prediction = predict(&p, "CSC");
    assert_eq!(prediction.ranked.len(), 2);
    let first = &prediction.ranked[0].candidate;
    let second = &prediction.ranked[1].candidate;
    assert_eq!(first.rule, "hydroxylation");
    assert!((first.score - 0.9).abs() < 1e-12);
    assert_eq!(second.rule, "s_oxidation");
    assert!((second.score - 0.19).abs() < 1e-12);
}

#[test]
fn identical_products_keep_the_higher_score() {
    let model = || TypeModel::new(&[("C.3", 1.0)]);
    for rules in [
        vec![rule("weak", "[CH3:1]>>[C:1]O", 0.3), rule("strong", "[CX4:1]>>[C:1][OH]", 0.7)],
        vec![rule("strong", "[CX4:1]>>[C:1][OH]", 0.7), rule("weak", "[CH3:1]>>[C:1]O", 0.3)],
    ] {
        let p = predictor_with(PredictorConfig::default(), model(), rules);
        let prediction = predict(&p, "CC");
        assert_eq!(prediction.candidates.len(), 1);
        let kept = prediction.candidates.iter().next().unwrap();
        assert!((kept.score - 0.7).abs() < 1e-12);
        assert_eq!(kept.rule, "strong");
    }

    let keep_first = PredictorConfig {
        dedup: DedupMode::KeepFirst,
        ..PredictorConfig::default()
    };
    let p = predictor_with(
        keep_first,
        model(),
        vec![rule("weak", "[CH3:1]>>[C:1]O", 0.3), rule("strong", "[CX4:1]>>[C:1][OH]", 0.7)],
    );
    let kept = predict(&p, "CC").candidates.iter().next().cloned().unwrap();
    assert_eq!(kept.rule, "weak");
}

#[test]
fn predictions_are_deterministic() {
    let p = builtin_predictor(PredictorConfig::default());
    for smiles in DRUGS {
        let a = predict(&p, smiles);
        let b = predict(&p, smiles);
        assert_eq!(a.ranked, b.ranked, "{smiles}");
        assert_eq!(a.atoms, b.atoms, "{smiles}");
    }

    let inputs: Vec<InputMolecule> = DRUGS
        .iter()
        .enumerate()
        .map(|(i, s)| InputMolecule::new(format!("drug{i}"), *s))
        .collect();
    let batch = p.predict_batch(&inputs);
    assert_eq!(batch.len(), inputs.len());
    for (result, input) in batch.iter().zip(&inputs) {
        assert_eq!(result.id, input.id);
        let single = p.predict(input);
        assert_eq!(result.prediction().unwrap().ranked, single.prediction().unwrap().ranked);
    }
}

#[test]
fn the_parent_is_never_a_candidate() {
    let p = builtin_predictor(PredictorConfig::default());
    for smiles in DRUGS {
        let prediction = predict(&p, smiles);
        assert!(!prediction.candidates.is_empty(), "{smiles}");
        assert!(!prediction.candidates.contains(&prediction.canonical_id), "{smiles}");
    }
}

#[test]
fn ranking_is_descending_and_dense() {
    let p = builtin_predictor(PredictorConfig::default());
    for smiles in DRUGS {
        let ranked = predict(&p, smiles).ranked;
        for (i, r) in ranked.iter().enumerate() {
            assert_eq!(r.rank, i + 1);
        }
        assert!(ranked.windows(2).all(|w| w[0].candidate.score >= w[1].candidate.score));
    }
}

#[test]
fn replace_if_higher_dominates_keep_first() {
    let replace = builtin_predictor(PredictorConfig::default());
    let keep = builtin_predictor(PredictorConfig {
        dedup: DedupMode::KeepFirst,
        ..PredictorConfig::default()
    });
    for smiles in DRUGS {
        let best = scores(&predict(&replace, smiles).candidates);
        let first = scores(&predict(&keep, smiles).candidates);
        assert_eq!(best.keys().collect::<Vec<_>>(), first.keys().collect::<Vec<_>>(), "{smiles}");
        for (id, score) in &best {
            assert!(*score >= first[id], "{smiles}: {id}");
        }
    }
}

#[test]
fn hard_filter_matches_passing_zero_score_candidates() {
    let cutoff = 0.5;
    let exclude = builtin_predictor(PredictorConfig {
        cutoff: CutoffMode::Exclude { cutoff },
        ..PredictorConfig::default()
    });
    let zero = builtin_predictor(PredictorConfig {
        cutoff: CutoffMode::ZeroScore { cutoff },
        ..PredictorConfig::default()
    });
    for smiles in DRUGS {
        let excluded = predict(&exclude, smiles).candidates;
        let zeroed = predict(&zero, smiles).candidates;
        assert!(excluded.iter().all(|c| c.passed_cutoff));
        // Compared by structure: a failed mapping seen first can reserve an
        // earlier slot in the zero-score set.
        let passing: BTreeMap<_, _> = zeroed
            .iter()
            .filter(|c| c.passed_cutoff)
            .map(|c| (c.canonical_id.clone(), c.clone()))
            .collect();
        let kept: BTreeMap<_, _> = excluded.iter().map(|c| (c.canonical_id.clone(), c.clone())).collect();
        assert_eq!(kept, passing, "{smiles}");
        assert!(zeroed.iter().filter(|c| !c.passed_cutoff).all(|c| c.score == 0.0));
    }
}

#[test]
fn zero_depth_aggregation_adds_no_features() {
    let p = builtin_predictor(PredictorConfig {
        neighborhood: vec![
            DescriptorGroup::new(&["charge"], 0, Combination::Mean),
            DescriptorGroup::new(&["count"], 0, Combination::Count),
        ],
        ..PredictorConfig::default()
    });
    let prediction = predict(&p, DRUGS[0]);
    assert!(prediction
        .mol
        .atoms()
        .all(|i| prediction.mol.atom(i).features.is_empty()));
}

#[test]
fn symmetry_filter_does_not_change_the_result_set() {
    let on = builtin_predictor(PredictorConfig::default());
    let off = builtin_predictor(PredictorConfig {
        symmetry_filter: false,
        ..PredictorConfig::default()
    });
    for smiles in DRUGS {
        assert_eq!(
            scores(&predict(&on, smiles).candidates),
            scores(&predict(&off, smiles).candidates),
            "{smiles}"
        );
    }
}
