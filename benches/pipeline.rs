use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use somcrab::{InputMolecule, Predictor, PredictorConfig, RuleCatalog, TreeEnsemble};

const MODEL: &str = r#"{
    "threshold": 0.5,
    "trees": [
        {"nodes": [
            {"kind": "split", "field": "hydrogens", "threshold": 1.5, "left": 1, "right": 2},
            {"kind": "leaf", "site": 0.2},
            {"kind": "leaf", "site": 0.8}
        ]},
        {"nodes": [
            {"kind": "split", "field": "atom_type_C.3", "threshold": 0.5, "left": 1, "right": 2},
            {"kind": "leaf", "site": 0.1},
            {"kind": "leaf", "site": 0.9}
        ]}
    ]
}"#;

const DRUGS: &[(&str, &str)] = &[
    ("acetaminophen", "CC(=O)Nc1ccc(O)cc1"),
    ("ibuprofen", "CC(C)Cc1ccc(cc1)C(C)C(=O)O"),
    ("benzocaine", "CCOC(=O)c1ccc(N)cc1"),
    ("amitriptyline", "CN(C)CCC=C1c2ccccc2CCc2ccccc12"),
];

fn predictor() -> Predictor {
    let model = TreeEnsemble::from_json(MODEL).unwrap();
    let catalog = RuleCatalog::builtin().unwrap();
    Predictor::new(PredictorConfig::default(), Arc::new(model), Arc::new(catalog)).unwrap()
}

fn bench_predict(c: &mut Criterion) {
    let predictor = predictor();
    let mut group = c.benchmark_group("predict");
    for &(name, smiles) in DRUGS {
        let input = InputMolecule::new(name, smiles);
        group.bench_function(name, |b| b.iter(|| black_box(predictor.predict(black_box(&input)))));
    }
    group.finish();
}

fn bench_batch(c: &mut Criterion) {
    let predictor = predictor();
    let inputs: Vec<InputMolecule> = DRUGS
        .iter()
        .cycle()
        .take(64)
        .enumerate()
        .map(|(i, &(name, smiles))| InputMolecule::new(format!("{name}-{i}"), smiles))
        .collect();
    c.bench_function("predict_batch_64", |b| {
        b.iter(|| black_box(predictor.predict_batch(black_box(&inputs))))
    });
}

criterion_group!(benches, bench_predict, bench_batch);
criterion_main!(benches);
