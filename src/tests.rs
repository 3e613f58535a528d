use std::sync::Arc;

use petgraph::graph::NodeIndex;

use crate::*;

fn carbonyl() -> (Mol<Atom, Bond>, NodeIndex, NodeIndex) {
    let mut mol = Mol::<Atom, Bond>::new();
    let c = mol.add_atom(Atom {
        hydrogen_count: 2,
        ..Atom::new(6)
    });
    let o = mol.add_atom(Atom::new(8));
    mol.add_bond(c, o, Bond::new(BondOrder::Double));
    (mol, c, o)
}

#[test]
fn mol_add_atoms_and_bonds() {
    let (mol, c, o) = carbonyl();
    assert_eq!(mol.atom_count(), 2);
    assert_eq!(mol.bond_count(), 1);
    assert_eq!(mol.atom(c).element(), Some(Element::C));
    let e = mol.bond_between(c, o).unwrap();
    assert_eq!(mol.bond(e).order, BondOrder::Double);
    assert!(!mol.bond(e).is_aromatic);
    let (a, b) = mol.bond_endpoints(e).unwrap();
    assert!((a == c && b == o) || (a == o && b == c));
}

#[test]
fn heavy_atom_views_skip_hydrogens() {
    let mut mol = from_smiles("[H]OC").unwrap();
    assert_eq!(mol.atom_count(), 3);
    assert_eq!(mol.heavy_atom_count(), 2);
    let o = NodeIndex::new(1);
    assert_eq!(mol.degree(o), 2);
    assert_eq!(mol.heavy_degree(o), 1);
    assert_eq!(mol.explicit_h_count(o), 1);
    assert_eq!(mol.total_h_count(o), 1);

    mol.atom_mut(o).equivalence_class = Some(3);
    mol.clear_annotations();
    assert!(mol.atoms().all(|i| mol.atom(i).equivalence_class.is_none()));
}

#[test]
fn induced_subgraph_renumbers_atoms() {
    let mol = from_smiles("CCOC").unwrap();
    let sub = mol.induced(&[NodeIndex::new(2), NodeIndex::new(3)]);
    assert_eq!(sub.atom_count(), 2);
    assert_eq!(sub.bond_count(), 1);
    assert_eq!(sub.atom(NodeIndex::new(0)).atomic_num, 8);
}

#[test]
fn defaults() {
    assert_eq!(BondOrder::default(), BondOrder::Single);
    let atom = Atom::default();
    assert_eq!(atom.atomic_num, 0);
    assert!(atom.som.is_none());
    assert!(atom.features.is_empty());
    let mol = Mol::<Atom, Bond>::default();
    assert_eq!(mol.atom_count(), 0);
    assert_eq!(mol.graph().node_count(), 0);
}

const TOY_MODEL: &str = r#"{
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

#[test]
fn annotation_passes_compose() {
    let mut mol = from_smiles("CCOc1ccccc1").unwrap();
    assign_atom_types_and_descriptors(&mut mol);
    canonical::assign_equivalence_classes(&mut mol);
    NeighborhoodAggregator::default().aggregate(&mut mol);

    let model = TreeEnsemble::from_json(TOY_MODEL).unwrap();
    SomScorer::new(Arc::new(model)).score(&mut mol).unwrap();

    let methyl = mol.atom(NodeIndex::new(0)).som.unwrap();
    assert!((methyl.probability - 0.85).abs() < 1e-12);
    assert!(methyl.is_site);
    let oxygen = mol.atom(NodeIndex::new(2)).som.unwrap();
    assert!((oxygen.probability - 0.15).abs() < 1e-12);
    assert!(!oxygen.is_site);
    // The two ortho and the two meta carbons share a class and a prediction.
    assert_eq!(mol.atom(NodeIndex::new(4)).som, mol.atom(NodeIndex::new(8)).som);
    assert_eq!(mol.atom(NodeIndex::new(5)).som, mol.atom(NodeIndex::new(7)).som);
}

fn assign_atom_types_and_descriptors(mol: &mut Mol<Atom, Bond>) {
    atom_type::assign_atom_types(mol).unwrap();
    descriptors::assign_descriptors(mol);
}

#[test]
fn predictor_from_public_surface() {
    let config = PredictorConfig::from_toml_str(
        r#"
        rules = "phase1"
        cutoff = { mode = "exclude", cutoff = 0.5 }
        "#,
    )
    .unwrap();
    let model = Arc::new(TreeEnsemble::from_json(TOY_MODEL).unwrap());
    let catalog = Arc::new(RuleCatalog::builtin().unwrap());
    let predictor = Predictor::new(config, model, catalog).unwrap();
    assert!(predictor.rules().rules().iter().all(|r| r.phase == Phase::Phase1));

    let result = predictor.predict(&InputMolecule::new("phenetole", "CCOc1ccccc1"));
    let prediction = result.prediction().unwrap();
    assert_eq!(prediction.site_atoms(), [0, 1]);
    // Only mappings touching the ethyl group survive the hard filter.
    for ranked in &prediction.ranked {
        assert!(ranked.candidate.mapped_atoms.iter().any(|&a| a <= 1), "{:?}", ranked.candidate);
        assert!(ranked.candidate.passed_cutoff);
    }
    let top = &prediction.ranked[0].candidate;
    assert_eq!(top.parent_id, "phenetole");
    assert!(top.score > 0.0);
}
