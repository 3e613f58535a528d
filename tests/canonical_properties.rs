use petgraph::graph::NodeIndex;
use proptest::prelude::*;
use somcrab::canonical::symmetry_classes;
use somcrab::{from_smiles, to_canonical_smiles, to_smiles, Atom, Bond, Mol};

fn canonical(smiles: &str) -> String {
    to_canonical_smiles(&from_smiles(smiles).unwrap())
}

fn renumbered(mol: &Mol<Atom, Bond>, order: &[usize]) -> Mol<Atom, Bond> {
    let keep: Vec<NodeIndex> = order.iter().map(|&i| NodeIndex::new(i)).collect();
    mol.induced(&keep)
}

const DRUGS: &[&str] = &[
    "CC(=O)Nc1ccc(O)cc1",
    "CC(C)Cc1ccc(cc1)C(C)C(=O)O",
    "CN1CCC[C@H]1c1cccnc1",
    "COc1ccc2[nH]cc(CCN(C)C)c2c1",
    "Cn1cnc2c1c(=O)n(C)c(=O)n2C",
    "OC(=O)c1ccccc1OC(C)=O",
    "CCN(CC)CC(=O)Nc1c(C)cccc1C",
    "Clc1ccc(cc1)C(c1ccccc1)N1CCNCC1",
];

#[test]
fn fragment_order_does_not_matter() {
    assert_eq!(canonical("CC.O"), canonical("O.CC"));
    assert_eq!(canonical("CCO.c1ccccc1.N"), canonical("N.c1ccccc1.OCC"));
}

#[test]
fn kekule_and_aromatic_forms_agree() {
    assert_eq!(canonical("C1=CC=CC=C1"), canonical("c1ccccc1"));
    assert_eq!(canonical("C1=CC=CN=C1"), canonical("c1ccncc1"));
    assert_eq!(canonical("OC1=CC=CC=C1"), canonical("Oc1ccccc1"));
}

#[test]
fn stereo_marks_are_ignored() {
    assert_eq!(canonical("N[C@@H](C)C(=O)O"), canonical("NC(C)C(=O)O"));
    assert_eq!(canonical("F/C=C/F"), canonical(r"F/C=C\F"));
}

#[test]
fn writer_output_reads_back_to_the_same_structure() {
    for smiles in DRUGS {
        let mol = from_smiles(smiles).unwrap();
        let written = to_smiles(&mol);
        assert_eq!(canonical(&written), to_canonical_smiles(&mol), "{smiles} -> {written}");
        let id = to_canonical_smiles(&mol);
        assert_eq!(canonical(&id), id, "canonical SMILES is a fixed point for {smiles}");
    }
}

#[test]
fn symmetry_classes_follow_topology() {
    let mol = from_smiles("CC(C)(C)O").unwrap();
    let classes = symmetry_classes(&mol);
    assert_eq!(classes[0], classes[2]);
    assert_eq!(classes[0], classes[3]);
    assert_ne!(classes[0], classes[1]);
    assert_ne!(classes[1], classes[4]);

    let para = from_smiles("Oc1ccc(O)cc1").unwrap();
    let classes = symmetry_classes(&para);
    assert_eq!(classes[0], classes[5]);
    assert_eq!(classes[1], classes[4]);
}

fn drug_and_order() -> impl Strategy<Value = (usize, Vec<usize>)> {
    (0..DRUGS.len()).prop_flat_map(|i| {
        let n = from_smiles(DRUGS[i]).unwrap().atom_count();
        (Just(i), Just((0..n).collect::<Vec<_>>()).prop_shuffle())
    })
}

proptest! {
    #[test]
    fn canonical_id_is_independent_of_atom_order((i, order) in drug_and_order()) {
        let mol = from_smiles(DRUGS[i]).unwrap();
        let shuffled = renumbered(&mol, &order);
        prop_assert_eq!(to_canonical_smiles(&mol), to_canonical_smiles(&shuffled));
    }

    #[test]
    fn symmetry_classes_move_with_their_atoms((i, order) in drug_and_order()) {
        let mol = from_smiles(DRUGS[i]).unwrap();
        let shuffled = renumbered(&mol, &order);
        let before = symmetry_classes(&mol);
        let after = symmetry_classes(&shuffled);
        for a in 0..order.len() {
            for b in 0..order.len() {
                prop_assert_eq!(
                    after[a] == after[b],
                    before[order[a]] == before[order[b]]
                );
            }
        }
    }
}
