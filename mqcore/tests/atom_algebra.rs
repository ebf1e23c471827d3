use std::collections::{BTreeSet, HashSet};

use mqcore::atoms::{AtomSelection, AtomSelectionSet, AtomSet, Mask};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

const ROUNDS: usize = 200;

fn random_indices(rng: &mut impl Rng, universe: u32) -> Vec<u32> {
    let len = rng.random_range(1..=12);
    (0..len).map(|_| rng.random_range(0..universe)).collect()
}

fn random_set(rng: &mut impl Rng, universe: u32) -> (AtomSet, BTreeSet<u32>) {
    let indices = random_indices(rng, universe);
    let reference: BTreeSet<u32> = indices.iter().copied().collect();
    let set = AtomSet::from_unsorted(indices).unwrap_or_else(|| panic!("indices are non-empty"));
    (set, reference)
}

fn to_vec(set: &BTreeSet<u32>) -> Vec<u32> {
    set.iter().copied().collect()
}

#[test]
fn set_operations_match_a_reference() {
    let mut rng = ChaCha20Rng::seed_from_u64(0x5e7);
    for _ in 0..ROUNDS {
        let (a, ra) = random_set(&mut rng, 40);
        let (b, rb) = random_set(&mut rng, 40);

        assert_eq!(a.indices(), to_vec(&ra).as_slice());
        assert_eq!(AtomSet::union(&a, &b).indices(), to_vec(&(&ra | &rb)).as_slice());

        let mask = b.to_mask(1.0 / 12.0);
        let inter = &ra & &rb;
        let diff = &ra - &rb;
        assert_eq!(
            a.intersect_mask(&mask).map(|s| s.indices().to_vec()),
            (!inter.is_empty()).then(|| to_vec(&inter))
        );
        assert_eq!(
            a.except_mask(&mask).map(|s| s.indices().to_vec()),
            (!diff.is_empty()).then(|| to_vec(&diff))
        );
        for i in 0..40 {
            assert_eq!(a.contains(i), ra.contains(&i));
        }
    }
}

#[test]
fn equal_sets_hash_equally() {
    let mut rng = ChaCha20Rng::seed_from_u64(0xa70);
    for _ in 0..ROUNDS {
        let indices = random_indices(&mut rng, 30);
        let mut shuffled = indices.clone();
        shuffled.reverse();
        let a = AtomSet::from_unsorted(indices).unwrap_or_else(|| panic!("non-empty"));
        let b = AtomSet::from_unsorted(shuffled).unwrap_or_else(|| panic!("non-empty"));
        assert_eq!(a, b);
        assert_eq!(a.hash_code(), b.hash_code());
    }
}

#[test]
fn unique_builder_matches_a_hash_set() {
    let mut rng = ChaCha20Rng::seed_from_u64(0xb01d);
    for _ in 0..20 {
        let mut builder = AtomSelection::unique_builder();
        let mut seen: HashSet<Vec<u32>> = HashSet::new();
        let mut expected = Vec::new();
        for _ in 0..100 {
            // A small universe forces plenty of repeated sets.
            let (set, reference) = random_set(&mut rng, 6);
            let fresh = seen.insert(to_vec(&reference));
            assert_eq!(builder.add(set), fresh);
            if fresh {
                expected.push(to_vec(&reference));
            }
        }
        let selection = builder.build();
        let built: Vec<Vec<u32>> = selection.iter().map(|s| s.indices().to_vec()).collect();
        assert_eq!(built, expected);

        let lookup = AtomSelectionSet::from_selection(&selection);
        assert_eq!(lookup.len(), selection.len());
        assert!(selection.iter().all(|s| lookup.contains(s)));
    }
}

#[test]
fn masks_agree_across_representations() {
    let mut rng = ChaCha20Rng::seed_from_u64(0x3a5c);
    for _ in 0..ROUNDS {
        let universe = rng.random_range(1..500);
        let count = rng.random_range(0..64);
        let indices: Vec<u32> = (0..count).map(|_| rng.random_range(0..universe)).collect();
        let reference: BTreeSet<u32> = indices.iter().copied().collect();

        // Threshold 0 always picks the dense form, above 1 always the sparse one.
        let dense = Mask::from_indices(indices.iter().copied(), 0.0);
        let sparse = Mask::from_indices(indices.iter().copied(), 1.5);
        if reference.len() > 1 {
            assert!(dense.is_dense());
            assert!(!sparse.is_dense());
        }

        for mask in [&dense, &sparse] {
            assert_eq!(mask.len(), reference.len());
            assert_eq!(mask.iter().collect::<Vec<_>>(), to_vec(&reference));
            for i in 0..universe {
                assert_eq!(mask.has(i), reference.contains(&i));
            }
        }
    }
}

#[test]
fn selection_masks_cover_every_member() {
    let mut rng = ChaCha20Rng::seed_from_u64(0x5e1);
    for _ in 0..ROUNDS {
        let sets: Vec<(AtomSet, BTreeSet<u32>)> = (0..rng.random_range(0..6))
            .map(|_| random_set(&mut rng, 100))
            .collect();
        let all: BTreeSet<u32> = sets.iter().flat_map(|(_, r)| r.iter().copied()).collect();
        let selection: AtomSelection = sets.into_iter().map(|(s, _)| s).collect();

        assert_eq!(selection.to_indices(), to_vec(&all));
        let mask = selection.get_mask(1.0 / 12.0);
        assert_eq!(mask.iter().collect::<Vec<_>>(), to_vec(&all));
        assert_eq!(
            selection.union_all().map(|s| s.indices().to_vec()),
            (!all.is_empty()).then(|| to_vec(&all))
        );
    }
}

#[test]
fn all_mask_covers_the_model() {
    let mask = Mask::all(5);
    assert_eq!(mask.len(), 5);
    assert!(mask.is_dense());
    assert_eq!(mask.iter().collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
    assert!(Mask::all(0).is_empty());
}
