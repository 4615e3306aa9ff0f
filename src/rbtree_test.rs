use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use proptest::prelude::*;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use simplelog::{Config, LevelFilter, TestLogger};

use crate::error::Error;
use crate::node::{Color, NodeId};
use crate::rbtree::RbTree;

fn init_logger() {
    TestLogger::init(LevelFilter::Trace, Config::default()).ok();
}

fn make_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos() as u64
}

fn lookup<V>(rbt: &RbTree<i64, V>, key: i64) -> NodeId {
    rbt.search(&key).unwrap()
}

fn key_of<V>(rbt: &RbTree<i64, V>, n: NodeId) -> Option<i64> {
    if rbt.is_nil(n) {
        None
    } else {
        Some(*rbt.key(n))
    }
}

// (key, color, parent, left, right) for every node, in key order.
fn shape<V>(rbt: &RbTree<i64, V>) -> Vec<(i64, Color, Option<i64>, Option<i64>, Option<i64>)> {
    let mut acc = vec![];
    rbt.traverse_in_order(rbt.root(), |n| {
        acc.push((
            *rbt.key(n),
            rbt.color(n),
            key_of(rbt, rbt.parent(n)),
            key_of(rbt, rbt.left(n)),
            key_of(rbt, rbt.right(n)),
        ));
        true
    });
    acc
}

fn make_ascending() -> RbTree<i64, String> {
    let mut rbt: RbTree<i64, String> = RbTree::new(|a, b| a < b);
    for key in 0..=10 {
        let (_, inserted) = rbt.insert(key, key.to_string());
        assert!(inserted);
        assert!(rbt.is_tree_valid().is_ok());
    }
    rbt
}

#[test]
fn test_new() {
    let rbt: RbTree<i64, i64> = RbTree::new_ord();
    assert_eq!(rbt.size(), 0);
    assert!(rbt.is_empty());
    assert!(rbt.is_nil(rbt.root()));
    assert_eq!(rbt.color(rbt.sentinel()), Color::Black);
    assert!(rbt.is_tree_valid().is_ok());

    let stats = rbt.validate().unwrap();
    assert_eq!(stats.entries(), 0);
    assert_eq!(stats.blacks(), Some(0));
    assert!(stats.depths().is_none());
}

#[test]
fn test_size() {
    let mut rbt: RbTree<i64, ()> = RbTree::default();
    assert_eq!(rbt.size(), 0);
    rbt.insert(10, ());
    rbt.insert(5, ());
    rbt.insert(15, ());
    rbt.insert(14, ());
    assert_eq!(rbt.size(), 4);
    // value-only update does not count.
    rbt.insert(14, ());
    assert_eq!(rbt.size(), 4);
    assert_eq!(rbt.stats().entries(), 4);
}

#[test]
fn test_insert_ascending() {
    init_logger();
    let rbt = make_ascending();
    let (r, b) = (Color::Red, Color::Black);
    let refshape = vec![
        (0, b, Some(1), None, None),
        (1, b, Some(3), Some(0), Some(2)),
        (2, b, Some(1), None, None),
        (3, b, None, Some(1), Some(5)),
        (4, b, Some(5), None, None),
        (5, b, Some(3), Some(4), Some(7)),
        (6, b, Some(7), None, None),
        (7, r, Some(5), Some(6), Some(9)),
        (8, r, Some(9), None, None),
        (9, b, Some(7), Some(8), Some(10)),
        (10, r, Some(9), None, None),
    ];
    assert_eq!(shape(&rbt), refshape);
    assert_eq!(*rbt.key(rbt.root()), 3);
    assert_eq!(rbt.size(), 11);

    let stats = rbt.validate().unwrap();
    assert_eq!(stats.entries(), 11);
    assert_eq!(stats.blacks(), Some(3));
    let depths = stats.depths().unwrap();
    assert_eq!(depths.max(), 4);
    assert_eq!(depths.min(), 2);
    assert_eq!(rbt.depth(lookup(&rbt, 10)), 4);
}

#[test]
fn test_delete_odd_keys() {
    init_logger();
    let mut rbt = make_ascending();
    for key in [1, 3, 5, 7, 9].iter() {
        let n = lookup(&rbt, *key);
        assert!(rbt.delete(n));
        assert!(rbt.is_tree_valid().is_ok());
        assert!(rbt.search(key).is_none());
    }

    let (r, b) = (Color::Red, Color::Black);
    let refshape = vec![
        (0, b, Some(2), None, None),
        (2, r, Some(6), Some(0), Some(4)),
        (4, b, Some(2), None, None),
        (6, b, None, Some(2), Some(10)),
        (8, r, Some(10), None, None),
        (10, b, Some(6), Some(8), None),
    ];
    assert_eq!(shape(&rbt), refshape);
    assert_eq!(rbt.size(), 6);
    assert_eq!(rbt.value(lookup(&rbt, 8)), "8");

    let sentinel = rbt.sentinel();
    assert!(rbt.is_nil(rbt.parent(sentinel)));
    assert!(rbt.is_nil(rbt.left(sentinel)));
    assert!(rbt.is_nil(rbt.right(sentinel)));
    assert_eq!(rbt.color(sentinel), Color::Black);
}

#[test]
fn test_delete_left_leaf() {
    let mut rbt: RbTree<i64, ()> = RbTree::new_ord();
    for key in [14, 11, 69, 3, 12, 50, 82, 1, 4, 77].iter() {
        rbt.insert(*key, ());
    }
    assert!(rbt.is_tree_valid().is_ok());
    assert!(rbt.delete(lookup(&rbt, 1)));
    assert!(rbt.is_tree_valid().is_ok());

    let (n3, n4) = (lookup(&rbt, 3), lookup(&rbt, 4));
    assert_eq!(rbt.color(n3), Color::Black);
    assert!(rbt.is_nil(rbt.left(n3)));
    assert_eq!(rbt.right(n3), n4);
    assert_eq!(rbt.color(n4), Color::Red);
}

#[test]
fn test_insert_fixup_cases() {
    let testcases: Vec<Vec<i64>> = vec![
        vec![11, 2, 14, 1],
        vec![1, 11, 12, 69],
        vec![11, 2, 14, 1, 7, 15, 5, 8, 4],
        vec![1, 11, 12, 69, 4, 14],
        vec![1, 11, 12],
        vec![3, 2, 1],
    ];
    for keys in testcases.into_iter() {
        let mut rbt: RbTree<i64, ()> = RbTree::new_ord();
        for key in keys.iter() {
            rbt.insert(*key, ());
            assert!(rbt.is_tree_valid().is_ok(), "keys {:?}", keys);
        }
        assert_eq!(rbt.size(), keys.len());
    }
}

#[test]
fn test_insert_update() {
    let mut rbt: RbTree<i64, String> = RbTree::new_ord();
    for key in [11, 2, 14, 1, 7, 15, 5, 8, 4].iter() {
        rbt.insert(*key, key.to_string());
    }
    let before = shape(&rbt);
    let n4 = lookup(&rbt, 4);
    assert_eq!(rbt.value(n4), "4");

    let (node, inserted) = rbt.insert(4, "updated".to_string());
    assert!(!inserted);
    assert_eq!(node, n4);
    assert_eq!(rbt.value(n4), "updated");
    assert_eq!(shape(&rbt), before);
    assert_eq!(rbt.size(), 9);

    rbt.value_mut(n4).push('!');
    assert_eq!(rbt.get(&4).map(|s| s.as_str()), Some("updated!"));
}

#[test]
fn test_delete_nil_and_stale() {
    let mut rbt: RbTree<i64, ()> = RbTree::new_ord();
    for key in [20, 10, 30].iter() {
        rbt.insert(*key, ());
    }
    assert!(!rbt.delete(rbt.sentinel()));
    assert_eq!(rbt.size(), 3);
    assert_eq!(*rbt.key(rbt.root()), 20);
    assert!(rbt.is_nil(rbt.parent(rbt.root())));

    let n10 = lookup(&rbt, 10);
    assert!(rbt.delete(n10));
    assert!(!rbt.delete(n10));
    assert!(!rbt.contains(n10));
    assert_eq!(rbt.size(), 2);
    assert!(rbt.is_tree_valid().is_ok());
}

#[test]
fn test_delete_foreign_handle() {
    let big = make_ascending();
    let foreign = lookup(&big, 9);

    let mut rbt: RbTree<i64, String> = RbTree::new_ord();
    assert!(!rbt.contains(foreign));
    assert!(!rbt.delete(foreign));

    rbt.insert(1, "1".to_string());
    assert!(!rbt.contains(foreign));
    assert!(!rbt.delete(foreign));
    assert_eq!(rbt.size(), 1);
    assert!(rbt.is_tree_valid().is_ok());
}

#[test]
fn test_delete_handle_contract() {
    let mut rbt = make_ascending();
    let (n3, n4) = (lookup(&rbt, 3), lookup(&rbt, 4));
    assert_eq!(rbt.root(), n3);

    // 3 has two children, its slot takes over successor 4's entry.
    assert!(rbt.delete(n3));
    assert!(rbt.is_tree_valid().is_ok());
    assert_eq!(*rbt.key(n3), 4);
    assert_eq!(rbt.value(n3), "4");
    assert_eq!(rbt.search(&4), Some(n3));
    assert!(rbt.contains(n3));
    assert!(!rbt.contains(n4));
    assert!(!rbt.delete(n4));
    assert_eq!(rbt.size(), 10);
}

#[test]
fn test_remove() {
    let mut rbt = make_ascending();
    assert_eq!(rbt.remove(&5), Some("5".to_string()));
    assert_eq!(rbt.remove(&5), None);
    assert_eq!(rbt.remove(&3), Some("3".to_string()));
    assert_eq!(rbt.remove(&100), None);
    assert_eq!(rbt.size(), 9);
    assert!(rbt.is_tree_valid().is_ok());

    for key in 0..=10 {
        rbt.remove(&key);
        assert!(rbt.is_tree_valid().is_ok());
    }
    assert!(rbt.is_empty());
    assert!(rbt.is_nil(rbt.root()));
    assert!(rbt.iter().next().is_none());
}

#[test]
fn test_navigation() {
    let rbt = make_ascending();
    let root = rbt.root();
    assert_eq!(key_of(&rbt, rbt.min(root)), Some(0));
    assert_eq!(key_of(&rbt, rbt.max(root)), Some(10));
    assert_eq!(key_of(&rbt, rbt.successor(lookup(&rbt, 2))), Some(3));
    assert_eq!(key_of(&rbt, rbt.predecessor(lookup(&rbt, 4))), Some(3));
    assert!(rbt.is_nil(rbt.successor(lookup(&rbt, 10))));
    assert!(rbt.is_nil(rbt.predecessor(lookup(&rbt, 0))));
    assert_eq!(rbt.sibling(lookup(&rbt, 1)), lookup(&rbt, 5));

    let n9 = lookup(&rbt, 9);
    assert!(rbt.is_full(n9) && rbt.is_internal(n9));
    assert!(!rbt.is_leaf(n9) && !rbt.is_unary(n9));
    assert_eq!(*rbt.metadata(n9), Color::Black);

    let mut acc = vec![];
    assert!(rbt.traverse_in_order_iter(rbt.root(), |n| {
        acc.push(*rbt.key(n));
        true
    }));
    assert_eq!(acc, (0..=10).collect::<Vec<i64>>());

    let items: Vec<(i64, String)> = rbt.iter().map(|(k, v)| (*k, v.clone())).collect();
    assert_eq!(items.len(), 11);
    assert_eq!(items[7], (7, "7".to_string()));
}

#[test]
fn test_floor_ceiling() {
    let mut rbt: RbTree<i64, i64> = RbTree::new_ord();
    for key in (0..100).step_by(10) {
        rbt.insert(key, key);
    }
    let floor = |k| rbt.floor(&k).map(|n| *rbt.key(n));
    let ceiling = |k| rbt.ceiling(&k).map(|n| *rbt.key(n));
    assert_eq!(floor(-1), None);
    assert_eq!(floor(0), Some(0));
    assert_eq!(floor(45), Some(40));
    assert_eq!(floor(1000), Some(90));
    assert_eq!(ceiling(-1), Some(0));
    assert_eq!(ceiling(45), Some(50));
    assert_eq!(ceiling(90), Some(90));
    assert_eq!(ceiling(91), None);
}

#[test]
fn test_load_from() {
    let items = vec![(3, 30), (1, 10), (2, 20), (1, 11)];
    let rbt: RbTree<i64, i64> = RbTree::load_from(|a, b| a < b, items.into_iter());
    assert_eq!(rbt.size(), 3);
    assert_eq!(rbt.get(&1), Some(&11));
    assert!(rbt.is_tree_valid().is_ok());
}

#[test]
fn test_custom_order() {
    let mut rbt: RbTree<i64, ()> = RbTree::new(|a, b| a > b);
    for key in 0..20 {
        rbt.insert(key, ());
    }
    assert!(rbt.is_tree_valid().is_ok());
    let keys: Vec<i64> = rbt.iter().map(|(k, _)| *k).collect();
    assert_eq!(keys, (0..20).rev().collect::<Vec<i64>>());
    assert_eq!(rbt.floor(&5).map(|n| *rbt.key(n)), Some(5));
}

#[test]
fn test_validate_red_root() {
    let mut rbt = make_ascending();
    let root = rbt.root();
    *rbt.as_bst_mut().metadata_mut(root) = Color::Red;
    assert_eq!(rbt.is_tree_valid(), Err(Error::RedRoot));
}

#[test]
fn test_validate_red_sentinel() {
    let mut rbt = make_ascending();
    let sentinel = rbt.sentinel();
    *rbt.as_bst_mut().metadata_mut(sentinel) = Color::Red;
    assert_eq!(rbt.is_tree_valid(), Err(Error::RedSentinel));
}

#[test]
fn test_validate_consecutive_reds() {
    let mut rbt = make_ascending();
    let n9 = lookup(&rbt, 9);
    *rbt.as_bst_mut().metadata_mut(n9) = Color::Red;
    assert_eq!(rbt.is_tree_valid(), Err(Error::ConsecutiveReds(7)));
}

#[test]
fn test_validate_unbalanced_blacks() {
    let mut rbt = make_ascending();
    let n0 = lookup(&rbt, 0);
    *rbt.as_bst_mut().metadata_mut(n0) = Color::Red;
    let err = rbt.is_tree_valid().unwrap_err();
    assert_eq!(
        err,
        Error::UnbalancedBlacks {
            key: 2,
            expected: 2,
            found: 3
        }
    );
    assert_eq!(
        err.to_string(),
        "black count mismatch at node 2: expected 2 found 3"
    );
}

#[test]
fn test_validate_structure() {
    let mut rbt = make_ascending();
    let root = rbt.root();
    let n1 = lookup(&rbt, 1);
    rbt.as_bst_mut().set_parent(root, n1);
    assert_eq!(rbt.is_tree_valid(), Err(Error::RootHasParent));
}

#[test]
fn test_random() {
    let seed = make_seed();
    println!("test_random seed {}", seed);
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut rbt: RbTree<i64, i64> = RbTree::new_ord();

    assert_eq!(rbt.random(&mut rng), None);

    rbt.insert(0, 0);
    assert_eq!(rbt.random(&mut rng), Some((&0, &0)));

    for key in 1..10_000 {
        rbt.insert(key, key * 10);
    }
    for _i in 0..20_000 {
        let (key, value) = rbt.random(&mut rng).unwrap();
        assert!(*key >= 0 && *key < 10_000);
        assert_eq!(*value, key * 10);
    }
}

#[test]
fn test_crud() {
    let seed = make_seed();
    println!("test_crud seed {}", seed);
    let mut rng = SmallRng::seed_from_u64(seed);

    let size = 500;
    let mut rbt: RbTree<i64, i64> = RbTree::new_ord();
    let mut refns = RefNodes::new(size);

    for _ in 0..10_000 {
        let key: i64 = rng.gen_range(0..size as i64);
        let value: i64 = rng.gen();
        match rng.gen::<u8>() % 5 {
            0 => {
                let (node, inserted) = rbt.insert(key, value);
                assert_eq!(inserted, refns.insert(key, value));
                assert_eq!(*rbt.value(node), value);
            }
            1 => {
                assert_eq!(rbt.remove(&key), refns.remove(key));
            }
            2 => {
                let deleted = match rbt.search(&key) {
                    Some(node) => rbt.delete(node),
                    None => false,
                };
                assert_eq!(deleted, refns.remove(key).is_some());
            }
            3 => {
                assert_eq!(rbt.get(&key).cloned(), refns.get(key));
            }
            4 => {
                let floor = rbt.floor(&key).map(|n| *rbt.key(n));
                assert_eq!(floor, refns.floor(key));
                let ceiling = rbt.ceiling(&key).map(|n| *rbt.key(n));
                assert_eq!(ceiling, refns.ceiling(key));
            }
            op => panic!("unreachable {}", op),
        };

        assert!(rbt.is_tree_valid().is_ok());
        assert_eq!(rbt.size(), refns.len());
    }

    println!("index-length {}", rbt.size());
    if let Some(depths) = rbt.validate().unwrap().depths() {
        println!("depths {}", depths);
    }

    let (mut iter, mut iter_ref) = (rbt.iter(), refns.iter());
    loop {
        match (iter.next(), iter_ref.next()) {
            (Some(item), Some(ref_item)) => {
                assert_eq!(*item.0, ref_item.0);
                assert_eq!(*item.1, ref_item.1);
            }
            (None, None) => break,
            (_, _) => panic!("invalid"),
        }
    }
}

proptest! {
    #[test]
    fn prop_insert_ordered(inserts in proptest::collection::hash_set(-10_000i64..10_000, 0..500)) {
        let mut rbt: RbTree<i64, i64> = RbTree::new_ord();
        for key in inserts.iter() {
            let (_, inserted) = rbt.insert(*key, *key);
            prop_assert!(inserted);
        }
        prop_assert!(rbt.is_tree_valid().is_ok());

        let mut refkeys: Vec<i64> = inserts.into_iter().collect();
        refkeys.sort();
        let keys: Vec<i64> = rbt.iter().map(|(k, _)| *k).collect();
        prop_assert_eq!(keys, refkeys);
    }

    #[test]
    fn prop_interleaved_ops(ops in proptest::collection::vec((any::<bool>(), 0i64..200), 0..400)) {
        let mut rbt: RbTree<i64, i64> = RbTree::new_ord();
        let mut refmap: BTreeMap<i64, i64> = BTreeMap::new();
        for (insert, key) in ops.into_iter() {
            if insert {
                let (_, inserted) = rbt.insert(key, key);
                prop_assert_eq!(inserted, refmap.insert(key, key).is_none());
            } else {
                let deleted = match rbt.search(&key) {
                    Some(node) => rbt.delete(node),
                    None => false,
                };
                prop_assert_eq!(deleted, refmap.remove(&key).is_some());
            }
            if let Err(err) = rbt.is_tree_valid() {
                prop_assert!(false, "invalid tree: {}", err);
            }
            prop_assert_eq!(rbt.size(), refmap.len());
        }
    }

    #[test]
    fn prop_size_after_deletes(
        inserts in proptest::collection::hash_set(0i64..1000, 0..300),
        picks in proptest::collection::vec(any::<usize>(), 0..300),
    ) {
        let keys: Vec<i64> = inserts.into_iter().collect();
        let mut rbt: RbTree<i64, ()> = RbTree::new_ord();
        for key in keys.iter() {
            rbt.insert(*key, ());
        }
        let n = keys.len();

        let mut k = 0;
        let mut deleted = std::collections::BTreeSet::new();
        if n > 0 {
            for pick in picks.into_iter() {
                let key = keys[pick % n];
                if deleted.insert(key) {
                    prop_assert_eq!(rbt.remove(&key), Some(()));
                    k += 1;
                }
            }
        }
        prop_assert_eq!(rbt.size(), n - k);
        prop_assert!(rbt.is_tree_valid().is_ok());
    }
}

include!("./ref_test.rs");
