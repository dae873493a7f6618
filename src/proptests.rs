use super::*;

use proptest::prelude::*;
use proptest_derive::Arbitrary;
use std::collections::BTreeMap;

fn validate_trie<V: TrieValue, const BITS: u32, C: TrieCount>(t: &BinaryTrie<V, BITS, C>) {
    let mut seen = vec![false; t.nodes.len()];
    let mut stack = vec![(NodeId::ROOT, 0u32)];

    while let Some((id, depth)) = stack.pop() {
        assert!(!seen[id.index()], "node {} reachable twice", id.0);
        seen[id.index()] = true;

        let node = t.nodes.node(id);
        let mut sum = node.terminal;
        for &child in &node.children {
            if child.is_null() {
                continue;
            }
            assert!(depth < BITS, "node {} has children below leaf depth", id.0);
            sum += t.nodes.node(child).subtree;
            stack.push((child, depth + 1));
        }
        assert_eq!(
            node.subtree, sum,
            "subtree count must equal terminal plus children (node {})",
            id.0
        );
        if depth < BITS {
            assert_eq!(node.terminal, C::ZERO, "terminal count above leaf depth");
        }
    }

    assert!(
        seen.iter().all(|&s| s),
        "every arena node must be reachable from the root"
    );
}

/// Multiset oracle over logical values.
#[derive(Clone, Debug, Default)]
struct Model {
    values: BTreeMap<u64, u64>,
}

impl Model {
    fn insert(&mut self, value: u64, count: u64) {
        if count > 0 {
            *self.values.entry(value).or_default() += count;
        }
    }

    fn erase(&mut self, value: u64, count: u64) -> u64 {
        let Some(have) = self.values.get_mut(&value) else {
            return 0;
        };
        let removed = count.min(*have);
        *have -= removed;
        if *have == 0 {
            self.values.remove(&value);
        }
        removed
    }

    fn xor_all(&mut self, mask: u64) {
        self.values = std::mem::take(&mut self.values)
            .into_iter()
            .map(|(v, c)| (v ^ mask, c))
            .collect();
    }

    fn total(&self) -> u64 {
        self.values.values().sum()
    }

    fn count(&self, value: u64) -> u64 {
        self.values.get(&value).copied().unwrap_or(0)
    }

    fn count_less(&self, value: u64) -> u64 {
        self.values.range(..value).map(|(_, c)| c).sum()
    }

    fn kth(&self, mut k: u64) -> Option<u64> {
        for (&v, &c) in &self.values {
            if k < c {
                return Some(v);
            }
            k -= c;
        }
        None
    }
}

fn assert_matches_model<V, const BITS: u32>(t: &BinaryTrie<V, BITS>, m: &Model, probe: V)
where
    V: TrieValue + Into<u64>,
{
    let p: u64 = probe.into();
    let total = m.total();
    let to_u64 = |v: Option<V>| -> Option<u64> { v.map(Into::into) };

    assert_eq!(u64::from(t.total_count()), total);
    assert_eq!(u64::from(t.count(probe)), m.count(p));
    assert_eq!(t.contains(probe), m.count(p) > 0);
    assert_eq!(u64::from(t.count_less(probe)), m.count_less(p));
    assert_eq!(
        u64::from(t.count_greater(probe)),
        total - m.count_less(p) - m.count(p)
    );
    assert_eq!(to_u64(t.lower_bound(probe)), m.values.range(p..).next().map(|(v, _)| *v));
    assert_eq!(to_u64(t.prev(probe)), m.values.range(..=p).next_back().map(|(v, _)| *v));
    assert_eq!(to_u64(t.max_xor(probe)), m.values.keys().map(|v| v ^ p).max());
    assert_eq!(to_u64(t.min_xor(probe)), m.values.keys().map(|v| v ^ p).min());

    if total > 0 {
        let k = p % total;
        let k_count = u32::try_from(k).expect("test totals fit in u32");
        assert_eq!(to_u64(t.kth(k_count)), m.kth(k));
    }
}

// -----------------------------------------------------------------------------
// Full-width u8 trie, ops derived with `Arbitrary`
// -----------------------------------------------------------------------------

#[derive(Clone, Debug, Arbitrary)]
enum Op {
    #[proptest(weight = 4)]
    Insert(u8, #[proptest(strategy = "0u32..4")] u32),
    #[proptest(weight = 3)]
    Erase(u8, #[proptest(strategy = "0u32..4")] u32),
    #[proptest(weight = 1)]
    XorAll(u8),
    #[proptest(weight = 3)]
    Query(u8),
}

fn apply_u8(t: &mut U8Trie, m: &mut Model, op: &Op) {
    match *op {
        Op::Insert(v, c) => {
            t.insert_n(v, c);
            m.insert(v.into(), c.into());
        }
        Op::Erase(v, c) => {
            let removed = t.erase_n(v, c);
            assert_eq!(u64::from(removed), m.erase(v.into(), c.into()));
        }
        Op::XorAll(mask) => {
            t.xor_all(mask);
            m.xor_all(mask.into());
        }
        Op::Query(v) => assert_matches_model(t, m, v),
    }
}

fn build_u8(ops: &[Op]) -> (U8Trie, Model) {
    let mut t = U8Trie::new();
    let mut m = Model::default();
    for op in ops {
        apply_u8(&mut t, &mut m, op);
    }
    (t, m)
}

// -----------------------------------------------------------------------------
// Narrow 5-bit u16 trie
// -----------------------------------------------------------------------------

const NARROW_BITS: u32 = 5;
type NarrowTrie = BinaryTrie<u16, NARROW_BITS>;

fn narrow_value() -> impl Strategy<Value = u16> + Clone {
    0u16..(1 << NARROW_BITS)
}

fn narrow_ops_strategy() -> impl Strategy<Value = Vec<Op16>> {
    let value = narrow_value();
    let op = prop_oneof![
        45 => (value.clone(), 1u32..3).prop_map(|(v, c)| Op16::Insert(v, c)),
        30 => (value.clone(), 1u32..3).prop_map(|(v, c)| Op16::Erase(v, c)),
        5 => value.clone().prop_map(Op16::XorAll),
        20 => value.prop_map(Op16::Query),
    ];
    prop::collection::vec(op, 0..=400)
}

#[derive(Clone, Debug)]
enum Op16 {
    Insert(u16, u32),
    Erase(u16, u32),
    XorAll(u16),
    Query(u16),
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence_u8(ops in prop::collection::vec(any::<Op>(), 0..=1000)) {
        let (t, m) = build_u8(&ops);

        validate_trie(&t);
        let got: Vec<(u64, u64)> = t.iter().map(|(v, c)| (v.into(), c.into())).collect();
        let expected: Vec<(u64, u64)> = m.values.into_iter().collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_equivalence_narrow(ops in narrow_ops_strategy()) {
        let mut t = NarrowTrie::new();
        let mut m = Model::default();

        for op in ops {
            match op {
                Op16::Insert(v, c) => {
                    t.insert_n(v, c);
                    m.insert(v.into(), c.into());
                }
                Op16::Erase(v, c) => {
                    let removed = t.erase_n(v, c);
                    prop_assert_eq!(u64::from(removed), m.erase(v.into(), c.into()));
                }
                Op16::XorAll(mask) => {
                    t.xor_all(mask);
                    m.xor_all(mask.into());
                }
                Op16::Query(v) => assert_matches_model(&t, &m, v),
            }
        }

        validate_trie(&t);
        for v in narrow_value_range() {
            assert_matches_model(&t, &m, v);
        }
    }

    #[test]
    fn prop_insert_erase_round_trip(
        ops in prop::collection::vec(any::<Op>(), 0..=300),
        value in any::<u8>(),
        count in 1u32..10,
    ) {
        let (mut t, _) = build_u8(&ops);
        let before_count = t.count(value);
        let before_total = t.total_count();
        let before_nodes: Vec<(u8, u32)> = t.iter().collect();

        t.insert_n(value, count);
        validate_trie(&t);
        prop_assert_eq!(t.erase_n(value, count), count);
        validate_trie(&t);

        prop_assert_eq!(t.count(value), before_count);
        prop_assert_eq!(t.total_count(), before_total);
        prop_assert_eq!(t.iter().collect::<Vec<_>>(), before_nodes);
    }

    #[test]
    fn prop_double_xor_is_identity(
        ops in prop::collection::vec(any::<Op>(), 0..=300),
        mask in any::<u8>(),
        probe in any::<u8>(),
    ) {
        let (mut t, _) = build_u8(&ops);
        let snapshot = |t: &U8Trie| {
            (
                t.iter().collect::<Vec<_>>(),
                t.count_less(probe),
                t.lower_bound(probe),
                t.prev(probe),
                t.max_xor(probe),
                t.min_xor(probe),
                t.min(),
                t.max(),
            )
        };
        let before = snapshot(&t);
        let mask_before = t.xor_mask();

        t.xor_all(mask);
        t.xor_all(mask);

        prop_assert_eq!(t.xor_mask(), mask_before);
        prop_assert_eq!(snapshot(&t), before);
    }

    #[test]
    fn prop_kth_is_ordered(ops in narrow_ops_strategy()) {
        let mut t = NarrowTrie::new();
        for op in ops {
            match op {
                Op16::Insert(v, c) => t.insert_n(v, c),
                Op16::Erase(v, c) => {
                    t.erase_n(v, c);
                }
                Op16::XorAll(mask) => t.xor_all(mask),
                Op16::Query(_) => {}
            }
        }

        let total = t.total_count();
        let mut previous: Option<u16> = None;
        for k in 0..total {
            let v = t.kth(k).expect("k below total");
            if let Some(p) = previous {
                prop_assert!(p <= v, "kth must be non-decreasing");
            }
            // k falls inside the duplicate run of v.
            let less = t.count_less(v);
            prop_assert!(less <= k && k < less + t.count(v));
            previous = Some(v);
        }
        prop_assert_eq!(t.kth(total), None);
    }

    #[test]
    fn prop_rank_identity(ops in narrow_ops_strategy()) {
        let mut t = NarrowTrie::new();
        for op in ops {
            match op {
                Op16::Insert(v, c) => t.insert_n(v, c),
                Op16::Erase(v, c) => {
                    t.erase_n(v, c);
                }
                Op16::XorAll(mask) => t.xor_all(mask),
                Op16::Query(_) => {}
            }
        }

        for v in narrow_value_range() {
            prop_assert_eq!(
                t.count_less(v) + t.count(v) + t.count_greater(v),
                t.total_count()
            );
        }
    }
}

fn narrow_value_range() -> impl Iterator<Item = u16> {
    0u16..(1 << NARROW_BITS)
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

#[test]
fn exhaustive_insert_order_small_multiset() {
    let values: Vec<u16> = vec![0, 3, 3, 12, 17, 31];
    let expected = vec![(0, 1), (3, 2), (12, 1), (17, 1), (31, 1)];

    for_each_permutation(&values, |perm| {
        let mut t = NarrowTrie::new();
        for v in perm {
            t.insert(v);
        }

        validate_trie(&t);
        assert_eq!(t.iter().collect::<Vec<_>>(), expected);
    });
}

#[test]
fn exhaustive_erase_order_under_mask() {
    let values: Vec<u16> = vec![1, 2, 2, 9, 30, 31];

    // Insert in a fixed order, flip the mask, then erase in all permutations.
    let mut base = NarrowTrie::new();
    base.extend(values.iter().copied());
    base.xor_all(0b10101);
    let logical: Vec<u16> = values.iter().map(|v| v ^ 0b10101).collect();
    let nodes = base.node_count();

    for_each_permutation(&logical, |perm| {
        let mut t = base.clone();
        let mut remaining = values.len() as u32;

        for v in perm {
            assert_eq!(t.erase(v), 1);
            remaining -= 1;
            assert_eq!(t.total_count(), remaining);
            validate_trie(&t);
        }
        assert!(t.is_empty());
        assert_eq!(t.node_count(), nodes);
    });
}
