//! # xor-trie
//!
//! A binary trie over fixed-width unsigned integers with multiset semantics,
//! an order-statistics index and a lazily applied global XOR mask.
//!
//! Every operation walks at most `BITS` levels. Applying an XOR to the whole
//! multiset is O(1): the mask is folded into every bit comparison at read and
//! write time instead of rewriting stored nodes.
//!
//! ## Example
//!
//! ```rust
//! use xor_trie::BinaryTrie;
//!
//! let mut trie: BinaryTrie<u16, 8> = BinaryTrie::new();
//! trie.insert(1);
//! trie.insert(6);
//!
//! assert_eq!(trie.max_xor(6), Some(7));
//!
//! trie.xor_all(3); // {1, 6} -> {2, 5}
//! assert!(trie.contains(2));
//! assert!(trie.contains(5));
//! assert_eq!(trie.kth(0), Some(2));
//! assert_eq!(trie.lower_bound(3), Some(5));
//! ```

#![forbid(unsafe_code)]

mod error;
mod value;

pub use error::Error;
pub use value::{TrieCount, TrieValue};

use std::fmt;
use tracing::{debug, trace};

// =============================================================================
// Configuration
// =============================================================================

/// Longest root-to-leaf path in nodes: 64 levels plus the root.
const MAX_DEPTH: usize = 65;

// =============================================================================
// Node arena
// =============================================================================

/// Index of a node in the arena. `NULL` marks an absent child.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct NodeId(u32);

impl NodeId {
    const ROOT: NodeId = NodeId(0);
    const NULL: NodeId = NodeId(u32::MAX);

    #[inline]
    fn is_null(self) -> bool {
        self == Self::NULL
    }

    #[inline]
    fn index(self) -> usize {
        debug_assert!(!self.is_null());
        self.0 as usize
    }
}

/// One bit-prefix. Children are indexed by *stored* bit direction.
#[derive(Clone, Debug)]
struct Node<C> {
    children: [NodeId; 2],
    /// Multiplicity of every value whose path passes through this node.
    subtree: C,
    /// Multiplicity of values whose path ends here. Non-zero only at depth `BITS`.
    terminal: C,
}

impl<C: TrieCount> Node<C> {
    fn new() -> Self {
        Self {
            children: [NodeId::NULL; 2],
            subtree: C::ZERO,
            terminal: C::ZERO,
        }
    }
}

/// Append-only node storage. Node 0 is the root and always exists.
#[derive(Clone)]
struct NodeArena<C> {
    nodes: Vec<Node<C>>,
}

impl<C: TrieCount> NodeArena<C> {
    fn new() -> Self {
        Self {
            nodes: vec![Node::new()],
        }
    }

    #[inline]
    fn len(&self) -> usize {
        self.nodes.len()
    }

    fn capacity(&self) -> usize {
        self.nodes.capacity() * std::mem::size_of::<Node<C>>()
    }

    fn shrink_to_fit(&mut self) {
        self.nodes.shrink_to_fit();
    }

    fn reset(&mut self) {
        self.nodes.truncate(1);
        self.nodes[0] = Node::new();
    }

    fn alloc(&mut self) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        assert!(!id.is_null(), "node arena exhausted");
        self.nodes.push(Node::new());
        id
    }

    #[inline]
    fn node(&self, id: NodeId) -> &Node<C> {
        &self.nodes[id.index()]
    }

    #[inline]
    fn node_mut(&mut self, id: NodeId) -> &mut Node<C> {
        &mut self.nodes[id.index()]
    }

    #[inline]
    fn child(&self, id: NodeId, dir: usize) -> NodeId {
        self.node(id).children[dir]
    }

    /// Subtree count of `id`, zero for an absent node.
    #[inline]
    fn subtree(&self, id: NodeId) -> C {
        if id.is_null() {
            C::ZERO
        } else {
            self.node(id).subtree
        }
    }

    #[inline]
    fn terminal(&self, id: NodeId) -> C {
        self.node(id).terminal
    }
}

// =============================================================================
// BinaryTrie
// =============================================================================

/// Multiset of `BITS`-bit unsigned integers stored in a binary trie.
///
/// - `V` is the value type; every value passed in must fit in `BITS` bits.
/// - `BITS` is the number of tracked bits, `1..=V::BITS` (checked at compile time).
/// - `C` is the multiplicity counter type.
///
/// Values are kept in *stored* form (`value ^ mask`), so [`xor_all`](Self::xor_all)
/// only updates the mask. Queries decode through the current mask and always
/// answer in terms of logical values.
///
/// Nodes are never reclaimed by [`erase`](Self::erase): a removed value leaves
/// its path in place with zero counts, and a later insert reuses it.
#[derive(Clone)]
pub struct BinaryTrie<V, const BITS: u32, C = u32> {
    nodes: NodeArena<C>,
    xor_mask: V,
}

/// Trie tracking all 8 bits of `u8`.
pub type U8Trie<C = u32> = BinaryTrie<u8, 8, C>;
/// Trie tracking all 16 bits of `u16`.
pub type U16Trie<C = u32> = BinaryTrie<u16, 16, C>;
/// Trie tracking all 32 bits of `u32`.
pub type U32Trie<C = u32> = BinaryTrie<u32, 32, C>;
/// Trie tracking all 64 bits of `u64`.
pub type U64Trie<C = u32> = BinaryTrie<u64, 64, C>;

/// Direction of a nearest-value search.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Seek {
    /// Smallest value `>=` the target.
    Ceil,
    /// Largest value `<=` the target.
    Floor,
}

impl Seek {
    /// Logical bit that moves strictly past the target in the seek direction.
    #[inline]
    fn escape_bit(self) -> usize {
        match self {
            Seek::Ceil => 1,
            Seek::Floor => 0,
        }
    }

    /// Child visiting order once the search is no longer bound to the target.
    #[inline]
    fn free_order(self) -> [usize; 2] {
        match self {
            Seek::Ceil => [0, 1],
            Seek::Floor => [1, 0],
        }
    }
}

impl<V: TrieValue, const BITS: u32, C: TrieCount> BinaryTrie<V, BITS, C> {
    const WIDTH_OK: () = assert!(
        BITS > 0 && BITS <= V::BITS,
        "BinaryTrie bit width must be between 1 and the value type's width"
    );

    pub fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::WIDTH_OK;
        Self {
            nodes: NodeArena::new(),
            xor_mask: V::ZERO,
        }
    }

    // -------------------------------------------------------------------------
    // Mask plumbing
    // -------------------------------------------------------------------------

    #[inline]
    fn bit_mask() -> V {
        V::low_mask(BITS)
    }

    #[inline]
    fn fits(value: V) -> bool {
        value & !Self::bit_mask() == V::ZERO
    }

    #[inline]
    fn debug_assert_fits(value: V) {
        debug_assert!(
            Self::fits(value),
            "value {:?} does not fit in {} bits",
            value,
            BITS
        );
    }

    #[inline]
    fn to_stored(&self, value: V) -> V {
        (value ^ self.xor_mask) & Self::bit_mask()
    }

    #[inline]
    fn to_logical(&self, stored: V) -> V {
        (stored ^ self.xor_mask) & Self::bit_mask()
    }

    /// Child of `id` holding values whose logical bit at `bit` is `logical`.
    #[inline]
    fn child_for_logical_bit(&self, id: NodeId, bit: u32, logical: usize) -> NodeId {
        self.nodes.child(id, logical ^ self.xor_mask.bit(bit))
    }

    /// Width check used by the checked API.
    pub fn check_value(&self, value: V) -> Result<V, Error> {
        if Self::fits(value) {
            Ok(value)
        } else {
            Err(Error::ValueOutOfRange {
                value: value.to_u64(),
                bits: BITS,
            })
        }
    }

    /// Applies `value ^ mask` to every element, lazily. O(1).
    ///
    /// Bits of `mask` above `BITS` are ignored.
    pub fn xor_all(&mut self, mask: V) {
        self.xor_mask = self.xor_mask ^ (mask & Self::bit_mask());
        trace!(mask = ?mask, xor_mask = ?self.xor_mask, "applied xor mask");
    }

    /// The mask currently folded into every decode.
    #[inline]
    pub fn xor_mask(&self) -> V {
        self.xor_mask
    }

    // -------------------------------------------------------------------------
    // Size and storage
    // -------------------------------------------------------------------------

    /// Total multiplicity of all stored values. O(1).
    #[inline]
    pub fn total_count(&self) -> C {
        self.nodes.subtree(NodeId::ROOT)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.total_count() == C::ZERO
    }

    /// Number of arena nodes, root included. Never decreases except on [`clear`](Self::clear).
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn memory_usage(&self) -> usize {
        self.nodes.capacity()
    }

    pub fn shrink_to_fit(&mut self) {
        let before = self.nodes.capacity();
        self.nodes.shrink_to_fit();
        debug!(before, after = self.nodes.capacity(), "shrunk node arena");
    }

    /// Removes every value, drops all nodes but the root and resets the mask.
    pub fn clear(&mut self) {
        let nodes = self.nodes.len();
        self.nodes.reset();
        self.xor_mask = V::ZERO;
        debug!(nodes, "cleared trie");
    }
}

// =============================================================================
// Mutation
// =============================================================================

impl<V: TrieValue, const BITS: u32, C: TrieCount> BinaryTrie<V, BITS, C> {
    /// Inserts one copy of `value`.
    #[inline]
    pub fn insert(&mut self, value: V) {
        self.insert_n(value, C::ONE);
    }

    /// Inserts `count` copies of `value`. O(BITS).
    pub fn insert_n(&mut self, value: V, count: C) {
        Self::debug_assert_fits(value);
        if count == C::ZERO {
            return;
        }

        let stored = self.to_stored(value);
        let mut id = NodeId::ROOT;
        self.nodes.node_mut(id).subtree += count;

        let mut created = 0usize;
        for bit in (0..BITS).rev() {
            let dir = stored.bit(bit);
            let mut child = self.nodes.child(id, dir);
            if child.is_null() {
                child = self.nodes.alloc();
                self.nodes.node_mut(id).children[dir] = child;
                created += 1;
            }
            id = child;
            self.nodes.node_mut(id).subtree += count;
        }
        self.nodes.node_mut(id).terminal += count;

        if created > 0 {
            trace!(value = ?value, created, nodes = self.nodes.len(), "extended trie");
        }
    }

    /// Checked [`insert_n`](Self::insert_n).
    ///
    /// Fails without mutating if `value` is wider than `BITS` or if the total
    /// multiplicity would overflow `C`. The root carries the largest count on
    /// every path, so checking it covers every node.
    pub fn try_insert(&mut self, value: V, count: C) -> Result<(), Error> {
        let value = self.check_value(value).inspect_err(|err| {
            debug!(%err, "rejected insert");
        })?;
        let total = self.total_count();
        if total.checked_add(count).is_none() {
            let err = Error::CountOverflow {
                total: total.to_u64(),
                added: count.to_u64(),
            };
            debug!(%err, "rejected insert");
            return Err(err);
        }
        self.insert_n(value, count);
        Ok(())
    }

    /// Removes one copy of `value`, returning how many copies were removed.
    #[inline]
    pub fn erase(&mut self, value: V) -> C {
        self.erase_n(value, C::ONE)
    }

    /// Removes up to `count` copies of `value`. O(BITS).
    ///
    /// Returns the number actually removed, `min(count, self.count(value))`.
    /// Nodes on the path are kept even when their counts drop to zero.
    pub fn erase_n(&mut self, value: V, count: C) -> C {
        Self::debug_assert_fits(value);
        if count == C::ZERO {
            return C::ZERO;
        }

        let stored = self.to_stored(value);
        let mut path = [NodeId::NULL; MAX_DEPTH];
        let mut id = NodeId::ROOT;
        path[0] = id;
        for (depth, bit) in (0..BITS).rev().enumerate() {
            let child = self.nodes.child(id, stored.bit(bit));
            if child.is_null() {
                return C::ZERO;
            }
            id = child;
            path[depth + 1] = id;
        }

        let removable = count.min(self.nodes.terminal(id));
        if removable == C::ZERO {
            return C::ZERO;
        }
        self.nodes.node_mut(id).terminal -= removable;
        for &node in &path[..=BITS as usize] {
            self.nodes.node_mut(node).subtree -= removable;
        }
        removable
    }

    /// Checked [`erase_n`](Self::erase_n).
    pub fn try_erase(&mut self, value: V, count: C) -> Result<C, Error> {
        let value = self.check_value(value).inspect_err(|err| {
            debug!(%err, "rejected erase");
        })?;
        Ok(self.erase_n(value, count))
    }
}

// =============================================================================
// Order statistics and rank
// =============================================================================

impl<V: TrieValue, const BITS: u32, C: TrieCount> BinaryTrie<V, BITS, C> {
    /// Multiplicity of `value`. O(BITS).
    pub fn count(&self, value: V) -> C {
        Self::debug_assert_fits(value);
        let stored = self.to_stored(value);
        let mut id = NodeId::ROOT;
        for bit in (0..BITS).rev() {
            id = self.nodes.child(id, stored.bit(bit));
            if id.is_null() {
                return C::ZERO;
            }
        }
        self.nodes.terminal(id)
    }

    #[inline]
    pub fn contains(&self, value: V) -> bool {
        self.count(value) > C::ZERO
    }

    /// Number of stored values strictly less than `value`. O(BITS).
    pub fn count_less(&self, value: V) -> C {
        Self::debug_assert_fits(value);
        let mut result = C::ZERO;
        let mut id = NodeId::ROOT;
        for bit in (0..BITS).rev() {
            if id.is_null() {
                break;
            }
            let zero = self.child_for_logical_bit(id, bit, 0);
            if value.bit(bit) == 1 {
                result += self.nodes.subtree(zero);
                id = self.child_for_logical_bit(id, bit, 1);
            } else {
                id = zero;
            }
        }
        result
    }

    /// Number of stored values strictly greater than `value`. O(BITS).
    pub fn count_greater(&self, value: V) -> C {
        self.total_count() - self.count_less(value) - self.count(value)
    }

    /// The `k`-th smallest value (0-indexed, duplicates counted), or `None`
    /// if `k >= total_count()`. O(BITS).
    pub fn kth(&self, k: C) -> Option<V> {
        if k >= self.total_count() {
            return None;
        }

        let mut id = NodeId::ROOT;
        let mut logical = V::ZERO;
        let mut remaining = k;
        for bit in (0..BITS).rev() {
            let zero = self.child_for_logical_bit(id, bit, 0);
            let zero_count = self.nodes.subtree(zero);
            if remaining < zero_count {
                id = zero;
                continue;
            }
            remaining -= zero_count;
            let one = self.child_for_logical_bit(id, bit, 1);
            if self.nodes.subtree(one) == C::ZERO {
                debug_assert!(false, "subtree counts disagree with total count");
                return None;
            }
            id = one;
            logical = logical.with_bit(bit, 1);
        }
        Some(logical)
    }

    /// Smallest stored value.
    pub fn min(&self) -> Option<V> {
        self.kth(C::ZERO)
    }

    /// Largest stored value.
    pub fn max(&self) -> Option<V> {
        let total = self.total_count();
        if total == C::ZERO {
            return None;
        }
        self.kth(total - C::ONE)
    }
}

// =============================================================================
// Nearest-value search
// =============================================================================

impl<V: TrieValue, const BITS: u32, C: TrieCount> BinaryTrie<V, BITS, C> {
    /// Smallest stored value `>= value`. O(BITS).
    pub fn lower_bound(&self, value: V) -> Option<V> {
        Self::debug_assert_fits(value);
        if self.is_empty() {
            return None;
        }
        let target = value & Self::bit_mask();
        self.seek(NodeId::ROOT, BITS, target, V::ZERO, true, Seek::Ceil)
    }

    /// Largest stored value `<= value`. O(BITS).
    pub fn prev(&self, value: V) -> Option<V> {
        Self::debug_assert_fits(value);
        if self.is_empty() {
            return None;
        }
        let target = value & Self::bit_mask();
        self.seek(NodeId::ROOT, BITS, target, V::ZERO, true, Seek::Floor)
    }

    /// Depth-first bound search over the `level` remaining bits below `id`.
    ///
    /// While `tight`, `prefix` equals the target's high bits and the search
    /// follows the target, leaving it only in the seek direction. Once free,
    /// any completion qualifies, so children are tried nearest first and the
    /// first full-depth path wins.
    fn seek(
        &self,
        id: NodeId,
        level: u32,
        target: V,
        prefix: V,
        tight: bool,
        dir: Seek,
    ) -> Option<V> {
        if self.nodes.subtree(id) == C::ZERO {
            return None;
        }
        if level == 0 {
            return (self.nodes.terminal(id) > C::ZERO).then_some(prefix);
        }

        let bit = level - 1;
        if tight {
            let target_bit = target.bit(bit);
            let same = self.child_for_logical_bit(id, bit, target_bit);
            if let Some(found) =
                self.seek(same, bit, target, prefix.with_bit(bit, target_bit), true, dir)
            {
                return Some(found);
            }

            let escape = dir.escape_bit();
            if target_bit == escape {
                return None;
            }
            let child = self.child_for_logical_bit(id, bit, escape);
            return self.seek(child, bit, target, prefix.with_bit(bit, escape), false, dir);
        }

        dir.free_order().into_iter().find_map(|logical| {
            let child = self.child_for_logical_bit(id, bit, logical);
            self.seek(child, bit, target, prefix.with_bit(bit, logical), false, dir)
        })
    }
}

// =============================================================================
// XOR extremum
// =============================================================================

impl<V: TrieValue, const BITS: u32, C: TrieCount> BinaryTrie<V, BITS, C> {
    /// Maximum of `element ^ value` over all stored elements. O(BITS).
    pub fn max_xor(&self, value: V) -> Option<V> {
        Self::debug_assert_fits(value);
        let stored = self.extreme_xor(value, true)?;
        Some((self.to_logical(stored) ^ value) & Self::bit_mask())
    }

    /// Minimum of `element ^ value` over all stored elements. O(BITS).
    pub fn min_xor(&self, value: V) -> Option<V> {
        Self::debug_assert_fits(value);
        let stored = self.extreme_xor(value, false)?;
        Some((self.to_logical(stored) ^ value) & Self::bit_mask())
    }

    /// Greedy descent returning the stored form of the extremal element.
    ///
    /// Works directly on stored directions: `element ^ value` equals
    /// `stored ^ key` where `key` is `value` run through the mask.
    fn extreme_xor(&self, value: V, maximize: bool) -> Option<V> {
        if self.is_empty() {
            return None;
        }

        let key = self.to_stored(value);
        let mut id = NodeId::ROOT;
        let mut stored = V::ZERO;
        for bit in (0..BITS).rev() {
            let mut dir = key.bit(bit) ^ usize::from(maximize);
            let mut child = self.nodes.child(id, dir);
            if self.nodes.subtree(child) == C::ZERO {
                dir ^= 1;
                child = self.nodes.child(id, dir);
                if self.nodes.subtree(child) == C::ZERO {
                    debug_assert!(false, "non-empty node without a non-empty child");
                    return None;
                }
            }
            stored = stored.with_bit(bit, dir);
            id = child;
        }
        Some(stored)
    }
}

// =============================================================================
// Iteration and std traits
// =============================================================================

impl<V: TrieValue, const BITS: u32, C: TrieCount> BinaryTrie<V, BITS, C> {
    /// Distinct values in ascending logical order, with their multiplicities.
    pub fn iter(&self) -> Iter<'_, V, BITS, C> {
        let mut stack = Vec::with_capacity(BITS as usize + 1);
        if !self.is_empty() {
            stack.push((NodeId::ROOT, BITS, V::ZERO));
        }
        Iter { trie: self, stack }
    }
}

impl<V: TrieValue, const BITS: u32, C: TrieCount> Default for BinaryTrie<V, BITS, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: TrieValue, const BITS: u32, C: TrieCount> fmt::Debug for BinaryTrie<V, BITS, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<V: TrieValue, const BITS: u32, C: TrieCount> Extend<V> for BinaryTrie<V, BITS, C> {
    fn extend<I: IntoIterator<Item = V>>(&mut self, iter: I) {
        for value in iter {
            self.insert(value);
        }
    }
}

impl<V: TrieValue, const BITS: u32, C: TrieCount> FromIterator<V> for BinaryTrie<V, BITS, C> {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        let mut trie = Self::new();
        trie.extend(iter);
        trie
    }
}

impl<'a, V: TrieValue, const BITS: u32, C: TrieCount> IntoIterator for &'a BinaryTrie<V, BITS, C> {
    type Item = (V, C);
    type IntoIter = Iter<'a, V, BITS, C>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct Iter<'a, V, const BITS: u32, C> {
    trie: &'a BinaryTrie<V, BITS, C>,
    /// Pending `(node, remaining levels, logical prefix)`.
    stack: Vec<(NodeId, u32, V)>,
}

impl<V: TrieValue, const BITS: u32, C: TrieCount> Iterator for Iter<'_, V, BITS, C> {
    type Item = (V, C);

    fn next(&mut self) -> Option<Self::Item> {
        let trie = self.trie;
        while let Some((id, level, prefix)) = self.stack.pop() {
            if trie.nodes.subtree(id) == C::ZERO {
                continue;
            }
            if level == 0 {
                return Some((prefix, trie.nodes.terminal(id)));
            }

            let bit = level - 1;
            // Logical 1 first so logical 0 is popped first.
            for logical in [1, 0] {
                let child = trie.child_for_logical_bit(id, bit, logical);
                if !child.is_null() {
                    self.stack.push((child, bit, prefix.with_bit(bit, logical)));
                }
            }
        }
        None
    }
}


#[cfg(test)]
mod proptests;
