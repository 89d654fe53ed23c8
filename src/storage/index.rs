//! Ordered key index used for range scans.
//!
//! A B+tree over `String` keys. Nodes live in an arena (`Vec<IndexNode>`)
//! and refer to each other by `NodeId`. A parent owns its children through
//! `children`; the leaf `next` link is a positional reference used only to
//! walk leaves in key order.
//!
//! Separators in internal nodes are routing keys. For separators `s[i]` and
//! children `c[i]`, every key under `c[i]` is `<= s[i]` and every key under
//! `c[i + 1]` is `>= s[i]`. Keys themselves only live in leaves.
//!
//! Occupancy: a node is split before descent once it holds `degree` keys,
//! and non-root nodes never drop below `(degree - 1) / 2` keys after a delete.
//! The index is a multiset: inserting a key twice stores it twice.
use std::fmt::Write;

use crate::config_error;
use crate::error::Result;

pub const MIN_DEGREE: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Clone, Debug)]
enum NodeKind {
    Leaf { next: Option<NodeId> },
    Internal { children: Vec<NodeId> },
}

#[derive(Clone, Debug)]
struct IndexNode {
    keys: Vec<String>,
    kind: NodeKind,
}

impl IndexNode {
    fn leaf() -> Self {
        Self {
            keys: Vec::new(),
            kind: NodeKind::Leaf { next: None },
        }
    }

    fn internal(children: Vec<NodeId>) -> Self {
        Self {
            keys: Vec::new(),
            kind: NodeKind::Internal { children },
        }
    }

    fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }

    fn next(&self) -> Option<NodeId> {
        match self.kind {
            NodeKind::Leaf { next } => next,
            NodeKind::Internal { .. } => None,
        }
    }

    fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Internal { children } => children,
            NodeKind::Leaf { .. } => &[],
        }
    }

    fn children_mut(&mut self) -> &mut Vec<NodeId> {
        match &mut self.kind {
            NodeKind::Internal { children } => children,
            NodeKind::Leaf { .. } => unreachable!("leaf nodes have no children"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct IndexTree {
    nodes: Vec<IndexNode>,
    free: Vec<NodeId>,
    root: NodeId,
    degree: usize,
    len: usize,
}

impl IndexTree {
    pub fn new(degree: usize) -> Result<Self> {
        if degree < MIN_DEGREE {
            return Err(config_error!(
                "index degree must be at least {}, got {}",
                MIN_DEGREE,
                degree
            ));
        }
        Ok(Self {
            nodes: vec![IndexNode::leaf()],
            free: Vec::new(),
            root: NodeId(0),
            degree,
            len: 0,
        })
    }

    /// Number of indexed keys, counting duplicates.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Levels from the root down to the leaves; a lone root leaf is height 1.
    pub fn height(&self) -> usize {
        let mut height = 1;
        let mut node = self.root;
        while let Some(first) = self.node(node).children().first() {
            node = *first;
            height += 1;
        }
        height
    }

    /// Live nodes in the arena.
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    pub fn insert(&mut self, key: &str) {
        if self.node(self.root).keys.len() >= self.degree {
            let old_root = self.root;
            self.root = self.alloc(IndexNode::internal(vec![old_root]));
            self.split_child(self.root, 0);
        }

        let mut node = self.root;
        loop {
            if self.node(node).is_leaf() {
                let keys = &mut self.node_mut(node).keys;
                let position = keys.partition_point(|k| k.as_str() <= key);
                keys.insert(position, key.to_string());
                self.len += 1;
                return;
            }
            let mut index = self.route(node, key);
            let child = self.child_at(node, index);
            if self.node(child).keys.len() >= self.degree {
                self.split_child(node, index);
                if key > self.node(node).keys[index].as_str() {
                    index += 1;
                }
            }
            node = self.child_at(node, index);
        }
    }

    /// Remove one occurrence of `key`. Returns false if it was not indexed.
    pub fn delete(&mut self, key: &str) -> bool {
        if !self.search(key) {
            return false;
        }

        let mut node = self.root;
        loop {
            if self.node(node).is_leaf() {
                let keys = &mut self.node_mut(node).keys;
                let removed = match keys.iter().position(|k| k == key) {
                    Some(position) => {
                        keys.remove(position);
                        true
                    }
                    None => false,
                };
                if removed {
                    self.len -= 1;
                }
                self.collapse_root();
                return removed;
            }

            let mut index = self.locate_child(node, key);
            let child = self.child_at(node, index);
            if self.node(child).keys.len() <= self.min_keys() {
                index = self.rebalance_child(node, index);
            }
            // The key lives to the right of its equal separator; swap in the predecessor.
            if index > 0 && self.node(node).keys[index - 1] == key {
                let left = self.child_at(node, index - 1);
                if let Some(predecessor) = self.subtree_max(left).map(str::to_owned) {
                    self.node_mut(node).keys[index - 1] = predecessor;
                }
            }
            node = self.child_at(node, index);
        }
    }

    pub fn search(&self, key: &str) -> bool {
        let mut leaf = Some(self.find_leaf(key));
        while let Some(id) = leaf {
            let node = self.node(id);
            for candidate in &node.keys {
                if candidate == key {
                    return true;
                }
                if candidate.as_str() > key {
                    return false;
                }
            }
            leaf = node.next();
        }
        false
    }

    /// All keys `k` with `start <= k <= end`, ascending.
    pub fn range_query(&self, start: &str, end: &str) -> Vec<String> {
        let mut result = Vec::new();
        if start > end {
            return result;
        }
        let mut leaf = Some(self.find_leaf(start));
        while let Some(id) = leaf {
            let node = self.node(id);
            for key in &node.keys {
                if key.as_str() > end {
                    return result;
                }
                if key.as_str() >= start {
                    result.push(key.clone());
                }
            }
            leaf = node.next();
        }
        result
    }

    /// Every indexed key in order, read off the leaf chain.
    pub fn keys(&self) -> Vec<String> {
        let mut node = self.root;
        while let Some(first) = self.node(node).children().first() {
            node = *first;
        }
        let mut result = Vec::with_capacity(self.len);
        let mut leaf = Some(node);
        while let Some(id) = leaf {
            result.extend(self.node(id).keys.iter().cloned());
            leaf = self.node(id).next();
        }
        result
    }

    /// Level-by-level rendering of the tree, for debugging.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.dump_node(self.root, 0, &mut out);
        out
    }

    fn dump_node(&self, id: NodeId, level: usize, out: &mut String) {
        let node = self.node(id);
        let _ = writeln!(
            out,
            "{}Level {}: {}",
            "  ".repeat(level),
            level,
            node.keys.join(" ")
        );
        for child in node.children() {
            self.dump_node(*child, level + 1, out);
        }
    }

    fn min_keys(&self) -> usize {
        (self.degree - 1) / 2
    }

    fn node(&self, id: NodeId) -> &IndexNode {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut IndexNode {
        &mut self.nodes[id.0]
    }

    fn child_at(&self, id: NodeId, index: usize) -> NodeId {
        self.node(id).children()[index]
    }

    fn alloc(&mut self, node: IndexNode) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                self.nodes[id.0] = node;
                id
            }
            None => {
                self.nodes.push(node);
                NodeId(self.nodes.len() - 1)
            }
        }
    }

    fn release(&mut self, id: NodeId) {
        self.nodes[id.0] = IndexNode::leaf();
        self.free.push(id);
    }

    /// Index of the first separator `>= key`, i.e. the leftmost child that may hold `key`.
    fn route(&self, id: NodeId, key: &str) -> usize {
        self.node(id).keys.partition_point(|s| s.as_str() < key)
    }

    fn find_leaf(&self, key: &str) -> NodeId {
        let mut node = self.root;
        while !self.node(node).is_leaf() {
            node = self.child_at(node, self.route(node, key));
        }
        node
    }

    /// Leftmost child whose subtree actually holds `key`. Only meaningful
    /// when the subtree rooted at `id` contains `key`.
    fn locate_child(&self, id: NodeId, key: &str) -> usize {
        let keys = &self.node(id).keys;
        let mut index = self.route(id, key);
        while index < keys.len() && keys[index] == key {
            if self.subtree_max(self.child_at(id, index)) == Some(key) {
                break;
            }
            index += 1;
        }
        index
    }

    fn subtree_max(&self, id: NodeId) -> Option<&str> {
        let mut node = id;
        while let Some(last) = self.node(node).children().last() {
            node = *last;
        }
        self.node(node).keys.last().map(String::as_str)
    }

    fn split_child(&mut self, parent: NodeId, index: usize) {
        let child = self.child_at(parent, index);
        let node = self.node_mut(child);
        let mid = node.keys.len() / 2;
        let mut right_keys = node.keys.split_off(mid);
        let (separator, right) = match &mut node.kind {
            NodeKind::Leaf { next } => {
                // Leaf separators are copied up; the key stays in the leaf.
                let separator = right_keys[0].clone();
                let right = IndexNode {
                    keys: right_keys,
                    kind: NodeKind::Leaf { next: *next },
                };
                (separator, right)
            }
            NodeKind::Internal { children } => {
                let right_children = children.split_off(mid + 1);
                let separator = right_keys.remove(0);
                let right = IndexNode {
                    keys: right_keys,
                    kind: NodeKind::Internal {
                        children: right_children,
                    },
                };
                (separator, right)
            }
        };

        let right_id = self.alloc(right);
        if let NodeKind::Leaf { next } = &mut self.node_mut(child).kind {
            *next = Some(right_id);
        }
        let parent_node = self.node_mut(parent);
        parent_node.keys.insert(index, separator);
        parent_node.children_mut().insert(index + 1, right_id);
    }

    /// Bring child `index` of `parent` above the minimum occupancy. Returns
    /// the index of the node now holding that child's keys.
    fn rebalance_child(&mut self, parent: NodeId, index: usize) -> usize {
        let min = self.min_keys();
        let child_count = self.node(parent).children().len();
        let has_prev = index > 0;
        let has_next = index + 1 < child_count;

        if has_prev && self.node(self.child_at(parent, index - 1)).keys.len() > min {
            self.borrow_from_prev(parent, index);
            index
        } else if has_next && self.node(self.child_at(parent, index + 1)).keys.len() > min {
            self.borrow_from_next(parent, index);
            index
        } else if has_next {
            self.merge(parent, index);
            index
        } else {
            self.merge(parent, index - 1);
            index - 1
        }
    }

    fn borrow_from_prev(&mut self, parent: NodeId, index: usize) {
        let child = self.child_at(parent, index);
        let sibling = self.child_at(parent, index - 1);

        let Some(borrowed) = self.node_mut(sibling).keys.pop() else {
            return;
        };
        if self.node(child).is_leaf() {
            self.node_mut(parent).keys[index - 1] = borrowed.clone();
            self.node_mut(child).keys.insert(0, borrowed);
        } else {
            let separator = std::mem::replace(&mut self.node_mut(parent).keys[index - 1], borrowed);
            let moved = self.node_mut(sibling).children_mut().pop();
            let child_node = self.node_mut(child);
            child_node.keys.insert(0, separator);
            if let Some(moved) = moved {
                child_node.children_mut().insert(0, moved);
            }
        }
    }

    fn borrow_from_next(&mut self, parent: NodeId, index: usize) {
        let child = self.child_at(parent, index);
        let sibling = self.child_at(parent, index + 1);

        if self.node(sibling).keys.is_empty() {
            return;
        }
        let borrowed = self.node_mut(sibling).keys.remove(0);
        if self.node(child).is_leaf() {
            self.node_mut(child).keys.push(borrowed);
            let new_separator = self.node(sibling).keys[0].clone();
            self.node_mut(parent).keys[index] = new_separator;
        } else {
            let separator = std::mem::replace(&mut self.node_mut(parent).keys[index], borrowed);
            let moved = self.node_mut(sibling).children_mut().remove(0);
            let child_node = self.node_mut(child);
            child_node.keys.push(separator);
            child_node.children_mut().push(moved);
        }
    }

    /// Fold child `index + 1` into child `index`, dropping their separator.
    fn merge(&mut self, parent: NodeId, index: usize) {
        let left = self.child_at(parent, index);
        let right = self.child_at(parent, index + 1);

        let parent_node = self.node_mut(parent);
        let separator = parent_node.keys.remove(index);
        parent_node.children_mut().remove(index + 1);

        let right_node = std::mem::replace(self.node_mut(right), IndexNode::leaf());
        let left_node = self.node_mut(left);
        match (&mut left_node.kind, right_node.kind) {
            (NodeKind::Leaf { next }, NodeKind::Leaf { next: right_next }) => {
                left_node.keys.extend(right_node.keys);
                *next = right_next;
            }
            (NodeKind::Internal { children }, NodeKind::Internal { children: right_children }) => {
                left_node.keys.push(separator);
                left_node.keys.extend(right_node.keys);
                children.extend(right_children);
            }
            _ => unreachable!("sibling nodes at different depths"),
        }
        self.free.push(right);
    }

    fn collapse_root(&mut self) {
        while self.node(self.root).keys.is_empty() {
            let Some(only_child) = self.node(self.root).children().first().copied() else {
                break;
            };
            let old_root = self.root;
            self.root = only_child;
            self.release(old_root);
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;

    use super::*;

    fn key(n: usize) -> String {
        format!("key{:04}", n)
    }

    /// Walks the whole tree and checks ordering, occupancy, depth and the leaf chain.
    fn check_invariants(tree: &IndexTree) {
        let mut leaves = Vec::new();
        let mut leaf_depth = None;
        check_node(tree, tree.root, 1, None, None, &mut leaf_depth, &mut leaves);

        let in_order: Vec<String> = leaves
            .iter()
            .flat_map(|id| tree.node(*id).keys.iter().cloned())
            .collect();
        assert_eq!(in_order, tree.keys(), "leaf chain disagrees with tree order");
        assert_eq!(in_order.len(), tree.len());
        let mut sorted = in_order.clone();
        sorted.sort();
        assert_eq!(in_order, sorted);

        for pair in leaves.windows(2) {
            assert_eq!(tree.node(pair[0]).next(), Some(pair[1]));
        }
        if let Some(last) = leaves.last() {
            assert_eq!(tree.node(*last).next(), None);
        }
    }

    fn check_node(
        tree: &IndexTree,
        id: NodeId,
        depth: usize,
        lower: Option<&str>,
        upper: Option<&str>,
        leaf_depth: &mut Option<usize>,
        leaves: &mut Vec<NodeId>,
    ) {
        let node = tree.node(id);
        assert!(node.keys.len() <= tree.degree, "node over capacity");
        if id != tree.root {
            assert!(node.keys.len() >= tree.min_keys(), "node under minimum");
        }
        for key in &node.keys {
            if let Some(lower) = lower {
                assert!(key.as_str() >= lower);
            }
            if let Some(upper) = upper {
                assert!(key.as_str() <= upper);
            }
        }
        match &node.kind {
            NodeKind::Leaf { .. } => {
                if let Some(d) = *leaf_depth {
                    assert_eq!(d, depth, "leaves at uneven depth");
                } else {
                    *leaf_depth = Some(depth);
                }
                leaves.push(id);
            }
            NodeKind::Internal { children } => {
                assert_eq!(children.len(), node.keys.len() + 1);
                for (i, child) in children.iter().enumerate() {
                    let child_lower = if i == 0 { lower } else { Some(node.keys[i - 1].as_str()) };
                    let child_upper = if i == node.keys.len() {
                        upper
                    } else {
                        Some(node.keys[i].as_str())
                    };
                    check_node(tree, *child, depth + 1, child_lower, child_upper, leaf_depth, leaves);
                }
            }
        }
    }

    #[test]
    fn rejects_small_degree() {
        assert!(IndexTree::new(2).is_err());
        assert!(IndexTree::new(MIN_DEGREE).is_ok());
    }

    #[test]
    fn empty_tree() {
        let mut tree = IndexTree::new(3).unwrap();
        assert!(!tree.search("anything"));
        assert!(tree.range_query("a", "z").is_empty());
        assert!(!tree.delete("anything"));
        assert_eq!(tree.height(), 1);
        assert!(tree.is_empty());
    }

    #[test]
    fn root_splits_after_degree_plus_one_keys() {
        let degree = 3;
        let mut tree = IndexTree::new(degree).unwrap();
        for n in 0..degree {
            tree.insert(&key(n));
        }
        assert_eq!(tree.height(), 1);

        tree.insert(&key(degree));
        assert_eq!(tree.height(), 2);
        for n in 0..=degree {
            assert!(tree.search(&key(n)), "missing {}", key(n));
        }
        check_invariants(&tree);
    }

    #[test]
    fn range_query_walks_leaves() {
        let mut tree = IndexTree::new(3).unwrap();
        for n in 0..50 {
            tree.insert(&key(n));
        }
        assert!(tree.height() > 2);
        let found = tree.range_query(&key(10), &key(20));
        let expected: Vec<String> = (10..=20).map(key).collect();
        assert_eq!(found, expected);

        assert_eq!(tree.range_query("a", "z").len(), 50);
        assert!(tree.range_query(&key(20), &key(10)).is_empty());
        assert!(tree.range_query("zzz", "zzzz").is_empty());
        check_invariants(&tree);
    }

    #[test]
    fn duplicates_are_stored_and_removed_one_at_a_time() {
        let mut tree = IndexTree::new(3).unwrap();
        for _ in 0..5 {
            tree.insert("dup");
        }
        tree.insert("a");
        tree.insert("z");
        check_invariants(&tree);
        assert_eq!(tree.range_query("dup", "dup").len(), 5);

        for remaining in (0..5).rev() {
            assert!(tree.delete("dup"));
            assert_eq!(tree.range_query("dup", "dup").len(), remaining);
            check_invariants(&tree);
        }
        assert!(!tree.search("dup"));
        assert!(!tree.delete("dup"));
        assert_eq!(tree.keys(), vec!["a".to_string(), "z".to_string()]);
    }

    #[test]
    fn deleting_absent_key_is_noop() {
        let mut tree = IndexTree::new(4).unwrap();
        for n in 0..20 {
            tree.insert(&key(n));
        }
        let before = tree.keys();
        assert!(!tree.delete("missing"));
        assert_eq!(tree.keys(), before);
        check_invariants(&tree);
    }

    #[test]
    fn delete_everything_in_random_order() {
        for degree in [3, 4, 5, 8] {
            let mut rng = StdRng::seed_from_u64(degree as u64);
            let mut tree = IndexTree::new(degree).unwrap();
            let mut keys: Vec<String> = (0..200).map(key).collect();
            keys.shuffle(&mut rng);
            for k in &keys {
                tree.insert(k);
            }
            check_invariants(&tree);

            keys.shuffle(&mut rng);
            for (i, k) in keys.iter().enumerate() {
                assert!(tree.delete(k), "degree {} failed to delete {}", degree, k);
                assert!(!tree.search(k));
                if i % 17 == 0 {
                    check_invariants(&tree);
                }
            }
            check_invariants(&tree);
            assert!(tree.is_empty());
            assert_eq!(tree.height(), 1);
            assert_eq!(tree.node_count(), 1);
        }
    }

    #[test]
    fn deleted_separator_keys_are_not_found() {
        let mut tree = IndexTree::new(3).unwrap();
        for n in 0..30 {
            tree.insert(&key(n));
        }
        // Separators are copies of leaf keys; deleting the leaf key must not leave it searchable.
        for n in (0..30).step_by(3) {
            assert!(tree.delete(&key(n)));
        }
        for n in 0..30 {
            assert_eq!(tree.search(&key(n)), n % 3 != 0, "key {}", n);
        }
        check_invariants(&tree);
    }

    #[test]
    fn arena_slots_are_reused() {
        let mut tree = IndexTree::new(3).unwrap();
        for round in 0..5 {
            for n in 0..100 {
                tree.insert(&key(n));
            }
            for n in 0..100 {
                assert!(tree.delete(&key(n)), "round {} key {}", round, n);
            }
        }
        // Five rounds of growth should not have grown the arena five times over.
        assert!(tree.nodes.len() < 200);
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn dump_lists_every_level() {
        let mut tree = IndexTree::new(3).unwrap();
        for n in 0..4 {
            tree.insert(&key(n));
        }
        let dump = tree.dump();
        assert!(dump.contains("Level 0:"));
        assert!(dump.contains("Level 1:"));
        assert!(!dump.contains("Level 2:"));
    }
}
