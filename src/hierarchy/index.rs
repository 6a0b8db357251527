//! Point-in-time tree of labeled scene objects.

use std::collections::{HashMap, HashSet};

/// Parent/child relationship of a single labeled object within a hierarchy
/// snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneHierarchyNode {
    pub instance_id: u32,
    /// Labels copied from the object at build time.
    pub labels: Vec<String>,
    /// Instance ids of labeled children.
    pub children: HashSet<u32>,
    /// Instance id of the labeled parent, if any.
    pub parent: Option<u32>,
}

/// A snapshot of the labeled scene hierarchy, keyed by instance id.
///
/// A built index may be shared by multiple consumers; the
/// [`HierarchyFrameStore`](super::HierarchyFrameStore) tracks a subscriber
/// count per snapshot and tears it down only when every consumer has
/// released it.
#[derive(Debug, Clone, Default)]
pub struct SceneHierarchyIndex {
    nodes: HashMap<u32, SceneHierarchyNode>,
}

impl SceneHierarchyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: HashMap::with_capacity(capacity),
        }
    }

    pub fn contains(&self, instance_id: u32) -> bool {
        self.nodes.contains_key(&instance_id)
    }

    pub fn try_get_node(&self, instance_id: u32) -> Option<&SceneHierarchyNode> {
        self.nodes.get(&instance_id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &SceneHierarchyNode> {
        self.nodes.values()
    }

    pub(crate) fn insert(&mut self, node: SceneHierarchyNode) {
        self.nodes.insert(node.instance_id, node);
    }

    pub(crate) fn node_mut(&mut self, instance_id: u32) -> Option<&mut SceneHierarchyNode> {
        self.nodes.get_mut(&instance_id)
    }

    /// Returns a copy containing only the nodes whose instance id is in
    /// `keep`. Dropped nodes are removed from their surviving parent's
    /// children set; when the parent was dropped too, there is nothing to
    /// unlink.
    pub fn filtered_clone(&self, keep: &HashSet<u32>) -> SceneHierarchyIndex {
        let mut clone = SceneHierarchyIndex::with_capacity(keep.len());
        let mut edges_to_remove = Vec::new();

        for (&instance_id, node) in &self.nodes {
            if keep.contains(&instance_id) {
                clone.insert(node.clone());
            } else if let Some(parent) = node.parent {
                edges_to_remove.push((parent, instance_id));
            }
        }

        for (parent, child) in edges_to_remove {
            if let Some(parent_node) = clone.nodes.get_mut(&parent) {
                parent_node.children.remove(&child);
            }
        }

        clone
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(instance_id: u32, parent: Option<u32>, children: &[u32]) -> SceneHierarchyNode {
        SceneHierarchyNode {
            instance_id,
            labels: vec![format!("label{instance_id}")],
            children: children.iter().copied().collect(),
            parent,
        }
    }

    /// 1 -> {2, 3}, 2 -> {4}
    fn sample_index() -> SceneHierarchyIndex {
        let mut index = SceneHierarchyIndex::new();
        index.insert(node(1, None, &[2, 3]));
        index.insert(node(2, Some(1), &[4]));
        index.insert(node(3, Some(1), &[]));
        index.insert(node(4, Some(2), &[]));
        index
    }

    #[test]
    fn filtered_clone_keeps_exactly_the_intersection() {
        let index = sample_index();
        let keep: HashSet<u32> = [1, 2, 99].into_iter().collect();
        let filtered = index.filtered_clone(&keep);

        assert_eq!(filtered.node_count(), 2);
        assert!(filtered.contains(1));
        assert!(filtered.contains(2));
        assert!(!filtered.contains(99));
    }

    #[test]
    fn filtered_clone_prunes_dropped_children_from_surviving_parents() {
        let index = sample_index();
        let keep: HashSet<u32> = [1, 2].into_iter().collect();
        let filtered = index.filtered_clone(&keep);

        // 3 was dropped, so 1's children must not reference it.
        let root = filtered.try_get_node(1).unwrap();
        assert_eq!(root.children, [2].into_iter().collect());

        // 4 was dropped together with no surviving parent issue: 2 survives
        // and must no longer list 4.
        let child = filtered.try_get_node(2).unwrap();
        assert!(child.children.is_empty());

        // No surviving node references an id outside the keep set.
        for node in filtered.nodes() {
            for child in &node.children {
                assert!(keep.contains(child));
            }
        }
    }

    #[test]
    fn filtered_clone_tolerates_dropped_parent_chains() {
        let index = sample_index();
        // Keep only the leaf; its parent chain is entirely dropped.
        let keep: HashSet<u32> = [4].into_iter().collect();
        let filtered = index.filtered_clone(&keep);
        assert_eq!(filtered.node_count(), 1);
        assert!(filtered.contains(4));
    }

    #[test]
    fn original_is_untouched_by_filtering() {
        let index = sample_index();
        let keep: HashSet<u32> = [1].into_iter().collect();
        let _ = index.filtered_clone(&keep);
        assert_eq!(index.node_count(), 4);
        assert_eq!(index.try_get_node(1).unwrap().children.len(), 2);
    }
}
