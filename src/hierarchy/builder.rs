//! Builds a [`SceneHierarchyIndex`] by walking an external scene graph.
//!
//! The scene graph is an out-of-scope collaborator reached through the
//! [`SceneGraph`] trait; the builder never mutates it.

use super::index::{SceneHierarchyIndex, SceneHierarchyNode};
use std::collections::{HashSet, VecDeque};

/// Read access to the host application's scene graph.
pub trait SceneGraph {
    type NodeId: Copy;

    /// The currently active root nodes of all loaded scenes.
    fn roots(&self) -> Vec<Self::NodeId>;

    fn children(&self, node: Self::NodeId) -> Vec<Self::NodeId>;

    /// False when the node or any of its ancestors is inactive.
    fn is_active_in_hierarchy(&self, node: Self::NodeId) -> bool;

    /// The label marker attached to this node, if any: the object's stable
    /// instance id and its ordered labels.
    fn label_marker(&self, node: Self::NodeId) -> Option<(u32, &[String])>;
}

/// Walks the scene graph breadth-first from its roots and records the
/// parent/child relationships of every labeled node.
///
/// - Inactive nodes are skipped along with their entire subtree.
/// - Unmarked nodes are transparent: their children are visited with the
///   same current-parent pointer and no entry is created for them.
/// - When `include` is supplied, a marked node whose instance id is not in
///   the set is skipped **along with its whole subtree**, so labeled
///   descendants of an excluded ancestor never appear in the snapshot.
pub fn build_hierarchy<G: SceneGraph>(
    graph: &G,
    include: Option<&HashSet<u32>>,
) -> SceneHierarchyIndex {
    let mut index = SceneHierarchyIndex::new();
    let mut queue: VecDeque<(G::NodeId, Option<u32>)> = graph
        .roots()
        .into_iter()
        .map(|root| (root, None))
        .collect();

    while let Some((node, parent)) = queue.pop_front() {
        if !graph.is_active_in_hierarchy(node) {
            continue;
        }

        let Some((instance_id, labels)) = graph.label_marker(node) else {
            for child in graph.children(node) {
                queue.push_back((child, parent));
            }
            continue;
        };

        if let Some(keep) = include {
            if !keep.contains(&instance_id) {
                continue;
            }
        }

        if index.contains(instance_id) {
            log::error!("Duplicate instance id {instance_id} encountered while building the scene hierarchy");
        } else {
            index.insert(SceneHierarchyNode {
                instance_id,
                labels: labels.to_vec(),
                children: HashSet::new(),
                parent,
            });
        }

        if let Some(parent_id) = parent {
            if let Some(parent_node) = index.node_mut(parent_id) {
                parent_node.children.insert(instance_id);
            }
        }

        for child in graph.children(node) {
            queue.push_back((child, Some(instance_id)));
        }
    }

    index
}
