//! The assigned-geometry document tree.
//!
//! Nodes carry imported vector geometry and an optional (tool, operation)
//! assignment. An unassigned node inherits the assignment of its nearest
//! assigned ancestor during collection; only nodes with a resolved
//! assignment contribute geometry to a job.

use parking_lot::RwLock;
use routekit_core::{AppEvent, DocumentEvent, EventBus, Path};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One node of the document tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentNode {
    pub name: String,
    /// Vector geometry carried by this node; each path knows whether it
    /// is closed.
    pub paths: Vec<Path>,
    /// Explicit (tool, operation) assignment, or `None` to inherit.
    pub assignment: Option<(usize, usize)>,
    pub children: Vec<DocumentNode>,
}

impl DocumentNode {
    /// Creates an empty node.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Creates a node carrying geometry.
    pub fn with_paths(name: impl Into<String>, paths: Vec<Path>) -> Self {
        Self {
            name: name.into(),
            paths,
            ..Default::default()
        }
    }
}

/// The list of root document nodes, publishing change events on mutation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentList {
    roots: Vec<DocumentNode>,
    #[serde(skip)]
    bus: Option<Arc<EventBus>>,
}

impl DocumentList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches the change-notification bus.
    pub fn attach_bus(&mut self, bus: Arc<EventBus>) {
        self.bus = Some(bus);
    }

    pub fn roots(&self) -> &[DocumentNode] {
        &self.roots
    }

    /// Adds a root node. Returns its index.
    pub fn add_root(&mut self, node: DocumentNode) -> usize {
        self.roots.push(node);
        self.publish(DocumentEvent::NodeInserted);
        self.roots.len() - 1
    }

    /// Removes a root node and its subtree.
    pub fn remove_root(&mut self, index: usize) -> Option<DocumentNode> {
        if index >= self.roots.len() {
            return None;
        }
        let node = self.roots.remove(index);
        self.publish(DocumentEvent::NodeRemoved);
        Some(node)
    }

    /// Inserts a child under the node at `path` (a root-to-node index
    /// trail). Returns false when the path does not resolve.
    pub fn insert_child(&mut self, path: &[usize], node: DocumentNode) -> bool {
        match self.node_at_mut(path) {
            Some(parent) => {
                parent.children.push(node);
                self.publish(DocumentEvent::NodeInserted);
                true
            }
            None => false,
        }
    }

    /// Changes the assignment of the node at `path`.
    pub fn set_assignment(&mut self, path: &[usize], assignment: Option<(usize, usize)>) -> bool {
        match self.node_at_mut(path) {
            Some(node) => {
                node.assignment = assignment;
                self.publish(DocumentEvent::AssignmentChanged);
                true
            }
            None => false,
        }
    }

    /// Replaces the geometry of the node at `path`.
    pub fn set_paths(&mut self, path: &[usize], paths: Vec<Path>) -> bool {
        match self.node_at_mut(path) {
            Some(node) => {
                node.paths = paths;
                self.publish(DocumentEvent::GeometryChanged);
                true
            }
            None => false,
        }
    }

    /// Resolves a root-to-node index trail.
    pub fn node_at(&self, path: &[usize]) -> Option<&DocumentNode> {
        let (&first, rest) = path.split_first()?;
        let mut node = self.roots.get(first)?;
        for &idx in rest {
            node = node.children.get(idx)?;
        }
        Some(node)
    }

    fn node_at_mut(&mut self, path: &[usize]) -> Option<&mut DocumentNode> {
        let (&first, rest) = path.split_first()?;
        let mut node = self.roots.get_mut(first)?;
        for &idx in rest {
            node = node.children.get_mut(idx)?;
        }
        Some(node)
    }

    fn publish(&self, event: DocumentEvent) {
        if let Some(bus) = &self.bus {
            bus.publish(AppEvent::Document(event));
        }
    }
}

/// Convenience alias for the shared document list handle used by the
/// dispatcher.
pub type SharedDocumentList = Arc<RwLock<DocumentList>>;

#[cfg(test)]
mod tests {
    use super::*;
    use routekit_core::{EventFilter, Point};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_tree_navigation() {
        let mut list = DocumentList::new();
        let mut root = DocumentNode::new("import.dxf");
        root.children.push(DocumentNode::new("layer0"));
        list.add_root(root);
        list.insert_child(&[0, 0], DocumentNode::new("contour"));

        assert_eq!(list.node_at(&[0]).unwrap().name, "import.dxf");
        assert_eq!(list.node_at(&[0, 0, 0]).unwrap().name, "contour");
        assert!(list.node_at(&[1]).is_none());
        assert!(list.node_at(&[0, 2]).is_none());
    }

    #[test]
    fn test_mutations_publish_events() {
        let bus = Arc::new(EventBus::new());
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        bus.subscribe(EventFilter::All, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        let mut list = DocumentList::new();
        list.attach_bus(bus);
        list.add_root(DocumentNode::new("a"));
        list.set_assignment(&[0], Some((0, 0)));
        list.set_paths(
            &[0],
            vec![Path::closed(vec![
                Point::new(0.0, 0.0),
                Point::new(1.0, 0.0),
                Point::new(1.0, 1.0),
            ])],
        );
        list.remove_root(0);

        assert_eq!(count.load(Ordering::SeqCst), 4);
    }
}
