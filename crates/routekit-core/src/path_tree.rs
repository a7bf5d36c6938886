//! Containment forest produced by the polygon offset primitive.

use crate::clip::Loop;
use crate::path::Path;
use serde::{Deserialize, Serialize};

/// One node of the offset containment tree: the contours living at this
/// nesting level, the nodes nested inside them, and whether this level
/// bounds a hole. The root is a plain container carrying no contours.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathTree {
    pub paths: Vec<Path>,
    pub children: Vec<PathTree>,
    pub is_hole: bool,
}

impl PathTree {
    /// Creates an empty container node.
    pub fn root() -> Self {
        Self::default()
    }

    /// Creates a node holding a single contour.
    pub fn from_path(path: Path, is_hole: bool) -> Self {
        Self {
            paths: vec![path],
            children: Vec::new(),
            is_hole,
        }
    }

    /// Creates a node holding one closed contour per loop. All loops land
    /// in the same node; the node's hole flag is given by the caller.
    pub fn from_loops(loops: &[Loop], is_hole: bool) -> Self {
        Self {
            paths: loops
                .iter()
                .map(|l| Path::closed(l.points.clone()))
                .collect(),
            children: Vec::new(),
            is_hole,
        }
    }

    /// Flattens the tree depth-first (preorder) into its paths.
    pub fn flatten(self) -> Vec<Path> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into(self, out: &mut Vec<Path>) {
        out.extend(self.paths);
        for child in self.children {
            child.flatten_into(out);
        }
    }

    /// Number of nodes in the tree, the root included.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(PathTree::node_count).sum::<usize>()
    }
}
