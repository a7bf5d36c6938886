//! Grouping of assigned geometry into jobs.

use crate::document::{DocumentList, DocumentNode};
use crate::job::Job;
use routekit_settings::{Machine, SettingsResult};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Walks the document tree depth-first (preorder) and groups geometry by
/// resolved (tool, operation) assignment. Assignments are inherited: the
/// current pair is passed down by value through the walk, and a node's own
/// assignment replaces it for the node and its subtree.
pub struct Collector {
    jobs: BTreeMap<(usize, usize), Job>,
}

impl Collector {
    /// Collects all assigned geometry into jobs. Fails if a node
    /// references a tool or operation the machine does not have.
    pub fn new(documents: &DocumentList, machine: &Machine) -> SettingsResult<Self> {
        let mut collector = Self {
            jobs: BTreeMap::new(),
        };
        for root in documents.roots() {
            collector.collect(root, None, machine)?;
        }
        Ok(collector)
    }

    fn collect(
        &mut self,
        node: &DocumentNode,
        inherited: Option<(usize, usize)>,
        machine: &Machine,
    ) -> SettingsResult<()> {
        let assignment = node.assignment.or(inherited);
        if let Some((tool_index, operation_index)) = assignment {
            if !node.paths.is_empty() {
                let job = match self.jobs.entry((tool_index, operation_index)) {
                    Entry::Occupied(entry) => entry.into_mut(),
                    Entry::Vacant(entry) => {
                        let (tool, operation) = machine.resolve(tool_index, operation_index)?;
                        entry.insert(Job::new(
                            machine,
                            tool,
                            operation,
                            tool_index,
                            operation_index,
                        ))
                    }
                };
                for path in &node.paths {
                    job.add_path(path.clone());
                }
            }
        }
        for child in &node.children {
            self.collect(child, assignment, machine)?;
        }
        Ok(())
    }

    /// Consumes the collector, yielding jobs sorted by
    /// (tool index, operation index). This order defines both processing
    /// order and the order of the combined output.
    pub fn into_jobs(self) -> Vec<Job> {
        self.jobs.into_values().collect()
    }

    /// Number of distinct jobs collected.
    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use routekit_core::{Path, Point};
    use routekit_settings::{Operation, OperationKind, Tool};

    fn square(size: f64) -> Path {
        Path::closed(vec![
            Point::new(0.0, 0.0),
            Point::new(size, 0.0),
            Point::new(size, size),
            Point::new(0.0, size),
        ])
    }

    fn machine_with_ops() -> Machine {
        let mut machine = Machine::new("Router");
        machine.add_tool(Tool::new("6mm"));
        machine.add_tool(Tool::new("3mm"));
        machine.add_operation(0, Operation::new(OperationKind::CutOutside));
        machine.add_operation(0, Operation::new(OperationKind::CutInside));
        machine.add_operation(1, Operation::new(OperationKind::CutCenter));
        machine
    }

    #[test]
    fn test_assignment_inheritance_and_grouping() {
        let machine = machine_with_ops();
        let mut documents = DocumentList::new();

        let mut root = DocumentNode::with_paths("a", vec![square(10.0)]);
        root.assignment = Some((0, 1));
        // Unassigned child inherits (0, 1).
        root.children
            .push(DocumentNode::with_paths("b", vec![square(5.0)]));
        // Assigned child overrides for itself and its subtree.
        let mut c = DocumentNode::with_paths("c", vec![square(3.0)]);
        c.assignment = Some((1, 0));
        c.children
            .push(DocumentNode::with_paths("d", vec![square(2.0)]));
        root.children.push(c);
        documents.add_root(root);

        let collector = Collector::new(&documents, &machine).unwrap();
        assert_eq!(collector.job_count(), 2);
        let jobs = collector.into_jobs();
        // Sorted by (tool, operation).
        assert_eq!(jobs[0].tool_index(), 0);
        assert_eq!(jobs[0].operation_index(), 1);
        assert_eq!(jobs[0].closed_paths().len(), 2);
        assert_eq!(jobs[1].tool_index(), 1);
        assert_eq!(jobs[1].closed_paths().len(), 2);
    }

    #[test]
    fn test_unassigned_geometry_contributes_nothing() {
        let machine = machine_with_ops();
        let mut documents = DocumentList::new();
        documents.add_root(DocumentNode::with_paths("loose", vec![square(4.0)]));

        let collector = Collector::new(&documents, &machine).unwrap();
        assert_eq!(collector.job_count(), 0);
    }

    #[test]
    fn test_bad_assignment_is_an_error() {
        let machine = machine_with_ops();
        let mut documents = DocumentList::new();
        let mut node = DocumentNode::with_paths("bad", vec![square(4.0)]);
        node.assignment = Some((7, 0));
        documents.add_root(node);

        assert!(Collector::new(&documents, &machine).is_err());
    }

    #[test]
    fn test_open_and_closed_paths_split() {
        let machine = machine_with_ops();
        let mut documents = DocumentList::new();
        let mut node = DocumentNode::with_paths(
            "mixed",
            vec![
                square(4.0),
                Path::open(vec![Point::new(0.0, 0.0), Point::new(5.0, 5.0)]),
            ],
        );
        node.assignment = Some((0, 0));
        documents.add_root(node);

        let jobs = Collector::new(&documents, &machine).unwrap().into_jobs();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].closed_paths().len(), 1);
        assert_eq!(jobs[0].open_paths().len(), 1);
    }
}
