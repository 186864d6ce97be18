//! Arena of records addressed by [`NodeId`], with explicit parent/child edges.

use crate::types::ContractRecord;

/// Index of a record inside a [`RecordArena`].
pub type NodeId = usize;

/// Flat storage for records while edges are being decided.
///
/// Records are stored without children. Edges are added with
/// [`RecordArena::attach`] and the finished tree is materialized with
/// [`RecordArena::export`], so the same input record can be fed to any
/// number of build passes without sharing state between them.
#[derive(Debug, Default)]
pub struct RecordArena {
    records: Vec<ContractRecord>,
    children: Vec<Vec<NodeId>>,
}

impl RecordArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
            children: Vec::with_capacity(capacity),
        }
    }

    /// Store a record. Any children it already carries are discarded.
    pub fn insert(&mut self, mut record: ContractRecord) -> NodeId {
        record.children.clear();
        self.records.push(record);
        self.children.push(Vec::new());
        self.records.len() - 1
    }

    pub fn get(&self, id: NodeId) -> &ContractRecord {
        &self.records[id]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append `child` to `parent`'s ordered child list.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.children[parent].push(child);
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.children[id]
    }

    /// Materialize the subtree rooted at `root` as an owned record tree.
    ///
    /// Nodes are finished in post-order on an explicit stack, so depth is
    /// bounded by memory rather than by the thread's stack.
    pub fn export(&self, root: NodeId) -> ContractRecord {
        // (node, children already scheduled)
        let mut pending: Vec<(NodeId, bool)> = self.children[root]
            .iter()
            .rev()
            .map(|&child| (child, false))
            .collect();
        let mut finished: Vec<ContractRecord> = Vec::new();

        while let Some((id, expanded)) = pending.pop() {
            let children = &self.children[id];
            if expanded {
                let mut record = self.records[id].clone();
                record.children = finished.split_off(finished.len() - children.len());
                finished.push(record);
            } else {
                pending.push((id, true));
                pending.extend(children.iter().rev().map(|&child| (child, false)));
            }
        }

        let mut record = self.records[root].clone();
        record.children = finished;
        record
    }
}
